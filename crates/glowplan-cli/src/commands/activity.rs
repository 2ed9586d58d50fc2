//! Activity management commands.

use chrono::Utc;
use clap::Subcommand;
use glowplan_core::activity_store::{
    remove_activity, restart_all_activities, upsert_activity, ActivityStore,
};
use glowplan_core::{Activity, Reconciler};

use crate::common;

#[derive(Subcommand)]
pub enum ActivityAction {
    /// Create a new activity
    Add {
        /// Activity name
        name: String,
        /// Recurrence: daily or weekly (default: daily)
        #[arg(long, default_value = "daily")]
        frequency: String,
        /// Scheduled time, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Weekdays, comma-separated (1=Mon .. 7=Sun)
        #[arg(long)]
        days: Option<String>,
        /// Recur every N weeks (default: 1)
        #[arg(long, default_value = "1")]
        weeks_interval: u32,
        /// Days of month, comma-separated (1..31)
        #[arg(long)]
        month_days: Option<String>,
        /// Category label
        #[arg(long, default_value = "")]
        category: String,
        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,
    },
    /// List activities
    List {
        /// Include inactive activities
        #[arg(long)]
        all: bool,
    },
    /// Remove an activity (tombstones its future pending occurrences)
    Remove {
        /// Activity id
        id: String,
    },
    /// Reactivate every activity and re-anchor recurrence at now
    RestartAll,
}

pub async fn run(action: ActivityAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let config = common::load_config()?;
    let retry_budget = config.scheduling.retry_budget;
    let now = Utc::now();

    match action {
        ActivityAction::Add {
            name,
            frequency,
            time,
            days,
            weeks_interval,
            month_days,
            category,
            note,
        } => {
            let mut activity = Activity::new(name, frequency, now);
            activity.time = time.as_deref().map(common::parse_time).transpose()?;
            activity.selected_days = parse_list(days.as_deref())?;
            activity.weeks_interval = weeks_interval;
            activity.selected_month_days = parse_list(month_days.as_deref())?;
            activity.category = category;
            activity.note = note;
            let id = activity.id.clone();
            upsert_activity(&db, retry_budget, activity, now).await?;
            println!("Created activity {id}.");
        }
        ActivityAction::List { all } => {
            let list = db.load().await?;
            for a in &list.activities {
                if !all && !a.active_status {
                    continue;
                }
                let time = a
                    .time
                    .map(|t| format!("{:02}:{:02}", t.hour, t.minute))
                    .unwrap_or_else(|| "--:--".into());
                let state = if a.active_status { "active" } else { "inactive" };
                println!("{}  {time}  {:<8} {:<8} {}", a.id, a.frequency, state, a.name);
            }
        }
        ActivityAction::Remove { id } => {
            remove_activity(&db, retry_budget, &id).await?;
            let reconciler = Reconciler::new(&db);
            let tombstoned = reconciler
                .tombstone_activity(&id, common::today(), now)
                .await?;
            println!("Removed {id} ({tombstoned} pending occurrence(s) tombstoned).");
        }
        ActivityAction::RestartAll => {
            restart_all_activities(&db, retry_budget, now).await?;
            println!("All activities restarted.");
        }
    }
    Ok(())
}

fn parse_list<T: std::str::FromStr>(raw: Option<&str>) -> Result<Vec<T>, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<T>().map_err(Into::into))
            .collect(),
    }
}
