//! Day-plan commands: sweep, materialize and show occurrences.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use glowplan_core::activity_store::ActivityStore;
use glowplan_core::{ensure_upcoming, sweep, Reconciler, TaskRecord};

use crate::common;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Show the plan for a day (default: today)
    Show {
        /// Day to show, YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Materialize pending occurrences over the forward horizon
    Upcoming {
        /// Days ahead of today (default: from configuration)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Mark stale pending occurrences from past days as missed
    Sweep,
}

pub async fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let config = common::load_config()?;
    let now = Utc::now();
    let today = common::today();

    match action {
        PlanAction::Show { date } => {
            let date = date.unwrap_or(today);
            // Keep the view honest: old pending entries become missed and
            // the horizon is materialized before reading.
            sweep(&db, today, now).await?;
            let list = db.load().await?;
            ensure_upcoming(&db, &list.activities, today, config.scheduling.horizon_days, now)
                .await?;

            let reconciler = Reconciler::new(&db);
            let tasks = reconciler.day_view(&list.activities, date, now).await?;
            if tasks.is_empty() {
                println!("Nothing planned for {date}.");
                return Ok(());
            }
            println!("Plan for {date}:");
            for task in &tasks {
                print_task(task, &list.activities);
            }
        }
        PlanAction::Upcoming { days } => {
            let days = days.unwrap_or(config.scheduling.horizon_days);
            let list = db.load().await?;
            let inserted = ensure_upcoming(&db, &list.activities, today, days, now).await?;
            println!("Materialized {inserted} new occurrence(s) over the next {days} day(s).");
        }
        PlanAction::Sweep => {
            let summary = sweep(&db, today, now).await?;
            println!(
                "Swept {} stale occurrence(s) ({} examined).",
                summary.marked_missed, summary.examined
            );
        }
    }
    Ok(())
}

fn print_task(task: &TaskRecord, activities: &[glowplan_core::Activity]) {
    let name = activities
        .iter()
        .find(|a| a.id == task.activity_id)
        .map(|a| a.name.as_str())
        .unwrap_or(task.activity_id.as_str());
    let time = task
        .time
        .map(|t| format!("{:02}:{:02}", t.hour, t.minute))
        .unwrap_or_else(|| "--:--".into());
    println!("  {time}  [{:<9}] {name}  ({})", task.status.as_str(), task.id);
}
