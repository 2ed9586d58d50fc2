//! Occurrence status commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use glowplan_core::{Reconciler, TaskRecord, TaskStatus};

use crate::common;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List recorded occurrences in a date range
    List {
        /// Start date, YYYY-MM-DD (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End date, YYYY-MM-DD (default: same as from)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Mark an occurrence completed
    Complete {
        /// Activity id
        activity_id: String,
        /// Occurrence date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Occurrence time, HH:MM
        #[arg(long)]
        time: Option<String>,
    },
    /// Mark an occurrence skipped
    Skip {
        /// Activity id
        activity_id: String,
        /// Occurrence date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Occurrence time, HH:MM
        #[arg(long)]
        time: Option<String>,
    },
    /// Record an explicit status for an occurrence
    Set {
        /// Activity id
        activity_id: String,
        /// Status: pending, completed, skipped, missed or deleted
        status: TaskStatus,
        /// Occurrence date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Occurrence time, HH:MM
        #[arg(long)]
        time: Option<String>,
    },
    /// Show the full occurrence history
    History,
}

pub async fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let reconciler = Reconciler::new(&db);
    let now = Utc::now();
    let today = common::today();

    match action {
        TaskAction::List { from, to } => {
            let from = from.unwrap_or(today);
            let to = to.unwrap_or(from);
            for task in reconciler.updates_in_range(from, to).await? {
                print_record(&task);
            }
        }
        TaskAction::Complete { activity_id, date, time } => {
            let task = target(&activity_id, date.unwrap_or(today), time.as_deref(), now)?;
            let written = reconciler.complete(&task, now).await?;
            println!("Completed {}.", written.id);
        }
        TaskAction::Skip { activity_id, date, time } => {
            let task = target(&activity_id, date.unwrap_or(today), time.as_deref(), now)?;
            let written = reconciler.skip(&task, now).await?;
            println!("Skipped {}.", written.id);
        }
        TaskAction::Set { activity_id, status, date, time } => {
            let task = target(&activity_id, date.unwrap_or(today), time.as_deref(), now)?;
            let written = reconciler.set_status(&task, status, now).await?;
            println!("Recorded {} as {}.", written.id, written.status);
        }
        TaskAction::History => {
            for task in reconciler.history().await? {
                print_record(&task);
            }
        }
    }
    Ok(())
}

fn target(
    activity_id: &str,
    date: NaiveDate,
    time: Option<&str>,
    now: chrono::DateTime<Utc>,
) -> Result<TaskRecord, Box<dyn std::error::Error>> {
    Ok(TaskRecord {
        id: String::new(),
        activity_id: activity_id.to_string(),
        date,
        status: TaskStatus::Pending,
        time: time.map(common::parse_time).transpose()?,
        updated_at: now,
    })
}

fn print_record(task: &TaskRecord) {
    let time = task
        .time
        .map(|t| format!("{:02}:{:02}", t.hour, t.minute))
        .unwrap_or_else(|| "--:--".into());
    println!("{}  {time}  [{:<9}] {}", task.date, task.status.as_str(), task.id);
}
