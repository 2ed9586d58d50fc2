//! Achievement level commands.
//!
//! The derived fields are recomputed from history on every invocation;
//! only the unlock watermark and unlock dates persist, in the database
//! key-value store.

use chrono::Utc;
use clap::Subcommand;
use glowplan_core::{AchievementProgress, Database, Reconciler};

use crate::common;

const ACHIEVEMENTS_KEY: &str = "achievements";

#[derive(Subcommand)]
pub enum LevelAction {
    /// Show level, progress and any unseen unlock
    Status,
    /// Acknowledge the current level (consumes the pending unlock)
    Ack,
}

pub async fn run(action: LevelAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let config = common::load_config()?;
    let table = config.level_table();
    let now = Utc::now();

    let reconciler = Reconciler::new(&db);
    let history = reconciler.history().await?;
    let prev = load_progress(&db)?;
    let mut progress = AchievementProgress::recompute(&history, &table, prev.as_ref(), now);

    match action {
        LevelAction::Status => {
            println!("Level {}", progress.current_level);
            println!("Completed: {}", progress.total_completed);
            println!(
                "Progress to next: {:.0}%",
                progress.progress_to_next(&table) * 100.0
            );
            if progress.current_level > progress.last_seen_level {
                println!("New level unlocked! Run `glowplan level ack` to celebrate.");
            }
        }
        LevelAction::Ack => match progress.take_unlock(now) {
            Some(unlock) => println!("Unlocked level {}!", unlock.level),
            None => println!("Nothing new to acknowledge."),
        },
    }

    save_progress(&db, &progress)?;
    Ok(())
}

fn load_progress(db: &Database) -> Result<Option<AchievementProgress>, Box<dyn std::error::Error>> {
    match db.kv_get(ACHIEVEMENTS_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn save_progress(
    db: &Database,
    progress: &AchievementProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    db.kv_set(ACHIEVEMENTS_KEY, &serde_json::to_string(progress)?)?;
    Ok(())
}
