//! Wellness score commands.

use clap::Subcommand;
use glowplan_core::{bms_series, current_score, Reconciler};

use crate::common;

#[derive(Subcommand)]
pub enum ScoreAction {
    /// Show the current score
    Current {
        /// Override the base value the series starts from
        #[arg(long)]
        base: Option<f64>,
    },
    /// Show the full score series, one line per day with activity
    Series {
        /// Override the base value the series starts from
        #[arg(long)]
        base: Option<f64>,
    },
}

pub async fn run(action: ScoreAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = common::open_database()?;
    let config = common::load_config()?;
    let reconciler = Reconciler::new(&db);
    let history = reconciler.history().await?;

    match action {
        ScoreAction::Current { base } => {
            let base = base.unwrap_or(config.scoring.default_base);
            let score = current_score(base, &history, &config.scoring);
            println!("{score:.3}");
        }
        ScoreAction::Series { base } => {
            let base = base.unwrap_or(config.scoring.default_base);
            for point in bms_series(base, &history, &config.scoring) {
                println!("{}  {:+.3}  {:.3}", point.date, point.delta, point.value);
            }
        }
    }
    Ok(())
}
