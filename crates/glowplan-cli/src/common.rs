//! Shared plumbing for CLI commands.

use std::path::PathBuf;

use glowplan_core::{Config, Database};

/// Returns `~/.config/glowplan[-dev]/` based on GLOWPLAN_ENV.
///
/// Set GLOWPLAN_ENV=dev to use the development data directory.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("GLOWPLAN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("glowplan-dev")
    } else {
        base_dir.join("glowplan")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn open_database() -> Result<Database, Box<dyn std::error::Error>> {
    Ok(Database::open(&data_dir()?.join("glowplan.db"))?)
}

pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    Ok(Config::load(&data_dir()?.join("config.toml"))?)
}

/// Today's calendar date in the user's local timezone.
pub fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse an `HH:MM` argument.
pub fn parse_time(raw: &str) -> Result<glowplan_core::ActivityTime, Box<dyn std::error::Error>> {
    let (h, m) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{raw}', expected HH:MM"))?;
    let hour: u32 = h.parse()?;
    let minute: u32 = m.parse()?;
    if hour > 23 || minute > 59 {
        return Err(format!("invalid time '{raw}'").into());
    }
    Ok(glowplan_core::ActivityTime { hour, minute })
}
