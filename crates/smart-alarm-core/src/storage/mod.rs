mod config;

pub use config::{
    AlarmSettings, CalendarConfig, Config, HardwareConfig, TimeFormat, WeatherConfig,
};

use std::path::PathBuf;

/// Returns `~/.config/smart-alarm[-dev]/` based on SMART_ALARM_ENV.
///
/// Set SMART_ALARM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SMART_ALARM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("smart-alarm-dev")
    } else {
        base_dir.join("smart-alarm")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
