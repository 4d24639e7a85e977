//! TOML-based application configuration.
//!
//! Stores:
//! - Alarm settings (default sound, light pattern, clock format)
//! - Calendar sync window and interval
//! - Weather provider and cache lifetimes
//! - Hardware parameters
//!
//! Configuration is stored at `~/.config/smart-alarm/config.toml`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::data_dir;
use crate::alarm::UndatedOneShot;
use crate::error::ConfigError;

/// Clock display format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    H24,
    #[serde(rename = "12h")]
    H12,
}

impl TimeFormat {
    /// strftime pattern for hour and minute.
    pub fn pattern(&self) -> &'static str {
        match self {
            TimeFormat::H24 => "%H:%M",
            TimeFormat::H12 => "%I:%M %p",
        }
    }
}

/// Process-wide sound and light settings used when an alarm fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSettings {
    #[serde(default = "default_sound")]
    pub default_sound: String,
    #[serde(default = "default_true")]
    pub light_enabled: bool,
    #[serde(default = "default_pattern")]
    pub light_pattern: String,
    #[serde(default)]
    pub time_format: TimeFormat,
    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: PathBuf,
    /// What a one-shot alarm without a date does.
    #[serde(default)]
    pub undated_one_shot: UndatedOneShot,
    #[serde(default = "default_snooze")]
    pub snooze_minutes: u32,
}

/// Calendar sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_5")]
    pub sync_interval_min: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    /// How long before an event start its reminder rings.
    #[serde(default = "default_lead")]
    pub reminder_lead_min: u32,
    #[serde(default = "default_calendar_url")]
    pub base_url: String,
}

/// Weather provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Falls back to the WEATHER_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_current_ttl")]
    pub current_ttl_min: u32,
    #[serde(default = "default_5")]
    pub alerts_ttl_min: u32,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

/// LED strip and audio player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default = "default_led_count")]
    pub led_count: usize,
    #[serde(default = "default_player")]
    pub player_command: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/smart-alarm/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub alarm: AlarmSettings,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

// Default functions
fn default_sound() -> String {
    "standard_alarm.mp3".into()
}
fn default_true() -> bool {
    true
}
fn default_pattern() -> String {
    "default".into()
}
fn default_sounds_dir() -> PathBuf {
    PathBuf::from("sounds")
}
fn default_snooze() -> u32 {
    5
}
fn default_5() -> u32 {
    5
}
fn default_window_days() -> u32 {
    7
}
fn default_max_results() -> u32 {
    10
}
fn default_lead() -> u32 {
    15
}
fn default_calendar_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_location() -> String {
    "auto:ip".into()
}
fn default_weather_url() -> String {
    "http://api.weatherapi.com/v1".into()
}
fn default_current_ttl() -> u32 {
    15
}
fn default_forecast_days() -> u32 {
    3
}
fn default_led_count() -> usize {
    8
}
fn default_player() -> String {
    "mpg123".into()
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            default_sound: default_sound(),
            light_enabled: true,
            light_pattern: default_pattern(),
            time_format: TimeFormat::H24,
            sounds_dir: default_sounds_dir(),
            undated_one_shot: UndatedOneShot::Daily,
            snooze_minutes: default_snooze(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            sync_interval_min: 5,
            window_days: default_window_days(),
            max_results: default_max_results(),
            reminder_lead_min: default_lead(),
            base_url: default_calendar_url(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            location: default_location(),
            base_url: default_weather_url(),
            current_ttl_min: default_current_ttl(),
            alerts_ttl_min: 5,
            forecast_days: default_forecast_days(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            led_count: default_led_count(),
            player_command: default_player(),
        }
    }
}

impl CalendarConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.sync_interval_min))
    }

    pub fn window(&self) -> Duration {
        Duration::days(i64::from(self.window_days))
    }

    pub fn reminder_lead(&self) -> Duration {
        Duration::minutes(i64::from(self.reminder_lead_min))
    }
}

impl WeatherConfig {
    /// Configured key, or WEATHER_API_KEY from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("WEATHER_API_KEY").ok())
    }

    pub fn current_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.current_ttl_min))
    }

    pub fn alerts_ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.alerts_ttl_min))
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|d| d.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("~/.config/smart-alarm"),
                message: e.to_string(),
            })
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing the default if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some(String::new()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    /// Restore defaults and save.
    pub fn reset() -> Result<Self, ConfigError> {
        let cfg = Self::default();
        cfg.save()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.alarm.default_sound, "standard_alarm.mp3");
        assert!(cfg.alarm.light_enabled);
        assert_eq!(cfg.alarm.light_pattern, "default");
        assert_eq!(cfg.alarm.time_format, TimeFormat::H24);
        assert_eq!(cfg.alarm.snooze_minutes, 5);
        assert_eq!(cfg.calendar.sync_interval_min, 5);
        assert_eq!(cfg.calendar.window_days, 7);
        assert_eq!(cfg.calendar.max_results, 10);
        assert_eq!(cfg.calendar.reminder_lead_min, 15);
        assert_eq!(cfg.weather.current_ttl_min, 15);
        assert_eq!(cfg.weather.alerts_ttl_min, 5);
        assert_eq!(cfg.hardware.led_count, 8);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let cfg: Config = toml::from_str("[alarm]\ntime_format = \"12h\"\n").unwrap();
        assert_eq!(cfg.alarm.time_format, TimeFormat::H12);
        assert_eq!(cfg.alarm.default_sound, "standard_alarm.mp3");
        assert_eq!(cfg.weather.location, "auto:ip");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("alarm.light_enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("alarm.time_format").as_deref(), Some("24h"));
        assert_eq!(cfg.get("calendar.window_days").as_deref(), Some("7"));
        assert!(cfg.get("alarm.missing_key").is_none());
    }

    #[test]
    fn apply_updates_typed_values() {
        let mut cfg = Config::default();
        cfg.apply("alarm.light_enabled", "false").unwrap();
        cfg.apply("alarm.time_format", "12h").unwrap();
        cfg.apply("weather.forecast_days", "5").unwrap();
        assert!(!cfg.alarm.light_enabled);
        assert_eq!(cfg.alarm.time_format, TimeFormat::H12);
        assert_eq!(cfg.weather.forecast_days, 5);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("alarm.nonexistent", "x"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn apply_rejects_wrong_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.apply("alarm.light_enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            cfg.apply("alarm.time_format", "13h"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_from_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[alarm\nbroken").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn time_format_patterns() {
        assert_eq!(TimeFormat::H24.pattern(), "%H:%M");
        assert_eq!(TimeFormat::H12.pattern(), "%I:%M %p");
    }
}
