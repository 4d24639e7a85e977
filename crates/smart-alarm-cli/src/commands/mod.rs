pub mod alarm;
pub mod auth;
pub mod check;
pub mod config;
pub mod device;
pub mod run;
pub mod upcoming;
pub mod weather;

use smart_alarm_core::sources::google::ACCESS_TOKEN_KEY;
use smart_alarm_core::sources::{credentials, GoogleCalendarSource};
use smart_alarm_core::{AlarmContext, AlarmStore, CalendarFeed, Config};
use tracing::{info, warn};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Calendar feed backed by Google when a token is stored, otherwise disabled.
pub fn calendar_feed(config: &Config) -> CalendarFeed {
    match credentials::get(ACCESS_TOKEN_KEY) {
        Ok(Some(_)) => match GoogleCalendarSource::from_keyring(&config.calendar.base_url) {
            Ok(source) => return CalendarFeed::new(Box::new(source), config.calendar.clone()),
            Err(e) => warn!(error = %e, "calendar client unavailable"),
        },
        Ok(None) => info!("no calendar token stored, calendar reminders disabled"),
        Err(e) => warn!(error = %e, "keyring unavailable, calendar reminders disabled"),
    }
    CalendarFeed::disabled(config.calendar.clone())
}

/// Evaluation context from the stored alarms and current configuration.
pub fn load_context(config: &Config) -> Result<AlarmContext, Box<dyn std::error::Error>> {
    let registry = AlarmStore::open()?.load_registry()?;
    Ok(AlarmContext::new(
        registry,
        calendar_feed(config),
        config.alarm.clone(),
    ))
}
