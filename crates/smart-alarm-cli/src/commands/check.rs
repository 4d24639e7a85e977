use chrono::{DateTime, Local};
use serde::Serialize;
use smart_alarm_core::{AlarmFireConfig, Config, FireReason};

use super::{load_context, print_json, CliResult};

#[derive(Serialize)]
struct CheckReport {
    at: String,
    fire: bool,
    reason: Option<FireReason>,
    config: Option<AlarmFireConfig>,
}

pub fn run(at: Option<String>) -> CliResult {
    let config = Config::load_or_default();
    let mut ctx = load_context(&config)?;

    let now = match at {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)?,
        None => Local::now().fixed_offset(),
    };
    let reason = ctx.evaluate(&now);
    let fire_config = reason.as_ref().map(|r| ctx.fire_config_for(r));
    print_json(&CheckReport {
        at: now.to_rfc3339(),
        fire: reason.is_some(),
        reason,
        config: fire_config,
    })
}
