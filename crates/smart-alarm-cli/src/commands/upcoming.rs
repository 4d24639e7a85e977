use chrono::Local;
use smart_alarm_core::Config;

use super::{load_context, print_json, CliResult};

pub fn run(limit: usize) -> CliResult {
    let config = Config::load_or_default();
    let mut ctx = load_context(&config)?;
    let now = Local::now();
    ctx.calendar_mut().refresh_if_stale(&now);
    print_json(&ctx.upcoming_events(&now, limit))
}
