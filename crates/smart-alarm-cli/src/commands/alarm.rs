use chrono::NaiveDate;
use clap::Subcommand;
use smart_alarm_core::{AlarmDefinition, AlarmStore, DayName, NotFoundError, Recurrence, TimeOfDay};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Add an alarm
    Add {
        /// Time of day (HH:MM)
        time: TimeOfDay,
        /// Alarm title
        #[arg(long, default_value = "Alarm")]
        title: String,
        /// Repeat on these days (e.g. monday,friday); one-shot when omitted
        #[arg(long, value_delimiter = ',')]
        days: Vec<DayName>,
        /// Date for a one-shot alarm (YYYY-MM-DD)
        #[arg(long, conflicts_with = "days")]
        date: Option<NaiveDate>,
        /// Explicit id; the next free number is used when omitted
        #[arg(long)]
        id: Option<String>,
        /// Sound file overriding the default
        #[arg(long)]
        sound: Option<String>,
        /// Light pattern overriding the default
        #[arg(long)]
        light_pattern: Option<String>,
    },
    /// List alarms as JSON
    List,
    /// Remove an alarm
    Remove {
        id: String,
    },
    /// Change fields of an existing alarm
    Update {
        id: String,
        #[arg(long)]
        time: Option<TimeOfDay>,
        #[arg(long)]
        title: Option<String>,
        /// Make the alarm recurring on these days
        #[arg(long, value_delimiter = ',')]
        days: Option<Vec<DayName>>,
        /// Make the alarm a one-shot on this date
        #[arg(long, conflicts_with = "days")]
        date: Option<NaiveDate>,
        #[arg(long)]
        sound: Option<String>,
        #[arg(long)]
        light_pattern: Option<String>,
    },
    /// Enable or disable an alarm; flips it when no state is given
    Toggle {
        id: String,
        #[arg(action = clap::ArgAction::Set)]
        enabled: Option<bool>,
    },
}

pub fn run(action: AlarmAction) -> CliResult {
    let store = AlarmStore::open()?;
    match action {
        AlarmAction::Add {
            time,
            title,
            days,
            date,
            id,
            sound,
            light_pattern,
        } => {
            let id = match id {
                Some(id) => id,
                None => store.load_registry()?.next_id(),
            };
            let mut def = if days.is_empty() {
                AlarmDefinition::once(id, title, time, date)
            } else {
                AlarmDefinition::weekly(id, title, time, days)
            };
            def.sound = sound;
            def.light_pattern = light_pattern;
            store.save(&def)?;
            print_json(&def)?;
        }
        AlarmAction::List => {
            let registry = store.load_registry()?;
            print_json(&registry)?;
        }
        AlarmAction::Remove { id } => {
            if !store.delete(&id)? {
                return Err(NotFoundError::Alarm(id).into());
            }
            println!("removed {id}");
        }
        AlarmAction::Update {
            id,
            time,
            title,
            days,
            date,
            sound,
            light_pattern,
        } => {
            let mut def = store
                .get(&id)?
                .ok_or_else(|| NotFoundError::Alarm(id.clone()))?;
            if let Some(time) = time {
                def.time = time;
            }
            if let Some(title) = title {
                def.title = title;
            }
            if let Some(days) = days {
                def.recurrence = Recurrence::Weekly {
                    days: days.into_iter().collect(),
                };
            }
            if date.is_some() {
                def.recurrence = Recurrence::Once { date };
            }
            if sound.is_some() {
                def.sound = sound;
            }
            if light_pattern.is_some() {
                def.light_pattern = light_pattern;
            }
            store.save(&def)?;
            print_json(&def)?;
        }
        AlarmAction::Toggle { id, enabled } => {
            let mut registry = store.load_registry()?;
            let current = registry
                .get(&id)
                .map(|a| a.enabled)
                .ok_or_else(|| NotFoundError::Alarm(id.clone()))?;
            registry.toggle(&id, enabled.unwrap_or(!current))?;
            if let Some(def) = registry.get(&id) {
                store.save(def)?;
                print_json(def)?;
            }
        }
    }
    Ok(())
}
