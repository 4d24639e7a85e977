use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::FireReason;

/// State changes reported by the alarm driver.
/// The CLI prints them as JSON lines; integrations can subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    AlarmTriggered {
        reason: FireReason,
        sound: String,
        /// `None` when lights are disabled.
        light_pattern: Option<String>,
        at: DateTime<Utc>,
    },
    AlarmDismissed {
        at: DateTime<Utc>,
    },
    AlarmSnoozed {
        until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// A snoozed alarm rang again.
    SnoozeElapsed {
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let at: DateTime<Utc> = "2024-01-08T07:00:00Z".parse().unwrap();
        let json = serde_json::to_value(Event::AlarmSnoozed {
            until: at + chrono::Duration::minutes(5),
            at,
        })
        .unwrap();
        assert_eq!(json["type"], "AlarmSnoozed");
        assert_eq!(json["until"], "2024-01-08T07:05:00Z");

        let triggered = Event::AlarmTriggered {
            reason: FireReason::Alarm { id: "1".into() },
            sound: "standard_alarm.mp3".into(),
            light_pattern: Some("pulse".into()),
            at,
        };
        let back: Event =
            serde_json::from_str(&serde_json::to_string(&triggered).unwrap()).unwrap();
        assert_eq!(back, triggered);
    }
}
