//! Tick-driven alarm driver.
//!
//! Wraps an [`AlarmContext`] and a [`HardwareSink`]. The driver does not own a
//! thread; the caller invokes [`AlarmDriver::tick`] periodically (once a
//! second in the CLI) and forwards user actions to `dismiss` and `snooze`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Ringing -> (Snoozed -> Ringing)* -> Idle
//! ```
//!
//! The evaluator reports a match for every tick in the matching minute; the
//! driver rings at most once per matching minute.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::evaluator::{AlarmContext, AlarmFireConfig};
use crate::events::Event;
use crate::hardware::HardwareSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverState {
    Idle,
    Ringing,
    Snoozed,
}

pub struct AlarmDriver {
    context: AlarmContext,
    sink: Box<dyn HardwareSink>,
    state: DriverState,
    /// Unix minute of the last fire, for per-minute deduplication.
    last_fired_minute: Option<i64>,
    snoozed_until: Option<DateTime<Utc>>,
    /// Config used for the current ring, reused when a snooze elapses.
    ringing: Option<AlarmFireConfig>,
}

impl AlarmDriver {
    pub fn new(context: AlarmContext, sink: Box<dyn HardwareSink>) -> Self {
        Self {
            context,
            sink,
            state: DriverState::Idle,
            last_fired_minute: None,
            snoozed_until: None,
            ringing: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn snoozed_until(&self) -> Option<DateTime<Utc>> {
        self.snoozed_until
    }

    pub fn context(&self) -> &AlarmContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut AlarmContext {
        &mut self.context
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Evaluate once at `now`. Returns an event when something started
    /// ringing.
    pub fn tick<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Option<Event> {
        let at = now.with_timezone(&Utc);

        if self.state == DriverState::Snoozed
            && self.snoozed_until.is_some_and(|until| at >= until)
        {
            let config = self
                .ringing
                .clone()
                .unwrap_or_else(|| self.context.current_fire_config());
            self.ring(&config);
            self.snoozed_until = None;
            self.state = DriverState::Ringing;
            info!("snooze elapsed, ringing again");
            return Some(Event::SnoozeElapsed { at });
        }

        let reason = self.context.evaluate(now)?;
        let minute = at.timestamp().div_euclid(60);
        if self.last_fired_minute == Some(minute) {
            return None;
        }
        self.last_fired_minute = Some(minute);

        if self.state == DriverState::Ringing {
            debug!(?reason, "already ringing");
            return None;
        }

        let config = self.context.fire_config_for(&reason);
        self.ring(&config);
        self.state = DriverState::Ringing;
        self.snoozed_until = None;
        info!(?reason, sound = %config.sound_file, "alarm triggered");
        let event = Event::AlarmTriggered {
            reason,
            sound: config.sound_file.clone(),
            light_pattern: config.light_enabled.then(|| config.light_pattern.clone()),
            at,
        };
        self.ringing = Some(config);
        Some(event)
    }

    /// Stop sound and light and forget any pending snooze.
    pub fn dismiss(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state == DriverState::Idle {
            return None;
        }
        self.sink.stop_all();
        self.state = DriverState::Idle;
        self.snoozed_until = None;
        self.ringing = None;
        info!("alarm dismissed");
        Some(Event::AlarmDismissed { at: now })
    }

    /// Silence a ringing alarm and ring again after the snooze period.
    pub fn snooze(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.state != DriverState::Ringing {
            return None;
        }
        self.sink.stop_all();
        let until = now + Duration::minutes(i64::from(self.context.settings().snooze_minutes));
        self.state = DriverState::Snoozed;
        self.snoozed_until = Some(until);
        info!(%until, "alarm snoozed");
        Some(Event::AlarmSnoozed { until, at: now })
    }

    /// Stop all output. Used on shutdown.
    pub fn shutdown(&mut self) {
        self.sink.stop_all();
        self.state = DriverState::Idle;
    }

    fn ring(&mut self, config: &AlarmFireConfig) {
        self.sink.play_sound(&config.sound_file);
        if config.light_enabled {
            self.sink.start_light(&config.light_pattern);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmDefinition, AlarmRegistry, DayName};
    use crate::calendar::CalendarFeed;
    use crate::evaluator::FireReason;
    use crate::storage::{AlarmSettings, CalendarConfig};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl RecordingSink {
        fn calls(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl HardwareSink for RecordingSink {
        fn play_sound(&mut self, sound: &str) {
            self.0.lock().unwrap().push(format!("play {sound}"));
        }
        fn stop_sound(&mut self) {
            self.0.lock().unwrap().push("stop sound".into());
        }
        fn start_light(&mut self, pattern: &str) {
            self.0.lock().unwrap().push(format!("light {pattern}"));
        }
        fn stop_light(&mut self) {
            self.0.lock().unwrap().push("stop light".into());
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn driver(settings: AlarmSettings) -> (AlarmDriver, RecordingSink) {
        let registry = AlarmRegistry::from_definitions([AlarmDefinition::weekly(
            "1",
            "Work",
            "07:00".parse().unwrap(),
            [DayName::Monday],
        )]);
        let ctx = AlarmContext::new(
            registry,
            CalendarFeed::disabled(CalendarConfig::default()),
            settings,
        );
        let sink = RecordingSink::default();
        (AlarmDriver::new(ctx, Box::new(sink.clone())), sink)
    }

    #[test]
    fn rings_once_per_matching_minute() {
        let (mut d, sink) = driver(AlarmSettings::default());
        assert!(d.tick(&utc("2024-01-08T06:59:59Z")).is_none());

        let event = d.tick(&utc("2024-01-08T07:00:00Z")).unwrap();
        assert!(matches!(
            event,
            Event::AlarmTriggered { reason: FireReason::Alarm { ref id }, .. } if id == "1"
        ));
        assert!(d.tick(&utc("2024-01-08T07:00:01Z")).is_none());
        assert!(d.tick(&utc("2024-01-08T07:00:59Z")).is_none());
        assert_eq!(d.state(), DriverState::Ringing);
        assert_eq!(sink.calls(), ["play standard_alarm.mp3", "light default"]);
    }

    #[test]
    fn dismiss_stops_hardware() {
        let (mut d, sink) = driver(AlarmSettings::default());
        d.tick(&utc("2024-01-08T07:00:00Z"));

        let event = d.dismiss(utc("2024-01-08T07:00:30Z"));
        assert!(matches!(event, Some(Event::AlarmDismissed { .. })));
        assert_eq!(d.state(), DriverState::Idle);
        assert!(sink.calls().ends_with(&["stop sound".to_string(), "stop light".to_string()]));

        // still inside the matching minute: no re-ring
        assert!(d.tick(&utc("2024-01-08T07:00:40Z")).is_none());
        assert!(d.dismiss(utc("2024-01-08T07:00:50Z")).is_none());
    }

    #[test]
    fn snooze_rings_again_after_interval() {
        let (mut d, sink) = driver(AlarmSettings::default());
        d.tick(&utc("2024-01-08T07:00:00Z"));

        let event = d.snooze(utc("2024-01-08T07:00:10Z")).unwrap();
        assert_eq!(
            event,
            Event::AlarmSnoozed {
                until: utc("2024-01-08T07:05:10Z"),
                at: utc("2024-01-08T07:00:10Z"),
            }
        );
        assert!(d.tick(&utc("2024-01-08T07:05:09Z")).is_none());
        assert!(matches!(
            d.tick(&utc("2024-01-08T07:05:10Z")),
            Some(Event::SnoozeElapsed { .. })
        ));
        assert_eq!(d.state(), DriverState::Ringing);
        let plays = sink.calls().iter().filter(|c| c.starts_with("play")).count();
        assert_eq!(plays, 2);
    }

    #[test]
    fn snooze_requires_ringing() {
        let (mut d, _) = driver(AlarmSettings::default());
        assert!(d.snooze(utc("2024-01-08T06:00:00Z")).is_none());
        assert_eq!(d.state(), DriverState::Idle);
    }

    #[test]
    fn lights_off_skips_light_sequence() {
        let settings = AlarmSettings {
            light_enabled: false,
            ..AlarmSettings::default()
        };
        let (mut d, sink) = driver(settings);
        let event = d.tick(&utc("2024-01-08T07:00:00Z")).unwrap();
        assert!(matches!(event, Event::AlarmTriggered { light_pattern: None, .. }));
        assert_eq!(sink.calls(), ["play standard_alarm.mp3"]);
    }
}
