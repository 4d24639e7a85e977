//! End-to-end alarm flow: persisted definitions through evaluation and the driver.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use smart_alarm_core::{
    AlarmContext, AlarmDefinition, AlarmDriver, AlarmSettings, AlarmStore, CalendarConfig,
    CalendarFeed, Config, DayName, DriverState, Event, HardwareSink, NotFoundError,
};
use tempfile::tempdir;

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[derive(Clone, Default)]
struct CountingSink(Arc<Mutex<(u32, u32)>>);

impl HardwareSink for CountingSink {
    fn play_sound(&mut self, _sound: &str) {
        self.0.lock().unwrap().0 += 1;
    }
    fn stop_sound(&mut self) {
        self.0.lock().unwrap().1 += 1;
    }
    fn start_light(&mut self, _pattern: &str) {}
    fn stop_light(&mut self) {}
}

#[test]
fn stored_alarms_drive_the_evaluator() {
    let dir = tempdir().unwrap();
    let store = AlarmStore::open_at(&dir.path().join("alarms.db")).unwrap();

    store
        .save(&AlarmDefinition::weekly(
            "1",
            "Work",
            "07:00".parse().unwrap(),
            [DayName::Monday, DayName::Wednesday],
        ))
        .unwrap();
    store
        .save(&AlarmDefinition::once(
            "2",
            "Flight",
            "05:15".parse().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 9),
        ))
        .unwrap();

    // reopen to prove persistence
    drop(store);
    let store = AlarmStore::open_at(&dir.path().join("alarms.db")).unwrap();
    let registry = store.load_registry().unwrap();
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.list()[0].id, "1");

    let mut ctx = AlarmContext::new(
        registry,
        CalendarFeed::disabled(CalendarConfig::default()),
        AlarmSettings::default(),
    );
    assert!(ctx.should_fire(&ts("2024-01-10T07:00:00Z")));
    assert!(ctx.should_fire(&ts("2024-01-09T05:15:00Z")));
    assert!(!ctx.should_fire(&ts("2024-01-16T05:15:00Z")));

    ctx.registry_mut().toggle("1", false).unwrap();
    assert!(!ctx.should_fire(&ts("2024-01-10T07:00:00Z")));
    assert_eq!(
        ctx.registry_mut().toggle("nope", true),
        Err(NotFoundError::Alarm("nope".into()))
    );
}

#[test]
fn driver_runs_a_morning() {
    let config = Config::default();
    let registry = smart_alarm_core::AlarmRegistry::from_definitions([AlarmDefinition::weekly(
        "1",
        "Work",
        "07:00".parse().unwrap(),
        [DayName::Monday],
    )]);
    let ctx = AlarmContext::new(
        registry,
        CalendarFeed::disabled(config.calendar.clone()),
        config.alarm.clone(),
    );
    let sink = CountingSink::default();
    let counts = sink.0.clone();
    let mut driver = AlarmDriver::new(ctx, Box::new(sink));

    let mut events = Vec::new();
    let start = ts("2024-01-08T06:59:00Z");
    for s in 0..180 {
        let now = start + chrono::Duration::seconds(s);
        if let Some(e) = driver.tick(&now) {
            events.push(e);
        }
        if now == ts("2024-01-08T07:00:30Z") {
            events.extend(driver.snooze(now));
        }
    }
    // snoozed at 07:00:30 for 5 minutes, so still snoozed at 07:01:59
    assert_eq!(driver.state(), DriverState::Snoozed);
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::AlarmTriggered { .. }));
    assert!(matches!(events[1], Event::AlarmSnoozed { .. }));

    let wake = ts("2024-01-08T07:05:30Z");
    assert!(matches!(driver.tick(&wake), Some(Event::SnoozeElapsed { .. })));
    assert!(matches!(driver.dismiss(wake), Some(Event::AlarmDismissed { .. })));

    let (plays, stops) = *counts.lock().unwrap();
    assert_eq!(plays, 2);
    assert_eq!(stops, 2);
}
