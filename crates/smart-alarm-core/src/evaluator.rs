//! Alarm trigger evaluation.
//!
//! [`AlarmContext`] owns everything one device needs to decide whether to ring:
//! its alarm registry, its calendar feed and its settings. There is no global
//! state; each device gets its own context.
//!
//! ## Firing rules
//!
//! Evaluated once per tick at instant `now`, in `now`'s time zone:
//!
//! 1. Sync the calendar if it was never synced or the last sync is older than
//!    the sync interval. Failures keep the old snapshot.
//! 2. Enabled alarms, in registry order: fire when hour and minute match and
//!    the recurrence allows today. First match wins.
//! 3. Calendar events with a reminder: fire when `start - lead` has the same
//!    hour and minute as `now`.
//!
//! Matching is per minute, so a caller ticking every second sees `true` for
//! the whole matching minute and must deduplicate itself.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alarm::AlarmRegistry;
use crate::calendar::CalendarFeed;
use crate::storage::AlarmSettings;

/// Sound and light configuration handed to the hardware when an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmFireConfig {
    pub sound_file: String,
    pub light_enabled: bool,
    pub light_pattern: String,
}

impl From<&AlarmSettings> for AlarmFireConfig {
    fn from(settings: &AlarmSettings) -> Self {
        Self {
            sound_file: settings.default_sound.clone(),
            light_enabled: settings.light_enabled,
            light_pattern: settings.light_pattern.clone(),
        }
    }
}

/// Why an evaluation fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FireReason {
    Alarm { id: String },
    Reminder { event_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpcomingKind {
    Alarm,
    Calendar,
}

/// One row of the "coming up" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingItem {
    pub title: String,
    /// `at` rendered with the configured time format.
    pub time: String,
    pub at: DateTime<Utc>,
    pub kind: UpcomingKind,
}

pub struct AlarmContext {
    registry: AlarmRegistry,
    calendar: CalendarFeed,
    settings: AlarmSettings,
}

impl AlarmContext {
    pub fn new(registry: AlarmRegistry, calendar: CalendarFeed, settings: AlarmSettings) -> Self {
        Self {
            registry,
            calendar,
            settings,
        }
    }

    pub fn registry(&self) -> &AlarmRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AlarmRegistry {
        &mut self.registry
    }

    pub fn calendar(&self) -> &CalendarFeed {
        &self.calendar
    }

    pub fn calendar_mut(&mut self) -> &mut CalendarFeed {
        &mut self.calendar
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: AlarmSettings) {
        info!("updated alarm settings");
        self.settings = settings;
    }

    /// Whether anything should ring at `now`.
    pub fn should_fire<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> bool {
        self.evaluate(now).is_some()
    }

    /// Like [`AlarmContext::should_fire`], reporting what matched.
    pub fn evaluate<Tz: TimeZone>(&mut self, now: &DateTime<Tz>) -> Option<FireReason> {
        self.calendar.refresh_if_stale(now);

        let local = now.naive_local();
        let undated = self.settings.undated_one_shot;
        if let Some(alarm) = self
            .registry
            .enabled()
            .find(|a| a.fires_at(&local, undated))
        {
            debug!(id = %alarm.id, "alarm time matched");
            return Some(FireReason::Alarm {
                id: alarm.id.clone(),
            });
        }

        let lead = self.calendar.reminder_lead();
        let tz = now.timezone();
        self.calendar
            .events()
            .iter()
            .filter(|e| e.has_reminder)
            .find(|e| {
                e.start
                    .in_zone(&tz)
                    .is_some_and(|start| same_minute(&(start - lead), now))
            })
            .map(|e| {
                debug!(event_id = %e.id, "calendar reminder matched");
                FireReason::Reminder {
                    event_id: e.id.clone(),
                }
            })
    }

    /// Process-wide sound and light defaults.
    pub fn current_fire_config(&self) -> AlarmFireConfig {
        AlarmFireConfig::from(&self.settings)
    }

    /// Defaults overridden by the matched alarm's own sound and pattern.
    pub fn fire_config_for(&self, reason: &FireReason) -> AlarmFireConfig {
        let mut config = self.current_fire_config();
        if let FireReason::Alarm { id } = reason {
            if let Some(alarm) = self.registry.get(id) {
                if let Some(sound) = &alarm.sound {
                    config.sound_file = sound.clone();
                }
                if let Some(pattern) = &alarm.light_pattern {
                    config.light_pattern = pattern.clone();
                }
            }
        }
        config
    }

    /// Enabled alarms still ahead today plus future calendar events, soonest
    /// first, at most `limit` of them.
    ///
    /// Ordering uses the real instant, so calendar events on later days sort
    /// after everything happening today.
    pub fn upcoming_events<Tz>(&self, now: &DateTime<Tz>, limit: usize) -> Vec<UpcomingItem>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let tz = now.timezone();
        let today = now.date_naive();
        let now_time = now.time();
        let pattern = self.settings.time_format.pattern();

        let alarms = self.registry.enabled().filter_map(|alarm| {
            let time = alarm.time.to_naive_time();
            if time <= now_time {
                return None;
            }
            let at = tz.from_local_datetime(&today.and_time(time)).earliest()?;
            Some(UpcomingItem {
                title: alarm.title.clone(),
                time: at.format(pattern).to_string(),
                at: at.with_timezone(&Utc),
                kind: UpcomingKind::Alarm,
            })
        });

        let events = self.calendar.events().iter().filter_map(|event| {
            let start = event.start.in_zone(&tz)?;
            if start <= *now {
                return None;
            }
            Some(UpcomingItem {
                title: event.title.clone(),
                time: start.format(pattern).to_string(),
                at: start.with_timezone(&Utc),
                kind: UpcomingKind::Calendar,
            })
        });

        let mut upcoming: Vec<UpcomingItem> = alarms.chain(events).collect();
        upcoming.sort_by_key(|item| item.at);
        upcoming.truncate(limit);
        upcoming
    }
}

fn same_minute<A: Timelike, B: Timelike>(a: &A, b: &B) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{AlarmDefinition, DayName, TimeOfDay, UndatedOneShot};
    use crate::error::FetchError;
    use crate::sources::{CalendarEvent, CalendarSource, EventStart};
    use crate::storage::{CalendarConfig, TimeFormat};
    use chrono::{FixedOffset, NaiveDate};

    struct StaticCalendar(Vec<CalendarEvent>);

    impl CalendarSource for StaticCalendar {
        fn list_upcoming(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _max: u32,
        ) -> Result<Vec<CalendarEvent>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct DownCalendar;

    impl CalendarSource for DownCalendar {
        fn list_upcoming(
            &self,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
            _max: u32,
        ) -> Result<Vec<CalendarEvent>, FetchError> {
            Err(FetchError::Network("connection refused".into()))
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn time(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn context(alarms: Vec<AlarmDefinition>) -> AlarmContext {
        AlarmContext::new(
            AlarmRegistry::from_definitions(alarms),
            CalendarFeed::disabled(CalendarConfig::default()),
            AlarmSettings::default(),
        )
    }

    fn with_events(events: Vec<CalendarEvent>) -> AlarmContext {
        AlarmContext::new(
            AlarmRegistry::new(),
            CalendarFeed::new(Box::new(StaticCalendar(events)), CalendarConfig::default()),
            AlarmSettings::default(),
        )
    }

    fn standup() -> CalendarEvent {
        CalendarEvent {
            id: "evt-1".into(),
            title: "Standup".into(),
            start: EventStart::At(utc("2024-01-10T08:00:00Z")),
            description: String::new(),
            has_reminder: true,
        }
    }

    #[test]
    fn monday_alarm_fires_only_in_its_minute() {
        let mut ctx = context(vec![AlarmDefinition::weekly(
            "1",
            "Work",
            time("07:00"),
            [DayName::Monday],
        )]);
        // 2024-01-08 is a Monday
        assert!(ctx.should_fire(&utc("2024-01-08T07:00:00Z")));
        assert!(ctx.should_fire(&utc("2024-01-08T07:00:59Z")));
        assert!(!ctx.should_fire(&utc("2024-01-08T07:01:00Z")));
        assert!(!ctx.should_fire(&utc("2024-01-09T07:00:00Z")));
    }

    #[test]
    fn evaluation_uses_the_wall_clock_of_now() {
        let mut ctx = context(vec![AlarmDefinition::weekly(
            "1",
            "Work",
            time("07:00"),
            [DayName::Monday],
        )]);
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let local = utc("2024-01-07T22:00:00Z").with_timezone(&tokyo);
        assert!(ctx.should_fire(&local));
    }

    #[test]
    fn disabled_alarm_never_fires() {
        let mut alarm = AlarmDefinition::weekly("1", "Off", time("07:00"), [DayName::Monday]);
        alarm.enabled = false;
        let mut ctx = context(vec![alarm]);
        assert!(!ctx.should_fire(&utc("2024-01-08T07:00:00Z")));
    }

    #[test]
    fn dated_one_shot_fires_on_its_date_only() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut ctx = context(vec![AlarmDefinition::once("1", "Dentist", time("09:30"), Some(date))]);
        assert!(ctx.should_fire(&utc("2024-03-01T09:30:10Z")));
        assert!(!ctx.should_fire(&utc("2024-03-02T09:30:10Z")));
    }

    #[test]
    fn undated_one_shot_follows_policy() {
        let mut ctx = context(vec![AlarmDefinition::once("1", "Nap", time("14:00"), None)]);
        assert!(ctx.should_fire(&utc("2024-05-05T14:00:00Z")));
        assert!(ctx.should_fire(&utc("2024-05-06T14:00:00Z")));

        let mut settings = AlarmSettings::default();
        settings.undated_one_shot = UndatedOneShot::Never;
        ctx.set_settings(settings);
        assert!(!ctx.should_fire(&utc("2024-05-06T14:00:00Z")));
    }

    #[test]
    fn first_matching_alarm_is_reported() {
        let mut ctx = context(vec![
            AlarmDefinition::weekly("a", "First", time("07:00"), [DayName::Monday]),
            AlarmDefinition::weekly("b", "Second", time("07:00"), [DayName::Monday]),
        ]);
        assert_eq!(
            ctx.evaluate(&utc("2024-01-08T07:00:00Z")),
            Some(FireReason::Alarm { id: "a".into() })
        );
    }

    #[test]
    fn calendar_reminder_fires_fifteen_minutes_early() {
        let mut ctx = with_events(vec![standup()]);
        assert_eq!(
            ctx.evaluate(&utc("2024-01-10T07:45:00Z")),
            Some(FireReason::Reminder {
                event_id: "evt-1".into()
            })
        );
        assert!(!ctx.should_fire(&utc("2024-01-10T07:46:00Z")));
        assert!(!ctx.should_fire(&utc("2024-01-10T08:00:00Z")));
    }

    #[test]
    fn events_without_reminder_are_ignored() {
        let mut event = standup();
        event.has_reminder = false;
        let mut ctx = with_events(vec![event]);
        assert!(!ctx.should_fire(&utc("2024-01-10T07:45:00Z")));
    }

    #[test]
    fn calendar_outage_does_not_stop_manual_alarms() {
        let mut ctx = AlarmContext::new(
            AlarmRegistry::from_definitions([AlarmDefinition::weekly(
                "1",
                "Work",
                time("07:00"),
                [DayName::Monday],
            )]),
            CalendarFeed::new(Box::new(DownCalendar), CalendarConfig::default()),
            AlarmSettings::default(),
        );
        assert!(!ctx.should_fire(&utc("2024-01-08T06:59:00Z")));
        assert!(ctx.should_fire(&utc("2024-01-08T07:00:00Z")));
        assert!(ctx.calendar().events().is_empty());
    }

    #[test]
    fn fire_config_reflects_settings_and_alarm_overrides() {
        let mut alarm = AlarmDefinition::weekly("1", "Work", time("07:00"), [DayName::Monday]);
        alarm.sound = Some("birds.mp3".into());
        let ctx = context(vec![alarm]);

        let defaults = ctx.current_fire_config();
        assert_eq!(defaults.sound_file, "standard_alarm.mp3");
        assert!(defaults.light_enabled);
        assert_eq!(defaults.light_pattern, "default");

        let config = ctx.fire_config_for(&FireReason::Alarm { id: "1".into() });
        assert_eq!(config.sound_file, "birds.mp3");
        assert_eq!(config.light_pattern, "default");
    }

    #[test]
    fn upcoming_merges_and_sorts_by_instant() {
        let mut ctx = AlarmContext::new(
            AlarmRegistry::from_definitions([
                AlarmDefinition::weekly("1", "Late", time("22:00"), [DayName::Wednesday]),
                AlarmDefinition::weekly("2", "Past", time("05:00"), [DayName::Wednesday]),
            ]),
            CalendarFeed::new(
                Box::new(StaticCalendar(vec![
                    CalendarEvent {
                        id: "tomorrow".into(),
                        title: "Breakfast".into(),
                        start: EventStart::At(utc("2024-01-11T07:00:00Z")),
                        description: String::new(),
                        has_reminder: false,
                    },
                    standup(),
                ])),
                CalendarConfig::default(),
            ),
            AlarmSettings::default(),
        );
        let now = utc("2024-01-10T06:00:00Z");
        ctx.should_fire(&now);

        let upcoming = ctx.upcoming_events(&now, 5);
        let titles: Vec<_> = upcoming.iter().map(|u| u.title.as_str()).collect();
        assert_eq!(titles, ["Standup", "Late", "Breakfast"]);
        assert_eq!(upcoming[0].time, "08:00");
        assert_eq!(upcoming[0].kind, UpcomingKind::Calendar);
        assert_eq!(upcoming[1].kind, UpcomingKind::Alarm);

        assert_eq!(ctx.upcoming_events(&now, 2).len(), 2);
    }

    #[test]
    fn upcoming_uses_twelve_hour_format() {
        let mut ctx = context(vec![AlarmDefinition::weekly(
            "1",
            "Evening",
            time("19:30"),
            [DayName::Monday],
        )]);
        let mut settings = AlarmSettings::default();
        settings.time_format = TimeFormat::H12;
        ctx.set_settings(settings);

        let upcoming = ctx.upcoming_events(&utc("2024-01-08T12:00:00Z"), 5);
        assert_eq!(upcoming[0].time, "07:30 PM");
    }
}
