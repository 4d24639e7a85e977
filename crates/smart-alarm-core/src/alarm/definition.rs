//! Manually configured alarm definitions.
//!
//! Alarms fire on minute granularity: an alarm set for `07:00` matches every
//! instant from `07:00:00` up to `07:00:59.999`.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Hour and minute an alarm rings at. Serialized as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// True when `at` falls inside this hour:minute, ignoring seconds.
    pub fn matches<T: Timelike>(&self, at: &T) -> bool {
        at.hour() == u32::from(self.hour) && at.minute() == u32::from(self.minute)
    }

    pub fn to_naive_time(self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or_default()
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if h.is_empty() || h.len() > 2 || m.len() != 2 || !digits(h) || !digits(m) {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Weekday stored by its lowercase full name (`"monday"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayName {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayName::Monday => "monday",
            DayName::Tuesday => "tuesday",
            DayName::Wednesday => "wednesday",
            DayName::Thursday => "thursday",
            DayName::Friday => "friday",
            DayName::Saturday => "saturday",
            DayName::Sunday => "sunday",
        }
    }
}

impl From<Weekday> for DayName {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayName::Monday,
            Weekday::Tue => DayName::Tuesday,
            Weekday::Wed => DayName::Wednesday,
            Weekday::Thu => DayName::Thursday,
            Weekday::Fri => DayName::Friday,
            Weekday::Sat => DayName::Saturday,
            Weekday::Sun => DayName::Sunday,
        }
    }
}

impl FromStr for DayName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" => Ok(DayName::Monday),
            "tuesday" => Ok(DayName::Tuesday),
            "wednesday" => Ok(DayName::Wednesday),
            "thursday" => Ok(DayName::Thursday),
            "friday" => Ok(DayName::Friday),
            "saturday" => Ok(DayName::Saturday),
            "sunday" => Ok(DayName::Sunday),
            _ => Err(ValidationError::InvalidWeekday(s.to_string())),
        }
    }
}

impl fmt::Display for DayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an alarm repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recurrence {
    /// Rings on one calendar date. Without a date, see [`UndatedOneShot`].
    Once {
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    /// Rings on every listed weekday.
    Weekly { days: BTreeSet<DayName> },
}

/// What a one-shot alarm without a date does once its time matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndatedOneShot {
    /// Ring every day at the alarm time.
    #[default]
    Daily,
    /// Never ring; the alarm is treated as incomplete.
    Never,
}

/// A manually configured alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmDefinition {
    pub id: String,
    #[serde(default = "default_title")]
    pub title: String,
    pub time: TimeOfDay,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub recurrence: Recurrence,
    /// Sound file name, relative to the sounds directory.
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default)]
    pub light_pattern: Option<String>,
}

fn default_title() -> String {
    "Alarm".to_string()
}

fn default_true() -> bool {
    true
}

impl AlarmDefinition {
    /// Recurring alarm on the given days.
    pub fn weekly(
        id: impl Into<String>,
        title: impl Into<String>,
        time: TimeOfDay,
        days: impl IntoIterator<Item = DayName>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            time,
            enabled: true,
            recurrence: Recurrence::Weekly {
                days: days.into_iter().collect(),
            },
            sound: None,
            light_pattern: None,
        }
    }

    /// One-shot alarm, optionally pinned to a date.
    pub fn once(
        id: impl Into<String>,
        title: impl Into<String>,
        time: TimeOfDay,
        date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            time,
            enabled: true,
            recurrence: Recurrence::Once { date },
            sound: None,
            light_pattern: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Weekly { .. })
    }

    /// Whether this alarm rings at local wall-clock time `local`.
    pub fn fires_at(&self, local: &NaiveDateTime, undated: UndatedOneShot) -> bool {
        if !self.enabled || !self.time.matches(local) {
            return false;
        }
        match &self.recurrence {
            Recurrence::Weekly { days } => days.contains(&DayName::from(local.weekday())),
            Recurrence::Once { date: Some(date) } => *date == local.date(),
            Recurrence::Once { date: None } => undated == UndatedOneShot::Daily,
        }
    }
}
