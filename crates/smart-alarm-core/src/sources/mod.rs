//! External data sources: calendar and weather providers.
//!
//! Sources are pull-style and blocking from the caller's point of view. A slow
//! provider stalls the tick that asked for it.

pub mod credentials;
pub mod google;
mod http;
pub mod weatherapi;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

pub use google::GoogleCalendarSource;
pub use weatherapi::WeatherApiSource;

/// When a calendar event starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventStart {
    At(DateTime<Utc>),
    /// Date-only events start at local midnight.
    AllDay(NaiveDate),
}

impl EventStart {
    /// The start instant expressed in `tz`.
    pub fn in_zone<Tz: TimeZone>(&self, tz: &Tz) -> Option<DateTime<Tz>> {
        match self {
            EventStart::At(at) => Some(at.with_timezone(tz)),
            EventStart::AllDay(date) => tz
                .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
                .earliest(),
        }
    }
}

/// An event pulled from the calendar provider. Replaced wholesale on sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: EventStart,
    pub description: String,
    /// Inherited from the calendar's default-reminder setting.
    pub has_reminder: bool,
}

/// Remote calendar provider.
pub trait CalendarSource: Send {
    /// Events starting in `[window_start, window_end)`, ascending by start,
    /// at most `max_results` of them.
    fn list_upcoming(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub code: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub humidity: f64,
    pub condition: Condition,
    pub wind_kph: f64,
    pub precip_mm: f64,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub max_temp_c: f64,
    pub min_temp_c: f64,
    pub condition: Condition,
    pub chance_of_rain: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub headline: String,
    pub severity: String,
    pub urgency: String,
    pub areas: String,
    pub category: String,
    pub event: String,
    pub effective: String,
    pub expires: String,
    pub description: String,
}

impl WeatherAlert {
    /// Extreme=0, Severe=1, Moderate=2, Minor=3, anything else 999.
    pub fn severity_rank(&self) -> u32 {
        match self.severity.as_str() {
            "Extreme" => 0,
            "Severe" => 1,
            "Moderate" => 2,
            "Minor" => 3,
            _ => 999,
        }
    }
}

/// Stable sort, most severe first.
pub fn sort_by_severity(alerts: &mut [WeatherAlert]) {
    alerts.sort_by_key(WeatherAlert::severity_rank);
}

/// Remote weather provider.
pub trait WeatherSource: Send {
    fn current_conditions(&self) -> Result<CurrentConditions, FetchError>;

    fn forecast(&self, days: u32) -> Result<Vec<DailyForecast>, FetchError>;

    /// Active alerts, most severe first.
    fn active_alerts(&self) -> Result<Vec<WeatherAlert>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn alert(headline: &str, severity: &str) -> WeatherAlert {
        WeatherAlert {
            headline: headline.into(),
            severity: severity.into(),
            urgency: String::new(),
            areas: String::new(),
            category: String::new(),
            event: String::new(),
            effective: String::new(),
            expires: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn alerts_sort_by_rank_and_keep_ties_stable() {
        let mut alerts = vec![
            alert("a", "Minor"),
            alert("b", "Unknown"),
            alert("c", "Extreme"),
            alert("d", "Minor"),
            alert("e", "Severe"),
        ];
        sort_by_severity(&mut alerts);
        let order: Vec<_> = alerts.iter().map(|a| a.headline.as_str()).collect();
        assert_eq!(order, ["c", "e", "a", "d", "b"]);
    }

    #[test]
    fn all_day_start_is_local_midnight() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let start = EventStart::AllDay(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        let local = start.in_zone(&tz).unwrap();
        assert_eq!(local.to_rfc3339(), "2024-01-10T00:00:00+02:00");
    }

    #[test]
    fn timed_start_converts_zone() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let at = DateTime::parse_from_rfc3339("2024-01-10T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let local = EventStart::At(at).in_zone(&tz).unwrap();
        assert_eq!(local.to_rfc3339(), "2024-01-10T03:00:00-05:00");
    }
}
