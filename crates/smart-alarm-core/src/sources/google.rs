//! Google Calendar v3 read-only event feed.
//!
//! Lists upcoming events on the primary calendar. The OAuth flow that yields
//! the access token is outside this crate; the token is either supplied
//! directly or read from the OS keyring on every request.

use chrono::{DateTime, NaiveDate, Utc};

use super::credentials;
use super::http::{build_url, JsonClient};
use super::{CalendarEvent, CalendarSource, EventStart};
use crate::error::FetchError;

/// Keyring key holding the Google access token.
pub const ACCESS_TOKEN_KEY: &str = "google_access_token";

enum TokenSource {
    Fixed(String),
    Keyring,
}

pub struct GoogleCalendarSource {
    http: JsonClient,
    base_url: String,
    token: TokenSource,
}

impl GoogleCalendarSource {
    pub fn with_token(base_url: &str, token: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new()?,
            base_url: base_url.to_string(),
            token: TokenSource::Fixed(token.into()),
        })
    }

    pub fn from_keyring(base_url: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new()?,
            base_url: base_url.to_string(),
            token: TokenSource::Keyring,
        })
    }

    fn access_token(&self) -> Result<String, FetchError> {
        match &self.token {
            TokenSource::Fixed(token) => Ok(token.clone()),
            TokenSource::Keyring => credentials::get(ACCESS_TOKEN_KEY)
                .map_err(|e| FetchError::Auth(e.to_string()))?
                .ok_or_else(|| FetchError::Auth("no Google access token stored".into())),
        }
    }
}

impl CalendarSource for GoogleCalendarSource {
    fn list_upcoming(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, FetchError> {
        let token = self.access_token()?;
        let url = build_url(
            &self.base_url,
            "calendars/primary/events",
            &[
                ("timeMin", window_start.to_rfc3339()),
                ("timeMax", window_end.to_rfc3339()),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ],
        )?;

        let resp = self.http.get_json(url, Some(&token))?;
        if let Some(err) = resp.get("error") {
            return Err(api_error(err));
        }
        parse_events(&resp)
    }
}

/// Map an `error` object from a response body. Codes outside `u16` read as 0.
fn api_error(err: &serde_json::Value) -> FetchError {
    FetchError::Api {
        status: err["code"]
            .as_u64()
            .and_then(|code| u16::try_from(code).ok())
            .unwrap_or(0),
        message: err["message"].as_str().unwrap_or("unknown error").to_string(),
    }
}

/// Convert an events-list response body into calendar events.
pub fn parse_events(resp: &serde_json::Value) -> Result<Vec<CalendarEvent>, FetchError> {
    let Some(items) = resp.get("items") else {
        return Ok(Vec::new());
    };
    let items = items
        .as_array()
        .ok_or_else(|| FetchError::Parse("items is not an array".into()))?;

    let mut events = Vec::with_capacity(items.len());
    for item in items {
        let start = if let Some(dt) = item["start"]["dateTime"].as_str() {
            let at = DateTime::parse_from_rfc3339(dt)
                .map_err(|e| FetchError::Parse(format!("invalid start '{dt}': {e}")))?;
            EventStart::At(at.with_timezone(&Utc))
        } else if let Some(d) = item["start"]["date"].as_str() {
            let date = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|e| FetchError::Parse(format!("invalid start date '{d}': {e}")))?;
            EventStart::AllDay(date)
        } else {
            return Err(FetchError::Parse("event without start".into()));
        };

        events.push(CalendarEvent {
            id: item["id"].as_str().unwrap_or_default().to_string(),
            title: item["summary"].as_str().unwrap_or("(No title)").to_string(),
            start,
            description: item["description"].as_str().unwrap_or_default().to_string(),
            has_reminder: item["reminders"]["useDefault"].as_bool().unwrap_or(true),
        });
    }
    Ok(events)
}
