//! weatherapi.com client.

use chrono::NaiveDate;
use serde_json::Value;

use super::http::{build_url, JsonClient};
use super::{
    sort_by_severity, Condition, CurrentConditions, DailyForecast, Location, WeatherAlert,
    WeatherSource,
};
use crate::error::FetchError;

pub struct WeatherApiSource {
    http: JsonClient,
    base_url: String,
    api_key: String,
    location: String,
}

impl WeatherApiSource {
    pub fn new(base_url: &str, api_key: &str, location: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: JsonClient::new()?,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            location: location.to_string(),
        })
    }

    fn fetch(&self, path: &str, extra: &[(&str, String)]) -> Result<Value, FetchError> {
        let mut params = vec![
            ("key", self.api_key.clone()),
            ("q", self.location.clone()),
        ];
        params.extend_from_slice(extra);
        let url = build_url(&self.base_url, path, &params)?;
        self.http.get_json(url, None)
    }
}

impl WeatherSource for WeatherApiSource {
    fn current_conditions(&self) -> Result<CurrentConditions, FetchError> {
        let data = self.fetch("current.json", &[("aqi", "no".to_string())])?;
        parse_current(&data)
    }

    fn forecast(&self, days: u32) -> Result<Vec<DailyForecast>, FetchError> {
        let data = self.fetch(
            "forecast.json",
            &[("days", days.to_string()), ("aqi", "no".to_string())],
        )?;
        parse_forecast(&data)
    }

    fn active_alerts(&self) -> Result<Vec<WeatherAlert>, FetchError> {
        let data = self.fetch(
            "forecast.json",
            &[("days", "1".to_string()), ("alerts", "yes".to_string())],
        )?;
        parse_alerts(&data)
    }
}

fn field<'a>(v: &'a Value, path: &str) -> Result<&'a Value, FetchError> {
    let mut cur = v;
    for part in path.split('.') {
        cur = cur
            .get(part)
            .ok_or_else(|| FetchError::Parse(format!("missing field '{path}'")))?;
    }
    Ok(cur)
}

fn number(v: &Value, path: &str) -> Result<f64, FetchError> {
    field(v, path)?
        .as_f64()
        .ok_or_else(|| FetchError::Parse(format!("field '{path}' is not a number")))
}

fn text(v: &Value, path: &str) -> Result<String, FetchError> {
    field(v, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| FetchError::Parse(format!("field '{path}' is not a string")))
}

fn condition(v: &Value) -> Result<Condition, FetchError> {
    Ok(Condition {
        text: text(v, "condition.text")?,
        code: field(v, "condition.code")?.as_i64().unwrap_or_default(),
    })
}

pub fn parse_current(data: &Value) -> Result<CurrentConditions, FetchError> {
    let current = field(data, "current")?;
    Ok(CurrentConditions {
        temperature_c: number(current, "temp_c")?,
        humidity: number(current, "humidity")?,
        condition: condition(current)?,
        wind_kph: number(current, "wind_kph")?,
        precip_mm: number(current, "precip_mm")?,
        location: Location {
            name: text(data, "location.name")?,
            region: text(data, "location.region")?,
        },
    })
}

pub fn parse_forecast(data: &Value) -> Result<Vec<DailyForecast>, FetchError> {
    let days = field(data, "forecast.forecastday")?
        .as_array()
        .ok_or_else(|| FetchError::Parse("forecastday is not an array".into()))?;

    days.iter()
        .map(|day| -> Result<DailyForecast, FetchError> {
            let date = text(day, "date")?;
            let summary = field(day, "day")?;
            Ok(DailyForecast {
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| FetchError::Parse(format!("invalid date '{date}': {e}")))?,
                max_temp_c: number(summary, "maxtemp_c")?,
                min_temp_c: number(summary, "mintemp_c")?,
                condition: condition(summary)?,
                chance_of_rain: number(summary, "daily_chance_of_rain")? as u32,
            })
        })
        .collect()
}

pub fn parse_alerts(data: &Value) -> Result<Vec<WeatherAlert>, FetchError> {
    let Some(raw) = data.get("alerts").and_then(|a| a.get("alert")) else {
        return Ok(Vec::new());
    };
    let raw = raw
        .as_array()
        .ok_or_else(|| FetchError::Parse("alerts.alert is not an array".into()))?;

    let opt = |v: &Value, key: &str| v[key].as_str().unwrap_or_default().to_string();
    let mut alerts = raw
        .iter()
        .map(|a| -> Result<WeatherAlert, FetchError> {
            Ok(WeatherAlert {
                headline: text(a, "headline")?,
                severity: opt(a, "severity"),
                urgency: opt(a, "urgency"),
                areas: opt(a, "areas"),
                category: opt(a, "category"),
                event: opt(a, "event"),
                effective: opt(a, "effective"),
                expires: opt(a, "expires"),
                description: opt(a, "desc"),
            })
        })
        .collect::<Result<Vec<_>, FetchError>>()?;

    sort_by_severity(&mut alerts);
    Ok(alerts)
}
