//! Weather lookups behind a shared refresh cache.
//!
//! Cache keys and lifetimes:
//! - `current`: `weather.current_ttl_min` (15 minutes by default)
//! - `forecast_{days}`: same lifetime as `current`
//! - `alerts`: `weather.alerts_ttl_min` (5 minutes by default)

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::cache::RefreshCache;
use crate::error::FetchError;
use crate::sources::{CurrentConditions, DailyForecast, WeatherAlert, WeatherSource};
use crate::storage::WeatherConfig;

#[derive(Debug, Clone)]
enum WeatherData {
    Current(CurrentConditions),
    Forecast(Vec<DailyForecast>),
    Alerts(Vec<WeatherAlert>),
}

pub struct WeatherService {
    source: Box<dyn WeatherSource>,
    cache: RefreshCache<WeatherData>,
    config: WeatherConfig,
}

fn mismatched(key: &str) -> FetchError {
    FetchError::Parse(format!("cache entry '{key}' holds the wrong kind of data"))
}

impl WeatherService {
    pub fn new(source: Box<dyn WeatherSource>, config: WeatherConfig) -> Self {
        Self {
            source,
            cache: RefreshCache::new(),
            config,
        }
    }

    pub fn current(&mut self) -> Result<CurrentConditions, FetchError> {
        self.current_at(Utc::now())
    }

    pub fn current_at(&mut self, now: DateTime<Utc>) -> Result<CurrentConditions, FetchError> {
        let source = &self.source;
        let data = self
            .cache
            .get_at("current", self.config.current_ttl(), now, || {
                source.current_conditions().map(WeatherData::Current)
            })
            .inspect_err(|e| error!(error = %e, "error fetching current weather"))?;
        match data {
            WeatherData::Current(c) => Ok(c),
            _ => Err(mismatched("current")),
        }
    }

    pub fn forecast(&mut self, days: u32) -> Result<Vec<DailyForecast>, FetchError> {
        self.forecast_at(days, Utc::now())
    }

    pub fn forecast_at(
        &mut self,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<DailyForecast>, FetchError> {
        let key = format!("forecast_{days}");
        let source = &self.source;
        let data = self
            .cache
            .get_at(&key, self.config.current_ttl(), now, || {
                source.forecast(days).map(WeatherData::Forecast)
            })
            .inspect_err(|e| error!(error = %e, days, "error fetching forecast"))?;
        match data {
            WeatherData::Forecast(f) => Ok(f),
            _ => Err(mismatched(&key)),
        }
    }

    /// Active alerts, most severe first.
    pub fn alerts(&mut self) -> Result<Vec<WeatherAlert>, FetchError> {
        self.alerts_at(Utc::now())
    }

    pub fn alerts_at(&mut self, now: DateTime<Utc>) -> Result<Vec<WeatherAlert>, FetchError> {
        let source = &self.source;
        let data = self
            .cache
            .get_at("alerts", self.config.alerts_ttl(), now, || {
                source.active_alerts().map(WeatherData::Alerts)
            })
            .inspect_err(|e| error!(error = %e, "error fetching weather alerts"))?;
        match data {
            WeatherData::Alerts(a) => Ok(a),
            _ => Err(mismatched("alerts")),
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        info!("weather cache cleared");
    }
}
