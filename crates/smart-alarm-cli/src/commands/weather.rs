use clap::Subcommand;
use smart_alarm_core::sources::WeatherApiSource;
use smart_alarm_core::{Config, WeatherService};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum WeatherAction {
    /// Current conditions
    Current,
    /// Daily forecast
    Forecast {
        /// Number of days; defaults to weather.forecast_days
        #[arg(long)]
        days: Option<u32>,
    },
    /// Active weather alerts, most severe first
    Alerts,
}

fn service(config: &Config) -> Result<WeatherService, Box<dyn std::error::Error>> {
    let weather = &config.weather;
    let api_key = weather
        .resolved_api_key()
        .ok_or("weather API key not configured (set weather.api_key or WEATHER_API_KEY)")?;
    let source = WeatherApiSource::new(&weather.base_url, &api_key, &weather.location)?;
    Ok(WeatherService::new(Box::new(source), weather.clone()))
}

pub fn run(action: WeatherAction) -> CliResult {
    let config = Config::load_or_default();
    let mut weather = service(&config)?;
    match action {
        WeatherAction::Current => print_json(&weather.current()?)?,
        WeatherAction::Forecast { days } => {
            let days = days.unwrap_or(config.weather.forecast_days);
            print_json(&weather.forecast(days)?)?;
        }
        WeatherAction::Alerts => print_json(&weather.alerts()?)?,
    }
    Ok(())
}
