use crate::{
    Config,
    model::{AirQualitySample, Coordinates, CurrentConditions, ForecastSeries},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;
use thiserror::Error;

pub mod openweather;

/// Errors raised while talking to the weather provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key configured.\nHint: run `weather-dashboard configure` or set OPENWEATHER_API_KEY.")]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport failure. The URL is stripped since it carries the API key.
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse {endpoint} JSON: {source}")]
    Parse {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint} response contained no {what}")]
    MissingData {
        endpoint: &'static str,
        what: &'static str,
    },
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Current conditions keyed by city name.
    async fn fetch_current(&self, city: &str) -> ProviderResult<CurrentConditions>;

    /// 5-day / 3-hour forecast keyed by city name.
    async fn fetch_forecast(&self, city: &str) -> ProviderResult<ForecastSeries>;

    /// Air quality keyed by coordinates; the provider has no city-name form.
    async fn fetch_air_quality(&self, coordinates: Coordinates)
    -> ProviderResult<AirQualitySample>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> ProviderResult<Box<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::from_config(config)?;
    Ok(Box::new(provider))
}
