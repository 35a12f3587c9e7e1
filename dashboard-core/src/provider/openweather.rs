use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    Config,
    model::{
        AirQualitySample, Coordinates, CurrentConditions, ForecastEntry, ForecastSeries,
        Pollutants,
    },
};

use super::{ProviderError, ProviderResult, WeatherProvider};

const CURRENT_ENDPOINT: &str = "weather";
const FORECAST_ENDPOINT: &str = "forecast";
const AIR_POLLUTION_ENDPOINT: &str = "air_pollution";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> ProviderResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Client)?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let api_key = config.api_key().ok_or(ProviderError::MissingApiKey)?;

        Self::new(
            api_key.to_owned(),
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| ProviderError::Request {
                endpoint,
                source: source.without_url(),
            })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| ProviderError::Request {
                endpoint,
                source: source.without_url(),
            })?;

        debug!(endpoint, %status, bytes = body.len(), "OpenWeather response received");

        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint,
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ProviderError::Parse { endpoint, source })
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    visibility: u32,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwRain {
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwForecastMain,
    weather: Vec<OwWeather>,
    rain: Option<OwRain>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwAqi {
    aqi: i64,
}

#[derive(Debug, Deserialize)]
struct OwComponents {
    pm2_5: f64,
    pm10: f64,
    o3: f64,
    no2: f64,
    co: f64,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAqi,
    components: OwComponents,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirEntry>,
}

impl OwCurrentResponse {
    fn into_model(self) -> ProviderResult<CurrentConditions> {
        let weather = self.weather.into_iter().next().ok_or(ProviderError::MissingData {
            endpoint: CURRENT_ENDPOINT,
            what: "weather condition",
        })?;

        Ok(CurrentConditions {
            location_name: self.name,
            country: self.sys.country,
            coordinates: Coordinates {
                lat: self.coord.lat,
                lon: self.coord.lon,
            },
            temperature_c: self.main.temp,
            temp_min_c: self.main.temp_min,
            temp_max_c: self.main.temp_max,
            feels_like_c: self.main.feels_like,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            wind_speed_mps: self.wind.speed,
            wind_direction_deg: self.wind.deg,
            visibility_m: self.visibility,
            sunrise: self.sys.sunrise,
            sunset: self.sys.sunset,
            condition: weather.main,
            description: weather.description,
            timezone_offset_secs: self.timezone,
        })
    }
}

impl OwForecastResponse {
    fn into_model(self) -> ProviderResult<ForecastSeries> {
        let entries = self
            .list
            .into_iter()
            .map(|entry| {
                let weather = entry.weather.into_iter().next().ok_or(
                    ProviderError::MissingData {
                        endpoint: FORECAST_ENDPOINT,
                        what: "weather condition",
                    },
                )?;

                Ok(ForecastEntry {
                    timestamp: entry.dt_txt,
                    temperature_c: entry.main.temp,
                    condition: weather.main,
                    rain_3h_mm: entry.rain.and_then(|r| r.three_hours),
                })
            })
            .collect::<ProviderResult<Vec<_>>>()?;

        Ok(ForecastSeries::new(entries))
    }
}

impl OwAirResponse {
    fn into_model(self) -> ProviderResult<AirQualitySample> {
        let entry = self.list.into_iter().next().ok_or(ProviderError::MissingData {
            endpoint: AIR_POLLUTION_ENDPOINT,
            what: "air quality sample",
        })?;

        Ok(AirQualitySample {
            aqi: entry.main.aqi,
            components: Pollutants {
                pm2_5: entry.components.pm2_5,
                pm10: entry.components.pm10,
                o3: entry.components.o3,
                no2: entry.components.no2,
                co: entry.components.co,
            },
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn fetch_current(&self, city: &str) -> ProviderResult<CurrentConditions> {
        let parsed: OwCurrentResponse = self
            .get_json(
                CURRENT_ENDPOINT,
                &[("q", city.to_string()), ("units", "metric".to_string())],
            )
            .await?;

        parsed.into_model()
    }

    #[instrument(skip(self))]
    async fn fetch_forecast(&self, city: &str) -> ProviderResult<ForecastSeries> {
        let parsed: OwForecastResponse = self
            .get_json(
                FORECAST_ENDPOINT,
                &[("q", city.to_string()), ("units", "metric".to_string())],
            )
            .await?;

        parsed.into_model()
    }

    #[instrument(skip(self))]
    async fn fetch_air_quality(
        &self,
        coordinates: Coordinates,
    ) -> ProviderResult<AirQualitySample> {
        let parsed: OwAirResponse = self
            .get_json(
                AIR_POLLUTION_ENDPOINT,
                &[
                    ("lat", coordinates.lat.to_string()),
                    ("lon", coordinates.lon.to_string()),
                ],
            )
            .await?;

        parsed.into_model()
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
