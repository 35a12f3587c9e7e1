use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions for the queried city, metric units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub temperature_c: f64,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: u8,
    pub pressure_hpa: u32,
    pub wind_speed_mps: f64,
    pub wind_direction_deg: u16,
    pub visibility_m: u32,
    pub sunrise: i64,
    pub sunset: i64,
    /// Primary condition code, e.g. "Rain" or "Clear".
    pub condition: String,
    pub description: String,
    /// Shift from UTC in seconds for the queried location.
    pub timezone_offset_secs: i32,
}

/// One 3-hour forecast point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// Provider timestamp, "YYYY-MM-DD HH:MM:SS".
    pub timestamp: String,
    pub temperature_c: f64,
    pub condition: String,
    /// Rain volume over the last 3 hours, mm.
    pub rain_3h_mm: Option<f64>,
}

/// Forecast points ordered by time ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub entries: Vec<ForecastEntry>,
}

impl ForecastSeries {
    pub fn new(entries: Vec<ForecastEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Pollutant concentrations in µg/m³.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub pm2_5: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub co: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualitySample {
    /// Provider AQI category, 1 (good) to 5 (very poor).
    pub aqi: i64,
    pub components: Pollutants,
}

/// Result of one complete refresh cycle. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub current: CurrentConditions,
    pub forecast: ForecastSeries,
    pub air_quality: AirQualitySample,
}
