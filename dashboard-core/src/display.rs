//! Derived display values: icons, labels, backgrounds, forecast windows and
//! formatting. Everything here is pure; the wall clock is always passed in.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ForecastEntry, ForecastSeries};

/// Forecast points per day at 3-hour resolution.
pub const ENTRIES_PER_DAY: usize = 8;
pub const DAILY_FORECAST_DAYS: usize = 5;
/// Highest hourly window start (the fifth window of a 40-entry series).
pub const MAX_WINDOW_START: usize = ENTRIES_PER_DAY * (DAILY_FORECAST_DAYS - 1);

/// Rain above this volume in 3 hours triggers the severe-weather alert.
pub const HEAVY_RAIN_MM: f64 = 10.0;

pub const ALERT_TITLE: &str = "Weather Alert";
pub const ALERT_MESSAGE: &str = "Severe weather conditions expected in the next few days.";

const FORECAST_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IconKind {
    Rain,
    Clear,
    Clouds,
    Snow,
    Thunderstorm,
    Default,
}

impl IconKind {
    pub fn glyph(&self) -> &'static str {
        match self {
            IconKind::Rain => "🌧",
            IconKind::Clear => "☀",
            IconKind::Clouds => "☁",
            IconKind::Snow => "🌨",
            IconKind::Thunderstorm => "⛈",
            IconKind::Default => "🌥",
        }
    }
}

/// Map a provider condition code to an icon, ignoring case. Drizzle shares the rain icon.
pub fn condition_icon(condition: &str) -> IconKind {
    match condition.to_lowercase().as_str() {
        "rain" | "drizzle" => IconKind::Rain,
        "clear" => IconKind::Clear,
        "clouds" => IconKind::Clouds,
        "snow" => IconKind::Snow,
        "thunderstorm" => IconKind::Thunderstorm,
        _ => IconKind::Default,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Good,
    Fair,
    Moderate,
    Poor,
    VeryPoor,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualityLabel {
    pub text: &'static str,
    pub severity: Severity,
}

/// Map an AQI category to its label. Total: out-of-range values are `Unknown`.
pub fn air_quality_label(aqi: i64) -> AirQualityLabel {
    let (text, severity) = match aqi {
        1 => ("Good", Severity::Good),
        2 => ("Fair", Severity::Fair),
        3 => ("Moderate", Severity::Moderate),
        4 => ("Poor", Severity::Poor),
        5 => ("Very Poor", Severity::VeryPoor),
        _ => ("Unknown", Severity::Unknown),
    };
    AirQualityLabel { text, severity }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackgroundCategory {
    Clear,
    Clouds,
    Rain,
    Snow,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeOfDay {
    Day,
    Night,
}

impl TimeOfDay {
    /// Day covers hours 6 through 17.
    pub fn from_hour(hour: u32) -> Self {
        if (6..18).contains(&hour) {
            TimeOfDay::Day
        } else {
            TimeOfDay::Night
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackgroundKey {
    pub category: BackgroundCategory,
    pub time_of_day: TimeOfDay,
}

impl BackgroundKey {
    /// Photo identifier on the image host.
    pub fn image_id(&self) -> &'static str {
        use BackgroundCategory as C;
        use TimeOfDay::{Day, Night};

        match (self.category, self.time_of_day) {
            (C::Clear, Day) => "photo-1601297183305-6df142704ea2",
            (C::Clear, Night) | (C::Default, Night) => "photo-1532978379970-46e6205a0d48",
            (C::Clouds, _) | (C::Default, Day) => "photo-1534088568595-a066f410bcda",
            (C::Rain, _) => "photo-1519692933481-e162a57d6721",
            (C::Snow, _) => "photo-1491002052546-bf38f186af56",
        }
    }

    pub fn image_url(&self) -> String {
        format!(
            "https://images.unsplash.com/{}?auto=format&fit=crop&w=2000&q=80",
            self.image_id()
        )
    }
}

/// Pick the background for a condition at the given local hour.
///
/// Conditions other than clear, clouds, rain and snow use the default
/// category, which still varies between day and night.
pub fn background_key(condition: &str, local_hour: u32) -> BackgroundKey {
    let category = match condition.to_lowercase().as_str() {
        "clear" => BackgroundCategory::Clear,
        "clouds" => BackgroundCategory::Clouds,
        "rain" => BackgroundCategory::Rain,
        "snow" => BackgroundCategory::Snow,
        _ => BackgroundCategory::Default,
    };

    BackgroundKey {
        category,
        time_of_day: TimeOfDay::from_hour(local_hour),
    }
}

/// One entry per day: positions 0, 8, 16, 24 and 32. Never pads.
pub fn select_daily_forecast(series: &ForecastSeries) -> Vec<&ForecastEntry> {
    series
        .entries
        .iter()
        .step_by(ENTRIES_PER_DAY)
        .take(DAILY_FORECAST_DAYS)
        .collect()
}

/// The slice `[start, start + 8)`, clamped to the series bounds.
pub fn select_hourly_window(series: &ForecastSeries, window: HourlyWindow) -> &[ForecastEntry] {
    let len = series.entries.len();
    let start = window.start().min(len);
    let end = (start + ENTRIES_PER_DAY).min(len);
    &series.entries[start..end]
}

/// True when any entry is a thunderstorm, or rain heavier than [`HEAVY_RAIN_MM`].
pub fn detect_severe_weather_alert(series: &ForecastSeries) -> bool {
    series.entries.iter().any(|entry| {
        entry.condition == "Thunderstorm"
            || (entry.condition == "Rain" && entry.rain_3h_mm.unwrap_or(0.0) > HEAVY_RAIN_MM)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// Start index of the hourly forecast page.
///
/// Always a multiple of 8 within `[0, 32]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "usize")]
pub struct HourlyWindow(usize);

impl From<usize> for HourlyWindow {
    fn from(start: usize) -> Self {
        Self::at(start)
    }
}

impl HourlyWindow {
    /// Rounds down to a page boundary and clamps to the last page.
    pub fn at(start: usize) -> Self {
        let start = start.min(MAX_WINDOW_START);
        Self(start - start % ENTRIES_PER_DAY)
    }

    pub fn start(&self) -> usize {
        self.0
    }

    /// Zero-based page number.
    pub fn page(&self) -> usize {
        self.0 / ENTRIES_PER_DAY
    }

    /// Move one page; a no-op at either end.
    pub fn advance(self, direction: Direction) -> Self {
        match direction {
            Direction::Forward => Self::at(self.0 + ENTRIES_PER_DAY),
            Direction::Backward => Self(self.0.saturating_sub(ENTRIES_PER_DAY)),
        }
    }

    pub fn can_advance(&self) -> bool {
        self.0 < MAX_WINDOW_START
    }

    pub fn can_retreat(&self) -> bool {
        self.0 > 0
    }
}

/// Round half up, so -2.5 becomes -2 rather than -3.
pub fn round_temperature(celsius: f64) -> i64 {
    (celsius + 0.5).floor() as i64
}

pub fn visibility_km(meters: u32) -> f64 {
    f64::from(meters) / 1000.0
}

/// Unix timestamp as a 12-hour clock time at the given UTC offset, e.g. "07:42 AM".
pub fn format_clock_time(unix: i64, offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(offset_secs)?;
    let time = DateTime::from_timestamp(unix, 0)?.with_timezone(&offset);
    Some(time.format("%I:%M %p").to_string())
}

/// Hour of day at the queried location, for [`background_key`].
pub fn local_hour(now: DateTime<Utc>, offset_secs: i32) -> u32 {
    FixedOffset::east_opt(offset_secs)
        .map(|offset| now.with_timezone(&offset).hour())
        .unwrap_or_else(|| now.hour())
}

pub fn parse_forecast_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(timestamp, FORECAST_TIMESTAMP_FORMAT).ok()
}

/// Short weekday of a forecast timestamp, e.g. "Mon".
pub fn format_weekday(timestamp: &str) -> Option<String> {
    parse_forecast_timestamp(timestamp).map(|t| t.format("%a").to_string())
}

/// Hour of a forecast timestamp, e.g. "03 PM".
pub fn format_hour(timestamp: &str) -> Option<String> {
    parse_forecast_timestamp(timestamp).map(|t| t.format("%I %p").to_string())
}
