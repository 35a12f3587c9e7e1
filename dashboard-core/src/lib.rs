//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstraction over the weather provider (OpenWeather)
//! - Shared domain models (conditions, forecast, air quality)
//! - Derived display values (icons, labels, backgrounds, forecast windows)
//! - The dashboard controller driving refresh cycles and view state
//!
//! It is used by `dashboard-cli`, but can also back other front ends.

pub mod config;
pub mod controller;
pub mod display;
pub mod model;
pub mod provider;

pub use config::Config;
pub use controller::{
    DashboardController, DashboardError, DashboardSnapshot, FETCH_FAILED_MESSAGE,
    RefreshOutcome, Status,
};
pub use display::{Direction, HourlyWindow, IconKind};
pub use model::{
    AirQualitySample, Coordinates, CurrentConditions, ForecastEntry, ForecastSeries,
    WeatherBundle,
};
pub use provider::{ProviderError, WeatherProvider};
