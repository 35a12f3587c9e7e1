//! Dashboard controller: runs refresh cycles against the provider and owns
//! the view state handed to the presentation layer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    Config,
    display::{
        self, AirQualityLabel, BackgroundKey, Direction, HourlyWindow, IconKind,
    },
    model::{ForecastEntry, WeatherBundle},
    provider::{ProviderError, WeatherProvider, provider_from_config},
};

/// The only message ever shown for a failed refresh.
pub const FETCH_FAILED_MESSAGE: &str = "City not found. Please try again.";

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Any failure during a refresh cycle. The cause is kept for logging only.
    #[error("{}", FETCH_FAILED_MESSAGE)]
    FetchFailed(#[from] ProviderError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Blank query; nothing was requested and state is unchanged.
    Ignored,
    Loaded,
    Failed,
    /// A newer refresh started before this one finished; its result was dropped.
    Superseded,
}

/// Read-only view of the dashboard handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub status: Status,
    pub error: Option<String>,
    pub data: Option<WeatherBundle>,
    pub hourly_view: bool,
    pub hourly_window: HourlyWindow,
    /// City of the most recent accepted refresh.
    pub query: Option<String>,
}

impl DashboardSnapshot {
    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn current_icon(&self) -> Option<IconKind> {
        self.data
            .as_ref()
            .map(|d| display::condition_icon(&d.current.condition))
    }

    pub fn air_quality_label(&self) -> Option<AirQualityLabel> {
        self.data
            .as_ref()
            .map(|d| display::air_quality_label(d.air_quality.aqi))
    }

    pub fn background(&self, local_hour: u32) -> Option<BackgroundKey> {
        self.data
            .as_ref()
            .map(|d| display::background_key(&d.current.condition, local_hour))
    }

    pub fn daily_forecast(&self) -> Vec<&ForecastEntry> {
        self.data
            .as_ref()
            .map(|d| display::select_daily_forecast(&d.forecast))
            .unwrap_or_default()
    }

    pub fn hourly_forecast(&self) -> &[ForecastEntry] {
        match &self.data {
            Some(d) => display::select_hourly_window(&d.forecast, self.hourly_window),
            None => &[],
        }
    }

    /// Evaluated over the whole series, whichever view is shown.
    pub fn severe_weather_alert(&self) -> bool {
        self.data
            .as_ref()
            .is_some_and(|d| display::detect_severe_weather_alert(&d.forecast))
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    snapshot: DashboardSnapshot,
    generation: u64,
}

#[derive(Debug)]
pub struct DashboardController {
    provider: Arc<dyn WeatherProvider>,
    state: Mutex<ControllerState>,
}

impl DashboardController {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        let provider = provider_from_config(config)?;
        Ok(Self::new(Arc::from(provider)))
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.lock().snapshot.clone()
    }

    /// Run one refresh cycle for `city`.
    ///
    /// Data, forecast and air quality are committed together or not at all.
    /// Only the most recently started cycle may commit.
    #[instrument(skip(self))]
    pub async fn refresh(&self, city: &str) -> RefreshOutcome {
        let city = city.trim();
        if city.is_empty() {
            debug!("ignoring blank query");
            return RefreshOutcome::Ignored;
        }

        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.snapshot.status = Status::Loading;
            state.snapshot.error = None;
            state.snapshot.query = Some(city.to_string());
            state.generation
        };

        let result = fetch_bundle(self.provider.as_ref(), city).await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, latest = state.generation, "dropping superseded refresh");
            return RefreshOutcome::Superseded;
        }

        match result {
            Ok(bundle) => {
                info!(
                    location = %bundle.current.location_name,
                    forecast_entries = bundle.forecast.len(),
                    "dashboard refreshed"
                );
                state.snapshot.data = Some(bundle);
                state.snapshot.error = None;
                state.snapshot.status = Status::Loaded;
                RefreshOutcome::Loaded
            }
            Err(err) => {
                let DashboardError::FetchFailed(cause) = &err;
                warn!(error = %cause, "refresh failed");
                state.snapshot.data = None;
                state.snapshot.error = Some(err.to_string());
                state.snapshot.status = Status::Errored;
                RefreshOutcome::Failed
            }
        }
    }

    /// Switch between the daily and hourly forecast; returns the new setting.
    pub fn toggle_hourly_view(&self) -> bool {
        let mut state = self.lock();
        state.snapshot.hourly_view = !state.snapshot.hourly_view;
        state.snapshot.hourly_view
    }

    pub fn advance_window(&self, direction: Direction) -> HourlyWindow {
        let mut state = self.lock();
        let window = state.snapshot.hourly_window.advance(direction);
        state.snapshot.hourly_window = window;
        window
    }
}

/// Fetch conditions, then forecast and air quality concurrently.
///
/// Air quality is keyed by the coordinates from the conditions response.
pub async fn fetch_bundle(
    provider: &dyn WeatherProvider,
    city: &str,
) -> Result<WeatherBundle, DashboardError> {
    let current = provider.fetch_current(city).await?;

    let (forecast, air_quality) = tokio::try_join!(
        provider.fetch_forecast(city),
        provider.fetch_air_quality(current.coordinates),
    )?;

    Ok(WeatherBundle {
        current,
        forecast,
        air_quality,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AirQualitySample, Coordinates, CurrentConditions, ForecastSeries, Pollutants,
    };
    use crate::provider::ProviderResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const UNKNOWN_CITY: &str = "Atlantis";

    #[derive(Debug)]
    struct Gate {
        city: String,
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[derive(Debug, Default)]
    struct FakeProvider {
        fail_forecast: bool,
        fail_air_quality: bool,
        calls: AtomicUsize,
        air_quality_coords: Mutex<Option<Coordinates>>,
        gate: Option<Gate>,
    }

    fn conditions(city: &str) -> CurrentConditions {
        CurrentConditions {
            location_name: city.to_string(),
            country: "GB".into(),
            coordinates: Coordinates { lat: 51.5, lon: -0.1 },
            temperature_c: 12.0,
            temp_min_c: 10.0,
            temp_max_c: 14.0,
            feels_like_c: 11.0,
            humidity_pct: 80,
            pressure_hpa: 1012,
            wind_speed_mps: 4.0,
            wind_direction_deg: 240,
            visibility_m: 10_000,
            sunrise: 1_700_000_000,
            sunset: 1_700_030_000,
            condition: "Clouds".into(),
            description: "overcast clouds".into(),
            timezone_offset_secs: 0,
        }
    }

    fn forecast(len: usize) -> ForecastSeries {
        ForecastSeries::new(
            (0..len)
                .map(|i| ForecastEntry {
                    timestamp: format!("entry-{i}"),
                    temperature_c: 10.0,
                    condition: if i == 20 { "Thunderstorm" } else { "Clouds" }.into(),
                    rain_3h_mm: None,
                })
                .collect(),
        )
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn fetch_current(&self, city: &str) -> ProviderResult<CurrentConditions> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = self.gate.as_ref().filter(|g| g.city == city) {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            if city == UNKNOWN_CITY {
                return Err(ProviderError::Status {
                    endpoint: "weather",
                    status: reqwest::StatusCode::NOT_FOUND,
                    body: r#"{"cod":"404","message":"city not found"}"#.into(),
                });
            }
            Ok(conditions(city))
        }

        async fn fetch_forecast(&self, _city: &str) -> ProviderResult<ForecastSeries> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_forecast {
                return Err(ProviderError::MissingData {
                    endpoint: "forecast",
                    what: "entries",
                });
            }
            Ok(forecast(40))
        }

        async fn fetch_air_quality(
            &self,
            coordinates: Coordinates,
        ) -> ProviderResult<AirQualitySample> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.air_quality_coords.lock().unwrap() = Some(coordinates);
            if self.fail_air_quality {
                return Err(ProviderError::MissingData {
                    endpoint: "air_pollution",
                    what: "air quality sample",
                });
            }
            Ok(AirQualitySample {
                aqi: 2,
                components: Pollutants::default(),
            })
        }
    }

    fn controller(provider: FakeProvider) -> (DashboardController, Arc<FakeProvider>) {
        let provider = Arc::new(provider);
        (DashboardController::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn successful_refresh_commits_all_three() {
        let (ctrl, provider) = controller(FakeProvider::default());

        assert_eq!(ctrl.refresh("London").await, RefreshOutcome::Loaded);

        let snap = ctrl.snapshot();
        assert_eq!(snap.status, Status::Loaded);
        assert!(snap.error.is_none());
        let data = snap.data.as_ref().expect("data committed");
        assert_eq!(data.current.location_name, "London");
        assert_eq!(data.forecast.len(), 40);
        assert_eq!(data.air_quality.aqi, 2);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn air_quality_uses_conditions_coordinates() {
        let (ctrl, provider) = controller(FakeProvider::default());

        ctrl.refresh("London").await;

        let coords = provider.air_quality_coords.lock().unwrap().expect("called");
        assert_eq!(coords, Coordinates { lat: 51.5, lon: -0.1 });
    }

    #[tokio::test]
    async fn blank_query_issues_no_request() {
        let (ctrl, provider) = controller(FakeProvider::default());

        for city in ["", "   ", "\t\n"] {
            assert_eq!(ctrl.refresh(city).await, RefreshOutcome::Ignored);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctrl.snapshot(), DashboardSnapshot::default());
    }

    #[tokio::test]
    async fn blank_query_keeps_previous_result() {
        let (ctrl, _) = controller(FakeProvider::default());

        ctrl.refresh("London").await;
        let before = ctrl.snapshot();

        ctrl.refresh("").await;
        assert_eq!(ctrl.snapshot(), before);
    }

    #[tokio::test]
    async fn query_is_trimmed() {
        let (ctrl, _) = controller(FakeProvider::default());

        ctrl.refresh("  Paris  ").await;

        let snap = ctrl.snapshot();
        assert_eq!(snap.query.as_deref(), Some("Paris"));
        assert_eq!(snap.data.expect("loaded").current.location_name, "Paris");
    }

    #[tokio::test]
    async fn unknown_city_fails_whole_cycle() {
        let (ctrl, provider) = controller(FakeProvider::default());

        assert_eq!(ctrl.refresh(UNKNOWN_CITY).await, RefreshOutcome::Failed);

        let snap = ctrl.snapshot();
        assert_eq!(snap.status, Status::Errored);
        assert_eq!(snap.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(snap.data.is_none());
        // Forecast and air quality depend on the conditions call.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_air_quality_clears_everything() {
        let (ctrl, _) = controller(FakeProvider {
            fail_air_quality: true,
            ..Default::default()
        });

        assert_eq!(ctrl.refresh("London").await, RefreshOutcome::Failed);

        let snap = ctrl.snapshot();
        assert_eq!(snap.error.as_deref(), Some(FETCH_FAILED_MESSAGE));
        assert!(snap.data.is_none());
    }

    #[tokio::test]
    async fn failure_after_success_drops_stale_data() {
        let (ctrl, _) = controller(FakeProvider::default());

        ctrl.refresh("London").await;
        assert!(ctrl.snapshot().data.is_some());

        ctrl.refresh(UNKNOWN_CITY).await;
        let snap = ctrl.snapshot();
        assert!(snap.data.is_none());
        assert_eq!(snap.status, Status::Errored);
    }

    #[tokio::test]
    async fn next_refresh_clears_previous_error() {
        let (ctrl, _) = controller(FakeProvider::default());

        ctrl.refresh(UNKNOWN_CITY).await;
        ctrl.refresh("London").await;

        let snap = ctrl.snapshot();
        assert!(snap.error.is_none());
        assert_eq!(snap.status, Status::Loaded);
    }

    #[tokio::test]
    async fn failing_forecast_fails_cycle() {
        let err = fetch_bundle(
            &FakeProvider {
                fail_forecast: true,
                ..Default::default()
            },
            "London",
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), FETCH_FAILED_MESSAGE);
        assert!(matches!(
            err,
            DashboardError::FetchFailed(ProviderError::MissingData { endpoint: "forecast", .. })
        ));
    }

    #[tokio::test]
    async fn superseded_refresh_does_not_overwrite_newer_result() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let provider = FakeProvider {
            gate: Some(Gate {
                city: "Slow".into(),
                entered: entered.clone(),
                release: release.clone(),
            }),
            ..Default::default()
        };
        let ctrl = Arc::new(DashboardController::new(Arc::new(provider)));

        let slow = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.refresh("Slow").await })
        };
        entered.notified().await;
        assert!(ctrl.snapshot().is_loading());

        assert_eq!(ctrl.refresh("Fast").await, RefreshOutcome::Loaded);
        release.notify_one();

        assert_eq!(slow.await.unwrap(), RefreshOutcome::Superseded);
        let snap = ctrl.snapshot();
        assert_eq!(snap.data.expect("loaded").current.location_name, "Fast");
        assert_eq!(snap.query.as_deref(), Some("Fast"));
    }

    #[tokio::test]
    async fn refresh_in_flight_shows_loading_without_stale_error() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let provider = FakeProvider {
            gate: Some(Gate {
                city: "Slow".into(),
                entered: entered.clone(),
                release: release.clone(),
            }),
            ..Default::default()
        };
        let ctrl = Arc::new(DashboardController::new(Arc::new(provider)));

        ctrl.refresh(UNKNOWN_CITY).await;
        assert_eq!(ctrl.snapshot().status, Status::Errored);

        let slow = {
            let ctrl = ctrl.clone();
            tokio::spawn(async move { ctrl.refresh("Slow").await })
        };
        entered.notified().await;

        let snap = ctrl.snapshot();
        assert_eq!(snap.status, Status::Loading);
        assert!(snap.error.is_none());
        assert_eq!(snap.query.as_deref(), Some("Slow"));

        release.notify_one();
        assert_eq!(slow.await.unwrap(), RefreshOutcome::Loaded);
        assert_eq!(ctrl.snapshot().status, Status::Loaded);
    }

    #[test]
    fn fetch_failed_text_matches_user_message() {
        let err = DashboardError::FetchFailed(ProviderError::MissingApiKey);
        assert_eq!(err.to_string(), FETCH_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn projections_follow_loaded_data() {
        let (ctrl, _) = controller(FakeProvider::default());
        ctrl.refresh("London").await;

        let snap = ctrl.snapshot();
        assert_eq!(snap.current_icon(), Some(IconKind::Clouds));
        assert_eq!(snap.air_quality_label().map(|l| l.text), Some("Fair"));
        assert_eq!(snap.daily_forecast().len(), 5);
        assert_eq!(snap.hourly_forecast().len(), 8);
        assert!(snap.severe_weather_alert());
        assert!(snap.background(12).is_some());
    }

    #[test]
    fn projections_are_empty_without_data() {
        let snap = DashboardSnapshot::default();

        assert!(snap.current_icon().is_none());
        assert!(snap.daily_forecast().is_empty());
        assert!(snap.hourly_forecast().is_empty());
        assert!(!snap.severe_weather_alert());
    }

    #[test]
    fn window_paging_clamps_at_both_ends() {
        let (ctrl, _) = controller(FakeProvider::default());

        assert_eq!(ctrl.advance_window(Direction::Backward).start(), 0);
        for _ in 0..10 {
            ctrl.advance_window(Direction::Forward);
        }
        assert_eq!(ctrl.snapshot().hourly_window.start(), 32);
        assert_eq!(ctrl.advance_window(Direction::Backward).start(), 24);
    }

    #[test]
    fn toggle_flips_hourly_view() {
        let (ctrl, _) = controller(FakeProvider::default());

        assert!(ctrl.toggle_hourly_view());
        assert!(!ctrl.toggle_hourly_view());
    }
}
