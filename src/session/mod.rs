pub mod handlers;
mod store;

pub use store::{start_session_cleanup_task, SessionStore};

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::forecast::{
    DisplayZone, ForecastError, ForecastQuery, ForecastResult, ForecastSource, ForecastView,
};
use crate::geolocation::{locate_once, Coordinates, GeolocationError, Geolocator, PositionOptions};
use crate::map::{MapController, MapScene, MapSettings, MarkerAssets, SceneMap};

pub const INVALID_CITY: &str = "Please enter a valid city name.";
pub const CITY_NOT_FOUND: &str = "City not found. Please try again.";
pub const CITY_FETCH_FAILED: &str = "Error fetching weather data. Try again later.";
pub const LOCATION_NOT_FOUND: &str = "Location not found. Please try again.";
pub const LOCATION_NETWORK_FAILED: &str =
    "Network or connection error. Check the service logs for details.";
pub const UNREADABLE_FORECAST: &str = "Received an unreadable forecast. Try again later.";
pub const GEOLOCATION_UNSUPPORTED: &str = "Geolocation is not supported on this device.";
pub const GEOLOCATION_FAILED: &str =
    "Unable to retrieve location. Check your location settings.";
pub const HERE_LABEL: &str = "You are here!";

/// How a search or location attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Displayed,
    Failed,
    /// A newer attempt was issued before this one finished
    Superseded,
}

/// What the page currently shows
#[derive(Debug, Serialize, ToSchema)]
pub struct PageSnapshot {
    pub session_id: String,
    /// Sequence number of the latest attempt
    pub revision: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapScene>,
}

struct PageState {
    error: Option<String>,
    forecast: Option<ForecastResult>,
    map: MapController<SceneMap>,
}

/// One visitor's page: error banner, current forecast and map.
///
/// Attempts are numbered; only the most recently issued one may change the page.
/// Forecasts are labelled in the visitor's zone when one was given at creation.
pub struct Session {
    id: Uuid,
    zone: Option<DisplayZone>,
    latest: AtomicU64,
    page: Mutex<PageState>,
}

impl Session {
    pub fn new(settings: MapSettings, assets: MarkerAssets, zone: Option<DisplayZone>) -> Self {
        let mut map = MapController::new(settings, assets);
        map.mount(SceneMap::new);

        Self {
            id: Uuid::new_v4(),
            zone,
            latest: AtomicU64::new(0),
            page: Mutex::new(PageState {
                error: None,
                forecast: None,
                map,
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Search by free-text city name
    pub async fn search_city(&self, source: &dyn ForecastSource, input: &str) -> Outcome {
        let seq = self.begin();
        let city = input.trim();
        if city.is_empty() {
            tracing::warn!(session = %self.id, "Rejected empty city search");
            return self.fail(seq, INVALID_CITY.to_string());
        }

        match source
            .get_forecast(&ForecastQuery::City(city.to_string()), self.zone)
            .await
        {
            Ok(result) => {
                let at = result.city.coordinates;
                let label = result.city.name.clone();
                self.show(seq, result, at, &label)
            }
            Err(e) => {
                tracing::error!(session = %self.id, city = %city, error = %e, "City search failed");
                self.fail(seq, city_failure_message(&e))
            }
        }
    }

    /// Forecast for the device position
    pub async fn search_here(
        &self,
        source: &dyn ForecastSource,
        locator: Option<&dyn Geolocator>,
        options: &PositionOptions,
    ) -> Outcome {
        let seq = self.begin();

        let at = match locate_once(locator, options).await {
            Ok(at) => at,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "Geolocation failed");
                return self.fail(seq, geolocation_failure_message(&e).to_string());
            }
        };

        tracing::debug!(session = %self.id, lat = at.latitude, lon = at.longitude, "Device located");

        match source
            .get_forecast(&ForecastQuery::Coordinates(at), self.zone)
            .await
        {
            Ok(result) => self.show(seq, result, at, HERE_LABEL),
            Err(e) => {
                tracing::error!(session = %self.id, error = %e, "Location search failed");
                self.fail(seq, location_failure_message(&e))
            }
        }
    }

    pub fn snapshot(&self) -> PageSnapshot {
        let page = self.page.lock();
        PageSnapshot {
            session_id: self.id.to_string(),
            revision: self.latest.load(Ordering::SeqCst),
            error: page.error.clone(),
            forecast: page.forecast.as_ref().map(ForecastView::from),
            map: page.map.scene(),
        }
    }

    /// Release the map; the session shows nothing afterwards
    pub fn teardown(&self) {
        let mut page = self.page.lock();
        page.forecast = None;
        page.map.dispose();
    }

    fn begin(&self) -> u64 {
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.page.lock().error = None;
        seq
    }

    fn is_latest(&self, seq: u64) -> bool {
        let latest = self.latest.load(Ordering::SeqCst);
        if latest != seq {
            tracing::debug!(session = %self.id, seq, latest, "Discarding superseded result");
            return false;
        }
        true
    }

    fn show(&self, seq: u64, result: ForecastResult, at: Coordinates, label: &str) -> Outcome {
        let mut page = self.page.lock();
        if !self.is_latest(seq) {
            return Outcome::Superseded;
        }

        page.error = None;
        page.forecast = Some(result);
        if let Err(e) = page.map.place_single_marker(at, label) {
            tracing::warn!(session = %self.id, error = %e, "Could not place marker");
        }
        Outcome::Displayed
    }

    fn fail(&self, seq: u64, message: String) -> Outcome {
        let mut page = self.page.lock();
        if !self.is_latest(seq) {
            return Outcome::Superseded;
        }

        page.forecast = None;
        page.error = Some(message);
        Outcome::Failed
    }
}

fn city_failure_message(err: &ForecastError) -> String {
    match err {
        ForecastError::Rejected { .. } => CITY_NOT_FOUND.to_string(),
        ForecastError::ApiError(message) => format!("API Error: {message}"),
        ForecastError::RequestError(_) => CITY_FETCH_FAILED.to_string(),
        ForecastError::InvalidResponse(_) => UNREADABLE_FORECAST.to_string(),
    }
}

fn location_failure_message(err: &ForecastError) -> String {
    match err {
        ForecastError::Rejected { message, .. } => message
            .clone()
            .unwrap_or_else(|| LOCATION_NOT_FOUND.to_string()),
        ForecastError::ApiError(message) => format!("API Error: {message}"),
        ForecastError::RequestError(_) => LOCATION_NETWORK_FAILED.to_string(),
        ForecastError::InvalidResponse(_) => UNREADABLE_FORECAST.to_string(),
    }
}

fn geolocation_failure_message(err: &GeolocationError) -> &'static str {
    match err {
        GeolocationError::Unsupported => GEOLOCATION_UNSUPPORTED,
        GeolocationError::PermissionDenied
        | GeolocationError::PositionUnavailable
        | GeolocationError::Timeout(_) => GEOLOCATION_FAILED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::fixtures::sunday_evening;
    use crate::forecast::models::{CityInfo, DayBuckets, DisplaySlot};
    use crate::geolocation::{FixedLocator, PositionReport};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tokio::sync::Notify;

    type Reply = Result<ForecastResult, ForecastError>;

    /// Replays canned replies in order and records every query
    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<VecDeque<Reply>>,
        queries: Mutex<Vec<ForecastQuery>>,
    }

    impl ScriptedSource {
        fn replying(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                queries: Mutex::default(),
            }
        }

        fn queries(&self) -> Vec<ForecastQuery> {
            self.queries.lock().clone()
        }
    }

    #[async_trait]
    impl ForecastSource for ScriptedSource {
        async fn get_forecast(&self, query: &ForecastQuery, _zone: Option<DisplayZone>) -> Reply {
            self.queries.lock().push(query.clone());
            self.replies
                .lock()
                .pop_front()
                .expect("no scripted reply left")
        }
    }

    fn forecast(city: &str, lat: f64, lon: f64) -> ForecastResult {
        let mut days = DayBuckets::new();
        days.insert(
            "Sunday, Jan 5".to_string(),
            vec![DisplaySlot {
                timestamp: 1736035200,
                time: "00:00".to_string(),
                temperature: 12.5,
                feels_like: 11.2,
                pressure: 1015,
                humidity: 60,
                visibility_km: Some(10.0),
                wind_speed: 2.0,
                wind_deg: 90,
                clouds: 10,
                description: "clear sky".to_string(),
                icon_url: "https://openweathermap.org/img/wn/01n@2x.png".to_string(),
            }],
        );
        ForecastResult {
            city: CityInfo {
                name: city.to_string(),
                country: "IN".to_string(),
                coordinates: Coordinates::new(lat, lon),
            },
            days,
        }
    }

    fn rejected() -> ForecastError {
        ForecastError::Rejected {
            code: "404".to_string(),
            message: Some("city not found".to_string()),
        }
    }

    fn session() -> Session {
        Session::new(MapSettings::default(), MarkerAssets::default(), None)
    }

    #[tokio::test]
    async fn test_successful_search_shows_forecast_and_marker() {
        let source = ScriptedSource::replying(vec![Ok(forecast("Chennai", 13.08, 80.27))]);
        let session = session();

        let outcome = session.search_city(&source, "  Chennai ").await;

        assert_eq!(outcome, Outcome::Displayed);
        assert_eq!(source.queries(), [ForecastQuery::City("Chennai".to_string())]);
        let snapshot = session.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(
            snapshot.forecast.unwrap().heading,
            "Weather Forecast for Chennai, IN"
        );
        let map = snapshot.map.unwrap();
        assert_eq!(map.center, Coordinates::new(13.08, 80.27));
        assert_eq!(map.zoom, 12);
        assert_eq!(map.markers.len(), 1);
        assert_eq!(map.markers[0].popup, "Chennai");
    }

    #[tokio::test]
    async fn test_empty_city_issues_no_request() {
        let source = ScriptedSource::default();
        let session = session();

        let outcome = session.search_city(&source, "   ").await;

        assert_eq!(outcome, Outcome::Failed);
        assert!(source.queries().is_empty());
        assert_eq!(session.snapshot().error.as_deref(), Some(INVALID_CITY));
    }

    #[tokio::test]
    async fn test_rejected_city_clears_forecast() {
        let source = ScriptedSource::replying(vec![
            Ok(forecast("Chennai", 13.08, 80.27)),
            Err(rejected()),
        ]);
        let session = session();

        session.search_city(&source, "Chennai").await;
        let outcome = session.search_city(&source, "Nowhereville").await;

        assert_eq!(outcome, Outcome::Failed);
        let snapshot = session.snapshot();
        assert!(snapshot.forecast.is_none());
        assert_eq!(snapshot.error.as_deref(), Some(CITY_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_success_replaces_error_and_forecast() {
        let source = ScriptedSource::replying(vec![
            Err(rejected()),
            Ok(forecast("Kochi", 9.93, 76.26)),
        ]);
        let session = session();

        session.search_city(&source, "Kochhi").await;
        session.search_city(&source, "Kochi").await;

        let snapshot = session.snapshot();
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.forecast.unwrap().city.name, "Kochi");
        assert_eq!(snapshot.revision, 2);
    }

    #[tokio::test]
    async fn test_api_error_surfaces_provider_text() {
        let source = ScriptedSource::replying(vec![Err(ForecastError::ApiError(
            "HTTP 503 Service Unavailable".to_string(),
        ))]);
        let session = session();

        session.search_city(&source, "Delhi").await;

        assert_eq!(
            session.snapshot().error.as_deref(),
            Some("API Error: HTTP 503 Service Unavailable")
        );
    }

    #[tokio::test]
    async fn test_location_search_labels_marker_here() {
        let source = ScriptedSource::replying(vec![Ok(forecast("Bengaluru", 12.97, 77.59))]);
        let locator = FixedLocator::new(Coordinates::new(12.9, 77.6));
        let session = session();

        let outcome = session
            .search_here(&source, Some(&locator), &PositionOptions::default())
            .await;

        assert_eq!(outcome, Outcome::Displayed);
        assert_eq!(
            source.queries(),
            [ForecastQuery::Coordinates(Coordinates::new(12.9, 77.6))]
        );
        let map = session.snapshot().map.unwrap();
        assert_eq!(map.markers[0].popup, HERE_LABEL);
        assert_eq!(map.markers[0].position, Coordinates::new(12.9, 77.6));
    }

    #[tokio::test]
    async fn test_geolocation_denied_requests_nothing() {
        let source = ScriptedSource::replying(vec![Ok(forecast("Pune", 18.52, 73.86))]);
        let session = session();
        session.search_city(&source, "Pune").await;

        let outcome = session
            .search_here(
                &source,
                Some(&PositionReport::PermissionDenied),
                &PositionOptions::default(),
            )
            .await;

        assert_eq!(outcome, Outcome::Failed);
        assert_eq!(source.queries().len(), 1);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some(GEOLOCATION_FAILED));
        assert!(snapshot.forecast.is_none());
    }

    #[tokio::test]
    async fn test_geolocation_unsupported() {
        let source = ScriptedSource::default();
        let session = session();

        session
            .search_here(&source, None, &PositionOptions::default())
            .await;

        assert!(source.queries().is_empty());
        assert_eq!(
            session.snapshot().error.as_deref(),
            Some(GEOLOCATION_UNSUPPORTED)
        );
    }

    #[tokio::test]
    async fn test_location_rejection_uses_provider_message() {
        let source = ScriptedSource::replying(vec![
            Err(ForecastError::Rejected {
                code: "400".to_string(),
                message: Some("wrong latitude".to_string()),
            }),
            Err(ForecastError::Rejected {
                code: "400".to_string(),
                message: None,
            }),
        ]);
        let locator = FixedLocator::new(Coordinates::new(0.0, 0.0));
        let session = session();
        let options = PositionOptions::default();

        session.search_here(&source, Some(&locator), &options).await;
        assert_eq!(session.snapshot().error.as_deref(), Some("wrong latitude"));

        session.search_here(&source, Some(&locator), &options).await;
        assert_eq!(
            session.snapshot().error.as_deref(),
            Some(LOCATION_NOT_FOUND)
        );
    }

    /// First request blocks until released; later ones answer at once
    struct GatedSource {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl ForecastSource for GatedSource {
        async fn get_forecast(&self, query: &ForecastQuery, _zone: Option<DisplayZone>) -> Reply {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
            }
            match query {
                ForecastQuery::City(name) => Ok(forecast(name, call as f64, 0.0)),
                ForecastQuery::Coordinates(_) => Err(rejected()),
            }
        }
    }

    #[tokio::test]
    async fn test_stale_result_is_discarded() {
        let source = Arc::new(GatedSource {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let session = Arc::new(session());

        let slow = {
            let source = Arc::clone(&source);
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.search_city(&*source, "Agra").await })
        };
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fresh = session.search_city(&*source, "Jaipur").await;
        source.gate.notify_one();
        let stale = slow.await.unwrap();

        assert_eq!(fresh, Outcome::Displayed);
        assert_eq!(stale, Outcome::Superseded);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.forecast.unwrap().city.name, "Jaipur");
        assert_eq!(snapshot.map.unwrap().markers[0].popup, "Jaipur");
    }

    /// Groups one Sunday-evening sample in whatever zone it is asked for
    struct EveningSource;

    #[async_trait]
    impl ForecastSource for EveningSource {
        async fn get_forecast(&self, query: &ForecastQuery, zone: Option<DisplayZone>) -> Reply {
            match query {
                ForecastQuery::City(name) => sunday_evening(name, Coordinates::new(0.0, 0.0), zone),
                ForecastQuery::Coordinates(at) => sunday_evening("Here", *at, zone),
            }
        }
    }

    #[tokio::test]
    async fn test_sessions_label_days_in_their_own_zone() {
        let utc = Session::new(
            MapSettings::default(),
            MarkerAssets::default(),
            Some(DisplayZone::Named(chrono_tz::UTC)),
        );
        let kolkata = Session::new(
            MapSettings::default(),
            MarkerAssets::default(),
            Some(DisplayZone::Named(chrono_tz::Asia::Kolkata)),
        );

        utc.search_city(&EveningSource, "Delhi").await;
        kolkata.search_city(&EveningSource, "Delhi").await;

        let utc_view = utc.snapshot().forecast.unwrap();
        let utc_day = &utc_view.days[0];
        assert_eq!(utc_day.label, "Sunday, Jan 5");
        assert_eq!(utc_day.slots[0].time, "20:00");

        let kolkata_view = kolkata.snapshot().forecast.unwrap();
        let kolkata_day = &kolkata_view.days[0];
        assert_eq!(kolkata_day.label, "Monday, Jan 6");
        assert_eq!(kolkata_day.slots[0].time, "01:30");
    }

    #[tokio::test]
    async fn test_teardown_releases_map() {
        let source = ScriptedSource::replying(vec![Ok(forecast("Goa", 15.3, 74.1))]);
        let session = session();
        session.search_city(&source, "Goa").await;

        session.teardown();

        let snapshot = session.snapshot();
        assert!(snapshot.map.is_none());
        assert!(snapshot.forecast.is_none());
    }
}
