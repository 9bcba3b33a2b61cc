use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geolocation::Coordinates;

// ============================================================================
// 5 day / 3 hour Forecast API Response (Internal)
// These structs deserialize the raw API response; not all fields are used
// ============================================================================

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastEnvelope {
    pub cod: String,
    #[serde(default)]
    pub cnt: Option<u32>,
    pub list: Vec<ForecastSample>,
    pub city: ProviderCity,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastSample {
    pub dt: i64,
    pub main: MainReadings,
    pub weather: Vec<WeatherCondition>,
    pub clouds: CloudCover,
    pub wind: Wind,
    /// Meters; the provider omits it for some locations
    #[serde(default)]
    pub visibility: Option<f64>,
    /// Probability of precipitation
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub dt_txt: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub feels_like: f64,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    pub pressure: u32,
    pub humidity: u32,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloudCover {
    pub all: u32,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: u32,
    #[serde(default)]
    pub gust: Option<f64>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCity {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default)]
    pub country: String,
    pub coord: ProviderCoord,
    /// Shift in seconds from UTC
    #[serde(default)]
    pub timezone: Option<i32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ProviderCoord {
    pub lat: f64,
    pub lon: f64,
}

// ============================================================================
// Grouped forecast (what the page holds)
// ============================================================================

/// Display-ready form of one forecast sample. Temperatures keep full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySlot {
    pub timestamp: i64,
    pub time: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u32,
    pub visibility_km: Option<f64>,
    pub wind_speed: f64,
    pub wind_deg: u32,
    pub clouds: u32,
    pub description: String,
    pub icon_url: String,
}

/// Day label -> slots, in first-seen day order
pub type DayBuckets = IndexMap<String, Vec<DisplaySlot>>;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CityInfo {
    pub name: String,
    pub country: String,
    pub coordinates: Coordinates,
}

impl From<ProviderCity> for CityInfo {
    fn from(city: ProviderCity) -> Self {
        CityInfo {
            name: city.name,
            country: city.country,
            coordinates: Coordinates::new(city.coord.lat, city.coord.lon),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForecastResult {
    pub city: CityInfo,
    pub days: DayBuckets,
}

impl ForecastResult {
    pub fn slot_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }
}

// ============================================================================
// Request shape
// ============================================================================

/// What a forecast is requested for
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastQuery {
    City(String),
    Coordinates(Coordinates),
}

impl ForecastQuery {
    /// Query parameters identifying the location (without key and units)
    pub fn location_params(&self) -> Vec<(&'static str, String)> {
        match self {
            ForecastQuery::City(name) => vec![("q", name.clone())],
            ForecastQuery::Coordinates(at) => vec![
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
            ],
        }
    }
}

impl std::fmt::Display for ForecastQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForecastQuery::City(name) => write!(f, "{name}"),
            ForecastQuery::Coordinates(at) => write!(f, "{},{}", at.latitude, at.longitude),
        }
    }
}
