use chrono::format::{Item, StrftimeItems};
use config::{Case, Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::forecast::DisplayZone;
use crate::geolocation::{Coordinates, PositionOptions};
use crate::map::{MapSettings, MarkerAssets};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// OpenWeatherMap API key. Requests fail at call time without it.
    #[serde(default)]
    pub openweathermap_api_key: Option<String>,

    /// Base URL of the OpenWeatherMap 2.5 API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Outbound request timeout
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Upper bound on live sessions; the least recently seen is evicted beyond it
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Label formatting
    #[serde(default)]
    pub display: DisplayConfig,

    /// Map scene configuration
    #[serde(default)]
    pub map: MapConfig,

    /// Device position source
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// IANA time zone used for day and time labels when the client sends none;
    /// process-local when unset
    #[serde(default)]
    pub timezone: Option<String>,

    /// strftime pattern for slot time labels. The default is 24-hour ("15:00");
    /// use "%I:%M %p" for a 12-hour clock ("03:00 PM").
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: None,
            time_format: default_time_format(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapConfig {
    #[serde(default = "default_initial_lat")]
    pub initial_lat: f64,

    #[serde(default = "default_initial_lon")]
    pub initial_lon: f64,

    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: u8,

    /// Zoom used when a marker is placed
    #[serde(default = "default_focus_zoom")]
    pub focus_zoom: u8,

    #[serde(default = "default_tile_url")]
    pub tile_url: String,

    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,

    #[serde(default = "default_attribution")]
    pub attribution: String,

    /// Marker icon assets handed to the map client
    #[serde(default)]
    pub markers: MarkerAssets,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_lat: default_initial_lat(),
            initial_lon: default_initial_lon(),
            initial_zoom: default_initial_zoom(),
            focus_zoom: default_focus_zoom(),
            tile_url: default_tile_url(),
            max_zoom: default_max_zoom(),
            attribution: default_attribution(),
            markers: MarkerAssets::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeolocationConfig {
    /// Fixed device latitude; geolocation is unsupported unless both are set
    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default = "default_geolocation_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub high_accuracy: bool,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            timeout_secs: default_geolocation_timeout_secs(),
            high_accuracy: true,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_api_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_session_idle_secs() -> u64 {
    60 * 60
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

fn default_initial_lat() -> f64 {
    20.0
}

fn default_initial_lon() -> f64 {
    78.0
}

fn default_initial_zoom() -> u8 {
    4
}

fn default_focus_zoom() -> u8 {
    12
}

fn default_tile_url() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string()
}

fn default_max_zoom() -> u8 {
    19
}

fn default_attribution() -> String {
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
        .to_string()
}

fn default_geolocation_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .set_default("api_base_url", default_api_base_url())?
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config.local").required(false))
            // Override with environment variables (prefixed with WEATHCARE_)
            .add_source(
                Environment::with_prefix("WEATHCARE")
                    .prefix_separator("_")
                    .separator("__")
                    .convert_case(Case::Snake)
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if StrftimeItems::new(&self.display.time_format).any(|item| item == Item::Error) {
            return Err(ConfigError::Message(format!(
                "display.time_format is not a valid strftime pattern: {}",
                self.display.time_format
            )));
        }
        self.display_zone()?;
        Ok(())
    }

    /// Time zone used for day buckets and slot labels
    pub fn display_zone(&self) -> Result<DisplayZone, ConfigError> {
        match &self.display.timezone {
            None => Ok(DisplayZone::Local),
            Some(name) => name
                .parse::<chrono_tz::Tz>()
                .map(DisplayZone::Named)
                .map_err(|_| ConfigError::Message(format!("Unknown display.timezone: {name}"))),
        }
    }

    pub fn map_settings(&self) -> MapSettings {
        MapSettings {
            initial_center: Coordinates::new(self.map.initial_lat, self.map.initial_lon),
            initial_zoom: self.map.initial_zoom,
            focus_zoom: self.map.focus_zoom,
            tile_url: self.map.tile_url.clone(),
            max_zoom: self.map.max_zoom,
            attribution: self.map.attribution.clone(),
        }
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.geolocation.high_accuracy,
            timeout: std::time::Duration::from_secs(self.geolocation.timeout_secs),
        }
    }

    /// Configured device position, when both coordinates are present
    pub fn fixed_position(&self) -> Option<Coordinates> {
        match (self.geolocation.latitude, self.geolocation.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }
}
