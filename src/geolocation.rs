use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeolocationError {
    #[error("Geolocation is not supported")]
    Unsupported,

    #[error("Permission to read the position was denied")]
    PermissionDenied,

    #[error("Position is unavailable")]
    PositionUnavailable,

    #[error("Timed out after {0:?} waiting for a position")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
        }
    }
}

/// A single-shot source of the device position
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError>;
}

/// Device with a known, configured position
#[derive(Debug, Clone)]
pub struct FixedLocator {
    position: Coordinates,
}

impl FixedLocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for FixedLocator {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        Ok(self.position)
    }
}

/// Outcome of a browser-side position request, as posted by the client
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PositionReport {
    Fixed { latitude: f64, longitude: f64 },
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
}

#[async_trait]
impl Geolocator for PositionReport {
    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> Result<Coordinates, GeolocationError> {
        match *self {
            PositionReport::Fixed {
                latitude,
                longitude,
            } => {
                let at = Coordinates::new(latitude, longitude);
                if at.is_valid() {
                    Ok(at)
                } else {
                    Err(GeolocationError::PositionUnavailable)
                }
            }
            PositionReport::PermissionDenied => Err(GeolocationError::PermissionDenied),
            PositionReport::PositionUnavailable => Err(GeolocationError::PositionUnavailable),
            PositionReport::Timeout => Err(GeolocationError::Timeout(options.timeout)),
            PositionReport::Unsupported => Err(GeolocationError::Unsupported),
        }
    }
}

/// Ask for the position once, waiting at most `options.timeout`.
///
/// A missing locator means the capability does not exist at all.
pub async fn locate_once(
    locator: Option<&dyn Geolocator>,
    options: &PositionOptions,
) -> Result<Coordinates, GeolocationError> {
    let locator = locator.ok_or(GeolocationError::Unsupported)?;

    tracing::debug!(
        high_accuracy = options.high_accuracy,
        timeout_ms = options.timeout.as_millis() as u64,
        "Requesting device position"
    );

    tokio::time::timeout(options.timeout, locator.current_position(options))
        .await
        .map_err(|_| GeolocationError::Timeout(options.timeout))?
}
