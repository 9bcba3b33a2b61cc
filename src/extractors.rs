use axum::{
    extract::{FromRequestParts, Path, Query},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::error::ErrorResponse;
use crate::forecast::DisplayZone;
use crate::geolocation::Coordinates;

#[derive(Debug, Deserialize)]
struct CityQuery {
    city: Option<String>,
}

/// City taken from the path, falling back to the `city` query parameter.
///
/// The value is trimmed; blank input counts as absent.
#[derive(Debug)]
pub struct CityParam(pub Option<String>);

impl<S> FromRequestParts<S> for CityParam
where
    S: Send + Sync,
{
    type Rejection = ParamRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let from_path = Path::<String>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|Path(city)| city);

        let city = match from_path {
            Some(city) => Some(city),
            None => Query::<CityQuery>::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|Query(query)| query.city),
        };

        Ok(CityParam(
            city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct CoordinatesQuery {
    lat: f64,
    lon: f64,
}

/// `lat` and `lon` query parameters, range-checked
#[derive(Debug)]
pub struct CoordinatesParam(pub Coordinates);

impl<S> FromRequestParts<S> for CoordinatesParam
where
    S: Send + Sync,
{
    type Rejection = ParamRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<CoordinatesQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ParamRejection(e.body_text()))?;

        let coordinates = Coordinates::new(query.lat, query.lon);
        if !coordinates.is_valid() {
            return Err(ParamRejection(format!(
                "Coordinates out of range: {}, {}",
                query.lat, query.lon
            )));
        }

        Ok(CoordinatesParam(coordinates))
    }
}

#[derive(Debug, Deserialize)]
struct TimezoneQuery {
    timezone: Option<String>,
}

/// Viewer's IANA zone from the `timezone` query parameter.
///
/// Absent or blank means the service default; an unknown name is rejected.
#[derive(Debug)]
pub struct TimezoneParam(pub Option<DisplayZone>);

impl<S> FromRequestParts<S> for TimezoneParam
where
    S: Send + Sync,
{
    type Rejection = ParamRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<TimezoneQuery>::from_request_parts(parts, state)
            .await
            .map_err(|e| ParamRejection(e.body_text()))?;

        let name = match query.timezone.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(TimezoneParam(None)),
        };

        name.parse::<chrono_tz::Tz>()
            .map(|tz| TimezoneParam(Some(DisplayZone::Named(tz))))
            .map_err(|_| ParamRejection(format!("Unknown time zone: {name}")))
    }
}

/// Rejection for malformed request parameters
#[derive(Debug)]
pub struct ParamRejection(pub String);

impl IntoResponse for ParamRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(self.0))).into_response()
    }
}
