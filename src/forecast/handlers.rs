use axum::{extract::State, http::StatusCode, Json};
use thiserror::Error;

use super::models::ForecastQuery;
use super::service::ForecastError;
use super::view::ForecastView;
use crate::error::HttpError;
use crate::extractors::{CityParam, CoordinatesParam, TimezoneParam};
use crate::impl_into_response;
use crate::AppState;

#[derive(Error, Debug)]
pub enum ForecastRequestError {
    #[error("Please enter a valid city name.")]
    MissingCity,

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}

impl HttpError for ForecastRequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCity => StatusCode::BAD_REQUEST,
            Self::Forecast(e) => e.status_code(),
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::MissingCity => Some("INVALID_CITY"),
            Self::Forecast(e) => e.error_code(),
        }
    }
}

impl_into_response!(ForecastRequestError);

/// Grouped forecast for a city
///
/// GET /forecast?city=London or GET /forecast/{city}, with an optional `timezone`
pub async fn get_forecast(
    State(state): State<AppState>,
    CityParam(city): CityParam,
    TimezoneParam(zone): TimezoneParam,
) -> Result<Json<ForecastView>, ForecastRequestError> {
    let city = city.ok_or(ForecastRequestError::MissingCity)?;

    let result = state
        .forecast_source
        .get_forecast(&ForecastQuery::City(city), zone)
        .await?;
    Ok(Json(ForecastView::from(&result)))
}

/// Grouped forecast for a coordinate pair
///
/// GET /forecast/coords?lat=51.5&lon=-0.12&timezone=Europe/London
pub async fn get_forecast_by_coordinates(
    State(state): State<AppState>,
    CoordinatesParam(at): CoordinatesParam,
    TimezoneParam(zone): TimezoneParam,
) -> Result<Json<ForecastView>, ForecastRequestError> {
    let result = state
        .forecast_source
        .get_forecast(&ForecastQuery::Coordinates(at), zone)
        .await?;
    Ok(Json(ForecastView::from(&result)))
}
