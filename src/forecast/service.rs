use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use super::grouper::{DayGrouper, DisplayZone, GroupingError};
use super::models::{ForecastEnvelope, ForecastQuery, ForecastResult};
use crate::error::HttpError;
use crate::impl_into_response;

const FORECAST_PATH: &str = "/forecast";
const UNITS: &str = "metric";
const SUCCESS_CODE: &str = "200";

#[derive(Error, Debug)]
pub enum ForecastError {
    #[error("Failed to fetch forecast: {0}")]
    RequestError(#[from] reqwest::Error),

    /// The provider answered with a non-"200" `cod`
    #[error("Provider rejected request ({code}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        code: String,
        message: Option<String>,
    },

    /// The provider answered with an HTTP error and no forecast envelope
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

impl From<GroupingError> for ForecastError {
    fn from(err: GroupingError) -> Self {
        ForecastError::InvalidResponse(err.to_string())
    }
}

impl HttpError for ForecastError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Rejected { code, .. } if code == "404" => StatusCode::NOT_FOUND,
            Self::Rejected { .. } => StatusCode::BAD_GATEWAY,
            Self::RequestError(_) => StatusCode::BAD_GATEWAY,
            Self::ApiError(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Rejected { code, .. } if code == "404" => Some("CITY_NOT_FOUND"),
            Self::Rejected { .. } => Some("PROVIDER_REJECTED"),
            Self::RequestError(_) => Some("REQUEST_ERROR"),
            Self::ApiError(_) => Some("API_ERROR"),
            Self::InvalidResponse(_) => Some("INVALID_RESPONSE"),
        }
    }
}

impl_into_response!(ForecastError);

/// Anything that can produce a grouped forecast for a location
#[async_trait]
pub trait ForecastSource: Send + Sync {
    /// Days and times are labelled in `zone`, or the source's default zone when `None`
    async fn get_forecast(
        &self,
        query: &ForecastQuery,
        zone: Option<DisplayZone>,
    ) -> Result<ForecastResult, ForecastError>;
}

pub struct ForecastService {
    client: Client,
    api_key: String,
    forecast_url: String,
    grouper: DayGrouper,
}

impl ForecastService {
    pub fn new(
        client: Client,
        api_key: Option<&str>,
        base_url: &str,
        grouper: DayGrouper,
    ) -> Self {
        Self {
            client,
            api_key: api_key.unwrap_or_default().to_string(),
            forecast_url: format!("{}{}", base_url.trim_end_matches('/'), FORECAST_PATH),
            grouper,
        }
    }

    /// Fetch the raw 5 day / 3 hour forecast envelope
    pub async fn fetch_envelope(
        &self,
        query: &ForecastQuery,
    ) -> Result<ForecastEnvelope, ForecastError> {
        tracing::debug!(query = %query, "Fetching forecast");

        let mut params = query.location_params();
        params.push(("appid", self.api_key.clone()));
        params.push(("units", UNITS.to_string()));

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!(status = %status, "Received forecast API response");

        let text = response.text().await?;
        let body: Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ForecastError::ApiError(format!("HTTP {status}")));
            }
            Err(e) => return Err(ForecastError::InvalidResponse(e.to_string())),
        };

        match status_code(&body) {
            Some(code) if code == SUCCESS_CODE => serde_json::from_value(body)
                .map_err(|e| ForecastError::InvalidResponse(e.to_string())),
            Some(code) => Err(ForecastError::Rejected {
                code,
                message: body
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            None if !status.is_success() => Err(ForecastError::ApiError(
                body.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {status}")),
            )),
            None => Err(ForecastError::InvalidResponse(
                "missing status code".to_string(),
            )),
        }
    }
}

/// The provider sends `cod` as a string on success and sometimes as a number on error
fn status_code(body: &Value) -> Option<String> {
    match body.get("cod")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ForecastSource for ForecastService {
    async fn get_forecast(
        &self,
        query: &ForecastQuery,
        zone: Option<DisplayZone>,
    ) -> Result<ForecastResult, ForecastError> {
        let envelope = self.fetch_envelope(query).await?;
        let days = self.grouper.group(&envelope.list, zone)?;
        let result = ForecastResult {
            city: envelope.city.into(),
            days,
        };

        tracing::info!(
            city = %result.city.name,
            days = result.days.len(),
            slots = result.slot_count(),
            "Forecast fetched successfully"
        );

        Ok(result)
    }
}
