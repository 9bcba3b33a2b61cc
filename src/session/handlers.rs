use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{PageSnapshot, Session};
use crate::error::HttpError;
use crate::extractors::TimezoneParam;
use crate::geolocation::PositionReport;
use crate::impl_into_response;
use crate::AppState;
use std::sync::Arc;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),
}

impl HttpError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::NotFound(_) => Some("SESSION_NOT_FOUND"),
        }
    }
}

impl_into_response!(SessionError);

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchRequest {
    #[serde(default)]
    pub city: String,
}

fn lookup(state: &AppState, id: Uuid) -> Result<Arc<Session>, SessionError> {
    state.sessions.get(&id).ok_or(SessionError::NotFound(id))
}

/// Open a page session with an empty forecast and a mounted map
///
/// POST /sessions?timezone=Asia/Kolkata
pub async fn create_session(
    State(state): State<AppState>,
    TimezoneParam(zone): TimezoneParam,
) -> (StatusCode, Json<PageSnapshot>) {
    let session = state.sessions.create(zone);
    (StatusCode::CREATED, Json(session.snapshot()))
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageSnapshot>, SessionError> {
    Ok(Json(lookup(&state, id)?.snapshot()))
}

/// Close a session and release its map
///
/// DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, SessionError> {
    state
        .sessions
        .remove(&id)
        .ok_or(SessionError::NotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search by city name
///
/// POST /sessions/{id}/search {"city": "London"}
pub async fn search_city(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<PageSnapshot>, SessionError> {
    let session = lookup(&state, id)?;
    session
        .search_city(state.forecast_source.as_ref(), &request.city)
        .await;
    Ok(Json(session.snapshot()))
}

/// Search at the position reported by the service's own locator
///
/// POST /sessions/{id}/locate
pub async fn search_here(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageSnapshot>, SessionError> {
    let session = lookup(&state, id)?;
    session
        .search_here(
            state.forecast_source.as_ref(),
            state.locator.as_deref(),
            &state.position_options,
        )
        .await;
    Ok(Json(session.snapshot()))
}

/// Search at a position (or position failure) reported by the browser
///
/// POST /sessions/{id}/position {"status": "fixed", "latitude": 51.5, "longitude": -0.12}
pub async fn search_reported_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(report): Json<PositionReport>,
) -> Result<Json<PageSnapshot>, SessionError> {
    let session = lookup(&state, id)?;
    session
        .search_here(
            state.forecast_source.as_ref(),
            Some(&report),
            &state.position_options,
        )
        .await;
    Ok(Json(session.snapshot()))
}
