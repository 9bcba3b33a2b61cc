use axum::{
    routing::{get, post},
    Router,
};

use crate::forecast::handlers as forecast_handlers;
use crate::health;
use crate::openapi::swagger_ui;
use crate::session::handlers as session_handlers;
use crate::AppState;

/// Stateless grouped-forecast routes
fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/forecast", get(forecast_handlers::get_forecast))
        .route(
            "/forecast/coords",
            get(forecast_handlers::get_forecast_by_coordinates),
        )
        .route("/forecast/{city}", get(forecast_handlers::get_forecast))
}

/// Page session routes
fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(session_handlers::create_session))
        .route(
            "/sessions/{id}",
            get(session_handlers::get_session).delete(session_handlers::delete_session),
        )
        .route("/sessions/{id}/search", post(session_handlers::search_city))
        .route("/sessions/{id}/locate", post(session_handlers::search_here))
        .route(
            "/sessions/{id}/position",
            post(session_handlers::search_reported_position),
        )
}

/// Build all API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(forecast_routes())
        .merge(session_routes())
}

/// Build the complete application router
pub fn build_router() -> Router<AppState> {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .merge(swagger_ui())
}
