mod config;
mod error;
mod extractors;
mod forecast;
mod geolocation;
mod map;
mod openapi;
mod routes;
mod session;

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Json};
use reqwest::Client;
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::forecast::{DayGrouper, ForecastService, ForecastSource};
use crate::geolocation::{FixedLocator, Geolocator, PositionOptions};
use crate::session::{start_session_cleanup_task, SessionStore};

/// Shared HTTP client configuration
const HTTP_CONNECT_TIMEOUT_SECS: u64 = 5;
const HTTP_POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const SESSION_CLEANUP_INTERVAL_SECS: u64 = 5 * 60;

#[derive(Clone)]
pub struct AppState {
    pub forecast_source: Arc<dyn ForecastSource>,
    /// None when this deployment has no position source
    pub locator: Option<Arc<dyn Geolocator>>,
    pub position_options: PositionOptions,
    pub sessions: Arc<SessionStore>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create shared HTTP client with connection pooling
fn create_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
        .pool_idle_timeout(Duration::from_secs(HTTP_POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(10)
        .build()
}

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", err),
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weathcare=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded successfully");

    if config
        .openweathermap_api_key
        .as_deref()
        .is_none_or(str::is_empty)
    {
        tracing::warn!(
            "Missing OpenWeatherMap API key. Set WEATHCARE_OPENWEATHERMAP_API_KEY; forecast requests will fail"
        );
    }

    let http_client = create_http_client(config.http_timeout_secs)?;
    tracing::debug!("Shared HTTP client created");

    let grouper = DayGrouper::new(config.display_zone()?, config.display.time_format.clone());
    let forecast_service = ForecastService::new(
        http_client,
        config.openweathermap_api_key.as_deref(),
        &config.api_base_url,
        grouper,
    );

    let locator: Option<Arc<dyn Geolocator>> = match config.fixed_position() {
        Some(position) => {
            tracing::info!(
                lat = position.latitude,
                lon = position.longitude,
                "Geolocation uses configured position"
            );
            Some(Arc::new(FixedLocator::new(position)))
        }
        None => {
            tracing::info!("No device position configured; only client-reported positions work");
            None
        }
    };

    let sessions = Arc::new(SessionStore::new(
        Duration::from_secs(config.session_idle_secs),
        config.max_sessions,
        config.map_settings(),
        config.map.markers.clone(),
    ));
    start_session_cleanup_task(
        Arc::clone(&sessions),
        Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS),
    );

    let state = AppState {
        forecast_source: Arc::new(forecast_service),
        locator,
        position_options: config.position_options(),
        sessions,
    };

    let app = routes::build_router()
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                // Outbound call plus geolocation wait fit comfortably in 60s
                .timeout(Duration::from_secs(60)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
