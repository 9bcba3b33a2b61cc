use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ErrorResponse;
use crate::forecast::view::{DayView, SlotCard};
use crate::forecast::{CityInfo, ForecastView};
use crate::geolocation::{Coordinates, PositionReport};
use crate::map::{MapScene, MarkerAssets, SceneMarker, TileLayer};
use crate::session::handlers::SearchRequest;
use crate::session::PageSnapshot;

/// OpenAPI documentation for the Weathcare API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weathcare API",
        version = "1.0.0",
        description = "5-day weather forecast viewer backed by OpenWeatherMap. Groups 3-hour forecasts by day and keeps per-visitor page state with a single map marker.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "forecast", description = "Grouped 5 day / 3 hour forecasts"),
        (name = "sessions", description = "Page sessions: search, geolocation, map scene")
    ),
    components(
        schemas(
            ErrorResponse,
            ForecastView,
            DayView,
            SlotCard,
            CityInfo,
            Coordinates,
            PageSnapshot,
            MapScene,
            SceneMarker,
            TileLayer,
            MarkerAssets,
            SearchRequest,
            PositionReport,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
