//! hazmap Service - HTTP microservice for hazard exposure analysis.
//!
//! Loads every GIS layer once at startup and serves flood, fire, earthquake,
//! accessibility and vulnerability analyses over them.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HAZMAP_DATA_DIR` | Directory containing `<layer>.geojson` files | Current directory |
//! | `HAZMAP_METRIC_PROJ` | PROJ.4 string of the metric CRS | UTM zone 45N |
//! | `HAZMAP_PORT` | HTTP server port | 8080 |
//! | `HAZMAP_MAX_CONCURRENT_QUERIES` | Analyses running at once | 8 |
//! | `HAZMAP_ACQUIRE_TIMEOUT_MS` | Wait for a free analysis slot | 5000 |
//! | `HAZMAP_STATEMENT_TIMEOUT_MS` | Longest single analysis | 30000 |
//! | `RUST_LOG` | Log level (e.g., "info", "debug") | "info" |
//!
//! ## Endpoints
//!
//! - `GET /api/hazard/*` - Flood exposure, wildfire hotspots, road disruption
//! - `GET /api/query/closest-*` - Nearest road, settlement, river, local unit, district
//! - `GET|POST /api/spatial/*` - Composite analyses
//! - `GET /layers`, `GET /api/layers/{layer}` - Raw layers
//! - `GET /health` - Health check
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use hazmap::SpatialStoreBuilder;
use hazmap_service::{app, AppState, ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hazmap_service=info,hazmap=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();

    // The library handles HAZMAP_DATA_DIR and HAZMAP_METRIC_PROJ
    let builder = SpatialStoreBuilder::from_env_or(".");
    let store = tokio::task::spawn_blocking(move || builder.build()).await??;

    tracing::info!(
        data_dir = %store.data_dir().display(),
        max_concurrent_queries = config.max_concurrent_queries,
        acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
        statement_timeout_ms = config.statement_timeout.as_millis() as u64,
        port = config.port,
        "Starting hazmap service"
    );

    let state = Arc::new(AppState::new(store, &config));
    let app = app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
