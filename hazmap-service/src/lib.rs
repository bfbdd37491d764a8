//! hazmap Service Library
//!
//! HTTP handlers, router and shared state for the hazard analysis service.
//! This library is used by both the hazmap-service binary and integration tests.

pub mod gate;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use hazmap::SpatialStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use gate::StoreGate;
pub use handlers::{ApiError, ErrorResponse, HealthResponse, LayerSummaryResponse};

/// Service settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub max_concurrent_queries: usize,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_concurrent_queries: 8,
            acquire_timeout: Duration::from_millis(5_000),
            statement_timeout: Duration::from_millis(30_000),
        }
    }
}

impl ServiceConfig {
    /// Read settings from environment variables, keeping the default for any
    /// variable that is unset or unparsable.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `HAZMAP_PORT` | HTTP server port | 8080 |
    /// | `HAZMAP_MAX_CONCURRENT_QUERIES` | Analyses running at once | 8 |
    /// | `HAZMAP_ACQUIRE_TIMEOUT_MS` | Wait for a free slot | 5000 |
    /// | `HAZMAP_STATEMENT_TIMEOUT_MS` | Longest single analysis | 30000 |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        Self {
            port: parsed("HAZMAP_PORT")
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(defaults.port),
            max_concurrent_queries: parsed("HAZMAP_MAX_CONCURRENT_QUERIES")
                .and_then(|v| usize::try_from(v).ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_concurrent_queries),
            acquire_timeout: parsed("HAZMAP_ACQUIRE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.acquire_timeout),
            statement_timeout: parsed("HAZMAP_STATEMENT_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.statement_timeout),
        }
    }

    /// A store gate with these limits.
    pub fn gate(&self) -> StoreGate {
        StoreGate::new(
            self.max_concurrent_queries,
            self.acquire_timeout,
            self.statement_timeout,
        )
    }
}

/// Application state shared across handlers.
pub struct AppState {
    /// Every loaded layer.
    pub store: Arc<SpatialStore>,
    /// Concurrency and timeout limits for analyses.
    pub gate: StoreGate,
}

impl AppState {
    pub fn new(store: SpatialStore, config: &ServiceConfig) -> Self {
        Self {
            store: Arc::new(store),
            gate: config.gate(),
        }
    }
}

/// OpenAPI documentation for the hazmap service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "hazmap Hazard Analysis Service",
        version = "0.1.0",
        description = "REST API for flood, fire, earthquake and accessibility analyses over GIS layers.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::health_check,
        handlers::list_layers,
        handlers::get_layer,
        handlers::flood_exposure,
        handlers::wildfire_hotspots,
        handlers::road_disruption_impact,
        handlers::closest_road,
        handlers::closest_settlement,
        handlers::closest_river,
        handlers::closest_local_unit,
        handlers::closest_district,
        handlers::list_admin_units,
        handlers::earthquake_impact,
        handlers::infrastructure_accessibility,
        handlers::risk_profiler,
        handlers::multi_hazard_exposure,
        handlers::aqi_vulnerability,
        handlers::earthquake_intensity,
        handlers::flash_flood_warning,
        handlers::accessibility,
        handlers::evacuation_planning,
        handlers::vulnerability_profiling,
        handlers::river_morphology,
    ),
    components(
        schemas(
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::LayerSummaryResponse,
        )
    ),
    tags(
        (name = "hazard", description = "Flood, fire and road hazard endpoints"),
        (name = "query", description = "Nearest-feature lookups"),
        (name = "spatial", description = "Composite spatial analyses"),
        (name = "layers", description = "Raw layer access"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the service router with docs, tracing and CORS layers.
pub fn app(state: Arc<AppState>) -> Router {
    use handlers::*;

    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .route("/layers", get(list_layers))
        .route("/api/layers/:layer", get(get_layer))
        .route("/api/hazard/flood-exposure", get(flood_exposure))
        .route("/api/hazard/wildfire-hotspots", get(wildfire_hotspots))
        .route("/api/hazard/road-disruption-impact", get(road_disruption_impact))
        .route("/api/query/closest-road", get(closest_road))
        .route("/api/query/closest-settlement", get(closest_settlement))
        .route("/api/query/closest-river", get(closest_river))
        .route("/api/query/closest-local-unit", get(closest_local_unit))
        .route("/api/query/closest-district", get(closest_district))
        .route("/api/spatial/list-admin-units", get(list_admin_units))
        .route("/api/spatial/earthquake-impact", post(earthquake_impact))
        .route(
            "/api/spatial/infrastructure-accessibility",
            post(infrastructure_accessibility),
        )
        .route("/api/spatial/risk-profiler", post(risk_profiler))
        .route("/api/spatial/multi-hazard-exposure", post(multi_hazard_exposure))
        .route("/api/spatial/aqi-vulnerability", post(aqi_vulnerability))
        .route("/api/spatial/earthquake-intensity", get(earthquake_intensity))
        .route("/api/spatial/flash-flood-warning", get(flash_flood_warning))
        .route("/api/spatial/accessibility", get(accessibility))
        .route("/api/spatial/evacuation-planning", get(evacuation_planning))
        .route("/api/spatial/vulnerability-profiling", get(vulnerability_profiling))
        .route("/api/spatial/river-morphology", get(river_morphology))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> ServiceConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(config(&[]), ServiceConfig::default());
    }

    #[test]
    fn test_config_overrides() {
        let c = config(&[
            ("HAZMAP_PORT", "9000"),
            ("HAZMAP_MAX_CONCURRENT_QUERIES", "2"),
            ("HAZMAP_ACQUIRE_TIMEOUT_MS", "250"),
            ("HAZMAP_STATEMENT_TIMEOUT_MS", "1000"),
        ]);
        assert_eq!(c.port, 9000);
        assert_eq!(c.max_concurrent_queries, 2);
        assert_eq!(c.acquire_timeout, Duration::from_millis(250));
        assert_eq!(c.statement_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_config_ignores_bad_values() {
        let c = config(&[
            ("HAZMAP_PORT", "99999"),
            ("HAZMAP_MAX_CONCURRENT_QUERIES", "0"),
            ("HAZMAP_ACQUIRE_TIMEOUT_MS", "soon"),
        ]);
        assert_eq!(c, ServiceConfig::default());
    }
}
