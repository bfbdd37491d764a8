//! HTTP request handlers for the hazard analysis service.
//!
//! Handlers resolve parameters, hand the analysis to the [`StoreGate`] and
//! serialize the typed result. Every failure becomes `{"error": "..."}` with
//! the status of its [`HazardError`] variant.
//!
//! [`StoreGate`]: crate::StoreGate

use std::collections::HashMap;
use std::sync::Arc;

// Aliased so utoipa's axum_extras does not infer an octet-stream request body
// (it matches the literal type name `Bytes`, which has no `ToSchema`).
use axum::body::Bytes as RawBody;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use geojson::FeatureCollection;
use hazmap::analysis::{
    self, AccessibilityParams, AccessibilityResult, AdminUnitName, AqiVulnerabilityRequest,
    ClosestFeature, ClosestLayer, EarthquakeImpact, EarthquakeImpactRequest, EarthquakeIntensity,
    EarthquakeIntensityParams, EvacuationParams, EvacuationPlan, FlashFloodParams,
    FlashFloodWarning, FloodExposure, FloodExposureParams, InfrastructureAccessRequest,
    MorphologyParams, MorphologyResult, MultiHazardRequest, RiskProfile, RiskProfileRequest,
    RoadDisruptionParams, VulnerabilityParams, VulnerabilityProfiles, WildfireParams,
};
use hazmap::params::{parse_body, AdminUnitType};
use hazmap::{HazardError, QueryParams, SpatialStore};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

/// Error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// One loaded layer.
#[derive(Debug, Serialize, ToSchema)]
pub struct LayerSummaryResponse {
    /// Layer name, as used in `/api/layers/{layer}`.
    pub name: String,
    /// Number of features loaded.
    pub feature_count: usize,
}

/// A [`HazardError`] on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub HazardError);

impl From<HazardError> for ApiError {
    fn from(err: HazardError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HazardError::Validation(_) => StatusCode::BAD_REQUEST,
            HazardError::NotFound(_) => StatusCode::NOT_FOUND,
            HazardError::Upstream(_) => StatusCode::BAD_GATEWAY,
            HazardError::Geometry(_)
            | HazardError::Store(_)
            | HazardError::Io(_)
            | HazardError::InvalidLayer { .. }
            | HazardError::Projection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(status = status.as_u16(), error = %self.0, "Request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Run an analysis through the store gate.
async fn run<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&SpatialStore) -> hazmap::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(state.gate.run(state.store.clone(), work).await?)
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Loaded layers and their feature counts.
#[utoipa::path(
    get,
    path = "/layers",
    tag = "layers",
    responses((status = 200, description = "Layer summaries", body = [LayerSummaryResponse]))
)]
pub async fn list_layers(State(state): State<Arc<AppState>>) -> Json<Vec<LayerSummaryResponse>> {
    Json(
        state
            .store
            .summaries()
            .into_iter()
            .map(|s| LayerSummaryResponse {
                name: s.name,
                feature_count: s.feature_count,
            })
            .collect(),
    )
}

/// Every feature of one layer.
#[utoipa::path(
    get,
    path = "/api/layers/{layer}",
    tag = "layers",
    params(("layer" = String, Path, description = "Layer name, e.g. rivers")),
    responses(
        (status = 200, description = "FeatureCollection of the layer"),
        (status = 400, description = "Unknown layer", body = ErrorResponse)
    )
)]
pub async fn get_layer(
    State(state): State<Arc<AppState>>,
    Path(layer): Path<String>,
) -> ApiResult<FeatureCollection> {
    let fc = run(&state, move |store| store.layer_collection(&layer)).await?;
    Ok(Json(fc))
}

/// Settlements or local units within a buffer of any river.
#[utoipa::path(
    get,
    path = "/api/hazard/flood-exposure",
    tag = "hazard",
    params(
        ("buffer_distance_meters" = Option<f64>, Query, description = "River buffer in meters (default 250)"),
        ("unit_type" = Option<String>, Query, description = "settlement or local_unit (default settlement)")
    ),
    responses(
        (status = 200, description = "River buffers and affected features"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn flood_exposure(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<FloodExposure> {
    let params = FloodExposureParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        buffer_m = params.buffer_distance_meters,
        unit_type = ?params.unit_type,
        "Flood exposure query"
    );
    let result = run(&state, move |store| analysis::flood_exposure(store, &params)).await?;
    tracing::info!(
        affected = result.affected_features.features.len(),
        "Flood exposure computed"
    );
    Ok(Json(result))
}

/// Recent, confident fire detections.
#[utoipa::path(
    get,
    path = "/api/hazard/wildfire-hotspots",
    tag = "hazard",
    params(
        ("days_ago" = Option<i64>, Query, description = "Look-back window in days (default 7)"),
        ("min_confidence" = Option<i64>, Query, description = "Minimum detection confidence (default 70)")
    ),
    responses(
        (status = 200, description = "FeatureCollection of fire detections"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn wildfire_hotspots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<FeatureCollection> {
    let params = WildfireParams::from_query(&QueryParams::from(query), today())?;
    tracing::debug!(
        days_ago = params.days_ago,
        min_confidence = params.min_confidence,
        "Wildfire hotspot query"
    );
    let fc = run(&state, move |store| analysis::wildfire_hotspots(store, &params)).await?;
    tracing::info!(hotspots = fc.features.len(), "Wildfire hotspots found");
    Ok(Json(fc))
}

/// A road and the settlements within an impact radius of it.
#[utoipa::path(
    get,
    path = "/api/hazard/road-disruption-impact",
    tag = "hazard",
    params(
        ("road_fid" = i64, Query, description = "Feature id of the disrupted road"),
        ("impact_radius_meters" = Option<f64>, Query, description = "Impact radius in meters (default 5000)")
    ),
    responses(
        (status = 200, description = "The road followed by affected settlements"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Road not found", body = ErrorResponse)
    )
)]
pub async fn road_disruption_impact(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<FeatureCollection> {
    let params = RoadDisruptionParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        road_fid = params.road_fid,
        radius_m = params.impact_radius_meters,
        "Road disruption query"
    );
    let fc = run(&state, move |store| analysis::road_disruption_impact(store, &params)).await?;
    tracing::info!(
        road_fid = params.road_fid,
        features = fc.features.len(),
        "Road disruption computed"
    );
    Ok(Json(fc))
}

async fn closest(
    state: &AppState,
    query: HashMap<String, String>,
    layer: ClosestLayer,
) -> ApiResult<ClosestFeature> {
    let query = QueryParams::from(query);
    let (lat, lon) = query.lat_lon()?;
    tracing::debug!(lat, lon, layer = ?layer, "Closest feature query");
    let result = run(state, move |store| analysis::closest_feature(store, layer, lon, lat)).await?;
    Ok(Json(result))
}

/// Nearest road to a point.
#[utoipa::path(
    get,
    path = "/api/query/closest-road",
    tag = "query",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees")
    ),
    responses(
        (status = 200, description = "The nearest road, null when there are none"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn closest_road(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ClosestFeature> {
    closest(&state, query, ClosestLayer::Road).await
}

/// Nearest settlement to a point, with its distance.
#[utoipa::path(
    get,
    path = "/api/query/closest-settlement",
    tag = "query",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees")
    ),
    responses(
        (status = 200, description = "Nearest settlement and distance in meters"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn closest_settlement(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ClosestFeature> {
    closest(&state, query, ClosestLayer::Settlement).await
}

/// Nearest river to a point, with its distance.
#[utoipa::path(
    get,
    path = "/api/query/closest-river",
    tag = "query",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees")
    ),
    responses(
        (status = 200, description = "Nearest river and distance in meters"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn closest_river(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ClosestFeature> {
    closest(&state, query, ClosestLayer::River).await
}

/// Nearest local unit to a point, with its distance.
#[utoipa::path(
    get,
    path = "/api/query/closest-local-unit",
    tag = "query",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees")
    ),
    responses(
        (status = 200, description = "Nearest local unit and distance in meters"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn closest_local_unit(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ClosestFeature> {
    closest(&state, query, ClosestLayer::LocalUnit).await
}

/// Nearest district to a point, with its distance.
#[utoipa::path(
    get,
    path = "/api/query/closest-district",
    tag = "query",
    params(
        ("lat" = f64, Query, description = "Latitude in decimal degrees"),
        ("lon" = f64, Query, description = "Longitude in decimal degrees")
    ),
    responses(
        (status = 200, description = "Nearest district and distance in meters"),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
pub async fn closest_district(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<ClosestFeature> {
    closest(&state, query, ClosestLayer::District).await
}

/// Ids and names of every district or local unit, sorted by name.
#[utoipa::path(
    get,
    path = "/api/spatial/list-admin-units",
    tag = "spatial",
    params(("type" = Option<String>, Query, description = "districts or local_units (default districts)")),
    responses(
        (status = 200, description = "Array of {fid, name}"),
        (status = 400, description = "Invalid type", body = ErrorResponse)
    )
)]
pub async fn list_admin_units(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Vec<AdminUnitName>> {
    let unit_type = QueryParams::from(query).parse_or("type", AdminUnitType::District)?;
    let units = run(&state, move |store| Ok(analysis::list_admin_units(store, unit_type))).await?;
    tracing::info!(unit_type = unit_type.as_str(), count = units.len(), "Admin units listed");
    Ok(Json(units))
}

/// Settlements and districts inside two magnitude-scaled risk zones.
///
/// Body: `{"coords": [lon, lat], "mag": 6.5}`.
#[utoipa::path(
    post,
    path = "/api/spatial/earthquake-impact",
    tag = "spatial",
    responses(
        (status = 200, description = "Per-zone summary and zone polygons"),
        (status = 400, description = "Missing coordinates or magnitude", body = ErrorResponse)
    )
)]
pub async fn earthquake_impact(
    State(state): State<Arc<AppState>>,
    body: RawBody,
) -> ApiResult<EarthquakeImpact> {
    let request: EarthquakeImpactRequest = parse_body(&body)?;
    tracing::debug!(coords = ?request.coords, mag = ?request.mag, "Earthquake impact query");
    let result = run(&state, move |store| analysis::earthquake_impact(store, &request)).await?;
    tracing::info!(zones = result.summary.len(), "Earthquake impact computed");
    Ok(Json(result))
}

/// Settlements of an administrative unit with their distance to roads or
/// rivers.
///
/// Body: `{"infrastructure": "roads", "admin_unit_type": "district", "admin_unit_fid": 27}`.
#[utoipa::path(
    post,
    path = "/api/spatial/infrastructure-accessibility",
    tag = "spatial",
    responses(
        (status = 200, description = "Settlements with distance_to_<infrastructure>_m"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Administrative unit not found", body = ErrorResponse)
    )
)]
pub async fn infrastructure_accessibility(
    State(state): State<Arc<AppState>>,
    body: RawBody,
) -> ApiResult<FeatureCollection> {
    let request: InfrastructureAccessRequest = parse_body(&body)?;
    tracing::debug!(
        infrastructure = ?request.infrastructure,
        admin_unit_fid = ?request.admin_unit_fid,
        "Infrastructure accessibility query"
    );
    let fc = run(&state, move |store| {
        analysis::infrastructure_accessibility(store, &request)
    })
    .await?;
    tracing::info!(settlements = fc.features.len(), "Infrastructure accessibility computed");
    Ok(Json(fc))
}

/// Settlement, road, river and fire totals inside one administrative unit.
///
/// Body: `{"unit_type": "local_unit", "unit_fid": 100}`.
#[utoipa::path(
    post,
    path = "/api/spatial/risk-profiler",
    tag = "spatial",
    responses(
        (status = 200, description = "Profile totals and the unit boundary"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Unit not found", body = ErrorResponse)
    )
)]
pub async fn risk_profiler(
    State(state): State<Arc<AppState>>,
    body: RawBody,
) -> ApiResult<RiskProfile> {
    let request: RiskProfileRequest = parse_body(&body)?;
    tracing::debug!(unit_type = ?request.unit_type, unit_fid = ?request.unit_fid, "Risk profile query");
    let profile = run(&state, move |store| analysis::risk_profile(store, &request)).await?;
    tracing::info!(
        settlements = profile.profile.settlements_count,
        fires = profile.profile.fire_incidents,
        "Risk profile computed"
    );
    Ok(Json(profile))
}

/// Settlements scored by how many selected hazards are nearby.
///
/// Body: `{"buffer_m": 500, "hazards": ["flood", "fire"]}`.
#[utoipa::path(
    post,
    path = "/api/spatial/multi-hazard-exposure",
    tag = "spatial",
    responses(
        (status = 200, description = "Settlements with exposure_score"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn multi_hazard_exposure(
    State(state): State<Arc<AppState>>,
    body: RawBody,
) -> ApiResult<FeatureCollection> {
    let request: MultiHazardRequest = parse_body(&body)?;
    tracing::debug!(buffer_m = request.buffer_m, hazards = ?request.hazards, "Multi-hazard query");
    let fc = run(&state, move |store| analysis::multi_hazard_exposure(store, &request)).await?;
    tracing::info!(exposed = fc.features.len(), "Multi-hazard exposure computed");
    Ok(Json(fc))
}

/// Settlements near air-quality stations reading at or above a threshold.
///
/// Body: `{"aqi_threshold": 101, "radius_km": 10, "stations": [{"lat", "lon", "aqi"}]}`.
#[utoipa::path(
    post,
    path = "/api/spatial/aqi-vulnerability",
    tag = "spatial",
    responses(
        (status = 200, description = "Affected settlements, each listed once"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 502, description = "Unusable station data", body = ErrorResponse)
    )
)]
pub async fn aqi_vulnerability(
    State(state): State<Arc<AppState>>,
    body: RawBody,
) -> ApiResult<FeatureCollection> {
    let request: AqiVulnerabilityRequest = parse_body(&body)?;
    tracing::debug!(
        threshold = request.aqi_threshold,
        radius_km = request.radius_km,
        "AQI vulnerability query"
    );
    let fc = run(&state, move |store| analysis::aqi_vulnerability(store, &request)).await?;
    tracing::info!(affected = fc.features.len(), "AQI vulnerability computed");
    Ok(Json(fc))
}

/// Concentric intensity zones around a simulated epicentre.
#[utoipa::path(
    get,
    path = "/api/spatial/earthquake-intensity",
    tag = "spatial",
    params(
        ("min_magnitude" = Option<f64>, Query, description = "Minimum magnitude (default 4.0)"),
        ("days_ago" = Option<i64>, Query, description = "Look-back window in days (default 7)")
    ),
    responses(
        (status = 200, description = "Intensity zones and exposed settlements"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn earthquake_intensity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<EarthquakeIntensity> {
    let params = EarthquakeIntensityParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(magnitude = params.simulated_magnitude(), "Earthquake intensity query");
    let result = run(&state, move |store| analysis::earthquake_intensity(store, &params)).await?;
    tracing::info!(
        exposed = result.exposed_settlements.features.len(),
        "Earthquake intensity computed"
    );
    Ok(Json(result))
}

/// Flood risk zones scaled by simulated rainfall.
#[utoipa::path(
    get,
    path = "/api/spatial/flash-flood-warning",
    tag = "spatial",
    params(
        ("rainfall_intensity" = Option<String>, Query, description = "low, medium or high (default medium)"),
        ("buffer_distance_meters" = Option<f64>, Query, description = "Base buffer in meters (default 500)")
    ),
    responses(
        (status = 200, description = "Risk zones with affected settlements and roads"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn flash_flood_warning(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<FlashFloodWarning> {
    let params = FlashFloodParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        rainfall = %params.rainfall_intensity,
        buffer_m = params.effective_buffer_m(),
        "Flash flood query"
    );
    let result = run(&state, move |store| analysis::flash_flood_warning(store, &params)).await?;
    tracing::info!(
        settlements = result.affected_settlements.features.len(),
        roads = result.affected_roads.features.len(),
        "Flash flood warning computed"
    );
    Ok(Json(result))
}

/// Straight-line route from a settlement to the nearest facility of a type.
#[utoipa::path(
    get,
    path = "/api/spatial/accessibility",
    tag = "spatial",
    params(
        ("start_fid" = i64, Query, description = "Starting settlement id"),
        ("facility_type" = Option<String>, Query, description = "district_hq, hospital, school, community_hall or police_station")
    ),
    responses(
        (status = 200, description = "Route and facility"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Settlement or facility not found", body = ErrorResponse)
    )
)]
pub async fn accessibility(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<AccessibilityResult> {
    let params = AccessibilityParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        start_fid = params.start_fid,
        facility = %params.facility_type,
        "Accessibility query"
    );
    let result = run(&state, move |store| analysis::accessibility(store, &params)).await?;
    Ok(Json(result))
}

/// Shelters near a settlement and whether they can take its population.
#[utoipa::path(
    get,
    path = "/api/spatial/evacuation-planning",
    tag = "spatial",
    params(
        ("affected_settlement_fid" = i64, Query, description = "Settlement to evacuate"),
        ("population_estimate" = Option<i64>, Query, description = "People to shelter (default 1000)")
    ),
    responses(
        (status = 200, description = "Routes, shelters and capacity assessment"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "Settlement not found", body = ErrorResponse)
    )
)]
pub async fn evacuation_planning(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<EvacuationPlan> {
    let params = EvacuationParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        settlement_fid = params.affected_settlement_fid,
        population = params.population_estimate,
        "Evacuation planning query"
    );
    let plan = run(&state, move |store| analysis::evacuation_planning(store, &params)).await?;
    tracing::info!(
        shelters = plan.available_shelters.features.len(),
        sufficient = plan.capacity_assessment.capacity_sufficient,
        "Evacuation plan computed"
    );
    Ok(Json(plan))
}

/// Comparative vulnerability indicators for several administrative units.
#[utoipa::path(
    get,
    path = "/api/spatial/vulnerability-profiling",
    tag = "spatial",
    params(
        ("unit_type" = Option<String>, Query, description = "local_unit or district (default local_unit)"),
        ("fids" = String, Query, description = "Comma-separated unit ids")
    ),
    responses(
        (status = 200, description = "One profile or inline error per id"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse)
    )
)]
pub async fn vulnerability_profiling(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<VulnerabilityProfiles> {
    let params = VulnerabilityParams::from_query(&QueryParams::from(query), today())?;
    tracing::debug!(unit_type = params.unit_type.as_str(), fids = ?params.fids, "Vulnerability query");
    let result = run(&state, move |store| analysis::vulnerability_profiling(store, &params)).await?;
    tracing::info!(profiles = result.profiles.len(), "Vulnerability profiles computed");
    Ok(Json(result))
}

/// Steepness, confluence points or sinuosity of one river.
#[utoipa::path(
    get,
    path = "/api/spatial/river-morphology",
    tag = "spatial",
    params(
        ("river_fid" = i64, Query, description = "River id"),
        ("analysis_type" = Option<String>, Query, description = "steepness, confluence or sinuosity (default steepness)")
    ),
    responses(
        (status = 200, description = "Morphology features"),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 404, description = "River not found", body = ErrorResponse)
    )
)]
pub async fn river_morphology(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<MorphologyResult> {
    let params = MorphologyParams::from_query(&QueryParams::from(query))?;
    tracing::debug!(
        river_fid = params.river_fid,
        analysis = %params.analysis_type,
        "River morphology query"
    );
    let result = run(&state, move |store| analysis::river_morphology(store, &params)).await?;
    Ok(Json(result))
}
