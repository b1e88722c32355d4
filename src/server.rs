//! HTTP server exposing the sensor map.
//!
//! All endpoints are read-only:
//! - `GET /api/map` latest floor plan plus coordinate metadata
//! - `GET /api/sensors` sensors, `?updatedWithin=N` keeps those seen in the last N minutes
//! - `GET /api/health` health rows, `?aggregate=true` returns per-status counts
//! - `GET /api/feedback` resolved hot/cold feedback, `?window=N` in minutes
//! - `GET /api/overview` all of the above in one response
//! - `GET /status` liveness
//!
//! Errors are reported as `{"error": {"code": "...", "message": "..."}}`.

use crate::config::Config;
use crate::feedback::{window_start, FeedbackResolver, ResolveError, INVALID_WINDOW_MESSAGE};
use crate::model::{
    CoordinateMeta, FeedbackResult, FeedbackWindow, HealthCounts, MapAssetView, SensorHealth,
    SensorView, COORDINATE_META,
};
use crate::store::{SiteStore, StoreError};
use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: IpAddr,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Origins allowed by the CORS layer
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Create a server configuration bound to localhost.
    pub fn new(port: u16) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            cors_origins: Config::default().cors_origins,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.host,
            port: config.port,
            cors_origins: config.cors_origins.clone(),
        }
    }
}

/// Shared server state
pub struct ServerState {
    store: Arc<dyn SiteStore>,
}

impl ServerState {
    pub fn new(store: Arc<dyn SiteStore>) -> Self {
        Self { store }
    }
}

/// API error, rendered with the structured error body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", message),
            ApiError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    message,
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidWindow => {
                ApiError::BadRequest(INVALID_WINDOW_MESSAGE.to_string())
            }
            ResolveError::Store(e) => e.into(),
        }
    }
}

/// Liveness response
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub map: Option<MapAssetView>,
    pub coordinate_meta: CoordinateMeta,
}

#[derive(Serialize)]
pub struct HealthCountsResponse {
    pub counts: HealthCounts,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub map: Option<MapAssetView>,
    pub sensors: Vec<SensorView>,
    pub health: Vec<SensorHealth>,
    pub feedback: FeedbackResult,
    pub coordinate_meta: CoordinateMeta,
}

#[derive(Debug, Deserialize)]
pub struct SensorsQuery {
    #[serde(rename = "updatedWithin")]
    pub updated_within: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HealthQuery {
    pub aggregate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub window: Option<String>,
}

type ApiResult<T> = Result<T, ApiError>;

const INVALID_UPDATED_WITHIN_MESSAGE: &str = "updatedWithin must be integer minutes";

/// GET /status
async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/map
async fn map(State(state): State<Arc<ServerState>>) -> ApiResult<Json<MapResponse>> {
    let asset = state.store.latest_map_asset()?;
    Ok(Json(MapResponse {
        map: asset.as_ref().map(|a| a.to_view()),
        coordinate_meta: COORDINATE_META,
    }))
}

/// GET /api/sensors
async fn sensors(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<SensorsQuery>,
) -> ApiResult<Json<Vec<SensorView>>> {
    let invalid = || ApiError::BadRequest(INVALID_UPDATED_WITHIN_MESSAGE.to_string());

    let seen_since = match query.updated_within.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => {
            let minutes = raw.trim().parse::<i64>().map_err(|_| invalid())?;
            let since =
                window_start(FeedbackWindow::minutes(minutes), Utc::now()).map_err(|_| invalid())?;
            Some(since)
        }
        None => None,
    };

    let sensors = state.store.sensors(seen_since)?;
    Ok(Json(sensors.iter().map(|s| s.to_view()).collect()))
}

/// GET /api/health
async fn health(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HealthQuery>,
) -> ApiResult<Response> {
    let aggregate = matches!(query.aggregate.as_deref(), Some("1" | "true" | "True"));
    if aggregate {
        let counts = state.store.health_counts()?;
        return Ok(Json(HealthCountsResponse { counts }).into_response());
    }

    Ok(Json(state.store.sensor_health()?).into_response())
}

/// GET /api/feedback
async fn feedback(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<Json<FeedbackResult>> {
    let resolver = FeedbackResolver::new(state.store.as_ref());
    Ok(Json(resolver.resolve(query.window.as_deref())?))
}

/// GET /api/overview
///
/// Feedback always uses the default window here.
async fn overview(State(state): State<Arc<ServerState>>) -> ApiResult<Json<OverviewResponse>> {
    let store = state.store.as_ref();
    let asset = store.latest_map_asset()?;
    let sensors = store.sensors(None)?;
    let health = store.sensor_health()?;
    let feedback = FeedbackResolver::new(store).resolve(None)?;

    Ok(Json(OverviewResponse {
        map: asset.as_ref().map(|a| a.to_view()),
        sensors: sensors.iter().map(|s| s.to_view()).collect(),
        health,
        feedback,
        coordinate_meta: COORDINATE_META,
    }))
}

/// Build the API router over a store.
pub fn router(store: Arc<dyn SiteStore>, cors_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    Router::new()
        .route("/status", get(status))
        .route("/api/map", get(map))
        .route("/api/sensors", get(sensors))
        .route("/api/health", get(health))
        .route("/api/feedback", get(feedback))
        .route("/api/overview", get(overview))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::new(ServerState::new(store)))
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    store: Arc<dyn SiteStore>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(store, &config.cors_origins);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Sensor map API listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
