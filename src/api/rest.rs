//! REST API Handlers
//!
//! Exposes the share driver operations over HTTP so an orchestrator can
//! drive the array through a sidecar process.

use crate::domain::ports::ShareDriver;
use crate::domain::share::{AccessRule, Share, Snapshot};
use crate::driver::FlashBladeShareDriver;
use crate::error::Error;
use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Share creation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateShareResponse {
    pub export_location: String,
}

/// Extend / shrink request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeShareRequest {
    pub share: Share,
    /// New size in GiB
    pub new_size: u64,
}

/// Access update request, mirroring the orchestrator's call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAccessRequest {
    pub share: Share,
    pub access_rules: Vec<AccessRule>,
    #[serde(default)]
    pub add_rules: Vec<AccessRule>,
    #[serde(default)]
    pub delete_rules: Vec<AccessRule>,
}

/// Stats query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub refresh: bool,
}

/// Network allocation response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkAllocationsResponse {
    pub count: u32,
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
}

// =============================================================================
// REST Router
// =============================================================================

/// REST API router builder
pub struct RestRouter {
    driver: Arc<FlashBladeShareDriver>,
}

impl RestRouter {
    /// Create a new REST router
    pub fn new(driver: Arc<FlashBladeShareDriver>) -> Self {
        Self { driver }
    }

    /// Build the Axum router
    pub fn build(self) -> Router {
        let state = AppState {
            driver: self.driver,
        };

        Router::new()
            // Share endpoints
            .route("/v1/shares", post(create_share).delete(delete_share))
            .route("/v1/shares/ensure", post(ensure_share))
            .route("/v1/shares/extend", post(extend_share))
            .route("/v1/shares/shrink", post(shrink_share))
            .route("/v1/shares/access", post(update_access))
            // Snapshot endpoints
            .route("/v1/snapshots", post(create_snapshot).delete(delete_snapshot))
            // Backend endpoints
            .route("/v1/stats", get(get_stats))
            .route("/v1/network-allocations", get(network_allocations))
            .route("/healthz", get(health_check))
            .route("/metrics", get(metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    driver: Arc<FlashBladeShareDriver>,
}

// =============================================================================
// Error Mapping
// =============================================================================

fn status_for(error: &Error) -> (StatusCode, &'static str) {
    match error {
        Error::BadConfiguration(_) => (StatusCode::BAD_REQUEST, "bad_configuration"),
        Error::UnsupportedProtocol(_) => (StatusCode::BAD_REQUEST, "unsupported_protocol"),
        Error::InvalidAccessLevel(_) => (StatusCode::BAD_REQUEST, "invalid_access_level"),
        Error::InvalidShare(_) => (StatusCode::BAD_REQUEST, "invalid_share"),
        Error::ResourceNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        Error::BackendFault(_) => (StatusCode::BAD_GATEWAY, "backend_fault"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

fn failure(operation: &str, e: Error) -> Response {
    error!("{} failed: {}", operation, e);
    let (status, kind) = status_for(&e);
    (
        status,
        Json(ApiErrorResponse {
            error: kind.into(),
            message: e.to_string(),
        }),
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Create a share
async fn create_share(State(state): State<AppState>, Json(share): Json<Share>) -> Response {
    info!("Creating share: {}", share.id);
    match state.driver.create_share(&share).await {
        Ok(export_location) => (
            StatusCode::CREATED,
            Json(CreateShareResponse { export_location }),
        )
            .into_response(),
        Err(e) => failure("create_share", e),
    }
}

/// Delete a share
async fn delete_share(State(state): State<AppState>, Json(share): Json<Share>) -> Response {
    match state.driver.delete_share(&share).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => failure("delete_share", e),
    }
}

async fn ensure_share(State(state): State<AppState>, Json(share): Json<Share>) -> Response {
    match state.driver.ensure_share(&share).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => failure("ensure_share", e),
    }
}

async fn extend_share(
    State(state): State<AppState>,
    Json(request): Json<ResizeShareRequest>,
) -> Response {
    match state.driver.extend_share(&request.share, request.new_size).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => failure("extend_share", e),
    }
}

async fn shrink_share(
    State(state): State<AppState>,
    Json(request): Json<ResizeShareRequest>,
) -> Response {
    match state.driver.shrink_share(&request.share, request.new_size).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => failure("shrink_share", e),
    }
}

/// Replace the access rules of a share
async fn update_access(
    State(state): State<AppState>,
    Json(request): Json<UpdateAccessRequest>,
) -> Response {
    match state
        .driver
        .update_access(
            &request.share,
            &request.access_rules,
            &request.add_rules,
            &request.delete_rules,
        )
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => failure("update_access", e),
    }
}

async fn create_snapshot(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Response {
    info!("Creating snapshot: {}", snapshot.id);
    match state.driver.create_snapshot(&snapshot).await {
        Ok(()) => StatusCode::CREATED.into_response(),
        Err(e) => failure("create_snapshot", e),
    }
}

async fn delete_snapshot(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Response {
    match state.driver.delete_snapshot(&snapshot).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => failure("delete_snapshot", e),
    }
}

/// Backend stats, cached unless `refresh=true`
async fn get_stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Response {
    match state.driver.share_stats(query.refresh).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => failure("update_share_stats", e),
    }
}

async fn network_allocations(State(state): State<AppState>) -> impl IntoResponse {
    Json(NetworkAllocationsResponse {
        count: state.driver.network_allocations_number(),
    })
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.driver.metrics().encode() {
        Ok((content_type, body)) => {
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => failure("metrics", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::MemoryArray;
    use crate::config::DriverConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn router() -> Router {
        let settings = DriverConfig {
            flashblade_mgmt_vip: Some("10.1.0.10".into()),
            flashblade_data_vip: Some("10.2.0.10".into()),
            flashblade_api: Some("T-0001".into()),
            ..Default::default()
        }
        .settings()
        .unwrap();
        let driver = FlashBladeShareDriver::setup(settings, Arc::new(MemoryArray::new()))
            .await
            .unwrap();
        RestRouter::new(Arc::new(driver)).build()
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&Error::UnsupportedProtocol("SMB".into())).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::BackendFault("x".into())).0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::filesystem_not_found("share-a-manila")).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&Error::Internal("x".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_create_share_endpoint() {
        let app = router().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/shares",
                serde_json::json!({"id": "h1", "size": 1, "share_proto": "NFS"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let created: CreateShareResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.export_location, "10.2.0.10:/share-h1-manila");
    }

    #[tokio::test]
    async fn test_unsupported_protocol_is_bad_request() {
        let app = router().await;
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/v1/shares",
                serde_json::json!({"id": "h2", "size": 1, "share_proto": "HDFS"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_share_endpoint() {
        let app = router().await;
        let response = app
            .oneshot(json_request(
                Method::DELETE,
                "/v1/shares",
                serde_json::json!({"id": "nope", "size": 1, "share_proto": "NFS"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_health_and_allocations() {
        let app = router().await;
        let response = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/v1/network-allocations").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let allocations: NetworkAllocationsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(allocations.count, 0);
    }
}
