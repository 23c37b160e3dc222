//! REST API handlers.
//!
//! Each handler calls into the `FleetController` and returns a JSON
//! envelope. File reads return the raw bytes on success.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

use fleet_core::FleetError;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// HTTP status for each error kind.
pub fn status_for(err: &FleetError) -> StatusCode {
    match err {
        FleetError::UnknownNode(_) | FleetError::NotFound(_) => StatusCode::NOT_FOUND,
        FleetError::InvalidTransition { .. } | FleetError::AlreadyExists(_) => {
            StatusCode::CONFLICT
        }
        FleetError::EmptyFleet | FleetError::NoHealthyNode => StatusCode::SERVICE_UNAVAILABLE,
        FleetError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FleetError::LifecycleCommand { .. } | FleetError::Transfer { .. } => StatusCode::BAD_GATEWAY,
        FleetError::InvalidFilename(_) => StatusCode::BAD_REQUEST,
        FleetError::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fleet_error(err: FleetError) -> Response {
    error_response(&err.to_string(), status_for(&err))
}

// ── Nodes ──────────────────────────────────────────────────────

/// GET /api/v1/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.get_fleet_status())
}

/// GET /api/v1/nodes/select
pub async fn select_node(State(state): State<ApiState>) -> impl IntoResponse {
    match state.controller.select_node() {
        Ok(node_id) => ApiResponse::ok(serde_json::json!({ "node": node_id })).into_response(),
        Err(e) => fleet_error(e),
    }
}

/// POST /api/v1/nodes/:id/start
pub async fn start_node(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.controller.start_node(&id).await {
        Ok(()) => node_snapshot(&state, &id),
        Err(e) => fleet_error(e),
    }
}

/// POST /api/v1/nodes/:id/stop
pub async fn stop_node(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.controller.stop_node(&id).await {
        Ok(()) => node_snapshot(&state, &id),
        Err(e) => fleet_error(e),
    }
}

fn node_snapshot(state: &ApiState, id: &str) -> Response {
    match state.controller.get_node(id) {
        Ok(node) => ApiResponse::ok(node).into_response(),
        Err(e) => fleet_error(e),
    }
}

/// GET /api/v1/stats
pub async fn fleet_stats(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.controller.stats())
}

// ── Files ──────────────────────────────────────────────────────

/// POST /api/v1/files/:name
pub async fn create_file(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match state.controller.create_file(&name, &body).await {
        Ok(node_id) => (
            StatusCode::CREATED,
            ApiResponse::ok(serde_json::json!({
                "filename": name,
                "node": node_id,
                "bytes": body.len(),
            })),
        )
            .into_response(),
        Err(e) => fleet_error(e),
    }
}

/// PUT /api/v1/files/:name
pub async fn update_file(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    match state.controller.update_file(&name, &body).await {
        Ok(node_id) => ApiResponse::ok(serde_json::json!({
            "filename": name,
            "node": node_id,
            "bytes": body.len(),
        }))
        .into_response(),
        Err(e) => fleet_error(e),
    }
}

/// GET /api/v1/files/:name
pub async fn read_file(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.controller.read_file(&name).await {
        Ok(content) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            content,
        )
            .into_response(),
        Err(e) => fleet_error(e),
    }
}

/// DELETE /api/v1/files/:name
pub async fn delete_file(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.controller.delete_file(&name).await {
        Ok(()) => ApiResponse::ok("deleted").into_response(),
        Err(e) => fleet_error(e),
    }
}
