//! API handlers for the monitor control surface.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use super::envelope::{ApiError, ApiResponse};
use crate::monitor::MaritimeMonitor;
use crate::types::Zone;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub monitor: Arc<MaritimeMonitor>,
}

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Response {
    let running = state.monitor.is_running().await;
    ApiResponse::ok(json!({
        "status": "ok",
        "running": running,
    }))
}

/// GET /api/ships
pub async fn list_ships(State(state): State<ApiState>) -> Response {
    let ships = state.monitor.store().snapshot().await;
    ApiResponse::ok(ships)
}

/// GET /api/zones
pub async fn list_zones(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.zone_manager().zones())
}

/// POST /api/zones: add a zone or replace the one with the same name.
pub async fn upsert_zone(
    State(state): State<ApiState>,
    Json(zone): Json<Zone>,
) -> Result<Response, ApiError> {
    if zone.name.trim().is_empty() {
        return Err(ApiError::BadRequest("zone name must not be empty".into()));
    }
    if zone.bounds.min_lat >= zone.bounds.max_lat || zone.bounds.min_lon >= zone.bounds.max_lon {
        return Err(ApiError::BadRequest("zone bounding box is degenerate".into()));
    }
    state.monitor.upsert_zone(zone).await?;
    Ok(ApiResponse::ok(state.monitor.zone_manager().zones()))
}

/// DELETE /api/zones/:name
pub async fn remove_zone(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    state.monitor.remove_zone(&name).await?;
    Ok(ApiResponse::ok(state.monitor.zone_manager().zones()))
}

/// GET /api/summary: rolling incident counts per region.
pub async fn summary(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.monitor.aggregator().summary().await)
}

#[derive(Serialize)]
struct StatusBody {
    running: bool,
    tracked_vessels: usize,
    zones: usize,
}

/// GET /api/status
pub async fn status(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(StatusBody {
        running: state.monitor.is_running().await,
        tracked_vessels: state.monitor.store().len().await,
        zones: state.monitor.zone_manager().zones().len(),
    })
}

/// POST /api/reset: clear incident aggregation state, re-arming the
/// report threshold for every region.
pub async fn reset(State(state): State<ApiState>) -> Response {
    state.monitor.aggregator().reset().await;
    ApiResponse::ok(json!({ "reset": true }))
}
