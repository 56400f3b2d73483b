//! Health, config and metrics handlers.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::state::AppState;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Current configuration with secrets redacted
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(serde_json::to_value(state.sanitized_config()).unwrap_or_default())
}

/// Prometheus metrics in text format
pub async fn metrics() -> String {
    crate::metrics::gather()
}

/// Reaper status (running flag and pending hold count)
pub async fn reaper_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.reaper() {
        Some(reaper) => Json(serde_json::to_value(reaper.status()).unwrap_or_default()),
        None => Json(json!({ "running": false, "enabled": false })),
    }
}
