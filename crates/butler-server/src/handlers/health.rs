//! Health check

use crate::AppState;
use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let uptime = Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "environments": state.connections.registry().len(),
        "connected": state.connections.connected_names(),
        "uptime_secs": uptime.num_seconds(),
    }))
}
