//! Environment handlers

use crate::extractors::Params;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct EnvironmentParams {
    pub environment: String,
}

pub async fn list(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "environments": state.connections.registry().names(),
    }))
}

/// Never fails: unknown environments, refused connections and bad
/// credentials all report `success: false`.
pub async fn test_connection(
    State(state): State<AppState>,
    Params(params): Params<EnvironmentParams>,
) -> Json<Value> {
    let connected = state.connections.test_connection(&params.environment).await;
    info!(
        "Connection test for {}: {}",
        params.environment,
        if connected { "ok" } else { "failed" }
    );

    Json(json!({
        "success": connected,
        "message": if connected { "Connection succeeded" } else { "Connection failed" },
    }))
}
