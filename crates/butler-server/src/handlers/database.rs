//! Database-wide handlers

use super::environments::EnvironmentParams;
use super::respond;
use crate::extractors::Params;
use crate::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};

pub async fn size(
    State(state): State<AppState>,
    Params(p): Params<EnvironmentParams>,
) -> Json<Value> {
    let result = state
        .keys
        .database_size(&p.environment)
        .await
        .map(|size| json!({ "size": size }));
    respond("Database size", result)
}

/// FLUSHDB on the environment's selected database. Irreversible.
pub async fn flush(
    State(state): State<AppState>,
    Params(p): Params<EnvironmentParams>,
) -> Json<Value> {
    let result = state
        .keys
        .flush_database(&p.environment)
        .await
        .map(|response| json!({ "response": response }));
    respond("Flush database", result)
}
