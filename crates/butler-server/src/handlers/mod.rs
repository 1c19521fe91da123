//! HTTP handlers
//!
//! Every endpoint answers with a JSON object carrying `success`. Failures of
//! any kind become `{"success": false, "message": ...}` with status 200.

pub mod batch;
pub mod database;
pub mod environments;
pub mod health;
pub mod keys;

pub use health::health;

use axum::Json;
use serde_json::{json, Value};
use std::fmt::Display;
use tracing::{info, warn};

/// `{"success": true}` merged into a payload object
fn success(mut payload: Value) -> Json<Value> {
    if let Value::Object(ref mut map) = payload {
        map.insert("success".to_string(), Value::Bool(true));
    }
    Json(payload)
}

fn failure(operation: &str, err: impl Display) -> Json<Value> {
    warn!("{} failed: {}", operation, err);
    rejected(err)
}

fn rejected(err: impl Display) -> Json<Value> {
    Json(json!({
        "success": false,
        "message": err.to_string(),
    }))
}

fn respond(operation: &str, result: butler_core::Result<Value>) -> Json<Value> {
    match result {
        Ok(payload) => success(payload),
        // Unknown names come from the caller, not from a store
        Err(e) if e.is_not_found() => {
            info!("{} rejected: {}", operation, e);
            rejected(e)
        }
        Err(e) => failure(operation, e),
    }
}
