//! Pattern-based batch handlers
//!
//! Both endpoints scan with `KEYS` and then act on the matches. Keys can change
//! in between; the reported counts are what actually happened.

use super::{failure, success};
use crate::extractors::Params;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

const NO_MATCHES: &str = "No matching keys found";

#[derive(Debug, Deserialize)]
pub struct BatchDeleteParams {
    pub environment: String,
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchExpireParams {
    pub environment: String,
    pub pattern: String,
    pub seconds: i64,
}

fn with_message(mut payload: Value, empty: bool) -> Value {
    if empty {
        if let Value::Object(ref mut map) = payload {
            map.insert("message".to_string(), Value::String(NO_MATCHES.to_string()));
        }
    }
    payload
}

pub async fn delete(
    State(state): State<AppState>,
    Params(p): Params<BatchDeleteParams>,
) -> Json<Value> {
    match state.keys.batch_delete(&p.environment, &p.pattern).await {
        Ok(report) => {
            let empty = report.is_empty();
            match serde_json::to_value(report) {
                Ok(payload) => success(with_message(payload, empty)),
                Err(e) => failure("Batch delete", e),
            }
        }
        Err(e) => failure("Batch delete", e),
    }
}

pub async fn expire(
    State(state): State<AppState>,
    Params(p): Params<BatchExpireParams>,
) -> Json<Value> {
    match state
        .keys
        .batch_expire(&p.environment, &p.pattern, p.seconds)
        .await
    {
        Ok(report) => {
            let empty = report.is_empty();
            match serde_json::to_value(report) {
                Ok(payload) => success(with_message(payload, empty)),
                Err(e) => failure("Batch expire", e),
            }
        }
        Err(e) => failure("Batch expire", e),
    }
}
