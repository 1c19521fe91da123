//! Single-key handlers

use super::respond;
use crate::extractors::Params;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct KeyParams {
    pub environment: String,
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct SetKeyParams {
    pub environment: String,
    pub key: String,
    pub value: String,
    /// Seconds; values above zero store the key with SETEX
    pub expire: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListKeysParams {
    pub environment: String,
    #[serde(default = "match_all")]
    pub pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct ExpireParams {
    pub environment: String,
    pub key: String,
    pub seconds: i64,
}

fn match_all() -> String {
    "*".to_string()
}

pub async fn get(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .read(&p.environment, &p.key)
        .await
        .map(|value| json!({ "value": value }));
    respond("Get key", result)
}

pub async fn set(State(state): State<AppState>, Params(p): Params<SetKeyParams>) -> Json<Value> {
    let result = match p.expire {
        Some(seconds) if seconds > 0 => {
            state
                .keys
                .write_with_expire(&p.environment, &p.key, &p.value, seconds as u64)
                .await
        }
        _ => state.keys.write(&p.environment, &p.key, &p.value).await,
    };
    respond("Set key", result.map(|response| json!({ "response": response })))
}

pub async fn delete(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .delete(&p.environment, &[p.key])
        .await
        .map(|deleted| json!({ "deleted": deleted }));
    respond("Delete key", result)
}

/// Full keyspace scan with `KEYS`; not paginated
pub async fn list(State(state): State<AppState>, Params(p): Params<ListKeysParams>) -> Json<Value> {
    let result = state
        .keys
        .list_keys(&p.environment, &p.pattern)
        .await
        .map(|keys| json!({ "count": keys.len(), "keys": keys }));
    respond("List keys", result)
}

pub async fn info(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .describe_key(&p.environment, &p.key)
        .await
        .map(|info| json!({ "data": info }));
    respond("Key info", result)
}

pub async fn key_type(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .key_type(&p.environment, &p.key)
        .await
        .map(|kind| json!({ "type": kind }));
    respond("Key type", result)
}

pub async fn exists(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .exists(&p.environment, &p.key)
        .await
        .map(|exists| json!({ "exists": exists }));
    respond("Key exists", result)
}

pub async fn ttl(State(state): State<AppState>, Params(p): Params<KeyParams>) -> Json<Value> {
    let result = state
        .keys
        .time_to_live(&p.environment, &p.key)
        .await
        .map(|ttl| json!({ "ttl": ttl }));
    respond("Key ttl", result)
}

pub async fn expire(State(state): State<AppState>, Params(p): Params<ExpireParams>) -> Json<Value> {
    let result = state
        .keys
        .expire(&p.environment, &p.key, p.seconds)
        .await
        .map(|applied| json!({ "applied": applied }));
    respond("Expire key", result)
}
