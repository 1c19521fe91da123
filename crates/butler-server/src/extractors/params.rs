//! Request parameter extractor
//!
//! The console sends parameters either in the query string or as an
//! `application/x-www-form-urlencoded` body. `Params` merges both before
//! deserializing, so handlers don't care which one was used.

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

/// Missing or malformed parameters
pub struct ParamsError {
    pub message: String,
}

impl IntoResponse for ParamsError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
        }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

fn is_form(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

#[async_trait]
impl<T, S> FromRequest<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ParamsError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut pairs: Vec<String> = Vec::new();
        if let Some(query) = req.uri().query().filter(|q| !q.is_empty()) {
            pairs.push(query.to_string());
        }

        if is_form(&req) {
            let body = Bytes::from_request(req, state).await.map_err(|e| ParamsError {
                message: format!("Failed to read request body: {}", e),
            })?;
            let body = String::from_utf8(body.to_vec()).map_err(|_| ParamsError {
                message: "Request body is not valid UTF-8".to_string(),
            })?;
            let body = body.trim();
            if !body.is_empty() {
                pairs.push(body.to_string());
            }
        }

        // Parsed as one form document; no URI length or character limits apply
        let value = serde_urlencoded::from_str::<T>(&pairs.join("&")).map_err(|e| ParamsError {
            message: format!("Invalid parameters: {}", e),
        })?;

        Ok(Params(value))
    }
}
