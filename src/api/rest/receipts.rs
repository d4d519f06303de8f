use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Extension},
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use bytes::Bytes;

use crate::{
    infrastructure::state::AppState,
    services::{errors::ServiceError, receipts::ReceiptService},
};

pub fn router(max_bytes: usize) -> Router {
    Router::new()
        .route("/extract", post(extract))
        .layer(DefaultBodyLimit::max(max_bytes))
}

async fn extract(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, (axum::http::StatusCode, Json<serde_json::Value>)> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let service = ReceiptService::new(state);
    let receipt = service
        .extract(body, content_type)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "receipt": receipt })))
}

fn to_response(err: ServiceError) -> (axum::http::StatusCode, Json<serde_json::Value>) {
    (
        err.status_code(),
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
