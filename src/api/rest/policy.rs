use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    routing::post,
    Json, Router,
};

use crate::{
    infrastructure::state::AppState,
    services::errors::ServiceError,
    services::policy::{
        FieldCheckRequest, PolicyService, ValidateItemRequest, ValidateReportRequest,
    },
};

type ApiResult = Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)>;

pub fn router() -> Router {
    Router::new()
        .route("/validate", post(validate_item))
        .route("/report", post(validate_report))
        .route("/fields", post(check_field))
}

async fn validate_item(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ValidateItemRequest>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = payload.map_err(rejection_response)?;
    let service = PolicyService::new(state);
    let result = service.validate_item(payload);
    Ok(Json(serde_json::json!({
        "violations": result.violations,
        "evaluation": result.evaluation,
    })))
}

async fn validate_report(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<ValidateReportRequest>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = payload.map_err(rejection_response)?;
    let service = PolicyService::new(state);
    let evaluation = service.validate_report(payload).map_err(to_response)?;
    Ok(Json(serde_json::json!({ "evaluation": evaluation })))
}

async fn check_field(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<FieldCheckRequest>, JsonRejection>,
) -> ApiResult {
    let Json(payload) = payload.map_err(rejection_response)?;
    let service = PolicyService::new(state);
    let check = service.check_field(payload).map_err(to_response)?;
    Ok(Json(serde_json::json!({ "field": check.field, "error": check.error })))
}

/// Malformed request bodies keep axum's status but answer in the same JSON
/// error shape as service failures.
fn rejection_response(rejection: JsonRejection) -> (StatusCode, Json<serde_json::Value>) {
    (
        rejection.status(),
        Json(serde_json::json!({ "error": rejection.body_text() })),
    )
}

fn to_response(err: ServiceError) -> (StatusCode, Json<serde_json::Value>) {
    (
        err.status_code(),
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
