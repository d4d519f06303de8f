use axum::{routing::get, Router};

use crate::{
    api::rest::{policy::router as policy_router, receipts::router as receipts_router},
    infrastructure::config::Config,
};

pub mod health;
pub mod policy;
pub mod receipts;

pub fn router(config: &Config) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .nest("/policy", policy_router())
        .nest("/receipts", receipts_router(config.receipts.max_bytes))
}
