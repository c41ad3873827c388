//! Route definitions for the oracle simulator API

use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::handlers::*;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(api_routes())
        .with_state(state)
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_info))
        .route("/api/oracles", get(list_oracles))
}
