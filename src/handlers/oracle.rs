use axum::{extract::State, Json};

use crate::app_state::AppState;
use crate::models::{oracle::OracleIdentity, ApiResponse};

/// Registered oracles in registration order. Empty while bootstrapping.
pub async fn list_oracles(State(state): State<AppState>) -> Json<ApiResponse<Vec<OracleIdentity>>> {
    let registry = state.registry().await;
    Json(ApiResponse::ok(registry.snapshot()))
}
