//! API handlers for the oracle simulator

pub mod oracle;

use axum::Json;
use serde_json::{json, Value};

pub use oracle::list_oracles;

pub async fn root() -> &'static str {
    "FlightSurety Oracle Simulator"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn api_info() -> Json<Value> {
    Json(json!({
        "message": "An API for use with your Dapp!",
    }))
}
