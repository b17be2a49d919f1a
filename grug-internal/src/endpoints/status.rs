//! Liveness and build-info endpoints.

use axum::Json;
use serde_json::{json, Value};

use crate::built_info;

pub const GRUG_GATEWAY_VERSION: &str = built_info::PKG_VERSION;

pub async fn status_handler() -> Json<Value> {
    Json(json!({
        "name": "grug-gateway",
        "version": GRUG_GATEWAY_VERSION,
    }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
