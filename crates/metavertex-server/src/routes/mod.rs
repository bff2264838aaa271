// REST API routes.

mod admin;
mod auth;
mod mediation;
mod meetings;
mod products;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn api_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(admin::routes())
        .merge(products::routes(max_upload_bytes))
        .merge(mediation::routes())
        .merge(meetings::routes())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
    }))
}
