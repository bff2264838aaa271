// Meeting booking and lifecycle.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metavertex_core::model::meeting::{Meeting, NewMeeting};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/meetings", get(list_meetings).post(schedule_meeting))
        .route("/api/meetings/{id}/start", post(start_meeting))
        .route("/api/meetings/{id}/complete", post(complete_meeting))
        .route("/api/meetings/{id}/cancel", post(cancel_meeting))
}

async fn list_meetings(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Meeting>>> {
    Ok(Json(state.market.list_meetings(&auth.actor)?))
}

async fn schedule_meeting(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewMeeting>,
) -> ApiResult<(StatusCode, Json<Meeting>)> {
    let meeting = state.market.schedule_meeting(&auth.actor, input).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn start_meeting(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Meeting>> {
    Ok(Json(state.market.start_meeting(&auth.actor, &id)?))
}

async fn complete_meeting(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Meeting>> {
    Ok(Json(state.market.complete_meeting(&auth.actor, &id)?))
}

async fn cancel_meeting(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Meeting>> {
    Ok(Json(state.market.cancel_meeting(&auth.actor, &id)?))
}
