// Sign-up, sign-in and the caller's own profile.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use metavertex_core::market::Session;
use metavertex_core::model::user::{ProfileUpdate, Registration, User};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser, BearerToken};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/verify", get(verify))
        .route("/api/profile", put(update_profile))
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = state.market.register(input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration submitted; an admin will review your account",
            "user": user,
        })),
    ))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<Json<Session>> {
    Ok(Json(
        state.market.login(&credentials.email, &credentials.password)?,
    ))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Value>> {
    state.market.logout(&auth.actor)?;
    Ok(Json(json!({ "message": "Signed out" })))
}

/// Resolves the token even for accounts still awaiting approval, so clients
/// can show the review status.
async fn verify(
    State(state): State<Arc<AppState>>,
    BearerToken(token): BearerToken,
) -> ApiResult<Json<User>> {
    Ok(Json(state.market.verify(&token)?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(patch): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.market.update_profile(&auth.actor, patch)?))
}
