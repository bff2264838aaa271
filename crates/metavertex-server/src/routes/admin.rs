// Account administration, CSV exports and platform analytics.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metavertex_core::analytics::{Dashboard, RoleDashboard, Summary};
use metavertex_core::market::NewAdmin;
use metavertex_core::model::user::{User, UserType};
use metavertex_core::model::ReviewStatus;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserQuery {
    pub status: Option<ReviewStatus>,
    pub user_type: Option<UserType>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/approve", post(approve_user))
        .route("/api/admin/users/{id}/reject", post(reject_user))
        .route("/api/admin/admins", post(create_admin))
        .route("/api/admin/export/users.csv", get(export_users))
        .route("/api/admin/export/products.csv", get(export_products))
        .route("/api/analytics/summary", get(summary))
        .route("/api/analytics/dashboard", get(dashboard))
        .route("/api/dashboard", get(role_dashboard))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.market.list_users(
        &auth.actor,
        query.status,
        query.user_type,
    )?))
}

async fn approve_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.market.approve_user(&auth.actor, &id)?))
}

async fn reject_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.market.reject_user(&auth.actor, &id)?))
}

async fn create_admin(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewAdmin>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let admin = state.market.create_admin(&auth.actor, input)?;
    Ok((StatusCode::CREATED, Json(admin)))
}

fn csv_attachment(file_name: &str, body: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
}

async fn export_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let csv = state.market.export_users(&auth.actor)?;
    Ok(csv_attachment("users.csv", csv))
}

async fn export_products(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let csv = state.market.export_products(&auth.actor)?;
    Ok(csv_attachment("products.csv", csv))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.market.analytics_summary(&auth.actor)?))
}

async fn dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.market.analytics_dashboard(&auth.actor)?))
}

async fn role_dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<RoleDashboard>> {
    Ok(Json(state.market.role_dashboard(&auth.actor)?))
}
