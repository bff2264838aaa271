// Admin-mediated exchanges: investor interests, contact requests and
// founder queries.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use metavertex_core::market::PendingInterest;
use metavertex_core::model::interest::{Interest, InterestReview, NewInterest};
use metavertex_core::model::query::{FounderQuery, NewFounderQuery, QueryReview};
use metavertex_core::model::request::{NewRequest, Request, StatusChange};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/interests", get(list_interests).post(express_interest))
        .route("/api/interests/pending", get(pending_interests))
        .route("/api/interests/{id}/review", post(review_interest))
        .route("/api/requests", get(list_requests).post(create_request))
        .route("/api/requests/{id}/status", post(change_request_status))
        .route("/api/queries", get(list_queries).post(submit_query))
        .route("/api/queries/questions", get(founder_questions))
        .route("/api/queries/{id}/review", post(review_query))
}

// ---------------------------------------------------------------------------
// Interests
// ---------------------------------------------------------------------------

async fn list_interests(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Interest>>> {
    Ok(Json(state.market.list_interests(&auth.actor)?))
}

async fn express_interest(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewInterest>,
) -> ApiResult<(StatusCode, Json<Interest>)> {
    let interest = state.market.express_interest(&auth.actor, input)?;
    Ok((StatusCode::CREATED, Json(interest)))
}

async fn pending_interests(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<PendingInterest>>> {
    Ok(Json(state.market.pending_reviews(&auth.actor)?))
}

async fn review_interest(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(review): ApiJson<InterestReview>,
) -> ApiResult<Json<Interest>> {
    Ok(Json(state.market.review_interest(&auth.actor, &id, review)?))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn list_requests(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Request>>> {
    Ok(Json(state.market.list_requests(&auth.actor)?))
}

async fn create_request(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewRequest>,
) -> ApiResult<(StatusCode, Json<Request>)> {
    let request = state.market.create_request(&auth.actor, input)?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn change_request_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(change): ApiJson<StatusChange>,
) -> ApiResult<Json<Request>> {
    Ok(Json(
        state.market.change_request_status(&auth.actor, &id, change)?,
    ))
}

// ---------------------------------------------------------------------------
// Founder queries
// ---------------------------------------------------------------------------

async fn list_queries(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<FounderQuery>>> {
    Ok(Json(state.market.list_queries(&auth.actor)?))
}

async fn submit_query(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiJson(input): ApiJson<NewFounderQuery>,
) -> ApiResult<(StatusCode, Json<FounderQuery>)> {
    let query = state.market.submit_query(&auth.actor, input)?;
    Ok((StatusCode::CREATED, Json(query)))
}

async fn founder_questions(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
) -> Json<&'static [&'static str]> {
    Json(state.market.founder_questions())
}

async fn review_query(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(review): ApiJson<QueryReview>,
) -> ApiResult<Json<FounderQuery>> {
    Ok(Json(state.market.review_query(&auth.actor, &id, review)?))
}
