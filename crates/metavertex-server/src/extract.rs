// Request extractors: bearer-token authentication, plus body, query and path
// extractors whose rejections use the API error body.

use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{header, request::Parts};
use metavertex_core::auth::bearer_token;
use metavertex_core::model::user::{Actor, User};
use metavertex_core::MarketError;

use crate::error::ApiError;
use crate::state::AppState;

/// The raw token from `Authorization: Bearer <token>`.
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(|token| BearerToken(token.to_string()))
            .ok_or_else(|| MarketError::Unauthorized("Access token required".into()).into())
    }
}

/// An approved, signed-in caller.
pub struct AuthUser {
    pub user: User,
    pub actor: Actor,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.market.authenticate(&token)?;
        Ok(AuthUser {
            actor: Actor::from(&user),
            user,
        })
    }
}

/// `axum::Json` with malformed bodies reported as [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
