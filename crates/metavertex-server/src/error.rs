// HTTP mapping of marketplace errors.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use metavertex_core::MarketError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Body(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),
}

/// Malformed input is a 400 like any other validation failure. Missing
/// content types and oversized bodies keep their own status.
fn rejected(status: StatusCode, text: String) -> (StatusCode, String, Option<Vec<String>>) {
    let status = match status {
        StatusCode::UNPROCESSABLE_ENTITY => StatusCode::BAD_REQUEST,
        other => other,
    };
    (status, "Invalid request".to_string(), Some(vec![text]))
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::Market(MarketError::Invalid(details)) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(details),
            ),
            ApiError::Market(MarketError::Unauthorized(m)) => (StatusCode::UNAUTHORIZED, m, None),
            ApiError::Market(MarketError::Forbidden(m)) => (StatusCode::FORBIDDEN, m, None),
            ApiError::Market(MarketError::NotFound(m)) => (StatusCode::NOT_FOUND, m, None),
            ApiError::Market(MarketError::Conflict(m)) => (StatusCode::CONFLICT, m, None),
            ApiError::Market(MarketError::Storage(e)) => {
                error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, None),
            ApiError::Body(r) => rejected(r.status(), r.body_text()),
            ApiError::Query(r) => rejected(r.status(), r.body_text()),
            ApiError::Path(r) => rejected(r.status(), r.body_text()),
        };

        let mut body = json!({
            "error": message,
            "status": status.as_u16(),
        });
        if let Some(details) = details {
            body["details"] = json!(details);
        }

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_errors_carry_details() {
        let (status, body) = body_of(
            MarketError::Invalid(vec!["Name is required".into(), "Email is required".into()])
                .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], 400);
        assert_eq!(body["details"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn domain_errors_map_to_status_codes() {
        let cases = [
            (MarketError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (MarketError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (MarketError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MarketError::Conflict("x".into()), StatusCode::CONFLICT),
        ];
        for (err, expected) in cases {
            let (status, body) = body_of(err.into()).await;
            assert_eq!(status, expected);
            assert_eq!(body["error"], "x");
            assert!(body.get("details").is_none());
        }
    }

    #[tokio::test]
    async fn storage_errors_are_not_leaked() {
        let (status, body) =
            body_of(MarketError::Storage(anyhow::anyhow!("disk /var/db is full")).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
