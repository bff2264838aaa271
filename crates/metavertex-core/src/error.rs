// Domain error type shared by every marketplace operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketError {
    /// One or more input fields failed validation. Every failure is reported,
    /// not only the first.
    #[error("validation failed: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MarketError {
    pub fn invalid(message: impl Into<String>) -> Self {
        MarketError::Invalid(vec![message.into()])
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        MarketError::NotFound(format!("{what} not found: {id}"))
    }
}

pub type MarketResult<T> = Result<T, MarketError>;
