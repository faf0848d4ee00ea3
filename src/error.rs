//! Crate-wide error type and its HTTP mapping.

use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, ComplaintError, OfferError, ProductError, ReviewError, TransitionError, UnknownStatus, WithdrawalError};
use crate::domain::value_objects::{CodeError, MoneyError, RatingError};
use crate::http::response::ApiResponse;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::InvalidStateTransition(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Config(_) | Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self { Self::NotFound(format!("{} not found", what)) }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
            self.to_string()
        };
        (status, ApiResponse::error(message, json!(null))).into_response()
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(e: validator::ValidationErrors) -> Self { Self::Validation(e.to_string()) }
}

impl From<TransitionError> for Error {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::NotPermitted { .. } => Self::Forbidden(e.to_string()),
            TransitionError::Deleted => Self::not_found("Order"),
            TransitionError::NoItems | TransitionError::TotalOverflow => Self::Validation(e.to_string()),
            _ => Self::InvalidStateTransition(e.to_string()),
        }
    }
}

impl From<UnknownStatus> for Error {
    fn from(e: UnknownStatus) -> Self { Self::Internal(e.to_string()) }
}

impl From<CodeError> for Error {
    fn from(e: CodeError) -> Self { Self::Validation(e.to_string()) }
}

impl From<RatingError> for Error {
    fn from(e: RatingError) -> Self { Self::Validation(e.to_string()) }
}

impl From<MoneyError> for Error {
    fn from(e: MoneyError) -> Self { Self::Validation(e.to_string()) }
}

impl From<CartError> for Error {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::not_found("Cart item"),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<ProductError> for Error {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

impl From<ReviewError> for Error {
    fn from(e: ReviewError) -> Self {
        match e {
            ReviewError::NotEligible => Self::NotFound(e.to_string()),
            ReviewError::AlreadyReviewed => Self::Conflict(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<ComplaintError> for Error {
    fn from(e: ComplaintError) -> Self {
        match e {
            ComplaintError::InvalidTransition { .. } => Self::InvalidStateTransition(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<WithdrawalError> for Error {
    fn from(e: WithdrawalError) -> Self {
        match e {
            WithdrawalError::NotCancellable(_) | WithdrawalError::InvalidTransition { .. } => Self::InvalidStateTransition(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}

impl From<OfferError> for Error {
    fn from(e: OfferError) -> Self {
        match e {
            OfferError::NotSeller => Self::Forbidden(e.to_string()),
            OfferError::AlreadyResponded => Self::InvalidStateTransition(e.to_string()),
            _ => Self::Validation(e.to_string()),
        }
    }
}
