//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::DomainError;
use crate::idempotency::IdempotencyError;
use crate::ledger::LedgerError;
use crate::transfer::ValidationError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Insufficient funds")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transfer would take account {0} over the balance limit")]
    BalanceLimitExceeded(String),

    #[error("Idempotency conflict: same key with different request")]
    IdempotencyConflict,

    #[error("Idempotency key is already being processed")]
    IdempotencyInProgress,

    #[error("Idempotency key was used by a failed transfer; use a new key")]
    IdempotencyKeyAbandoned,

    // Server errors (5xx)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidRequest(_)
            | AppError::InsufficientFunds { .. }
            | AppError::BalanceLimitExceeded(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            AppError::IdempotencyConflict
            | AppError::IdempotencyInProgress
            | AppError::IdempotencyKeyAbandoned => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(e) => e.code(),
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::InsufficientFunds { .. } => "insufficient_funds",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::AccountNotFound(_) => "account_not_found",
            AppError::BalanceLimitExceeded(_) => "balance_limit_exceeded",
            AppError::IdempotencyConflict => "idempotency_conflict",
            AppError::IdempotencyInProgress => "idempotency_in_progress",
            AppError::IdempotencyKeyAbandoned => "idempotency_key_abandoned",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Store errors after validation: not-found, insufficient funds and the
/// balance ceiling are the caller's problem, everything else is ours.
impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AccountNotFound(id) => AppError::AccountNotFound(id),
            DomainError::InsufficientFunds { required, available } => {
                AppError::InsufficientFunds { required, available }
            }
            DomainError::BalanceOverflow(id) => AppError::BalanceLimitExceeded(id),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<IdempotencyError> for AppError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::HashMismatch(_) => AppError::IdempotencyConflict,
            IdempotencyError::KeyInProgress => AppError::IdempotencyInProgress,
            IdempotencyError::KeyAbandoned(_) => AppError::IdempotencyKeyAbandoned,
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (error, details) = match &self {
            AppError::InsufficientFunds { required, available } => (
                self.to_string(),
                Some(format!("required {}, available {}", required, available)),
            ),
            AppError::AccountNotFound(id) => (self.to_string(), Some(id.clone())),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                ("Internal server error".to_string(), None)
            }
            AppError::Config(e) => {
                tracing::error!(error = ?e, "Config error");
                ("Internal server error".to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            status: "error",
            error,
            error_code: self.error_code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Validation(ValidationError::MissingAccount).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::InsufficientFunds {
                required: Decimal::ONE,
                available: Decimal::ZERO
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Unauthorized("no".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountNotFound("X".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::IdempotencyConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = AppError::from(ValidationError::SameAccount);
        assert_eq!(err.to_string(), "same account");
        assert_eq!(err.error_code(), "same_account");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_domain_error_mapping() {
        assert!(matches!(
            AppError::from(DomainError::AccountNotFound("ACC9".into())),
            AppError::AccountNotFound(id) if id == "ACC9"
        ));
        assert!(matches!(
            AppError::from(DomainError::insufficient_funds(Decimal::TEN, Decimal::ONE)),
            AppError::InsufficientFunds { .. }
        ));
        assert!(matches!(
            AppError::from(DomainError::LockPoisoned("ACC1".into())),
            AppError::Internal(_)
        ));
        assert!(matches!(AppError::from(DomainError::SameAccount), AppError::Internal(_)));

        let ceiling = AppError::from(DomainError::BalanceOverflow("ACC2".into()));
        assert!(matches!(ceiling, AppError::BalanceLimitExceeded(ref id) if id == "ACC2"));
        assert_eq!(ceiling.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_idempotency_error_mapping() {
        assert!(matches!(
            AppError::from(IdempotencyError::HashMismatch(uuid::Uuid::nil())),
            AppError::IdempotencyConflict
        ));
        assert!(matches!(
            AppError::from(IdempotencyError::KeyInProgress),
            AppError::IdempotencyInProgress
        ));

        let abandoned = AppError::from(IdempotencyError::KeyAbandoned(uuid::Uuid::nil()));
        assert!(matches!(abandoned, AppError::IdempotencyKeyAbandoned));
        assert_eq!(abandoned.status_code(), StatusCode::CONFLICT);
    }
}
