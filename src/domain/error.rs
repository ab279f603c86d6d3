//! Domain Error Types
//!
//! Errors raised by the account store. They carry no HTTP knowledge.

use rust_decimal::Decimal;
use thiserror::Error;

/// Failures of a balance operation on the account store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Account already exists: {0}")]
    DuplicateAccount(String),

    /// Credit would push the destination past the balance ceiling
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(String),

    #[error("Account lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DomainError {
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds { required, available }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AccountNotFound(_)
                | Self::InsufficientFunds { .. }
                | Self::InvalidAmount(_)
                | Self::SameAccount
        )
    }
}
