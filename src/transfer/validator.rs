//! Transfer validation
//!
//! Pure checks run before anything is locked or mutated. Checks run in a
//! fixed order (missing account, same account, amount) so a request with
//! several problems always reports the same one.

use crate::domain::{AccountId, Amount};

use super::TransferCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing account")]
    MissingAccount,

    #[error("same account")]
    SameAccount,

    #[error("invalid amount")]
    InvalidAmount,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingAccount => "missing_account",
            ValidationError::SameAccount => "same_account",
            ValidationError::InvalidAmount => "invalid_amount",
        }
    }
}

/// A command that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub note: String,
}

pub fn validate(command: &TransferCommand) -> Result<ValidatedTransfer, ValidationError> {
    if command.from_account_id.is_empty() || command.to_account_id.is_empty() {
        return Err(ValidationError::MissingAccount);
    }

    if command.from_account_id == command.to_account_id {
        return Err(ValidationError::SameAccount);
    }

    let amount = Amount::new(command.amount).map_err(|_| ValidationError::InvalidAmount)?;

    Ok(ValidatedTransfer {
        from: AccountId::new(command.from_account_id.as_str()),
        to: AccountId::new(command.to_account_id.as_str()),
        amount,
        note: command.note.clone(),
    })
}
