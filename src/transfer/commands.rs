//! Command and result types
//!
//! Commands represent intentions to change the system state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, Balance, Transaction};

/// Command to move funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Decimal,
    pub note: String,
}

impl TransferCommand {
    pub fn new(from_account_id: impl Into<String>, to_account_id: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from_account_id: from_account_id.into(),
            to_account_id: to_account_id.into(),
            amount,
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Result of a successful transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub transfer_id: Uuid,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    pub note: String,
    /// DEBIT then CREDIT
    pub transactions: Vec<Transaction>,
    pub from_balance: Balance,
    pub to_balance: Balance,
}

impl TransferResult {
    pub fn debit(&self) -> Option<&Transaction> {
        self.transactions.first()
    }

    pub fn credit(&self) -> Option<&Transaction> {
        self.transactions.get(1)
    }
}
