//! Ledger records
//!
//! A transfer is recorded as a double-entry pair: one DEBIT on the source
//! account and one CREDIT on the destination, sharing amount, note, timestamp
//! and transfer id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{AccountId, Amount};

/// Prefix of every transaction id
pub const TRANSACTION_ID_PREFIX: &str = "TXN";

/// Number of decimal digits after the prefix
pub const TRANSACTION_ID_DIGITS: usize = 10;

/// Transaction identifier: `TXN` followed by exactly 10 decimal digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed transaction id: {0}")]
pub struct MalformedTransactionId(String);

impl TransactionId {
    /// Build an id from its numeric sequence. Returns `None` when the number
    /// does not fit in 10 digits.
    pub fn from_sequence(sequence: u64) -> Option<Self> {
        if sequence >= 10u64.pow(TRANSACTION_ID_DIGITS as u32) {
            return None;
        }
        Some(Self(format!(
            "{TRANSACTION_ID_PREFIX}{sequence:0width$}",
            width = TRANSACTION_ID_DIGITS
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `s` has the `TXN` + 10 digit shape
    pub fn is_well_formed(s: &str) -> bool {
        s.strip_prefix(TRANSACTION_ID_PREFIX).is_some_and(|digits| {
            digits.len() == TRANSACTION_ID_DIGITS && digits.bytes().all(|b| b.is_ascii_digit())
        })
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TransactionId {
    type Err = MalformedTransactionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if Self::is_well_formed(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(MalformedTransactionId(s.to_string()))
        }
    }
}

impl TryFrom<String> for TransactionId {
    type Error = MalformedTransactionId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

/// Side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "DEBIT",
            TransactionType::Credit => "CREDIT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub transfer_id: Uuid,
    pub account_id: AccountId,
    pub counterparty_account_id: AccountId,
    pub transaction_type: TransactionType,
    pub amount: Amount,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

/// Inputs shared by both sides of a double-entry pair
#[derive(Debug, Clone)]
pub struct TransferLeg<'a> {
    pub transfer_id: Uuid,
    pub from: &'a AccountId,
    pub to: &'a AccountId,
    pub amount: Amount,
    pub note: &'a str,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Build the DEBIT/CREDIT pair for one transfer, debit first.
    pub fn double_entry(
        leg: TransferLeg<'_>,
        debit_id: TransactionId,
        credit_id: TransactionId,
    ) -> [Transaction; 2] {
        let debit = Transaction {
            id: debit_id,
            transfer_id: leg.transfer_id,
            account_id: leg.from.clone(),
            counterparty_account_id: leg.to.clone(),
            transaction_type: TransactionType::Debit,
            amount: leg.amount,
            note: leg.note.to_string(),
            timestamp: leg.timestamp,
        };
        let credit = Transaction {
            id: credit_id,
            transfer_id: leg.transfer_id,
            account_id: leg.to.clone(),
            counterparty_account_id: leg.from.clone(),
            transaction_type: TransactionType::Credit,
            amount: leg.amount,
            note: leg.note.to_string(),
            timestamp: leg.timestamp,
        };
        [debit, credit]
    }

    /// True if `other` is the opposite side of the same transfer
    pub fn is_reciprocal_of(&self, other: &Transaction) -> bool {
        self.transfer_id == other.transfer_id
            && self.transaction_type != other.transaction_type
            && self.account_id == other.counterparty_account_id
            && self.counterparty_account_id == other.account_id
            && self.amount == other.amount
    }
}
