//! Domain module
//!
//! Core domain types: money, accounts, ledger records and errors.

pub mod account;
pub mod amount;
pub mod context;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId};
pub use amount::{Amount, AmountError, Balance};
pub use context::{AccountHolderId, OperationContext};
pub use error::DomainError;
pub use transaction::{Transaction, TransactionId, TransactionType, TransferLeg};
