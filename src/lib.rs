//! funds_transfer Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod idempotency;
pub mod ledger;
pub mod store;
pub mod transfer;

mod error;

pub use config::Config;
pub use domain::{Account, AccountId, Amount, AmountError, Balance, DomainError, OperationContext};
pub use error::{AppError, AppResult};
pub use ledger::TransactionLedger;
pub use store::AccountStore;
pub use transfer::{TransferCommand, TransferResult, TransferService};
