//! Transfer module
//!
//! Internal funds transfers: validation, execution and reconciliation.

mod commands;
pub mod reconcile;
mod service;
pub mod validator;


pub use commands::{TransferCommand, TransferResult};
pub use reconcile::{Discrepancy, ReconciliationReport};
pub use service::TransferService;
pub use validator::{ValidatedTransfer, ValidationError};
