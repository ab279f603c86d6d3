//! Idempotency module
//!
//! Prevents duplicate request processing using idempotency keys.

mod store;

pub use store::{compute_request_hash, IdempotencyError, IdempotencyStore};
