//! Idempotency Store
//!
//! Remembers the outcome of requests carrying an idempotency key so a resubmit
//! replays the first result instead of moving money twice.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdempotencyStatus {
    Processing,
    Completed,
    /// The request failed after it had side effects; the key is burnt
    Abandoned,
}

#[derive(Debug, Clone)]
struct IdempotencyEntry<T> {
    request_hash: String,
    status: IdempotencyStatus,
    response: Option<T>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdempotencyError {
    #[error("Key already exists and is being processed")]
    KeyInProgress,

    #[error("Request hash mismatch for key {0}")]
    HashMismatch(Uuid),

    #[error("Key {0} belongs to a request that failed after taking effect")]
    KeyAbandoned(Uuid),

    #[error("Key not found: {0}")]
    NotFound(Uuid),

    #[error("Idempotency store lock poisoned")]
    LockPoisoned,
}

/// In-memory idempotency keys with a time-to-live
pub struct IdempotencyStore<T> {
    entries: Mutex<HashMap<Uuid, IdempotencyEntry<T>>>,
    ttl: Duration,
}

impl<T: Clone> IdempotencyStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Claim `key` for a request.
    ///
    /// Returns `Ok(None)` when the caller should process the request, or
    /// `Ok(Some(response))` when the same request already completed.
    pub fn start_processing(&self, key: Uuid, request_hash: &str) -> Result<Option<T>, IdempotencyError> {
        let mut entries = self.entries.lock().map_err(|_| IdempotencyError::LockPoisoned)?;

        let now = Utc::now();
        let ttl = self.ttl;
        // Only completed keys expire; in-flight and abandoned ones stay claimed
        entries.retain(|_, entry| {
            entry.status != IdempotencyStatus::Completed || now - entry.created_at < ttl
        });

        if let Some(existing) = entries.get(&key) {
            if existing.request_hash != request_hash {
                return Err(IdempotencyError::HashMismatch(key));
            }
            return match existing.status {
                IdempotencyStatus::Processing => Err(IdempotencyError::KeyInProgress),
                IdempotencyStatus::Completed => Ok(existing.response.clone()),
                IdempotencyStatus::Abandoned => Err(IdempotencyError::KeyAbandoned(key)),
            };
        }

        entries.insert(
            key,
            IdempotencyEntry {
                request_hash: request_hash.to_string(),
                status: IdempotencyStatus::Processing,
                response: None,
                created_at: now,
            },
        );
        Ok(None)
    }

    /// Store the response of a completed request
    pub fn mark_completed(&self, key: Uuid, response: T) -> Result<(), IdempotencyError> {
        let mut entries = self.entries.lock().map_err(|_| IdempotencyError::LockPoisoned)?;
        let entry = entries.get_mut(&key).ok_or(IdempotencyError::NotFound(key))?;
        entry.status = IdempotencyStatus::Completed;
        entry.response = Some(response);
        Ok(())
    }

    /// Release the key of a failed request so it can be retried
    pub fn mark_failed(&self, key: Uuid) -> Result<(), IdempotencyError> {
        let mut entries = self.entries.lock().map_err(|_| IdempotencyError::LockPoisoned)?;
        entries
            .remove(&key)
            .map(|_| ())
            .ok_or(IdempotencyError::NotFound(key))
    }

    /// Keep `key` claimed forever. Used when a request failed after it had
    /// already changed state, so replaying it could apply the change twice.
    pub fn mark_abandoned(&self, key: Uuid) -> Result<(), IdempotencyError> {
        let mut entries = self.entries.lock().map_err(|_| IdempotencyError::LockPoisoned)?;
        let entry = entries.get_mut(&key).ok_or(IdempotencyError::NotFound(key))?;
        entry.status = IdempotencyStatus::Abandoned;
        entry.response = None;
        Ok(())
    }
}

/// Compute SHA-256 hash of a request for conflict detection
pub fn compute_request_hash(body: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}
