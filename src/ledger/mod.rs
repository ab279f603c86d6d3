//! Transaction Ledger
//!
//! Append-only record of completed debit/credit entries. A batch is appended
//! under a single write lock, so readers see a transfer's pair together or not
//! at all. Timestamps never go backwards in append order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::domain::{AccountId, Transaction, TransactionId};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Transaction id space exhausted")]
    IdSpaceExhausted,

    #[error("Duplicate transaction id: {0}")]
    DuplicateId(TransactionId),

    #[error("Ledger lock poisoned")]
    LockPoisoned,
}

#[derive(Default)]
struct LedgerState {
    entries: Vec<Transaction>,
    ids: HashSet<TransactionId>,
    last_timestamp: Option<DateTime<Utc>>,
}

pub struct TransactionLedger {
    sequence: AtomicU64,
    state: RwLock<LedgerState>,
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self {
            sequence: AtomicU64::new(1),
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// Issue a fresh transaction id (`TXN` + 10 digits) from a monotonic counter.
    pub fn next_id(&self) -> Result<TransactionId, LedgerError> {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        TransactionId::from_sequence(sequence).ok_or(LedgerError::IdSpaceExhausted)
    }

    /// Record a batch atomically and return the entries as stored.
    ///
    /// An entry stamped earlier than the last recorded one is moved forward to
    /// it, so timestamps are non-decreasing in ledger order.
    pub fn append(&self, entries: Vec<Transaction>) -> Result<Vec<Transaction>, LedgerError> {
        let mut state = self.state.write().map_err(|_| LedgerError::LockPoisoned)?;

        let mut batch_ids = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if state.ids.contains(&entry.id) || !batch_ids.insert(entry.id.clone()) {
                return Err(LedgerError::DuplicateId(entry.id.clone()));
            }
        }

        let floor = state.last_timestamp;
        let recorded: Vec<Transaction> = entries
            .into_iter()
            .map(|mut entry| {
                if let Some(floor) = floor {
                    entry.timestamp = entry.timestamp.max(floor);
                }
                entry
            })
            .collect();

        for entry in &recorded {
            state.last_timestamp = Some(
                state
                    .last_timestamp
                    .map_or(entry.timestamp, |last| last.max(entry.timestamp)),
            );
            state.ids.insert(entry.id.clone());
            state.entries.push(entry.clone());
        }

        Ok(recorded)
    }

    /// Fails once a writer panicked mid-append; nothing can be recorded after that.
    pub fn ensure_writable(&self) -> Result<(), LedgerError> {
        if self.state.is_poisoned() {
            return Err(LedgerError::LockPoisoned);
        }
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.entries.clone())
    }

    /// Entries of one account, in ledger order
    pub fn for_account(&self, account_id: &AccountId) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .entries
            .iter()
            .filter(|t| &t.account_id == account_id)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next issued id collide with one already handed out
    #[cfg(test)]
    pub(crate) fn rewind_sequence(&self, next: u64) {
        self.sequence.store(next, Ordering::Relaxed);
    }

    /// Leave the state lock poisoned, as a panicking writer would
    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _state = self.state.write();
            panic!("ledger writer panicked");
        }));
    }
}
