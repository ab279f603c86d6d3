//! Shared application state

use std::sync::Arc;

use chrono::Duration;

use crate::auth::{AuthGate, StaticTokenGate};
use crate::config::Config;
use crate::domain::{AccountId, Balance, DomainError};
use crate::idempotency::IdempotencyStore;
use crate::ledger::TransactionLedger;
use crate::store::AccountStore;
use crate::transfer::TransferService;
use crate::AppError;

#[derive(Clone)]
pub struct AppState {
    pub transfers: Arc<TransferService>,
    pub auth: Arc<dyn AuthGate>,
}

impl AppState {
    pub fn new(transfers: Arc<TransferService>, auth: Arc<dyn AuthGate>) -> Self {
        Self { transfers, auth }
    }

    /// Build the store, ledger and token gate described by `config`
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let store = AccountStore::new();
        for seed in &config.seed_accounts {
            let balance = Balance::new(seed.balance)
                .map_err(|e| DomainError::InvalidAmount(format!("{}: {}", seed.id, e)))?;
            store.open_account(AccountId::new(seed.id.as_str()), seed.name.as_str(), balance)?;
        }

        let transfers = TransferService::new(
            Arc::new(store),
            Arc::new(TransactionLedger::new()),
            Arc::new(IdempotencyStore::new(Duration::seconds(config.idempotency_ttl_secs))),
        );

        let gate = StaticTokenGate::from_pairs(
            config
                .auth_tokens
                .iter()
                .map(|(holder, token)| (holder.as_str(), token.as_str())),
        );

        Ok(Self::new(Arc::new(transfers), Arc::new(gate)))
    }
}
