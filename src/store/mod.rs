//! Account Store
//!
//! Authoritative balances. Each account sits behind its own mutex; a transfer
//! locks both of its accounts in `AccountId` order, checks and updates the two
//! balances, then releases them. Transfers over disjoint account pairs never
//! contend, and two transfers over the same pair cannot deadlock regardless of
//! direction.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rust_decimal::Decimal;

use crate::domain::{Account, AccountId, Amount, Balance, DomainError};

struct AccountCell {
    name: String,
    opening_balance: Balance,
    balance: Mutex<Balance>,
}

impl AccountCell {
    fn lock(&self, id: &AccountId) -> Result<MutexGuard<'_, Balance>, DomainError> {
        self.balance
            .lock()
            .map_err(|_| DomainError::LockPoisoned(id.to_string()))
    }
}

/// Balances of both accounts right after a transfer was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub amount: Amount,
    pub from_balance: Balance,
    pub to_balance: Balance,
}

/// One account as seen by `AccountStore::snapshot`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: Account,
    pub opening_balance: Balance,
}

/// In-memory account store with per-account locking
#[derive(Default)]
pub struct AccountStore {
    // BTreeMap iteration order is the global lock order
    accounts: RwLock<BTreeMap<AccountId, Arc<AccountCell>>>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new account with its starting balance
    pub fn open_account(
        &self,
        id: AccountId,
        name: impl Into<String>,
        opening_balance: Balance,
    ) -> Result<(), DomainError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DomainError::LockPoisoned("account index".to_string()))?;

        if accounts.contains_key(&id) {
            return Err(DomainError::DuplicateAccount(id.to_string()));
        }

        tracing::debug!(account_id = %id, balance = %opening_balance, "Account opened");
        accounts.insert(
            id,
            Arc::new(AccountCell {
                name: name.into(),
                opening_balance,
                balance: Mutex::new(opening_balance),
            }),
        );
        Ok(())
    }

    fn cell(&self, id: &AccountId) -> Result<Option<Arc<AccountCell>>, DomainError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DomainError::LockPoisoned("account index".to_string()))?;
        Ok(accounts.get(id).cloned())
    }

    /// Read-only lookup
    pub fn find(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let Some(cell) = self.cell(id)? else {
            return Ok(None);
        };
        let balance = *cell.lock(id)?;
        Ok(Some(Account::new(id.clone(), cell.name.clone(), balance)))
    }

    /// Move `amount` from `from` to `to`. Both balances change or neither does.
    ///
    /// # Errors
    /// - `SameAccount` if `from == to`
    /// - `InvalidAmount` if `amount` is not a valid positive amount
    /// - `AccountNotFound` if either account is absent
    /// - `InsufficientFunds` if `amount` exceeds the source balance
    pub fn apply_transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Decimal,
    ) -> Result<BalanceChange, DomainError> {
        if from == to {
            return Err(DomainError::SameAccount);
        }
        let amount = Amount::new(amount).map_err(|e| DomainError::InvalidAmount(e.to_string()))?;

        let from_cell = self
            .cell(from)?
            .ok_or_else(|| DomainError::AccountNotFound(from.to_string()))?;
        let to_cell = self
            .cell(to)?
            .ok_or_else(|| DomainError::AccountNotFound(to.to_string()))?;

        // Smaller id first
        let (mut from_balance, mut to_balance) = if from < to {
            let f = from_cell.lock(from)?;
            let t = to_cell.lock(to)?;
            (f, t)
        } else {
            let t = to_cell.lock(to)?;
            let f = from_cell.lock(from)?;
            (f, t)
        };

        if !from_balance.is_sufficient_for(&amount) {
            return Err(DomainError::insufficient_funds(
                amount.value(),
                from_balance.value(),
            ));
        }

        let new_from = from_balance
            .debit(&amount)
            .map_err(|_| DomainError::insufficient_funds(amount.value(), from_balance.value()))?;
        let new_to = to_balance
            .credit(&amount)
            .map_err(|_| DomainError::BalanceOverflow(to.to_string()))?;

        *from_balance = new_from;
        *to_balance = new_to;

        tracing::debug!(
            from = %from,
            to = %to,
            amount = %amount,
            from_balance = %new_from,
            to_balance = %new_to,
            "Balances updated"
        );

        Ok(BalanceChange {
            amount,
            from_balance: new_from,
            to_balance: new_to,
        })
    }

    /// Consistent view of every account, taken with all account locks held.
    pub fn snapshot(&self) -> Result<Vec<AccountSnapshot>, DomainError> {
        let cells: Vec<(AccountId, Arc<AccountCell>)> = {
            let accounts = self
                .accounts
                .read()
                .map_err(|_| DomainError::LockPoisoned("account index".to_string()))?;
            accounts
                .iter()
                .map(|(id, cell)| (id.clone(), Arc::clone(cell)))
                .collect()
        };

        // Same order as apply_transfer, so this cannot deadlock with it
        let guards = cells
            .iter()
            .map(|(id, cell)| cell.lock(id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(cells
            .iter()
            .zip(guards.iter())
            .map(|((id, cell), balance)| AccountSnapshot {
                account: Account::new(id.clone(), cell.name.clone(), **balance),
                opening_balance: cell.opening_balance,
            })
            .collect())
    }

    /// Sum of all balances, taken from a consistent snapshot
    pub fn total_balance(&self) -> Result<Decimal, DomainError> {
        Ok(self
            .snapshot()?
            .iter()
            .map(|s| s.account.balance.value())
            .sum())
    }

    pub fn len(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
