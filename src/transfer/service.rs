//! Transfer Service
//!
//! Orchestrates validate -> resolve -> reserve ids -> apply -> record for
//! internal transfers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AccountId, OperationContext, Transaction, TransactionId, TransferLeg};
use crate::error::AppError;
use crate::idempotency::{compute_request_hash, IdempotencyStore};
use crate::ledger::TransactionLedger;
use crate::store::{AccountStore, BalanceChange};

use super::reconcile::{reconcile, ReconciliationReport};
use super::validator::{validate, ValidatedTransfer};
use super::{TransferCommand, TransferResult};

/// Why a transfer failed, split by whether balances had already moved
#[derive(Debug)]
enum TransferFailure {
    /// Nothing changed; the request may be retried
    Rejected(AppError),
    /// Balances moved but the ledger pair was not recorded
    Unrecorded(AppError),
}

impl From<AppError> for TransferFailure {
    fn from(err: AppError) -> Self {
        TransferFailure::Rejected(err)
    }
}

impl TransferFailure {
    fn into_error(self) -> AppError {
        match self {
            TransferFailure::Rejected(e) | TransferFailure::Unrecorded(e) => e,
        }
    }
}

/// Executes transfers against an account store and records them in a ledger
pub struct TransferService {
    store: Arc<AccountStore>,
    ledger: Arc<TransactionLedger>,
    idempotency: Arc<IdempotencyStore<TransferResult>>,
    /// Set once a transfer moved balances without reaching the ledger
    halted: AtomicBool,
}

impl TransferService {
    pub fn new(
        store: Arc<AccountStore>,
        ledger: Arc<TransactionLedger>,
        idempotency: Arc<IdempotencyStore<TransferResult>>,
    ) -> Self {
        Self {
            store,
            ledger,
            idempotency,
            halted: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    /// True after an unrecorded transfer; no further transfers are accepted.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Execute a transfer, replaying the stored result when `idempotency_key`
    /// was already used for the same caller and command.
    ///
    /// A key whose transfer failed before touching balances is released for
    /// retry. A key whose transfer moved balances but was not recorded is
    /// kept and refuses every later use.
    pub fn execute(
        &self,
        command: TransferCommand,
        idempotency_key: Option<Uuid>,
        context: &OperationContext,
    ) -> Result<TransferResult, AppError> {
        let Some(key) = idempotency_key else {
            return self.execute_transfer(context, command);
        };

        let request_hash = request_fingerprint(context, &command)?;
        if let Some(previous) = self.idempotency.start_processing(key, &request_hash)? {
            tracing::info!(
                idempotency_key = %key,
                transfer_id = %previous.transfer_id,
                "Replaying completed transfer"
            );
            return Ok(previous);
        }

        match self.run(context, command) {
            Ok(result) => {
                // Money has moved; a bookkeeping failure here must not turn it into an error
                if let Err(e) = self.idempotency.mark_completed(key, result.clone()) {
                    tracing::error!(
                        idempotency_key = %key,
                        transfer_id = %result.transfer_id,
                        error = %e,
                        "Failed to store idempotent result"
                    );
                }
                Ok(result)
            }
            Err(TransferFailure::Rejected(e)) => {
                self.idempotency.mark_failed(key)?;
                Err(e)
            }
            Err(TransferFailure::Unrecorded(e)) => {
                if let Err(store_err) = self.idempotency.mark_abandoned(key) {
                    tracing::error!(idempotency_key = %key, error = %store_err, "Failed to abandon idempotency key");
                }
                Err(e)
            }
        }
    }

    /// Move funds between two accounts and record the double-entry pair.
    pub fn execute_transfer(
        &self,
        context: &OperationContext,
        command: TransferCommand,
    ) -> Result<TransferResult, AppError> {
        self.run(context, command).map_err(TransferFailure::into_error)
    }

    fn run(&self, context: &OperationContext, command: TransferCommand) -> Result<TransferResult, TransferFailure> {
        let Some(caller) = context.caller.as_ref() else {
            return Err(AppError::Unauthorized("Missing caller identity".to_string()).into());
        };

        let transfer = validate(&command)
            .inspect_err(|e| {
                tracing::warn!(
                    caller = %caller,
                    from = %command.from_account_id,
                    to = %command.to_account_id,
                    reason = %e,
                    "Transfer rejected by validation"
                );
            })
            .map_err(AppError::from)?;

        for id in [&transfer.from, &transfer.to] {
            if self.store.find(id).map_err(AppError::from)?.is_none() {
                tracing::warn!(caller = %caller, account_id = %id, "Transfer rejected: account not found");
                return Err(AppError::AccountNotFound(id.to_string()).into());
            }
        }

        // Refuse before touching balances if the ledger could not record the result
        let (debit_id, credit_id) = self.reserve_ledger_ids()?;

        let change = self
            .store
            .apply_transfer(&transfer.from, &transfer.to, transfer.amount.value())
            .map_err(AppError::from)
            .inspect_err(|e| {
                if e.is_client_error() {
                    tracing::warn!(caller = %caller, from = %transfer.from, to = %transfer.to, reason = %e, "Transfer rejected");
                }
            })?;

        // Balances have moved; from here on a failure leaves the ledger behind
        let transfer_id = Uuid::new_v4();
        let transactions = self
            .record(transfer_id, &transfer, debit_id, credit_id)
            .map_err(|e| {
                self.halted.store(true, Ordering::SeqCst);
                tracing::error!(
                    transfer_id = %transfer_id,
                    from = %transfer.from,
                    to = %transfer.to,
                    amount = %transfer.amount,
                    error = %e,
                    correlation_id = ?context.correlation_id,
                    "FATAL: balances updated but ledger append failed; transfers halted, reconciliation required"
                );
                TransferFailure::Unrecorded(e)
            })?;

        Ok(self.complete(transfer_id, transfer, change, transactions, context))
    }

    fn reserve_ledger_ids(&self) -> Result<(TransactionId, TransactionId), AppError> {
        if self.is_halted() {
            return Err(AppError::Internal(
                "Transfers halted after an unrecorded transfer".to_string(),
            ));
        }
        self.ledger.ensure_writable()?;
        Ok((self.ledger.next_id()?, self.ledger.next_id()?))
    }

    fn record(
        &self,
        transfer_id: Uuid,
        transfer: &ValidatedTransfer,
        debit_id: TransactionId,
        credit_id: TransactionId,
    ) -> Result<Vec<Transaction>, AppError> {
        let pair = Transaction::double_entry(
            TransferLeg {
                transfer_id,
                from: &transfer.from,
                to: &transfer.to,
                amount: transfer.amount,
                note: &transfer.note,
                timestamp: Utc::now(),
            },
            debit_id,
            credit_id,
        );

        Ok(self.ledger.append(pair.to_vec())?)
    }

    fn complete(
        &self,
        transfer_id: Uuid,
        transfer: ValidatedTransfer,
        change: BalanceChange,
        transactions: Vec<Transaction>,
        context: &OperationContext,
    ) -> TransferResult {
        tracing::info!(
            transfer_id = %transfer_id,
            from = %transfer.from,
            to = %transfer.to,
            amount = %transfer.amount,
            debit_id = %transactions[0].id,
            credit_id = %transactions[1].id,
            correlation_id = ?context.correlation_id,
            "Transfer completed"
        );

        TransferResult {
            transfer_id,
            from_account_id: transfer.from,
            to_account_id: transfer.to,
            amount: change.amount.value(),
            note: transfer.note,
            transactions,
            from_balance: change.from_balance,
            to_balance: change.to_balance,
        }
    }

    /// Cross-check ledger totals against live balances
    pub fn reconcile(&self) -> Result<ReconciliationReport, AppError> {
        let report = reconcile(&self.store, &self.ledger)?;
        if !report.is_consistent() {
            tracing::error!(
                discrepancies = report.discrepancies.len(),
                "Ledger and balances are inconsistent"
            );
        }
        Ok(report)
    }

    /// Transactions of one account; `AccountNotFound` if the account does not exist
    pub fn account_transactions(&self, account_id: &AccountId) -> Result<Vec<Transaction>, AppError> {
        if self.store.find(account_id)?.is_none() {
            return Err(AppError::AccountNotFound(account_id.to_string()));
        }
        Ok(self.ledger.for_account(account_id)?)
    }
}

fn request_fingerprint(context: &OperationContext, command: &TransferCommand) -> Result<String, AppError> {
    let caller = context.caller.as_ref().map(|c| c.as_str()).unwrap_or_default();
    let body = serde_json::to_vec(&(caller, command))
        .map_err(|e| AppError::Internal(format!("Failed to serialize command: {}", e)))?;
    Ok(compute_request_hash(&body))
}
