//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, OperationContext, Transaction, TransactionType};
use crate::error::AppError;
use crate::transfer::{ReconciliationReport, TransferCommand, TransferResult};

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

/// Missing fields deserialize to empty values so validation can report them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferRequest {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Decimal,
    pub note: String,
}

/// Envelope shared by all successful responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn with_message(mut self, message: &'static str) -> Self {
        self.message = Some(message);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub id: String,
    pub account_id: AccountId,
    pub counterparty_account_id: AccountId,
    pub transaction_type: TransactionType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub note: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Transaction> for TransactionEntry {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id.into(),
            account_id: t.account_id,
            counterparty_account_id: t.counterparty_account_id,
            transaction_type: t.transaction_type,
            amount: t.amount.value(),
            note: t.note,
            timestamp: t.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub note: String,
    pub transactions: Vec<TransactionEntry>,
}

impl From<TransferResult> for TransferResponse {
    fn from(result: TransferResult) -> Self {
        Self {
            from_account_id: result.from_account_id,
            to_account_id: result.to_account_id,
            amount: result.amount,
            note: result.note,
            transactions: result.transactions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/transactions/transfer/internal", post(transfer_internal))
        .route("/accounts/:account_id", get(get_account))
        .route("/accounts/:account_id/transactions", get(get_account_transactions))
        .route("/ledger/reconciliation", get(get_reconciliation))
}

// =========================================================================
// POST /transactions/transfer/internal
// =========================================================================

/// Move funds between two accounts
async fn transfer_internal(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TransferResponse>>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::InvalidRequest(e.body_text()))?;
    let idempotency_key = idempotency_key(&headers)?;

    let command = TransferCommand::new(request.from_account_id, request.to_account_id, request.amount)
        .with_note(request.note);

    let result = state.transfers.execute(command, idempotency_key, &context)?;

    Ok(Json(
        ApiResponse::success(TransferResponse::from(result))
            .with_message("Funds transferred successfully"),
    ))
}

fn idempotency_key(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    headers
        .get("Idempotency-Key")
        .map(|value| {
            value
                .to_str()
                .ok()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| AppError::InvalidRequest("Idempotency-Key must be a UUID".to_string()))
        })
        .transpose()
}

// =========================================================================
// GET /accounts/:account_id
// =========================================================================

async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<AccountResponse>>, AppError> {
    let account = state
        .transfers
        .store()
        .find(&AccountId::new(account_id.as_str()))?
        .ok_or(AppError::AccountNotFound(account_id))?;

    Ok(Json(ApiResponse::success(AccountResponse {
        id: account.id,
        name: account.name,
        balance: account.balance.value(),
    })))
}

// =========================================================================
// GET /accounts/:account_id/transactions
// =========================================================================

async fn get_account_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TransactionEntry>>>, AppError> {
    let transactions = state
        .transfers
        .account_transactions(&AccountId::new(account_id))?;

    Ok(Json(ApiResponse::success(
        transactions.into_iter().map(Into::into).collect(),
    )))
}

// =========================================================================
// GET /ledger/reconciliation
// =========================================================================

async fn get_reconciliation(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ReconciliationReport>>, AppError> {
    let report = state.transfers.reconcile()?;
    Ok(Json(ApiResponse::success(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_missing_fields_default() {
        let request: TransferRequest = serde_json::from_str(r#"{"toAccountId":"ACC002","amount":100}"#).unwrap();
        assert_eq!(request.from_account_id, "");
        assert_eq!(request.to_account_id, "ACC002");
        assert_eq!(request.amount, Decimal::new(100, 0));
        assert_eq!(request.note, "");
    }

    #[test]
    fn test_transfer_request_accepts_fractional_numbers() {
        let request: TransferRequest =
            serde_json::from_str(r#"{"fromAccountId":"A","toAccountId":"B","amount":10.25,"note":"x"}"#).unwrap();
        assert_eq!(request.amount, Decimal::new(1025, 2));
    }

    #[test]
    fn test_idempotency_key_header() {
        let mut headers = HeaderMap::new();
        assert!(idempotency_key(&headers).unwrap().is_none());

        let key = Uuid::new_v4();
        headers.insert("Idempotency-Key", key.to_string().parse().unwrap());
        assert_eq!(idempotency_key(&headers).unwrap(), Some(key));

        headers.insert("Idempotency-Key", "not-a-uuid".parse().unwrap());
        assert!(matches!(idempotency_key(&headers), Err(AppError::InvalidRequest(_))));
    }
}
