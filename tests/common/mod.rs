//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::Duration;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;

use funds_transfer::api::{self, AppState};
use funds_transfer::auth::StaticTokenGate;
use funds_transfer::idempotency::IdempotencyStore;
use funds_transfer::{AccountId, AccountStore, Balance, TransactionLedger, TransferService};

pub const TEST_TOKEN: &str = "test_token_123";
pub const TEST_HOLDER: &str = "test-holder";

/// Build application state with the given accounts and a single known token
pub fn setup_state(accounts: &[(&str, &str, Decimal)]) -> AppState {
    let store = AccountStore::new();
    for (id, name, balance) in accounts {
        store
            .open_account(AccountId::new(*id), *name, Balance::new(*balance).unwrap())
            .expect("Failed to seed account");
    }

    let transfers = TransferService::new(
        Arc::new(store),
        Arc::new(TransactionLedger::new()),
        Arc::new(IdempotencyStore::new(Duration::hours(1))),
    );
    let gate = StaticTokenGate::from_pairs([(TEST_HOLDER, TEST_TOKEN)]);

    AppState::new(Arc::new(transfers), Arc::new(gate))
}

pub fn setup_app(accounts: &[(&str, &str, Decimal)]) -> (Router, AppState) {
    let state = setup_state(accounts);
    (api::build_router(state.clone()), state)
}

pub fn transfer_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/transactions/transfer/internal")
        .header("content-type", "application/json")
        .header("Authorization", format!("Bearer {}", TEST_TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
