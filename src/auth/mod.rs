//! Authentication
//!
//! The transfer core only needs a verified caller identity. `AuthGate` is the
//! seam; `StaticTokenGate` is the bundled implementation, matching bearer
//! tokens against SHA-256 digests loaded from configuration.

use std::collections::HashMap;

use crate::domain::AccountHolderId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,
}

/// Resolves a bearer token to the account holder it belongs to
pub trait AuthGate: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<AccountHolderId, AuthError>;
}

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, the first being the
/// literal `Bearer`.
pub fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Token gate backed by a fixed set of token digests
#[derive(Debug, Clone, Default)]
pub struct StaticTokenGate {
    // sha256(token) hex -> holder
    tokens: HashMap<String, AccountHolderId>,
}

impl StaticTokenGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, holder: AccountHolderId, token: &str) -> Self {
        self.tokens.insert(sha256_hex(token), holder);
        self
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        pairs
            .into_iter()
            .fold(Self::new(), |gate, (holder, token)| {
                gate.with_token(AccountHolderId::new(holder), token)
            })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl AuthGate for StaticTokenGate {
    fn authenticate(&self, token: &str) -> Result<AccountHolderId, AuthError> {
        self.tokens
            .get(&sha256_hex(token))
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
