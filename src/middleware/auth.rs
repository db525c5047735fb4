use axum::http::HeaderMap;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::config::TokenEntry;
use crate::models::user::UserIdentity;

/// Resolves a connection credential to a user identity.
///
/// Called once per connection, before the WebSocket upgrade.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, token: &str) -> Option<UserIdentity>;
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// In-memory credential table keyed by token hash.
#[derive(Default)]
pub struct StaticTokenResolver {
    users: DashMap<String, UserIdentity>,
}

impl StaticTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[TokenEntry]) -> Self {
        let resolver = Self::new();
        for entry in entries {
            resolver.insert(&entry.token, entry.user.clone());
        }
        resolver
    }

    pub fn insert(&self, token: &str, user: UserIdentity) {
        self.users.insert(hash_token(token), user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl IdentityResolver for StaticTokenResolver {
    fn resolve(&self, token: &str) -> Option<UserIdentity> {
        self.users.get(&hash_token(token)).map(|u| u.clone())
    }
}

/// Credential from `Authorization: Bearer ...`, falling back to the `token`
/// query parameter for browser clients that cannot set headers on a socket.
pub fn extract_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    let from_header = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    from_header
        .or(query_token.map(str::trim).filter(|t| !t.is_empty()))
        .map(str::to_string)
}
