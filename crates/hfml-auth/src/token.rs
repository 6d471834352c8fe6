//! Access tokens, expiry math and the per-credential cache.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Deserialize;

/// Refresh tokens this long before they expire (5 minutes).
pub const REFRESH_BUFFER_MS: i64 = 300_000;

/// Current time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A bearer token with its absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    /// The bearer token.
    pub token: String,
    /// Expiry in milliseconds since the Unix epoch.
    pub expires_at: i64,
}

impl AccessToken {
    /// Build a token that expires `expires_in_secs` from now.
    pub fn expiring_in(token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: now_ms() + expires_in_secs * 1000,
        }
    }

    /// Whether the token is expired or within the refresh buffer.
    pub fn should_refresh(&self) -> bool {
        now_ms() + REFRESH_BUFFER_MS >= self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Tokens keyed by their space-joined scope list.
#[derive(Default)]
pub(crate) struct TokenCache {
    tokens: Mutex<HashMap<String, AccessToken>>,
}

impl TokenCache {
    pub(crate) fn get(&self, scopes: &[&str]) -> Option<AccessToken> {
        let tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(&scopes.join(" "))
            .filter(|t| !t.should_refresh())
            .cloned()
    }

    pub(crate) fn put(&self, scopes: &[&str], token: &AccessToken) {
        let mut tokens = self.tokens.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = tokens.insert(scopes.join(" "), token.clone());
    }
}

/// Convert a `.default` scope to the v1 resource form (`https://x/.default` → `https://x/`).
pub fn scope_to_resource(scope: &str) -> Option<String> {
    let resource = scope.strip_suffix(".default")?;
    (!resource.is_empty()).then(|| resource.to_string())
}

/// Token endpoints disagree on whether numbers are JSON numbers or strings.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NumberOrString {
    Number(i64),
    String(String),
}

impl NumberOrString {
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
