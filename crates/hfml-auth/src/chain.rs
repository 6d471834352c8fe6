//! Ordered credential chain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::client_secret::ClientSecretCredential;
use crate::credential::TokenCredential;
use crate::errors::AuthError;
use crate::managed_identity::ManagedIdentityCredential;
use crate::token::AccessToken;

/// Tries each credential in order; the first token wins.
pub struct DefaultCredential {
    sources: Vec<Arc<dyn TokenCredential>>,
}

impl DefaultCredential {
    /// Chain over explicit credentials.
    pub fn new(sources: Vec<Arc<dyn TokenCredential>>) -> Self {
        Self { sources }
    }

    /// Standard chain: environment service principal (if configured),
    /// then managed identity for `managed_identity_client_id`.
    pub fn for_managed_identity(managed_identity_client_id: &str) -> Self {
        let mut sources: Vec<Arc<dyn TokenCredential>> = Vec::new();
        if let Some(env) = ClientSecretCredential::from_env() {
            sources.push(Arc::new(env));
        }
        sources.push(Arc::new(ManagedIdentityCredential::new(Some(
            managed_identity_client_id.to_string(),
        ))));
        Self::new(sources)
    }

    /// Names of the chained credentials, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for DefaultCredential {
    fn name(&self) -> &'static str {
        "DefaultCredential"
    }

    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, AuthError> {
        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.get_token(scopes).await {
                Ok(token) => {
                    debug!(credential = source.name(), "credential chain resolved");
                    return Ok(token);
                }
                Err(e) => {
                    debug!(credential = source.name(), error = %e, "credential unavailable");
                    failures.push(format!("{}: {e}", source.name()));
                }
            }
        }
        warn!(attempts = failures.len(), "no credential in chain produced a token");
        Err(AuthError::Unavailable(if failures.is_empty() {
            "credential chain is empty".to_string()
        } else {
            failures.join("; ")
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
