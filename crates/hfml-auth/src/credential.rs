//! The credential trait.

use async_trait::async_trait;

use crate::errors::AuthError;
use crate::token::AccessToken;

/// Something that can issue bearer tokens for a set of scopes.
///
/// Implementors must be `Send + Sync` so a credential can be shared with the
/// management client behind an `Arc`.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Short name used in logs and aggregated chain errors.
    fn name(&self) -> &'static str;

    /// Acquire a token, reusing a cached one when it is still fresh.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, AuthError>;
}
