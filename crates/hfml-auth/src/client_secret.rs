//! Service principal (client secret) credential.
//!
//! Uses the Microsoft identity platform v2 token endpoint with the
//! `client_credentials` grant.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::credential::TokenCredential;
use crate::errors::AuthError;
use crate::token::{AccessToken, NumberOrString, TokenCache};

/// Public cloud authority.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Credential for a service principal with a client secret.
pub struct ClientSecretCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority_host: String,
    http: reqwest::Client,
    cache: TokenCache,
}

impl ClientSecretCredential {
    /// Credential against the public cloud authority.
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            http: reqwest::Client::new(),
            cache: TokenCache::default(),
        }
    }

    /// Override the authority host (sovereign clouds, tests).
    #[must_use]
    pub fn with_authority_host(mut self, host: impl Into<String>) -> Self {
        self.authority_host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`
    /// and optional `AZURE_AUTHORITY_HOST`. Returns `None` unless all three
    /// required variables are set.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let cred = Self::new(
            read("AZURE_TENANT_ID")?,
            read("AZURE_CLIENT_ID")?,
            read("AZURE_CLIENT_SECRET")?,
        );
        Some(match read("AZURE_AUTHORITY_HOST") {
            Some(host) => cred.with_authority_host(host),
            None => cred,
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host, self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "ClientSecretCredential"
    }

    #[tracing::instrument(skip_all, fields(credential = "client_secret"))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cache.get(scopes) {
            return Ok(token);
        }

        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];
        let resp = self.http.post(self.token_url()).form(&form).send().await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequest {
                status,
                message: text,
            });
        }

        let data: TokenResponse = resp.json().await?;
        let expires_in = data.expires_in.as_i64().unwrap_or(0);
        let token = AccessToken::expiring_in(data.access_token, expires_in);
        info!(tenant = %self.tenant_id, "service principal token acquired");
        self.cache.put(scopes, &token);
        Ok(token)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: NumberOrString,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
