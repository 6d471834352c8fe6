//! Managed identity credential.
//!
//! Two token sources are supported:
//! - **App Service / Functions**: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`
//!   environment variables, `api-version=2019-08-01`, secret sent in
//!   `X-IDENTITY-HEADER`
//! - **IMDS** (VMs, compute instances, AKS): fixed link-local endpoint,
//!   `api-version=2018-02-01`, `Metadata: true` header
//!
//! Both take a v1 `resource` instead of a v2 scope, and both accept the
//! user-assigned identity's `client_id` as a query parameter.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::credential::TokenCredential;
use crate::errors::AuthError;
use crate::token::{AccessToken, NumberOrString, TokenCache, now_ms, scope_to_resource};

/// Instance metadata service token endpoint.
pub const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Connect timeout for IMDS. Off Azure the link-local address is usually
/// blackholed, and the chain should move on instead of waiting for the OS.
pub const IMDS_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

const IMDS_API_VERSION: &str = "2018-02-01";
const APP_SERVICE_API_VERSION: &str = "2019-08-01";

/// Where managed identity tokens come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManagedIdentitySource {
    /// Instance metadata service.
    Imds {
        /// Token endpoint URL.
        endpoint: String,
    },
    /// App Service identity endpoint.
    AppService {
        /// Token endpoint URL (`IDENTITY_ENDPOINT`).
        endpoint: String,
        /// Shared secret (`IDENTITY_HEADER`).
        header: String,
    },
}

impl ManagedIdentitySource {
    /// Detect the source from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Detect the source through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("IDENTITY_ENDPOINT").filter(|v| !v.is_empty());
        let header = lookup("IDENTITY_HEADER").filter(|v| !v.is_empty());
        match (endpoint, header) {
            (Some(endpoint), Some(header)) => Self::AppService { endpoint, header },
            _ => Self::Imds {
                endpoint: IMDS_ENDPOINT.to_string(),
            },
        }
    }
}

/// Credential backed by the host's managed identity.
pub struct ManagedIdentityCredential {
    client_id: Option<String>,
    source: ManagedIdentitySource,
    http: reqwest::Client,
    cache: TokenCache,
}

impl ManagedIdentityCredential {
    /// Credential for `client_id` (user-assigned) or the system identity
    /// when `None`, with the source detected from the environment.
    pub fn new(client_id: Option<String>) -> Self {
        Self::with_source(client_id, ManagedIdentitySource::from_env())
    }

    /// Credential with an explicit token source.
    pub fn with_source(client_id: Option<String>, source: ManagedIdentitySource) -> Self {
        let mut http = reqwest::Client::builder();
        if matches!(source, ManagedIdentitySource::Imds { .. }) {
            http = http.connect_timeout(IMDS_CONNECT_TIMEOUT);
        }
        Self {
            client_id: client_id.filter(|c| !c.is_empty()),
            source,
            http: http.build().unwrap_or_default(),
            cache: TokenCache::default(),
        }
    }

    async fn request(&self, resource: &str) -> Result<AccessToken, AuthError> {
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let request = match &self.source {
            ManagedIdentitySource::Imds { endpoint } => {
                query.push(("api-version", IMDS_API_VERSION));
                self.http.get(endpoint).header("Metadata", "true")
            }
            ManagedIdentitySource::AppService { endpoint, header } => {
                query.push(("api-version", APP_SERVICE_API_VERSION));
                self.http.get(endpoint).header("X-IDENTITY-HEADER", header)
            }
        };

        let resp = request.query(&query).send().await?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequest {
                status,
                message: text,
            });
        }

        let data: ManagedIdentityTokenResponse = resp.json().await?;
        Ok(data.into_access_token())
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "ManagedIdentityCredential"
    }

    #[tracing::instrument(skip_all, fields(credential = "managed_identity"))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, AuthError> {
        if let Some(token) = self.cache.get(scopes) {
            return Ok(token);
        }

        let [scope] = scopes else {
            return Err(AuthError::InvalidScope(format!(
                "managed identity takes exactly one scope, got {}",
                scopes.len()
            )));
        };
        let resource =
            scope_to_resource(scope).ok_or_else(|| AuthError::InvalidScope((*scope).to_string()))?;

        debug!(resource = %resource, client_id = ?self.client_id, "requesting managed identity token");
        let token = self.request(&resource).await?;
        info!(expires_at = token.expires_at, "managed identity token acquired");
        self.cache.put(scopes, &token);
        Ok(token)
    }
}

/// IMDS and App Service token response.
#[derive(Deserialize)]
struct ManagedIdentityTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_on: Option<NumberOrString>,
    #[serde(default)]
    expires_in: Option<NumberOrString>,
}

impl ManagedIdentityTokenResponse {
    fn into_access_token(self) -> AccessToken {
        // expires_on is absolute epoch seconds; expires_in is relative
        let expires_at = self
            .expires_on
            .as_ref()
            .and_then(NumberOrString::as_i64)
            .map(|secs| secs * 1000)
            .or_else(|| {
                self.expires_in
                    .as_ref()
                    .and_then(NumberOrString::as_i64)
                    .map(|secs| now_ms() + secs * 1000)
            })
            .unwrap_or_else(now_ms);
        AccessToken {
            token: self.access_token,
            expires_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SCOPE: &str = "https://management.azure.com/.default";

    fn imds(server: &MockServer) -> ManagedIdentitySource {
        ManagedIdentitySource::Imds {
            endpoint: format!("{}/metadata/identity/oauth2/token", server.uri()),
        }
    }

    fn expires_on_in(secs: i64) -> String {
        (now_ms() / 1000 + secs).to_string()
    }

    #[test]
    fn source_defaults_to_imds() {
        let source = ManagedIdentitySource::from_lookup(|_| None);
        assert_eq!(
            source,
            ManagedIdentitySource::Imds {
                endpoint: IMDS_ENDPOINT.to_string()
            }
        );
    }

    #[test]
    fn source_app_service_needs_both_vars() {
        let only_endpoint = ManagedIdentitySource::from_lookup(|k| {
            (k == "IDENTITY_ENDPOINT").then(|| "http://localhost:8081/msi/token".to_string())
        });
        assert_matches!(only_endpoint, ManagedIdentitySource::Imds { .. });

        let both = ManagedIdentitySource::from_lookup(|k| match k {
            "IDENTITY_ENDPOINT" => Some("http://localhost:8081/msi/token".to_string()),
            "IDENTITY_HEADER" => Some("secret".to_string()),
            _ => None,
        });
        assert_matches!(both, ManagedIdentitySource::AppService { header, .. } if header == "secret");
    }

    #[tokio::test]
    async fn imds_token_with_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/metadata/identity/oauth2/token"))
            .and(header("Metadata", "true"))
            .and(query_param("resource", "https://management.azure.com/"))
            .and(query_param("client_id", "cid-456"))
            .and(query_param("api-version", "2018-02-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "mi-token",
                "expires_on": expires_on_in(3600),
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cred = ManagedIdentityCredential::with_source(Some("cid-456".into()), imds(&server));
        let token = cred.get_token(&[SCOPE]).await.unwrap();
        assert_eq!(token.token, "mi-token");
        assert!(!token.should_refresh());

        // second call served from cache (expect(1) verified on drop)
        let again = cred.get_token(&[SCOPE]).await.unwrap();
        assert_eq!(again, token);
    }

    #[tokio::test]
    async fn app_service_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/msi/token"))
            .and(header("X-IDENTITY-HEADER", "shh"))
            .and(query_param("api-version", "2019-08-01"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "app-token",
                "expires_on": now_ms() / 1000 + 3600
            })))
            .mount(&server)
            .await;

        let source = ManagedIdentitySource::AppService {
            endpoint: format!("{}/msi/token", server.uri()),
            header: "shh".into(),
        };
        let cred = ManagedIdentityCredential::with_source(None, source);
        assert_eq!(cred.get_token(&[SCOPE]).await.unwrap().token, "app-token");
    }

    #[tokio::test]
    async fn expires_in_used_when_expires_on_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": "7200"
            })))
            .mount(&server)
            .await;

        let cred = ManagedIdentityCredential::with_source(None, imds(&server));
        let token = cred.get_token(&[SCOPE]).await.unwrap();
        assert!(token.expires_at > now_ms() + 3_600_000);
    }

    #[tokio::test]
    async fn error_status_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string("Identity not found"),
            )
            .mount(&server)
            .await;

        let cred = ManagedIdentityCredential::with_source(Some("nope".into()), imds(&server));
        let err = cred.get_token(&[SCOPE]).await.unwrap_err();
        assert_matches!(err, AuthError::TokenRequest { status: 400, ref message } if message.contains("Identity not found"));
    }

    #[tokio::test]
    async fn rejects_multiple_scopes() {
        let cred = ManagedIdentityCredential::with_source(
            None,
            ManagedIdentitySource::Imds {
                endpoint: "http://127.0.0.1:9".into(),
            },
        );
        let err = cred.get_token(&[SCOPE, "other/.default"]).await.unwrap_err();
        assert_matches!(err, AuthError::InvalidScope(_));
    }

    #[test]
    fn empty_client_id_treated_as_system_identity() {
        let cred = ManagedIdentityCredential::with_source(
            Some(String::new()),
            ManagedIdentitySource::from_lookup(|_| None),
        );
        assert!(cred.client_id.is_none());
        assert_eq!(cred.name(), "ManagedIdentityCredential");
    }

    #[tokio::test]
    async fn unreachable_imds_fails_fast() {
        // TEST-NET-1 is never routed.
        let source = ManagedIdentitySource::Imds {
            endpoint: "http://192.0.2.1/metadata/identity/oauth2/token".to_string(),
        };
        let cred = ManagedIdentityCredential::with_source(None, source);
        let result = tokio::time::timeout(
            IMDS_CONNECT_TIMEOUT + Duration::from_secs(5),
            cred.get_token(&[SCOPE]),
        )
        .await
        .expect("IMDS request should give up within the connect timeout");
        assert_matches!(result, Err(AuthError::Http(_)));
    }
}
