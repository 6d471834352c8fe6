//! Authenticated Resource Manager client scoped to one workspace.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use hfml_auth::TokenCredential;
use hfml_core::constants::{
    ARM_API_VERSION, DEFAULT_POLL_INTERVAL_MS, MANAGEMENT_SCOPE, MANAGEMENT_URL, user_agent,
};
use hfml_settings::RuntimeSettings;

use crate::errors::{ClientError, Result};
use crate::poller::Poller;
use crate::resources::{OnlineDeployment, OnlineEndpoint};
use crate::workspace::WorkspaceConfig;

/// Connection options for [`MlClient`].
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Resource Manager base URL.
    pub management_url: String,
    /// `api-version` query parameter.
    pub api_version: String,
    /// Poll interval for long-running operations without `Retry-After`.
    pub poll_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            management_url: MANAGEMENT_URL.to_string(),
            api_version: ARM_API_VERSION.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ClientOptions {
    /// Options taken from the `Runtime` settings section.
    pub fn from_runtime(runtime: &RuntimeSettings) -> Self {
        Self {
            management_url: runtime.management_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(runtime.poll_interval_ms),
            ..Self::default()
        }
    }
}

/// Endpoint scoring keys.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointKeys {
    /// Primary key.
    pub primary_key: String,
}

/// Management client for one machine learning workspace.
pub struct MlClient {
    credential: Arc<dyn TokenCredential>,
    workspace: WorkspaceConfig,
    options: ClientOptions,
    http: reqwest::Client,
}

impl MlClient {
    /// Client for an explicit workspace.
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        workspace: WorkspaceConfig,
        options: ClientOptions,
    ) -> Self {
        Self {
            credential,
            workspace,
            options,
            http: reqwest::Client::builder()
                .user_agent(user_agent())
                .build()
                .unwrap_or_default(),
        }
    }

    /// Client for the workspace config discovered from `start_dir` upward.
    pub fn from_config(
        credential: Arc<dyn TokenCredential>,
        start_dir: &Path,
        options: ClientOptions,
    ) -> Result<Self> {
        let (workspace, path) = WorkspaceConfig::discover(start_dir)?;
        info!(path = %path.display(), workspace = %workspace.workspace_name, "using discovered workspace config");
        Ok(Self::new(credential, workspace, options))
    }

    /// Client for the workspace config at `path`.
    pub fn from_config_path(
        credential: Arc<dyn TokenCredential>,
        path: &Path,
        options: ClientOptions,
    ) -> Result<Self> {
        let workspace = WorkspaceConfig::from_path(path)?;
        info!(path = %path.display(), workspace = %workspace.workspace_name, "using workspace config");
        Ok(Self::new(credential, workspace, options))
    }

    /// Target workspace.
    pub fn workspace(&self) -> &WorkspaceConfig {
        &self.workspace
    }

    pub(crate) fn options(&self) -> &ClientOptions {
        &self.options
    }

    // ── URLs ────────────────────────────────────────────────────────────

    fn workspace_url(&self) -> String {
        let ws = &self.workspace;
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.MachineLearningServices/workspaces/{}",
            self.options.management_url, ws.subscription_id, ws.resource_group, ws.workspace_name
        )
    }

    fn endpoint_url(&self, endpoint_name: &str) -> String {
        format!("{}/onlineEndpoints/{endpoint_name}", self.workspace_url())
    }

    fn deployment_url(&self, endpoint_name: &str, deployment_name: &str) -> String {
        format!(
            "{}/deployments/{deployment_name}",
            self.endpoint_url(endpoint_name)
        )
    }

    // ── Transport ───────────────────────────────────────────────────────

    async fn bearer(&self) -> Result<String> {
        Ok(self.credential.get_token(&[MANAGEMENT_SCOPE]).await?.token)
    }

    /// Authenticated request against a Resource Manager URL.
    ///
    /// Status URLs returned by the service already carry `api-version`, so it
    /// is only appended when missing.
    pub(crate) async fn arm_request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder> {
        let mut request = self.http.request(method, url).bearer_auth(self.bearer().await?);
        if !url.contains("api-version=") {
            request = request.query(&[("api-version", self.options.api_version.as_str())]);
        }
        Ok(request)
    }

    // ── Operations ──────────────────────────────────────────────────────

    /// Azure region of the workspace; new resources are created there.
    #[tracing::instrument(skip_all)]
    pub async fn workspace_location(&self) -> Result<String> {
        let resp = self
            .arm_request(reqwest::Method::GET, &self.workspace_url())
            .await?
            .send()
            .await?;
        let body: Value = check(resp).await?.json().await?;
        body.get("location")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ClientError::MissingProperty("location"))
    }

    /// Start create-or-update of an online endpoint.
    #[tracing::instrument(skip_all, fields(endpoint = %endpoint.name))]
    pub async fn begin_create_or_update_endpoint(
        &self,
        endpoint: &OnlineEndpoint,
    ) -> Result<Poller<'_>> {
        let location = self.workspace_location().await?;
        let url = self.endpoint_url(&endpoint.name);
        self.begin_put(url, endpoint.to_body(&location)).await
    }

    /// Start create-or-update of a deployment under its endpoint.
    #[tracing::instrument(skip_all, fields(endpoint = %deployment.endpoint_name, deployment = %deployment.name))]
    pub async fn begin_create_or_update_deployment(
        &self,
        deployment: &OnlineDeployment,
    ) -> Result<Poller<'_>> {
        let location = self.workspace_location().await?;
        let url = self.deployment_url(&deployment.endpoint_name, &deployment.name);
        self.begin_put(url, deployment.to_body(&location)).await
    }

    async fn begin_put(&self, url: String, body: Value) -> Result<Poller<'_>> {
        debug!(url = %url, "PUT resource");
        let resp = self
            .arm_request(reqwest::Method::PUT, &url)
            .await?
            .json(&body)
            .send()
            .await?;
        let resp = check(resp).await?;
        Poller::from_response(self, url, resp).await
    }

    /// Fetch an online endpoint resource.
    pub async fn get_endpoint(&self, endpoint_name: &str) -> Result<Value> {
        let resp = self
            .arm_request(reqwest::Method::GET, &self.endpoint_url(endpoint_name))
            .await?
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Fetch the scoring keys of an endpoint.
    pub async fn list_keys(&self, endpoint_name: &str) -> Result<EndpointKeys> {
        let url = format!("{}/listKeys", self.endpoint_url(endpoint_name));
        let resp = self
            .arm_request(reqwest::Method::POST, &url)
            .await?
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    /// Submit the contents of `request_file` to the endpoint's scoring URI,
    /// pinned to `deployment_name`. Returns the raw response body.
    #[tracing::instrument(skip_all, fields(endpoint = endpoint_name, deployment = deployment_name))]
    pub async fn invoke(
        &self,
        endpoint_name: &str,
        deployment_name: &str,
        request_file: &Path,
    ) -> Result<String> {
        let payload = tokio::fs::read(request_file).await?;

        let endpoint = self.get_endpoint(endpoint_name).await?;
        let scoring_uri = endpoint
            .pointer("/properties/scoringUri")
            .and_then(Value::as_str)
            .ok_or(ClientError::MissingProperty("properties.scoringUri"))?
            .to_string();
        let keys = self.list_keys(endpoint_name).await?;

        debug!(scoring_uri = %scoring_uri, bytes = payload.len(), "submitting scoring request");
        let resp = self
            .http
            .post(&scoring_uri)
            .bearer_auth(&keys.primary_key)
            .header(CONTENT_TYPE, "application/json")
            .header("azureml-model-deployment", deployment_name)
            .body(payload)
            .send()
            .await?;
        Ok(check(resp).await?.text().await?)
    }
}

/// Pass through success responses; turn error statuses into [`ClientError::Api`].
pub(crate) async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    let (code, message) = parse_error_body(&text);
    Err(ClientError::Api {
        status,
        code,
        message,
    })
}

/// Extract `error.code`/`error.message` from a Resource Manager error body,
/// falling back to the raw text.
fn parse_error_body(text: &str) -> (Option<String>, String) {
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        code: Option<String>,
        message: Option<String>,
    }

    match serde_json::from_str::<Envelope>(text) {
        Ok(Envelope { error }) => (error.code, error.message.unwrap_or_else(|| text.to_string())),
        Err(_) => (None, text.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
