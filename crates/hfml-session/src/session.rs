//! The session orchestrator.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use hfml_auth::{DefaultCredential, TokenCredential};
use hfml_client::{
    ClientError, ClientOptions, MlClient, OnlineDeployment, OnlineEndpoint, WorkspaceConfig, pretty_json,
    write_request_file,
};
use hfml_core::constants::MANAGEMENT_SCOPE;
use hfml_settings::{HfmlSettings, RuntimeSettings, SessionConfig, load_settings_from_path};

use crate::errors::{Result, SessionError};
use crate::report::{DeployReport, StepOutcome};
use crate::state::SessionState;

/// Builds the credential for a managed identity client id.
pub type CredentialFactory = Arc<dyn Fn(&str) -> Arc<dyn TokenCredential> + Send + Sync>;

fn default_credential(client_id: &str) -> Arc<dyn TokenCredential> {
    Arc::new(DefaultCredential::for_managed_identity(client_id))
}

/// One configured endpoint/deployment pair and the client that manages it.
pub struct Session {
    config: SessionConfig,
    runtime: RuntimeSettings,
    state: SessionState,
    credential_factory: CredentialFactory,
}

impl Session {
    /// Session over already-loaded settings.
    pub fn new(settings: &HfmlSettings) -> Self {
        Self {
            config: settings.session_config(),
            runtime: settings.runtime.clone(),
            state: SessionState::Unauthenticated,
            credential_factory: Arc::new(default_credential),
        }
    }

    /// Load the YAML config at `path` and build a session from it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let settings = load_settings_from_path(path)?;
        Ok(Self::new(&settings))
    }

    /// Replace how credentials are built (tests, alternative identities).
    #[must_use]
    pub fn with_credential_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn TokenCredential> + Send + Sync + 'static,
    {
        self.credential_factory = Arc::new(factory);
        self
    }

    /// Configured attributes.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Local runtime settings.
    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Registry URI of the configured model.
    pub fn model_id(&self) -> String {
        self.config.model_id()
    }

    // ── Authentication ──────────────────────────────────────────────────

    /// Build a credential for the configured client id and prove it by
    /// requesting a management token.
    ///
    /// On failure the session stays `Unauthenticated`.
    #[tracing::instrument(skip_all, fields(client_id = %self.config.client_id))]
    pub async fn authenticate(&mut self) -> Result<()> {
        let _ = self.login().await?;
        Ok(())
    }

    async fn login(&mut self) -> Result<Arc<dyn TokenCredential>> {
        let credential = (self.credential_factory)(&self.config.client_id);
        match credential.get_token(&[MANAGEMENT_SCOPE]).await {
            Ok(_) => {
                info!(credential = credential.name(), "authenticated");
                self.state = SessionState::Authenticated {
                    credential: Arc::clone(&credential),
                };
                Ok(credential)
            }
            Err(e) => {
                error!(error = %e, "authentication failed");
                self.state = SessionState::Unauthenticated;
                Err(SessionError::Authentication(e))
            }
        }
    }

    // ── Client ──────────────────────────────────────────────────────────

    /// Authenticate, then bind a management client to the workspace.
    ///
    /// Discovery searches `discovery_dir` and its ancestors for a workspace
    /// config. When none is usable, a config holding the subscription,
    /// resource group and workspace name is written to the fallback path
    /// and loaded from there.
    #[tracing::instrument(skip_all, fields(workspace = %self.config.workspace_name))]
    pub async fn acquire_client(&mut self) -> Result<()> {
        let credential = self.login().await?;
        let options = ClientOptions::from_runtime(&self.runtime);

        let client = match MlClient::from_config(
            Arc::clone(&credential),
            &self.runtime.discovery_dir,
            options.clone(),
        ) {
            Ok(client) => client,
            Err(e) => {
                let path = &self.runtime.fallback_config_path;
                warn!(error = %e, path = %path.display(), "workspace config not discovered, writing fallback");
                WorkspaceConfig::new(
                    &self.config.subscription_id,
                    &self.config.resource_group,
                    &self.config.workspace_name,
                )
                .write_to(path)
                .and_then(|()| MlClient::from_config_path(credential, path, options))
                .map_err(|e| {
                    error!(error = %e, "failed to acquire management client");
                    SessionError::Client(e)
                })?
            }
        };

        self.state = SessionState::ClientReady { client };
        Ok(())
    }

    fn client(&self, operation: &'static str) -> Result<&MlClient> {
        match &self.state {
            SessionState::ClientReady { client } => Ok(client),
            other => {
                warn!(operation, state = other.name(), "operation requires a management client");
                Err(SessionError::InvalidState {
                    operation,
                    state: other.name(),
                })
            }
        }
    }

    // ── Provisioning ────────────────────────────────────────────────────

    /// Create or update the online endpoint and wait for it.
    #[tracing::instrument(skip_all, fields(endpoint = %self.config.endpoint_name))]
    pub async fn ensure_endpoint(&self) -> Result<Value> {
        let client = self.client("ensure_endpoint")?;
        info!("Start configuring the endpoint");
        let endpoint = OnlineEndpoint::new(&self.config.endpoint_name);
        let result = match client.begin_create_or_update_endpoint(&endpoint).await {
            Ok(poller) => poller.wait().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(resource) => {
                info!("Endpoint is configured");
                Ok(resource)
            }
            Err(e) => {
                error!(error = %e, "endpoint provisioning failed");
                Err(SessionError::Endpoint(e))
            }
        }
    }

    /// Create or update the deployment behind the endpoint and wait for it.
    #[tracing::instrument(skip_all, fields(endpoint = %self.config.endpoint_name, deployment = %self.config.deployment_name))]
    pub async fn ensure_deployment(&self) -> Result<Value> {
        let client = self.client("ensure_deployment")?;
        info!("Start configuring the deployment");
        let deployment = OnlineDeployment {
            name: self.config.deployment_name.clone(),
            endpoint_name: self.config.endpoint_name.clone(),
            model: self.model_id(),
            instance_type: self.config.instance_type.clone(),
            instance_count: self.config.instance_count,
        };
        let result = match client.begin_create_or_update_deployment(&deployment).await {
            Ok(poller) => poller.wait().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(resource) => {
                info!("Deployment is configured");
                Ok(resource)
            }
            Err(e) => {
                error!(error = %e, "deployment provisioning failed");
                Err(SessionError::Deployment(e))
            }
        }
    }

    /// Acquire the client, then provision the endpoint and the deployment.
    ///
    /// Only client acquisition aborts. A failed endpoint step is recorded
    /// and the deployment step still runs.
    pub async fn deploy(&mut self) -> Result<DeployReport> {
        self.acquire_client().await?;
        let endpoint = outcome(self.ensure_endpoint().await);
        let deployment = outcome(self.ensure_deployment().await);
        let report = DeployReport {
            endpoint,
            deployment,
        };
        if report.is_success() {
            info!("deploy finished");
        } else {
            warn!(endpoint = ?report.endpoint, deployment = ?report.deployment, "deploy finished with failures");
        }
        Ok(report)
    }

    // ── Scoring ─────────────────────────────────────────────────────────

    /// Score `message` against the pinned deployment.
    ///
    /// Writes a fresh request file, submits it, and returns the response
    /// re-encoded as JSON with two-space indentation.
    #[tracing::instrument(skip_all, fields(endpoint = %self.config.endpoint_name, deployment = %self.config.deployment_name))]
    pub async fn invoke(&self, message: &str) -> Result<String> {
        let client = self.client("invoke")?;
        let result = async {
            let request_file = write_request_file(
                &self.runtime.request_dir,
                message,
                self.runtime.payload_encoding,
            )?;
            let body = client
                .invoke(
                    &self.config.endpoint_name,
                    &self.config.deployment_name,
                    &request_file,
                )
                .await?;
            Ok::<_, ClientError>(pretty_json(&body)?)
        }
        .await;

        result.map_err(|e| {
            error!(error = %e, "invocation failed");
            SessionError::Invocation(e)
        })
    }
}

fn outcome(result: Result<Value>) -> StepOutcome {
    match result {
        Ok(_) => StepOutcome::Succeeded,
        Err(e) => StepOutcome::Failed(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use hfml_auth::{AccessToken, AuthError};
    use hfml_core::logging::capture_logs;
    use hfml_settings::{PayloadEncoding, parse_settings};
    use tracing::Level;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const YAML: &str = r"
Azure:
  subscription_id: sub
  resource_group: rg
  identity:
    client_id: cid
  ml:
    workspace_name: ws
    compute:
      instance_type: Standard_DS3_v2
      instance_count: 2
Model:
  registry_name: HuggingFace
  model_name: bert-base-uncased
API:
  endpoint_name: ep
  deployment_name: blue
";

    const WS: &str = "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.MachineLearningServices/workspaces/ws";

    struct StaticToken;

    #[async_trait]
    impl TokenCredential for StaticToken {
        fn name(&self) -> &'static str {
            "StaticToken"
        }

        async fn get_token(&self, scopes: &[&str]) -> std::result::Result<AccessToken, AuthError> {
            assert_eq!(scopes, [MANAGEMENT_SCOPE]);
            Ok(AccessToken::expiring_in("arm-token", 3600))
        }
    }

    struct Denied;

    #[async_trait]
    impl TokenCredential for Denied {
        fn name(&self) -> &'static str {
            "Denied"
        }

        async fn get_token(&self, _scopes: &[&str]) -> std::result::Result<AccessToken, AuthError> {
            Err(AuthError::TokenRequest {
                status: 400,
                message: "identity not found".into(),
            })
        }
    }

    fn static_token(_client_id: &str) -> Arc<dyn TokenCredential> {
        Arc::new(StaticToken)
    }

    fn denied(_client_id: &str) -> Arc<dyn TokenCredential> {
        Arc::new(Denied)
    }

    struct Fixture {
        dir: tempfile::TempDir,
        server: MockServer,
    }

    impl Fixture {
        async fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
                server: MockServer::start().await,
            }
        }

        fn fallback_path(&self) -> PathBuf {
            self.dir.path().join("fallback").join("config.json")
        }

        fn request_dir(&self) -> PathBuf {
            self.dir.path().join("requests")
        }

        fn session(&self) -> Session {
            let mut settings = parse_settings(YAML).unwrap();
            let discovery = self.dir.path().join("project");
            std::fs::create_dir_all(&discovery).unwrap();
            settings.runtime = RuntimeSettings {
                fallback_config_path: self.fallback_path(),
                discovery_dir: discovery,
                request_dir: self.request_dir(),
                payload_encoding: PayloadEncoding::Structured,
                poll_interval_ms: 5,
                management_url: self.server.uri(),
                ..RuntimeSettings::default()
            };
            Session::new(&settings).with_credential_factory(static_token)
        }

        async fn mount_workspace(&self) {
            Mock::given(method("GET"))
                .and(path(WS))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({"location": "eastus"})),
                )
                .mount(&self.server)
                .await;
        }

        async fn mount_resource(&self, resource: &str, put_status: u16) {
            let url = format!("{WS}/{resource}");
            let put = if put_status < 300 {
                ResponseTemplate::new(put_status).set_body_json(serde_json::json!({
                    "properties": {"provisioningState": "Succeeded"}
                }))
            } else {
                ResponseTemplate::new(put_status).set_body_json(serde_json::json!({
                    "error": {"code": "InternalServerError", "message": "boom"}
                }))
            };
            Mock::given(method("PUT"))
                .and(path(url.as_str()))
                .respond_with(put)
                .expect(1)
                .mount(&self.server)
                .await;
            Mock::given(method("GET"))
                .and(path(url.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "properties": {
                        "provisioningState": "Succeeded",
                        "scoringUri": format!("{}/score", self.server.uri())
                    }
                })))
                .mount(&self.server)
                .await;
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    #[test]
    fn session_fields_and_model_id() {
        let settings = parse_settings(YAML).unwrap();
        let session = Session::new(&settings);
        let cfg = session.config();
        assert_eq!(cfg.subscription_id, "sub");
        assert_eq!(cfg.resource_group, "rg");
        assert_eq!(cfg.client_id, "cid");
        assert_eq!(cfg.workspace_name, "ws");
        assert_eq!(cfg.instance_type, "Standard_DS3_v2");
        assert_eq!(cfg.instance_count, 2);
        assert_eq!(cfg.endpoint_name, "ep");
        assert_eq!(cfg.deployment_name, "blue");
        assert_eq!(
            session.model_id(),
            "azureml://registries/HuggingFace/models/bert-base-uncased/labels/latest"
        );
        assert!(!session.state().is_ready());
    }

    #[test]
    fn missing_config_file_fails_and_logs() {
        let (logs, _guard) = capture_logs();
        let err = Session::from_path(Path::new("/nonexistent/config.yml")).err().unwrap();
        assert_matches!(err, SessionError::Configuration(_));
        assert!(logs.has_event(Level::ERROR, "failed to read config file"));
    }

    #[test]
    fn malformed_config_fails_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(&path, "Azure: [unclosed").unwrap();
        let (logs, _guard) = capture_logs();
        let err = Session::from_path(&path).err().unwrap();
        assert_matches!(err, SessionError::Configuration(_));
        assert!(logs.has_event(Level::ERROR, "failed to load config"));
    }

    // ── Authentication ──────────────────────────────────────────────────

    #[tokio::test]
    async fn authenticate_success_transitions() {
        let fx = Fixture::new().await;
        let mut session = fx.session();
        session.authenticate().await.unwrap();
        assert_eq!(session.state().name(), "authenticated");
    }

    #[tokio::test]
    async fn authenticate_failure_is_surfaced() {
        let fx = Fixture::new().await;
        let mut session = fx.session().with_credential_factory(denied);
        let (logs, _guard) = capture_logs();

        let err = session.authenticate().await.unwrap_err();
        assert_matches!(err, SessionError::Authentication(_));
        assert_eq!(session.state().name(), "unauthenticated");
        assert!(logs.has_event(Level::ERROR, "authentication failed"));
    }

    #[tokio::test]
    async fn credential_built_for_configured_client_id() {
        let fx = Fixture::new().await;
        let seen = Arc::new(std::sync::Mutex::new(String::new()));
        let sink = Arc::clone(&seen);
        let mut session = fx.session().with_credential_factory(move |client_id| {
            *sink.lock().unwrap() = client_id.to_string();
            Arc::new(StaticToken) as Arc<dyn TokenCredential>
        });
        session.authenticate().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), "cid");
    }

    // ── Client acquisition ──────────────────────────────────────────────

    #[tokio::test]
    async fn acquire_client_writes_fallback_config() {
        let fx = Fixture::new().await;
        let mut session = fx.session();
        session.acquire_client().await.unwrap();
        assert!(session.state().is_ready());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(fx.fallback_path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "subscription_id": "sub",
                "resource_group": "rg",
                "workspace_name": "ws"
            })
        );
    }

    #[tokio::test]
    async fn acquire_client_prefers_discovered_config() {
        let fx = Fixture::new().await;
        WorkspaceConfig::new("sub", "rg", "discovered")
            .write_to(&fx.dir.path().join("project").join(".azureml").join("config.json"))
            .unwrap();
        let mut session = fx.session();
        session.acquire_client().await.unwrap();

        assert_matches!(
            session.state(),
            SessionState::ClientReady { client } if client.workspace().workspace_name == "discovered"
        );
        assert!(!fx.fallback_path().exists());
    }

    #[tokio::test]
    async fn acquire_client_needs_authentication() {
        let fx = Fixture::new().await;
        let mut session = fx.session().with_credential_factory(denied);
        assert_matches!(
            session.acquire_client().await,
            Err(SessionError::Authentication(_))
        );
        assert!(!fx.fallback_path().exists());
    }

    #[tokio::test]
    async fn unwritable_fallback_is_client_error() {
        let fx = Fixture::new().await;
        let blocker = fx.dir.path().join("fallback");
        std::fs::write(&blocker, "not a directory").unwrap();
        let mut session = fx.session();
        assert_matches!(session.acquire_client().await, Err(SessionError::Client(_)));
        assert_eq!(session.state().name(), "authenticated");
    }

    // ── Sequencing ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn operations_before_client_are_invalid_state() {
        let fx = Fixture::new().await;
        let session = fx.session();

        assert_matches!(
            session.invoke("hello").await,
            Err(SessionError::InvalidState { operation: "invoke", state: "unauthenticated" })
        );
        assert_matches!(
            session.ensure_endpoint().await,
            Err(SessionError::InvalidState { operation: "ensure_endpoint", .. })
        );
        assert_matches!(
            session.ensure_deployment().await,
            Err(SessionError::InvalidState { operation: "ensure_deployment", .. })
        );
        assert!(fx.server.received_requests().await.unwrap().is_empty());
        assert!(!fx.request_dir().exists());
    }

    // ── Provisioning ────────────────────────────────────────────────────

    #[tokio::test]
    async fn ensure_deployment_sends_configured_shape() {
        let fx = Fixture::new().await;
        fx.mount_workspace().await;
        let url = format!("{WS}/onlineEndpoints/ep/deployments/blue");
        Mock::given(method("PUT"))
            .and(path(url.as_str()))
            .and(body_json(serde_json::json!({
                "location": "eastus",
                "kind": "Managed",
                "sku": {"name": "Default", "capacity": 2},
                "properties": {
                    "endpointComputeType": "Managed",
                    "model": "azureml://registries/HuggingFace/models/bert-base-uncased/labels/latest",
                    "instanceType": "Standard_DS3_v2",
                    "scaleSettings": {"scaleType": "Default"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&fx.server)
            .await;
        Mock::given(method("GET"))
            .and(path(url.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "blue"})))
            .mount(&fx.server)
            .await;

        let mut session = fx.session();
        session.acquire_client().await.unwrap();
        let (logs, _guard) = capture_logs();
        let resource = session.ensure_deployment().await.unwrap();
        assert_eq!(resource["name"], "blue");

        let start = logs.position("Start configuring the deployment").unwrap();
        let done = logs.position("Deployment is configured").unwrap();
        assert!(start < done);
    }

    #[tokio::test]
    async fn deploy_continues_after_endpoint_failure() {
        let fx = Fixture::new().await;
        fx.mount_workspace().await;
        fx.mount_resource("onlineEndpoints/ep", 500).await;
        fx.mount_resource("onlineEndpoints/ep/deployments/blue", 200).await;

        let mut session = fx.session();
        let (logs, _guard) = capture_logs();
        let report = session.deploy().await.unwrap();

        assert_matches!(report.endpoint, StepOutcome::Failed(ref msg) if msg.contains("boom"));
        assert_eq!(report.deployment, StepOutcome::Succeeded);
        assert!(!report.is_success());
        assert!(logs.has_event(Level::ERROR, "endpoint provisioning failed"));
        assert!(logs.has_message("Deployment is configured"));
        fx.server.verify().await;
    }

    #[tokio::test]
    async fn deploy_all_steps_succeed() {
        let fx = Fixture::new().await;
        fx.mount_workspace().await;
        fx.mount_resource("onlineEndpoints/ep", 201).await;
        fx.mount_resource("onlineEndpoints/ep/deployments/blue", 201).await;

        let mut session = fx.session();
        let report = session.deploy().await.unwrap();
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn deploy_aborts_without_credentials() {
        let fx = Fixture::new().await;
        let mut session = fx.session().with_credential_factory(denied);
        assert_matches!(session.deploy().await, Err(SessionError::Authentication(_)));
        assert!(fx.server.received_requests().await.unwrap().is_empty());
    }

    // ── Scoring ─────────────────────────────────────────────────────────

    async fn mount_scoring(fx: &Fixture, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(format!("{WS}/onlineEndpoints/ep").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "properties": {"scoringUri": format!("{}/score", fx.server.uri())}
            })))
            .mount(&fx.server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{WS}/onlineEndpoints/ep/listKeys").as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"primaryKey": "pk"})),
            )
            .mount(&fx.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/score"))
            .and(header("azureml-model-deployment", "blue"))
            .respond_with(response)
            .mount(&fx.server)
            .await;
    }

    #[tokio::test]
    async fn invoke_returns_pretty_response() {
        let fx = Fixture::new().await;
        mount_scoring(
            &fx,
            ResponseTemplate::new(200).set_body_string(r#"[{"label":"POSITIVE","score":0.98}]"#),
        )
        .await;

        let mut session = fx.session();
        session.acquire_client().await.unwrap();
        let out = session.invoke("hello").await.unwrap();
        assert_eq!(
            out,
            "[\n  {\n    \"label\": \"POSITIVE\",\n    \"score\": 0.98\n  }\n]"
        );

        let files: Vec<_> = std::fs::read_dir(fx.request_dir()).unwrap().collect();
        assert_eq!(files.len(), 1);
        let written = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(written, r#"{"inputs": "hello"}"#);
    }

    #[tokio::test]
    async fn invoke_non_json_response_is_invocation_error() {
        let fx = Fixture::new().await;
        mount_scoring(&fx, ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;

        let mut session = fx.session();
        session.acquire_client().await.unwrap();
        let (logs, _guard) = capture_logs();
        assert_matches!(session.invoke("hello").await, Err(SessionError::Invocation(_)));
        assert!(logs.has_event(Level::ERROR, "invocation failed"));
    }

    #[tokio::test]
    async fn invoke_scoring_error_is_invocation_error() {
        let fx = Fixture::new().await;
        mount_scoring(&fx, ResponseTemplate::new(424).set_body_string("model not ready")).await;

        let mut session = fx.session();
        session.acquire_client().await.unwrap();
        let err = session.invoke("hello").await.unwrap_err();
        assert_matches!(
            err,
            SessionError::Invocation(ClientError::Api { status: 424, .. })
        );
    }
}
