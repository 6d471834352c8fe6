//! Settings type definitions.
//!
//! Section names follow the YAML file (`Azure`, `Model`, `API`, `Runtime`);
//! field names are `snake_case`. The first three sections are required and
//! have no defaults. `Runtime` is optional and fully defaulted.

mod azure;
mod runtime;

pub use azure::*;
pub use runtime::*;

use serde::{Deserialize, Serialize};

/// Root of the parsed configuration file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HfmlSettings {
    /// Cloud account scoping, identity and compute shape.
    #[serde(rename = "Azure")]
    pub azure: AzureSettings,
    /// Pretrained model artifact in a model registry.
    #[serde(rename = "Model")]
    pub model: ModelSettings,
    /// Names of the serving resources.
    #[serde(rename = "API")]
    pub api: ApiSettings,
    /// Local behavior of the orchestrator.
    #[serde(rename = "Runtime", default)]
    pub runtime: RuntimeSettings,
}

impl HfmlSettings {
    /// Flatten into the session's immutable view.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            subscription_id: self.azure.subscription_id.clone(),
            resource_group: self.azure.resource_group.clone(),
            client_id: self.azure.identity.client_id.clone(),
            workspace_name: self.azure.ml.workspace_name.clone(),
            instance_type: self.azure.ml.compute.instance_type.clone(),
            instance_count: self.azure.ml.compute.instance_count,
            registry_name: self.model.registry_name.clone(),
            model_name: self.model.model_name.clone(),
            endpoint_name: self.api.endpoint_name.clone(),
            deployment_name: self.api.deployment_name.clone(),
        }
    }
}

/// Pretrained model location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Registry that hosts the model (e.g. `HuggingFace`).
    pub registry_name: String,
    /// Model name inside the registry.
    pub model_name: String,
}

impl ModelSettings {
    /// Registry URI of the latest model version.
    pub fn model_id(&self) -> String {
        model_uri(&self.registry_name, &self.model_name)
    }
}

/// Serving resource names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Online endpoint name.
    pub endpoint_name: String,
    /// Deployment name behind the endpoint.
    pub deployment_name: String,
}

/// Flat view of every configured attribute used by the session.
///
/// `model_id` is not stored: it is derived from `registry_name` and
/// `model_name` on every call so it can never go stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    /// Azure subscription.
    pub subscription_id: String,
    /// Resource group holding the workspace.
    pub resource_group: String,
    /// Managed identity client id.
    pub client_id: String,
    /// Machine learning workspace.
    pub workspace_name: String,
    /// VM SKU for the deployment.
    pub instance_type: String,
    /// Number of instances for the deployment.
    pub instance_count: u32,
    /// Model registry.
    pub registry_name: String,
    /// Model name.
    pub model_name: String,
    /// Online endpoint name.
    pub endpoint_name: String,
    /// Deployment name.
    pub deployment_name: String,
}

impl SessionConfig {
    /// Registry URI of the latest model version.
    pub fn model_id(&self) -> String {
        model_uri(&self.registry_name, &self.model_name)
    }
}

fn model_uri(registry_name: &str, model_name: &str) -> String {
    format!("azureml://registries/{registry_name}/models/{model_name}/labels/latest")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
