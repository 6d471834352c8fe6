//! `Azure` section: account scoping, identity and compute shape.

use serde::{Deserialize, Serialize};

/// Cloud account settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureSettings {
    /// Subscription that owns the resource group.
    pub subscription_id: String,
    /// Resource group holding the workspace.
    pub resource_group: String,
    /// Identity used for authentication.
    pub identity: IdentitySettings,
    /// Machine learning workspace settings.
    pub ml: MlSettings,
}

/// Managed identity selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySettings {
    /// Client id of the user-assigned managed identity.
    pub client_id: String,
}

/// Workspace and deployment compute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlSettings {
    /// Target workspace.
    pub workspace_name: String,
    /// Compute shape for the deployment.
    pub compute: ComputeSettings,
}

/// Compute shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeSettings {
    /// VM SKU, e.g. `Standard_DS3_v2`.
    pub instance_type: String,
    /// Number of instances.
    pub instance_count: u32,
}
