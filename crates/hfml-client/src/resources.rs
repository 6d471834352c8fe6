//! Online endpoint and deployment resources.
//!
//! Only the properties the orchestrator sets are modeled. Request bodies are
//! built against the `Microsoft.MachineLearningServices` 2023-10-01 schema.

use serde_json::{Value, json};

/// A managed online endpoint, scored with static keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnlineEndpoint {
    /// Endpoint name.
    pub name: String,
}

impl OnlineEndpoint {
    /// Endpoint named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `PUT` body for create-or-update.
    pub fn to_body(&self, location: &str) -> Value {
        json!({
            "location": location,
            "identity": { "type": "SystemAssigned" },
            "properties": { "authMode": "Key" },
        })
    }
}

/// A managed online deployment behind an endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnlineDeployment {
    /// Deployment name.
    pub name: String,
    /// Parent endpoint name.
    pub endpoint_name: String,
    /// Model asset id (registry URI).
    pub model: String,
    /// VM SKU.
    pub instance_type: String,
    /// Instance count.
    pub instance_count: u32,
}

impl OnlineDeployment {
    /// `PUT` body for create-or-update.
    pub fn to_body(&self, location: &str) -> Value {
        json!({
            "location": location,
            "kind": "Managed",
            "sku": { "name": "Default", "capacity": self.instance_count },
            "properties": {
                "endpointComputeType": "Managed",
                "model": self.model,
                "instanceType": self.instance_type,
                "scaleSettings": { "scaleType": "Default" },
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
