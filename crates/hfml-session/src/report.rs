//! Outcome of the provisioning pipeline.

use serde::Serialize;

/// Result of one provisioning step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Resource created or updated.
    Succeeded,
    /// Step failed; the error was logged and the pipeline moved on.
    Failed(String),
}

impl StepOutcome {
    /// Whether the step succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Per-step outcomes of [`crate::Session::deploy`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// Endpoint step.
    pub endpoint: StepOutcome,
    /// Deployment step. Attempted even when the endpoint step failed.
    pub deployment: StepOutcome,
}

impl DeployReport {
    /// Both steps succeeded.
    pub fn is_success(&self) -> bool {
        self.endpoint.is_success() && self.deployment.is_success()
    }
}
