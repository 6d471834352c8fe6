//! Session error types.

use hfml_auth::AuthError;
use hfml_client::ClientError;
use hfml_settings::SettingsError;

/// Errors from session operations, one variant per operation kind.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The config file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Configuration(#[from] SettingsError),

    /// No token could be obtained for the management audience.
    #[error("Authentication failed: {0}")]
    Authentication(#[source] AuthError),

    /// The management client could not be built, even from the fallback config.
    #[error("Client acquisition failed: {0}")]
    Client(#[source] ClientError),

    /// Endpoint create-or-update failed.
    #[error("Endpoint provisioning failed: {0}")]
    Endpoint(#[source] ClientError),

    /// Deployment create-or-update failed.
    #[error("Deployment provisioning failed: {0}")]
    Deployment(#[source] ClientError),

    /// Scoring request failed or returned a non-JSON body.
    #[error("Invocation failed: {0}")]
    Invocation(#[source] ClientError),

    /// Operation called in a state that does not allow it.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Operation attempted.
        operation: &'static str,
        /// Current state name.
        state: &'static str,
    },
}

impl SessionError {
    /// Error category string for logs and exit reporting.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Authentication(_) => "authentication",
            Self::Client(_) => "client",
            Self::Endpoint(_) => "endpoint",
            Self::Deployment(_) => "deployment",
            Self::Invocation(_) => "invocation",
            Self::InvalidState { .. } => "invalid_state",
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
