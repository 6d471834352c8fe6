//! Client error types.

use std::path::PathBuf;

use hfml_auth::AuthError;

/// Errors from the management client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Token acquisition failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource Manager or scoring endpoint returned an error status.
    #[error("API error ({status}){}: {message}", .code.as_deref().map(|c| format!(" {c}")).unwrap_or_default())]
    Api {
        /// HTTP status code.
        status: u16,
        /// Service error code, when the body carried one.
        code: Option<String>,
        /// Error description.
        message: String,
    },

    /// A long-running operation ended in `Failed` or `Canceled`.
    #[error("operation {status}: {message}")]
    OperationFailed {
        /// Terminal status reported by the service.
        status: String,
        /// Error description.
        message: String,
    },

    /// No workspace config was found searching upward from a directory.
    #[error("no workspace config found from {}", .0.display())]
    WorkspaceConfigNotFound(PathBuf),

    /// A workspace config file exists but is unusable.
    #[error("invalid workspace config {}: {message}", .path.display())]
    InvalidWorkspaceConfig {
        /// File that failed to load.
        path: PathBuf,
        /// Reason.
        message: String,
    },

    /// A response lacked a property the client depends on.
    #[error("response missing property: {0}")]
    MissingProperty(&'static str),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
