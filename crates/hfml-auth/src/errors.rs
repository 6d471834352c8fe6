//! Auth error types.

/// Errors that can occur while acquiring a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The token endpoint answered with a non-success status.
    #[error("token request failed ({status}): {message}")]
    TokenRequest {
        /// HTTP status code.
        status: u16,
        /// Response body or error description.
        message: String,
    },

    /// A scope could not be mapped to a resource.
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// No credential in the chain could produce a token.
    #[error("no credential available: {0}")]
    Unavailable(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
