//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or parsing the session configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The YAML was malformed or a required key was missing.
    #[error("failed to parse config: {0}")]
    Parse(Box<figment::Error>),
    /// A value parsed but is out of range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

impl From<figment::Error> for SettingsError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(Box::new(err))
    }
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
