//! `Runtime` section: local orchestrator behavior.
//!
//! Every field has a compiled default, so the whole section may be omitted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use hfml_core::constants::{
    DEFAULT_FALLBACK_CONFIG_PATH, DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_DIR, MANAGEMENT_URL,
};

/// How the scoring request payload is built from the message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Serialize `{"inputs": message}` with `serde_json`.
    #[default]
    Structured,
    /// Splice the raw message between `{"inputs": "` and `"}`.
    ///
    /// A message containing `"` or `\` produces invalid JSON.
    Legacy,
}

/// Local behavior settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Where the workspace config is written when discovery fails.
    pub fallback_config_path: PathBuf,
    /// Directory where discovery of an existing workspace config starts.
    pub discovery_dir: PathBuf,
    /// Directory receiving scoring request files.
    pub request_dir: PathBuf,
    /// Payload construction mode.
    pub payload_encoding: PayloadEncoding,
    /// Long-running-operation poll interval without `Retry-After`.
    pub poll_interval_ms: u64,
    /// Resource Manager base URL.
    pub management_url: String,
    /// Log filter used by the CLI.
    pub log_level: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            fallback_config_path: PathBuf::from(DEFAULT_FALLBACK_CONFIG_PATH),
            discovery_dir: PathBuf::from("."),
            request_dir: PathBuf::from(DEFAULT_REQUEST_DIR),
            payload_encoding: PayloadEncoding::Structured,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            management_url: MANAGEMENT_URL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
