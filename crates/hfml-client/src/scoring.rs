//! Scoring request files and response formatting.

use std::path::{Path, PathBuf};

use hfml_settings::PayloadEncoding;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::Result;

/// Encode `message` as a `{"inputs": ...}` request body.
///
/// [`PayloadEncoding::Legacy`] splices the message between literal quotes
/// without escaping, so `"` or `\` in the message produce invalid JSON.
pub fn encode_payload(message: &str, encoding: PayloadEncoding) -> Result<String> {
    match encoding {
        PayloadEncoding::Structured => Ok(format!("{{\"inputs\": {}}}", serde_json::to_string(message)?)),
        PayloadEncoding::Legacy => Ok(format!("{{\"inputs\": \"{message}\"}}")),
    }
}

/// Write a request file for `message` into `dir` and return its path.
///
/// Each call gets its own `score-<uuid>.json`; files are left in place.
pub fn write_request_file(dir: &Path, message: &str, encoding: PayloadEncoding) -> Result<PathBuf> {
    let payload = encode_payload(message, encoding)?;
    if serde_json::from_str::<serde_json::Value>(&payload).is_err() {
        warn!(encoding = ?encoding, "scoring payload is not valid JSON");
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("score-{}.json", Uuid::now_v7()));
    std::fs::write(&path, payload)?;
    debug!(path = %path.display(), "wrote scoring request");
    Ok(path)
}

/// Re-encode a JSON response body with two-space indentation.
pub fn pretty_json(body: &str) -> std::result::Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    serde_json::to_string_pretty(&value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
