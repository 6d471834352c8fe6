//! Configuration loading with environment variable overrides.
//!
//! Loading flow:
//! 1. Read the YAML file at the given path
//! 2. Parse it through `figment` into [`HfmlSettings`]
//! 3. Validate numeric ranges
//! 4. Apply `HFML_*` overrides to the `Runtime` section
//!
//! Only the `Runtime` section can be overridden from the environment.
//! Identity and resource names always come from the file.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Yaml};
use tracing::{debug, error};

use hfml_core::constants::DEFAULT_CONFIG_FILE;

use crate::errors::{Result, SettingsError};
use crate::types::{HfmlSettings, PayloadEncoding};

/// Path of the configuration file used when none is given (`config.yml`).
pub fn settings_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_FILE)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<HfmlSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// Unlike a layered defaults file, a missing file is an error: the three
/// required sections have no defaults.
pub fn load_settings_from_path(path: &Path) -> Result<HfmlSettings> {
    debug!(path = %path.display(), "loading config");
    let content = std::fs::read_to_string(path).inspect_err(|e| {
        error!(path = %path.display(), error = %e, "failed to read config file");
    })?;

    let mut settings = parse_settings(&content).inspect_err(|e| {
        error!(path = %path.display(), error = %e, "failed to load config");
    })?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Parse and validate YAML content without touching the environment.
pub fn parse_settings(content: &str) -> Result<HfmlSettings> {
    let settings: HfmlSettings = Figment::from(Yaml::string(content)).extract()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &HfmlSettings) -> Result<()> {
    if settings.azure.ml.compute.instance_count == 0 {
        return Err(SettingsError::InvalidValue(
            "Azure.ml.compute.instance_count must be at least 1".to_string(),
        ));
    }
    if settings.runtime.poll_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "Runtime.poll_interval_ms must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut HfmlSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Recognized keys:
/// - `HFML_LOG_LEVEL`
/// - `HFML_REQUEST_DIR`
/// - `HFML_FALLBACK_CONFIG`
/// - `HFML_DISCOVERY_DIR`
/// - `HFML_MANAGEMENT_URL`
/// - `HFML_POLL_INTERVAL_MS` (100..=600000)
/// - `HFML_PAYLOAD_ENCODING` (`structured` | `legacy`)
///
/// Empty and invalid values are ignored (the file/default value is kept).
pub fn apply_overrides_from<F>(settings: &mut HfmlSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());
    let rt = &mut settings.runtime;

    if let Some(v) = read("HFML_LOG_LEVEL") {
        rt.log_level = v;
    }
    if let Some(v) = read("HFML_REQUEST_DIR") {
        rt.request_dir = PathBuf::from(v);
    }
    if let Some(v) = read("HFML_FALLBACK_CONFIG") {
        rt.fallback_config_path = PathBuf::from(v);
    }
    if let Some(v) = read("HFML_DISCOVERY_DIR") {
        rt.discovery_dir = PathBuf::from(v);
    }
    if let Some(v) = read("HFML_MANAGEMENT_URL") {
        rt.management_url = v;
    }
    if let Some(v) = read("HFML_POLL_INTERVAL_MS") {
        match parse_u64_range(&v, 100, 600_000) {
            Some(ms) => rt.poll_interval_ms = ms,
            None => {
                tracing::warn!(key = "HFML_POLL_INTERVAL_MS", value = %v, "invalid u64 env var, ignoring");
            }
        }
    }
    if let Some(v) = read("HFML_PAYLOAD_ENCODING") {
        match parse_payload_encoding(&v) {
            Some(enc) => rt.payload_encoding = enc,
            None => {
                tracing::warn!(key = "HFML_PAYLOAD_ENCODING", value = %v, "unknown payload encoding, ignoring");
            }
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a payload encoding name (case-insensitive).
pub fn parse_payload_encoding(val: &str) -> Option<PayloadEncoding> {
    match val.to_lowercase().as_str() {
        "structured" => Some(PayloadEncoding::Structured),
        "legacy" => Some(PayloadEncoding::Legacy),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
