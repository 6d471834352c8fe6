//! # hfml-settings
//!
//! Session configuration for the endpoint orchestrator.
//!
//! The configuration is a YAML file (default `config.yml`) with three required
//! sections and one optional section:
//!
//! ```yaml
//! Azure:
//!   subscription_id: 00000000-0000-0000-0000-000000000000
//!   resource_group: rg-inference
//!   identity:
//!     client_id: 11111111-1111-1111-1111-111111111111
//!   ml:
//!     workspace_name: ws-inference
//!     compute:
//!       instance_type: Standard_DS3_v2
//!       instance_count: 1
//! Model:
//!   registry_name: HuggingFace
//!   model_name: bert-base-uncased
//! API:
//!   endpoint_name: bert-endpoint
//!   deployment_name: bert-deployment
//! Runtime:            # optional, every key defaulted
//!   payload_encoding: structured
//! ```
//!
//! Loading flow:
//! 1. Read the file (I/O failure is fatal)
//! 2. Parse YAML into [`HfmlSettings`] through `figment` (syntax errors and
//!    missing required keys are fatal)
//! 3. Apply `HFML_*` environment overrides to the `Runtime` section
//!
//! Every fatal failure is logged at `error` before it is returned.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, load_settings, load_settings_from_path, parse_settings};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
