//! # hfml-session
//!
//! Orchestrates one managed online endpoint from a YAML session config.
//!
//! A [`Session`] moves through explicit [`SessionState`]s:
//!
//! ```text
//! Unauthenticated ──authenticate──▶ Authenticated ──acquire_client──▶ ClientReady
//! ```
//!
//! `ensure_endpoint`, `ensure_deployment` and `invoke` require `ClientReady`
//! and report illegal sequencing as [`SessionError::InvalidState`] without
//! touching the network. [`Session::deploy`] runs the provisioning pipeline
//! and records per-step outcomes in a [`DeployReport`].

#![deny(unsafe_code)]

pub mod errors;
pub mod report;
pub mod session;
pub mod state;

pub use errors::{Result, SessionError};
pub use report::{DeployReport, StepOutcome};
pub use session::{CredentialFactory, Session};
pub use state::SessionState;
