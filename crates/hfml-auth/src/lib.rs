//! # hfml-auth
//!
//! Token credentials for the Azure Resource Manager audience.
//!
//! Every credential implements [`TokenCredential`]. The session builds a
//! [`DefaultCredential`] chain:
//! - [`ClientSecretCredential`]: service principal from `AZURE_TENANT_ID`,
//!   `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` (only when all are set)
//! - [`ManagedIdentityCredential`]: App Service identity endpoint when
//!   `IDENTITY_ENDPOINT`/`IDENTITY_HEADER` are set, otherwise the instance
//!   metadata service (IMDS), scoped to the configured client id
//!
//! Tokens are cached per scope set and reused until they come within
//! [`token::REFRESH_BUFFER_MS`] of expiry.

#![deny(unsafe_code)]

pub mod chain;
pub mod client_secret;
pub mod credential;
pub mod errors;
pub mod managed_identity;
pub mod token;

pub use chain::DefaultCredential;
pub use client_secret::ClientSecretCredential;
pub use credential::TokenCredential;
pub use errors::AuthError;
pub use managed_identity::{ManagedIdentityCredential, ManagedIdentitySource};
pub use token::{AccessToken, now_ms};
