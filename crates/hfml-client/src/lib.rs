//! # hfml-client
//!
//! Management client for Azure Machine Learning managed online endpoints.
//!
//! - [`workspace`]: locating or synthesizing the workspace `config.json`
//! - [`client`]: [`MlClient`], authenticated Resource Manager calls
//! - [`resources`]: endpoint and deployment request bodies
//! - [`poller`]: waiting on long-running create-or-update operations
//! - [`scoring`]: scoring request files and response formatting
//!
//! All remote calls are awaited to completion. Nothing here retries.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod poller;
pub mod resources;
pub mod scoring;
pub mod workspace;

pub use client::{ClientOptions, EndpointKeys, MlClient};
pub use errors::{ClientError, Result};
pub use poller::{OperationStatus, Poller};
pub use resources::{OnlineDeployment, OnlineEndpoint};
pub use scoring::{encode_payload, pretty_json, write_request_file};
pub use workspace::WorkspaceConfig;
