//! # hfml-core
//!
//! Foundation pieces shared by every hfml crate:
//!
//! - [`constants`]: management audience, ARM API version, default file paths
//! - [`logging`]: `tracing` subscriber setup and in-memory log capture for tests

#![deny(unsafe_code)]

pub mod constants;
pub mod logging;
