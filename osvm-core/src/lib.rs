//! Foundation types for the osvm CLI.
//!
//! This crate holds the error taxonomy shared by every other crate in the
//! workspace, the client configuration file, and the timing knobs for the
//! provisioning orchestrator.

pub mod config;
pub mod error;

pub use config::{ClientConfig, Tuning};
pub use error::{Error, Result};
