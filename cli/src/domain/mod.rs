//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod commands;
pub mod config;
pub mod error;
pub mod progress;
pub mod unit;

pub use config::{ConnectionParams, LocalEnvironment, ResolvedConfig, ServiceConfig, ServiceConfigs};
pub use error::{ConfigError, ConnectError, MirrorError, RemoteError};
pub use progress::{ProgressEvent, Severity};
