//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while reading or validating a service configuration.
///
/// All of these are detected before any connection to the remote host.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "configuration for service `{service}` was not found. Please add service configuration in `{file}` file"
    )]
    UnknownService { service: String, file: String },

    #[error(
        "required configuration `{field}` value is missing for service `{service}`: please add `{field}: <value>` in `{file}` file"
    )]
    MissingField {
        service: String,
        field: &'static str,
        file: String,
    },

    #[error(
        "cannot derive the executable name from `go_install: {package}` of service `{service}`: the package path must refer to a main package and end with a version suffix, ex: @latest"
    )]
    InvalidPackage { service: String, package: String },

    #[error("invalid value `{value}` in environment variable `{var}`: {reason}")]
    InvalidOverride {
        var: String,
        value: String,
        reason: String,
    },
}

// ── Connection errors ─────────────────────────────────────────────────────────

/// Errors raised while opening an authenticated session to a host.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot read private key `{}`: {reason}", .path.display())]
    KeyUnreadable { path: PathBuf, reason: String },

    #[error("cannot connect to {addr}: {reason}")]
    Network { addr: String, reason: String },

    #[error("ssh handshake with {addr} failed: {reason}")]
    Handshake { addr: String, reason: String },

    #[error("authentication as `{user}` on {addr} failed: {reason}")]
    Auth {
        user: String,
        addr: String,
        reason: String,
    },
}

// ── Remote errors ─────────────────────────────────────────────────────────────

/// Errors raised by commands and file operations on an open session.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The remote command exited non-zero. `output` holds its stderr.
    #[error("{}", command_diagnostic(.command, .status, .output))]
    Command {
        command: String,
        status: Option<i32>,
        output: String,
    },

    #[error("directory `{}` is not empty", .0.display())]
    NotEmpty(PathBuf),

    #[error("`{}` does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    /// Human-readable diagnostic text: the remote stderr for command
    /// failures, the display text otherwise.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Command { output, .. } if !output.is_empty() => output.clone(),
            other => other.to_string(),
        }
    }
}

#[allow(clippy::ref_option)] // called from the derived Display with field references
fn command_diagnostic(command: &str, status: &Option<i32>, output: &str) -> String {
    if !output.is_empty() {
        return output.to_string();
    }
    match status {
        Some(code) => format!("`{command}` exited with status {code}"),
        None => format!("`{command}` terminated without an exit status"),
    }
}

// ── Mirror errors ─────────────────────────────────────────────────────────────

/// Errors raised while copying a local tree to the remote host.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("cannot read local path `{}`: {reason}", .path.display())]
    Local { path: PathBuf, reason: String },

    #[error("cannot write remote path `{}`: {source}", .path.display())]
    Remote {
        path: PathBuf,
        #[source]
        source: RemoteError,
    },
}
