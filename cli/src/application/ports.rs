//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`, never from `crate::infra`,
//! `crate::commands`, or `crate::output`.
//!
//! Remote ports are blocking: a worker suspends until the remote call returns.
//! Callers run them on blocking threads (`tokio::task::spawn_blocking`).

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::domain::{ConnectError, ConnectionParams, ProgressEvent, RemoteError, ServiceConfigs};

// ── Remote execution ports ────────────────────────────────────────────────────

/// Runs shell commands on the remote host.
pub trait RemoteShell {
    /// Run `command` in its own channel.
    ///
    /// Returns stdout without its trailing newline. A non-zero exit returns
    /// `RemoteError::Command` carrying the remote stderr.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails or the channel cannot be opened.
    fn run(&mut self, command: &str) -> Result<String, RemoteError>;
}

/// File operations on the remote host.
pub trait FileChannel {
    /// Create `path` and every missing parent.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    fn create_dir_all(&mut self, path: &Path) -> Result<(), RemoteError>;

    /// Create or truncate `path` and stream `contents` into it. Returns the
    /// number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    fn write_file(&mut self, path: &Path, contents: &mut dyn Read) -> Result<u64, RemoteError>;

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotFound` if it does not exist.
    fn remove_file(&mut self, path: &Path) -> Result<(), RemoteError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::NotEmpty` if the directory still has entries and
    /// `RemoteError::NotFound` if it does not exist.
    fn remove_dir(&mut self, path: &Path) -> Result<(), RemoteError>;
}

/// An authenticated session: shell commands plus a lazily opened file channel.
pub trait RemoteSession: RemoteShell {
    type Files: FileChannel;

    /// The session's file channel, opened on first use and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be opened.
    fn file_channel(&mut self) -> Result<&mut Self::Files, RemoteError>;
}

/// Opens sessions to hosts.
pub trait Connector {
    type Session: RemoteSession + Send;

    /// Read the private key and open an authenticated session.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unreadable, the host is unreachable,
    /// or authentication fails.
    fn connect(&self, params: &ConnectionParams) -> Result<Self::Session, ConnectError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Deliver one event.
    fn report(&self, event: ProgressEvent);
}

/// Renders delivered events, one at a time.
pub trait EventRenderer {
    fn render(&mut self, event: &ProgressEvent);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Abstracts loading the services configuration.
pub trait ConfigStore {
    /// Load every service, with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an override
    /// is invalid.
    fn load(&self) -> Result<ServiceConfigs>;

    /// Location of the configuration, used in diagnostics.
    fn path(&self) -> PathBuf;
}
