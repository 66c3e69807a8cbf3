//! Service lifecycle: install, uninstall and the single-step systemctl actions.
//!
//! Every step reports a normal event describing what is about to run, then a
//! success event with the captured output or an error/warning event with the
//! diagnostic. Install stops at the first failing step; uninstall runs every
//! step regardless.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::application::ports::{FileChannel, ProgressReporter, RemoteSession};
use crate::application::services::mirror;
use crate::domain::commands::{self, Systemctl};
use crate::domain::{ProgressEvent, RemoteError, ResolvedConfig, unit};

/// What to do with a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Install { create_working_dir: bool },
    Uninstall { remove_working_dir: bool },
    Start,
    Stop,
    Restart,
    Status,
    ShowService,
}

impl Action {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Install { .. } => "install",
            Self::Uninstall { .. } => "uninstall",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
            Self::ShowService => "show-service",
        }
    }

    /// Run the action against `service`. Install and uninstall finish with a
    /// summary event.
    ///
    /// # Errors
    ///
    /// Returns an error if the action (or any uninstall step) failed. The
    /// failure has already been reported.
    pub fn perform<S: RemoteSession>(
        self,
        service: &mut Service<S>,
        reporter: &dyn ProgressReporter,
    ) -> Result<()> {
        let name = service.name.clone();
        match self {
            Self::Install { create_working_dir } => {
                let result = service.install(reporter, create_working_dir);
                reporter.report(match &result {
                    Ok(()) => ProgressEvent::success(&name, "installed"),
                    Err(_) => ProgressEvent::error(&name, "install aborted"),
                });
                result
            }
            Self::Uninstall { remove_working_dir } => {
                let result = service.uninstall(reporter, remove_working_dir);
                reporter.report(match &result {
                    Ok(()) => ProgressEvent::success(&name, "uninstalled"),
                    Err(e) => ProgressEvent::error(&name, format!("uninstalled with {e}")),
                });
                result
            }
            Self::Start => service.start(reporter),
            Self::Stop => service.stop(reporter),
            Self::Restart => service.restart(reporter),
            Self::Status => service.status(reporter),
            Self::ShowService => {
                service.show_unit(reporter);
                Ok(())
            }
        }
    }
}

/// A materialized service: resolved configuration plus its own session.
pub struct Service<S> {
    name: String,
    config: Arc<ResolvedConfig>,
    remote_home: String,
    config_file: String,
    session: S,
}

impl<S: RemoteSession> Service<S> {
    #[must_use]
    pub fn new(
        name: &str,
        config: Arc<ResolvedConfig>,
        remote_home: &str,
        config_file: &str,
        session: S,
    ) -> Self {
        Self {
            name: name.to_string(),
            config,
            remote_home: remote_home.to_string(),
            config_file: config_file.to_string(),
            session,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The unit file text for this service.
    #[must_use]
    pub fn unit_file(&self) -> String {
        unit::render(&self.name, &self.config)
    }

    // ── Pipelines ────────────────────────────────────────────────────────────

    /// Install and enable the service, stopping at the first failing step.
    ///
    /// # Errors
    ///
    /// Returns the first step failure.
    pub fn install(&mut self, reporter: &dyn ProgressReporter, create_working_dir: bool) -> Result<()> {
        self.check_go(reporter)?;
        self.check_systemd(reporter)?;
        self.check_lingering(reporter)?;
        self.check_working_directory(reporter, create_working_dir)?;
        self.authorize_private_modules(reporter)?;
        self.install_package(reporter)?;
        self.verify_binary(reporter)?;
        self.copy_files(reporter)?;
        self.upload_unit(reporter)?;
        self.systemctl(reporter, Systemctl::DaemonReload, Some("couldn't reload systemd daemon"))?;
        self.systemctl(reporter, Systemctl::Enable, Some("couldn't enable systemd service"))?;
        Ok(())
    }

    /// Stop, disable and remove the service. Every step runs even when an
    /// earlier one failed.
    ///
    /// # Errors
    ///
    /// Returns an error naming the failed steps, if any.
    pub fn uninstall(&mut self, reporter: &dyn ProgressReporter, remove_working_dir: bool) -> Result<()> {
        let mut outcomes = vec![
            ("stop", self.systemctl(reporter, Systemctl::Stop, Some("couldn't stop systemd service"))),
            ("disable", self.systemctl(reporter, Systemctl::Disable, Some("couldn't disable systemd service"))),
            ("delete unit file", self.delete_unit_file(reporter)),
            ("reload", self.systemctl(reporter, Systemctl::DaemonReload, Some("couldn't reload systemd daemon"))),
            ("reset failed", self.systemctl(reporter, Systemctl::ResetFailed, Some("couldn't reset failed systemd services"))),
            ("delete executable", self.delete_binary(reporter)),
            ("delete files", self.delete_files(reporter)),
        ];
        if remove_working_dir {
            outcomes.push(("delete log file", self.delete_log_file(reporter)));
            outcomes.push(("delete working directory", self.delete_working_directory(reporter)));
        }

        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(step, _)| *step)
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{} failed step(s): {}", failed.len(), failed.join(", ")))
        }
    }

    /// # Errors
    ///
    /// Returns an error if systemctl fails.
    pub fn start(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        self.systemctl(reporter, Systemctl::Start, Some("couldn't start systemd service"))
    }

    /// # Errors
    ///
    /// Returns an error if systemctl fails.
    pub fn stop(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        self.systemctl(reporter, Systemctl::Stop, Some("couldn't stop systemd service"))
    }

    /// # Errors
    ///
    /// Returns an error if systemctl fails.
    pub fn restart(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        self.systemctl(reporter, Systemctl::Restart, Some("couldn't restart systemd service"))
    }

    /// # Errors
    ///
    /// Returns an error if the unit is not active or systemctl fails.
    pub fn status(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        self.systemctl(reporter, Systemctl::Status, None)
    }

    /// Report the rendered unit file as a single event.
    pub fn show_unit(&self, reporter: &dyn ProgressReporter) {
        reporter.report(ProgressEvent::normal(&self.name, self.unit_file()));
    }

    // ── Install steps ────────────────────────────────────────────────────────

    fn check_go(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let failure = format!(
            "couldn't find the `go` executable. Please install `go` or set the executable path in `{}` file using the `go_exec_path` variable",
            self.config_file
        );
        let command = commands::go_version(&self.config);
        self.exec_step(reporter, &command, Some(&failure)).map(drop)
    }

    fn check_systemd(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let failure = format!(
            "couldn't find the `systemd` executable. Please install `systemd` or set the executable path in `{}` file using the `systemd_path` variable",
            self.config_file
        );
        let command = commands::systemd_version(&self.config);
        self.exec_step(reporter, &command, Some(&failure)).map(drop)
    }

    fn check_lingering(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let command = commands::list_lingering_users(&self.config);
        self.note(reporter, &command);
        let output = match self.session.run(&command) {
            Ok(output) => output,
            Err(e) => return Err(self.fail(reporter, e.diagnostic())),
        };
        let user = self.config.connection.user.as_str();
        if !output.lines().any(|line| line.trim() == user) {
            let message = format!(
                "user `{user}` is not in the linger list. You can add it with the command `sudo loginctl enable-linger {user}`"
            );
            return Err(self.fail(reporter, message));
        }
        reporter.report(ProgressEvent::success(&self.name, output));
        Ok(())
    }

    fn check_working_directory(&mut self, reporter: &dyn ProgressReporter, create: bool) -> Result<()> {
        let config = Arc::clone(&self.config);
        let dir = &config.working_directory;
        let command = commands::path_exists(dir);
        self.note(reporter, &command);
        if self.session.run(&command).is_ok() {
            reporter.report(ProgressEvent::success(&self.name, ""));
            return Ok(());
        }
        if !create {
            return Err(self.fail(
                reporter,
                format!("Service working directory '{dir}' does not exist on the remote host"),
            ));
        }
        let failure = format!("cannot create working directory '{dir}'");
        self.exec_step(reporter, &commands::make_dir(dir), Some(&failure))
            .map(drop)
    }

    fn authorize_private_modules(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        let Some(netrc) = &config.netrc else {
            return Ok(());
        };
        self.note(
            reporter,
            &format!("GOPRIVATE set: adding `{}` credentials to ~/.netrc", netrc.machine),
        );
        let entry = netrc.line();
        // A missing ~/.netrc reads as empty.
        let existing = match self.session.run(commands::READ_NETRC) {
            Ok(content) => content,
            Err(RemoteError::Command { .. }) => String::new(),
            Err(e) => return Err(self.fail(reporter, format!("cannot read ~/.netrc: {e}"))),
        };
        if existing.lines().any(|line| line.trim() == entry) {
            reporter.report(ProgressEvent::success(&self.name, "credentials already present"));
            return Ok(());
        }
        if let Err(e) = self.session.run(&commands::append_netrc(&entry)) {
            // The command line carries the password; report only what the
            // remote side said.
            let reason = match e {
                RemoteError::Command { output, .. } if !output.is_empty() => output,
                RemoteError::Command { status, .. } => match status {
                    Some(code) => format!("exited with status {code}"),
                    None => "terminated without an exit status".to_string(),
                },
                other => other.to_string(),
            };
            return Err(self.fail(reporter, format!("cannot update ~/.netrc: {reason}")));
        }
        reporter.report(ProgressEvent::success(&self.name, ""));
        Ok(())
    }

    fn install_package(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let failure = format!("cannot install the package `{}`", self.config.go_install);
        let command = commands::go_install(&self.config);
        self.exec_step(reporter, &command, Some(&failure)).map(drop)
    }

    fn verify_binary(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let failure = format!("couldn't find the `{}` executable", self.config.installed_binary);
        let command = commands::file_exists(&self.config.installed_binary);
        self.exec_step(reporter, &command, Some(&failure)).map(drop)
    }

    fn copy_files(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        if config.copy_files.is_empty() {
            return Ok(());
        }
        let root = Path::new(&config.working_directory);
        self.note(reporter, &format!("Copying files to '{}'", root.display()));
        let files = match self.session.file_channel() {
            Ok(files) => files,
            Err(e) => return Err(self.fail(reporter, format!("cannot open file transfer channel: {e}"))),
        };
        let mut failure = None;
        for path in &config.copy_files {
            if let Err(e) = mirror::copy(files, path, root) {
                failure = Some(format!("cannot copy file '{}': {e}", path.display()));
                break;
            }
        }
        if let Some(message) = failure {
            return Err(self.fail(reporter, message));
        }
        reporter.report(ProgressEvent::success(&self.name, "All files copied"));
        Ok(())
    }

    fn upload_unit(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        let target = config.unit_file_path(&self.name);
        self.note(reporter, &format!("Copy service file to `{target}`"));
        let unit = self.unit_file();
        let outcome = self.session.file_channel().and_then(|files| {
            files.create_dir_all(Path::new(&config.systemd_services_directory))?;
            let mut bytes = unit.as_bytes();
            files.write_file(Path::new(&target), &mut bytes)
        });
        if let Err(e) = outcome {
            return Err(self.fail(reporter, format!("cannot write service file `{target}`: {e}")));
        }
        reporter.report(ProgressEvent::success(&self.name, "Copied"));
        Ok(())
    }

    // ── Uninstall steps ──────────────────────────────────────────────────────

    fn delete_unit_file(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let target = self.config.unit_file_path(&self.name);
        let failure = format!("cannot delete service file `{target}`");
        self.exec_step(reporter, &commands::remove(&target), Some(&failure))
            .map(drop)
    }

    fn delete_binary(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let binary = self.config.installed_binary.clone();
        let failure = format!("cannot delete service binary file `{binary}`");
        self.exec_step(reporter, &commands::remove(&binary), Some(&failure))
            .map(drop)
    }

    fn delete_files(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        if config.copy_files.is_empty() {
            return Ok(());
        }
        let root = Path::new(&config.working_directory);
        self.note(reporter, "Deleting files");
        let files = match self.session.file_channel() {
            Ok(files) => files,
            Err(e) => return Err(self.fail(reporter, format!("cannot open file transfer channel: {e}"))),
        };
        let mut warnings = Vec::new();
        for path in &config.copy_files {
            match mirror::delete(files, path, root) {
                Ok(found) => warnings.extend(found.iter().map(ToString::to_string)),
                Err(e) => warnings.push(format!("cannot delete file '{}': {e}", path.display())),
            }
        }
        for warning in warnings {
            reporter.report(ProgressEvent::warning(&self.name, warning));
        }
        reporter.report(ProgressEvent::success(&self.name, "All files deleted"));
        Ok(())
    }

    fn delete_log_file(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        let Some(log_path) = &config.log_path else {
            return Ok(());
        };
        self.note(reporter, &format!("Deleting log file '{log_path}'"));
        let outcome = self
            .session
            .file_channel()
            .and_then(|files| files.remove_file(Path::new(log_path)));
        if let Err(e) = outcome {
            return Err(self.fail(reporter, format!("Cannot delete log file '{log_path}': {e}")));
        }
        reporter.report(ProgressEvent::success(&self.name, "Deleted"));
        Ok(())
    }

    fn delete_working_directory(&mut self, reporter: &dyn ProgressReporter) -> Result<()> {
        let config = Arc::clone(&self.config);
        let dir = &config.working_directory;
        if dir.trim_end_matches('/') == self.remote_home.trim_end_matches('/') {
            tracing::debug!(service = %self.name, dir = %dir, "working directory is the home directory, keeping it");
            return Ok(());
        }
        self.note(reporter, &format!("Deleting service working directory '{dir}'"));
        let outcome = self
            .session
            .file_channel()
            .and_then(|files| mirror::remove_if_empty(files, Path::new(dir)));
        match outcome {
            Ok(()) => {
                reporter.report(ProgressEvent::success(&self.name, "Deleted"));
                Ok(())
            }
            Err(RemoteError::NotEmpty(_)) => Err(self.fail(
                reporter,
                format!("Cannot delete service working directory '{dir}': directory is not empty"),
            )),
            Err(e) => Err(self.fail(
                reporter,
                format!("Cannot delete service working directory '{dir}': {e}"),
            )),
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn systemctl(
        &mut self,
        reporter: &dyn ProgressReporter,
        verb: Systemctl,
        failure: Option<&str>,
    ) -> Result<()> {
        let command = verb.command(&self.name);
        self.exec_step(reporter, &command, failure).map(drop)
    }

    /// Run `command` and report it. On failure the error event reads
    /// `{failure}: {remote stderr}`, or just the stderr without `failure`.
    fn exec_step(
        &mut self,
        reporter: &dyn ProgressReporter,
        command: &str,
        failure: Option<&str>,
    ) -> Result<String> {
        self.note(reporter, command);
        match self.session.run(command) {
            Ok(output) => {
                reporter.report(ProgressEvent::success(&self.name, output.clone()));
                Ok(output)
            }
            Err(e) => {
                let diagnostic = e.diagnostic();
                let message = match failure {
                    Some(failure) => format!("{failure}: {diagnostic}"),
                    None => diagnostic,
                };
                Err(self.fail(reporter, message))
            }
        }
    }

    fn note(&self, reporter: &dyn ProgressReporter, text: &str) {
        tracing::debug!(service = %self.name, "{text}");
        reporter.report(ProgressEvent::normal(&self.name, text));
    }

    /// Report `message` as an error event and return it as an error.
    fn fail(&self, reporter: &dyn ProgressReporter, message: String) -> anyhow::Error {
        reporter.report(ProgressEvent::error(&self.name, message.clone()));
        anyhow!(message)
    }
}
