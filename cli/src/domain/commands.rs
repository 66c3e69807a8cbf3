//! Shell commands run on the remote host.
//!
//! Every command is an opaque string handed to the remote login shell.

use crate::domain::config::ResolvedConfig;

/// Prints the remote home directory of a fresh session.
pub const PRINT_HOME: &str = "pwd";

/// Reads the remote `~/.netrc`.
pub const READ_NETRC: &str = "cat ~/.netrc";

#[must_use]
pub fn go_version(config: &ResolvedConfig) -> String {
    format!("{} version", config.go_exec_path)
}

#[must_use]
pub fn systemd_version(config: &ResolvedConfig) -> String {
    format!("{} --version", config.systemd_path)
}

#[must_use]
pub fn list_lingering_users(config: &ResolvedConfig) -> String {
    format!("ls {}", config.systemd_linger_dir)
}

#[must_use]
pub fn path_exists(path: &str) -> String {
    format!("test -e {path}")
}

#[must_use]
pub fn file_exists(path: &str) -> String {
    format!("test -f {path}")
}

#[must_use]
pub fn make_dir(path: &str) -> String {
    format!("mkdir -p {path}")
}

/// Appends `line` to `~/.netrc`, creating it with owner-only permissions.
#[must_use]
pub fn append_netrc(line: &str) -> String {
    format!("echo {} >> ~/.netrc && chmod 600 ~/.netrc", single_quote(line))
}

/// Quote `value` as one literal shell word.
#[must_use]
pub fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `go install`, prefixed with `GOPRIVATE` when private modules are set.
#[must_use]
pub fn go_install(config: &ResolvedConfig) -> String {
    match &config.go_private {
        Some(private) => format!(
            "GOPRIVATE={private} {} install {}",
            config.go_exec_path, config.go_install
        ),
        None => format!("{} install {}", config.go_exec_path, config.go_install),
    }
}

#[must_use]
pub fn remove(path: &str) -> String {
    format!("rm {path}")
}

/// `systemctl --user` verbs used by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Systemctl {
    DaemonReload,
    ResetFailed,
    Enable,
    Disable,
    Start,
    Stop,
    Restart,
    Status,
}

impl Systemctl {
    fn verb(self) -> &'static str {
        match self {
            Self::DaemonReload => "daemon-reload",
            Self::ResetFailed => "reset-failed",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Status => "status",
        }
    }

    /// The command line; unit-less verbs ignore `unit`.
    #[must_use]
    pub fn command(self, unit: &str) -> String {
        match self {
            Self::DaemonReload | Self::ResetFailed => {
                format!("systemctl --user {}", self.verb())
            }
            _ => format!("systemctl --user {} {unit}", self.verb()),
        }
    }
}
