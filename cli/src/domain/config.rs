//! Domain types and validators for service configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access. Reading the
//! YAML file and the process environment lives in `crate::infra::config`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_GO_EXEC_PATH: &str = "/usr/local/go/bin/go";
pub const DEFAULT_SYSTEMD_PATH: &str = "systemd";
pub const DEFAULT_SYSTEMD_LINGER_DIR: &str = "/var/lib/systemd/linger";

// ── Config schema ────────────────────────────────────────────────────────────

/// All services of a configuration file, keyed by service name.
pub type ServiceConfigs = BTreeMap<String, ServiceConfig>;

/// One service entry of the configuration file, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub private_key_path: Option<PathBuf>,

    pub go_exec_path: Option<String>,
    pub go_bin_directory: Option<String>,
    pub go_install: Option<String>,

    pub go_private: Option<String>,
    pub netrc_machine: Option<String>,
    pub netrc_login: Option<String>,
    pub netrc_password: Option<String>,

    pub systemd_path: Option<String>,
    pub systemd_services_directory: Option<String>,
    pub systemd_linger_dir: Option<String>,

    pub exec_start: Option<String>,
    #[serde(alias = "working_dir")]
    pub working_directory: Option<String>,
    pub environment: Option<String>,
    pub log_path: Option<String>,
    pub run_after_service: Option<String>,
    pub start_limit_burst: Option<u32>,
    pub start_limit_interval_sec: Option<u32>,
    pub restart_sec: Option<u32>,
    pub copy_files: Vec<PathBuf>,

    pub ignore: bool,
}

/// Facts about the local machine used as connection fallbacks.
#[derive(Debug, Clone, Default)]
pub struct LocalEnvironment {
    /// Local login name.
    pub user: Option<String>,
    /// Local home directory.
    pub home: Option<PathBuf>,
}

/// Parameters needed to open a session to a service's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub private_key_path: PathBuf,
}

/// A `~/.netrc` credential entry for private module downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetrcEntry {
    pub machine: String,
    pub login: String,
    pub password: String,
}

impl NetrcEntry {
    /// The entry as a single `.netrc` line.
    #[must_use]
    pub fn line(&self) -> String {
        format!(
            "machine {} login {} password {}",
            self.machine, self.login, self.password
        )
    }
}

/// A service configuration with every default applied.
///
/// Built once per service by the registry and shared read-only afterwards.
/// Zero numbers and `None` mean the setting is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub connection: ConnectionParams,

    pub go_exec_path: String,
    pub go_bin_directory: String,
    pub go_install: String,
    pub go_private: Option<String>,
    pub netrc: Option<NetrcEntry>,

    pub systemd_path: String,
    pub systemd_services_directory: String,
    pub systemd_linger_dir: String,

    /// Path of the executable produced by `go install`.
    pub installed_binary: String,
    pub exec_start: String,
    pub working_directory: String,
    pub environment: Option<String>,
    pub log_path: Option<String>,
    pub run_after_service: Option<String>,
    pub start_limit_burst: u32,
    pub start_limit_interval_sec: u32,
    pub restart_sec: u32,
    pub copy_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// Remote path of the unit file for `service`.
    #[must_use]
    pub fn unit_file_path(&self, service: &str) -> String {
        join_remote(
            &self.systemd_services_directory,
            &format!("{service}.service"),
        )
    }
}

// ── Validation and resolution ────────────────────────────────────────────────

/// Check the invariants that must hold before connecting to the host.
///
/// # Errors
///
/// Returns `MissingField` when `host` or `go_install` is absent and
/// `InvalidPackage` when the executable name cannot be derived.
pub fn validate(service: &str, raw: &ServiceConfig, file: &str) -> Result<(), ConfigError> {
    let missing = |field| ConfigError::MissingField {
        service: service.to_string(),
        field,
        file: file.to_string(),
    };
    if non_empty(raw.host.as_deref()).is_none() {
        return Err(missing("host"));
    }
    let package = non_empty(raw.go_install.as_deref()).ok_or_else(|| missing("go_install"))?;
    if binary_name(package).is_none() {
        return Err(ConfigError::InvalidPackage {
            service: service.to_string(),
            package: package.to_string(),
        });
    }
    if non_empty(raw.go_private.as_deref()).is_some() {
        let credentials = [
            ("netrc_machine", &raw.netrc_machine),
            ("netrc_login", &raw.netrc_login),
            ("netrc_password", &raw.netrc_password),
        ];
        // All or nothing: a partial entry would corrupt ~/.netrc.
        let absent: Vec<&'static str> = credentials
            .iter()
            .filter(|(_, value)| non_empty(value.as_deref()).is_none())
            .map(|&(field, _)| field)
            .collect();
        match absent.first() {
            Some(&field) if absent.len() < credentials.len() => return Err(missing(field)),
            _ => {}
        }
    }
    Ok(())
}

/// Build the connection parameters, falling back to the local user, port 22
/// and `~/.ssh/id_rsa`.
///
/// # Errors
///
/// Returns `MissingField` when a value has neither an explicit setting nor a
/// local fallback.
pub fn connection_params(
    service: &str,
    raw: &ServiceConfig,
    local: &LocalEnvironment,
    file: &str,
) -> Result<ConnectionParams, ConfigError> {
    let missing = |field| ConfigError::MissingField {
        service: service.to_string(),
        field,
        file: file.to_string(),
    };
    let host = non_empty(raw.host.as_deref()).ok_or_else(|| missing("host"))?;
    let user = non_empty(raw.user.as_deref())
        .or(local.user.as_deref())
        .ok_or_else(|| missing("user"))?;
    let private_key_path = match &raw.private_key_path {
        Some(path) if !path.as_os_str().is_empty() => path.clone(),
        _ => local
            .home
            .as_ref()
            .map(|home| home.join(".ssh").join("id_rsa"))
            .ok_or_else(|| missing("private_key_path"))?,
    };
    Ok(ConnectionParams {
        user: user.to_string(),
        host: host.to_string(),
        port: raw.port.unwrap_or(DEFAULT_PORT),
        private_key_path,
    })
}

/// Apply every default to `raw`. `remote_home` is the output of `pwd` in a
/// fresh session on the host.
///
/// # Errors
///
/// Returns the same errors as [`validate`] and [`connection_params`].
pub fn resolve(
    service: &str,
    raw: &ServiceConfig,
    connection: ConnectionParams,
    remote_home: &str,
    file: &str,
) -> Result<ResolvedConfig, ConfigError> {
    validate(service, raw, file)?;
    let go_install = raw.go_install.clone().unwrap_or_default();
    let name = binary_name(&go_install).ok_or_else(|| ConfigError::InvalidPackage {
        service: service.to_string(),
        package: go_install.clone(),
    })?;

    let or_default = |value: Option<&str>, default: String| {
        non_empty(value).map_or(default, str::to_string)
    };
    let go_bin_directory = or_default(
        raw.go_bin_directory.as_deref(),
        join_remote(remote_home, "go/bin"),
    );
    let installed_binary = join_remote(&go_bin_directory, &name);

    let netrc = match (
        non_empty(raw.go_private.as_deref()),
        non_empty(raw.netrc_machine.as_deref()),
        non_empty(raw.netrc_login.as_deref()),
        non_empty(raw.netrc_password.as_deref()),
    ) {
        (Some(_), Some(machine), Some(login), Some(password)) => Some(NetrcEntry {
            machine: machine.to_string(),
            login: login.to_string(),
            password: password.to_string(),
        }),
        _ => None,
    };

    Ok(ResolvedConfig {
        connection,
        go_exec_path: or_default(
            raw.go_exec_path.as_deref(),
            DEFAULT_GO_EXEC_PATH.to_string(),
        ),
        go_install,
        go_private: non_empty(raw.go_private.as_deref()).map(str::to_string),
        netrc,
        systemd_path: or_default(
            raw.systemd_path.as_deref(),
            DEFAULT_SYSTEMD_PATH.to_string(),
        ),
        systemd_services_directory: or_default(
            raw.systemd_services_directory.as_deref(),
            join_remote(remote_home, ".config/systemd/user"),
        ),
        systemd_linger_dir: or_default(
            raw.systemd_linger_dir.as_deref(),
            DEFAULT_SYSTEMD_LINGER_DIR.to_string(),
        ),
        exec_start: or_default(raw.exec_start.as_deref(), installed_binary.clone()),
        installed_binary,
        go_bin_directory,
        working_directory: or_default(raw.working_directory.as_deref(), remote_home.to_string()),
        environment: non_empty(raw.environment.as_deref()).map(str::to_string),
        log_path: non_empty(raw.log_path.as_deref()).map(str::to_string),
        run_after_service: non_empty(raw.run_after_service.as_deref()).map(str::to_string),
        start_limit_burst: raw.start_limit_burst.unwrap_or(0),
        start_limit_interval_sec: raw.start_limit_interval_sec.unwrap_or(0),
        restart_sec: raw.restart_sec.unwrap_or(0),
        copy_files: raw.copy_files.clone(),
    })
}

#[allow(clippy::expect_used)] // pattern is a compile-time constant
static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)([-\w]+)@\S+$").expect("valid package pattern")
});

#[allow(clippy::expect_used)] // pattern is a compile-time constant
static MAJOR_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v\d+$").expect("valid major version pattern"));

/// Name of the executable `go install` produces for `package`.
///
/// `github.com/acme/tools/cmd/api@latest` gives `api`; a trailing major
/// version element (`.../api/v2@v2.1.0`) gives the element before it.
#[must_use]
pub fn binary_name(package: &str) -> Option<String> {
    let captures = PACKAGE_RE.captures(package)?;
    let last = captures.get(1)?;
    if MAJOR_VERSION_RE.is_match(last.as_str()) {
        let path = &package[..last.start()];
        let previous = path.trim_end_matches('/').rsplit('/').next()?;
        if !previous.is_empty() {
            return Some(previous.to_string());
        }
    }
    Some(last.as_str().to_string())
}

/// Join a relative path onto a remote (POSIX) directory.
#[must_use]
pub fn join_remote(base: &str, relative: &str) -> String {
    if base.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

// ── Environment overlay ──────────────────────────────────────────────────────

type ApplyOverride = fn(&mut ServiceConfig, &str) -> Result<(), String>;

/// A configuration key that can be overridden from the environment.
pub struct OverlayField {
    /// YAML key, upper-cased to build the variable name.
    pub key: &'static str,
    apply: ApplyOverride,
}

/// Every overridable field and how its variable is parsed.
pub const OVERLAY_FIELDS: &[OverlayField] = &[
    OverlayField { key: "user", apply: |c, v| set(&mut c.user, v) },
    OverlayField { key: "host", apply: |c, v| set(&mut c.host, v) },
    OverlayField {
        key: "port",
        apply: |c, v| {
            c.port = Some(v.parse().map_err(|_| "expected a port number".to_string())?);
            Ok(())
        },
    },
    OverlayField {
        key: "private_key_path",
        apply: |c, v| {
            c.private_key_path = Some(PathBuf::from(v));
            Ok(())
        },
    },
    OverlayField { key: "go_exec_path", apply: |c, v| set(&mut c.go_exec_path, v) },
    OverlayField { key: "go_bin_directory", apply: |c, v| set(&mut c.go_bin_directory, v) },
    OverlayField { key: "go_install", apply: |c, v| set(&mut c.go_install, v) },
    OverlayField { key: "go_private", apply: |c, v| set(&mut c.go_private, v) },
    OverlayField { key: "netrc_machine", apply: |c, v| set(&mut c.netrc_machine, v) },
    OverlayField { key: "netrc_login", apply: |c, v| set(&mut c.netrc_login, v) },
    OverlayField { key: "netrc_password", apply: |c, v| set(&mut c.netrc_password, v) },
    OverlayField { key: "systemd_path", apply: |c, v| set(&mut c.systemd_path, v) },
    OverlayField {
        key: "systemd_services_directory",
        apply: |c, v| set(&mut c.systemd_services_directory, v),
    },
    OverlayField { key: "systemd_linger_dir", apply: |c, v| set(&mut c.systemd_linger_dir, v) },
    OverlayField { key: "exec_start", apply: |c, v| set(&mut c.exec_start, v) },
    // `working_dir` mirrors the YAML alias; the full key wins when both are set.
    OverlayField { key: "working_dir", apply: |c, v| set(&mut c.working_directory, v) },
    OverlayField { key: "working_directory", apply: |c, v| set(&mut c.working_directory, v) },
    OverlayField { key: "environment", apply: |c, v| set(&mut c.environment, v) },
    OverlayField { key: "log_path", apply: |c, v| set(&mut c.log_path, v) },
    OverlayField { key: "run_after_service", apply: |c, v| set(&mut c.run_after_service, v) },
    OverlayField {
        key: "start_limit_burst",
        apply: |c, v| set_number(&mut c.start_limit_burst, v),
    },
    OverlayField {
        key: "start_limit_interval_sec",
        apply: |c, v| set_number(&mut c.start_limit_interval_sec, v),
    },
    OverlayField { key: "restart_sec", apply: |c, v| set_number(&mut c.restart_sec, v) },
    OverlayField {
        key: "copy_files",
        apply: |c, v| {
            c.copy_files = v
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            Ok(())
        },
    },
    OverlayField {
        key: "ignore",
        apply: |c, v| {
            c.ignore = match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err("expected true or false".to_string()),
            };
            Ok(())
        },
    },
];

fn set(field: &mut Option<String>, value: &str) -> Result<(), String> {
    *field = Some(value.to_string());
    Ok(())
}

fn set_number(field: &mut Option<u32>, value: &str) -> Result<(), String> {
    *field = Some(
        value
            .parse()
            .map_err(|_| "expected a non-negative integer".to_string())?,
    );
    Ok(())
}

/// Variable prefix for `service`: upper-cased, every non-alphanumeric
/// character replaced by `_`, and `_` prepended when it starts with a digit.
#[must_use]
pub fn env_prefix(service: &str) -> String {
    let mut prefix: String = service
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    if prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, '_');
    }
    prefix
}

/// Name of the variable overriding `key` of `service`, e.g. `FOO_HOST`.
#[must_use]
pub fn overlay_var(service: &str, key: &str) -> String {
    format!("{}_{}", env_prefix(service), key.to_ascii_uppercase())
}

/// Override fields of `config` with values returned by `lookup`.
///
/// # Errors
///
/// Returns `InvalidOverride` when a numeric or boolean variable does not
/// parse.
pub fn apply_overlay(
    service: &str,
    config: &mut ServiceConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    for field in OVERLAY_FIELDS {
        let var = overlay_var(service, field.key);
        if let Some(value) = lookup(&var) {
            (field.apply)(config, &value).map_err(|reason| ConfigError::InvalidOverride {
                var: var.clone(),
                value: value.clone(),
                reason,
            })?;
        }
    }
    Ok(())
}

/// Names of the services selected when none are given: every service not
/// marked `ignore`, in name order.
#[must_use]
pub fn default_selection(configs: &ServiceConfigs) -> Vec<String> {
    configs
        .iter()
        .filter(|(_, config)| !config.ignore)
        .map(|(name, _)| name.clone())
        .collect()
}

// ── Unit tests ───────────────────────────────────────────────────────────────
