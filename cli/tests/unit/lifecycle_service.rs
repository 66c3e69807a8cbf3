//! Unit tests for the service lifecycle pipelines.
//!
//! Every test drives a `Service` against a `FakeRemote` and asserts on the
//! commands the host saw and the events the service reported.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;

use tether_cli::application::services::lifecycle::{Action, Service};
use tether_cli::domain::config::ServiceConfig;
use tether_cli::domain::{Severity, unit};

use crate::mocks::{
    CONFIG_FILE, FakeRemote, FakeSession, HOME, RecordingReporter, resolved, service_config,
};

const UNIT_PATH: &str = "/home/app/.config/systemd/user/api.service";

fn service(remote: &FakeRemote, raw: &ServiceConfig) -> Service<FakeSession> {
    Service::new("api", resolved("api", raw), HOME, CONFIG_FILE, remote.session())
}

fn install(remote: &FakeRemote, raw: &ServiceConfig) -> (anyhow::Result<()>, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let result = Action::Install {
        create_working_dir: false,
    }
    .perform(&mut service(remote, raw), &reporter);
    (result, reporter)
}

fn uninstall(
    remote: &FakeRemote,
    raw: &ServiceConfig,
    remove_working_dir: bool,
) -> (anyhow::Result<()>, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let result = Action::Uninstall { remove_working_dir }.perform(&mut service(remote, raw), &reporter);
    (result, reporter)
}

// ── Install ───────────────────────────────────────────────────────────────────

#[test]
fn test_install_runs_every_step_in_order() {
    let remote = FakeRemote::new();
    let raw = service_config("10.0.0.5");

    let (result, reporter) = install(&remote, &raw);

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(
        remote.commands(),
        vec![
            "/usr/local/go/bin/go version",
            "systemd --version",
            "ls /var/lib/systemd/linger",
            "test -e /home/app",
            "/usr/local/go/bin/go install github.com/acme/shop/cmd/api@latest",
            "test -f /home/app/go/bin/api",
            "systemctl --user daemon-reload",
            "systemctl --user enable api",
        ]
    );
    assert_eq!(
        remote.file(UNIT_PATH).expect("unit uploaded"),
        unit::render("api", &resolved("api", &raw))
    );
    assert!(reporter.errors().is_empty());
    assert_eq!(reporter.events().last().map(|e| e.text().to_string()), Some("installed".to_string()));
}

#[test]
fn test_install_stops_when_go_is_missing() {
    let remote = FakeRemote::new().fail("/usr/local/go/bin/go version", "bash: go: command not found");

    let (result, reporter) = install(&remote, &service_config("10.0.0.5"));

    assert!(result.is_err());
    assert_eq!(remote.commands(), vec!["/usr/local/go/bin/go version"]);
    let errors = reporter.errors();
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].starts_with("couldn't find the `go` executable"));
    assert!(errors[0].contains("`.tether.yml`"));
    assert!(errors[0].ends_with(": bash: go: command not found"));
    assert_eq!(errors[1], "install aborted");
    assert!(remote.file(UNIT_PATH).is_none());
}

#[test]
fn test_install_requires_lingering_user() {
    let remote = FakeRemote::new().respond("ls /var/lib/systemd/linger", "root\ndeploy");

    let (result, reporter) = install(&remote, &service_config("10.0.0.5"));

    assert!(result.is_err());
    assert_eq!(
        reporter.errors()[0],
        "user `app` is not in the linger list. You can add it with the command `sudo loginctl enable-linger app`"
    );
    assert!(!remote.ran("/usr/local/go/bin/go install"));
}

#[test]
fn test_install_missing_working_directory_without_create_fails() {
    let remote = FakeRemote::new().fail("test -e /srv/api", "");
    let raw = ServiceConfig {
        working_directory: Some("/srv/api".to_string()),
        ..service_config("10.0.0.5")
    };

    let (result, reporter) = install(&remote, &raw);

    assert!(result.is_err());
    assert!(reporter.errors()[0].contains("'/srv/api' does not exist"));
    assert!(!remote.ran("mkdir"));
}

#[test]
fn test_install_creates_missing_working_directory_when_asked() {
    let remote = FakeRemote::new().fail("test -e /srv/api", "");
    let raw = ServiceConfig {
        working_directory: Some("/srv/api".to_string()),
        ..service_config("10.0.0.5")
    };
    let reporter = RecordingReporter::default();

    Action::Install {
        create_working_dir: true,
    }
    .perform(&mut service(&remote, &raw), &reporter)
    .expect("install");

    assert!(remote.ran("mkdir -p /srv/api"));
}

#[test]
fn test_install_package_failure_names_package() {
    let remote = FakeRemote::new().fail(
        "/usr/local/go/bin/go install",
        "go: module github.com/acme/shop: not found",
    );

    let (result, reporter) = install(&remote, &service_config("10.0.0.5"));

    assert!(result.is_err());
    assert_eq!(
        reporter.errors()[0],
        "cannot install the package `github.com/acme/shop/cmd/api@latest`: go: module github.com/acme/shop: not found"
    );
    assert!(!remote.ran("test -f"));
}

// ── Private modules ───────────────────────────────────────────────────────────

fn private_config() -> ServiceConfig {
    ServiceConfig {
        go_private: Some("github.com/acme".to_string()),
        netrc_machine: Some("github.com".to_string()),
        netrc_login: Some("bot".to_string()),
        netrc_password: Some("s3cr3t".to_string()),
        ..service_config("10.0.0.5")
    }
}

#[test]
fn test_install_appends_netrc_entry_without_leaking_password() {
    let remote = FakeRemote::new().fail("cat ~/.netrc", "cat: /home/app/.netrc: No such file");

    let (result, reporter) = install(&remote, &private_config());

    assert!(result.is_ok(), "{result:?}");
    assert!(remote.ran("echo 'machine github.com login bot password s3cr3t' >> ~/.netrc"));
    assert!(remote.ran("GOPRIVATE=github.com/acme /usr/local/go/bin/go install"));
    assert!(
        reporter.events().iter().all(|e| !e.text().contains("s3cr3t")),
        "password leaked into progress events"
    );
}

#[test]
fn test_install_skips_netrc_entry_already_present() {
    let remote = FakeRemote::new().respond(
        "cat ~/.netrc",
        "machine example.com login x password y\nmachine github.com login bot password s3cr3t",
    );

    let (result, _) = install(&remote, &private_config());

    assert!(result.is_ok(), "{result:?}");
    assert!(!remote.ran("echo"));
}

#[test]
fn test_netrc_failure_does_not_echo_the_command() {
    let remote = FakeRemote::new().fail("echo", "");

    let (result, reporter) = install(&remote, &private_config());

    assert!(result.is_err());
    assert_eq!(reporter.errors()[0], "cannot update ~/.netrc: exited with status 1");
}

#[test]
fn test_go_private_without_credentials_leaves_netrc_alone() {
    let remote = FakeRemote::new();
    let raw = ServiceConfig {
        go_private: Some("github.com/acme".to_string()),
        ..service_config("10.0.0.5")
    };

    let (result, _) = install(&remote, &raw);

    assert!(result.is_ok(), "{result:?}");
    assert!(!remote.ran("cat ~/.netrc"));
    assert!(!remote.ran("echo"));
    assert!(remote.ran("GOPRIVATE=github.com/acme /usr/local/go/bin/go install"));
}

#[test]
fn test_netrc_password_with_quote_stays_one_shell_word() {
    let remote = FakeRemote::new();
    let raw = ServiceConfig {
        netrc_password: Some("p'w; touch /tmp/owned #".to_string()),
        ..private_config()
    };

    let (result, _) = install(&remote, &raw);

    assert!(result.is_ok(), "{result:?}");
    assert!(remote.ran(
        r"echo 'machine github.com login bot password p'\''w; touch /tmp/owned #' >> ~/.netrc"
    ));
}

#[test]
fn test_netrc_read_transport_error_aborts_install() {
    let remote = FakeRemote::new().drop_connection("cat ~/.netrc", "channel closed");

    let (result, reporter) = install(&remote, &private_config());

    assert!(result.is_err());
    assert_eq!(reporter.errors()[0], "cannot read ~/.netrc: channel closed");
    assert!(!remote.ran("echo"));
    assert!(!remote.ran("GOPRIVATE="));
}

// ── Files ─────────────────────────────────────────────────────────────────────

#[test]
fn test_install_copies_files_into_working_directory() {
    let local = tempfile::tempdir().expect("tempdir");
    let settings = local.path().join("settings.yml");
    fs::write(&settings, "port: 8080\n").expect("write");
    fs::create_dir_all(local.path().join("static")).expect("mkdir");
    fs::write(local.path().join("static").join("index.html"), "<html>").expect("write");

    let remote = FakeRemote::new();
    let raw = ServiceConfig {
        copy_files: vec![settings, local.path().join("static")],
        ..service_config("10.0.0.5")
    };

    let (result, reporter) = install(&remote, &raw);

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(remote.file("/home/app/settings.yml").as_deref(), Some("port: 8080\n"));
    assert_eq!(remote.file("/home/app/static/index.html").as_deref(), Some("<html>"));
    assert!(reporter.texts(Severity::Success).contains(&"All files copied".to_string()));
}

#[test]
fn test_install_fails_when_copy_source_is_missing() {
    let local = tempfile::tempdir().expect("tempdir");
    let remote = FakeRemote::new();
    let raw = ServiceConfig {
        copy_files: vec![local.path().join("missing.yml")],
        ..service_config("10.0.0.5")
    };

    let (result, reporter) = install(&remote, &raw);

    assert!(result.is_err());
    assert!(reporter.errors()[0].starts_with("cannot copy file"));
    assert!(remote.file(UNIT_PATH).is_none());
}

#[test]
fn test_install_reports_unavailable_file_channel() {
    let remote = FakeRemote::new().without_file_channel();

    let (result, reporter) = install(&remote, &service_config("10.0.0.5"));

    assert!(result.is_err());
    assert!(reporter.errors()[0].contains("subsystem request failed"));
    assert!(!remote.ran("systemctl"));
}

// ── Uninstall ─────────────────────────────────────────────────────────────────

#[test]
fn test_uninstall_runs_every_step_even_after_failure() {
    let remote = FakeRemote::new().fail("systemctl --user stop api", "Unit api.service not loaded.");
    remote.put_file(UNIT_PATH, "[Unit]");
    let raw = service_config("10.0.0.5");

    let (result, reporter) = uninstall(&remote, &raw, false);

    let err = result.expect_err("stop failed");
    assert!(err.to_string().contains("1 failed step(s): stop"), "{err}");
    assert_eq!(
        remote.commands(),
        vec![
            "systemctl --user stop api",
            "systemctl --user disable api",
            format!("rm {UNIT_PATH}").as_str(),
            "systemctl --user daemon-reload",
            "systemctl --user reset-failed",
            "rm /home/app/go/bin/api",
        ]
    );
    let errors = reporter.errors();
    assert_eq!(errors[0], "couldn't stop systemd service: Unit api.service not loaded.");
    assert_eq!(errors.last().map(String::as_str), Some("uninstalled with 1 failed step(s): stop"));
}

#[test]
fn test_uninstall_warns_about_files_already_gone() {
    let local = tempfile::tempdir().expect("tempdir");
    let settings = local.path().join("settings.yml");
    fs::write(&settings, "port: 8080\n").expect("write");
    let remote = FakeRemote::new();
    let raw = ServiceConfig {
        copy_files: vec![settings],
        ..service_config("10.0.0.5")
    };

    let (result, reporter) = uninstall(&remote, &raw, false);

    assert!(result.is_ok(), "{result:?}");
    let warnings = reporter.texts(Severity::Warning);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("/home/app/settings.yml"));
    assert!(reporter.texts(Severity::Success).contains(&"All files deleted".to_string()));
}

#[test]
fn test_uninstall_never_removes_home_directory() {
    let remote = FakeRemote::new();

    let (result, _) = uninstall(&remote, &service_config("10.0.0.5"), true);

    assert!(result.is_ok(), "{result:?}");
    assert!(remote.has_dir(HOME));
}

#[test]
fn test_uninstall_keeps_non_empty_working_directory() {
    let remote = FakeRemote::new();
    remote.put_file("/srv/api/data.db", "x");
    let raw = ServiceConfig {
        working_directory: Some("/srv/api".to_string()),
        ..service_config("10.0.0.5")
    };

    let (result, reporter) = uninstall(&remote, &raw, true);

    assert!(result.is_err());
    assert!(remote.has_dir("/srv/api"));
    assert!(
        reporter
            .errors()
            .contains(&"Cannot delete service working directory '/srv/api': directory is not empty".to_string())
    );
    assert!(
        !reporter.texts(Severity::Success).contains(&"Deleted".to_string()),
        "must not report a deletion that did not happen"
    );
}

#[test]
fn test_uninstall_removes_empty_working_directory_and_log() {
    let remote = FakeRemote::new();
    remote.put_dir("/srv/api");
    remote.put_file("/var/log/api/api.log", "started");
    let raw = ServiceConfig {
        working_directory: Some("/srv/api".to_string()),
        log_path: Some("/var/log/api/api.log".to_string()),
        ..service_config("10.0.0.5")
    };

    let (result, _) = uninstall(&remote, &raw, true);

    assert!(result.is_ok(), "{result:?}");
    assert!(!remote.has_dir("/srv/api"));
    assert!(remote.file("/var/log/api/api.log").is_none());
}

// ── Single-step actions ───────────────────────────────────────────────────────

#[test]
fn test_start_stop_restart_run_one_systemctl_call_each() {
    let remote = FakeRemote::new();
    let raw = service_config("10.0.0.5");
    let reporter = RecordingReporter::default();

    for action in [Action::Start, Action::Stop, Action::Restart] {
        action
            .perform(&mut service(&remote, &raw), &reporter)
            .expect("action");
    }

    assert_eq!(
        remote.commands(),
        vec![
            "systemctl --user start api",
            "systemctl --user stop api",
            "systemctl --user restart api",
        ]
    );
}

#[test]
fn test_status_failure_reports_bare_remote_output() {
    let remote = FakeRemote::new().fail(
        "systemctl --user status api",
        "Unit api.service could not be found.",
    );
    let reporter = RecordingReporter::default();

    let result = Action::Status.perform(&mut service(&remote, &service_config("10.0.0.5")), &reporter);

    assert!(result.is_err());
    assert_eq!(reporter.errors(), vec!["Unit api.service could not be found."]);
}

#[test]
fn test_show_service_reports_rendered_unit_without_remote_commands() {
    let remote = FakeRemote::new();
    let raw = service_config("10.0.0.5");
    let reporter = RecordingReporter::default();

    Action::ShowService
        .perform(&mut service(&remote, &raw), &reporter)
        .expect("show");

    assert!(remote.commands().is_empty());
    assert_eq!(
        reporter.texts(Severity::Normal),
        vec![unit::render("api", &resolved("api", &raw))]
    );
}
