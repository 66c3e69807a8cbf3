//! systemd unit file rendering.

use crate::domain::config::ResolvedConfig;

/// Render the user-level systemd unit for `service`.
///
/// Optional settings are written only when set, in a fixed order. The text
/// is not checked against systemd's own grammar.
#[must_use]
pub fn render(service: &str, config: &ResolvedConfig) -> String {
    let mut unit = String::new();
    let mut line = |text: String| {
        unit.push_str(&text);
        unit.push('\n');
    };

    line("[Unit]".to_string());
    line(format!("Description={service}"));
    if let Some(after) = &config.run_after_service {
        line(format!("After={after}"));
    }
    if config.start_limit_burst > 0 {
        line(format!("StartLimitBurst={}", config.start_limit_burst));
    }
    if config.start_limit_interval_sec > 0 {
        line(format!(
            "StartLimitIntervalSec={}",
            config.start_limit_interval_sec
        ));
    }
    line(String::new());

    line("[Service]".to_string());
    line("Type=simple".to_string());
    line("Restart=always".to_string());
    if config.restart_sec > 0 {
        line(format!("RestartSec={}", config.restart_sec));
    }
    if let Some(environment) = &config.environment {
        line(format!("Environment={environment}"));
    }
    if let Some(log_path) = &config.log_path {
        line(format!("StandardOutput=append:{log_path}"));
        line(format!("StandardError=append:{log_path}"));
    }
    line(format!("WorkingDirectory={}", config.working_directory));
    line(format!("ExecStart={}", config.exec_start));
    line(String::new());

    line("[Install]".to_string());
    unit.push_str("WantedBy=default.target");
    unit
}
