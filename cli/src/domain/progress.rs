//! Progress events emitted by lifecycle steps.

/// How a progress event is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The step about to run.
    Normal,
    Success,
    Warning,
    Error,
}

/// One message about one orchestration step of one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    service: String,
    text: String,
    severity: Severity,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(service: &str, text: impl Into<String>, severity: Severity) -> Self {
        let mut text = text.into();
        if text.is_empty() && severity == Severity::Success {
            text = "ok".to_string();
        }
        Self {
            service: service.to_string(),
            text,
            severity,
        }
    }

    #[must_use]
    pub fn normal(service: &str, text: impl Into<String>) -> Self {
        Self::new(service, text, Severity::Normal)
    }

    /// A success event. Empty text becomes `ok`.
    #[must_use]
    pub fn success(service: &str, text: impl Into<String>) -> Self {
        Self::new(service, text, Severity::Success)
    }

    #[must_use]
    pub fn warning(service: &str, text: impl Into<String>) -> Self {
        Self::new(service, text, Severity::Warning)
    }

    #[must_use]
    pub fn error(service: &str, text: impl Into<String>) -> Self {
        Self::new(service, text, Severity::Error)
    }

    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }
}
