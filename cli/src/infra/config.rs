//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{self, LocalEnvironment, ServiceConfigs};

/// Production implementation of `ConfigStore` backed by a YAML file on disk.
///
/// Every service field can be overridden by an environment variable named
/// after the service, e.g. `BILLING_WORKER_HOST` for `billing-worker`.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ServiceConfigs> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let mut configs = parse(&content)
            .with_context(|| format!("cannot parse {}", self.path.display()))?;
        for (name, service) in &mut configs {
            config::apply_overlay(name, service, |var| std::env::var(var).ok())?;
        }
        tracing::debug!(path = %self.path.display(), services = configs.len(), "configuration loaded");
        Ok(configs)
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Parse the services mapping. An empty document holds no services.
///
/// # Errors
///
/// Returns an error if the text is not a mapping of service names to
/// service settings.
pub fn parse(content: &str) -> Result<ServiceConfigs> {
    if content.trim().is_empty() {
        return Ok(ServiceConfigs::new());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// The local user and home directory, used as connection fallbacks.
#[must_use]
pub fn local_environment() -> LocalEnvironment {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|user| !user.is_empty());
    LocalEnvironment {
        user,
        home: dirs::home_dir(),
    }
}
