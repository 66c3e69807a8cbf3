//! Application context: unified state passed to every command handler.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::application::services::registry::ServiceRegistry;
use crate::infra::config::{YamlConfigStore, local_environment};
use crate::infra::ssh::SshConnector;
use crate::output::OutputContext;

/// Unified application context passed to every command handler.
///
/// Constructed once in `Cli::run()` and passed as `&AppContext`.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Services configuration source.
    pub config: YamlConfigStore,
}

impl AppContext {
    #[must_use]
    pub fn new(config_path: PathBuf, no_color: bool, quiet: bool) -> Self {
        Self {
            output: OutputContext::new(no_color, quiet),
            config: YamlConfigStore::new(config_path),
        }
    }

    /// Load the configuration and build the registry of SSH-reachable
    /// services.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read, parsed, or
    /// overridden.
    pub fn registry(&self) -> Result<ServiceRegistry<SshConnector>> {
        let configs = self.config.load()?;
        let file = self.config.path().display().to_string();
        Ok(ServiceRegistry::new(configs, &file, SshConnector, local_environment()))
    }
}
