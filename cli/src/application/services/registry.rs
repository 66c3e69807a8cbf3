//! Service registry: turns configured names into connected services.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::application::ports::{Connector, RemoteShell};
use crate::application::services::lifecycle::Service;
use crate::domain::commands;
use crate::domain::config::{self, LocalEnvironment, ResolvedConfig, ServiceConfig, ServiceConfigs};
use crate::domain::{ConfigError, ConnectionParams};

/// Loaded service configurations plus what is needed to reach their hosts.
pub struct ServiceRegistry<C> {
    configs: ServiceConfigs,
    file: String,
    connector: C,
    local: LocalEnvironment,
    resolved: Mutex<HashMap<String, Arc<ResolvedConfig>>>,
}

impl<C: Connector> ServiceRegistry<C> {
    /// `file` is the configuration path as shown in diagnostics.
    #[must_use]
    pub fn new(configs: ServiceConfigs, file: &str, connector: C, local: LocalEnvironment) -> Self {
        Self {
            configs,
            file: file.to_string(),
            connector,
            local,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Services selected when the user names none.
    #[must_use]
    pub fn default_selection(&self) -> Vec<String> {
        config::default_selection(&self.configs)
    }

    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Validate, connect and resolve the service called `name`.
    ///
    /// Validation runs before any connection attempt, so a missing `host`
    /// never reaches the network. Defaults are resolved once per service and
    /// reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown, the configuration is
    /// invalid, the connection fails, or the remote home cannot be read.
    pub fn materialize(&self, name: &str) -> Result<Service<C::Session>> {
        let raw = self.configs.get(name).ok_or_else(|| ConfigError::UnknownService {
            service: name.to_string(),
            file: self.file.clone(),
        })?;
        config::validate(name, raw, &self.file)?;
        let params = config::connection_params(name, raw, &self.local, &self.file)?;

        tracing::debug!(service = name, host = %params.host, port = params.port, "connecting");
        let mut session = self.connector.connect(&params)?;
        let home = session
            .run(commands::PRINT_HOME)
            .map_err(|e| anyhow::anyhow!(e.diagnostic()))
            .context("cannot read the remote home directory")?;
        let home = home.trim().to_string();

        let resolved = self.resolve_once(name, raw, params, &home)?;
        Ok(Service::new(name, resolved, &home, &self.file, session))
    }

    fn resolve_once(
        &self,
        name: &str,
        raw: &ServiceConfig,
        params: ConnectionParams,
        home: &str,
    ) -> Result<Arc<ResolvedConfig>, ConfigError> {
        let mut cache = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(resolved) = cache.get(name) {
            tracing::debug!(service = name, "resolved configuration cached");
            return Ok(Arc::clone(resolved));
        }
        let resolved = Arc::new(config::resolve(name, raw, params, home, &self.file)?);
        cache.insert(name.to_string(), Arc::clone(&resolved));
        Ok(resolved)
    }
}
