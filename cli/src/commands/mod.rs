//! Command implementations

pub mod control;
pub mod install;
pub mod show_service;
pub mod uninstall;

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::Connector;
use crate::application::services::dispatch::{ProgressSink, dispatch};
use crate::application::services::lifecycle::Action;
use crate::application::services::registry::ServiceRegistry;

/// Services to act on.
#[derive(Args, Debug, Default)]
pub struct ServiceArgs {
    /// Service names; every service not marked `ignore` when omitted
    #[arg(value_name = "SERVICE")]
    pub services: Vec<String>,
}

/// The requested names without repeats, or the default selection when
/// none were given.
#[must_use]
pub fn select<C: Connector>(registry: &ServiceRegistry<C>, requested: Vec<String>) -> Vec<String> {
    if requested.is_empty() {
        return registry.default_selection();
    }
    let mut selected: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested {
        if !selected.contains(&name) {
            selected.push(name);
        }
    }
    selected
}

/// Load the configuration, then run `action` for the selected services and
/// render their progress until every one of them has finished.
///
/// # Errors
///
/// Returns an error only if the configuration cannot be loaded.
pub async fn run_action(app: &AppContext, args: ServiceArgs, action: Action) -> Result<()> {
    let registry = app.registry()?;
    let names = select(&registry, args.services);
    if names.is_empty() {
        tracing::warn!(file = registry.file(), "no services selected");
        return Ok(());
    }

    let sink = ProgressSink::start(app.output.renderer(&names));
    let outcomes = dispatch(Arc::new(registry), names, action, &sink.reporter()).await;
    sink.stop().await?;

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::debug!(action = action.name(), total = outcomes.len(), failed, "dispatch finished");
    Ok(())
}
