//! `tether start|stop|restart|status`: single systemctl calls.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle::Action;
use crate::commands::{ServiceArgs, run_action};

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn start(app: &AppContext, args: ServiceArgs) -> Result<()> {
    run_action(app, args, Action::Start).await
}

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn stop(app: &AppContext, args: ServiceArgs) -> Result<()> {
    run_action(app, args, Action::Stop).await
}

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn restart(app: &AppContext, args: ServiceArgs) -> Result<()> {
    run_action(app, args, Action::Restart).await
}

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn status(app: &AppContext, args: ServiceArgs) -> Result<()> {
    run_action(app, args, Action::Status).await
}
