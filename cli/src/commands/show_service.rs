//! `tether show-service`: print the unit file each service would get.
//!
//! Still connects to the host, since defaults depend on the remote home.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::lifecycle::Action;
use crate::commands::{ServiceArgs, run_action};

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn run(app: &AppContext, args: ServiceArgs) -> Result<()> {
    run_action(app, args, Action::ShowService).await
}
