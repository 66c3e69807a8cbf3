//! `tether uninstall`

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::Action;
use crate::commands::{ServiceArgs, run_action};

/// Arguments for the uninstall command.
#[derive(Args, Debug, Default)]
pub struct UninstallArgs {
    /// Also remove the log file and the working directory, if it is empty
    /// and not the home directory
    #[arg(long)]
    pub remove_working_dir: bool,

    #[command(flatten)]
    pub services: ServiceArgs,
}

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn run(app: &AppContext, args: UninstallArgs) -> Result<()> {
    let action = Action::Uninstall {
        remove_working_dir: args.remove_working_dir,
    };
    run_action(app, args.services, action).await
}
