//! `tether install`

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::lifecycle::Action;
use crate::commands::{ServiceArgs, run_action};

/// Arguments for the install command.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Create the working directory when it does not exist
    #[arg(long)]
    pub create_working_dir: bool,

    #[command(flatten)]
    pub services: ServiceArgs,
}

/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub async fn run(app: &AppContext, args: InstallArgs) -> Result<()> {
    let action = Action::Install {
        create_working_dir: args.create_working_dir,
    };
    run_action(app, args.services, action).await
}
