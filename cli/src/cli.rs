//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use tether_cli::app::AppContext;
use tether_cli::commands;

/// Deploy and manage Go services on remote hosts through user-level systemd
#[derive(Parser)]
#[command(
    name = "tether",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Services configuration file
    #[arg(
        short = 'f',
        long = "config",
        global = true,
        env = "TETHER_CONFIG",
        default_value = ".tether.yml"
    )]
    pub config: PathBuf,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also disabled when `NO_COLOR` is set)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install the package, upload the unit and enable the service
    Install(commands::install::InstallArgs),

    /// Stop, disable and remove the service
    Uninstall(commands::uninstall::UninstallArgs),

    /// Start the service
    Start(commands::ServiceArgs),

    /// Stop the service
    Stop(commands::ServiceArgs),

    /// Restart the service
    Restart(commands::ServiceArgs),

    /// Show the service status
    Status(commands::ServiceArgs),

    /// Print the generated systemd unit file
    ShowService(commands::ServiceArgs),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded. Per-service
    /// failures are reported as progress lines and are not errors.
    pub async fn run(self) -> Result<()> {
        let Cli {
            config,
            quiet,
            no_color,
            command,
        } = self;
        let app = AppContext::new(config, no_color, quiet);
        match command {
            Command::Install(args) => commands::install::run(&app, args).await,
            Command::Uninstall(args) => commands::uninstall::run(&app, args).await,
            Command::Start(args) => commands::control::start(&app, args).await,
            Command::Stop(args) => commands::control::stop(&app, args).await,
            Command::Restart(args) => commands::control::restart(&app, args).await,
            Command::Status(args) => commands::control::status(&app, args).await,
            Command::ShowService(args) => commands::show_service::run(&app, args).await,
        }
    }
}
