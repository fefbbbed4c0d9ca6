//! chatvault - Conversational session store
//!
//! Main entry point for the chatvault server and session tools.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatvault::cli::{Cli, Commands};
use chatvault::commands;
use chatvault::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config, &cli)?;
    config.validate()?;

    match cli.command.clone() {
        None | Some(Commands::Serve { port: None }) => {
            commands::serve::run_server(config, None).await
        }
        Some(Commands::Serve { port }) => commands::serve::run_server(config, port).await,
        Some(Commands::Sessions { command }) => {
            commands::sessions::handle_sessions(config, command).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "chatvault=debug,tower_http=debug"
    } else {
        "chatvault=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
