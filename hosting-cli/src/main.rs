//! `hostctl`: command-line frontend for the hosting core.
//!
//! Opens the `SQLite` store named in the configuration file and runs one
//! administrative action as the given actor. Results are printed to stdout as
//! JSON; logs and error messages go to stderr.
//!
//! ```bash
//! hostctl create-reseller acme --max-domains 10 --mailboxes 100 --disk 5000
//! hostctl --as reseller --actor-id 1 change-limits 4 --mailboxes 20 --disk 800
//! hostctl --as reseller --actor-id 1 change-status 4 deactivate
//! hostctl dispatch
//! ```

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use hosting_app::{AppConfig, AppState};
use hosting_core::CoreError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CoreError>() {
                Some(core) => {
                    for message in core.messages() {
                        tracing::error!("{message}");
                    }
                }
                None => tracing::error!("{e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(Some(cli.config.as_path()))?;
    tracing::debug!("Using database {}", config.database_path.display());
    let (state, store) = AppState::open(config).await?;
    let actor = cli.actor.actor();
    commands::run(&state, &store, &actor, cli.command).await
}
