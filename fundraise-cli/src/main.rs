use anyhow::Result;
use args::{CliArgs, ClientConfig};
use clap::Parser;
use fundraise_contract_clients::FundraiseError;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod deploy;
mod prompt;
mod render;
mod shutdown;
mod watch;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::ERROR.into())
        .with_default_directive("alloy_transport_ws=off".parse()?)
        .from_env_lossy()
        .add_directive("alloy=warn".parse()?)
        .add_directive("alloy_pubsub=error".parse()?)
        .add_directive("fundraise=info".parse()?)
        .add_directive("fundraise_cli=info".parse()?)
        .add_directive("fundraise_contract_clients=info".parse()?);

    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(true))
        .with(filter)
        .init();

    // Load configuration
    let cli_args = CliArgs::parse();
    let config = ClientConfig::load(&cli_args)?;

    // Setup shutdown handler
    let shutdown_token = CancellationToken::new();
    let shutdown_token_clone = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown::shutdown_signal(shutdown_token_clone).await;
    });

    match commands::run(cli_args.command, &config, shutdown_token).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(FundraiseError::Unhandled(e)) => {
            error!("An unexpected error occurred: {e:#}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!(kind = e.kind(), "{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
