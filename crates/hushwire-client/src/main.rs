//! hushwire client entry point

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hushwire_client::{ClientConfig, Cli, ExitCode, StdinPrompt};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(&cli),
        Err(e) => {
            eprintln!("Error: Config error: {e}");
            return ExitCode::InvalidInput.into();
        }
    };

    let filter = if config.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    match hushwire_client::run(config, &mut StdinPrompt).await {
        Ok(()) => ExitCode::Success.into(),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from_error(&e).into()
        }
    }
}
