//! hushwire-relay binary

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hushwire_relay::config::ENV_CONFIG_PATH;
use hushwire_relay::{RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "hushwire-relay", version, about = "Ciphertext-only message relay")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config and environment)
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Token signing secret (overrides config and environment)
    #[arg(long)]
    token_secret: Option<String>,
}

impl Args {
    fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_toml(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => ServerConfig::default(),
        };
        config.apply_env()?;

        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(secret) = &self.token_secret {
            config.token_secret = Some(secret.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.load_config()?;
    info!(?config, "Starting hushwire-relay");

    let server = RelayServer::bind(config).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server error: {:#}", e);
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
