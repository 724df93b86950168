//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// hushwire client: log in, find a peer's key and exchange sealed messages
#[derive(Parser, Debug, Default)]
#[command(name = "hushwire-client")]
#[command(version, about = "End-to-end encrypted messaging client for a hushwire relay")]
pub struct Cli {
    /// Relay address as host:port [default: localhost:3000]
    #[arg(long)]
    pub addr: Option<String>,

    /// Identifier to log in as [default: foo]
    #[arg(long)]
    pub from: Option<String>,

    /// Recipient identifier [default: bar]
    #[arg(long)]
    pub to: Option<String>,

    /// Message body sent on every tick [default: "test data"]
    #[arg(long)]
    pub body: Option<String>,

    /// Seconds between outgoing messages [default: 3]
    #[arg(long)]
    pub interval: Option<u64>,

    /// Only receive, never send
    #[arg(long)]
    pub listen_only: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// TOML config file; flags override its values
    #[arg(long, env = "HUSHWIRE_CLIENT_CONFIG")]
    pub config: Option<PathBuf>,
}
