//! hushwire-client: log in to a relay, find a peer's public key and
//! exchange end-to-end sealed messages with it.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod handshake;
pub mod session;

pub use api::DirectoryClient;
pub use cli::Cli;
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use handshake::{RecipientPrompt, StdinPrompt};
pub use session::Session;

use anyhow::Context;

/// Exit codes for the client binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Session ended normally (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// The relay rejected our token (exit code 2)
    AuthenticationFailed = 2,
    /// Could not reach the relay (exit code 4)
    ConnectionFailed = 4,
    /// Invalid configuration or arguments (exit code 5)
    InvalidInput = 5,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl ExitCode {
    /// Map an error chain to the most specific exit code.
    pub fn from_error(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(e) = cause.downcast_ref::<ClientError>() {
                return match e {
                    ClientError::Http(_) | ClientError::Connect(_) => ExitCode::ConnectionFailed,
                    ClientError::Status { status: 401, .. } => ExitCode::AuthenticationFailed,
                    _ => ExitCode::GeneralError,
                };
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return ExitCode::InvalidInput;
            }
        }
        ExitCode::GeneralError
    }
}

/// Handshake, connect, then exchange messages until the relay hangs up.
pub async fn run(config: ClientConfig, prompt: &mut dyn RecipientPrompt) -> anyhow::Result<()> {
    config.validate()?;

    let api = DirectoryClient::new(config.base_url());
    let handshake = handshake::perform(&config, &api, prompt).await?;

    let socket = session::connect(&config.stream_url(), &handshake.token)
        .await
        .context("unable to connect via persistent stream")?;

    Session::new(
        config,
        handshake.keypair,
        handshake.recipient_key,
        api,
        handshake.token,
    )
    .run(socket)
    .await
}
