//! Everything that happens before messages flow: key generation, login
//! and finding the recipient's public key.

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use hushwire_crypto::{generate_keypair, Keypair};
use hushwire_proto::PUBLIC_KEY_LEN;

use crate::api::DirectoryClient;
use crate::config::ClientConfig;
use crate::error::ClientError;

/// Asks a human to get the recipient registered before the next lookup.
#[async_trait]
pub trait RecipientPrompt: Send {
    /// Return once another lookup of `recipient` should be attempted.
    async fn wait_for_registration(&mut self, recipient: &str) -> anyhow::Result<()>;
}

/// Prompt on stdout and wait for enter on stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

#[async_trait]
impl RecipientPrompt for StdinPrompt {
    async fn wait_for_registration(&mut self, recipient: &str) -> anyhow::Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(
                format!(
                    "User with name [{recipient}] has not registered yet. \
                     Register the user first and press enter to continue..."
                )
                .as_bytes(),
            )
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        if read == 0 {
            bail!("stdin closed while waiting for {recipient} to register");
        }
        Ok(())
    }
}

/// Result of a completed handshake.
#[derive(Debug)]
pub struct Handshake {
    pub keypair: Keypair,
    pub token: String,
    pub recipient_key: [u8; PUBLIC_KEY_LEN],
}

/// Look up `recipient`, prompting and retrying for as long as it is not
/// registered. Any other failure is returned immediately.
pub async fn resolve_recipient(
    api: &DirectoryClient,
    token: &str,
    recipient: &str,
    prompt: &mut dyn RecipientPrompt,
) -> anyhow::Result<[u8; PUBLIC_KEY_LEN]> {
    loop {
        match api.fetch_public_key(token, recipient).await {
            Ok(key) => return Ok(key),
            Err(ClientError::NotFound(_)) => {
                debug!(recipient, "Recipient not registered, prompting");
                prompt.wait_for_registration(recipient).await?;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to look up {recipient}"));
            }
        }
    }
}

pub async fn perform(
    config: &ClientConfig,
    api: &DirectoryClient,
    prompt: &mut dyn RecipientPrompt,
) -> anyhow::Result<Handshake> {
    let keypair = generate_keypair().context("failed to generate keypair")?;

    let token = api
        .login(&config.from, keypair.public_key())
        .await
        .with_context(|| format!("failed to log in to {}", api.base_url()))?;
    info!(user = %config.from, "Logged in");

    let recipient_key = resolve_recipient(api, &token, &config.to, prompt).await?;
    info!(recipient = %config.to, "Found recipient public key");

    Ok(Handshake {
        keypair,
        token,
        recipient_key,
    })
}
