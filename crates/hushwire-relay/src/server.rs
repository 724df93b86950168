use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::ServerConfig;
use crate::token::TokenIssuer;

/// A bound relay with its dispatcher running.
pub struct RelayServer {
    listener: TcpListener,
    state: AppState,
    dispatcher: JoinHandle<()>,
}

impl RelayServer {
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let tokens = match &config.token_secret {
            Some(secret) => TokenIssuer::new(secret.as_bytes()),
            None => {
                warn!("No token_secret configured, using a random secret; tokens will not survive a restart");
                TokenIssuer::with_random_secret()
            }
        };

        let (state, router) = AppState::new(tokens).context("failed to register metrics")?;
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        let dispatcher = router.spawn();

        Ok(Self {
            listener,
            state,
            dispatcher,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until the listener fails. There is no drain on shutdown:
    /// dropping the returned future drops every connection with it.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("hushwire-relay listening on {}", self.local_addr()?);

        let app = create_router(self.state);
        let served = axum::serve(self.listener, app).await;
        self.dispatcher.abort();
        served.context("relay server failed")
    }
}
