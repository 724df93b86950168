//! The persistent connection: a timed sender and a receiver running side
//! by side until the relay closes the stream.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use hushwire_crypto::{CryptoError, Keypair};
use hushwire_proto::constants::bearer;
use hushwire_proto::{Envelope, PUBLIC_KEY_LEN};

use crate::api::DirectoryClient;
use crate::config::ClientConfig;
use crate::error::ClientError;

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the persistent stream, authenticated with `token`.
///
/// A relay answering the upgrade with anything but 101 leaves no stream to
/// use; its status is logged and returned as [`ClientError::Connect`].
pub async fn connect(url: &str, token: &str) -> Result<Socket, ClientError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ClientError::Connect(e.to_string()))?;
    let value =
        HeaderValue::from_str(&bearer(token)).map_err(|e| ClientError::Connect(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);

    info!("connecting to {url}");
    match connect_async(request).await {
        Ok((socket, _)) => Ok(socket),
        Err(WsError::Http(response)) => {
            warn!(status = %response.status(), "server responded with unexpected status");
            Err(ClientError::Connect(format!(
                "relay answered upgrade with {}",
                response.status()
            )))
        }
        Err(e) => Err(ClientError::Connect(e.to_string())),
    }
}

/// Build one sealed envelope for `to`.
pub fn seal_envelope(
    keypair: &Keypair,
    from: &str,
    to: &str,
    recipient_key: &[u8; PUBLIC_KEY_LEN],
    plaintext: &[u8],
) -> Result<Envelope, CryptoError> {
    let sealed = keypair.seal_for(recipient_key, plaintext)?;
    Ok(Envelope::new(
        from,
        to,
        sealed.ciphertext,
        chrono::Utc::now().to_rfc3339(),
        sealed.nonce,
    ))
}

/// What became of one inbound envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Message { sender: String, text: String },
    Undecryptable { sender: String },
}

impl fmt::Display for Received {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Received::Message { sender, text } => write!(f, "{sender}: {text}"),
            Received::Undecryptable { sender } => {
                write!(f, "unable to decrypt message from {sender}")
            }
        }
    }
}

/// Opens inbound envelopes, looking up and caching sender keys.
pub struct Inbox {
    keypair: Arc<Keypair>,
    keys: HashMap<String, [u8; PUBLIC_KEY_LEN]>,
    api: DirectoryClient,
    token: String,
}

impl Inbox {
    pub fn new(keypair: Arc<Keypair>, api: DirectoryClient, token: String) -> Self {
        Self {
            keypair,
            keys: HashMap::new(),
            api,
            token,
        }
    }

    /// Seed the cache with a key already known, such as the recipient's.
    pub fn remember(&mut self, user: &str, key: [u8; PUBLIC_KEY_LEN]) {
        self.keys.insert(user.to_string(), key);
    }

    async fn lookup(&mut self, sender: &str) -> Option<[u8; PUBLIC_KEY_LEN]> {
        match self.api.fetch_public_key(&self.token, sender).await {
            Ok(key) => {
                self.keys.insert(sender.to_string(), key);
                Some(key)
            }
            Err(e) => {
                warn!(sender, error = %e, "Unable to look up sender key");
                None
            }
        }
    }

    pub async fn open(&mut self, envelope: &Envelope) -> Received {
        let sender = envelope.sender_id.clone();
        let cached = self.keys.get(&sender).copied();
        let key = match cached {
            Some(key) => Some(key),
            None => self.lookup(&sender).await,
        };

        if let Some(key) = key {
            if let Ok(text) = self.try_open(&key, envelope) {
                return Received::Message { sender, text };
            }
        }

        // The sender may have logged in again with a fresh keypair.
        if let Some(stale) = cached {
            if let Some(fresh) = self.lookup(&sender).await {
                if fresh != stale {
                    debug!(sender = %sender, "Sender key changed, retrying");
                    if let Ok(text) = self.try_open(&fresh, envelope) {
                        return Received::Message { sender, text };
                    }
                }
            }
        }

        Received::Undecryptable { sender }
    }

    fn try_open(&self, key: &[u8; PUBLIC_KEY_LEN], envelope: &Envelope) -> Result<String, CryptoError> {
        let plaintext = self
            .keypair
            .open_from(key, &envelope.body, &envelope.nonce)?;
        Ok(String::from_utf8_lossy(&plaintext).into_owned())
    }
}

pub struct Session {
    config: ClientConfig,
    keypair: Arc<Keypair>,
    recipient_key: [u8; PUBLIC_KEY_LEN],
    inbox: Inbox,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        keypair: Keypair,
        recipient_key: [u8; PUBLIC_KEY_LEN],
        api: DirectoryClient,
        token: String,
    ) -> Self {
        let keypair = Arc::new(keypair);
        let mut inbox = Inbox::new(Arc::clone(&keypair), api, token);
        inbox.remember(&config.to, recipient_key);
        Self {
            config,
            keypair,
            recipient_key,
            inbox,
        }
    }

    /// Run until the relay closes the stream or a read fails.
    pub async fn run(self, socket: Socket) -> anyhow::Result<()> {
        let (sink, stream) = socket.split();

        let sender = if self.config.listen_only {
            info!("Listen-only mode, not sending");
            None
        } else {
            Some(tokio::spawn(send_loop(
                sink,
                Arc::clone(&self.keypair),
                self.config.clone(),
                self.recipient_key,
            )))
        };

        receive_loop(stream, self.inbox).await;

        if let Some(sender) = sender {
            sender.abort();
        }
        Ok(())
    }
}

async fn send_loop(
    mut sink: SplitSink<Socket, Message>,
    keypair: Arc<Keypair>,
    config: ClientConfig,
    recipient_key: [u8; PUBLIC_KEY_LEN],
) {
    let mut ticker = tokio::time::interval(config.interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let envelope = match seal_envelope(
            &keypair,
            &config.from,
            &config.to,
            &recipient_key,
            config.body.as_bytes(),
        ) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Unable to seal message");
                continue;
            }
        };
        let text = match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Unable to encode message");
                continue;
            }
        };

        match sink.send(Message::Text(text)).await {
            Ok(()) => info!(to = %config.to, len = envelope.body.len(), "Sent message"),
            Err(e) => warn!(error = %e, "Unable to send message"),
        }
    }
}

async fn receive_loop(mut stream: SplitStream<Socket>, mut inbox: Inbox) {
    while let Some(frame) = stream.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                info!("read: {e}");
                return;
            }
        };

        let envelope = match message {
            Message::Text(text) => Envelope::from_json(&text),
            Message::Binary(bytes) => Envelope::from_slice(&bytes),
            Message::Close(frame) => {
                info!(?frame, "Relay closed the connection");
                return;
            }
            _ => continue,
        };

        match envelope {
            Ok(envelope) => println!("{}", inbox.open(&envelope).await),
            Err(e) => warn!(error = %e, "Discarding undecodable frame"),
        }
    }
    info!("Connection closed");
}
