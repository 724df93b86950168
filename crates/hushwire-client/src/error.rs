use thiserror::Error;

/// Failures talking to the relay.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unable to parse response from the relay: {0}")]
    Decode(String),
    #[error("user {0} has not registered yet")]
    NotFound(String),
    #[error("unable to open persistent connection: {0}")]
    Connect(String),
}
