//! hushwire-relay: ciphertext-only message relay.
//!
//! Clients log in with a public key and get a bearer token, look up each
//! other's keys, and exchange sealed envelopes over a persistent stream.
//! The relay routes envelopes by recipient id and never sees plaintext.

pub mod api;
pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod router;
pub mod server;
pub mod token;

#[cfg(test)]
mod proptests;

pub use api::AppState;
pub use config::{ConfigError, ServerConfig};
pub use directory::{DirectoryError, KeyDirectory};
pub use error::TransportError;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use router::{MessageRouter, RouterHandle};
pub use server::RelayServer;
pub use token::{AuthError, TokenIssuer, UserProfile};
