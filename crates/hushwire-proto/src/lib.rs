#![forbid(unsafe_code)]
//! Wire format shared by the hushwire relay and its clients.
//!
//! Everything on the wire is JSON. HTTP bodies use the request/response
//! structs in [`models`]; the persistent stream carries [`Envelope`] frames.

pub mod constants;
pub mod models;
pub mod validation;

#[cfg(test)]
mod proptests;

pub use models::{
    ChannelRequest, ChannelResponse, Envelope, LoginRequest, LoginResponse, NONCE_LEN,
    PUBLIC_KEY_LEN,
};
pub use validation::ValidationError;
