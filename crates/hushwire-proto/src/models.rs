//! Request, response and stream frame shapes.

use serde::{Deserialize, Serialize};

/// Length of a long-term Curve25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of the per-message box nonce.
pub const NONCE_LEN: usize = 24;

/// One relayed unit on the persistent stream.
///
/// `body` is the sealed ciphertext and is opaque to the relay. Missing
/// fields decode to their empty values so that the relay's validation,
/// not the decoder, decides what is acceptable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "senderId", default)]
    pub sender_id: String,
    // The misspelling is the established wire name.
    #[serde(rename = "recepientId", default)]
    pub recipient_id: String,
    #[serde(with = "b64", default)]
    pub body: Vec<u8>,
    #[serde(rename = "timeStamp", default)]
    pub timestamp: String,
    #[serde(rename = "msgNonce", default)]
    pub nonce: [u8; NONCE_LEN],
}

impl Envelope {
    pub fn new(
        sender_id: impl Into<String>,
        recipient_id: impl Into<String>,
        body: Vec<u8>,
        timestamp: impl Into<String>,
        nonce: [u8; NONCE_LEN],
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            recipient_id: recipient_id.into(),
            body,
            timestamp: timestamp.into(),
            nonce,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// `POST /login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "userName", default)]
    pub user_name: String,
    #[serde(rename = "publicKey", default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<[u8; PUBLIC_KEY_LEN]>,
}

/// `POST /login` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "authToken")]
    pub auth_token: String,
}

/// `POST /secure` body: whose public key the caller wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    #[serde(rename = "userName", default)]
    pub user_name: String,
}

/// `POST /secure` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelResponse {
    #[serde(rename = "publicKey")]
    pub public_key: [u8; PUBLIC_KEY_LEN],
}

/// Standard base64 for byte bodies, matching how JSON encoders
/// commonly render byte slices.
mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
