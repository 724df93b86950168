//! HTTP calls against the relay's login and key directory endpoints.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use hushwire_proto::constants::{bearer, HTTP_APPLICATION_JSON, LOGIN_PATH, SECURE_PATH};
use hushwire_proto::{ChannelRequest, ChannelResponse, LoginRequest, LoginResponse, PUBLIC_KEY_LEN};

use crate::error::ClientError;

#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base_url: String,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Publish `public_key` under `user` and obtain a bearer token.
    pub async fn login(
        &self,
        user: &str,
        public_key: [u8; PUBLIC_KEY_LEN],
    ) -> Result<String, ClientError> {
        let request = LoginRequest {
            user_name: user.to_string(),
            public_key: Some(public_key),
        };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, LOGIN_PATH))
            .header(reqwest::header::CONTENT_TYPE, HTTP_APPLICATION_JSON)
            .body(serde_json::to_vec(&request).map_err(|e| ClientError::Decode(e.to_string()))?)
            .send()
            .await?;

        let login: LoginResponse = decode(response).await?;
        debug!(user, "Logged in");
        Ok(login.auth_token)
    }

    /// Look up `user`'s public key. [`ClientError::NotFound`] when the user
    /// has not logged in yet.
    pub async fn fetch_public_key(
        &self,
        token: &str,
        user: &str,
    ) -> Result<[u8; PUBLIC_KEY_LEN], ClientError> {
        let request = ChannelRequest {
            user_name: user.to_string(),
        };
        let response = self
            .http
            .post(format!("{}{}", self.base_url, SECURE_PATH))
            .header(reqwest::header::AUTHORIZATION, bearer(token))
            .header(reqwest::header::CONTENT_TYPE, HTTP_APPLICATION_JSON)
            .body(serde_json::to_vec(&request).map_err(|e| ClientError::Decode(e.to_string()))?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(user.to_string()));
        }
        let channel: ChannelResponse = decode(response).await?;
        Ok(channel.public_key)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}
