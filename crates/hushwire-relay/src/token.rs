//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs signed with one server-wide secret. They are
//! readable by anyone holding them but cannot be forged without the secret.

use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, get_current_timestamp, Algorithm, DecodingKey,
    EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hushwire_proto::constants::BEARER_SCHEME;

/// Tokens are valid for 24 hours from issuance and are not renewable.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Length of the secret generated when none is configured.
pub const GENERATED_SECRET_LEN: usize = 32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid authorization header")]
    MalformedHeader,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User identifier the token was issued to.
    pub name: String,
    pub iat: u64,
    pub exp: u64,
}

/// Identity extracted from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub auth_token: String,
    pub user_id: String,
}

/// Issues and verifies tokens with the server-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime: TOKEN_LIFETIME,
        }
    }

    /// Issuer with a fresh random secret. Tokens die with the process.
    pub fn with_random_secret() -> Self {
        let mut secret = [0u8; GENERATED_SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        Self::new(&secret)
    }

    /// Issue a token for `user_id`, expiring [`TOKEN_LIFETIME`] from now.
    pub fn create_token(&self, user_id: &str) -> Result<String, AuthError> {
        self.create_token_at(user_id, get_current_timestamp())
    }

    /// Issue a token as if the current time were `issued_at` (unix seconds).
    pub fn create_token_at(&self, user_id: &str, issued_at: u64) -> Result<String, AuthError> {
        let claims = Claims {
            name: user_id.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.lifetime.as_secs()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    pub fn parse_token(&self, authorization: &str) -> Result<UserProfile, AuthError> {
        let mut fields = authorization.split_whitespace();
        let (scheme, token) = match (fields.next(), fields.next()) {
            (Some(scheme), Some(token)) => (scheme, token),
            _ => return Err(AuthError::MalformedHeader),
        };
        if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
            return Err(AuthError::MalformedHeader);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::BadSignature,
            }
        })?;

        Ok(UserProfile {
            auth_token: token.to_string(),
            user_id: data.claims.name,
        })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hushwire_proto::constants::bearer;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"test-secret")
    }

    #[test]
    fn test_token_round_trip() {
        let issuer = issuer();
        let token = issuer.create_token("alice").unwrap();

        let profile = issuer.parse_token(&bearer(&token)).unwrap();
        assert_eq!(profile.user_id, "alice");
        assert_eq!(profile.auth_token, token);
    }

    #[test]
    fn test_claims_are_readable() {
        let issuer = issuer();
        let token = issuer.create_token_at("alice", 1_000).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        let data = decode::<Claims>(&token, &DecodingKey::from_secret(b""), &validation).unwrap();

        assert_eq!(data.claims.name, "alice");
        assert_eq!(data.claims.iat, 1_000);
        assert_eq!(data.claims.exp, 1_000 + TOKEN_LIFETIME.as_secs());
    }

    #[test]
    fn test_token_valid_before_expiry() {
        let issuer = issuer();
        let almost_a_day_ago = get_current_timestamp() - TOKEN_LIFETIME.as_secs() + 60;
        let token = issuer.create_token_at("alice", almost_a_day_ago).unwrap();
        assert!(issuer.parse_token(&bearer(&token)).is_ok());
    }

    #[test]
    fn test_token_expires() {
        let issuer = issuer();
        let over_a_day_ago = get_current_timestamp() - TOKEN_LIFETIME.as_secs() - 5;
        let token = issuer.create_token_at("alice", over_a_day_ago).unwrap();
        assert_eq!(issuer.parse_token(&bearer(&token)), Err(AuthError::Expired));
    }

    #[test]
    fn test_malformed_headers() {
        let issuer = issuer();
        for header in ["", "sometoken", "   ", "Bearer", "Bearer   "] {
            assert_eq!(
                issuer.parse_token(header),
                Err(AuthError::MalformedHeader),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let issuer = issuer();
        let token = issuer.create_token("alice").unwrap();
        assert_eq!(
            issuer.parse_token(&format!("Basic {token}")),
            Err(AuthError::MalformedHeader)
        );
    }

    #[test]
    fn test_scheme_case_insensitive() {
        let issuer = issuer();
        let token = issuer.create_token("alice").unwrap();
        assert!(issuer.parse_token(&format!("bearer {token}")).is_ok());
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = TokenIssuer::new(b"other-secret").create_token("alice").unwrap();
        assert_eq!(
            issuer().parse_token(&bearer(&token)),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert_eq!(
            issuer().parse_token("Bearer not.a.jwt"),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = Claims {
            name: "alice".into(),
            iat: get_current_timestamp(),
            exp: get_current_timestamp() + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert_eq!(
            issuer().parse_token(&bearer(&token)),
            Err(AuthError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let issuer = issuer();
        let token = issuer.create_token("alice").unwrap();
        let forged = issuer_token_with_name(&token, "mallory");
        assert_eq!(issuer.parse_token(&bearer(&forged)), Err(AuthError::BadSignature));
    }

    // Swap the payload segment for one naming someone else, keeping the signature.
    fn issuer_token_with_name(token: &str, name: &str) -> String {
        let other = TokenIssuer::new(b"unrelated").create_token(name).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        format!("{}.{}.{}", parts[0], other_parts[1], parts[2])
    }

    #[test]
    fn test_random_secret_issuers_are_independent() {
        let a = TokenIssuer::with_random_secret();
        let b = TokenIssuer::with_random_secret();
        let token = a.create_token("alice").unwrap();
        assert!(a.parse_token(&bearer(&token)).is_ok());
        assert_eq!(b.parse_token(&bearer(&token)), Err(AuthError::BadSignature));
    }
}
