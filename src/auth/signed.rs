//! Self-contained HS256 tokens. Nothing is stored server-side, so a token
//! stays valid until its embedded expiry even after a password change.

use anyhow::{Context, Result};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: i64,
    username: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct SignedTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl SignedTokens {
    pub fn new(secret: &str, ttl: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, admin_id: i64, username: &str) -> Result<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            id: admin_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding).context("Failed to sign token")
    }

    /// Admin id carried by a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<i64> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(data.claims.id),
            Err(e) => {
                tracing::debug!("Rejected signed token: {}", e);
                None
            }
        }
    }
}
