//! Bearer tokens: HMAC-SHA256 signed JSON claims encoded as
//! `<base64url-claims>.<base64url-signature>`.

use crate::error::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use binthere_core::config::AuthConfig;
use binthere_core::types::User;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Identity carried by a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub iat: DateTime<Utc>,
    pub exp: DateTime<Utc>,
}

impl Claims {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.exp
    }
}

/// Issues and verifies bearer tokens with a shared secret.
pub struct TokenIssuer {
    key: Vec<u8>,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.token_secret, Duration::hours(config.token_ttl_hours))
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        let now = Utc::now();
        self.sign(&Claims {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            iat: now,
            exp: now + self.ttl,
        })
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        let payload = serde_json::to_vec(claims)?;
        let signature = self.mac(&payload).finalize().into_bytes();
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Parse a token, check its signature, then its expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let (payload_b64, sig_b64) = token
            .trim()
            .split_once('.')
            .ok_or(TokenError::InvalidFormat)?;

        let payload = URL_SAFE_NO_PAD.decode(payload_b64)?;
        let signature = URL_SAFE_NO_PAD.decode(sig_b64)?;

        self.mac(&payload)
            .verify_slice(&signature)
            .map_err(|_| TokenError::SignatureInvalid)?;

        let claims: Claims = serde_json::from_slice(&payload)?;
        if claims.is_expired() {
            return Err(TokenError::Expired(claims.exp));
        }
        Ok(claims)
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(payload);
        mac
    }
}
