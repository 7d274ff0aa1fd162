use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,   // user ID
    pub iat: i64,    // issued at (unix timestamp)
    pub exp: i64,    // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Why a bearer token was refused. Logged, never sent to the client.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenFailure {
    #[error("token expired")]
    Expired,
    #[error("signature mismatch")]
    BadSignature,
    #[error("issuer or audience mismatch")]
    WrongAudience,
    #[error("malformed token")]
    Malformed,
    #[error("subject does not exist")]
    UnknownSubject,
}

/// Signing and verification keys, built once from config at startup.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::minutes(cfg.ttl_minutes),
        }
    }

    /// Sign a token for `user_id` that expires `ttl` from now.
    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: (now + ttl).unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    pub fn issue_default(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue(user_id, self.ttl)
    }

    /// Check signature, issuer, audience and expiry and return the subject.
    /// Whether the subject still exists is the caller's concern.
    pub fn validate(&self, token: &str) -> Result<Uuid, TokenFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenFailure::Expired,
                ErrorKind::InvalidSignature => TokenFailure::BadSignature,
                ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
                    TokenFailure::WrongAudience
                }
                _ => TokenFailure::Malformed,
            }
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims.sub)
    }
}
