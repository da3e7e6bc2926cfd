//! Admin token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying `role = "admin"`. There is a single admin
//! account whose credentials come from configuration.

use catalog_core::AppConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const ADMIN_ROLE: &str = "admin";

const DEV_SECRET_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token generation failed: {0}")]
    Generation(String),
    #[error("token configuration error: {0}")]
    Config(String),
}

/// Issues and verifies admin bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl_minutes", &self.ttl.num_minutes())
            .finish_non_exhaustive()
    }
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &[u8], ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::try_minutes(ttl_minutes).unwrap_or(Duration::MAX),
        }
    }

    /// Builds the service from configuration. Without a configured secret a
    /// random one is generated, which is only allowed in development; tokens
    /// then stop verifying after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] when no secret is configured outside
    /// development.
    pub fn from_config(config: &AppConfig) -> Result<Self, TokenError> {
        let secret = match config.jwt_secret {
            Some(ref secret) => secret.clone(),
            None if config.is_development() => {
                tracing::warn!("CATALOG_JWT_SECRET not set; using a random development secret");
                Alphanumeric.sample_string(&mut rand::rng(), DEV_SECRET_LEN)
            }
            None => {
                return Err(TokenError::Config(
                    "CATALOG_JWT_SECRET is required outside development".to_string(),
                ))
            }
        };
        Ok(Self::new(secret.as_bytes(), config.token_ttl_minutes))
    }

    /// Issue an admin token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Generation`] if the expiry is out of range or signing fails.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Generation("token expiry out of range".to_string()))?;
        let claims = Claims {
            sub: subject.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Verify signature, expiry and role.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] or [`TokenError::Invalid`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;

        if data.claims.role != ADMIN_ROLE {
            return Err(TokenError::Invalid("missing admin role".to_string()));
        }
        Ok(data.claims)
    }
}

/// The configured admin login, kept only as SHA-256 digests.
#[derive(Clone)]
pub struct AdminCredentials {
    email: String,
    email_digest: [u8; 32],
    password_digest: [u8; 32],
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl AdminCredentials {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        let email = email.trim().to_lowercase();
        Self {
            email_digest: digest(&email),
            email,
            password_digest: digest(password),
        }
    }

    /// `None` unless both `CATALOG_ADMIN_EMAIL` and `CATALOG_ADMIN_PASSWORD` are set.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        match (&config.admin_email, &config.admin_password) {
            (Some(email), Some(password)) => Some(Self::new(email, password)),
            _ => None,
        }
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Constant-time comparison of both fields. The email is compared
    /// case-insensitively.
    #[must_use]
    pub fn verify(&self, email: &str, password: &str) -> bool {
        let email_ok = self
            .email_digest
            .as_slice()
            .ct_eq(digest(&email.trim().to_lowercase()).as_slice());
        let password_ok = self
            .password_digest
            .as_slice()
            .ct_eq(digest(password).as_slice());
        bool::from(email_ok & password_ok)
    }
}
