//! Session token issuance and verification.
//!
//! Tokens are HS512-signed JWTs carrying the full `TokenClaims` set; they
//! are stateless and self-contained, so there is no server-side revocation
//! and an issued token stays valid until its expiry.

use chrono::Utc;
use contracts::system::auth::TokenClaims;
use contracts::system::users::User;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::error::BookingError;
use crate::shared::config::AuthConfig;

pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenService {
    /// Keys are derived from the secret once, here, and are read-only for
    /// the life of the process.
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // No grace window; `verify` additionally rejects `exp == now`.
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        }
    }

    /// Build a token service from configuration. A missing secret is an
    /// error here so that startup fails instead of minting unverifiable
    /// tokens later.
    pub fn from_config(config: &AuthConfig) -> anyhow::Result<Self> {
        let secret = config.resolve_secret()?;
        Ok(Self::new(&secret, config.token_ttl_secs))
    }

    /// Issue a signed token for the user with `exp = iat + TTL`.
    pub fn issue(&self, user: &User) -> Result<String, BookingError> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: user.username.clone(),
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now as usize,
            exp: (now + self.ttl_secs) as usize,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &self.encoding)
            .map_err(|e| BookingError::Internal(anyhow::anyhow!("token encoding failed: {e}")))
    }

    /// Verify signature and expiry; a token is invalid from the instant
    /// `exp` is reached. Every failure mode (malformed input, bad
    /// signature, expired claims) collapses to `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, BookingError> {
        let claims = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| BookingError::InvalidToken)?;

        // The library accepts exp == now even with zero leeway.
        if claims.exp <= Utc::now().timestamp() as usize {
            return Err(BookingError::InvalidToken);
        }
        Ok(claims)
    }

    /// Convenience projection of `verify` to the subject (username).
    pub fn subject(&self, token: &str) -> Result<String, BookingError> {
        self.verify(token).map(|claims| claims.sub)
    }
}
