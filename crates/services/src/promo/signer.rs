use std::fmt;

use promokit_config::Settings;
use sha2::{Digest, Sha256};
use tracing::warn;

use super::error::PromoError;

/// Fallback secret for non-production environments only.
pub const DEV_INTEGRITY_SECRET: &str = "promokit-development-only-integrity-secret";

fn digest(code: &str, secret: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(code.as_bytes());
    hasher.finalize().into()
}

/// Hex SHA-256 over `secret:code`.
pub fn sign(code: &str, secret: &str) -> String {
    hex::encode(digest(code, secret))
}

/// Recomputes the tag and compares it in constant time. Malformed tags
/// are simply not valid.
pub fn verify(code: &str, tag: &str, secret: &str) -> bool {
    let Ok(provided) = hex::decode(tag) else {
        return false;
    };
    let expected = digest(code, secret);
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Holds the process-wide integrity secret.
#[derive(Clone)]
pub struct IntegritySigner {
    secret: String,
}

impl IntegritySigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Resolves the secret from `promo.integrity_secret`. A missing secret
    /// is fatal in production; elsewhere the development default is used.
    pub fn from_settings(settings: &Settings) -> Result<Self, PromoError> {
        match settings
            .promo
            .integrity_secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            Some(secret) => Ok(Self::new(secret)),
            None if settings.app.is_production() => Err(PromoError::MissingSecret),
            None => {
                warn!(
                    environment = %settings.app.environment,
                    "promo.integrity_secret not set, using the development-only secret"
                );
                Ok(Self::new(DEV_INTEGRITY_SECRET))
            }
        }
    }

    pub fn sign(&self, code: &str) -> String {
        sign(code, &self.secret)
    }

    pub fn verify(&self, code: &str, tag: &str) -> bool {
        verify(code, tag, &self.secret)
    }
}

impl fmt::Debug for IntegritySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegritySigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}
