//! Client authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::error::ValidationError;

/// Client authentication configuration.
///
/// Every client-facing route is guarded by a static bearer secret; the
/// webhook route is excluded because Stripe authenticates deliveries with
/// its own signature.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared bearer secret clients must present in `Authorization`
    pub api_secret: SecretString,
}

impl AuthConfig {
    /// Compare a presented token against the configured secret
    ///
    /// Constant-time over the compared bytes, like the webhook signature
    /// check.
    pub fn token_matches(&self, token: &str) -> bool {
        self.api_secret
            .expose_secret()
            .as_bytes()
            .ct_eq(token.as_bytes())
            .into()
    }

    /// Validate authentication configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingApiSecret);
        }
        Ok(())
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}
