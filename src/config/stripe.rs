//! Stripe configuration (production and development environments)
//!
//! The service talks to two fully isolated Stripe accounts: the production
//! one for checkouts originating from the real storefront and a development
//! one for everything else. Each environment carries its own credentials
//! and promotional identifiers; nothing is shared between them.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// One isolated Stripe environment (credentials + promotional identifiers).
#[derive(Clone, Deserialize)]
pub struct StripeEnvConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...)
    pub secret_key: SecretString,

    /// Publishable key handed to the client via GET /get-api-key
    pub publishable_key: String,

    /// Webhook signing secret (whsec_...)
    pub webhook_secret: SecretString,

    /// Promotion code id applied when creating subscriptions (promo_...)
    pub promotion_id: String,

    /// Coupon id attached to checkout sessions
    pub coupon_id: String,
}

impl StripeEnvConfig {
    /// Validate one environment's values
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_SECRET_KEY"));
        }
        if !self.secret_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if self.webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if !self.webhook_secret.expose_secret().starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if !self.publishable_key.starts_with("pk_") {
            return Err(ValidationError::InvalidStripePublishableKey);
        }
        Ok(())
    }
}

impl std::fmt::Debug for StripeEnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeEnvConfig")
            .field("secret_key", &"[REDACTED]")
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &"[REDACTED]")
            .field("promotion_id", &self.promotion_id)
            .field("coupon_id", &self.coupon_id)
            .finish()
    }
}

/// Stripe configuration for both environments.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    /// Hostname whose presence in a request origin selects production
    #[serde(default = "default_production_host")]
    pub production_host: String,

    /// Production environment (live keys)
    pub production: StripeEnvConfig,

    /// Development environment (test keys)
    pub development: StripeEnvConfig,
}

impl StripeConfig {
    /// Validate both environments and the routing host
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.production_host.is_empty() {
            return Err(ValidationError::MissingProductionHost);
        }
        self.production.validate()?;
        self.development.validate()?;
        Ok(())
    }
}

fn default_production_host() -> String {
    "iq-check140.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_config(secret: &str, whsec: &str, publishable: &str) -> StripeEnvConfig {
        StripeEnvConfig {
            secret_key: SecretString::new(secret.to_string()),
            publishable_key: publishable.to_string(),
            webhook_secret: SecretString::new(whsec.to_string()),
            promotion_id: "promo_test".to_string(),
            coupon_id: "COUPON1".to_string(),
        }
    }

    fn valid_env() -> StripeEnvConfig {
        env_config("sk_test_abc", "whsec_xyz", "pk_test_abc")
    }

    #[test]
    fn test_valid_environment_passes() {
        assert!(valid_env().validate().is_ok());
    }

    #[test]
    fn test_validation_missing_secret_key() {
        let env = env_config("", "whsec_xyz", "pk_test_abc");
        assert!(env.validate().is_err());
    }

    #[test]
    fn test_validation_wrong_secret_key_prefix() {
        let env = env_config("pk_test_abc", "whsec_xyz", "pk_test_abc");
        assert!(matches!(
            env.validate(),
            Err(ValidationError::InvalidStripeKey)
        ));
    }

    #[test]
    fn test_validation_wrong_webhook_secret_prefix() {
        let env = env_config("sk_test_abc", "secret_xyz", "pk_test_abc");
        assert!(matches!(
            env.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        ));
    }

    #[test]
    fn test_validation_wrong_publishable_key_prefix() {
        let env = env_config("sk_test_abc", "whsec_xyz", "sk_test_abc");
        assert!(matches!(
            env.validate(),
            Err(ValidationError::InvalidStripePublishableKey)
        ));
    }

    #[test]
    fn test_config_requires_production_host() {
        let config = StripeConfig {
            production_host: String::new(),
            production: valid_env(),
            development: valid_env(),
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingProductionHost)
        ));
    }

    #[test]
    fn test_default_production_host() {
        assert_eq!(default_production_host(), "iq-check140.com");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", valid_env());
        assert!(!rendered.contains("sk_test_abc"));
        assert!(!rendered.contains("whsec_xyz"));
        assert!(rendered.contains("pk_test_abc"));
    }
}
