//! # Policy Configuration
//!
//! The knobs a test harness turns on the simulated device: whether payments
//! are available, which merchant is recognised, which protocol versions
//! exist, where merchant validation points to and how long each stage may
//! wait. Loaded from TOML or built in code.

use crate::error::{PolyfillError, PolyfillResult};
use crate::tables::LATEST_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Apple's certification gateway for merchant validation
pub const DEFAULT_VALIDATION_URL: &str =
    "https://apple-pay-gateway-cert.apple.com/paymentservices/startSession";

/// Default wait for both stage timeouts
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Simulated device and merchant configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Whether the device can make payments at all
    pub payments_enabled: bool,

    /// Whether the user has set up a card
    pub is_set_up: bool,

    /// Merchant identifier recognised by the active-card queries
    pub merchant_identifier: String,

    /// Protocol versions the simulated device supports
    pub supported_versions: BTreeSet<u32>,

    /// URL delivered to `onvalidatemerchant`
    pub validation_url: String,

    /// How long the page has to complete shipping contact selection
    pub shipping_contact_timeout_ms: u64,

    /// How long the page has to complete the payment
    pub authorization_timeout_ms: u64,

    /// Whether a timeout releases the active-session guard
    pub release_on_timeout: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            payments_enabled: true,
            is_set_up: true,
            merchant_identifier: String::new(),
            supported_versions: (1..=LATEST_VERSION).collect(),
            validation_url: DEFAULT_VALIDATION_URL.to_string(),
            shipping_contact_timeout_ms: DEFAULT_TIMEOUT_MS,
            authorization_timeout_ms: DEFAULT_TIMEOUT_MS,
            release_on_timeout: true,
        }
    }
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> PolyfillResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations no session could run under
    pub fn validate(&self) -> PolyfillResult<()> {
        if self.supported_versions.is_empty() {
            return Err(PolyfillError::Configuration(
                "supported_versions must not be empty".to_string(),
            ));
        }
        if self.supported_versions.contains(&0) {
            return Err(PolyfillError::Configuration(
                "protocol versions start at 1".to_string(),
            ));
        }
        if self.validation_url.is_empty() {
            return Err(PolyfillError::Configuration(
                "validation_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn shipping_contact_timeout(&self) -> Duration {
        Duration::from_millis(self.shipping_contact_timeout_ms)
    }

    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }

    pub fn supports_version(&self, version: u32) -> bool {
        self.supported_versions.contains(&version)
    }

    /// Builder: set merchant identifier
    pub fn with_merchant_identifier(mut self, id: impl Into<String>) -> Self {
        self.merchant_identifier = id.into();
        self
    }

    /// Builder: set validation URL
    pub fn with_validation_url(mut self, url: impl Into<String>) -> Self {
        self.validation_url = url.into();
        self
    }

    /// Builder: replace the supported versions
    pub fn with_supported_versions(mut self, versions: impl IntoIterator<Item = u32>) -> Self {
        self.supported_versions = versions.into_iter().collect();
        self
    }

    /// Builder: enable or disable payments
    pub fn with_payments_enabled(mut self, enabled: bool) -> Self {
        self.payments_enabled = enabled;
        self
    }

    /// Builder: set simulated setup status
    pub fn with_setup_status(mut self, is_set_up: bool) -> Self {
        self.is_set_up = is_set_up;
        self
    }

    /// Builder: set shipping contact timeout
    pub fn with_shipping_contact_timeout(mut self, timeout: Duration) -> Self {
        self.shipping_contact_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder: set authorization timeout
    pub fn with_authorization_timeout(mut self, timeout: Duration) -> Self {
        self.authorization_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder: choose whether a timeout releases the guard
    pub fn with_release_on_timeout(mut self, release: bool) -> Self {
        self.release_on_timeout = release;
        self
    }
}
