//! # Scenarios
//!
//! A scenario is a TOML script: the request to construct a session with,
//! the payloads the simulated user supplies, and the page's actions in order.
//!
//! ```toml
//! name = "guest checkout"
//! version = 3
//! shipping_contact_handler = true
//!
//! [request]
//! countryCode = "US"
//! currencyCode = "USD"
//! supportedNetworks = ["visa"]
//! merchantCapabilities = ["supports3DS"]
//! total = { label = "Lightning Cart", amount = "10.00" }
//!
//! [fixtures.paymentToken]
//! transactionIdentifier = "txn_1"
//! paymentMethod = { network = "Visa", type = "debit" }
//!
//! [[steps]]
//! action = "begin"
//!
//! [[steps]]
//! action = "wait"
//! ms = 31000
//! ```
//!
//! Completion steps are written once; the runner picks the positional or
//! update-object form from the session version.

use anyhow::Context;
use applepay_core::{ApplePayError, FixtureFactory, PaymentRequest, PolicyConfig, LATEST_VERSION};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

fn default_version() -> u32 {
    LATEST_VERSION
}

/// A scripted page interaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    /// Protocol version passed to the constructor
    #[serde(default = "default_version")]
    pub version: u32,

    /// Replaces the environment-derived policy when present
    #[serde(default)]
    pub policy: Option<PolicyConfig>,

    /// Whether the page assigns `onshippingcontactselected`
    #[serde(default)]
    pub shipping_contact_handler: bool,

    pub request: PaymentRequest,

    #[serde(default)]
    pub fixtures: FixtureFactory,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One page action
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Begin,

    CompleteMerchantValidation {
        #[serde(default)]
        merchant_session: Option<Value>,
    },

    /// Versions 1-2 pass `status`. From 3 on, a non-success `status` adds
    /// the matching entry to `errors`, and any error rejects the contact
    CompleteShippingContact {
        #[serde(default)]
        status: Option<u8>,
        #[serde(default)]
        errors: Vec<ApplePayError>,
    },

    CompleteShippingMethod {
        #[serde(default)]
        status: Option<u8>,
    },

    CompletePaymentMethod,

    CompletePayment {
        #[serde(default)]
        status: u8,
    },

    Abort,

    /// Let the clock run
    Wait { ms: u64 },

    /// Construct another session with the same request
    NewSession {
        #[serde(default)]
        version: Option<u32>,
    },
}

impl Step {
    /// Action name as written in the script
    pub fn action(&self) -> &'static str {
        match self {
            Step::Begin => "begin",
            Step::CompleteMerchantValidation { .. } => "complete_merchant_validation",
            Step::CompleteShippingContact { .. } => "complete_shipping_contact",
            Step::CompleteShippingMethod { .. } => "complete_shipping_method",
            Step::CompletePaymentMethod => "complete_payment_method",
            Step::CompletePayment { .. } => "complete_payment",
            Step::Abort => "abort",
            Step::Wait { .. } => "wait",
            Step::NewSession { .. } => "new_session",
        }
    }
}

impl Scenario {
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("Invalid scenario")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read scenario {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("In {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKOUT: &str = r#"
        name = "checkout"
        version = 2
        shipping_contact_handler = true

        [request]
        countryCode = "GB"
        currencyCode = "GBP"
        supportedNetworks = ["visa", "masterCard"]
        merchantCapabilities = ["supports3DS"]
        total = { label = "Just Eat", amount = "12.50" }

        [fixtures.shippingContact]
        givenName = "Jane"

        [[steps]]
        action = "begin"

        [[steps]]
        action = "complete_merchant_validation"

        [[steps]]
        action = "complete_shipping_contact"
        status = 3

        [[steps]]
        action = "wait"
        ms = 500

        [[steps]]
        action = "complete_payment"
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_toml(CHECKOUT).unwrap();

        assert_eq!(scenario.name, "checkout");
        assert_eq!(scenario.version, 2);
        assert!(scenario.shipping_contact_handler);
        assert!(scenario.policy.is_none());
        assert_eq!(scenario.request.supported_networks, vec!["visa", "masterCard"]);
        assert!(scenario.fixtures.shipping_contact.is_some());
        assert_eq!(
            scenario.steps,
            vec![
                Step::Begin,
                Step::CompleteMerchantValidation {
                    merchant_session: None
                },
                Step::CompleteShippingContact {
                    status: Some(3),
                    errors: vec![]
                },
                Step::Wait { ms: 500 },
                Step::CompletePayment { status: 0 },
            ]
        );
    }

    #[test]
    fn test_defaults() {
        let scenario = Scenario::from_toml(
            r#"
            [request]
            countryCode = "US"
            "#,
        )
        .unwrap();

        assert_eq!(scenario.version, LATEST_VERSION);
        assert!(!scenario.shipping_contact_handler);
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_policy_override_and_errors() {
        let scenario = Scenario::from_toml(
            r#"
            [policy]
            authorization_timeout_ms = 100

            [request]

            [[steps]]
            action = "complete_shipping_contact"
            errors = [{ code = "addressUnserviceable", message = "No delivery" }]
            "#,
        )
        .unwrap();

        assert_eq!(scenario.policy.unwrap().authorization_timeout_ms, 100);
        match &scenario.steps[0] {
            Step::CompleteShippingContact { status, errors } => {
                assert!(status.is_none());
                assert_eq!(errors[0].message.as_deref(), Some("No delivery"));
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = Scenario::from_toml(
            r#"
            [request]

            [[steps]]
            action = "refund"
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid scenario"));
    }
}
