//! # Integrator Hooks
//!
//! Extension points the host fills in:
//!
//! - [`PaymentDataFactory`] builds the contact and token payloads the
//!   session hands to the page. The defaults refuse to fabricate payment
//!   data and fail with [`PolyfillError::FactoryNotConfigured`].
//! - [`AbandonmentNotifier`] is told when a page lets a stage time out.
//!   The browser bindings show an alert; the default just logs.

use crate::error::{PolyfillError, PolyfillResult};
use crate::payment::{PaymentContact, PaymentToken};
use crate::request::PaymentRequest;
use crate::session::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

/// Text of the notice shown when a page never finishes a stage
pub const ABANDONMENT_MESSAGE: &str =
    "Apple Pay Not Finished - The site was not able to complete the payment. Please, try again.";

/// Session details passed to every factory hook
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookContext<'a> {
    pub session_id: Uuid,
    pub version: u32,
    pub request: &'a PaymentRequest,
}

/// Produces payment payloads on behalf of the simulated user.
///
/// Implement only the hooks your flow needs; the others keep failing loudly.
#[allow(unused_variables)]
pub trait PaymentDataFactory {
    /// Called when building `onpaymentauthorized`
    fn create_billing_contact(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        Err(PolyfillError::FactoryNotConfigured {
            hook: "createBillingContact",
        })
    }

    /// Called when building `onshippingcontactselected` and `onpaymentauthorized`
    fn create_shipping_contact(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        Err(PolyfillError::FactoryNotConfigured {
            hook: "createShippingContact",
        })
    }

    /// Called when building `onpaymentauthorized`
    fn create_payment_token(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentToken> {
        Err(PolyfillError::FactoryNotConfigured {
            hook: "createPaymentToken",
        })
    }
}

/// Factory with no hooks configured
pub struct UnconfiguredFactory;

impl PaymentDataFactory for UnconfiguredFactory {}

/// Factory serving fixed payloads, e.g. loaded from a fixtures file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureFactory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_contact: Option<PaymentContact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_contact: Option<PaymentContact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_token: Option<PaymentToken>,
}

impl FixtureFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: billing contact fixture
    pub fn with_billing_contact(mut self, contact: PaymentContact) -> Self {
        self.billing_contact = Some(contact);
        self
    }

    /// Builder: shipping contact fixture
    pub fn with_shipping_contact(mut self, contact: PaymentContact) -> Self {
        self.shipping_contact = Some(contact);
        self
    }

    /// Builder: payment token fixture
    pub fn with_payment_token(mut self, token: PaymentToken) -> Self {
        self.payment_token = Some(token);
        self
    }
}

impl PaymentDataFactory for FixtureFactory {
    fn create_billing_contact(&self, _ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        self.billing_contact
            .clone()
            .ok_or(PolyfillError::FactoryNotConfigured {
                hook: "createBillingContact",
            })
    }

    fn create_shipping_contact(&self, _ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        self.shipping_contact
            .clone()
            .ok_or(PolyfillError::FactoryNotConfigured {
                hook: "createShippingContact",
            })
    }

    fn create_payment_token(&self, _ctx: &HookContext<'_>) -> PolyfillResult<PaymentToken> {
        self.payment_token
            .clone()
            .ok_or(PolyfillError::FactoryNotConfigured {
                hook: "createPaymentToken",
            })
    }
}

/// What the notifier learns about an abandoned session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonmentNotice {
    pub session_id: Uuid,
    /// Stage the page failed to complete
    pub stage: Stage,
    /// Timeout that elapsed
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
    /// Whether the active-session guard was released
    pub released: bool,
    pub message: &'static str,
    pub at: DateTime<Utc>,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Receives timeout abandonment notices
pub trait AbandonmentNotifier {
    fn session_abandoned(&self, notice: &AbandonmentNotice) {
        warn!(
            session_id = %notice.session_id,
            stage = %notice.stage,
            timeout_ms = notice.timeout.as_millis() as u64,
            "{}",
            notice.message
        );
    }
}

/// Default notifier (just logs the notice)
pub struct LoggingNotifier;

impl AbandonmentNotifier for LoggingNotifier {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{PaymentMethod, PaymentMethodType};

    fn context(request: &PaymentRequest) -> HookContext<'_> {
        HookContext {
            session_id: Uuid::new_v4(),
            version: 3,
            request,
        }
    }

    #[test]
    fn test_unconfigured_factory_fails_loudly() {
        let request = PaymentRequest::new("US", "USD");
        let ctx = context(&request);

        let err = UnconfiguredFactory.create_payment_token(&ctx).unwrap_err();
        assert_eq!(
            err,
            PolyfillError::FactoryNotConfigured {
                hook: "createPaymentToken"
            }
        );
        assert!(UnconfiguredFactory.create_billing_contact(&ctx).is_err());
        assert!(UnconfiguredFactory.create_shipping_contact(&ctx).is_err());
    }

    #[test]
    fn test_fixture_factory() {
        let request = PaymentRequest::new("US", "USD");
        let ctx = context(&request);
        let factory = FixtureFactory::new()
            .with_shipping_contact(PaymentContact::named("Jane", "Doe"))
            .with_payment_token(PaymentToken::new(
                "txn_1",
                PaymentMethod::new("Visa 0001", "Visa", PaymentMethodType::Credit),
            ));

        assert_eq!(
            factory.create_shipping_contact(&ctx).unwrap().given_name.as_deref(),
            Some("Jane")
        );
        assert_eq!(
            factory.create_payment_token(&ctx).unwrap().transaction_identifier,
            "txn_1"
        );
        assert_eq!(
            factory.create_billing_contact(&ctx).unwrap_err().code(),
            "factory_not_configured"
        );
    }

    #[test]
    fn test_fixture_factory_from_json() {
        let factory: FixtureFactory = serde_json::from_str(
            r#"{
                "billingContact": { "givenName": "John", "postalCode": "95014" },
                "paymentToken": { "transactionIdentifier": "abc", "paymentMethod": { "network": "Visa" } }
            }"#,
        )
        .unwrap();

        assert_eq!(
            factory.billing_contact.unwrap().postal_code.as_deref(),
            Some("95014")
        );
        assert!(factory.shipping_contact.is_none());
        assert_eq!(factory.payment_token.unwrap().transaction_identifier, "abc");
    }
}
