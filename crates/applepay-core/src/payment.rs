//! # Payment Payloads
//!
//! Contact, payment method and token payloads delivered to the page.
//! The polyfill never fabricates these; they come from a
//! [`PaymentDataFactory`](crate::hooks::PaymentDataFactory).

use serde::{Deserialize, Serialize};

/// A billing or shipping contact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address_lines: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_locality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_area: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_administrative_area: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl PaymentContact {
    /// Create a contact with a given and family name
    pub fn named(given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            given_name: Some(given_name.into()),
            family_name: Some(family_name.into()),
            ..Self::default()
        }
    }

    /// Builder: set email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email_address = Some(email.into());
        self
    }

    /// Builder: set phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    /// Builder: set postal address
    pub fn with_address(
        mut self,
        lines: &[&str],
        locality: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        self.address_lines = lines.iter().map(|l| l.to_string()).collect();
        self.locality = Some(locality.into());
        self.postal_code = Some(postal_code.into());
        self.country_code = Some(country_code.into());
        self
    }
}

/// Card type behind a payment method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodType {
    Debit,
    Credit,
    Prepaid,
    Store,
}

/// The card the user picked
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PaymentMethodType>,
}

impl PaymentMethod {
    pub fn new(
        display_name: impl Into<String>,
        network: impl Into<String>,
        kind: PaymentMethodType,
    ) -> Self {
        Self {
            display_name: Some(display_name.into()),
            network: Some(network.into()),
            kind: Some(kind),
        }
    }
}

/// Encrypted payment token (opaque to the polyfill)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentToken {
    /// Opaque payment data, normally an encrypted blob
    #[serde(default)]
    pub payment_data: serde_json::Value,

    #[serde(default)]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub transaction_identifier: String,
}

impl PaymentToken {
    pub fn new(transaction_identifier: impl Into<String>, payment_method: PaymentMethod) -> Self {
        Self {
            payment_data: serde_json::Value::Null,
            payment_method,
            transaction_identifier: transaction_identifier.into(),
        }
    }

    /// Builder: attach payment data
    pub fn with_payment_data(mut self, data: serde_json::Value) -> Self {
        self.payment_data = data;
        self
    }
}

/// The authorized payment delivered to `onpaymentauthorized`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub token: PaymentToken,
    pub billing_contact: PaymentContact,
    pub shipping_contact: PaymentContact,
}
