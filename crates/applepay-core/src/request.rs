//! # Payment Request Types
//!
//! The request a page hands to the `ApplePaySession` constructor.
//!
//! Fields mirror the browser object (camelCase on the wire). Required
//! fields are optional here so that validation, not deserialization,
//! decides which one is missing.

use crate::error::PolyfillResult;
use serde::{Deserialize, Serialize};

/// Whether a line item amount is final or still pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineItemType {
    Final,
    Pending,
}

impl Default for LineItemType {
    fn default() -> Self {
        LineItemType::Final
    }
}

/// A line item or the payment total
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Short description shown on the payment sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Decimal amount, e.g. "10.00"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    /// Final or pending
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LineItemType>,
}

impl LineItem {
    /// Create a final line item
    pub fn new(label: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            amount: Some(amount.into()),
            kind: None,
        }
    }

    /// Builder: mark the amount as pending
    pub fn pending(mut self) -> Self {
        self.kind = Some(LineItemType::Pending);
        self
    }
}

/// A shipping option offered to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethod {
    pub label: String,
    #[serde(default)]
    pub detail: String,
    pub amount: String,
    pub identifier: String,
}

impl ShippingMethod {
    pub fn new(
        identifier: impl Into<String>,
        label: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            detail: String::new(),
            amount: amount.into(),
            identifier: identifier.into(),
        }
    }

    /// Builder: set detail text
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// How the goods reach the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShippingType {
    Shipping,
    Delivery,
    StorePickup,
    ServicePickup,
}

impl Default for ShippingType {
    fn default() -> Self {
        ShippingType::Shipping
    }
}

/// A payment request as supplied by the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Merchant's two-letter country code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,

    /// Three-letter currency code of the total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,

    /// Requested card networks (must be non-empty)
    #[serde(default)]
    pub supported_networks: Vec<String>,

    /// Merchant capabilities (must be non-empty)
    #[serde(default)]
    pub merchant_capabilities: Vec<String>,

    /// Payment total
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<LineItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shipping_methods: Vec<ShippingMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_type: Option<ShippingType>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_billing_contact_fields: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_shipping_contact_fields: Vec<String>,

    /// Opaque merchant data, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_data: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_countries: Vec<String>,
}

impl PaymentRequest {
    /// Create a request for a country and currency
    pub fn new(country_code: impl Into<String>, currency_code: impl Into<String>) -> Self {
        Self {
            country_code: Some(country_code.into()),
            currency_code: Some(currency_code.into()),
            ..Self::default()
        }
    }

    /// Builder: request a card network
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.supported_networks.push(network.into());
        self
    }

    /// Builder: declare a merchant capability
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.merchant_capabilities.push(capability.into());
        self
    }

    /// Builder: set the total
    pub fn with_total(mut self, label: impl Into<String>, amount: impl Into<String>) -> Self {
        self.total = Some(LineItem::new(label, amount));
        self
    }

    /// Builder: add a line item
    pub fn with_line_item(mut self, item: LineItem) -> Self {
        self.line_items.push(item);
        self
    }

    /// Builder: offer a shipping method
    pub fn with_shipping_method(mut self, method: ShippingMethod) -> Self {
        self.shipping_methods.push(method);
        self
    }

    /// Builder: require a shipping contact field
    pub fn with_required_shipping_field(mut self, field: impl Into<String>) -> Self {
        self.required_shipping_contact_fields.push(field.into());
        self
    }

    /// Total amount, if present
    pub fn total_amount(&self) -> Option<&str> {
        self.total.as_ref().and_then(|t| t.amount.as_deref())
    }

    /// Parse a request from its JSON form
    pub fn from_json(json: &str) -> PolyfillResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
