//! # Session Events
//!
//! Payloads handed to the page's `on*` callback slots.

use crate::payment::{Payment, PaymentContact, PaymentMethod};
use crate::request::ShippingMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six callback slots a page can assign on a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerSlot {
    Cancel,
    PaymentAuthorized,
    PaymentMethodSelected,
    ShippingContactSelected,
    ShippingMethodSelected,
    ValidateMerchant,
}

impl HandlerSlot {
    pub const ALL: [HandlerSlot; 6] = [
        HandlerSlot::Cancel,
        HandlerSlot::PaymentAuthorized,
        HandlerSlot::PaymentMethodSelected,
        HandlerSlot::ShippingContactSelected,
        HandlerSlot::ShippingMethodSelected,
        HandlerSlot::ValidateMerchant,
    ];

    /// Property name on the JavaScript session object
    pub fn property_name(&self) -> &'static str {
        match self {
            HandlerSlot::Cancel => "oncancel",
            HandlerSlot::PaymentAuthorized => "onpaymentauthorized",
            HandlerSlot::PaymentMethodSelected => "onpaymentmethodselected",
            HandlerSlot::ShippingContactSelected => "onshippingcontactselected",
            HandlerSlot::ShippingMethodSelected => "onshippingmethodselected",
            HandlerSlot::ValidateMerchant => "onvalidatemerchant",
        }
    }
}

impl fmt::Display for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.property_name())
    }
}

/// Delivered to `onvalidatemerchant` when the session begins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateMerchantEvent {
    #[serde(rename = "validationURL")]
    pub validation_url: String,
}

/// Delivered to `onshippingcontactselected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingContactSelectedEvent {
    pub shipping_contact: PaymentContact,
}

/// Delivered to `onpaymentauthorized`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAuthorizedEvent {
    pub payment: Payment,
}

/// Delivered to `onpaymentmethodselected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodSelectedEvent {
    pub payment_method: PaymentMethod,
}

/// Delivered to `onshippingmethodselected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethodSelectedEvent {
    pub shipping_method: ShippingMethod,
}

/// Delivered to `oncancel`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelEvent {}

/// Any event, tagged with the slot it goes to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "slot", content = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    Cancel(CancelEvent),
    PaymentAuthorized(PaymentAuthorizedEvent),
    PaymentMethodSelected(PaymentMethodSelectedEvent),
    ShippingContactSelected(ShippingContactSelectedEvent),
    ShippingMethodSelected(ShippingMethodSelectedEvent),
    ValidateMerchant(ValidateMerchantEvent),
}

impl SessionEvent {
    /// Slot this event is delivered to
    pub fn slot(&self) -> HandlerSlot {
        match self {
            SessionEvent::Cancel(_) => HandlerSlot::Cancel,
            SessionEvent::PaymentAuthorized(_) => HandlerSlot::PaymentAuthorized,
            SessionEvent::PaymentMethodSelected(_) => HandlerSlot::PaymentMethodSelected,
            SessionEvent::ShippingContactSelected(_) => HandlerSlot::ShippingContactSelected,
            SessionEvent::ShippingMethodSelected(_) => HandlerSlot::ShippingMethodSelected,
            SessionEvent::ValidateMerchant(_) => HandlerSlot::ValidateMerchant,
        }
    }
}
