//! Conversions between JS values and core types.
//!
//! Payloads cross the boundary as plain JSON-compatible objects, and every
//! failure becomes a thrown string carrying the error text, the way the
//! page expects `ApplePaySession` to throw.

use applepay_core::{
    PaymentCompletion, PaymentMethodCompletion, PolyfillError, PolyfillResult,
    ShippingContactCompletion, ShippingMethodCompletion, StatusCode, STRUCTURED_CALLS_SINCE,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Serialize into a plain JS object (maps become objects, not `Map`s)
pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// `undefined` and `null` read as absent
pub fn optional<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<Option<T>, JsValue> {
    if value.is_undefined() || value.is_null() {
        Ok(None)
    } else {
        from_js(value, what).map(Some)
    }
}

/// `undefined` and `null` read as an empty list
pub fn list<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<Vec<T>, JsValue> {
    Ok(optional(value, what)?.unwrap_or_default())
}

/// Error thrown back to the page
pub fn throw(err: PolyfillError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Text of a JS exception, for logs and factory errors
pub fn describe(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{:?}", err))
}

/// Map a JS number onto a `STATUS_*` constant
pub fn status_from_number(value: f64) -> PolyfillResult<StatusCode> {
    if value.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&value) {
        return Err(PolyfillError::UnknownStatus {
            code: value.max(0.0) as u32,
        });
    }
    StatusCode::try_from(value as u8)
}

fn status(value: &JsValue) -> Result<StatusCode, JsValue> {
    let number = value
        .as_f64()
        .ok_or_else(|| JsValue::from_str("Status must be a number."))?;
    status_from_number(number).map_err(throw)
}

// A leading number selects the positional form; anything else is read as an
// update object and the session rejects whichever form its version forbids.

pub fn payment_completion(result: JsValue) -> Result<PaymentCompletion, JsValue> {
    if result.as_f64().is_some() {
        return Ok(PaymentCompletion::Legacy(status(&result)?));
    }
    Ok(PaymentCompletion::Structured(from_js(result, "payment authorization result")?))
}

pub fn shipping_contact_completion(
    status_or_update: JsValue,
    new_shipping_methods: JsValue,
    new_total: JsValue,
    new_line_items: JsValue,
) -> Result<ShippingContactCompletion, JsValue> {
    if status_or_update.as_f64().is_some() {
        return Ok(ShippingContactCompletion::Legacy {
            status: status(&status_or_update)?,
            new_shipping_methods: list(new_shipping_methods, "shipping methods")?,
            new_total: optional(new_total, "total")?,
            new_line_items: list(new_line_items, "line items")?,
        });
    }
    Ok(ShippingContactCompletion::Structured(from_js(
        status_or_update,
        "shipping contact update",
    )?))
}

pub fn shipping_method_completion(
    status_or_update: JsValue,
    new_total: JsValue,
    new_line_items: JsValue,
) -> Result<ShippingMethodCompletion, JsValue> {
    if status_or_update.as_f64().is_some() {
        return Ok(ShippingMethodCompletion::Legacy {
            status: status(&status_or_update)?,
            new_total: optional(new_total, "total")?,
            new_line_items: list(new_line_items, "line items")?,
        });
    }
    Ok(ShippingMethodCompletion::Structured(from_js(
        status_or_update,
        "shipping method update",
    )?))
}

/// Both forms start with an object here, so the session version decides
pub fn payment_method_completion(
    version: u32,
    total_or_update: JsValue,
    new_line_items: JsValue,
) -> Result<PaymentMethodCompletion, JsValue> {
    if version < STRUCTURED_CALLS_SINCE {
        return Ok(PaymentMethodCompletion::Legacy {
            new_total: optional(total_or_update, "total")?,
            new_line_items: list(new_line_items, "line items")?,
        });
    }
    Ok(PaymentMethodCompletion::Structured(
        optional(total_or_update, "payment method update")?.unwrap_or_default(),
    ))
}
