//! JS-backed integrator hooks.
//!
//! The page assigns plain functions through `ApplePaySessionPolyfill`; until
//! it does, the factory hooks fail with the same message the page would get
//! from an unimplemented `createX()`.

use crate::convert::{describe, to_js};
use applepay_core::{
    AbandonmentNotice, AbandonmentNotifier, HookContext, PaymentContact, PaymentDataFactory,
    PaymentToken, PolyfillError, PolyfillResult,
};
use js_sys::Function;
use serde::de::DeserializeOwned;
use std::cell::RefCell;
use wasm_bindgen::prelude::*;
use web_sys::console;

/// Factory hooks implemented by page-supplied functions
#[derive(Debug, Default)]
pub struct JsHooks {
    billing_contact: RefCell<Option<Function>>,
    shipping_contact: RefCell<Option<Function>>,
    payment_token: RefCell<Option<Function>>,
}

impl JsHooks {
    pub fn set_billing_contact(&self, hook: Option<Function>) {
        *self.billing_contact.borrow_mut() = hook;
    }

    pub fn set_shipping_contact(&self, hook: Option<Function>) {
        *self.shipping_contact.borrow_mut() = hook;
    }

    pub fn set_payment_token(&self, hook: Option<Function>) {
        *self.payment_token.borrow_mut() = hook;
    }

    fn invoke<T: DeserializeOwned>(
        slot: &RefCell<Option<Function>>,
        hook: &'static str,
        ctx: &HookContext<'_>,
    ) -> PolyfillResult<T> {
        let func = slot
            .borrow()
            .clone()
            .ok_or(PolyfillError::FactoryNotConfigured { hook })?;

        let failed = |message: String| PolyfillError::FactoryFailed { hook, message };
        let arg = to_js(ctx).map_err(|e| failed(describe(&e)))?;
        let value = func
            .call1(&JsValue::NULL, &arg)
            .map_err(|e| failed(describe(&e)))?;

        serde_wasm_bindgen::from_value(value).map_err(|e| failed(e.to_string()))
    }
}

impl PaymentDataFactory for JsHooks {
    fn create_billing_contact(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        Self::invoke(&self.billing_contact, "createBillingContact", ctx)
    }

    fn create_shipping_contact(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        Self::invoke(&self.shipping_contact, "createShippingContact", ctx)
    }

    fn create_payment_token(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentToken> {
        Self::invoke(&self.payment_token, "createPaymentToken", ctx)
    }
}

/// Abandonment notice shown with `window.alert`, or handed to a
/// page-supplied handler instead
#[derive(Debug, Default)]
pub struct JsNotifier {
    handler: RefCell<Option<Function>>,
}

impl JsNotifier {
    pub fn set_handler(&self, handler: Option<Function>) {
        *self.handler.borrow_mut() = handler;
    }
}

impl AbandonmentNotifier for JsNotifier {
    fn session_abandoned(&self, notice: &AbandonmentNotice) {
        console::warn_1(&JsValue::from_str(&format!(
            "ApplePaySession {} abandoned while {} ({} ms)",
            notice.session_id,
            notice.stage,
            notice.timeout.as_millis()
        )));

        let handler = self.handler.borrow().clone();
        let result = match handler {
            Some(handler) => to_js(notice)
                .and_then(|arg| handler.call1(&JsValue::NULL, &arg))
                .map(|_| ()),
            None => match web_sys::window() {
                Some(window) => window.alert_with_message(notice.message),
                None => Ok(()),
            },
        };

        if let Err(err) = result {
            console::error_2(&JsValue::from_str("Abandonment notice failed:"), &err);
        }
    }
}
