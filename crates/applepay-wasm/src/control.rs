//! The `ApplePaySessionPolyfill` object a test page uses to steer the
//! simulated device.

use crate::{factory_hooks, notifier, policy};
use js_sys::Function;
use std::time::Duration;
use wasm_bindgen::prelude::*;

#[wasm_bindgen(js_name = ApplePaySessionPolyfill)]
pub struct PolyfillControl;

#[wasm_bindgen(js_class = ApplePaySessionPolyfill)]
impl PolyfillControl {
    #[wasm_bindgen(js_name = enablePayments)]
    pub fn enable_payments() {
        policy().enable_payments();
    }

    #[wasm_bindgen(js_name = disablePayments)]
    pub fn disable_payments() {
        policy().disable_payments();
    }

    #[wasm_bindgen(js_name = setMerchantIdentifier)]
    pub fn set_merchant_identifier(merchant_identifier: String) {
        policy().set_merchant_identifier(merchant_identifier);
    }

    #[wasm_bindgen(js_name = setUserSetupStatus)]
    pub fn set_user_setup_status(is_set_up: bool) {
        policy().set_setup_status(is_set_up);
    }

    #[wasm_bindgen(js_name = setValidationURL)]
    pub fn set_validation_url(validation_url: String) {
        policy().set_validation_url(validation_url);
    }

    /// Time allowed between `onshippingcontactselected` and its completion
    #[wasm_bindgen(js_name = setShippingContactTimeout)]
    pub fn set_shipping_contact_timeout(milliseconds: u32) {
        policy().set_shipping_contact_timeout(Duration::from_millis(milliseconds.into()));
    }

    /// Time allowed between `onpaymentauthorized` and `completePayment`
    #[wasm_bindgen(js_name = setAuthorizationTimeout)]
    pub fn set_authorization_timeout(milliseconds: u32) {
        policy().set_authorization_timeout(Duration::from_millis(milliseconds.into()));
    }

    /// Whether a timeout also frees the page for a new session
    #[wasm_bindgen(js_name = setReleaseOnTimeout)]
    pub fn set_release_on_timeout(release: bool) {
        policy().set_release_on_timeout(release);
    }

    #[wasm_bindgen(js_name = setCreateBillingContact)]
    pub fn set_create_billing_contact(hook: Option<Function>) {
        factory_hooks().set_billing_contact(hook);
    }

    #[wasm_bindgen(js_name = setCreateShippingContact)]
    pub fn set_create_shipping_contact(hook: Option<Function>) {
        factory_hooks().set_shipping_contact(hook);
    }

    #[wasm_bindgen(js_name = setCreatePaymentToken)]
    pub fn set_create_payment_token(hook: Option<Function>) {
        factory_hooks().set_payment_token(hook);
    }

    /// Replace the timeout alert with a function receiving the notice
    #[wasm_bindgen(js_name = setAbandonmentHandler)]
    pub fn set_abandonment_handler(handler: Option<Function>) {
        notifier().set_handler(handler);
    }

    #[wasm_bindgen(js_name = hasActiveSession)]
    pub fn has_active_session() -> bool {
        policy().has_active_session()
    }

    /// Request of the live session, or `null`
    #[wasm_bindgen(js_name = activeRequest)]
    pub fn active_request() -> Result<JsValue, JsValue> {
        match policy().active_request() {
            Some(request) => crate::convert::to_js(&request),
            None => Ok(JsValue::NULL),
        }
    }
}
