//! The JavaScript `ApplePaySession` class.
//!
//! Page callbacks run synchronously inside `begin()` and `complete*()`.
//! Anything a callback throws is rethrown from the method that fired it,
//! after the session has already moved to its new stage. Callbacks are
//! invoked with `this` undefined, so pages refer to the session through
//! their own binding (`session.completePayment(...)`).

use crate::convert::{self, describe, from_js, throw, to_js};
use crate::policy;
use applepay_core::{
    CancelEvent, HandlerSlot, PaymentAuthorizedEvent, PaymentMethodSelectedEvent, PaymentRequest,
    PolyfillResult, Session, ShippingContactSelectedEvent, ShippingMethodSelectedEvent,
    ValidateMerchantEvent,
};
use js_sys::{Function, Promise};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;
use web_sys::console;

/// First exception thrown by a page callback, waiting to be rethrown
type Thrown = Rc<RefCell<Option<JsValue>>>;

/// Wrap a page callback as a core handler
fn js_handler<E: Serialize>(
    slot: HandlerSlot,
    func: Function,
    thrown: Thrown,
) -> impl Fn(&E) + 'static {
    move |event: &E| {
        let result = to_js(event).and_then(|arg| func.call1(&JsValue::UNDEFINED, &arg));
        if let Err(err) = result {
            console::error_1(&JsValue::from_str(&format!("{} threw: {}", slot, describe(&err))));
            thrown.borrow_mut().get_or_insert(err);
        }
    }
}

#[wasm_bindgen(js_name = ApplePaySession)]
pub struct ApplePaySession {
    inner: Session,
    callbacks: RefCell<HashMap<HandlerSlot, Function>>,
    thrown: Thrown,
}

impl ApplePaySession {
    /// Map a core result, then rethrow whatever a callback threw meanwhile
    fn settle(&self, result: PolyfillResult<()>) -> Result<(), JsValue> {
        let thrown = self.thrown.borrow_mut().take();
        result.map_err(throw)?;
        match thrown {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn assign(&self, slot: HandlerSlot, value: JsValue) {
        let func = match value.dyn_into::<Function>() {
            Ok(func) => func,
            Err(_) => {
                self.callbacks.borrow_mut().remove(&slot);
                self.inner.clear_handler(slot);
                return;
            }
        };

        self.callbacks.borrow_mut().insert(slot, func.clone());
        let thrown = Rc::clone(&self.thrown);
        let inner = &self.inner;
        match slot {
            HandlerSlot::Cancel => {
                inner.set_on_cancel(js_handler::<CancelEvent>(slot, func, thrown))
            }
            HandlerSlot::PaymentAuthorized => inner.set_on_payment_authorized(
                js_handler::<PaymentAuthorizedEvent>(slot, func, thrown),
            ),
            HandlerSlot::PaymentMethodSelected => inner.set_on_payment_method_selected(
                js_handler::<PaymentMethodSelectedEvent>(slot, func, thrown),
            ),
            HandlerSlot::ShippingContactSelected => inner.set_on_shipping_contact_selected(
                js_handler::<ShippingContactSelectedEvent>(slot, func, thrown),
            ),
            HandlerSlot::ShippingMethodSelected => inner.set_on_shipping_method_selected(
                js_handler::<ShippingMethodSelectedEvent>(slot, func, thrown),
            ),
            HandlerSlot::ValidateMerchant => inner.set_on_validate_merchant(
                js_handler::<ValidateMerchantEvent>(slot, func, thrown),
            ),
        }
    }

    fn callback(&self, slot: HandlerSlot) -> JsValue {
        self.callbacks
            .borrow()
            .get(&slot)
            .map(|func| func.clone().into())
            .unwrap_or(JsValue::NULL)
    }
}

#[wasm_bindgen(js_class = ApplePaySession)]
impl ApplePaySession {
    /// `new ApplePaySession(version, paymentRequest)`
    #[wasm_bindgen(constructor)]
    pub fn new(version: u32, request: JsValue) -> Result<ApplePaySession, JsValue> {
        let request: PaymentRequest = from_js(request, "payment request")?;
        let inner = Session::new(&policy(), version, request).map_err(throw)?;

        Ok(Self {
            inner,
            callbacks: RefCell::new(HashMap::new()),
            thrown: Rc::default(),
        })
    }

    #[wasm_bindgen(js_name = canMakePayments)]
    pub fn can_make_payments() -> bool {
        policy().can_make_payments()
    }

    #[wasm_bindgen(js_name = canMakePaymentsWithActiveCard)]
    pub fn can_make_payments_with_active_card(merchant_identifier: String) -> Promise {
        let answer = policy().can_make_payments_with_active_card(&merchant_identifier);
        future_to_promise(async move { Ok(JsValue::from_bool(answer.await)) })
    }

    #[wasm_bindgen(js_name = openPaymentSetup)]
    pub fn open_payment_setup(merchant_identifier: String) -> Promise {
        let answer = policy().open_payment_setup(&merchant_identifier);
        future_to_promise(async move { Ok(JsValue::from_bool(answer.await)) })
    }

    #[wasm_bindgen(js_name = supportsVersion)]
    pub fn supports_version(version: u32) -> bool {
        policy().supports_version(version)
    }

    #[wasm_bindgen(getter)]
    pub fn version(&self) -> u32 {
        self.inner.version()
    }

    pub fn abort(&self) -> Result<(), JsValue> {
        self.inner.abort().map_err(throw)
    }

    pub fn begin(&self) -> Result<(), JsValue> {
        self.settle(self.inner.begin())
    }

    #[wasm_bindgen(js_name = completeMerchantValidation)]
    pub fn complete_merchant_validation(&self, merchant_session: JsValue) -> Result<(), JsValue> {
        let merchant_session: Value =
            convert::optional(merchant_session, "merchant session")?.unwrap_or(Value::Null);
        self.settle(self.inner.complete_merchant_validation(merchant_session))
    }

    #[wasm_bindgen(js_name = completePayment)]
    pub fn complete_payment(&self, result: JsValue) -> Result<(), JsValue> {
        let completion = convert::payment_completion(result)?;
        self.inner.complete_payment(completion).map_err(throw)
    }

    #[wasm_bindgen(js_name = completePaymentMethodSelection)]
    pub fn complete_payment_method_selection(
        &self,
        total_or_update: JsValue,
        new_line_items: JsValue,
    ) -> Result<(), JsValue> {
        let completion = convert::payment_method_completion(
            self.inner.version(),
            total_or_update,
            new_line_items,
        )?;
        self.inner
            .complete_payment_method_selection(completion)
            .map_err(throw)
    }

    #[wasm_bindgen(js_name = completeShippingContactSelection)]
    pub fn complete_shipping_contact_selection(
        &self,
        status_or_update: JsValue,
        new_shipping_methods: JsValue,
        new_total: JsValue,
        new_line_items: JsValue,
    ) -> Result<(), JsValue> {
        let completion = convert::shipping_contact_completion(
            status_or_update,
            new_shipping_methods,
            new_total,
            new_line_items,
        )?;
        self.settle(self.inner.complete_shipping_contact_selection(completion))
    }

    #[wasm_bindgen(js_name = completeShippingMethodSelection)]
    pub fn complete_shipping_method_selection(
        &self,
        status_or_update: JsValue,
        new_total: JsValue,
        new_line_items: JsValue,
    ) -> Result<(), JsValue> {
        let completion =
            convert::shipping_method_completion(status_or_update, new_total, new_line_items)?;
        self.inner
            .complete_shipping_method_selection(completion)
            .map_err(throw)
    }

    #[wasm_bindgen(getter)]
    pub fn oncancel(&self) -> JsValue {
        self.callback(HandlerSlot::Cancel)
    }

    #[wasm_bindgen(setter)]
    pub fn set_oncancel(&self, value: JsValue) {
        self.assign(HandlerSlot::Cancel, value);
    }

    #[wasm_bindgen(getter)]
    pub fn onpaymentauthorized(&self) -> JsValue {
        self.callback(HandlerSlot::PaymentAuthorized)
    }

    #[wasm_bindgen(setter)]
    pub fn set_onpaymentauthorized(&self, value: JsValue) {
        self.assign(HandlerSlot::PaymentAuthorized, value);
    }

    #[wasm_bindgen(getter)]
    pub fn onpaymentmethodselected(&self) -> JsValue {
        self.callback(HandlerSlot::PaymentMethodSelected)
    }

    #[wasm_bindgen(setter)]
    pub fn set_onpaymentmethodselected(&self, value: JsValue) {
        self.assign(HandlerSlot::PaymentMethodSelected, value);
    }

    #[wasm_bindgen(getter)]
    pub fn onshippingcontactselected(&self) -> JsValue {
        self.callback(HandlerSlot::ShippingContactSelected)
    }

    #[wasm_bindgen(setter)]
    pub fn set_onshippingcontactselected(&self, value: JsValue) {
        self.assign(HandlerSlot::ShippingContactSelected, value);
    }

    #[wasm_bindgen(getter)]
    pub fn onshippingmethodselected(&self) -> JsValue {
        self.callback(HandlerSlot::ShippingMethodSelected)
    }

    #[wasm_bindgen(setter)]
    pub fn set_onshippingmethodselected(&self, value: JsValue) {
        self.assign(HandlerSlot::ShippingMethodSelected, value);
    }

    #[wasm_bindgen(getter)]
    pub fn onvalidatemerchant(&self) -> JsValue {
        self.callback(HandlerSlot::ValidateMerchant)
    }

    #[wasm_bindgen(setter)]
    pub fn set_onvalidatemerchant(&self, value: JsValue) {
        self.assign(HandlerSlot::ValidateMerchant, value);
    }
}
