//! # applepay-wasm
//!
//! WebAssembly bindings that stand in for `window.ApplePaySession` on
//! browsers without Apple Pay.
//!
//! This crate provides:
//! - the `ApplePaySession` class (constructor, static capability queries,
//!   `begin` / `complete*` / `abort`, the six `on*` properties)
//! - the `ApplePaySessionPolyfill` control object for tests
//! - `install`, which only publishes both on `window` when no native
//!   implementation exists
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { install, ApplePaySession, ApplePaySessionPolyfill } from 'applepay-polyfill';
//!
//! await init();
//! install(ApplePaySession, ApplePaySessionPolyfill);
//!
//! ApplePaySessionPolyfill.setMerchantIdentifier('merchant.com.example');
//! ApplePaySessionPolyfill.setCreatePaymentToken((ctx) => ({
//!   transactionIdentifier: 'txn_1',
//!   paymentMethod: { network: 'Visa', type: 'debit' },
//! }));
//!
//! const session = new ApplePaySession(3, paymentRequest);
//! session.onvalidatemerchant = (event) => session.completeMerchantValidation({});
//! session.onpaymentauthorized = (event) =>
//!   session.completePayment({ status: ApplePaySession.STATUS_SUCCESS });
//! session.begin();
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

mod control;
mod convert;
mod hooks;
mod session;
mod timers;

pub use control::PolyfillControl;
pub use hooks::{JsHooks, JsNotifier};
pub use session::ApplePaySession;
pub use timers::BrowserTimers;

use applepay_core::{PolicyConfig, SessionPolicy, StatusCode};
use js_sys::Reflect;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::console;

/// Page-wide state behind the exported classes
struct Runtime {
    policy: SessionPolicy,
    hooks: Rc<JsHooks>,
    notifier: Rc<JsNotifier>,
}

impl Runtime {
    fn new() -> Self {
        let hooks = Rc::new(JsHooks::default());
        let notifier = Rc::new(JsNotifier::default());

        let policy = SessionPolicy::new(PolicyConfig::default(), Rc::new(BrowserTimers::new()));
        policy.set_factory(hooks.clone());
        policy.set_notifier(notifier.clone());

        Self {
            policy,
            hooks,
            notifier,
        }
    }
}

thread_local! {
    static RUNTIME: Runtime = Runtime::new();
}

pub(crate) fn policy() -> SessionPolicy {
    RUNTIME.with(|rt| rt.policy.clone())
}

pub(crate) fn factory_hooks() -> Rc<JsHooks> {
    RUNTIME.with(|rt| rt.hooks.clone())
}

pub(crate) fn notifier() -> Rc<JsNotifier> {
    RUNTIME.with(|rt| rt.notifier.clone())
}

/// Initialize the WASM module (called automatically)
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Attach the `STATUS_*` constants to `session_class` and publish both
/// classes on `window`, unless the browser already has `ApplePaySession`.
///
/// Returns whether the polyfill was installed.
#[wasm_bindgen]
pub fn install(session_class: JsValue, polyfill_class: JsValue) -> Result<bool, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window to install into."))?;

    if Reflect::has(&window, &JsValue::from_str("ApplePaySession"))? {
        log("ApplePaySession already present; polyfill not installed");
        return Ok(false);
    }

    for status in StatusCode::ALL {
        Reflect::set(
            &session_class,
            &JsValue::from_str(status.constant_name()),
            &JsValue::from(status.code()),
        )?;
    }

    Reflect::set(&window, &JsValue::from_str("ApplePaySession"), &session_class)?;
    Reflect::set(
        &window,
        &JsValue::from_str("ApplePaySessionPolyfill"),
        &polyfill_class,
    )?;
    Ok(true)
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
