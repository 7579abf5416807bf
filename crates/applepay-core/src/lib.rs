//! # applepay-core
//!
//! Simulated `ApplePaySession` for exercising payment pages without a real
//! Apple Pay sheet.
//!
//! This crate provides:
//! - `SessionPolicy`, the page-wide handle holding configuration, the
//!   active-session guard, the stage timer and the integrator hooks
//! - `Session`, the per-transaction state machine and its `on*` slots
//! - `PaymentRequest` validation against version-gated reference tables
//! - `Legacy` / `Structured` completion call shapes normalized to one outcome
//! - `PaymentDataFactory`, `AbandonmentNotifier` and `TimerDriver` seams
//! - `PolyfillError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use applepay_core::{ManualTimers, PolicyConfig, Session, SessionPolicy};
//!
//! let timers = Rc::new(ManualTimers::new());
//! let policy = SessionPolicy::new(PolicyConfig::default(), timers.clone())
//!     .with_factory(fixtures);
//!
//! let session = Session::new(&policy, 3, request)?;
//! session.set_on_validate_merchant(|event| println!("{}", event.validation_url));
//! session.set_on_payment_authorized(|event| println!("{:?}", event.payment.token));
//!
//! session.begin()?;
//! session.complete_merchant_validation(serde_json::json!({}))?;
//! session.complete_payment(PaymentAuthorizationResult::new(StatusCode::Success))?;
//! ```

pub mod completion;
pub mod config;
pub mod error;
pub mod events;
pub mod hooks;
pub mod payment;
pub mod policy;
pub mod request;
pub mod session;
pub mod status;
pub mod tables;
pub mod timer;
pub mod validation;

// Re-exports for convenience
pub use completion::{
    ApplePayError, ApplePayErrorCode, CallShape, Completion, Outcome, PaymentAuthorizationResult,
    PaymentCompletion, PaymentMethodCompletion, ShippingContactCompletion, ShippingContactUpdate,
    ShippingMethodCompletion, TotalUpdate,
};
pub use config::PolicyConfig;
pub use error::{PolyfillError, PolyfillResult, RequiredField};
pub use events::{
    CancelEvent, HandlerSlot, PaymentAuthorizedEvent, PaymentMethodSelectedEvent, SessionEvent,
    ShippingContactSelectedEvent, ShippingMethodSelectedEvent, ValidateMerchantEvent,
};
pub use hooks::{
    AbandonmentNotice, AbandonmentNotifier, FixtureFactory, HookContext, LoggingNotifier,
    PaymentDataFactory, UnconfiguredFactory, ABANDONMENT_MESSAGE,
};
pub use payment::{Payment, PaymentContact, PaymentMethod, PaymentMethodType, PaymentToken};
pub use policy::SessionPolicy;
pub use request::{LineItem, LineItemType, PaymentRequest, ShippingMethod, ShippingType};
pub use session::{Handler, Session, Stage};
pub use status::StatusCode;
pub use tables::{ReferenceTable, LATEST_VERSION, STRUCTURED_CALLS_SINCE, ZERO_TOTAL_SINCE};
pub use timer::{ManualTimers, TimerCallback, TimerDriver, TimerHandle};

#[cfg(feature = "tokio")]
pub use timer::TokioTimers;
