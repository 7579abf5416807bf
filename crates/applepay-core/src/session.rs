//! # Payment Session
//!
//! One simulated Apple Pay transaction. The page drives it through a fixed
//! sequence of stages, each one ending with a `complete*` call:
//!
//! ```text
//!  Initialized ──begin──► AwaitingMerchantValidation
//!                              │ completeMerchantValidation
//!              ┌───────────────┴──────────────────┐
//!              ▼ (shipping handler set)           ▼
//!   AwaitingShippingContact ──success──► AwaitingPaymentAuthorization
//!                                                 │ completePayment
//!                                                 ▼
//!                                             Completed
//!
//!  abort (any live stage) ──► Aborted      timeout (awaiting) ──► Abandoned
//! ```
//!
//! Handlers are invoked with no session borrow held, so a handler may call
//! back into the session synchronously.

use crate::completion::{
    Completion, PaymentCompletion, PaymentMethodCompletion, ShippingContactCompletion,
    ShippingMethodCompletion,
};
use crate::error::{PolyfillError, PolyfillResult};
use crate::events::{
    CancelEvent, HandlerSlot, PaymentAuthorizedEvent, PaymentMethodSelectedEvent,
    ShippingContactSelectedEvent, ShippingMethodSelectedEvent, ValidateMerchantEvent,
};
use crate::hooks::HookContext;
use crate::policy::SessionPolicy;
use crate::request::PaymentRequest;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Initialized,
    AwaitingMerchantValidation,
    AwaitingShippingContact,
    AwaitingPaymentAuthorization,
    Completed,
    Aborted,
    Abandoned,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Initialized => "initialized",
            Stage::AwaitingMerchantValidation => "awaiting merchant validation",
            Stage::AwaitingShippingContact => "awaiting shipping contact",
            Stage::AwaitingPaymentAuthorization => "awaiting payment authorization",
            Stage::Completed => "completed",
            Stage::Aborted => "aborted",
            Stage::Abandoned => "abandoned",
        }
    }

    /// No further operation is accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Aborted | Stage::Abandoned)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback assigned to one of the `on*` slots
pub type Handler<E> = Rc<dyn Fn(&E)>;

#[derive(Default)]
struct SessionHandlers {
    cancel: Option<Handler<CancelEvent>>,
    payment_authorized: Option<Handler<PaymentAuthorizedEvent>>,
    payment_method_selected: Option<Handler<PaymentMethodSelectedEvent>>,
    shipping_contact_selected: Option<Handler<ShippingContactSelectedEvent>>,
    shipping_method_selected: Option<Handler<ShippingMethodSelectedEvent>>,
    validate_merchant: Option<Handler<ValidateMerchantEvent>>,
}

impl SessionHandlers {
    fn is_set(&self, slot: HandlerSlot) -> bool {
        match slot {
            HandlerSlot::Cancel => self.cancel.is_some(),
            HandlerSlot::PaymentAuthorized => self.payment_authorized.is_some(),
            HandlerSlot::PaymentMethodSelected => self.payment_method_selected.is_some(),
            HandlerSlot::ShippingContactSelected => self.shipping_contact_selected.is_some(),
            HandlerSlot::ShippingMethodSelected => self.shipping_method_selected.is_some(),
            HandlerSlot::ValidateMerchant => self.validate_merchant.is_some(),
        }
    }

    fn clear(&mut self, slot: HandlerSlot) {
        match slot {
            HandlerSlot::Cancel => self.cancel = None,
            HandlerSlot::PaymentAuthorized => self.payment_authorized = None,
            HandlerSlot::PaymentMethodSelected => self.payment_method_selected = None,
            HandlerSlot::ShippingContactSelected => self.shipping_contact_selected = None,
            HandlerSlot::ShippingMethodSelected => self.shipping_method_selected = None,
            HandlerSlot::ValidateMerchant => self.validate_merchant = None,
        }
    }
}

/// A simulated `ApplePaySession`
pub struct Session {
    id: Uuid,
    version: u32,
    request: PaymentRequest,
    policy: SessionPolicy,
    stage: Rc<Cell<Stage>>,
    payment_status: Cell<Option<StatusCode>>,
    merchant_session: RefCell<Option<Value>>,
    handlers: RefCell<SessionHandlers>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("stage", &self.stage.get())
            .field("payment_status", &self.payment_status.get())
            .finish()
    }
}

impl Session {
    pub const STATUS_SUCCESS: u8 = 0;
    pub const STATUS_FAILURE: u8 = 1;
    pub const STATUS_INVALID_BILLING_POSTAL_ADDRESS: u8 = 2;
    pub const STATUS_INVALID_SHIPPING_POSTAL_ADDRESS: u8 = 3;
    pub const STATUS_INVALID_SHIPPING_CONTACT: u8 = 4;
    pub const STATUS_PIN_REQUIRED: u8 = 5;
    pub const STATUS_PIN_INCORRECT: u8 = 6;
    pub const STATUS_PIN_LOCKOUT: u8 = 7;

    /// Validate `request` for `version` and claim the page-wide guard.
    ///
    /// Fails with `ActiveSessionExists` while another session is live, then
    /// with the first validation problem found.
    pub fn new(policy: &SessionPolicy, version: u32, request: PaymentRequest) -> PolyfillResult<Self> {
        let id = Uuid::new_v4();
        policy.register(id, version, &request)?;

        Ok(Self {
            id,
            version,
            request,
            policy: policy.clone(),
            stage: Rc::new(Cell::new(Stage::Initialized)),
            payment_status: Cell::new(None),
            merchant_session: RefCell::new(None),
            handlers: RefCell::new(SessionHandlers::default()),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn request(&self) -> &PaymentRequest {
        &self.request
    }

    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    /// Status recorded by `complete_payment`
    pub fn payment_status(&self) -> Option<StatusCode> {
        self.payment_status.get()
    }

    /// Opaque merchant session passed to `complete_merchant_validation`
    pub fn merchant_session(&self) -> Option<Value> {
        self.merchant_session.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Handler slots
    // ------------------------------------------------------------------

    pub fn set_on_cancel(&self, handler: impl Fn(&CancelEvent) + 'static) {
        self.handlers.borrow_mut().cancel = Some(Rc::new(handler));
    }

    pub fn set_on_payment_authorized(&self, handler: impl Fn(&PaymentAuthorizedEvent) + 'static) {
        self.handlers.borrow_mut().payment_authorized = Some(Rc::new(handler));
    }

    pub fn set_on_payment_method_selected(
        &self,
        handler: impl Fn(&PaymentMethodSelectedEvent) + 'static,
    ) {
        self.handlers.borrow_mut().payment_method_selected = Some(Rc::new(handler));
    }

    pub fn set_on_shipping_contact_selected(
        &self,
        handler: impl Fn(&ShippingContactSelectedEvent) + 'static,
    ) {
        self.handlers.borrow_mut().shipping_contact_selected = Some(Rc::new(handler));
    }

    pub fn set_on_shipping_method_selected(
        &self,
        handler: impl Fn(&ShippingMethodSelectedEvent) + 'static,
    ) {
        self.handlers.borrow_mut().shipping_method_selected = Some(Rc::new(handler));
    }

    pub fn set_on_validate_merchant(&self, handler: impl Fn(&ValidateMerchantEvent) + 'static) {
        self.handlers.borrow_mut().validate_merchant = Some(Rc::new(handler));
    }

    pub fn clear_handler(&self, slot: HandlerSlot) {
        self.handlers.borrow_mut().clear(slot);
    }

    pub fn has_handler(&self, slot: HandlerSlot) -> bool {
        self.handlers.borrow().is_set(slot)
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Start the flow: fires `onvalidatemerchant` with the configured URL
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn begin(&self) -> PolyfillResult<()> {
        self.expect_stage("begin", Stage::Initialized)?;

        let handler = self
            .handlers
            .borrow()
            .validate_merchant
            .clone()
            .ok_or(PolyfillError::HandlerNotRegistered {
                slot: HandlerSlot::ValidateMerchant,
            })?;

        let event = ValidateMerchantEvent {
            validation_url: self.policy.validation_url(),
        };
        self.transition(Stage::AwaitingMerchantValidation);
        handler(&event);
        Ok(())
    }

    /// Accept the merchant session and move on to shipping contact
    /// selection (if the page listens for it) or payment authorization
    #[instrument(skip(self, merchant_session), fields(session_id = %self.id))]
    pub fn complete_merchant_validation(&self, merchant_session: Value) -> PolyfillResult<()> {
        self.expect_stage("completeMerchantValidation", Stage::AwaitingMerchantValidation)?;

        let shipping_handler = self.handlers.borrow().shipping_contact_selected.clone();
        match shipping_handler {
            Some(handler) => {
                let event = ShippingContactSelectedEvent {
                    shipping_contact: self.policy.shipping_contact(&self.hook_context())?,
                };
                *self.merchant_session.borrow_mut() = Some(merchant_session);
                self.enter_waiting(Stage::AwaitingShippingContact);
                handler(&event);
            }
            None => {
                let (handler, event) = self.payment_authorized_event()?;
                *self.merchant_session.borrow_mut() = Some(merchant_session);
                self.enter_waiting(Stage::AwaitingPaymentAuthorization);
                handler(&event);
            }
        }
        Ok(())
    }

    /// Finish shipping contact selection.
    ///
    /// A failed outcome fires nothing and leaves the stage open, so the page
    /// may retry or abort.
    #[instrument(skip(self, completion), fields(session_id = %self.id))]
    pub fn complete_shipping_contact_selection(
        &self,
        completion: impl Into<ShippingContactCompletion>,
    ) -> PolyfillResult<()> {
        let completion = completion.into();
        self.expect_stage(ShippingContactCompletion::OPERATION, Stage::AwaitingShippingContact)?;
        let outcome = completion.normalize(self.version);

        self.policy.cancel_timeout(self.id);
        if !outcome.succeeded {
            debug!(status = ?outcome.status, "Shipping contact rejected by page");
            return Ok(());
        }

        let (handler, event) = self.payment_authorized_event()?;
        self.enter_waiting(Stage::AwaitingPaymentAuthorization);
        handler(&event);
        Ok(())
    }

    /// Accepted on any live session; no event follows
    pub fn complete_shipping_method_selection(
        &self,
        completion: impl Into<ShippingMethodCompletion>,
    ) -> PolyfillResult<()> {
        let completion = completion.into();
        self.expect_live(ShippingMethodCompletion::OPERATION)?;
        completion.normalize(self.version);
        Ok(())
    }

    /// Accepted on any live session; no event follows
    pub fn complete_payment_method_selection(
        &self,
        completion: impl Into<PaymentMethodCompletion>,
    ) -> PolyfillResult<()> {
        let completion = completion.into();
        self.expect_live(PaymentMethodCompletion::OPERATION)?;
        completion.normalize(self.version);
        Ok(())
    }

    /// Record the final status and release the page-wide guard
    #[instrument(skip(self, completion), fields(session_id = %self.id))]
    pub fn complete_payment(&self, completion: impl Into<PaymentCompletion>) -> PolyfillResult<()> {
        let completion = completion.into();
        self.expect_live(PaymentCompletion::OPERATION)?;
        let outcome = completion.normalize(self.version);

        self.policy.cancel_timeout(self.id);
        self.policy.release(self.id);
        self.payment_status.set(outcome.status);
        self.transition(Stage::Completed);

        info!(
            session_id = %self.id,
            status = ?outcome.status,
            succeeded = outcome.succeeded,
            "Payment session completed"
        );
        Ok(())
    }

    /// Tear the session down without firing `oncancel`
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub fn abort(&self) -> PolyfillResult<()> {
        self.expect_live("abort")?;

        self.policy.cancel_timeout(self.id);
        self.policy.release(self.id);
        self.transition(Stage::Aborted);
        info!(session_id = %self.id, "Payment session aborted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn expect_stage(&self, operation: &'static str, expected: Stage) -> PolyfillResult<()> {
        let stage = self.stage.get();
        if stage != expected {
            return Err(PolyfillError::InvalidState { operation, stage });
        }
        Ok(())
    }

    fn expect_live(&self, operation: &'static str) -> PolyfillResult<()> {
        let stage = self.stage.get();
        if stage.is_terminal() {
            return Err(PolyfillError::InvalidState { operation, stage });
        }
        Ok(())
    }

    fn transition(&self, to: Stage) {
        let from = self.stage.replace(to);
        debug!(session_id = %self.id, %from, %to, "Stage transition");
    }

    /// Arm the stage timer before the handler runs
    fn enter_waiting(&self, stage: Stage) {
        self.transition(stage);
        self.policy.arm_timeout(self.id, stage, &self.stage);
    }

    fn hook_context(&self) -> HookContext<'_> {
        HookContext {
            session_id: self.id,
            version: self.version,
            request: &self.request,
        }
    }

    fn payment_authorized_event(
        &self,
    ) -> PolyfillResult<(Handler<PaymentAuthorizedEvent>, PaymentAuthorizedEvent)> {
        let handler = self
            .handlers
            .borrow()
            .payment_authorized
            .clone()
            .ok_or(PolyfillError::HandlerNotRegistered {
                slot: HandlerSlot::PaymentAuthorized,
            })?;

        let payment = self.policy.authorized_payment(&self.hook_context())?;
        Ok((handler, PaymentAuthorizedEvent { payment }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{
        ApplePayError, ApplePayErrorCode, PaymentAuthorizationResult, ShippingContactUpdate,
        TotalUpdate,
    };
    use crate::config::PolicyConfig;
    use crate::hooks::{AbandonmentNotice, AbandonmentNotifier, FixtureFactory, ABANDONMENT_MESSAGE};
    use crate::payment::{PaymentContact, PaymentMethod, PaymentMethodType, PaymentToken};
    use crate::request::LineItem;
    use crate::timer::ManualTimers;
    use serde_json::json;
    use std::time::Duration;

    type Log<T> = Rc<RefCell<Vec<T>>>;

    fn request() -> PaymentRequest {
        PaymentRequest::new("US", "USD")
            .with_network("visa")
            .with_capability("supports3DS")
            .with_total("Lightning Cart", "10.00")
    }

    fn fixtures() -> FixtureFactory {
        FixtureFactory::new()
            .with_billing_contact(PaymentContact::named("John", "Appleseed"))
            .with_shipping_contact(
                PaymentContact::named("Jane", "Appleseed").with_email("jane@example.com"),
            )
            .with_payment_token(
                PaymentToken::new(
                    "txn_0001",
                    PaymentMethod::new("Visa 1234", "Visa", PaymentMethodType::Debit),
                )
                .with_payment_data(json!({ "version": "EC_v1" })),
            )
    }

    #[derive(Default, Clone)]
    struct RecordingNotifier {
        notices: Log<AbandonmentNotice>,
    }

    impl AbandonmentNotifier for RecordingNotifier {
        fn session_abandoned(&self, notice: &AbandonmentNotice) {
            self.notices.borrow_mut().push(notice.clone());
        }
    }

    struct Harness {
        timers: Rc<ManualTimers>,
        policy: SessionPolicy,
        notifier: RecordingNotifier,
    }

    fn harness(config: PolicyConfig) -> Harness {
        let timers = Rc::new(ManualTimers::new());
        let notifier = RecordingNotifier::default();
        let policy = SessionPolicy::new(config, timers.clone())
            .with_factory(fixtures())
            .with_notifier(notifier.clone());
        Harness {
            timers,
            policy,
            notifier,
        }
    }

    /// Record every fired event as `(slot, payload)`
    fn record_all(session: &Session, shipping: bool) -> Log<(HandlerSlot, Value)> {
        let log: Log<(HandlerSlot, Value)> = Rc::default();

        let l = Rc::clone(&log);
        session.set_on_validate_merchant(move |e| {
            l.borrow_mut()
                .push((HandlerSlot::ValidateMerchant, serde_json::to_value(e).unwrap()))
        });
        let l = Rc::clone(&log);
        session.set_on_payment_authorized(move |e| {
            l.borrow_mut()
                .push((HandlerSlot::PaymentAuthorized, serde_json::to_value(e).unwrap()))
        });
        if shipping {
            let l = Rc::clone(&log);
            session.set_on_shipping_contact_selected(move |e| {
                l.borrow_mut().push((
                    HandlerSlot::ShippingContactSelected,
                    serde_json::to_value(e).unwrap(),
                ))
            });
        }
        log
    }

    fn slots(log: &Log<(HandlerSlot, Value)>) -> Vec<HandlerSlot> {
        log.borrow().iter().map(|(slot, _)| *slot).collect()
    }

    #[test]
    fn test_stage_display_and_terminal() {
        assert_eq!(Stage::Completed.to_string(), "completed");
        assert_eq!(
            Stage::AwaitingMerchantValidation.to_string(),
            "awaiting merchant validation"
        );
        assert!(Stage::Abandoned.is_terminal());
        assert!(!Stage::AwaitingShippingContact.is_terminal());
    }

    #[test]
    fn test_status_constants() {
        assert_eq!(Session::STATUS_SUCCESS, StatusCode::Success.code());
        assert_eq!(Session::STATUS_PIN_LOCKOUT, StatusCode::PinLockout.code());
        assert_eq!(
            Session::STATUS_INVALID_SHIPPING_CONTACT,
            StatusCode::InvalidShippingContact.code()
        );
    }

    #[test]
    fn test_end_to_end_flow() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let log = record_all(&session, false);

        assert!(h.policy.has_active_session());
        assert_eq!(session.stage(), Stage::Initialized);

        session.begin().unwrap();
        assert_eq!(slots(&log), vec![HandlerSlot::ValidateMerchant]);
        assert_eq!(
            log.borrow()[0].1["validationURL"],
            crate::config::DEFAULT_VALIDATION_URL
        );

        session.complete_merchant_validation(json!({})).unwrap();
        assert_eq!(
            slots(&log),
            vec![HandlerSlot::ValidateMerchant, HandlerSlot::PaymentAuthorized]
        );
        {
            let events = log.borrow();
            let payment = &events[1].1["payment"];
            assert_eq!(payment["token"]["transactionIdentifier"], "txn_0001");
            assert_eq!(payment["billingContact"]["givenName"], "John");
            assert_eq!(payment["shippingContact"]["emailAddress"], "jane@example.com");
        }
        assert_eq!(session.stage(), Stage::AwaitingPaymentAuthorization);
        assert!(h.policy.has_pending_timer());

        session
            .complete_payment(PaymentAuthorizationResult::new(StatusCode::Success))
            .unwrap();
        assert_eq!(session.stage(), Stage::Completed);
        assert_eq!(session.payment_status(), Some(StatusCode::Success));
        assert_eq!(session.merchant_session(), Some(json!({})));
        assert!(!h.policy.has_active_session());
        assert!(h.policy.active_request().is_none());
        assert!(!h.policy.has_pending_timer());
        assert_eq!(h.timers.pending(), 0);

        // Guard is free again
        assert!(Session::new(&h.policy, 3, request()).is_ok());
    }

    #[test]
    fn test_second_session_rejected_while_active() {
        let h = harness(PolicyConfig::default());
        let _first = Session::new(&h.policy, 3, request()).unwrap();

        let err = Session::new(&h.policy, 3, request()).unwrap_err();
        assert_eq!(err, PolyfillError::ActiveSessionExists);
        assert_eq!(err.to_string(), "Page already has an active payment session.");
    }

    #[test]
    fn test_begin_only_from_initialized() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let log = record_all(&session, false);

        session.begin().unwrap();
        let err = session.begin().unwrap_err();
        assert_eq!(
            err,
            PolyfillError::InvalidState {
                operation: "begin",
                stage: Stage::AwaitingMerchantValidation,
            }
        );
        assert_eq!(slots(&log), vec![HandlerSlot::ValidateMerchant]);
    }

    #[test]
    fn test_begin_uses_configured_validation_url() {
        let h = harness(PolicyConfig::default().with_validation_url("https://merchant.test/validate"));
        let session = Session::new(&h.policy, 1, request()).unwrap();
        let log = record_all(&session, false);

        session.begin().unwrap();
        assert_eq!(log.borrow()[0].1["validationURL"], "https://merchant.test/validate");
    }

    #[test]
    fn test_begin_without_handler() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();

        assert_eq!(
            session.begin(),
            Err(PolyfillError::HandlerNotRegistered {
                slot: HandlerSlot::ValidateMerchant
            })
        );
        assert_eq!(session.stage(), Stage::Initialized);
    }

    #[test]
    fn test_merchant_validation_prefers_shipping_contact() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let log = record_all(&session, true);

        session.begin().unwrap();
        session.complete_merchant_validation(json!({ "id": "ms_1" })).unwrap();

        assert_eq!(
            slots(&log),
            vec![HandlerSlot::ValidateMerchant, HandlerSlot::ShippingContactSelected]
        );
        assert_eq!(log.borrow()[1].1["shippingContact"]["givenName"], "Jane");
        assert_eq!(session.stage(), Stage::AwaitingShippingContact);
    }

    #[test]
    fn test_shipping_contact_failure_keeps_session_open() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let log = record_all(&session, true);

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();

        let rejected = ShippingContactUpdate::default()
            .with_error(ApplePayError::new(ApplePayErrorCode::ShippingContactInvalid));
        session.complete_shipping_contact_selection(rejected).unwrap();

        assert_eq!(slots(&log).len(), 2);
        assert_eq!(session.stage(), Stage::AwaitingShippingContact);
        assert!(h.policy.has_active_session());
        assert!(!h.policy.has_pending_timer());

        session
            .complete_shipping_contact_selection(ShippingContactUpdate::default())
            .unwrap();
        assert_eq!(
            slots(&log),
            vec![
                HandlerSlot::ValidateMerchant,
                HandlerSlot::ShippingContactSelected,
                HandlerSlot::PaymentAuthorized,
            ]
        );
        assert_eq!(session.stage(), Stage::AwaitingPaymentAuthorization);
    }

    #[test]
    fn test_shipping_contact_success_cancels_timer() {
        let h = harness(
            PolicyConfig::default()
                .with_shipping_contact_timeout(Duration::from_millis(100))
                .with_authorization_timeout(Duration::from_secs(10)),
        );
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let _log = record_all(&session, true);

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();
        session
            .complete_shipping_contact_selection(ShippingContactUpdate::default())
            .unwrap();

        // Only the authorization timer remains
        assert_eq!(h.timers.pending(), 1);
        h.timers.advance(Duration::from_millis(500));
        assert!(h.notifier.notices.borrow().is_empty());
        assert_eq!(session.stage(), Stage::AwaitingPaymentAuthorization);
    }

    #[test]
    fn test_legacy_and_structured_calls_agree() {
        let run = |version: u32| {
            let h = harness(PolicyConfig::default());
            let session = Session::new(&h.policy, version, request()).unwrap();
            let log = record_all(&session, true);

            session.begin().unwrap();
            session.complete_merchant_validation(json!({})).unwrap();
            if version < 3 {
                session
                    .complete_shipping_contact_selection(StatusCode::InvalidShippingContact)
                    .unwrap();
                session
                    .complete_shipping_contact_selection(ShippingContactCompletion::Legacy {
                        status: StatusCode::Success,
                        new_shipping_methods: vec![],
                        new_total: Some(LineItem::new("Total", "12.00")),
                        new_line_items: vec![],
                    })
                    .unwrap();
                session.complete_payment(StatusCode::Success).unwrap();
            } else {
                session
                    .complete_shipping_contact_selection(ShippingContactUpdate::default().with_error(
                        ApplePayError::new(ApplePayErrorCode::ShippingContactInvalid),
                    ))
                    .unwrap();
                session
                    .complete_shipping_contact_selection(
                        ShippingContactUpdate::default().with_total(LineItem::new("Total", "12.00")),
                    )
                    .unwrap();
                session
                    .complete_payment(PaymentAuthorizationResult::new(StatusCode::Success))
                    .unwrap();
            }

            let outcome = (session.stage(), session.payment_status(), h.policy.has_active_session());
            let events = log.borrow().clone();
            (events, outcome)
        };

        let (legacy_events, legacy_outcome) = run(2);
        let (structured_events, structured_outcome) = run(3);
        assert_eq!(legacy_events, structured_events);
        assert_eq!(legacy_outcome, structured_outcome);
        assert_eq!(legacy_outcome, (Stage::Completed, Some(StatusCode::Success), false));
    }

    #[test]
    fn test_bare_status_completes_structured_session() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let _log = record_all(&session, false);
        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();

        session.complete_payment(StatusCode::Success).unwrap();
        assert_eq!(session.stage(), Stage::Completed);
        assert_eq!(session.payment_status(), Some(StatusCode::Success));
        assert!(!h.policy.has_active_session());
        assert!(!h.policy.has_pending_timer());

        // The guard is free for the next checkout
        assert!(Session::new(&h.policy, 3, request()).is_ok());
    }

    #[test]
    fn test_result_object_completes_legacy_session() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 2, request()).unwrap();
        let _log = record_all(&session, false);
        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();

        session
            .complete_payment(PaymentAuthorizationResult::new(StatusCode::Failure))
            .unwrap();
        assert_eq!(session.stage(), Stage::Completed);
        assert_eq!(session.payment_status(), Some(StatusCode::Failure));
        assert!(!h.policy.has_active_session());
    }

    #[test]
    fn test_complete_payment_twice_fails() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 1, request()).unwrap();
        let _log = record_all(&session, false);
        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();
        session.complete_payment(StatusCode::Failure).unwrap();

        assert_eq!(session.payment_status(), Some(StatusCode::Failure));
        assert_eq!(
            session.complete_payment(StatusCode::Success),
            Err(PolyfillError::InvalidState {
                operation: "completePayment",
                stage: Stage::Completed,
            })
        );
    }

    #[test]
    fn test_selection_completions_accepted_while_live() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let log = record_all(&session, false);

        session
            .complete_shipping_method_selection(TotalUpdate::default())
            .unwrap();
        session
            .complete_payment_method_selection(TotalUpdate::default())
            .unwrap();
        assert_eq!(session.stage(), Stage::Initialized);
        assert!(log.borrow().is_empty());

        session.abort().unwrap();
        assert!(matches!(
            session.complete_shipping_method_selection(TotalUpdate::default()),
            Err(PolyfillError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_abort_releases_guard_without_cancel_event() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let _log = record_all(&session, false);
        let cancelled = Rc::new(Cell::new(false));
        let c = Rc::clone(&cancelled);
        session.set_on_cancel(move |_| c.set(true));

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();
        session.abort().unwrap();

        assert_eq!(session.stage(), Stage::Aborted);
        assert!(!cancelled.get());
        assert!(!h.policy.has_active_session());
        assert_eq!(h.timers.pending(), 0);
        assert!(session.abort().is_err());
    }

    #[test]
    fn test_authorization_timeout_abandons_session() {
        let h = harness(PolicyConfig::default().with_authorization_timeout(Duration::from_millis(250)));
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let _log = record_all(&session, false);

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();

        assert_eq!(h.timers.advance(Duration::from_millis(249)), 0);
        assert_eq!(h.timers.advance(Duration::from_millis(1)), 1);

        assert_eq!(session.stage(), Stage::Abandoned);
        assert!(!h.policy.has_active_session());
        assert!(!h.policy.has_pending_timer());

        let notices = h.notifier.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].session_id, session.id());
        assert_eq!(notices[0].stage, Stage::AwaitingPaymentAuthorization);
        assert_eq!(notices[0].timeout, Duration::from_millis(250));
        assert!(notices[0].released);
        assert_eq!(notices[0].message, ABANDONMENT_MESSAGE);

        assert!(matches!(
            session.complete_payment(PaymentAuthorizationResult::new(StatusCode::Success)),
            Err(PolyfillError::InvalidState {
                stage: Stage::Abandoned,
                ..
            })
        ));
    }

    #[test]
    fn test_timeout_without_release_only_notifies() {
        let h = harness(
            PolicyConfig::default()
                .with_shipping_contact_timeout(Duration::from_millis(50))
                .with_release_on_timeout(false),
        );
        let session = Session::new(&h.policy, 3, request()).unwrap();
        let _log = record_all(&session, true);

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();
        h.timers.advance(Duration::from_millis(50));

        assert_eq!(session.stage(), Stage::AwaitingShippingContact);
        assert!(h.policy.has_active_session());
        let notices = h.notifier.notices.borrow();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].released);
        assert_eq!(notices[0].stage, Stage::AwaitingShippingContact);
    }

    #[test]
    fn test_synchronous_completion_inside_handler_cancels_timer() {
        let h = harness(PolicyConfig::default().with_authorization_timeout(Duration::from_millis(10)));
        let session = Rc::new(Session::new(&h.policy, 3, request()).unwrap());
        session.set_on_validate_merchant(|_| {});

        let weak = Rc::downgrade(&session);
        session.set_on_payment_authorized(move |_| {
            if let Some(session) = weak.upgrade() {
                session
                    .complete_payment(PaymentAuthorizationResult::new(StatusCode::Success))
                    .unwrap();
            }
        });

        session.begin().unwrap();
        session.complete_merchant_validation(json!({})).unwrap();

        assert_eq!(session.stage(), Stage::Completed);
        assert_eq!(h.timers.pending(), 0);
        assert_eq!(h.timers.advance(Duration::from_secs(1)), 0);
        assert!(h.notifier.notices.borrow().is_empty());
    }

    #[test]
    fn test_missing_factory_hook_fails_loudly() {
        let timers = Rc::new(ManualTimers::new());
        let policy = SessionPolicy::new(PolicyConfig::default(), timers.clone());
        let session = Session::new(&policy, 3, request()).unwrap();
        let _log = record_all(&session, false);

        session.begin().unwrap();
        let err = session.complete_merchant_validation(json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "You must implement ApplePaySessionPolyfill.createPaymentToken()"
        );
        assert_eq!(session.stage(), Stage::AwaitingMerchantValidation);
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn test_missing_payment_handler() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();
        session.set_on_validate_merchant(|_| {});

        session.begin().unwrap();
        assert_eq!(
            session.complete_merchant_validation(json!({})),
            Err(PolyfillError::HandlerNotRegistered {
                slot: HandlerSlot::PaymentAuthorized
            })
        );
    }

    #[test]
    fn test_handler_slots() {
        let h = harness(PolicyConfig::default());
        let session = Session::new(&h.policy, 3, request()).unwrap();

        for slot in HandlerSlot::ALL {
            assert!(!session.has_handler(slot));
        }
        session.set_on_shipping_method_selected(|_| {});
        session.set_on_payment_method_selected(|_| {});
        assert!(session.has_handler(HandlerSlot::ShippingMethodSelected));

        session.clear_handler(HandlerSlot::ShippingMethodSelected);
        assert!(!session.has_handler(HandlerSlot::ShippingMethodSelected));
        assert!(session.has_handler(HandlerSlot::PaymentMethodSelected));
    }
}
