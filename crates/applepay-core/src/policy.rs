//! # Session Policy
//!
//! Page-wide state shared by every session: the simulated device
//! configuration, the single active-session guard, the one outstanding stage
//! timer and the integrator hooks.
//!
//! A `SessionPolicy` is a cheap `Clone` handle. The host creates one and
//! passes it to each [`Session`](crate::Session) it constructs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let timers = Rc::new(ManualTimers::new());
//! let policy = SessionPolicy::new(PolicyConfig::default(), timers.clone())
//!     .with_factory(FixtureFactory::new().with_payment_token(token));
//!
//! let session = Session::new(&policy, 3, request)?;
//! ```

use crate::config::PolicyConfig;
use crate::error::{PolyfillError, PolyfillResult};
use crate::hooks::{
    AbandonmentNotice, AbandonmentNotifier, HookContext, LoggingNotifier, PaymentDataFactory,
    UnconfiguredFactory, ABANDONMENT_MESSAGE,
};
use crate::payment::{Payment, PaymentContact};
use crate::request::PaymentRequest;
use crate::session::Stage;
use crate::timer::{TimerDriver, TimerHandle};
use crate::validation::validate_request;
use chrono::Utc;
use std::cell::{Cell, RefCell};
use std::future::{ready, Ready};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The session currently holding the guard
#[derive(Debug, Clone)]
struct ActiveSession {
    id: Uuid,
    request: PaymentRequest,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimeout {
    session_id: Uuid,
    handle: TimerHandle,
}

struct PolicyInner {
    config: RefCell<PolicyConfig>,
    active: RefCell<Option<ActiveSession>>,
    pending: Cell<Option<PendingTimeout>>,
    timers: Rc<dyn TimerDriver>,
    factory: RefCell<Rc<dyn PaymentDataFactory>>,
    notifier: RefCell<Rc<dyn AbandonmentNotifier>>,
}

/// Shared handle to the page-wide session policy
#[derive(Clone)]
pub struct SessionPolicy {
    inner: Rc<PolicyInner>,
}

impl std::fmt::Debug for SessionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPolicy")
            .field("config", &*self.inner.config.borrow())
            .field("active_session", &self.active_session_id())
            .field("has_pending_timer", &self.has_pending_timer())
            .finish()
    }
}

impl SessionPolicy {
    /// Create a policy with no factory hooks and a logging notifier
    pub fn new(config: PolicyConfig, timers: Rc<dyn TimerDriver>) -> Self {
        Self {
            inner: Rc::new(PolicyInner {
                config: RefCell::new(config),
                active: RefCell::new(None),
                pending: Cell::new(None),
                timers,
                factory: RefCell::new(Rc::new(UnconfiguredFactory)),
                notifier: RefCell::new(Rc::new(LoggingNotifier)),
            }),
        }
    }

    /// Builder: install payment data hooks
    pub fn with_factory(self, factory: impl PaymentDataFactory + 'static) -> Self {
        self.set_factory(Rc::new(factory));
        self
    }

    /// Builder: install the abandonment notifier
    pub fn with_notifier(self, notifier: impl AbandonmentNotifier + 'static) -> Self {
        self.set_notifier(Rc::new(notifier));
        self
    }

    pub fn set_factory(&self, factory: Rc<dyn PaymentDataFactory>) {
        *self.inner.factory.borrow_mut() = factory;
    }

    pub fn set_notifier(&self, notifier: Rc<dyn AbandonmentNotifier>) {
        *self.inner.notifier.borrow_mut() = notifier;
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Snapshot of the current configuration
    pub fn config(&self) -> PolicyConfig {
        self.inner.config.borrow().clone()
    }

    pub fn enable_payments(&self) {
        self.inner.config.borrow_mut().payments_enabled = true;
    }

    pub fn disable_payments(&self) {
        self.inner.config.borrow_mut().payments_enabled = false;
    }

    pub fn set_merchant_identifier(&self, id: impl Into<String>) {
        self.inner.config.borrow_mut().merchant_identifier = id.into();
    }

    pub fn set_setup_status(&self, is_set_up: bool) {
        self.inner.config.borrow_mut().is_set_up = is_set_up;
    }

    pub fn set_validation_url(&self, url: impl Into<String>) {
        self.inner.config.borrow_mut().validation_url = url.into();
    }

    pub fn set_shipping_contact_timeout(&self, timeout: Duration) {
        self.inner.config.borrow_mut().shipping_contact_timeout_ms = timeout.as_millis() as u64;
    }

    pub fn set_authorization_timeout(&self, timeout: Duration) {
        self.inner.config.borrow_mut().authorization_timeout_ms = timeout.as_millis() as u64;
    }

    pub fn set_release_on_timeout(&self, release: bool) {
        self.inner.config.borrow_mut().release_on_timeout = release;
    }

    // ------------------------------------------------------------------
    // Capability queries
    // ------------------------------------------------------------------

    pub fn can_make_payments(&self) -> bool {
        self.inner.config.borrow().payments_enabled
    }

    /// Resolves true when payments are enabled and `merchant_identifier`
    /// is the configured, non-empty identifier
    pub fn can_make_payments_with_active_card(&self, merchant_identifier: &str) -> Ready<bool> {
        ready(self.merchant_matches(merchant_identifier))
    }

    /// Like [`can_make_payments_with_active_card`](Self::can_make_payments_with_active_card),
    /// additionally gated on the simulated setup status
    pub fn open_payment_setup(&self, merchant_identifier: &str) -> Ready<bool> {
        let is_set_up = self.inner.config.borrow().is_set_up;
        ready(self.merchant_matches(merchant_identifier) && is_set_up)
    }

    pub fn supports_version(&self, version: u32) -> bool {
        self.inner.config.borrow().supports_version(version)
    }

    fn merchant_matches(&self, merchant_identifier: &str) -> bool {
        let config = self.inner.config.borrow();
        config.payments_enabled
            && !merchant_identifier.is_empty()
            && merchant_identifier == config.merchant_identifier
    }

    // ------------------------------------------------------------------
    // Active-session guard
    // ------------------------------------------------------------------

    pub fn has_active_session(&self) -> bool {
        self.inner.active.borrow().is_some()
    }

    /// Request of the session holding the guard
    pub fn active_request(&self) -> Option<PaymentRequest> {
        self.inner
            .active
            .borrow()
            .as_ref()
            .map(|active| active.request.clone())
    }

    pub fn active_session_id(&self) -> Option<Uuid> {
        self.inner.active.borrow().as_ref().map(|active| active.id)
    }

    pub fn has_pending_timer(&self) -> bool {
        self.inner.pending.get().is_some()
    }

    /// Run construction-time validation without claiming the guard
    pub fn check_request(&self, version: u32, request: &PaymentRequest) -> PolyfillResult<()> {
        if self.has_active_session() {
            return Err(PolyfillError::ActiveSessionExists);
        }
        validate_request(&self.inner.config.borrow(), version, request)
    }

    /// Validate and claim the guard for a new session
    pub(crate) fn register(
        &self,
        id: Uuid,
        version: u32,
        request: &PaymentRequest,
    ) -> PolyfillResult<()> {
        self.check_request(version, request)?;

        *self.inner.active.borrow_mut() = Some(ActiveSession {
            id,
            request: request.clone(),
        });
        info!(session_id = %id, version, "Payment session created");
        Ok(())
    }

    /// Drop the guard if `session_id` still holds it
    pub(crate) fn release(&self, session_id: Uuid) {
        let mut active = self.inner.active.borrow_mut();
        if active.as_ref().is_some_and(|a| a.id == session_id) {
            *active = None;
            debug!(session_id = %session_id, "Active session released");
        }
    }

    pub(crate) fn validation_url(&self) -> String {
        self.inner.config.borrow().validation_url.clone()
    }

    // ------------------------------------------------------------------
    // Factory hooks
    // ------------------------------------------------------------------

    fn factory(&self) -> Rc<dyn PaymentDataFactory> {
        Rc::clone(&self.inner.factory.borrow())
    }

    pub(crate) fn shipping_contact(&self, ctx: &HookContext<'_>) -> PolyfillResult<PaymentContact> {
        self.factory().create_shipping_contact(ctx)
    }

    /// Assemble the authorized payment from the three factory hooks
    pub(crate) fn authorized_payment(&self, ctx: &HookContext<'_>) -> PolyfillResult<Payment> {
        let factory = self.factory();
        let token = factory.create_payment_token(ctx)?;
        let billing_contact = factory.create_billing_contact(ctx)?;
        let shipping_contact = factory.create_shipping_contact(ctx)?;

        Ok(Payment {
            token,
            billing_contact,
            shipping_contact,
        })
    }

    // ------------------------------------------------------------------
    // Stage timer
    // ------------------------------------------------------------------

    /// Arm the timeout for `stage`, replacing any outstanding timer.
    ///
    /// When it fires while `stage_cell` still reads `stage`, the session is
    /// treated as abandoned.
    pub(crate) fn arm_timeout(&self, session_id: Uuid, stage: Stage, stage_cell: &Rc<Cell<Stage>>) {
        self.cancel_timeout(session_id);

        let timeout = {
            let config = self.inner.config.borrow();
            match stage {
                Stage::AwaitingShippingContact => config.shipping_contact_timeout(),
                _ => config.authorization_timeout(),
            }
        };

        let weak: Weak<PolicyInner> = Rc::downgrade(&self.inner);
        let cell = Rc::clone(stage_cell);
        let handle = self.inner.timers.arm(
            timeout,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    SessionPolicy { inner }.on_timeout(session_id, stage, timeout, &cell);
                }
            }),
        );

        self.inner.pending.set(Some(PendingTimeout { session_id, handle }));
        debug!(
            session_id = %session_id,
            stage = %stage,
            timeout_ms = timeout.as_millis() as u64,
            "Stage timer armed"
        );
    }

    /// Cancel the outstanding timer if it belongs to `session_id`
    pub(crate) fn cancel_timeout(&self, session_id: Uuid) {
        if let Some(pending) = self.inner.pending.get() {
            if pending.session_id == session_id {
                self.inner.timers.cancel(pending.handle);
                self.inner.pending.set(None);
            }
        }
    }

    fn on_timeout(&self, session_id: Uuid, stage: Stage, timeout: Duration, cell: &Cell<Stage>) {
        if self
            .inner
            .pending
            .get()
            .is_some_and(|pending| pending.session_id == session_id)
        {
            self.inner.pending.set(None);
        }

        if cell.get() != stage {
            debug!(session_id = %session_id, "Stale stage timer ignored");
            return;
        }

        let released = self.inner.config.borrow().release_on_timeout;
        if released {
            cell.set(Stage::Abandoned);
            self.release(session_id);
        }

        warn!(
            session_id = %session_id,
            stage = %stage,
            released,
            "Page did not complete {} in time",
            stage
        );

        let notice = AbandonmentNotice {
            session_id,
            stage,
            timeout,
            released,
            message: ABANDONMENT_MESSAGE,
            at: Utc::now(),
        };
        let notifier = Rc::clone(&self.inner.notifier.borrow());
        notifier.session_abandoned(&notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualTimers;

    fn request() -> PaymentRequest {
        PaymentRequest::new("US", "USD")
            .with_network("visa")
            .with_capability("supports3DS")
            .with_total("Lightning Cart", "10.00")
    }

    fn policy(config: PolicyConfig) -> SessionPolicy {
        SessionPolicy::new(config, Rc::new(ManualTimers::new()))
    }

    #[test]
    fn test_can_make_payments() {
        let policy = policy(PolicyConfig::default());
        assert!(policy.can_make_payments());

        policy.disable_payments();
        assert!(!policy.can_make_payments());

        policy.enable_payments();
        assert!(policy.can_make_payments());
    }

    #[tokio::test]
    async fn test_active_card_requires_matching_merchant() {
        let policy = policy(PolicyConfig::default());

        // Empty configured id never matches, even an empty argument.
        assert!(!policy.can_make_payments_with_active_card("").await);

        policy.set_merchant_identifier("merchant.com.lightning-cart");
        assert!(policy.can_make_payments_with_active_card("merchant.com.lightning-cart").await);
        assert!(!policy.can_make_payments_with_active_card("merchant.other").await);

        policy.disable_payments();
        assert!(!policy.can_make_payments_with_active_card("merchant.com.lightning-cart").await);
    }

    #[tokio::test]
    async fn test_open_payment_setup_gated_on_setup_status() {
        let policy = policy(PolicyConfig::default().with_merchant_identifier("merchant.test"));

        assert!(policy.open_payment_setup("merchant.test").await);

        policy.set_setup_status(false);
        assert!(!policy.open_payment_setup("merchant.test").await);
        assert!(policy.can_make_payments_with_active_card("merchant.test").await);
        assert!(!policy.open_payment_setup("merchant.other").await);
    }

    #[test]
    fn test_supports_version() {
        let policy = policy(PolicyConfig::default().with_supported_versions([1, 2, 3]));
        assert!(policy.supports_version(3));
        assert!(!policy.supports_version(4));
    }

    #[test]
    fn test_register_claims_guard() {
        let policy = policy(PolicyConfig::default());
        let id = Uuid::new_v4();

        policy.register(id, 3, &request()).unwrap();
        assert!(policy.has_active_session());
        assert_eq!(policy.active_session_id(), Some(id));
        assert_eq!(policy.active_request(), Some(request()));

        assert_eq!(
            policy.register(Uuid::new_v4(), 3, &request()),
            Err(PolyfillError::ActiveSessionExists)
        );
        assert_eq!(
            policy.check_request(99, &request()),
            Err(PolyfillError::ActiveSessionExists)
        );
    }

    #[test]
    fn test_failed_validation_leaves_guard_free() {
        let policy = policy(PolicyConfig::default());
        let bad = PaymentRequest {
            currency_code: None,
            ..request()
        };

        assert!(policy.register(Uuid::new_v4(), 3, &bad).is_err());
        assert!(!policy.has_active_session());
        assert!(policy.register(Uuid::new_v4(), 3, &request()).is_ok());
    }

    #[test]
    fn test_release_ignores_stale_id() {
        let policy = policy(PolicyConfig::default());
        let id = Uuid::new_v4();
        policy.register(id, 3, &request()).unwrap();

        policy.release(Uuid::new_v4());
        assert!(policy.has_active_session());

        policy.release(id);
        assert!(!policy.has_active_session());
        assert!(policy.active_request().is_none());
    }

    #[test]
    fn test_setters_update_config() {
        let policy = policy(PolicyConfig::default());
        policy.set_validation_url("https://example.test/startSession");
        policy.set_shipping_contact_timeout(Duration::from_millis(1500));
        policy.set_authorization_timeout(Duration::from_secs(2));
        policy.set_release_on_timeout(false);

        let config = policy.config();
        assert_eq!(config.validation_url, "https://example.test/startSession");
        assert_eq!(config.shipping_contact_timeout_ms, 1500);
        assert_eq!(config.authorization_timeout_ms, 2000);
        assert!(!config.release_on_timeout);
        assert_eq!(policy.validation_url(), "https://example.test/startSession");
    }

    #[test]
    fn test_timer_only_cancelled_by_owner() {
        let timers = Rc::new(ManualTimers::new());
        let policy = SessionPolicy::new(PolicyConfig::default(), timers.clone());
        let owner = Uuid::new_v4();
        let cell = Rc::new(Cell::new(Stage::AwaitingPaymentAuthorization));

        policy.arm_timeout(owner, Stage::AwaitingPaymentAuthorization, &cell);
        assert!(policy.has_pending_timer());

        policy.cancel_timeout(Uuid::new_v4());
        assert_eq!(timers.pending(), 1);

        policy.cancel_timeout(owner);
        assert_eq!(timers.pending(), 0);
        assert!(!policy.has_pending_timer());
    }
}
