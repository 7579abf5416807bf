//! # Scenario Runner
//!
//! Plays a [`Scenario`] against a real `SessionPolicy` with tokio-backed
//! stage timers and records everything the page would have observed:
//! step results, fired events and abandonment notices.

use crate::scenario::{Scenario, Step};
use applepay_core::{
    AbandonmentNotice, AbandonmentNotifier, ApplePayError, ApplePayErrorCode, LoggingNotifier,
    PaymentAuthorizationResult, PaymentMethodCompletion, PolicyConfig, PolyfillResult, Session,
    SessionEvent, SessionPolicy, ShippingContactCompletion, ShippingContactUpdate, Stage,
    StatusCode, TokioTimers, TotalUpdate, STRUCTURED_CALLS_SINCE,
};
use serde::Serialize;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tokio::time::Instant;
use tracing::{debug, info};

/// One line of the transcript
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Constructed {
        at_ms: u64,
        version: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Step {
        at_ms: u64,
        index: usize,
        action: &'static str,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<Stage>,
    },
    Event {
        at_ms: u64,
        event: SessionEvent,
    },
    Abandoned {
        at_ms: u64,
        notice: AbandonmentNotice,
    },
}

/// Everything a scenario run produced
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub scenario: String,
    pub version: u32,
    pub entries: Vec<Entry>,
    pub final_stage: Option<Stage>,
    pub payment_status: Option<StatusCode>,
    pub active_session: bool,
}

impl Transcript {
    /// Fired events, in order
    pub fn events(&self) -> Vec<&SessionEvent> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Event { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn abandonments(&self) -> Vec<&AbandonmentNotice> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Abandoned { notice, .. } => Some(notice),
                _ => None,
            })
            .collect()
    }

    /// `(action, error)` of every step that failed
    pub fn failed_steps(&self) -> Vec<(&'static str, &str)> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Step {
                    action,
                    ok: false,
                    error,
                    ..
                } => Some((*action, error.as_deref().unwrap_or_default())),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone)]
struct Recorder {
    started: Instant,
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl Recorder {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            entries: Rc::default(),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn push(&self, entry: Entry) {
        self.entries.borrow_mut().push(entry);
    }

    fn event(&self, event: SessionEvent) {
        debug!(slot = %event.slot(), "Event fired");
        self.push(Entry::Event {
            at_ms: self.elapsed_ms(),
            event,
        });
    }
}

struct TranscriptNotifier(Recorder);

impl AbandonmentNotifier for TranscriptNotifier {
    fn session_abandoned(&self, notice: &AbandonmentNotice) {
        LoggingNotifier.session_abandoned(notice);
        self.0.push(Entry::Abandoned {
            at_ms: self.0.elapsed_ms(),
            notice: notice.clone(),
        });
    }
}

/// Run `scenario` on its own `LocalSet`.
///
/// `config` is used unless the scenario carries a `[policy]` table.
pub async fn run_scenario(scenario: &Scenario, config: PolicyConfig) -> Transcript {
    let local = LocalSet::new();
    local.run_until(run_local(scenario, config)).await
}

async fn run_local(scenario: &Scenario, config: PolicyConfig) -> Transcript {
    let config = scenario.policy.clone().unwrap_or(config);
    let recorder = Recorder::new();
    let policy = SessionPolicy::new(config, Rc::new(TokioTimers::new()))
        .with_factory(scenario.fixtures.clone())
        .with_notifier(TranscriptNotifier(recorder.clone()));

    info!(
        scenario = %scenario.name,
        version = scenario.version,
        steps = scenario.steps.len(),
        "Running scenario"
    );

    let mut session = construct(&policy, scenario, scenario.version, &recorder);

    for (index, step) in scenario.steps.iter().enumerate() {
        let result: Result<(), String> = match step {
            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Ok(())
            }
            Step::NewSession { version } => {
                let version = version.unwrap_or(scenario.version);
                match construct(&policy, scenario, version, &recorder) {
                    Some(next) => {
                        session = Some(next);
                        Ok(())
                    }
                    None => Err("Session construction failed".to_string()),
                }
            }
            _ => match &session {
                Some(session) => apply(session, step).map_err(|e| e.to_string()),
                None => Err("No session was constructed".to_string()),
            },
        };

        debug!(index, action = step.action(), ok = result.is_ok(), "Step finished");
        recorder.push(Entry::Step {
            at_ms: recorder.elapsed_ms(),
            index,
            action: step.action(),
            ok: result.is_ok(),
            error: result.err(),
            stage: session.as_ref().map(Session::stage),
        });
    }

    let transcript = Transcript {
        scenario: scenario.name.clone(),
        version: scenario.version,
        entries: recorder.entries.borrow().clone(),
        final_stage: session.as_ref().map(Session::stage),
        payment_status: session.as_ref().and_then(Session::payment_status),
        active_session: policy.has_active_session(),
    };

    info!(
        scenario = %scenario.name,
        final_stage = ?transcript.final_stage,
        failed_steps = transcript.failed_steps().len(),
        "Scenario finished"
    );
    transcript
}

fn construct(
    policy: &SessionPolicy,
    scenario: &Scenario,
    version: u32,
    recorder: &Recorder,
) -> Option<Session> {
    match Session::new(policy, version, scenario.request.clone()) {
        Ok(session) => {
            register_handlers(&session, recorder, scenario.shipping_contact_handler);
            recorder.push(Entry::Constructed {
                at_ms: recorder.elapsed_ms(),
                version,
                session_id: Some(session.id().to_string()),
                error: None,
            });
            Some(session)
        }
        Err(err) => {
            recorder.push(Entry::Constructed {
                at_ms: recorder.elapsed_ms(),
                version,
                session_id: None,
                error: Some(err.to_string()),
            });
            None
        }
    }
}

fn register_handlers(session: &Session, recorder: &Recorder, shipping_contact: bool) {
    let r = recorder.clone();
    session.set_on_validate_merchant(move |e| r.event(SessionEvent::ValidateMerchant(e.clone())));

    let r = recorder.clone();
    session.set_on_payment_authorized(move |e| r.event(SessionEvent::PaymentAuthorized(e.clone())));

    if shipping_contact {
        let r = recorder.clone();
        session.set_on_shipping_contact_selected(move |e| {
            r.event(SessionEvent::ShippingContactSelected(e.clone()))
        });
    }
}

fn status_or_success(status: Option<u8>) -> PolyfillResult<StatusCode> {
    Ok(status.map(StatusCode::try_from).transpose()?.unwrap_or_default())
}

/// Update-object error standing in for a non-success status
fn status_error(status: StatusCode) -> Option<ApplePayError> {
    let error = match status {
        StatusCode::Success => return None,
        StatusCode::InvalidBillingPostalAddress => {
            ApplePayError::new(ApplePayErrorCode::BillingContactInvalid)
                .with_contact_field("postalAddress")
        }
        StatusCode::InvalidShippingPostalAddress => {
            ApplePayError::new(ApplePayErrorCode::ShippingContactInvalid)
                .with_contact_field("postalAddress")
        }
        StatusCode::InvalidShippingContact => {
            ApplePayError::new(ApplePayErrorCode::ShippingContactInvalid)
        }
        _ => ApplePayError::new(ApplePayErrorCode::Unknown),
    };
    Some(error)
}

/// Issue a page action in the form the session version expects
fn apply(session: &Session, step: &Step) -> PolyfillResult<()> {
    let legacy = session.version() < STRUCTURED_CALLS_SINCE;

    match step {
        Step::Begin => session.begin(),
        Step::CompleteMerchantValidation { merchant_session } => session
            .complete_merchant_validation(merchant_session.clone().unwrap_or_else(|| json!({}))),
        Step::CompleteShippingContact { status, errors } => {
            let completion = if legacy {
                ShippingContactCompletion::status(status_or_success(*status)?)
            } else {
                let mut errors = errors.clone();
                errors.extend(status_error(status_or_success(*status)?));
                ShippingContactUpdate {
                    errors,
                    ..ShippingContactUpdate::default()
                }
                .into()
            };
            session.complete_shipping_contact_selection(completion)
        }
        Step::CompleteShippingMethod { status } => {
            if legacy {
                session.complete_shipping_method_selection(status_or_success(*status)?)
            } else {
                session.complete_shipping_method_selection(TotalUpdate::default())
            }
        }
        Step::CompletePaymentMethod => {
            let completion = if legacy {
                PaymentMethodCompletion::Legacy {
                    new_total: None,
                    new_line_items: Vec::new(),
                }
            } else {
                TotalUpdate::default().into()
            };
            session.complete_payment_method_selection(completion)
        }
        Step::CompletePayment { status } => {
            let status = StatusCode::try_from(*status)?;
            if legacy {
                session.complete_payment(status)
            } else {
                session.complete_payment(PaymentAuthorizationResult::new(status))
            }
        }
        Step::Abort => session.abort(),
        // Driven by the run loop
        Step::Wait { .. } | Step::NewSession { .. } => Ok(()),
    }
}
