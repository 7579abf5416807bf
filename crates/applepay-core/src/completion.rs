//! # Completion Calls
//!
//! Arguments of the `complete*` session operations.
//!
//! Versions 1 and 2 of the protocol pass positional arguments (a status code
//! followed by optional totals and lists). Version 3 onwards passes a single
//! update object. Each operation gets one enum with a `Legacy` and a
//! `Structured` variant, and both reduce to the same [`Outcome`] before the
//! session state machine looks at them.
//!
//! ```text
//!   Legacy { status, .. } ──┐
//!                           ├──► Outcome { succeeded, status } ──► SessionPolicy
//!   Structured(update) ─────┘
//! ```

use crate::request::{LineItem, ShippingMethod};
use crate::status::StatusCode;
use crate::tables::STRUCTURED_CALLS_SINCE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Which argument convention a call uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallShape {
    /// Positional status/list arguments (versions 1-2)
    Legacy,
    /// Single update object (version 3+)
    Structured,
}

impl CallShape {
    /// Convention expected by a session of `version`
    pub fn for_version(version: u32) -> Self {
        if version >= STRUCTURED_CALLS_SINCE {
            CallShape::Structured
        } else {
            CallShape::Legacy
        }
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallShape::Legacy => f.write_str("legacy (positional)"),
            CallShape::Structured => f.write_str("structured (update object)"),
        }
    }
}

/// Kind of problem reported in an update's error list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApplePayErrorCode {
    ShippingContactInvalid,
    BillingContactInvalid,
    AddressUnserviceable,
    Unknown,
}

/// One entry of an update's `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplePayError {
    pub code: ApplePayErrorCode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApplePayError {
    pub fn new(code: ApplePayErrorCode) -> Self {
        Self {
            code,
            contact_field: None,
            message: None,
        }
    }

    /// Builder: point at the offending contact field
    pub fn with_contact_field(mut self, field: impl Into<String>) -> Self {
        self.contact_field = Some(field.into());
        self
    }

    /// Builder: set message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result passed to `completePayment` from version 3
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAuthorizationResult {
    #[serde(default)]
    pub status: StatusCode,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApplePayError>,
}

impl PaymentAuthorizationResult {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            errors: Vec::new(),
        }
    }
}

/// Update passed to `completeShippingContactSelection` from version 3
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingContactUpdate {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ApplePayError>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_shipping_methods: Vec<ShippingMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_total: Option<LineItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_line_items: Vec<LineItem>,
}

impl ShippingContactUpdate {
    /// Builder: report an error
    pub fn with_error(mut self, error: ApplePayError) -> Self {
        self.errors.push(error);
        self
    }

    /// Builder: replace the total
    pub fn with_total(mut self, total: LineItem) -> Self {
        self.new_total = Some(total);
        self
    }
}

/// Update passed to `completeShippingMethodSelection` and
/// `completePaymentMethodSelection` from version 3
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_total: Option<LineItem>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_line_items: Vec<LineItem>,
}

/// `completePayment(status)` / `completePayment(result)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentCompletion {
    Legacy(StatusCode),
    Structured(PaymentAuthorizationResult),
}

/// `completeShippingContactSelection(status, methods, total, items)` /
/// `completeShippingContactSelection(update)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingContactCompletion {
    Legacy {
        status: StatusCode,
        new_shipping_methods: Vec<ShippingMethod>,
        new_total: Option<LineItem>,
        new_line_items: Vec<LineItem>,
    },
    Structured(ShippingContactUpdate),
}

impl ShippingContactCompletion {
    /// Legacy call carrying only a status
    pub fn status(status: StatusCode) -> Self {
        ShippingContactCompletion::Legacy {
            status,
            new_shipping_methods: Vec::new(),
            new_total: None,
            new_line_items: Vec::new(),
        }
    }
}

/// `completeShippingMethodSelection(status, total, items)` /
/// `completeShippingMethodSelection(update)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShippingMethodCompletion {
    Legacy {
        status: StatusCode,
        new_total: Option<LineItem>,
        new_line_items: Vec<LineItem>,
    },
    Structured(TotalUpdate),
}

/// `completePaymentMethodSelection(total, items)` /
/// `completePaymentMethodSelection(update)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethodCompletion {
    Legacy {
        new_total: Option<LineItem>,
        new_line_items: Vec<LineItem>,
    },
    Structured(TotalUpdate),
}

impl From<StatusCode> for PaymentCompletion {
    fn from(status: StatusCode) -> Self {
        PaymentCompletion::Legacy(status)
    }
}

impl From<PaymentAuthorizationResult> for PaymentCompletion {
    fn from(result: PaymentAuthorizationResult) -> Self {
        PaymentCompletion::Structured(result)
    }
}

impl From<StatusCode> for ShippingContactCompletion {
    fn from(status: StatusCode) -> Self {
        ShippingContactCompletion::status(status)
    }
}

impl From<ShippingContactUpdate> for ShippingContactCompletion {
    fn from(update: ShippingContactUpdate) -> Self {
        ShippingContactCompletion::Structured(update)
    }
}

impl From<StatusCode> for ShippingMethodCompletion {
    fn from(status: StatusCode) -> Self {
        ShippingMethodCompletion::Legacy {
            status,
            new_total: None,
            new_line_items: Vec::new(),
        }
    }
}

impl From<TotalUpdate> for ShippingMethodCompletion {
    fn from(update: TotalUpdate) -> Self {
        ShippingMethodCompletion::Structured(update)
    }
}

impl From<TotalUpdate> for PaymentMethodCompletion {
    fn from(update: TotalUpdate) -> Self {
        PaymentMethodCompletion::Structured(update)
    }
}

/// Version-agnostic form of a completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the page accepted the stage
    pub succeeded: bool,
    /// Status carried by the call, when it has one
    pub status: Option<StatusCode>,
}

/// A `complete*` argument that can be normalized
pub trait Completion {
    /// JavaScript method name, used in errors and logs
    const OPERATION: &'static str;

    /// Convention this call was made with
    fn shape(&self) -> CallShape;

    /// Reduce to the version-agnostic outcome
    fn outcome(&self) -> Outcome;

    /// Reduce to the outcome for a session of `version`.
    ///
    /// A call in the other convention is read the same way (a bare status at
    /// version 3+ means `{ status }`, an object at versions 1-2 is read for
    /// its status) and only logged.
    fn normalize(&self, version: u32) -> Outcome {
        let expected = CallShape::for_version(version);
        let shape = self.shape();
        if shape != expected {
            warn!(
                operation = Self::OPERATION,
                version,
                %expected,
                %shape,
                "Completion call in the other convention; reading it anyway"
            );
        }
        self.outcome()
    }
}

impl Completion for PaymentCompletion {
    const OPERATION: &'static str = "completePayment";

    fn shape(&self) -> CallShape {
        match self {
            PaymentCompletion::Legacy(_) => CallShape::Legacy,
            PaymentCompletion::Structured(_) => CallShape::Structured,
        }
    }

    fn outcome(&self) -> Outcome {
        let status = match self {
            PaymentCompletion::Legacy(status) => *status,
            PaymentCompletion::Structured(result) => result.status,
        };
        Outcome {
            succeeded: status.is_success(),
            status: Some(status),
        }
    }
}

impl Completion for ShippingContactCompletion {
    const OPERATION: &'static str = "completeShippingContactSelection";

    fn shape(&self) -> CallShape {
        match self {
            ShippingContactCompletion::Legacy { .. } => CallShape::Legacy,
            ShippingContactCompletion::Structured(_) => CallShape::Structured,
        }
    }

    fn outcome(&self) -> Outcome {
        match self {
            ShippingContactCompletion::Legacy { status, .. } => Outcome {
                succeeded: status.is_success(),
                status: Some(*status),
            },
            ShippingContactCompletion::Structured(update) => Outcome {
                succeeded: update.errors.is_empty(),
                status: None,
            },
        }
    }
}

impl Completion for ShippingMethodCompletion {
    const OPERATION: &'static str = "completeShippingMethodSelection";

    fn shape(&self) -> CallShape {
        match self {
            ShippingMethodCompletion::Legacy { .. } => CallShape::Legacy,
            ShippingMethodCompletion::Structured(_) => CallShape::Structured,
        }
    }

    fn outcome(&self) -> Outcome {
        match self {
            ShippingMethodCompletion::Legacy { status, .. } => Outcome {
                succeeded: status.is_success(),
                status: Some(*status),
            },
            ShippingMethodCompletion::Structured(_) => Outcome {
                succeeded: true,
                status: None,
            },
        }
    }
}

impl Completion for PaymentMethodCompletion {
    const OPERATION: &'static str = "completePaymentMethodSelection";

    fn shape(&self) -> CallShape {
        match self {
            PaymentMethodCompletion::Legacy { .. } => CallShape::Legacy,
            PaymentMethodCompletion::Structured(_) => CallShape::Structured,
        }
    }

    fn outcome(&self) -> Outcome {
        Outcome {
            succeeded: true,
            status: None,
        }
    }
}
