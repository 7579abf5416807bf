//! # Polyfill Error Types
//!
//! Typed error handling for the ApplePaySession polyfill.
//! Every session operation returns `Result<T, PolyfillError>`.
//!
//! The `Display` text of the validation variants matches the messages the
//! page would see thrown by the browser polyfill.

use crate::events::HandlerSlot;
use crate::session::Stage;
use std::fmt;
use thiserror::Error;

/// A request field that must be present before any other check runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredField {
    CountryCode,
    CurrencyCode,
    SupportedNetworks,
    MerchantCapabilities,
    TotalLabel,
    TotalAmount,
}

impl RequiredField {
    /// Human-readable field description used in error messages
    pub fn description(&self) -> &'static str {
        match self {
            RequiredField::CountryCode => "country code",
            RequiredField::CurrencyCode => "currency code",
            RequiredField::SupportedNetworks => "supported networks",
            RequiredField::MerchantCapabilities => "merchant capabilities",
            RequiredField::TotalLabel => "total label",
            RequiredField::TotalAmount => "total amount",
        }
    }

    /// Text thrown when the field is absent
    pub fn message(&self) -> &'static str {
        match self {
            RequiredField::CountryCode => "Missing country code.",
            RequiredField::CurrencyCode => "Missing currency code.",
            // No trailing period on these two
            RequiredField::SupportedNetworks => "Missing supported networks",
            RequiredField::MerchantCapabilities => "Missing merchant capabilities",
            RequiredField::TotalLabel => "Missing total label.",
            RequiredField::TotalAmount => "Missing total amount.",
        }
    }
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Core error type for all polyfill operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolyfillError {
    /// Another session still holds the page-wide guard
    #[error("Page already has an active payment session.")]
    ActiveSessionExists,

    /// Requested protocol version is not in the supported set
    #[error("\"{version}\" is not a supported version.")]
    UnsupportedVersion { version: u32 },

    /// A required request field is absent (or an empty list)
    #[error("{}", .0.message())]
    MissingField(RequiredField),

    #[error("\"{code}\" is not valid country code.")]
    InvalidCountryCode { code: String },

    #[error("\"{code}\" is not valid currency code.")]
    InvalidCurrencyCode { code: String },

    #[error("\"{network}\" is not valid payment network.")]
    InvalidNetwork { network: String },

    #[error("\"{capability}\" is not valid merchant capability.")]
    InvalidCapability { capability: String },

    #[error("\"{amount}\" is not a valid amount.")]
    InvalidAmount { amount: String },

    /// Operation called from a stage that does not accept it
    #[error("Cannot call {operation}() while the session is {stage}.")]
    InvalidState {
        operation: &'static str,
        stage: Stage,
    },

    /// A handler the current stage must invoke was never assigned
    #[error("No {slot} handler is registered.")]
    HandlerNotRegistered { slot: HandlerSlot },

    /// Factory hook left at its default
    #[error("You must implement ApplePaySessionPolyfill.{hook}()")]
    FactoryNotConfigured { hook: &'static str },

    /// Factory hook ran but could not produce a payload
    #[error("Factory hook {hook}() failed: {message}")]
    FactoryFailed { hook: &'static str, message: String },

    /// Status code outside the STATUS_* constants
    #[error("\"{code}\" is not a valid status code.")]
    UnknownStatus { code: u32 },

    /// Configuration errors (malformed file or environment values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PolyfillError {
    /// Returns true if this error was raised by construction-time validation
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            PolyfillError::ActiveSessionExists
                | PolyfillError::UnsupportedVersion { .. }
                | PolyfillError::MissingField(_)
                | PolyfillError::InvalidCountryCode { .. }
                | PolyfillError::InvalidCurrencyCode { .. }
                | PolyfillError::InvalidNetwork { .. }
                | PolyfillError::InvalidCapability { .. }
                | PolyfillError::InvalidAmount { .. }
        )
    }

    /// Returns true if the caller broke the stage-sequencing contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PolyfillError::InvalidState { .. }
                | PolyfillError::HandlerNotRegistered { .. }
        )
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            PolyfillError::ActiveSessionExists => "active_session_exists",
            PolyfillError::UnsupportedVersion { .. } => "unsupported_version",
            PolyfillError::MissingField(_) => "missing_field",
            PolyfillError::InvalidCountryCode { .. } => "invalid_country_code",
            PolyfillError::InvalidCurrencyCode { .. } => "invalid_currency_code",
            PolyfillError::InvalidNetwork { .. } => "invalid_network",
            PolyfillError::InvalidCapability { .. } => "invalid_capability",
            PolyfillError::InvalidAmount { .. } => "invalid_amount",
            PolyfillError::InvalidState { .. } => "invalid_state",
            PolyfillError::HandlerNotRegistered { .. } => "handler_not_registered",
            PolyfillError::FactoryNotConfigured { .. } => "factory_not_configured",
            PolyfillError::FactoryFailed { .. } => "factory_failed",
            PolyfillError::UnknownStatus { .. } => "unknown_status",
            PolyfillError::Configuration(_) => "configuration",
            PolyfillError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for PolyfillError {
    fn from(err: serde_json::Error) -> Self {
        PolyfillError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PolyfillError {
    fn from(err: toml::de::Error) -> Self {
        PolyfillError::Configuration(err.to_string())
    }
}

/// Result type alias for polyfill operations
pub type PolyfillResult<T> = Result<T, PolyfillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_page_visible_text() {
        assert_eq!(
            PolyfillError::ActiveSessionExists.to_string(),
            "Page already has an active payment session."
        );
        assert_eq!(
            PolyfillError::UnsupportedVersion { version: 42 }.to_string(),
            "\"42\" is not a supported version."
        );
        assert_eq!(
            PolyfillError::MissingField(RequiredField::CountryCode).to_string(),
            "Missing country code."
        );
        assert_eq!(
            PolyfillError::MissingField(RequiredField::SupportedNetworks).to_string(),
            "Missing supported networks"
        );
        assert_eq!(
            PolyfillError::MissingField(RequiredField::MerchantCapabilities).to_string(),
            "Missing merchant capabilities"
        );
        assert_eq!(
            PolyfillError::MissingField(RequiredField::TotalAmount).to_string(),
            "Missing total amount."
        );
        assert_eq!(
            PolyfillError::InvalidAmount {
                amount: "12.3".into()
            }
            .to_string(),
            "\"12.3\" is not a valid amount."
        );
        assert_eq!(
            PolyfillError::FactoryNotConfigured {
                hook: "createPaymentToken"
            }
            .to_string(),
            "You must implement ApplePaySessionPolyfill.createPaymentToken()"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(PolyfillError::ActiveSessionExists.is_validation_error());
        assert!(PolyfillError::InvalidNetwork {
            network: "bitcoin".into()
        }
        .is_validation_error());
        assert!(!PolyfillError::Configuration("x".into()).is_validation_error());

        let err = PolyfillError::InvalidState {
            operation: "begin",
            stage: Stage::Completed,
        };
        assert!(err.is_contract_violation());
        assert_eq!(err.code(), "invalid_state");
        assert_eq!(
            err.to_string(),
            "Cannot call begin() while the session is completed."
        );
    }
}
