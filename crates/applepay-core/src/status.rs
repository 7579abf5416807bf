//! # Status Codes
//!
//! The `STATUS_*` constants of the native API, as a closed enum.

use crate::error::PolyfillError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status a page reports back to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum StatusCode {
    Success = 0,
    Failure = 1,
    InvalidBillingPostalAddress = 2,
    InvalidShippingPostalAddress = 3,
    InvalidShippingContact = 4,
    PinRequired = 5,
    PinIncorrect = 6,
    PinLockout = 7,
}

impl StatusCode {
    /// Every status, in numeric order
    pub const ALL: [StatusCode; 8] = [
        StatusCode::Success,
        StatusCode::Failure,
        StatusCode::InvalidBillingPostalAddress,
        StatusCode::InvalidShippingPostalAddress,
        StatusCode::InvalidShippingContact,
        StatusCode::PinRequired,
        StatusCode::PinIncorrect,
        StatusCode::PinLockout,
    ];

    /// Numeric value of the constant
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }

    /// Name of the static constant on `ApplePaySession`
    pub fn constant_name(self) -> &'static str {
        match self {
            StatusCode::Success => "STATUS_SUCCESS",
            StatusCode::Failure => "STATUS_FAILURE",
            StatusCode::InvalidBillingPostalAddress => "STATUS_INVALID_BILLING_POSTAL_ADDRESS",
            StatusCode::InvalidShippingPostalAddress => "STATUS_INVALID_SHIPPING_POSTAL_ADDRESS",
            StatusCode::InvalidShippingContact => "STATUS_INVALID_SHIPPING_CONTACT",
            StatusCode::PinRequired => "STATUS_PIN_REQUIRED",
            StatusCode::PinIncorrect => "STATUS_PIN_INCORRECT",
            StatusCode::PinLockout => "STATUS_PIN_LOCKOUT",
        }
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Success
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = PolyfillError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        StatusCode::ALL
            .get(code as usize)
            .copied()
            .ok_or(PolyfillError::UnknownStatus { code: code as u32 })
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.constant_name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_values() {
        assert_eq!(StatusCode::Success.code(), 0);
        assert_eq!(StatusCode::Failure.code(), 1);
        assert_eq!(StatusCode::InvalidShippingContact.code(), 4);
        assert_eq!(StatusCode::PinLockout.code(), 7);

        for (i, status) in StatusCode::ALL.iter().enumerate() {
            assert_eq!(status.code() as usize, i);
        }
    }

    #[test]
    fn test_try_from() {
        assert_eq!(StatusCode::try_from(3).unwrap(), StatusCode::InvalidShippingPostalAddress);
        assert_eq!(
            StatusCode::try_from(8).unwrap_err(),
            PolyfillError::UnknownStatus { code: 8 }
        );
    }

    #[test]
    fn test_serde_as_number() {
        assert_eq!(serde_json::to_string(&StatusCode::PinRequired).unwrap(), "5");
        let status: StatusCode = serde_json::from_str("1").unwrap();
        assert_eq!(status, StatusCode::Failure);
        assert!(serde_json::from_str::<StatusCode>("9").is_err());
    }
}
