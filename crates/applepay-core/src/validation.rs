//! # Request Validation
//!
//! Construction-time checks on a [`PaymentRequest`].
//!
//! All presence checks run first, in field order (country, currency,
//! networks, capabilities, total label, total amount). Only a complete
//! request is then checked against the reference tables for its version,
//! in the same order. List entries are checked in the order given and the
//! first bad one is reported.

use crate::config::PolicyConfig;
use crate::error::{PolyfillError, PolyfillResult, RequiredField};
use crate::request::PaymentRequest;
use crate::tables::{ReferenceTable, ZERO_TOTAL_SINCE};
use regex::Regex;
use std::sync::OnceLock;

/// Amount pattern: whole units with an optional two-digit fraction
pub const AMOUNT_PATTERN: &str = r"^[0-9]+(\.[0-9][0-9])?$";

fn amount_regex() -> &'static Regex {
    static AMOUNT: OnceLock<Regex> = OnceLock::new();
    AMOUNT.get_or_init(|| Regex::new(AMOUNT_PATTERN).expect("amount pattern compiles"))
}

/// Check an amount string as the given version would
pub fn is_valid_amount(amount: &str, version: u32) -> bool {
    if !amount_regex().is_match(amount) {
        return false;
    }
    version >= ZERO_TOTAL_SINCE || amount != "0.00"
}

/// The first required field the request lacks, if any
pub fn first_missing_field(request: &PaymentRequest) -> Option<RequiredField> {
    if request.country_code.is_none() {
        return Some(RequiredField::CountryCode);
    }
    if request.currency_code.is_none() {
        return Some(RequiredField::CurrencyCode);
    }
    if request.supported_networks.is_empty() {
        return Some(RequiredField::SupportedNetworks);
    }
    if request.merchant_capabilities.is_empty() {
        return Some(RequiredField::MerchantCapabilities);
    }
    let total = match &request.total {
        Some(total) => total,
        None => return Some(RequiredField::TotalLabel),
    };
    if total.label.is_none() {
        return Some(RequiredField::TotalLabel);
    }
    if total.amount.is_none() {
        return Some(RequiredField::TotalAmount);
    }
    None
}

/// Validate a request for `version` against the configured versions and
/// the reference tables. Does not look at the active-session guard.
pub fn validate_request(
    config: &PolicyConfig,
    version: u32,
    request: &PaymentRequest,
) -> PolyfillResult<()> {
    if !config.supports_version(version) {
        return Err(PolyfillError::UnsupportedVersion { version });
    }

    if let Some(field) = first_missing_field(request) {
        return Err(PolyfillError::MissingField(field));
    }

    let country = request.country_code.as_deref().unwrap_or_default();
    if !ReferenceTable::CountryCodes.accepts(country, version) {
        return Err(PolyfillError::InvalidCountryCode {
            code: country.to_string(),
        });
    }

    let currency = request.currency_code.as_deref().unwrap_or_default();
    if !ReferenceTable::CurrencyCodes.accepts(currency, version) {
        return Err(PolyfillError::InvalidCurrencyCode {
            code: currency.to_string(),
        });
    }

    if let Some(network) = request
        .supported_networks
        .iter()
        .find(|n| !ReferenceTable::PaymentNetworks.accepts(n, version))
    {
        return Err(PolyfillError::InvalidNetwork {
            network: network.clone(),
        });
    }

    if let Some(capability) = request
        .merchant_capabilities
        .iter()
        .find(|c| !ReferenceTable::MerchantCapabilities.accepts(c, version))
    {
        return Err(PolyfillError::InvalidCapability {
            capability: capability.clone(),
        });
    }

    let amount = request.total_amount().unwrap_or_default();
    if !is_valid_amount(amount, version) {
        return Err(PolyfillError::InvalidAmount {
            amount: amount.to_string(),
        });
    }

    Ok(())
}
