//! # Reference Tables
//!
//! Version-gated reference data used by request validation.
//!
//! Every entry records the first protocol version that accepts it. Tables
//! only ever grow: the accepted set for version `n + 1` is the set for `n`
//! plus whatever was introduced at `n + 1`.

/// Most recent protocol version the polyfill understands
pub const LATEST_VERSION: u32 = 10;

/// First version whose `complete*` calls take a single update object
pub const STRUCTURED_CALLS_SINCE: u32 = 3;

/// First version that accepts a `"0.00"` total
pub const ZERO_TOTAL_SINCE: u32 = 4;

/// A reference value and the version that introduced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionedEntry {
    pub value: &'static str,
    pub since: u32,
}

const fn entry(value: &'static str, since: u32) -> VersionedEntry {
    VersionedEntry { value, since }
}

/// ISO 3166 country codes
pub static COUNTRY_CODES: &[VersionedEntry] = &[
    entry("AE", 1),
    entry("AT", 1),
    entry("AU", 1),
    entry("BE", 1),
    entry("BG", 1),
    entry("BR", 1),
    entry("CA", 1),
    entry("CH", 1),
    entry("CN", 1),
    entry("CY", 1),
    entry("CZ", 1),
    entry("DE", 1),
    entry("DK", 1),
    entry("EE", 1),
    entry("ES", 1),
    entry("FI", 1),
    entry("FR", 1),
    entry("GB", 1),
    entry("GG", 1),
    entry("GR", 1),
    entry("HK", 1),
    entry("HR", 1),
    entry("HU", 1),
    entry("IE", 1),
    entry("IM", 1),
    entry("IS", 1),
    entry("IT", 1),
    entry("JE", 1),
    entry("JP", 1),
    entry("KZ", 1),
    entry("LI", 1),
    entry("LT", 1),
    entry("LU", 1),
    entry("LV", 1),
    entry("MT", 1),
    entry("NL", 1),
    entry("NO", 1),
    entry("NZ", 1),
    entry("PL", 1),
    entry("PT", 1),
    entry("RO", 1),
    entry("RU", 1),
    entry("SA", 1),
    entry("SG", 1),
    entry("SI", 1),
    entry("SK", 1),
    entry("SM", 1),
    entry("SW", 1),
    entry("TW", 1),
    entry("UA", 1),
    entry("US", 1),
    entry("VA", 1),
];

/// ISO 4217 currency codes
pub static CURRENCY_CODES: &[VersionedEntry] = &[
    entry("AED", 1),
    entry("AUD", 1),
    entry("BGN", 1),
    entry("BRL", 1),
    entry("CAD", 1),
    entry("CHF", 1),
    entry("CNY", 1),
    entry("CZK", 1),
    entry("DKK", 1),
    entry("EUR", 1),
    entry("GBP", 1),
    entry("HKD", 1),
    entry("HRK", 1),
    entry("HUF", 1),
    entry("ISK", 1),
    entry("JPY", 1),
    entry("KZT", 1),
    entry("NOK", 1),
    entry("NZD", 1),
    entry("RON", 1),
    entry("RUB", 1),
    entry("SAR", 1),
    entry("SEK", 1),
    entry("SGD", 1),
    entry("TWD", 1),
    entry("UAH", 1),
    entry("USD", 1),
];

/// Card networks a merchant may request
pub static PAYMENT_NETWORKS: &[VersionedEntry] = &[
    entry("amex", 1),
    entry("discover", 1),
    entry("interac", 1),
    entry("masterCard", 1),
    entry("privateLabel", 1),
    entry("visa", 1),
    entry("jcb", 2),
    entry("cartesBancaires", 4),
    entry("eftpos", 4),
    entry("electron", 4),
    entry("maestro", 4),
    entry("vPay", 4),
    entry("elo", 5),
    entry("mada", 5),
];

/// Merchant capabilities
pub static MERCHANT_CAPABILITIES: &[VersionedEntry] = &[
    entry("supports3DS", 1),
    entry("supportsEMV", 1),
    entry("supportsCredit", 1),
    entry("supportsDebit", 1),
];

/// The four reference tables validation consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTable {
    CountryCodes,
    CurrencyCodes,
    PaymentNetworks,
    MerchantCapabilities,
}

impl ReferenceTable {
    /// All entries, regardless of version
    pub fn entries(self) -> &'static [VersionedEntry] {
        match self {
            ReferenceTable::CountryCodes => COUNTRY_CODES,
            ReferenceTable::CurrencyCodes => CURRENCY_CODES,
            ReferenceTable::PaymentNetworks => PAYMENT_NETWORKS,
            ReferenceTable::MerchantCapabilities => MERCHANT_CAPABILITIES,
        }
    }

    /// Check if `value` is accepted at `version` (case-sensitive)
    pub fn accepts(self, value: &str, version: u32) -> bool {
        self.entries()
            .iter()
            .any(|e| e.value == value && e.since <= version)
    }

    /// Values accepted at `version`, in table order
    pub fn values_for(self, version: u32) -> impl Iterator<Item = &'static str> {
        self.entries()
            .iter()
            .filter(move |e| e.since <= version)
            .map(|e| e.value)
    }

    /// Version that introduced `value`, if it is known at all
    pub fn introduced_in(self, value: &str) -> Option<u32> {
        self.entries()
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.since)
    }
}
