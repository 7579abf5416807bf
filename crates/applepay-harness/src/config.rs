//! # Harness Configuration
//!
//! Policy settings for scenario runs, loaded from an optional TOML file and
//! then overridden by environment variables (a `.env` file is honoured).
//!
//! | Variable                               | Field                          |
//! |----------------------------------------|--------------------------------|
//! | `APPLEPAY_POLICY_FILE`                 | base TOML file                 |
//! | `APPLEPAY_PAYMENTS_ENABLED`            | `payments_enabled`             |
//! | `APPLEPAY_SETUP_STATUS`                | `is_set_up`                    |
//! | `APPLEPAY_MERCHANT_IDENTIFIER`         | `merchant_identifier`          |
//! | `APPLEPAY_SUPPORTED_VERSIONS`          | `supported_versions` (`1,2,3`) |
//! | `APPLEPAY_VALIDATION_URL`              | `validation_url`               |
//! | `APPLEPAY_SHIPPING_CONTACT_TIMEOUT_MS` | `shipping_contact_timeout_ms`  |
//! | `APPLEPAY_AUTHORIZATION_TIMEOUT_MS`    | `authorization_timeout_ms`     |
//! | `APPLEPAY_RELEASE_ON_TIMEOUT`          | `release_on_timeout`           |
//! | `APPLEPAY_LOG_FORMAT`                  | `pretty` or `json`             |

use applepay_core::{PolicyConfig, PolyfillError, PolyfillResult};
use clap::ValueEnum;
use std::env;
use std::str::FromStr;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = PolyfillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(PolyfillError::Configuration(format!(
                "APPLEPAY_LOG_FORMAT must be pretty or json, got {}",
                other
            ))),
        }
    }
}

/// Configuration for a harness run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessConfig {
    pub policy: PolicyConfig,
    pub log_format: LogFormat,
}

impl HarnessConfig {
    /// Load configuration from the environment
    pub fn from_env() -> PolyfillResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PolyfillResult<Self> {
        let mut policy = match lookup("APPLEPAY_POLICY_FILE") {
            Some(path) => {
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    PolyfillError::Configuration(format!("Cannot read {}: {}", path, e))
                })?;
                PolicyConfig::from_toml(&contents)?
            }
            None => PolicyConfig::default(),
        };

        if let Some(value) = lookup("APPLEPAY_PAYMENTS_ENABLED") {
            policy.payments_enabled = parse_bool("APPLEPAY_PAYMENTS_ENABLED", &value)?;
        }
        if let Some(value) = lookup("APPLEPAY_SETUP_STATUS") {
            policy.is_set_up = parse_bool("APPLEPAY_SETUP_STATUS", &value)?;
        }
        if let Some(value) = lookup("APPLEPAY_MERCHANT_IDENTIFIER") {
            policy.merchant_identifier = value;
        }
        if let Some(value) = lookup("APPLEPAY_SUPPORTED_VERSIONS") {
            policy.supported_versions = parse_versions(&value)?;
        }
        if let Some(value) = lookup("APPLEPAY_VALIDATION_URL") {
            policy.validation_url = value;
        }
        if let Some(value) = lookup("APPLEPAY_SHIPPING_CONTACT_TIMEOUT_MS") {
            policy.shipping_contact_timeout_ms =
                parse_number("APPLEPAY_SHIPPING_CONTACT_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("APPLEPAY_AUTHORIZATION_TIMEOUT_MS") {
            policy.authorization_timeout_ms =
                parse_number("APPLEPAY_AUTHORIZATION_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("APPLEPAY_RELEASE_ON_TIMEOUT") {
            policy.release_on_timeout = parse_bool("APPLEPAY_RELEASE_ON_TIMEOUT", &value)?;
        }
        policy.validate()?;

        let log_format = match lookup("APPLEPAY_LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self { policy, log_format })
    }
}

fn parse_bool(key: &str, value: &str) -> PolyfillResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PolyfillError::Configuration(format!(
            "{} must be a boolean, got {}",
            key, value
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> PolyfillResult<u64> {
    value.trim().parse().map_err(|_| {
        PolyfillError::Configuration(format!("{} must be a whole number, got {}", key, value))
    })
}

fn parse_versions(value: &str) -> PolyfillResult<std::collections::BTreeSet<u32>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse().map_err(|_| {
                PolyfillError::Configuration(format!(
                    "APPLEPAY_SUPPORTED_VERSIONS entries must be numbers, got {}",
                    v
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = HarnessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.policy, PolicyConfig::default());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_overrides() {
        let config = HarnessConfig::from_lookup(lookup(&[
            ("APPLEPAY_MERCHANT_IDENTIFIER", "merchant.com.lightning-cart"),
            ("APPLEPAY_PAYMENTS_ENABLED", "false"),
            ("APPLEPAY_SUPPORTED_VERSIONS", "1, 2,3"),
            ("APPLEPAY_AUTHORIZATION_TIMEOUT_MS", "1500"),
            ("APPLEPAY_RELEASE_ON_TIMEOUT", "0"),
            ("APPLEPAY_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.policy.merchant_identifier, "merchant.com.lightning-cart");
        assert!(!config.policy.payments_enabled);
        assert_eq!(
            config.policy.supported_versions.into_iter().collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(config.policy.authorization_timeout_ms, 1500);
        assert!(!config.policy.release_on_timeout);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_values_rejected() {
        for (key, value) in [
            ("APPLEPAY_SETUP_STATUS", "maybe"),
            ("APPLEPAY_SHIPPING_CONTACT_TIMEOUT_MS", "soon"),
            ("APPLEPAY_SUPPORTED_VERSIONS", "1,two"),
            ("APPLEPAY_SUPPORTED_VERSIONS", ""),
            ("APPLEPAY_LOG_FORMAT", "xml"),
            ("APPLEPAY_POLICY_FILE", "/nonexistent/applepay-policy.toml"),
        ] {
            let result = HarnessConfig::from_lookup(lookup(&[(key, value)]));
            assert!(
                matches!(result, Err(PolyfillError::Configuration(_))),
                "{key}={value} accepted"
            );
        }
    }
}
