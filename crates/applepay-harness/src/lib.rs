//! # applepay-harness
//!
//! Drives the simulated `ApplePaySession` from scripted scenarios on a
//! tokio runtime, so checkout pages can be rehearsed without a browser.
//!
//! - [`config`]: policy settings from a TOML file and `APPLEPAY_*` variables
//! - [`scenario`]: the TOML scenario format
//! - [`runner`]: plays a scenario and returns a JSON-serializable transcript

pub mod config;
pub mod runner;
pub mod scenario;

pub use config::{HarnessConfig, LogFormat};
pub use runner::{run_scenario, Entry, Transcript};
pub use scenario::{Scenario, Step};
