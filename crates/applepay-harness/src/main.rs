//! # applepay-sim
//!
//! Replays an ApplePaySession scenario and prints the transcript.
//!
//! ## Usage
//!
//! ```bash
//! # Optional policy overrides
//! export APPLEPAY_MERCHANT_IDENTIFIER=merchant.com.example
//! export APPLEPAY_AUTHORIZATION_TIMEOUT_MS=5000
//!
//! applepay-sim crates/applepay-harness/scenarios/checkout.toml
//! applepay-sim scenarios/timeout.toml --protocol-version 2 --format summary
//! ```

use anyhow::Context;
use applepay_harness::{run_scenario, HarnessConfig, LogFormat, Scenario, Transcript};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Transcript output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Output {
    #[default]
    Json,
    Summary,
}

#[derive(Debug, Parser)]
#[command(name = "applepay-sim", version, about = "Replay ApplePaySession scenarios")]
struct Cli {
    /// Scenario TOML file
    scenario: PathBuf,

    /// Override the scenario's protocol version
    #[arg(long)]
    protocol_version: Option<u32>,

    /// Transcript format on stdout
    #[arg(long, value_enum, default_value_t = Output::Json)]
    format: Output,

    /// Log format on stderr (overrides APPLEPAY_LOG_FORMAT)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = HarnessConfig::from_env().context("Invalid APPLEPAY_* configuration")?;

    init_tracing(cli.log_format.unwrap_or(config.log_format));
    print_banner();

    let mut scenario = Scenario::from_file(&cli.scenario)?;
    if let Some(version) = cli.protocol_version {
        scenario.version = version;
    }

    info!("Scenario: {}", cli.scenario.display());
    info!("Merchant: {}", config.policy.merchant_identifier);

    let transcript = run_scenario(&scenario, config.policy).await;

    match cli.format {
        Output::Json => println!("{}", serde_json::to_string_pretty(&transcript)?),
        Output::Summary => print_summary(&transcript),
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }
}

fn print_summary(transcript: &Transcript) {
    println!("scenario:       {}", transcript.scenario);
    println!("version:        {}", transcript.version);
    println!("events:         {}", transcript.events().len());
    for event in transcript.events() {
        println!("  - {}", event.slot());
    }
    println!("abandonments:   {}", transcript.abandonments().len());
    for (action, error) in transcript.failed_steps() {
        println!("failed step:    {} ({})", action, error);
    }
    match transcript.final_stage {
        Some(stage) => println!("final stage:    {}", stage),
        None => println!("final stage:    (no session)"),
    }
    if let Some(status) = transcript.payment_status {
        println!("payment status: {}", status);
    }
    println!("guard held:     {}", transcript.active_session);
}

fn print_banner() {
    eprintln!(
        r#"
  ApplePaySession simulator
  ━━━━━━━━━━━━━━━━━━━━━━━━━
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
