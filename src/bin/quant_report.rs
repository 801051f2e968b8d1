//! Run the full return, risk and forecast analysis on a CSV price file and
//! print the report as JSON.
//!
//! ```text
//! RUST_LOG=debug quant_report prices.csv --column close --horizon 10
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quant_engine::data::load_prices;
use quant_engine::{QuantEngine, ReportOptions};
use risk_analytics::VarMethod;
use trade_math::{EngineConfig, Frequency};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Return, risk and forecast report for one price series")]
struct Cli {
    /// CSV file with a header row, oldest observation first
    input: PathBuf,

    /// Name of the price column
    #[arg(long, default_value = "close")]
    column: String,

    /// TOML engine configuration; defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forecast horizon, overriding the configured one
    #[arg(long)]
    horizon: Option<usize>,

    /// VaR confidence level [default: 0.95]
    #[arg(long)]
    confidence: Option<f64>,

    /// historical, parametric or monte-carlo [default: historical]
    #[arg(long, value_parser = parse_var_method)]
    var_method: Option<VarMethod>,

    /// daily, weekly, monthly, quarterly or annual
    #[arg(long, value_parser = parse_frequency)]
    frequency: Option<Frequency>,

    /// JSON file with report options (models, indicator windows)
    #[arg(long)]
    options: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn parse_var_method(s: &str) -> std::result::Result<VarMethod, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown VaR method '{}'", s))
}

fn parse_frequency(s: &str) -> std::result::Result<Frequency, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase()))
        .map_err(|_| format!("unknown frequency '{}'", s))
}

/// Options file (or defaults) with every flag the user passed applied on top
fn report_options(cli: &Cli) -> Result<ReportOptions> {
    let mut options = match &cli.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading options {}", path.display()))?;
            serde_json::from_str(&text).context("parsing report options")?
        }
        None => ReportOptions::default(),
    };
    if let Some(confidence) = cli.confidence {
        options.confidence = confidence;
    }
    if let Some(method) = cli.var_method {
        options.var_method = method;
    }
    options.horizon = cli.horizon.or(options.horizon);
    options.frequency = cli.frequency.or(options.frequency);
    Ok(options)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let precision = config.precision;
    let engine = QuantEngine::new(config)?;

    let options = report_options(&cli)?;

    let prices = load_prices(&cli.input, &cli.column)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    info!(rows = prices.len(), input = %cli.input.display(), "loaded price series");

    let report = engine.analyze_prices(&prices, &options)?;
    for line in report.summary(precision).lines() {
        info!("{}", line);
    }

    let json = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{}", json);
    Ok(())
}
