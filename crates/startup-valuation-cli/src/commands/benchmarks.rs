use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::info;

use startup_valuation_core::benchmarks::{load_benchmarks, BenchmarkKey};
use startup_valuation_core::store::BenchmarkStore;

use super::Context;

#[derive(Args)]
pub struct BenchmarksArgs {
    #[command(subcommand)]
    pub command: BenchmarksCommand,
}

#[derive(Subcommand)]
pub enum BenchmarksCommand {
    /// Show the resolved benchmark table and where each value came from
    Show {
        /// Apply this industry's stored values under the user overrides
        #[arg(long)]
        industry: Option<String>,
    },
    /// Save user overrides, e.g. `avg_revenue=500000`
    Set {
        /// One or more `metric=value` pairs
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Drop all user overrides
    Reset,
}

/// Parse `metric=value`, rejecting unknown metrics and non-positive values.
fn parse_override(raw: &str) -> Result<(BenchmarkKey, Decimal), Box<dyn std::error::Error>> {
    let (metric, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected metric=value, got '{raw}'"))?;
    let key: BenchmarkKey = metric.parse()?;
    let value: Decimal = value
        .trim()
        .parse()
        .map_err(|e| format!("Invalid value for {key}: {e}"))?;
    if value <= Decimal::ZERO {
        return Err(format!("Benchmark {key} must be positive, got {value}").into());
    }
    Ok((key, value))
}

pub fn run_benchmarks(args: BenchmarksArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let mut store = ctx.store();

    match args.command {
        BenchmarksCommand::Show { industry } => {
            let mut warnings = Vec::new();
            let table = load_benchmarks(&store, industry.as_deref(), &mut warnings);
            let rows: Vec<Value> = table
                .entries()
                .iter()
                .map(|(key, entry)| {
                    json!({
                        "metric": key.as_str(),
                        "value": entry.value,
                        "source": entry.source,
                    })
                })
                .collect();
            Ok(json!({ "results": rows, "warnings": warnings }))
        }
        BenchmarksCommand::Set { values } => {
            let mut overrides = store.load_user_benchmarks()?;
            for raw in &values {
                let (key, value) = parse_override(raw)?;
                overrides.insert(key.as_str().to_string(), value);
            }
            store.save_user_benchmarks(&overrides)?;
            info!(count = values.len(), "User benchmarks saved");
            Ok(json!({ "result": overrides }))
        }
        BenchmarksCommand::Reset => {
            store.reset_user_benchmarks()?;
            info!("User benchmarks reset");
            Ok(json!({ "result": { "reset": true } }))
        }
    }
}
