use clap::Args;
use serde_json::Value;

use startup_valuation_core::benchmarks::load_benchmarks;
use startup_valuation_core::engine::{assess, AssessmentRequest};

use super::{prepend_warnings, to_value, Context};
use crate::input;

/// Arguments for a full assessment (valuation, write-back, score)
#[derive(Args)]
pub struct AssessArgs {
    /// Path to JSON assessment request
    #[arg(long)]
    pub input: Option<String>,

    /// Industry whose stored benchmarks apply (defaults to the company's)
    #[arg(long)]
    pub industry: Option<String>,
}

pub fn run_assess(args: AssessArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let request: AssessmentRequest = input::require_input(args.input.as_deref(), "Assessment request")?;
    let mut store = ctx.store();

    let mut warnings = Vec::new();
    let industry = args
        .industry
        .or_else(|| request.company.as_ref().and_then(|c| c.industry.clone()));
    let table = load_benchmarks(&store, industry.as_deref(), &mut warnings);

    let result = assess(&request, &ctx.config, &table, &mut store)?;
    Ok(prepend_warnings(to_value(&result)?, warnings))
}
