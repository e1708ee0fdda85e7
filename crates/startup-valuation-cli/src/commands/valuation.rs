use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use startup_valuation_core::valuation::{
    calculate_valuation, normalize_values, NormalizeInput, ValuationInput,
};
use startup_valuation_core::{CompanyFacts, ValuationFacts};

use super::{to_value, Context};
use crate::input;

/// Arguments for the five-method valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValuationArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Funding stage (pre-seed, angel, seed, growth, series a)
    #[arg(long)]
    pub stage: Option<String>,

    /// Last annual revenue
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Head count
    #[arg(long)]
    pub employees: Option<u32>,

    #[arg(long)]
    pub industry: Option<String>,

    /// Annual ROI in percent (e.g. 40 for 40%)
    #[arg(long)]
    pub annual_roi: Option<Decimal>,

    /// Last year EBITDA
    #[arg(long)]
    pub ebitda: Option<Decimal>,

    /// EV/EBITDA multiple for the industry
    #[arg(long)]
    pub industry_multiple: Option<Decimal>,

    /// Valuation already chosen by the user; kept on write-back
    #[arg(long)]
    pub selected_valuation: Option<Decimal>,
}

/// Arguments for outlier normalisation of method values
#[derive(Args)]
pub struct NormalizeArgs {
    /// Path to JSON input file with `values` keyed by method
    #[arg(long)]
    pub input: Option<String>,

    /// max/min spread that triggers clamping (defaults to the configured ratio)
    #[arg(long)]
    pub spread_ratio: Option<Decimal>,
}

pub fn run_valuation(args: ValuationArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation_input: ValuationInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => ValuationInput {
            company: CompanyFacts {
                employee_count: args.employees,
                industry: args.industry,
                stage: args.stage,
                last_revenue: args.revenue,
                ..CompanyFacts::default()
            },
            valuation: ValuationFacts {
                annual_roi: args.annual_roi,
                last_year_ebitda: args.ebitda,
                industry_multiple: args.industry_multiple,
                selected_valuation: args.selected_valuation,
                ..ValuationFacts::default()
            },
            weights: None,
        },
    };

    let result = calculate_valuation(&valuation_input, &ctx.config)?;
    to_value(&result)
}

pub fn run_normalize(args: NormalizeArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let mut normalize_input: NormalizeInput = input::require_input(args.input.as_deref(), "Method values")?;
    if let Some(ratio) = args.spread_ratio {
        normalize_input.outlier_spread_ratio = Some(ratio);
    }
    if normalize_input.outlier_spread_ratio.is_none() {
        normalize_input.outlier_spread_ratio = Some(ctx.config.methods.outlier_spread_ratio);
    }

    let result = normalize_values(&normalize_input)?;
    to_value(&result)
}
