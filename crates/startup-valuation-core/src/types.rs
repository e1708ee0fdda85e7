use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency amounts: revenue, cash, valuations, investment.
pub type Money = Decimal;

/// Fractional rates such as the DCF discount rate (0.25 means 25%).
pub type Rate = Decimal;

/// Values expressed on a 0-100 percentage scale (33 = 33%).
pub type Percent = Decimal;

/// Industry and revenue multiples applied to EBITDA or revenue.
pub type Multiple = Decimal;

/// Metric and category scores, nominally 0-100.
pub type Score = Decimal;

/// Business attributes of the company being assessed. Snapshot per calculation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_activity: Option<String>,
    /// Declared lifecycle stage, free text ("seed", "Series A", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_revenue: Option<Money>,
}

/// Valuation record facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_money_valuation: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_valuation: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_money_valuation: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_year_ebitda: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_multiple: Option<Multiple>,
    /// Annual ROI in percent; doubles as the required growth rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_roi: Option<Percent>,
}

/// Business performance inputs for scoring. `None` means unknown, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_margin_pct: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_on_hand: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_size_ceiling: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_readiness_pct: Option<Percent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate_pct: Option<Percent>,
}

/// Envelope around every valuation, scoring and assessment result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    /// Short name of the valuation or scoring approach that produced `result`.
    pub methodology: String,
    /// Configuration and stage inputs the calculation ran with.
    pub assumptions: serde_json::Value,
    /// Fallbacks, ignored benchmarks and persistence failures, in order.
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    /// Engine crate version.
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Number representation all amounts, rates and scores are computed in.
const PRECISION: &str = "rust_decimal_128bit";

/// Wrap an engine result in the envelope. Assumptions that fail to
/// serialize are recorded as null.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: PRECISION.to_string(),
        },
    }
}
