use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::{evaluate_metrics, ScoreCategory, ScoreMetric, ScoreMetricDetail, ScoringInput};
use crate::benchmarks::BenchmarkTable;
use crate::store::ScoreRecord;
use crate::types::{with_metadata, ComputationOutput, Score};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    VeryGood,
    Good,
    Average,
    BelowAverage,
    Poor,
    Critical,
}

impl ScoreTier {
    pub fn from_total(total: Score) -> Self {
        if total >= dec!(80) {
            ScoreTier::Excellent
        } else if total >= dec!(70) {
            ScoreTier::VeryGood
        } else if total >= dec!(60) {
            ScoreTier::Good
        } else if total >= dec!(50) {
            ScoreTier::Average
        } else if total >= dec!(40) {
            ScoreTier::BelowAverage
        } else if total >= dec!(30) {
            ScoreTier::Poor
        } else {
            ScoreTier::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "Excellent",
            ScoreTier::VeryGood => "Very Good",
            ScoreTier::Good => "Good",
            ScoreTier::Average => "Average",
            ScoreTier::BelowAverage => "Below Average",
            ScoreTier::Poor => "Poor",
            ScoreTier::Critical => "Critical",
        }
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Score data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreData {
    /// Flat weighted sum over all nine metrics
    pub total_score: Score,
    pub finance_score: Score,
    pub team_score: Score,
    pub growth_score: Score,
    pub market_score: Score,
    pub product_score: Score,
    pub tier: ScoreTier,
    pub details: BTreeMap<ScoreMetric, ScoreMetricDetail>,
}

impl ScoreData {
    pub fn category_score(&self, category: ScoreCategory) -> Score {
        match category {
            ScoreCategory::Finance => self.finance_score,
            ScoreCategory::Team => self.team_score,
            ScoreCategory::Growth => self.growth_score,
            ScoreCategory::Market => self.market_score,
            ScoreCategory::Product => self.product_score,
        }
    }

    /// Coarse persisted form: integer-rounded scores, no details.
    pub fn to_record(&self, company_id: &str, calculated_at: DateTime<Utc>) -> ScoreRecord {
        ScoreRecord {
            company_id: company_id.to_string(),
            total_score: round_score(self.total_score),
            finance_score: round_score(self.finance_score),
            team_score: round_score(self.team_score),
            growth_score: round_score(self.growth_score),
            market_score: round_score(self.market_score),
            product_score: round_score(self.product_score),
            calculation_date: calculated_at,
        }
    }

    /// Per-metric breakdown as a JSON blob keyed by metric name.
    pub fn details_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.details).unwrap_or_default()
    }
}

fn round_score(score: Score) -> Score {
    score.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Weighted mean of the metric scores within one category.
pub fn category_score(
    details: &BTreeMap<ScoreMetric, ScoreMetricDetail>,
    category: ScoreCategory,
) -> Score {
    let (weighted, weight) = details
        .iter()
        .filter(|(m, _)| m.category() == category)
        .fold((Decimal::ZERO, Decimal::ZERO), |(sum, w), (_, d)| {
            (sum + d.score * d.weight, w + d.weight)
        });
    if weight.is_zero() {
        Decimal::ZERO
    } else {
        weighted / weight
    }
}

/// Roll metric details up into category and total scores.
///
/// The total is the flat weighted sum over every metric, not a blend of the
/// category scores.
pub fn aggregate(details: BTreeMap<ScoreMetric, ScoreMetricDetail>) -> ScoreData {
    let total_score: Score = details.values().map(|d| d.score * d.weight).sum();
    ScoreData {
        total_score,
        finance_score: category_score(&details, ScoreCategory::Finance),
        team_score: category_score(&details, ScoreCategory::Team),
        growth_score: category_score(&details, ScoreCategory::Growth),
        market_score: category_score(&details, ScoreCategory::Market),
        product_score: category_score(&details, ScoreCategory::Product),
        tier: ScoreTier::from_total(total_score),
        details,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Score a company against the resolved benchmark table.
pub fn calculate_startup_score(
    input: &ScoringInput,
    benchmarks: &BenchmarkTable,
) -> EngineResult<ComputationOutput<ScoreData>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let details = evaluate_metrics(input, benchmarks)?;
    let data = aggregate(details);

    if let Some(growth) = data.details.get(&ScoreMetric::GrowthRate) {
        if growth.score < Decimal::ZERO {
            warnings.push(format!(
                "Negative growth rate ({}%) lowers the total score",
                growth.value
            ));
        }
    }
    for (metric, detail) in &data.details {
        if metric.is_currency() && detail.percentage >= dec!(150) {
            warnings.push(format!(
                "{metric} at or above 150% of benchmark; credit capped"
            ));
        }
    }

    info!(total = %data.total_score.round_dp(2), tier = %data.tier, "Startup score calculated");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Benchmark-relative weighted metric scoring",
        &serde_json::json!({
            "weights": ScoreMetric::ALL
                .iter()
                .map(|m| (m.as_str(), m.weight().to_string()))
                .collect::<BTreeMap<_, _>>(),
            "benchmarks": benchmarks.to_overrides(),
        }),
        warnings,
        elapsed,
        data,
    ))
}
