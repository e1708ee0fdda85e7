use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::benchmarks::{BenchmarkKey, BenchmarkTable};
use crate::error::ValuationEngineError;
use crate::types::{CompanyFacts, Money, PerformanceFacts, Percent, Score, ValuationFacts};
use crate::EngineResult;

/// Market size assumed when none is known.
pub const MARKET_SIZE_FALLBACK: Money = dec!(4_000_000);

/// Product readiness assumed when none is known, in percent.
pub const PRODUCT_READINESS_FALLBACK: Percent = dec!(75);

/// Currency metrics stop earning credit past 150% of the benchmark.
const CURRENCY_RATIO_CAP: Decimal = dec!(1.5);

// ---------------------------------------------------------------------------
// Metrics and categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    Finance,
    Team,
    Growth,
    Market,
    Product,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 5] = [
        ScoreCategory::Finance,
        ScoreCategory::Team,
        ScoreCategory::Growth,
        ScoreCategory::Market,
        ScoreCategory::Product,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    Revenue,
    GrossMargin,
    CashOnHand,
    Valuation,
    TeamSize,
    GrowthRate,
    AnnualRoi,
    MarketSize,
    ProductReadiness,
}

impl ScoreMetric {
    pub const ALL: [ScoreMetric; 9] = [
        ScoreMetric::Revenue,
        ScoreMetric::GrossMargin,
        ScoreMetric::CashOnHand,
        ScoreMetric::Valuation,
        ScoreMetric::TeamSize,
        ScoreMetric::GrowthRate,
        ScoreMetric::AnnualRoi,
        ScoreMetric::MarketSize,
        ScoreMetric::ProductReadiness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreMetric::Revenue => "revenue",
            ScoreMetric::GrossMargin => "gross_margin",
            ScoreMetric::CashOnHand => "cash_on_hand",
            ScoreMetric::Valuation => "valuation",
            ScoreMetric::TeamSize => "team_size",
            ScoreMetric::GrowthRate => "growth_rate",
            ScoreMetric::AnnualRoi => "annual_roi",
            ScoreMetric::MarketSize => "market_size",
            ScoreMetric::ProductReadiness => "product_readiness",
        }
    }

    /// Share of the total score. The nine weights sum to 1.
    pub fn weight(self) -> Decimal {
        match self {
            ScoreMetric::Revenue => dec!(0.10),
            ScoreMetric::GrossMargin => dec!(0.10),
            ScoreMetric::CashOnHand => dec!(0.05),
            ScoreMetric::Valuation => dec!(0.05),
            ScoreMetric::TeamSize => dec!(0.15),
            ScoreMetric::GrowthRate => dec!(0.15),
            ScoreMetric::AnnualRoi => dec!(0.10),
            ScoreMetric::MarketSize => dec!(0.15),
            ScoreMetric::ProductReadiness => dec!(0.15),
        }
    }

    pub fn category(self) -> ScoreCategory {
        match self {
            ScoreMetric::Revenue
            | ScoreMetric::GrossMargin
            | ScoreMetric::CashOnHand
            | ScoreMetric::Valuation => ScoreCategory::Finance,
            ScoreMetric::TeamSize => ScoreCategory::Team,
            ScoreMetric::GrowthRate | ScoreMetric::AnnualRoi => ScoreCategory::Growth,
            ScoreMetric::MarketSize => ScoreCategory::Market,
            ScoreMetric::ProductReadiness => ScoreCategory::Product,
        }
    }

    pub fn benchmark_key(self) -> BenchmarkKey {
        match self {
            ScoreMetric::Revenue => BenchmarkKey::Revenue,
            ScoreMetric::GrossMargin => BenchmarkKey::GrossMargin,
            ScoreMetric::CashOnHand => BenchmarkKey::CashOnHand,
            ScoreMetric::Valuation => BenchmarkKey::Valuation,
            ScoreMetric::TeamSize => BenchmarkKey::TeamSize,
            ScoreMetric::GrowthRate => BenchmarkKey::GrowthRate,
            ScoreMetric::AnnualRoi => BenchmarkKey::AnnualRoi,
            ScoreMetric::MarketSize => BenchmarkKey::MarketSize,
            ScoreMetric::ProductReadiness => BenchmarkKey::ProductReadiness,
        }
    }

    /// Currency metrics have their benchmark ratio capped.
    pub fn is_currency(self) -> bool {
        matches!(
            self,
            ScoreMetric::Revenue
                | ScoreMetric::Valuation
                | ScoreMetric::CashOnHand
                | ScoreMetric::MarketSize
        )
    }
}

impl fmt::Display for ScoreMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-metric scoring breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreMetricDetail {
    pub score: Score,
    pub benchmark: Decimal,
    pub value: Decimal,
    /// value / benchmark × 100, after the currency cap
    pub percentage: Percent,
    pub weight: Decimal,
}

/// Facts a score is computed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringInput {
    #[serde(default)]
    pub company: CompanyFacts,
    #[serde(default)]
    pub performance: PerformanceFacts,
    #[serde(default)]
    pub valuation: ValuationFacts,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Metric input after null fallbacks.
pub fn metric_value(metric: ScoreMetric, input: &ScoringInput) -> Decimal {
    let perf = &input.performance;
    let roi = input.valuation.annual_roi;
    match metric {
        ScoreMetric::Revenue => perf.revenue.unwrap_or(Decimal::ZERO),
        ScoreMetric::GrossMargin => perf.gross_margin_pct.unwrap_or(Decimal::ZERO),
        ScoreMetric::CashOnHand => perf.cash_on_hand.unwrap_or(Decimal::ZERO),
        ScoreMetric::Valuation => input
            .valuation
            .selected_valuation
            .unwrap_or(Decimal::ZERO),
        ScoreMetric::TeamSize => input
            .company
            .employee_count
            .map(Decimal::from)
            .unwrap_or(Decimal::ZERO),
        ScoreMetric::GrowthRate => perf.growth_rate_pct.or(roi).unwrap_or(Decimal::ZERO),
        ScoreMetric::AnnualRoi => roi.unwrap_or(Decimal::ZERO),
        ScoreMetric::MarketSize => perf.market_size_ceiling.unwrap_or(MARKET_SIZE_FALLBACK),
        ScoreMetric::ProductReadiness => perf
            .product_readiness_pct
            .unwrap_or(PRODUCT_READINESS_FALLBACK),
    }
}

/// Score one metric against its benchmark. `benchmark` must be positive.
///
/// Ratios too large for a Decimal saturate, so an extreme value still ends
/// in a clamped score.
pub fn evaluate_metric(
    metric: ScoreMetric,
    value: Decimal,
    benchmark: Decimal,
) -> EngineResult<ScoreMetricDetail> {
    if benchmark <= Decimal::ZERO {
        return Err(ValuationEngineError::InvalidInput {
            field: metric.benchmark_key().to_string(),
            reason: format!("Benchmark must be positive, got {benchmark}"),
        });
    }

    let (score, percentage) = if metric == ScoreMetric::AnnualRoi && value <= Decimal::ZERO {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        let mut ratio = value.checked_div(benchmark).unwrap_or(if value.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        });
        if metric.is_currency() {
            ratio = ratio.min(CURRENCY_RATIO_CAP);
        }
        let percentage = ratio.saturating_mul(dec!(100));

        let score = if metric == ScoreMetric::GrowthRate && value < Decimal::ZERO {
            percentage.max(dec!(-100))
        } else {
            percentage.max(Decimal::ZERO).min(dec!(100))
        };
        (score, percentage)
    };

    Ok(ScoreMetricDetail {
        score,
        benchmark,
        value,
        percentage,
        weight: metric.weight(),
    })
}

/// Evaluate all nine metrics.
pub fn evaluate_metrics(
    input: &ScoringInput,
    benchmarks: &BenchmarkTable,
) -> EngineResult<BTreeMap<ScoreMetric, ScoreMetricDetail>> {
    let mut details = BTreeMap::new();
    for metric in ScoreMetric::ALL {
        let value = metric_value(metric, input);
        let benchmark = benchmarks.get(metric.benchmark_key());
        let detail = evaluate_metric(metric, value, benchmark)?;
        debug!(
            metric = metric.as_str(),
            value = %detail.value,
            benchmark = %detail.benchmark,
            score = %detail.score,
            "Metric scored"
        );
        details.insert(metric, detail);
    }
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: Decimal = ScoreMetric::ALL.iter().map(|m| m.weight()).sum();
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn test_small_revenue_against_default_benchmark() {
        let d = evaluate_metric(ScoreMetric::Revenue, dec!(3234), dec!(350000)).unwrap();
        assert_eq!(d.value, dec!(3234));
        assert!((d.percentage - dec!(0.924)).abs() < dec!(0.001), "pct {}", d.percentage);
        assert_eq!(d.score, d.percentage);
    }

    #[test]
    fn test_currency_ratio_capped() {
        let d = evaluate_metric(ScoreMetric::CashOnHand, dec!(1000000), dec!(150000)).unwrap();
        assert_eq!(d.percentage, dec!(150));
        assert_eq!(d.score, dec!(100));
    }

    #[test]
    fn test_percentage_metrics_uncapped() {
        let d = evaluate_metric(ScoreMetric::GrossMargin, dec!(130), dec!(65)).unwrap();
        assert_eq!(d.percentage, dec!(200));
        assert_eq!(d.score, dec!(100));
    }

    #[test]
    fn test_negative_growth_scores_negative() {
        let d = evaluate_metric(ScoreMetric::GrowthRate, dec!(-20), dec!(25)).unwrap();
        assert_eq!(d.score, dec!(-80));
        let d = evaluate_metric(ScoreMetric::GrowthRate, dec!(-90), dec!(25)).unwrap();
        assert_eq!(d.score, dec!(-100));
        assert_eq!(d.percentage, dec!(-360));
    }

    #[test]
    fn test_non_positive_roi_scores_zero() {
        let d = evaluate_metric(ScoreMetric::AnnualRoi, dec!(-15), dec!(20)).unwrap();
        assert_eq!(d.score, Decimal::ZERO);
        assert_eq!(d.percentage, Decimal::ZERO);
        assert_eq!(d.benchmark, dec!(20));
    }

    #[test]
    fn test_extreme_values_clamp_instead_of_overflowing() {
        let huge = dec!(70_000_000_000_000_000_000_000_000_000);
        let d = evaluate_metric(ScoreMetric::GrowthRate, huge, dec!(25)).unwrap();
        assert_eq!(d.score, dec!(100));
        assert_eq!(d.percentage, Decimal::MAX);

        let d = evaluate_metric(ScoreMetric::GrowthRate, -huge, dec!(25)).unwrap();
        assert_eq!(d.score, dec!(-100));

        let d = evaluate_metric(ScoreMetric::TeamSize, huge, dec!(0.5)).unwrap();
        assert_eq!(d.score, dec!(100));

        let d = evaluate_metric(ScoreMetric::Revenue, huge, dec!(0.5)).unwrap();
        assert_eq!(d.percentage, dec!(150));
    }

    #[test]
    fn test_zero_benchmark_rejected() {
        assert!(evaluate_metric(ScoreMetric::Revenue, dec!(10), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_null_fallbacks() {
        let input = ScoringInput {
            valuation: ValuationFacts {
                annual_roi: Some(dec!(12)),
                ..ValuationFacts::default()
            },
            ..ScoringInput::default()
        };
        assert_eq!(metric_value(ScoreMetric::GrowthRate, &input), dec!(12));
        assert_eq!(metric_value(ScoreMetric::MarketSize, &input), dec!(4000000));
        assert_eq!(metric_value(ScoreMetric::ProductReadiness, &input), dec!(75));
        assert_eq!(metric_value(ScoreMetric::Revenue, &input), Decimal::ZERO);
        assert_eq!(metric_value(ScoreMetric::TeamSize, &input), Decimal::ZERO);
    }
}
