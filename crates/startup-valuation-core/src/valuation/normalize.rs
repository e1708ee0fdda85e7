use std::time::Instant;

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::methods::{MethodValues, ValuationMethod};
use crate::error::ValuationEngineError;
use crate::types::{with_metadata, ComputationOutput, Money};
use crate::EngineResult;

/// Default max/min spread that triggers clamping.
pub const DEFAULT_OUTLIER_SPREAD_RATIO: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a standalone normalization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeInput {
    pub values: MethodValues,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outlier_spread_ratio: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationOutcome {
    /// Method values after clamping. Identical to the input when not applied.
    pub values: MethodValues,
    /// Geometric mean of the strictly positive inputs. Reported only.
    pub geometric_mean: Option<Money>,
    /// max / min among the strictly positive inputs
    pub spread_ratio: Option<Decimal>,
    /// Upper median of the positive inputs, when clamping ran
    pub median: Option<Money>,
    pub applied: bool,
    /// Methods whose value was moved
    pub adjusted: Vec<ValuationMethod>,
}

impl NormalizationOutcome {
    /// Outcome that leaves `values` as they are.
    pub fn passthrough(values: &MethodValues) -> Self {
        Self {
            values: values.clone(),
            geometric_mean: None,
            spread_ratio: None,
            median: None,
            applied: false,
            adjusted: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

/// Pull extreme outliers towards the median. When the spread among positive
/// values exceeds `spread_ratio`, every positive value is clamped into
/// `[median / spread_ratio, median * spread_ratio]`. Zeros are left alone.
pub fn normalize_method_values(
    values: &MethodValues,
    spread_ratio: Decimal,
) -> EngineResult<NormalizationOutcome> {
    if let Some((method, value)) = values.iter().find(|(_, v)| **v < Decimal::ZERO) {
        return Err(ValuationEngineError::InvalidInput {
            field: format!("values.{method:?}"),
            reason: format!("Method values must be non-negative, got {value}"),
        });
    }

    let mut positives: Vec<Money> = values
        .values()
        .copied()
        .filter(|v| *v > Decimal::ZERO)
        .collect();

    let mut outcome = NormalizationOutcome::passthrough(values);
    if positives.is_empty() {
        return Ok(outcome);
    }

    positives.sort();
    outcome.geometric_mean = geometric_mean(&positives);

    let min = positives[0];
    let max = positives[positives.len() - 1];
    let spread = max
        .checked_div(min)
        .ok_or_else(|| ValuationEngineError::overflow("normalization spread"))?;
    outcome.spread_ratio = Some(spread);

    if spread <= spread_ratio {
        debug!(spread = %spread, "Method values within spread; no normalization");
        return Ok(outcome);
    }

    let median = positives[positives.len() / 2];
    let lower = median / spread_ratio;
    let upper = median
        .checked_mul(spread_ratio)
        .ok_or_else(|| ValuationEngineError::overflow("normalization upper bound"))?;

    for (method, value) in outcome.values.iter_mut() {
        if value.is_zero() {
            continue;
        }
        let clamped = (*value).max(lower).min(upper);
        if clamped != *value {
            debug!(method = method.label(), from = %value, to = %clamped, "Clamped outlier");
            *value = clamped;
            outcome.adjusted.push(*method);
        }
    }
    outcome.median = Some(median);
    outcome.applied = true;
    info!(spread = %spread, median = %median, adjusted = outcome.adjusted.len(), "Extreme method spread normalized");

    Ok(outcome)
}

/// exp(mean(ln v)). `None` when the logarithm or exponential leaves the
/// Decimal range.
fn geometric_mean(positives: &[Money]) -> Option<Money> {
    let mut log_sum = Decimal::ZERO;
    for v in positives {
        log_sum = log_sum.checked_add(v.checked_ln()?)?;
    }
    let mean_log = log_sum.checked_div(Decimal::from(positives.len()))?;
    mean_log.checked_exp()
}

/// Standalone normalization wrapped in the standard output envelope.
pub fn normalize_values(
    input: &NormalizeInput,
) -> EngineResult<ComputationOutput<NormalizationOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let ratio = input
        .outlier_spread_ratio
        .unwrap_or(DEFAULT_OUTLIER_SPREAD_RATIO);
    if ratio <= Decimal::ONE {
        return Err(ValuationEngineError::InvalidInput {
            field: "outlier_spread_ratio".into(),
            reason: "Outlier spread ratio must exceed 1".into(),
        });
    }

    let outcome = normalize_method_values(&input.values, ratio)?;
    if outcome.applied {
        warnings.push(format!(
            "Method spread {} exceeded {}; {} value(s) clamped towards median",
            outcome.spread_ratio.unwrap_or_default().round_dp(2),
            ratio,
            outcome.adjusted.len()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Median clamp of extreme valuation method outliers",
        &serde_json::json!({ "outlier_spread_ratio": ratio.to_string() }),
        warnings,
        elapsed,
        outcome,
    ))
}
