use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::methods::{evaluate_all, CompanyStage, MethodValues, ValuationMethod};
use super::normalize::{normalize_method_values, NormalizationOutcome};
use crate::config::EngineConfig;
use crate::error::ValuationEngineError;
use crate::store::ValuationUpdate;
use crate::types::{with_metadata, CompanyFacts, ComputationOutput, Money, Rate, ValuationFacts};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Blend weight for one method. Weights need not sum to 100; the sum of the
/// enabled weights is the denominator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodWeightConfig {
    pub weight: Decimal,
    pub enabled: bool,
}

impl MethodWeightConfig {
    pub fn on(weight: Decimal) -> Self {
        Self {
            weight,
            enabled: true,
        }
    }

    pub fn off() -> Self {
        Self {
            weight: Decimal::ZERO,
            enabled: false,
        }
    }
}

pub type MethodWeights = BTreeMap<ValuationMethod, MethodWeightConfig>;

/// Default blend for a lifecycle stage. Order: scorecard, checklist, venture
/// capital, DCF growth, DCF multiple.
pub fn stage_weights(stage: &CompanyStage) -> MethodWeights {
    let table = match stage {
        CompanyStage::PreSeed | CompanyStage::Angel => [
            MethodWeightConfig::on(dec!(40)),
            MethodWeightConfig::on(dec!(40)),
            MethodWeightConfig::on(dec!(20)),
            MethodWeightConfig::off(),
            MethodWeightConfig::off(),
        ],
        CompanyStage::Seed => [
            MethodWeightConfig::on(dec!(30)),
            MethodWeightConfig::on(dec!(30)),
            MethodWeightConfig::on(dec!(20)),
            MethodWeightConfig::on(dec!(10)),
            MethodWeightConfig::on(dec!(10)),
        ],
        CompanyStage::Growth | CompanyStage::SeriesA => [
            MethodWeightConfig::on(dec!(10)),
            MethodWeightConfig::on(dec!(10)),
            MethodWeightConfig::on(dec!(20)),
            MethodWeightConfig::on(dec!(30)),
            MethodWeightConfig::on(dec!(30)),
        ],
        CompanyStage::Other(_) => [MethodWeightConfig::on(dec!(20)); 5],
    };
    ValuationMethod::ALL.into_iter().zip(table).collect()
}

fn validate_weights(weights: &MethodWeights) -> EngineResult<()> {
    for (method, cfg) in weights {
        if cfg.weight < Decimal::ZERO {
            return Err(ValuationEngineError::InvalidInput {
                field: format!("weights.{method:?}"),
                reason: format!("Weight must be non-negative, got {}", cfg.weight),
            });
        }
    }
    Ok(())
}

/// Weighted average over enabled methods. Zero when no enabled weight is
/// positive. Methods absent from `weights` are disabled.
pub fn combine(values: &MethodValues, weights: &MethodWeights) -> EngineResult<Money> {
    let mut numerator = Decimal::ZERO;
    let mut denominator = Decimal::ZERO;
    for (method, cfg) in weights.iter().filter(|(_, c)| c.enabled) {
        let value = values.get(method).copied().unwrap_or(Decimal::ZERO);
        let weighted = value
            .checked_mul(cfg.weight)
            .ok_or_else(|| ValuationEngineError::overflow("combined valuation"))?;
        numerator = numerator
            .checked_add(weighted)
            .ok_or_else(|| ValuationEngineError::overflow("combined valuation"))?;
        denominator = denominator
            .checked_add(cfg.weight)
            .ok_or_else(|| ValuationEngineError::overflow("combined valuation weights"))?;
    }
    if denominator.is_zero() {
        return Ok(Decimal::ZERO);
    }
    numerator
        .checked_div(denominator)
        .ok_or_else(|| ValuationEngineError::overflow("combined valuation"))
}

// ---------------------------------------------------------------------------
// Fallback
// ---------------------------------------------------------------------------

/// Stage-scaled placeholder results used when the method set cannot be
/// evaluated. Returns the method values and the combined valuation.
pub fn default_results(stage: &CompanyStage) -> (MethodValues, Money) {
    let base = match stage {
        CompanyStage::PreSeed | CompanyStage::Angel => dec!(1_000_000),
        CompanyStage::Growth | CompanyStage::SeriesA => dec!(5_000_000),
        CompanyStage::Seed | CompanyStage::Other(_) => dec!(2_000_000),
    };
    let values = [
        (ValuationMethod::Scorecard, dec!(1.2)),
        (ValuationMethod::Checklist, dec!(1.5)),
        (ValuationMethod::VentureCapital, dec!(0.8)),
        (ValuationMethod::DcfGrowth, dec!(0.7)),
        (ValuationMethod::DcfMultiple, dec!(0.6)),
    ]
    .into_iter()
    .map(|(m, factor)| (m, base * factor))
    .collect();
    (values, base)
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

impl ValuationUpdate {
    /// Derive the valuation record update. An existing selection on the
    /// record wins over the freshly computed combined valuation. Amounts
    /// saturate at the Decimal range instead of overflowing.
    pub fn from_results(
        combined: Money,
        existing_selection: Option<Money>,
        investment_pct: Rate,
    ) -> Self {
        let selected = existing_selection.unwrap_or(combined);
        let investment = selected.saturating_mul(investment_pct);
        Self {
            selected_valuation: selected,
            pre_money_valuation: selected,
            investment,
            post_money_valuation: selected.saturating_add(investment),
        }
    }
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationInput {
    #[serde(default)]
    pub company: CompanyFacts,
    #[serde(default)]
    pub valuation: ValuationFacts,
    /// Overrides the stage weight table when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<MethodWeights>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub stage: CompanyStage,
    /// Raw per-method results
    pub method_values: MethodValues,
    pub normalization: NormalizationOutcome,
    pub weights: MethodWeights,
    pub combined_valuation: Money,
    /// True when the stage default set replaced a failed calculation
    pub used_default: bool,
    /// Proposed valuation record update
    pub write_back: ValuationUpdate,
}

fn run_methods(
    input: &ValuationInput,
    weights: &MethodWeights,
    config: &EngineConfig,
) -> EngineResult<(MethodValues, NormalizationOutcome, Money)> {
    let values = evaluate_all(&input.company, &input.valuation, config)?;
    let normalization =
        normalize_method_values(&values, config.methods.outlier_spread_ratio)?;
    let combined = combine(&normalization.values, weights)?;
    Ok((values, normalization, combined))
}

/// Run all five methods, normalize outliers and blend with stage weights.
///
/// An internal failure in the method set does not fail the call: the
/// stage-scaled default results are returned with `used_default` set.
pub fn calculate_valuation(
    input: &ValuationInput,
    config: &EngineConfig,
) -> EngineResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    config.validate()?;
    let stage = CompanyStage::parse(input.company.stage.as_deref());
    let weights = match &input.weights {
        Some(w) => {
            validate_weights(w)?;
            w.clone()
        }
        None => stage_weights(&stage),
    };

    let (method_values, normalization, combined_valuation, used_default) =
        match run_methods(input, &weights, config) {
            Ok((values, normalization, combined)) => (values, normalization, combined, false),
            Err(e) => {
                warn!(error = %e, stage = ?stage, "Valuation methods failed; using stage defaults");
                warnings.push(format!("Calculation failed ({e}); stage default valuation used"));
                let (values, base) = default_results(&stage);
                let normalization = NormalizationOutcome::passthrough(&values);
                (values, normalization, base, true)
            }
        };

    if normalization.applied {
        warnings.push(format!(
            "Extreme spread between methods; {} value(s) clamped towards the median",
            normalization.adjusted.len()
        ));
    }
    if weights.values().all(|w| !w.enabled || w.weight.is_zero()) {
        warnings.push("No enabled method carries weight; combined valuation is 0".into());
    }

    let write_back = ValuationUpdate::from_results(
        combined_valuation,
        input.valuation.selected_valuation,
        config.investment_pct,
    );
    info!(combined = %combined_valuation, stage = ?stage, used_default, "Valuation calculated");

    let output = ValuationOutput {
        stage,
        method_values,
        normalization,
        weights,
        combined_valuation,
        used_default,
        write_back,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stage-weighted blend of Scorecard, Checklist, Venture Capital and DCF methods",
        &serde_json::json!({
            "dcf": config.dcf,
            "methods": config.methods,
            "investment_pct": config.investment_pct.to_string(),
            "custom_weights": input.weights.is_some(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
