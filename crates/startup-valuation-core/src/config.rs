//! Engine configuration.
//!
//! Every constant the valuation methods, the write-back policy and the
//! questionnaire resolver depend on lives here. All fields carry serde
//! defaults, so a partial YAML or JSON file only needs the values it changes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationEngineError;
use crate::types::{Money, Multiple, Percent, Rate};
use crate::EngineResult;

/// Assumptions for the five-year DCF-Growth projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfAssumptions {
    /// Annual discount rate (0.25 = 25%)
    pub discount_rate: Rate,
    /// Multiple applied to the terminal-year cash flow
    pub terminal_multiple: Multiple,
    /// Perpetual growth applied to the terminal cash flow
    pub terminal_growth_rate: Rate,
    pub projection_years: u32,
    /// Floor for the derived profit margin, in percent
    pub min_profit_margin_pct: Percent,
    /// Margin used when EBITDA or revenue is unavailable, in percent
    pub default_profit_margin_pct: Percent,
    /// Growth used when the annual ROI is missing or zero, in percent
    pub default_growth_rate_pct: Percent,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            discount_rate: dec!(0.25),
            terminal_multiple: dec!(10),
            terminal_growth_rate: dec!(0.03),
            projection_years: 5,
            min_profit_margin_pct: dec!(5),
            default_profit_margin_pct: dec!(15),
            default_growth_rate_pct: dec!(20),
        }
    }
}

/// Constants for the heuristic and multiple-based methods and the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodAssumptions {
    pub scorecard_base_valuation: Money,
    pub checklist_base_valuation: Money,
    /// Multiple used by DCF-Multiple when the record carries none
    pub default_industry_multiple: Multiple,
    /// Share of the industry multiple applied to revenue when EBITDA is not positive
    pub revenue_multiple_factor: Rate,
    /// max/min spread among positive method values that triggers outlier clamping
    pub outlier_spread_ratio: Decimal,
}

impl Default for MethodAssumptions {
    fn default() -> Self {
        Self {
            scorecard_base_valuation: dec!(5_000_000),
            checklist_base_valuation: dec!(7_500_000),
            default_industry_multiple: dec!(8),
            revenue_multiple_factor: dec!(0.8),
            outlier_spread_ratio: dec!(100),
        }
    }
}

/// Fallback values for every field the questionnaire may leave unanswered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverDefaults {
    pub revenue: Money,
    pub gross_margin_pct: Percent,
    pub cash_on_hand: Money,
    pub customer_count: u64,
    pub market_size: Money,
    pub product_readiness_pct: Percent,
    pub growth_rate_pct: Percent,
    pub annual_roi_pct: Percent,
    pub expected_valuation: Money,
    pub team_size: u32,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            revenue: dec!(3234),
            gross_margin_pct: dec!(31),
            cash_on_hand: dec!(134),
            customer_count: 700,
            market_size: dec!(4_000_000),
            product_readiness_pct: dec!(75),
            growth_rate_pct: dec!(33),
            annual_roi_pct: dec!(33),
            expected_valuation: dec!(64_000),
            team_size: 15,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dcf: DcfAssumptions,
    pub methods: MethodAssumptions,
    /// Share of the selected valuation raised as the new investment
    pub investment_pct: Rate,
    pub resolver_defaults: ResolverDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dcf: DcfAssumptions::default(),
            methods: MethodAssumptions::default(),
            investment_pct: dec!(0.15),
            resolver_defaults: ResolverDefaults::default(),
        }
    }
}

/// Upper bound for DCF rates, as a fraction (1000%).
const MAX_DCF_RATE: Decimal = dec!(10);

impl EngineConfig {
    /// Reject configurations that would make the engine divide by zero,
    /// project nothing or compound rates past the Decimal range.
    pub fn validate(&self) -> EngineResult<()> {
        for (field, rate) in [
            ("dcf.discount_rate", self.dcf.discount_rate),
            ("dcf.terminal_growth_rate", self.dcf.terminal_growth_rate),
        ] {
            if rate <= dec!(-1) || rate > MAX_DCF_RATE {
                return Err(ValuationEngineError::InvalidInput {
                    field: field.into(),
                    reason: format!(
                        "Rate must be above -100% and at most {MAX_DCF_RATE}, got {rate}"
                    ),
                });
            }
        }
        if self.dcf.projection_years == 0 {
            return Err(ValuationEngineError::InvalidInput {
                field: "dcf.projection_years".into(),
                reason: "At least one projection year is required".into(),
            });
        }
        if self.methods.outlier_spread_ratio <= Decimal::ONE {
            return Err(ValuationEngineError::InvalidInput {
                field: "methods.outlier_spread_ratio".into(),
                reason: "Outlier spread ratio must exceed 1".into(),
            });
        }
        if self.investment_pct < Decimal::ZERO {
            return Err(ValuationEngineError::InvalidInput {
                field: "investment_pct".into(),
                reason: "Investment percentage must be non-negative".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "dcf": { "discount_rate": "0.30" } }"#).unwrap();
        assert_eq!(cfg.dcf.discount_rate, dec!(0.30));
        assert_eq!(cfg.dcf.terminal_multiple, dec!(10));
        assert_eq!(cfg.investment_pct, dec!(0.15));
        assert_eq!(cfg.resolver_defaults.team_size, 15);
    }

    #[test]
    fn test_out_of_range_rates_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.dcf.discount_rate = Decimal::MAX;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.dcf.terminal_growth_rate = Decimal::MAX;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.dcf.terminal_growth_rate = dec!(-1);
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::default();
        cfg.dcf.discount_rate = dec!(10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_projection_years_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.dcf.projection_years = 0;
        assert!(cfg.validate().is_err());
    }
}
