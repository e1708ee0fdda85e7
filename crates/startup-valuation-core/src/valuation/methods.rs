use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ValuationEngineError;
use crate::types::{CompanyFacts, Money, Multiple, Percent, ValuationFacts};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The five valuation methods the engine blends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationMethod {
    Scorecard,
    Checklist,
    VentureCapital,
    DcfGrowth,
    DcfMultiple,
}

impl ValuationMethod {
    pub const ALL: [ValuationMethod; 5] = [
        ValuationMethod::Scorecard,
        ValuationMethod::Checklist,
        ValuationMethod::VentureCapital,
        ValuationMethod::DcfGrowth,
        ValuationMethod::DcfMultiple,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ValuationMethod::Scorecard => "Scorecard",
            ValuationMethod::Checklist => "Checklist",
            ValuationMethod::VentureCapital => "Venture Capital",
            ValuationMethod::DcfGrowth => "DCF (Growth)",
            ValuationMethod::DcfMultiple => "DCF (Multiple)",
        }
    }

    /// Run this method against the given record snapshot.
    pub fn evaluate(
        self,
        company: &CompanyFacts,
        valuation: &ValuationFacts,
        config: &EngineConfig,
    ) -> EngineResult<Money> {
        let value = match self {
            ValuationMethod::Scorecard => scorecard(company, valuation, config),
            ValuationMethod::Checklist => checklist(company, valuation, config),
            ValuationMethod::VentureCapital => venture_capital(company, valuation, config),
            ValuationMethod::DcfGrowth => dcf_growth(company, valuation, config),
            ValuationMethod::DcfMultiple => dcf_multiple(company, valuation, config),
        }?;
        Ok(value.max(Decimal::ZERO))
    }
}

impl fmt::Display for ValuationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One value per method. Every value is non-negative.
pub type MethodValues = BTreeMap<ValuationMethod, Money>;

/// Declared company lifecycle stage, parsed case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStage {
    PreSeed,
    Angel,
    Seed,
    Growth,
    SeriesA,
    Other(String),
}

impl CompanyStage {
    /// A missing or blank stage is treated as seed.
    pub fn parse(stage: Option<&str>) -> Self {
        let normalized = stage.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        match normalized.as_str() {
            "" | "seed" => CompanyStage::Seed,
            "pre-seed" => CompanyStage::PreSeed,
            "angel" => CompanyStage::Angel,
            "growth" => CompanyStage::Growth,
            "series a" => CompanyStage::SeriesA,
            _ => CompanyStage::Other(normalized),
        }
    }

    /// Product-stage rating used by the checklist method.
    pub fn checklist_rating(&self) -> Decimal {
        match self {
            CompanyStage::PreSeed => dec!(0.1),
            CompanyStage::Seed => dec!(0.3),
            CompanyStage::Growth => dec!(0.7),
            CompanyStage::SeriesA => dec!(0.9),
            CompanyStage::Angel | CompanyStage::Other(_) => dec!(0.3),
        }
    }
}

/// Evaluate all five methods. The first failure aborts the set.
pub fn evaluate_all(
    company: &CompanyFacts,
    valuation: &ValuationFacts,
    config: &EngineConfig,
) -> EngineResult<MethodValues> {
    let mut values = MethodValues::new();
    for method in ValuationMethod::ALL {
        let value = method.evaluate(company, valuation, config)?;
        debug!(method = method.label(), value = %value, "Valuation method evaluated");
        values.insert(method, value);
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

fn mul(a: Decimal, b: Decimal, context: &str) -> EngineResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| ValuationEngineError::overflow(context))
}

fn div(a: Decimal, b: Decimal, context: &str) -> EngineResult<Decimal> {
    a.checked_div(b)
        .ok_or_else(|| ValuationEngineError::overflow(context))
}

fn add(a: Decimal, b: Decimal, context: &str) -> EngineResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| ValuationEngineError::overflow(context))
}

// ---------------------------------------------------------------------------
// Shared ratings
// ---------------------------------------------------------------------------

/// Headcount at which the team rating saturates.
const TEAM_SATURATION: Decimal = dec!(50);

/// Team rating in `(0, 1]`. A missing or zero headcount counts as one person.
fn team_rating(company: &CompanyFacts) -> Decimal {
    let headcount = match company.employee_count {
        Some(n) if n > 0 => Decimal::from(n),
        _ => Decimal::ONE,
    };
    (headcount / TEAM_SATURATION).min(Decimal::ONE)
}

fn revenue(company: &CompanyFacts) -> Money {
    company.last_revenue.unwrap_or(Decimal::ZERO)
}

/// `min(1, value / cap)`, floored at zero.
fn capped_ratio(value: Decimal, cap: Decimal, context: &str) -> EngineResult<Decimal> {
    Ok(div(value, cap, context)?
        .min(Decimal::ONE)
        .max(Decimal::ZERO))
}

// ---------------------------------------------------------------------------
// Scorecard
// ---------------------------------------------------------------------------

fn scorecard(
    company: &CompanyFacts,
    valuation: &ValuationFacts,
    config: &EngineConfig,
) -> EngineResult<Money> {
    let team = team_rating(company);

    let is_tech = company
        .industry
        .as_deref()
        .is_some_and(|i| i.to_lowercase().contains("tech"));
    let is_saas = company
        .business_activity
        .as_deref()
        .is_some_and(|a| a.to_lowercase().contains("saas"));
    let market_product = if is_tech || is_saas { dec!(0.7) } else { dec!(0.4) };

    let roi = valuation.annual_roi.unwrap_or(Decimal::ZERO);
    let roi_part = capped_ratio(
        add(roi, dec!(100), "scorecard roi")?,
        dec!(200),
        "scorecard roi",
    )?;
    let revenue_part = capped_ratio(revenue(company), dec!(1_000_000), "scorecard revenue")?;
    let financial = roi_part * dec!(0.5) + revenue_part * dec!(0.5);

    let rating = team * dec!(0.3) + market_product * dec!(0.3) + financial * dec!(0.4);
    let result = mul(
        config.methods.scorecard_base_valuation,
        rating,
        "scorecard valuation",
    )?;
    debug!(team = %team, market_product = %market_product, financial = %financial, rating = %rating, "Scorecard rating");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Checklist
// ---------------------------------------------------------------------------

fn checklist(
    company: &CompanyFacts,
    _valuation: &ValuationFacts,
    config: &EngineConfig,
) -> EngineResult<Money> {
    let team = team_rating(company);
    let stage = CompanyStage::parse(company.stage.as_deref()).checklist_rating();
    let revenue_rating = capped_ratio(revenue(company), dec!(2_000_000), "checklist revenue")?;

    let adjustment = (dec!(-0.5) + dec!(1.5) * team)
        + (dec!(-0.5) + dec!(1.5) * stage)
        + (dec!(-0.25) + dec!(1.25) * revenue_rating);

    let result = mul(
        config.methods.checklist_base_valuation,
        Decimal::ONE + adjustment,
        "checklist valuation",
    )?;
    debug!(adjustment = %adjustment, "Checklist adjustment");
    Ok(result)
}

// ---------------------------------------------------------------------------
// Venture Capital
// ---------------------------------------------------------------------------

/// Revenue multiple a given growth rate (in percent) commands.
pub fn revenue_multiple_for_growth(growth_pct: Percent) -> Multiple {
    if growth_pct >= dec!(100) {
        dec!(15)
    } else if growth_pct >= dec!(50) {
        dec!(10)
    } else if growth_pct >= dec!(30) {
        dec!(8)
    } else if growth_pct >= dec!(20) {
        dec!(6)
    } else if growth_pct >= dec!(10) {
        dec!(4)
    } else {
        dec!(2)
    }
}

fn venture_capital(
    company: &CompanyFacts,
    valuation: &ValuationFacts,
    _config: &EngineConfig,
) -> EngineResult<Money> {
    let growth = valuation.annual_roi.unwrap_or(Decimal::ZERO);
    let multiple = revenue_multiple_for_growth(growth);
    let growth_factor = add(
        Decimal::ONE,
        div(growth, dec!(100), "venture capital growth")?,
        "venture capital growth",
    )?;
    let projected = mul(revenue(company), growth_factor, "venture capital projection")?;
    mul(projected, multiple, "venture capital valuation")
}

// ---------------------------------------------------------------------------
// DCF (Growth)
// ---------------------------------------------------------------------------

fn dcf_growth(
    company: &CompanyFacts,
    valuation: &ValuationFacts,
    config: &EngineConfig,
) -> EngineResult<Money> {
    let dcf = &config.dcf;
    let base_revenue = revenue(company);

    let growth = match valuation.annual_roi {
        Some(g) if !g.is_zero() => g,
        _ => dcf.default_growth_rate_pct,
    };

    let margin_pct = match valuation.last_year_ebitda {
        Some(ebitda) if !ebitda.is_zero() && base_revenue > Decimal::ZERO => {
            mul(div(ebitda, base_revenue, "dcf margin")?, dec!(100), "dcf margin")?
        }
        _ => dcf.default_profit_margin_pct,
    }
    .max(dcf.min_profit_margin_pct);
    let margin = margin_pct / dec!(100);

    let growth_factor = add(Decimal::ONE, div(growth, dec!(100), "dcf growth")?, "dcf growth")?;
    let discount_step = add(Decimal::ONE, dcf.discount_rate, "dcf discount rate")?;

    let mut current_revenue = base_revenue;
    let mut discount = Decimal::ONE;
    let mut present_value = Decimal::ZERO;
    for _ in 0..dcf.projection_years {
        current_revenue = mul(current_revenue, growth_factor, "dcf revenue projection")?;
        let cash_flow = mul(current_revenue, margin, "dcf cash flow")?;
        discount = mul(discount, discount_step, "dcf discount factor")?;
        present_value = add(
            present_value,
            div(cash_flow, discount, "dcf present value")?,
            "dcf present value",
        )?;
    }

    // Terminal value is discounted over the full projection horizon.
    let terminal_cash_flow = mul(
        mul(current_revenue, margin, "dcf terminal cash flow")?,
        add(Decimal::ONE, dcf.terminal_growth_rate, "dcf terminal growth")?,
        "dcf terminal cash flow",
    )?;
    let terminal_value = mul(terminal_cash_flow, dcf.terminal_multiple, "dcf terminal value")?;
    let discounted_terminal = div(terminal_value, discount, "dcf terminal discount")?;

    debug!(growth = %growth, margin_pct = %margin_pct, pv_cash_flows = %present_value, pv_terminal = %discounted_terminal, "DCF growth projection");
    add(present_value, discounted_terminal, "dcf valuation")
}

// ---------------------------------------------------------------------------
// DCF (Multiple)
// ---------------------------------------------------------------------------

fn dcf_multiple(
    company: &CompanyFacts,
    valuation: &ValuationFacts,
    config: &EngineConfig,
) -> EngineResult<Money> {
    let multiple = match valuation.industry_multiple {
        Some(m) if !m.is_zero() => m,
        _ => config.methods.default_industry_multiple,
    };
    let ebitda = valuation.last_year_ebitda.unwrap_or(Decimal::ZERO);
    let base_revenue = revenue(company);

    if ebitda > Decimal::ZERO {
        mul(ebitda, multiple, "dcf multiple ebitda")
    } else if base_revenue > Decimal::ZERO {
        let fallback = mul(
            multiple,
            config.methods.revenue_multiple_factor,
            "dcf multiple fallback",
        )?;
        mul(base_revenue, fallback, "dcf multiple revenue")
    } else {
        Ok(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(employees: Option<u32>, revenue: Option<Decimal>, stage: &str) -> CompanyFacts {
        CompanyFacts {
            employee_count: employees,
            last_revenue: revenue,
            stage: Some(stage.to_string()),
            ..CompanyFacts::default()
        }
    }

    fn eval(method: ValuationMethod, c: &CompanyFacts, v: &ValuationFacts) -> Decimal {
        method.evaluate(c, v, &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_scorecard_saas_company() {
        let mut c = company(Some(25), Some(dec!(500000)), "seed");
        c.business_activity = Some("B2B SaaS platform".into());
        let v = ValuationFacts {
            annual_roi: Some(dec!(20)),
            ..ValuationFacts::default()
        };
        // team 0.5, market 0.7, financial 0.5*0.6 + 0.5*0.5 = 0.55
        // rating 0.15 + 0.21 + 0.22 = 0.58
        assert_eq!(eval(ValuationMethod::Scorecard, &c, &v), dec!(2900000));
    }

    #[test]
    fn test_scorecard_missing_employees_count_as_one() {
        let c = company(None, None, "seed");
        let v = ValuationFacts::default();
        // team 0.02, market 0.4, financial 0.25 → 0.006 + 0.12 + 0.1 = 0.226
        assert_eq!(eval(ValuationMethod::Scorecard, &c, &v), dec!(1130000));
    }

    #[test]
    fn test_checklist_stage_ratings() {
        let c = company(Some(50), Some(dec!(2000000)), "series a");
        // adjustment 1.0 + 0.85 + 1.0 = 2.85
        assert_eq!(
            eval(ValuationMethod::Checklist, &c, &ValuationFacts::default()),
            dec!(28875000)
        );
        assert_eq!(CompanyStage::parse(Some("Angel")).checklist_rating(), dec!(0.3));
        assert_eq!(CompanyStage::parse(None), CompanyStage::Seed);
    }

    #[test]
    fn test_venture_capital_tiers() {
        let c = company(None, Some(dec!(1000000)), "seed");
        let v = ValuationFacts {
            annual_roi: Some(dec!(50)),
            ..ValuationFacts::default()
        };
        assert_eq!(eval(ValuationMethod::VentureCapital, &c, &v), dec!(15000000));
        assert_eq!(revenue_multiple_for_growth(dec!(9.99)), dec!(2));
        assert_eq!(revenue_multiple_for_growth(dec!(100)), dec!(15));
    }

    #[test]
    fn test_venture_capital_negative_growth_floored() {
        let c = company(None, Some(dec!(1000000)), "seed");
        let v = ValuationFacts {
            annual_roi: Some(dec!(-150)),
            ..ValuationFacts::default()
        };
        assert_eq!(eval(ValuationMethod::VentureCapital, &c, &v), Decimal::ZERO);
    }

    #[test]
    fn test_dcf_multiple_revenue_fallback() {
        let c = company(None, Some(dec!(500000)), "seed");
        let v = ValuationFacts {
            last_year_ebitda: Some(Decimal::ZERO),
            industry_multiple: Some(dec!(8)),
            ..ValuationFacts::default()
        };
        assert_eq!(eval(ValuationMethod::DcfMultiple, &c, &v), dec!(3200000));
    }

    #[test]
    fn test_dcf_multiple_uses_ebitda_and_default_multiple() {
        let c = company(None, Some(dec!(500000)), "seed");
        let v = ValuationFacts {
            last_year_ebitda: Some(dec!(100000)),
            industry_multiple: Some(Decimal::ZERO),
            ..ValuationFacts::default()
        };
        assert_eq!(eval(ValuationMethod::DcfMultiple, &c, &v), dec!(800000));
        let empty = company(None, None, "seed");
        assert_eq!(
            eval(ValuationMethod::DcfMultiple, &empty, &ValuationFacts::default()),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_dcf_growth_at_discount_rate() {
        let c = company(None, Some(dec!(1000)), "seed");
        let v = ValuationFacts {
            annual_roi: Some(dec!(25)),
            last_year_ebitda: Some(dec!(200)),
            ..ValuationFacts::default()
        };
        // Growth equals the discount rate, so each year's PV is 1000 * 0.2 = 200.
        // Terminal: 1000*1.25^5*0.2*1.03*10 / 1.25^5 = 2060.
        let value = eval(ValuationMethod::DcfGrowth, &c, &v);
        assert!(
            (value - dec!(3060)).abs() < dec!(0.0001),
            "expected ~3060, got {value}"
        );
    }

    #[test]
    fn test_dcf_growth_zero_revenue_is_zero() {
        let c = company(None, None, "seed");
        assert_eq!(
            eval(ValuationMethod::DcfGrowth, &c, &ValuationFacts::default()),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_overflow_is_reported() {
        let c = company(None, Some(Decimal::MAX), "seed");
        let v = ValuationFacts {
            annual_roi: Some(dec!(500)),
            ..ValuationFacts::default()
        };
        let err = ValuationMethod::VentureCapital
            .evaluate(&c, &v, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, ValuationEngineError::ArithmeticOverflow { .. }));
    }
}
