use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use startup_valuation_core::config::EngineConfig;
use startup_valuation_core::valuation::{
    calculate_valuation, combine, normalize_method_values, normalize_values, stage_weights,
    CompanyStage, MethodValues, MethodWeightConfig, MethodWeights, NormalizeInput, ValuationInput,
    ValuationMethod,
};
use startup_valuation_core::{CompanyFacts, ValuationFacts};

fn seed_company() -> CompanyFacts {
    CompanyFacts {
        employee_count: Some(8),
        founded_year: Some(2021),
        industry: Some("HealthTech".into()),
        business_activity: Some("Clinical scheduling".into()),
        stage: Some("Seed".into()),
        last_revenue: Some(dec!(250000)),
    }
}

// ===========================================================================
// Full calculation
// ===========================================================================

#[test]
fn test_seed_company_blend() {
    let input = ValuationInput {
        company: seed_company(),
        valuation: ValuationFacts {
            annual_roi: Some(dec!(60)),
            last_year_ebitda: Some(dec!(-40000)),
            industry_multiple: Some(dec!(6)),
            ..ValuationFacts::default()
        },
        weights: None,
    };
    let out = calculate_valuation(&input, &EngineConfig::default()).unwrap();
    let r = &out.result;

    assert_eq!(r.stage, CompanyStage::Seed);
    assert!(!r.used_default);
    assert!(!r.normalization.applied);

    // Venture capital: 250000 * 1.6 * 10
    assert_eq!(r.method_values[&ValuationMethod::VentureCapital], dec!(4000000));
    // DCF multiple: EBITDA negative, so revenue * 6 * 0.8
    assert_eq!(r.method_values[&ValuationMethod::DcfMultiple], dec!(1200000));

    let manual: Decimal = r
        .weights
        .iter()
        .filter(|(_, w)| w.enabled)
        .map(|(m, w)| r.normalization.values[m] * w.weight)
        .sum::<Decimal>()
        / dec!(100);
    assert_eq!(r.combined_valuation, manual);

    assert_eq!(r.write_back.selected_valuation, r.combined_valuation);
    assert_eq!(r.write_back.investment, r.combined_valuation * dec!(0.15));
}

#[test]
fn test_existing_selection_survives_recalculation() {
    let input = ValuationInput {
        company: seed_company(),
        valuation: ValuationFacts {
            selected_valuation: Some(dec!(3000000)),
            ..ValuationFacts::default()
        },
        weights: None,
    };
    let out = calculate_valuation(&input, &EngineConfig::default()).unwrap();
    assert_eq!(out.result.write_back.selected_valuation, dec!(3000000));
    assert_eq!(out.result.write_back.post_money_valuation, dec!(3450000));
    assert_eq!(out.result.write_back.pre_money_valuation, dec!(3000000));
}

#[test]
fn test_missing_stage_uses_seed_weights() {
    let mut company = seed_company();
    company.stage = None;
    let input = ValuationInput {
        company,
        ..ValuationInput::default()
    };
    let out = calculate_valuation(&input, &EngineConfig::default()).unwrap();
    assert_eq!(out.result.weights, stage_weights(&CompanyStage::Seed));
}

#[test]
fn test_custom_weights_override_stage_table() {
    let mut weights = stage_weights(&CompanyStage::Seed);
    for (method, cfg) in weights.iter_mut() {
        *cfg = if *method == ValuationMethod::VentureCapital {
            MethodWeightConfig::on(dec!(1))
        } else {
            MethodWeightConfig::off()
        };
    }
    let input = ValuationInput {
        company: seed_company(),
        valuation: ValuationFacts {
            annual_roi: Some(dec!(10)),
            ..ValuationFacts::default()
        },
        weights: Some(weights),
    };
    let out = calculate_valuation(&input, &EngineConfig::default()).unwrap();
    // 250000 * 1.1 * 4
    assert_eq!(out.result.combined_valuation, dec!(1100000));
}

#[test]
fn test_configured_dcf_assumptions_change_result() {
    let input = ValuationInput {
        company: seed_company(),
        ..ValuationInput::default()
    };
    let base = calculate_valuation(&input, &EngineConfig::default()).unwrap();

    let mut cfg = EngineConfig::default();
    cfg.dcf.discount_rate = dec!(0.40);
    let harsher = calculate_valuation(&input, &cfg).unwrap();

    assert!(
        harsher.result.method_values[&ValuationMethod::DcfGrowth]
            < base.result.method_values[&ValuationMethod::DcfGrowth]
    );
}

// ===========================================================================
// Normalization
// ===========================================================================

#[test]
fn test_normalize_values_envelope_reports_clamp() {
    let values: MethodValues = ValuationMethod::ALL
        .into_iter()
        .zip([dec!(100), dec!(100000000), dec!(200), dec!(150), dec!(90)])
        .collect();
    let out = normalize_values(&NormalizeInput {
        values,
        outlier_spread_ratio: None,
    })
    .unwrap();
    assert_eq!(out.result.values[&ValuationMethod::Checklist], dec!(15000));
    assert_eq!(out.warnings.len(), 1);
    assert!(out.methodology.contains("Median"));
}

#[test]
fn test_normalize_rejects_ratio_at_or_below_one() {
    let out = normalize_values(&NormalizeInput {
        values: MethodValues::new(),
        outlier_spread_ratio: Some(Decimal::ONE),
    });
    assert!(out.is_err());
}

// ===========================================================================
// Properties
// ===========================================================================

fn money(max_cents: i64) -> impl Strategy<Value = Decimal> {
    (0..max_cents).prop_map(|c| Decimal::new(c, 2))
}

fn method_values() -> impl Strategy<Value = MethodValues> {
    prop::collection::vec(money(1_000_000_000_000), 5).prop_map(|v| {
        ValuationMethod::ALL.into_iter().zip(v).collect()
    })
}

proptest! {
    /// Every method result is non-negative whatever the record holds.
    #[test]
    fn method_results_never_negative(
        employees in prop::option::of(0u32..500),
        revenue in prop::option::of(-1_000_000_000i64..10_000_000_000),
        roi in prop::option::of(-300i64..800),
        ebitda in prop::option::of(-100_000_000i64..100_000_000),
        multiple in prop::option::of(0i64..40),
        stage in prop::sample::select(vec!["pre-seed", "angel", "seed", "growth", "series a", "series c"]),
    ) {
        let input = ValuationInput {
            company: CompanyFacts {
                employee_count: employees,
                industry: Some("Tech".into()),
                stage: Some(stage.to_string()),
                last_revenue: revenue.map(Decimal::from),
                ..CompanyFacts::default()
            },
            valuation: ValuationFacts {
                annual_roi: roi.map(Decimal::from),
                last_year_ebitda: ebitda.map(Decimal::from),
                industry_multiple: multiple.map(Decimal::from),
                ..ValuationFacts::default()
            },
            weights: None,
        };
        let out = calculate_valuation(&input, &EngineConfig::default()).unwrap();
        for (method, value) in &out.result.method_values {
            prop_assert!(*value >= Decimal::ZERO, "{} was {}", method, value);
        }
        prop_assert!(out.result.combined_valuation >= Decimal::ZERO);
    }

    /// Scaling every weight by the same factor leaves the blend unchanged.
    #[test]
    fn combine_is_weight_scale_invariant(
        values in method_values(),
        factor in 1i64..1000,
    ) {
        let weights = stage_weights(&CompanyStage::Seed);
        let scaled: MethodWeights = weights
            .iter()
            .map(|(m, w)| (*m, MethodWeightConfig { weight: w.weight * Decimal::from(factor), enabled: w.enabled }))
            .collect();
        let a = combine(&values, &weights).unwrap();
        let b = combine(&values, &scaled).unwrap();
        prop_assert!((a - b).abs() < dec!(0.000001), "{} vs {}", a, b);
    }

    /// Normalizing twice is the same as normalizing once.
    #[test]
    fn normalization_is_idempotent(values in method_values()) {
        let once = normalize_method_values(&values, dec!(100)).unwrap();
        let twice = normalize_method_values(&once.values, dec!(100)).unwrap();
        prop_assert_eq!(once.values, twice.values);
    }
}
