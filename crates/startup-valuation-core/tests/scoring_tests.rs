use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use startup_valuation_core::benchmarks::{resolve_benchmarks, BenchmarkInput, BenchmarkTable};
use startup_valuation_core::config::ResolverDefaults;
use startup_valuation_core::questionnaire::{resolve_inputs, QuestionnaireAnswer, ValueSource};
use startup_valuation_core::scoring::{
    calculate_startup_score, evaluate_metric, ScoreMetric, ScoreTier, ScoringInput,
};

fn answers(rows: &[(&str, &str)]) -> Vec<QuestionnaireAnswer> {
    rows.iter()
        .map(|(k, v)| QuestionnaireAnswer::new(k, v))
        .collect()
}

fn score_answers(rows: &[(&str, &str)]) -> ScoringInput {
    let resolved = resolve_inputs(&answers(rows), &ResolverDefaults::default())
        .unwrap()
        .result;
    ScoringInput {
        company: resolved.company,
        performance: resolved.performance,
        valuation: resolved.valuation,
    }
}

// ===========================================================================
// Questionnaire → score
// ===========================================================================

#[test]
fn test_default_revenue_answer_scores_below_one() {
    let table = BenchmarkTable::default();
    let input = score_answers(&[("6.1", "3234")]);
    let out = calculate_startup_score(&input, &table).unwrap();
    let revenue = out.result.details[&ScoreMetric::Revenue];

    assert_eq!(revenue.value, dec!(3234));
    assert_eq!(revenue.benchmark, dec!(350000));
    assert!((revenue.percentage - dec!(0.924)).abs() < dec!(0.001));
    assert!((revenue.score - dec!(0.924)).abs() < dec!(0.001));
}

#[test]
fn test_negative_growth_answer() {
    let table = BenchmarkTable::default();
    let input = score_answers(&[("6.3", "-20"), ("6.6", "8")]);
    let out = calculate_startup_score(&input, &table).unwrap();
    let growth = out.result.details[&ScoreMetric::GrowthRate];

    assert_eq!(growth.score, dec!(-80));
    assert_eq!(out.result.details[&ScoreMetric::AnnualRoi].value, dec!(8));
    assert!(out.warnings.iter().any(|w| w.contains("Negative growth")));
}

#[test]
fn test_enormous_growth_answer_clamps() {
    let table = BenchmarkTable::default();
    let input = score_answers(&[("6.3", "7e28")]);
    let out = calculate_startup_score(&input, &table).unwrap();
    let growth = out.result.details[&ScoreMetric::GrowthRate];

    assert_eq!(growth.value, dec!(70_000_000_000_000_000_000_000_000_000));
    assert_eq!(growth.score, dec!(100));
    assert!(out.result.total_score <= dec!(100));
}

#[test]
fn test_strong_company_scores_excellent() {
    let table = BenchmarkTable::default();
    let input = score_answers(
        &[
            ("1.1", "3"),
            ("1.6", "20"),
            ("2.1", "Mature Product with Multiple Iterations"),
            ("2.7", "Clear Product-Market Fit with Retention Data"),
            ("2.9", "Completely Scalable"),
            ("3.1", "More Than $10 Billion"),
            ("4.3", "80"),
            ("6.1", "2,000,000"),
            ("6.2", "900000"),
            ("6.3", "120"),
            ("6.6", "35"),
            ("7.8", "25"),
        ],
    );
    let out = calculate_startup_score(&input, &table).unwrap();
    assert_eq!(out.result.total_score, dec!(100));
    assert_eq!(out.result.tier, ScoreTier::Excellent);
    assert_eq!(out.result.finance_score, dec!(100));
}

#[test]
fn test_user_benchmark_changes_score() {
    let soft = resolve_benchmarks(&BenchmarkInput {
        user_overrides: [("avg_revenue".to_string(), dec!(6468))].into_iter().collect(),
        industry_values: None,
    })
    .unwrap()
    .result;
    let input = score_answers(&[("6.1", "3234")]);
    let out = calculate_startup_score(&input, &soft).unwrap();
    assert_eq!(out.result.details[&ScoreMetric::Revenue].score, dec!(50));
}

#[test]
fn test_provenance_tracks_sources() {
    let resolved = resolve_inputs(
        &answers(&[("6.1", "1000"), ("6.4", "5000"), ("6.5", "12")]),
        &ResolverDefaults::default(),
    )
    .unwrap()
    .result;
    assert_eq!(resolved.source("revenue"), Some(ValueSource::Questionnaire));
    assert_eq!(resolved.source("cash_on_hand"), Some(ValueSource::Derived));
    assert_eq!(resolved.source("gross_margin_pct"), Some(ValueSource::Default));
    assert_eq!(resolved.performance.cash_on_hand, Some(dec!(60000)));
}

// ===========================================================================
// Properties
// ===========================================================================

const CLAMPED: [ScoreMetric; 7] = [
    ScoreMetric::Revenue,
    ScoreMetric::GrossMargin,
    ScoreMetric::CashOnHand,
    ScoreMetric::Valuation,
    ScoreMetric::TeamSize,
    ScoreMetric::MarketSize,
    ScoreMetric::ProductReadiness,
];

proptest! {
    /// Apart from growth and ROI, every metric score sits in [0, 100].
    #[test]
    fn clamped_metrics_stay_in_range(
        idx in 0usize..CLAMPED.len(),
        value in -1_000_000_000i64..1_000_000_000_000,
        benchmark in 1i64..100_000_000,
    ) {
        let d = evaluate_metric(CLAMPED[idx], Decimal::from(value), Decimal::from(benchmark)).unwrap();
        prop_assert!(d.score >= Decimal::ZERO && d.score <= dec!(100), "score {}", d.score);
    }

    /// Growth may go negative but never below -100 nor above 100.
    #[test]
    fn growth_score_bounded(
        value in -100_000i64..100_000,
        benchmark in 1i64..1000,
    ) {
        let d = evaluate_metric(ScoreMetric::GrowthRate, Decimal::from(value), Decimal::from(benchmark)).unwrap();
        prop_assert!(d.score >= dec!(-100) && d.score <= dec!(100));
        if value >= 0 {
            prop_assert!(d.score >= Decimal::ZERO);
        }
    }

    /// A non-positive ROI contributes nothing.
    #[test]
    fn non_positive_roi_scores_zero(value in -10_000i64..=0) {
        let d = evaluate_metric(ScoreMetric::AnnualRoi, Decimal::from(value), dec!(20)).unwrap();
        prop_assert_eq!(d.score, Decimal::ZERO);
        prop_assert_eq!(d.percentage, Decimal::ZERO);
    }

    /// Answers always win over defaults, including zero.
    #[test]
    fn questionnaire_beats_defaults(revenue in 0i64..10_000_000, margin in 0i64..100) {
        let resolved = resolve_inputs(
            &answers(&[("6.1", revenue.to_string().as_str()), ("4.3", margin.to_string().as_str())]),
            &ResolverDefaults::default(),
        )
        .unwrap()
        .result;
        prop_assert_eq!(resolved.performance.revenue, Some(Decimal::from(revenue)));
        prop_assert_eq!(resolved.performance.gross_margin_pct, Some(Decimal::from(margin)));
    }
}
