//! Questionnaire-first input resolution.
//!
//! Every field the scorer and the write-back need is taken from the
//! questionnaire when the answer is present and readable, and from
//! [`ResolverDefaults`] otherwise. There is no secondary live-data source.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::answers::{
    parse_numeric, MarketFitEvidence, MarketSizeBucket, ProductStage, Question,
    QuestionnaireAnswer, Scalability,
};
use crate::config::ResolverDefaults;
use crate::types::{
    with_metadata, CompanyFacts, ComputationOutput, Money, PerformanceFacts, ValuationFacts,
};
use crate::EngineResult;

/// Expected-valuation answers below this are read as "in millions".
const MILLIONS_THRESHOLD: Decimal = dec!(1000);

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    /// Taken verbatim from one answer
    Questionnaire,
    /// Computed from one or more answers
    Derived,
    Default,
}

/// Facts resolved from the questionnaire, with per-field provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedInputs {
    pub company: CompanyFacts,
    pub performance: PerformanceFacts,
    pub valuation: ValuationFacts,
    pub provenance: BTreeMap<String, ValueSource>,
}

impl ResolvedInputs {
    pub fn source(&self, field: &str) -> Option<ValueSource> {
        self.provenance.get(field).copied()
    }
}

// ---------------------------------------------------------------------------
// Answer lookup
// ---------------------------------------------------------------------------

struct AnswerSheet<'a> {
    answers: HashMap<&'a str, &'a str>,
}

impl<'a> AnswerSheet<'a> {
    /// Later rows for the same key replace earlier ones. Blank answers are
    /// treated as unanswered.
    fn new(rows: &'a [QuestionnaireAnswer]) -> Self {
        let mut answers = HashMap::new();
        for row in rows {
            if let Some(text) = row.answer.as_deref() {
                let text = text.trim();
                if !text.is_empty() {
                    answers.insert(row.question_key.trim(), text);
                }
            }
        }
        Self { answers }
    }

    fn text(&self, question: Question) -> Option<&'a str> {
        self.answers.get(question.key()).copied()
    }

    /// Numeric answer, or `None` when unanswered or unreadable.
    fn number(&self, question: Question, warnings: &mut Vec<String>) -> Option<Decimal> {
        let raw = self.text(question)?;
        match parse_numeric(question, raw) {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(question = question.key(), answer = raw, "Treating unreadable answer as absent");
                warnings.push(format!("{e}; using fallback"));
                None
            }
        }
    }
}

struct Provenance {
    map: BTreeMap<String, ValueSource>,
}

impl Provenance {
    fn record<T: std::fmt::Display>(&mut self, field: &str, source: ValueSource, value: &T) {
        debug!(field, source = ?source, value = %value, "Resolved input");
        self.map.insert(field.to_string(), source);
    }

    fn pick(
        &mut self,
        field: &str,
        answered: Option<Decimal>,
        fallback: Decimal,
    ) -> Decimal {
        match answered {
            Some(v) => {
                self.record(field, ValueSource::Questionnaire, &v);
                v
            }
            None => {
                self.record(field, ValueSource::Default, &fallback);
                fallback
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve every scoring and write-back input. Never fails: unreadable
/// answers fall back to defaults and are reported in `warnings`.
pub fn resolve_answers(
    answers: &[QuestionnaireAnswer],
    defaults: &ResolverDefaults,
    warnings: &mut Vec<String>,
) -> ResolvedInputs {
    let sheet = AnswerSheet::new(answers);
    let mut prov = Provenance {
        map: BTreeMap::new(),
    };

    let team_size = resolve_team_size(&sheet, defaults, &mut prov, warnings);
    let product_readiness = resolve_product_readiness(&sheet, defaults, &mut prov, warnings);
    let market_size = resolve_market_size(&sheet, defaults, &mut prov, warnings);

    let gross_margin = prov.pick(
        "gross_margin_pct",
        sheet.number(Question::GrossMargin, warnings),
        defaults.gross_margin_pct,
    );
    let revenue = prov.pick(
        "revenue",
        sheet.number(Question::Revenue, warnings),
        defaults.revenue,
    );
    let cash_on_hand = resolve_cash(&sheet, defaults, &mut prov, warnings);

    let growth_answer = sheet.number(Question::GrowthRate, warnings);
    let growth_rate = prov.pick("growth_rate_pct", growth_answer, defaults.growth_rate_pct);

    let annual_roi = match (sheet.number(Question::ProfitMargin, warnings), growth_answer) {
        (Some(margin), _) => {
            prov.record("annual_roi", ValueSource::Questionnaire, &margin);
            margin
        }
        (None, Some(growth)) => {
            prov.record("annual_roi", ValueSource::Derived, &growth);
            growth
        }
        (None, None) => {
            prov.record("annual_roi", ValueSource::Default, &defaults.annual_roi_pct);
            defaults.annual_roi_pct
        }
    };

    let expected_valuation = resolve_expected_valuation(&sheet, defaults, &mut prov, warnings);

    prov.record(
        "customer_count",
        ValueSource::Default,
        &defaults.customer_count,
    );

    ResolvedInputs {
        company: CompanyFacts {
            employee_count: Some(team_size),
            ..CompanyFacts::default()
        },
        performance: PerformanceFacts {
            revenue: Some(revenue),
            gross_margin_pct: Some(gross_margin),
            cash_on_hand: Some(cash_on_hand),
            customer_count: Some(defaults.customer_count),
            market_size_ceiling: Some(market_size),
            product_readiness_pct: Some(product_readiness),
            growth_rate_pct: Some(growth_rate),
        },
        valuation: ValuationFacts {
            pre_money_valuation: Some(expected_valuation),
            selected_valuation: Some(expected_valuation),
            annual_roi: Some(annual_roi),
            ..ValuationFacts::default()
        },
        provenance: prov.map,
    }
}

/// Resolve questionnaire answers into engine inputs, wrapped in the standard
/// output envelope.
pub fn resolve_inputs(
    answers: &[QuestionnaireAnswer],
    defaults: &ResolverDefaults,
) -> EngineResult<ComputationOutput<ResolvedInputs>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let resolved = resolve_answers(answers, defaults, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Questionnaire-first resolution with configured defaults",
        &serde_json::json!({
            "answers": answers.len(),
            "defaults": defaults,
        }),
        warnings,
        elapsed,
        resolved,
    ))
}

fn resolve_team_size(
    sheet: &AnswerSheet<'_>,
    defaults: &ResolverDefaults,
    prov: &mut Provenance,
    warnings: &mut Vec<String>,
) -> u32 {
    let founders = sheet.number(Question::FoundersCount, warnings);
    let employees = sheet.number(Question::EmployeesCount, warnings);

    let (total, source) = match (founders, employees) {
        (None, None) => {
            prov.record("team_size", ValueSource::Default, &defaults.team_size);
            return defaults.team_size;
        }
        (Some(f), Some(e)) => (f + e, ValueSource::Derived),
        (Some(n), None) | (None, Some(n)) => (n, ValueSource::Questionnaire),
    };

    match total.max(Decimal::ZERO).round().to_u32() {
        Some(size) => {
            prov.record("team_size", source, &size);
            size
        }
        None => {
            warnings.push(format!("Team size {total} out of range; using default"));
            prov.record("team_size", ValueSource::Default, &defaults.team_size);
            defaults.team_size
        }
    }
}

fn resolve_product_readiness(
    sheet: &AnswerSheet<'_>,
    defaults: &ResolverDefaults,
    prov: &mut Provenance,
    warnings: &mut Vec<String>,
) -> Decimal {
    let stage = sheet.text(Question::ProductStage).map(ProductStage::parse);
    let fit = sheet
        .text(Question::ProductMarketFit)
        .map(MarketFitEvidence::parse);
    let scale = sheet.text(Question::Scalability).map(Scalability::parse);

    let stage_score = stage.as_ref().and_then(ProductStage::score);
    let fit_score = fit.as_ref().and_then(MarketFitEvidence::score);
    let scale_score = scale.as_ref().and_then(Scalability::score);

    for (question, recognized, answered) in [
        (Question::ProductStage, stage_score.is_some(), stage.is_some()),
        (Question::ProductMarketFit, fit_score.is_some(), fit.is_some()),
        (Question::Scalability, scale_score.is_some(), scale.is_some()),
    ] {
        if answered && !recognized {
            warnings.push(format!(
                "Unrecognized answer for question {}; component counts as 0",
                question.key()
            ));
        }
    }

    if stage_score.is_none() && fit_score.is_none() && scale_score.is_none() {
        prov.record(
            "product_readiness_pct",
            ValueSource::Default,
            &defaults.product_readiness_pct,
        );
        return defaults.product_readiness_pct;
    }

    let readiness = dec!(0.4) * stage_score.unwrap_or(Decimal::ZERO)
        + dec!(0.3) * fit_score.unwrap_or(Decimal::ZERO)
        + dec!(0.3) * scale_score.unwrap_or(Decimal::ZERO);
    prov.record("product_readiness_pct", ValueSource::Derived, &readiness);
    readiness
}

fn resolve_market_size(
    sheet: &AnswerSheet<'_>,
    defaults: &ResolverDefaults,
    prov: &mut Provenance,
    warnings: &mut Vec<String>,
) -> Money {
    let bucket = sheet.text(Question::MarketSize).map(MarketSizeBucket::parse);
    match bucket.as_ref().map(|b| (b, b.ceiling())) {
        Some((_, Some(ceiling))) => {
            prov.record("market_size_ceiling", ValueSource::Derived, &ceiling);
            ceiling
        }
        Some((MarketSizeBucket::Unrecognized(text), None)) => {
            warnings.push(format!(
                "Unrecognized market size '{text}'; using default {}",
                defaults.market_size
            ));
            prov.record("market_size_ceiling", ValueSource::Default, &defaults.market_size);
            defaults.market_size
        }
        _ => {
            prov.record("market_size_ceiling", ValueSource::Default, &defaults.market_size);
            defaults.market_size
        }
    }
}

fn resolve_cash(
    sheet: &AnswerSheet<'_>,
    defaults: &ResolverDefaults,
    prov: &mut Provenance,
    warnings: &mut Vec<String>,
) -> Money {
    let burn = sheet.number(Question::BurnRate, warnings);
    let runway = sheet.number(Question::RunwayMonths, warnings);

    if let (Some(burn), Some(runway)) = (burn, runway) {
        match burn.checked_mul(runway) {
            Some(cash) => {
                prov.record("cash_on_hand", ValueSource::Derived, &cash);
                return cash;
            }
            None => warnings.push("Burn rate × runway overflowed; ignoring derived cash".into()),
        }
    }

    let direct = sheet.number(Question::CashOnHand, warnings);
    prov.pick("cash_on_hand", direct, defaults.cash_on_hand)
}

fn resolve_expected_valuation(
    sheet: &AnswerSheet<'_>,
    defaults: &ResolverDefaults,
    prov: &mut Provenance,
    warnings: &mut Vec<String>,
) -> Money {
    match sheet.number(Question::ExpectedValuation, warnings) {
        Some(v) if v > Decimal::ZERO && v < MILLIONS_THRESHOLD => {
            let scaled = v * dec!(1_000_000);
            prov.record("expected_valuation", ValueSource::Derived, &scaled);
            scaled
        }
        answered => prov.pick("expected_valuation", answered, defaults.expected_valuation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(rows: &[(&str, &str)]) -> (ResolvedInputs, Vec<String>) {
        let answers: Vec<QuestionnaireAnswer> = rows
            .iter()
            .map(|(k, v)| QuestionnaireAnswer::new(k, v))
            .collect();
        let mut warnings = Vec::new();
        let resolved = resolve_answers(&answers, &ResolverDefaults::default(), &mut warnings);
        (resolved, warnings)
    }

    #[test]
    fn test_empty_questionnaire_uses_defaults() {
        let (r, warnings) = resolve(&[]);
        assert!(warnings.is_empty());
        assert_eq!(r.performance.revenue, Some(dec!(3234)));
        assert_eq!(r.performance.gross_margin_pct, Some(dec!(31)));
        assert_eq!(r.performance.cash_on_hand, Some(dec!(134)));
        assert_eq!(r.performance.customer_count, Some(700));
        assert_eq!(r.performance.market_size_ceiling, Some(dec!(4000000)));
        assert_eq!(r.performance.product_readiness_pct, Some(dec!(75)));
        assert_eq!(r.performance.growth_rate_pct, Some(dec!(33)));
        assert_eq!(r.valuation.annual_roi, Some(dec!(33)));
        assert_eq!(r.valuation.selected_valuation, Some(dec!(64000)));
        assert_eq!(r.company.employee_count, Some(15));
        assert_eq!(r.source("revenue"), Some(ValueSource::Default));
    }

    #[test]
    fn test_questionnaire_beats_default_even_when_zero() {
        let (r, _) = resolve(&[("6.1", "0"), ("4.3", "48")]);
        assert_eq!(r.performance.revenue, Some(Decimal::ZERO));
        assert_eq!(r.performance.gross_margin_pct, Some(dec!(48)));
        assert_eq!(r.source("revenue"), Some(ValueSource::Questionnaire));
    }

    #[test]
    fn test_burn_times_runway_overrides_direct_cash() {
        let (r, _) = resolve(&[("6.2", "5000"), ("6.4", "10000"), ("6.5", "6")]);
        assert_eq!(r.performance.cash_on_hand, Some(dec!(60000)));
        assert_eq!(r.source("cash_on_hand"), Some(ValueSource::Derived));

        let (r, _) = resolve(&[("6.2", "5000"), ("6.4", "10000")]);
        assert_eq!(r.performance.cash_on_hand, Some(dec!(5000)));
    }

    #[test]
    fn test_team_size_sums_founders_and_employees() {
        let (r, _) = resolve(&[("1.1", "2"), ("1.6", "9")]);
        assert_eq!(r.company.employee_count, Some(11));
        let (r, _) = resolve(&[("1.1", "3")]);
        assert_eq!(r.company.employee_count, Some(3));
    }

    #[test]
    fn test_product_readiness_weighting() {
        let (r, _) = resolve(&[
            ("2.1", "Complete Product with Full Functionality"),
            ("2.7", "Early Indicators but Not Conclusive"),
            ("2.9", "Highly Scalable"),
        ]);
        // 0.4*80 + 0.3*50 + 0.3*75
        assert_eq!(r.performance.product_readiness_pct, Some(dec!(69.5)));

        let (r, warnings) = resolve(&[("2.1", "Prototype/MVP"), ("2.9", "Infinitely")]);
        assert_eq!(r.performance.product_readiness_pct, Some(dec!(16.0)));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_market_bucket_and_unknown_text() {
        let (r, _) = resolve(&[("3.1", "$1 Billion - $10 Billion")]);
        assert_eq!(r.performance.market_size_ceiling, Some(dec!(10000000000)));

        let (r, warnings) = resolve(&[("3.1", "Enormous")]);
        assert_eq!(r.performance.market_size_ceiling, Some(dec!(4000000)));
        assert_eq!(r.source("market_size_ceiling"), Some(ValueSource::Default));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_annual_roi_fallback_chain() {
        let (r, _) = resolve(&[("6.6", "12"), ("6.3", "40")]);
        assert_eq!(r.valuation.annual_roi, Some(dec!(12)));
        let (r, _) = resolve(&[("6.3", "40")]);
        assert_eq!(r.valuation.annual_roi, Some(dec!(40)));
        assert_eq!(r.source("annual_roi"), Some(ValueSource::Derived));
    }

    #[test]
    fn test_expected_valuation_in_millions() {
        let (r, _) = resolve(&[("7.8", "12.5")]);
        assert_eq!(r.valuation.selected_valuation, Some(dec!(12500000)));
        let (r, _) = resolve(&[("7.8", "2,000,000")]);
        assert_eq!(r.valuation.pre_money_valuation, Some(dec!(2000000)));
    }

    #[test]
    fn test_unreadable_numeric_falls_back_with_warning() {
        let (r, warnings) = resolve(&[("6.1", "lots")]);
        assert_eq!(r.performance.revenue, Some(dec!(3234)));
        assert_eq!(r.source("revenue"), Some(ValueSource::Default));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("6.1"));
    }
}
