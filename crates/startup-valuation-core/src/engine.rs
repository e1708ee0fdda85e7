//! End-to-end assessment: valuation, write-back, questionnaire resolution,
//! scoring and score persistence.
//!
//! Persistence is best-effort. A failed save is logged, listed in
//! `persistence_failures` and never discards the computed results.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::benchmarks::BenchmarkTable;
use crate::config::EngineConfig;
use crate::error::ValuationEngineError;
use crate::questionnaire::{resolve_answers, QuestionnaireAnswer, ResolvedInputs};
use crate::scoring::{calculate_startup_score, ScoreData, ScoringInput};
use crate::session::{should_auto_calculate, AutoTrigger};
use crate::store::{AssessmentStore, ScoreRecord, ScoreStore};
use crate::types::{with_metadata, CompanyFacts, ComputationOutput, ValuationFacts};
use crate::valuation::{calculate_valuation, MethodWeights, ValuationInput, ValuationOutput};
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything an assessment needs. `company` and `valuation` are the stored
/// records; both are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub company_id: String,
    pub valuation_id: String,
    #[serde(default)]
    pub company: Option<CompanyFacts>,
    #[serde(default)]
    pub valuation: Option<ValuationFacts>,
    #[serde(default)]
    pub questionnaire: Vec<QuestionnaireAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<MethodWeights>,
}

/// A save that did not go through. The caller may retry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceFailure {
    pub operation: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreAssessment {
    pub resolved_inputs: ResolvedInputs,
    pub score: ScoreData,
    pub score_record: ScoreRecord,
    pub persistence_failures: Vec<PersistenceFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentOutput {
    pub valuation: ValuationOutput,
    pub resolved_inputs: ResolvedInputs,
    pub score: ScoreData,
    pub score_record: ScoreRecord,
    pub persistence_failures: Vec<PersistenceFailure>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record_failure(
    failures: &mut Vec<PersistenceFailure>,
    operation: &str,
    result: EngineResult<()>,
) {
    if let Err(e) = result {
        warn!(operation, error = %e, "Persistence failed; results kept");
        failures.push(PersistenceFailure {
            operation: operation.to_string(),
            reason: e.to_string(),
        });
    }
}

/// Resolve the questionnaire, score and persist. Shared by the full
/// assessment and the score-only paths.
fn score_and_persist<S: ScoreStore + ?Sized>(
    company_id: &str,
    company: Option<&CompanyFacts>,
    answers: &[QuestionnaireAnswer],
    config: &EngineConfig,
    benchmarks: &BenchmarkTable,
    scores: &mut S,
    warnings: &mut Vec<String>,
) -> EngineResult<ScoreAssessment> {
    let resolved = resolve_answers(answers, &config.resolver_defaults, warnings);

    let company = CompanyFacts {
        employee_count: resolved.company.employee_count,
        ..company.cloned().unwrap_or_default()
    };
    let input = ScoringInput {
        company,
        performance: resolved.performance.clone(),
        valuation: resolved.valuation.clone(),
    };
    let scored = calculate_startup_score(&input, benchmarks)?;
    warnings.extend(scored.warnings);
    let score = scored.result;

    let record = score.to_record(company_id, Utc::now());
    let mut failures = Vec::new();
    record_failure(&mut failures, "upsert_score", scores.upsert_score(&record));
    record_failure(
        &mut failures,
        "save_score_details",
        scores.save_score_details(company_id, &score.details_json()),
    );

    Ok(ScoreAssessment {
        resolved_inputs: resolved,
        score,
        score_record: record,
        persistence_failures: failures,
    })
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Full assessment of one company.
///
/// Fails only when the company or valuation record is missing, or on a
/// boundary error such as invalid weights. Save failures are reported, not
/// raised.
pub fn assess(
    request: &AssessmentRequest,
    config: &EngineConfig,
    benchmarks: &BenchmarkTable,
    store: &mut dyn AssessmentStore,
) -> EngineResult<ComputationOutput<AssessmentOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let company = request.company.as_ref().ok_or_else(|| {
        ValuationEngineError::MissingPrerequisiteData(format!(
            "company record for '{}'",
            request.company_id
        ))
    })?;
    let valuation_facts = request.valuation.as_ref().ok_or_else(|| {
        ValuationEngineError::MissingPrerequisiteData(format!(
            "valuation record '{}'",
            request.valuation_id
        ))
    })?;

    let valued = calculate_valuation(
        &ValuationInput {
            company: company.clone(),
            valuation: valuation_facts.clone(),
            weights: request.weights.clone(),
        },
        config,
    )?;
    warnings.extend(valued.warnings);
    let valuation = valued.result;

    let mut failures = Vec::new();
    record_failure(
        &mut failures,
        "update_valuation",
        store.update_valuation(&request.valuation_id, &valuation.write_back),
    );

    let scored = score_and_persist(
        &request.company_id,
        Some(company),
        &request.questionnaire,
        config,
        benchmarks,
        store,
        &mut warnings,
    )?;
    failures.extend(scored.persistence_failures);

    for f in &failures {
        warnings.push(format!("Could not persist ({}): {}", f.operation, f.reason));
    }
    info!(
        company_id = %request.company_id,
        combined = %valuation.combined_valuation,
        total_score = %scored.score.total_score.round_dp(2),
        failed_saves = failures.len(),
        "Assessment complete"
    );

    let output = AssessmentOutput {
        valuation,
        resolved_inputs: scored.resolved_inputs,
        score: scored.score,
        score_record: scored.score_record,
        persistence_failures: failures,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Stage-weighted valuation with questionnaire-driven benchmark scoring",
        &serde_json::json!({
            "company_id": request.company_id,
            "valuation_id": request.valuation_id,
            "questionnaire_answers": request.questionnaire.len(),
            "custom_weights": request.weights.is_some(),
            "benchmarks": benchmarks.to_overrides(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Score a company from its questionnaire and persist the result. Manual
/// recalculations call this directly and bypass the auto-trigger.
pub fn score_company(
    company_id: &str,
    company: Option<&CompanyFacts>,
    answers: &[QuestionnaireAnswer],
    config: &EngineConfig,
    benchmarks: &BenchmarkTable,
    scores: &mut dyn ScoreStore,
) -> EngineResult<ComputationOutput<ScoreAssessment>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let assessment = score_and_persist(
        company_id,
        company,
        answers,
        config,
        benchmarks,
        scores,
        &mut warnings,
    )?;
    for f in &assessment.persistence_failures {
        warnings.push(format!("Could not persist ({}): {}", f.operation, f.reason));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Questionnaire-driven benchmark scoring",
        &serde_json::json!({
            "company_id": company_id,
            "questionnaire_answers": answers.len(),
        }),
        warnings,
        elapsed,
        assessment,
    ))
}

/// Automatic scoring for a session: runs only when no usable score exists
/// and this session has not auto-calculated before. Returns `Ok(None)` when
/// skipped.
pub fn auto_score(
    trigger: &AutoTrigger,
    company_id: &str,
    company: Option<&CompanyFacts>,
    answers: &[QuestionnaireAnswer],
    config: &EngineConfig,
    benchmarks: &BenchmarkTable,
    scores: &mut dyn ScoreStore,
) -> EngineResult<Option<ComputationOutput<ScoreAssessment>>> {
    let latest = match scores.latest_score(company_id) {
        Ok(latest) => latest,
        Err(e) => {
            warn!(company_id, error = %e, "Could not read latest score; treating as absent");
            None
        }
    };
    if !should_auto_calculate(latest.as_ref()) || !trigger.try_fire() {
        return Ok(None);
    }

    trigger.begin();
    let result = score_company(company_id, company, answers, config, benchmarks, scores);
    trigger.finish();
    result.map(Some)
}
