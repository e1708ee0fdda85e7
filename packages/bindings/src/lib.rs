use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use startup_valuation_core::benchmarks::{resolve_benchmarks as resolve_table, BenchmarkInput};
use startup_valuation_core::config::EngineConfig;
use startup_valuation_core::engine::{self, AssessmentRequest};
use startup_valuation_core::questionnaire::{self, QuestionnaireAnswer};
use startup_valuation_core::scoring::{self, ScoringInput};
use startup_valuation_core::store::MemoryStore;
use startup_valuation_core::valuation::{self, NormalizeInput, ValuationInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse an optional configuration document; absent means defaults.
fn parse_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    let config: EngineConfig = match config_json {
        Some(raw) => serde_json::from_str(&raw).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

/// Scoring facts together with the benchmark layers to score them against.
#[derive(Deserialize)]
struct ScoreRequest {
    #[serde(default)]
    facts: ScoringInput,
    #[serde(default)]
    benchmarks: BenchmarkInput,
}

/// Assessment request plus benchmark layers. Persistence stays in memory;
/// the caller receives the write-back payload and the score row in the output.
#[derive(Deserialize)]
struct AssessRequest {
    request: AssessmentRequest,
    #[serde(default)]
    benchmarks: BenchmarkInput,
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_valuation(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let input: ValuationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::calculate_valuation(&input, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn normalize_values(input_json: String) -> NapiResult<String> {
    let input: NormalizeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::normalize_values(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[napi]
pub fn resolve_benchmarks(input_json: String) -> NapiResult<String> {
    let input: BenchmarkInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = resolve_table(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn resolve_questionnaire(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let answers: Vec<QuestionnaireAnswer> =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = questionnaire::resolve_inputs(&answers, &config.resolver_defaults)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_startup_score(input_json: String) -> NapiResult<String> {
    let input: ScoreRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let table = resolve_table(&input.benchmarks).map_err(to_napi_error)?;
    let mut output =
        scoring::calculate_startup_score(&input.facts, &table.result).map_err(to_napi_error)?;
    output.warnings = [table.warnings, output.warnings].concat();
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Assessment
// ---------------------------------------------------------------------------

#[napi]
pub fn assess(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = parse_config(config_json)?;
    let input: AssessRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let table = resolve_table(&input.benchmarks).map_err(to_napi_error)?;

    let mut store = MemoryStore::new();
    let mut output = engine::assess(&input.request, &config, &table.result, &mut store)
        .map_err(to_napi_error)?;
    output.warnings = [table.warnings, output.warnings].concat();
    serde_json::to_string(&output).map_err(to_napi_error)
}
