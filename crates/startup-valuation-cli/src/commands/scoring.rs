use clap::Args;
use serde_json::{json, Value};

use startup_valuation_core::benchmarks::load_benchmarks;
use startup_valuation_core::engine::{auto_score, score_company};
use startup_valuation_core::questionnaire::{resolve_inputs, QuestionnaireAnswer};
use startup_valuation_core::scoring::{calculate_startup_score, ScoringInput};
use startup_valuation_core::session::AutoTrigger;

use super::{prepend_warnings, to_value, Context};
use crate::input;

/// Arguments for the startup health score
#[derive(Args)]
pub struct ScoreArgs {
    /// Path to JSON input. Scoring facts by default; a questionnaire answer
    /// list when --company-id is given.
    #[arg(long)]
    pub input: Option<String>,

    /// Industry whose stored benchmarks apply (defaults to the company's)
    #[arg(long)]
    pub industry: Option<String>,

    /// Score this company from questionnaire answers and save the result
    #[arg(long)]
    pub company_id: Option<String>,

    /// Only score when no usable score has been saved yet
    #[arg(long, requires = "company_id")]
    pub auto: bool,
}

/// Arguments for questionnaire resolution
#[derive(Args)]
pub struct ResolveArgs {
    /// Path to JSON file holding a list of `{question_key, answer}` rows
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_score(args: ScoreArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let mut store = ctx.store();
    let mut warnings = Vec::new();

    let Some(company_id) = args.company_id else {
        let scoring_input: ScoringInput = input::require_input(args.input.as_deref(), "Scoring input")?;
        let industry = args.industry.or_else(|| scoring_input.company.industry.clone());
        let table = load_benchmarks(&store, industry.as_deref(), &mut warnings);
        let result = calculate_startup_score(&scoring_input, &table)?;
        return Ok(prepend_warnings(to_value(&result)?, warnings));
    };

    let answers: Vec<QuestionnaireAnswer> = input::read_input(args.input.as_deref())?.unwrap_or_default();
    let table = load_benchmarks(&store, args.industry.as_deref(), &mut warnings);

    if args.auto {
        let trigger = AutoTrigger::new();
        let scored = auto_score(&trigger, &company_id, None, &answers, &ctx.config, &table, &mut store)?;
        return match scored {
            Some(result) => Ok(prepend_warnings(to_value(&result)?, warnings)),
            None => Ok(json!({
                "company_id": company_id,
                "skipped": true,
                "reason": "A non-zero score is already saved for this company",
            })),
        };
    }

    let result = score_company(&company_id, None, &answers, &ctx.config, &table, &mut store)?;
    Ok(prepend_warnings(to_value(&result)?, warnings))
}

pub fn run_resolve(args: ResolveArgs, ctx: &Context) -> Result<Value, Box<dyn std::error::Error>> {
    let answers: Vec<QuestionnaireAnswer> = input::require_input(args.input.as_deref(), "Questionnaire answers")?;
    let result = resolve_inputs(&answers, &ctx.config.resolver_defaults)?;
    to_value(&result)
}
