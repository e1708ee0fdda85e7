//! Questionnaire answers and the categorical tiers they map to.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationEngineError;
use crate::types::{Money, Percent};
use crate::EngineResult;

// ─── Raw answers ─────────────────────────────────────────────────────────────

/// One questionnaire row as the questionnaire source delivers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    pub question_key: String,
    #[serde(default)]
    pub answer: Option<String>,
}

impl QuestionnaireAnswer {
    pub fn new(question_key: &str, answer: &str) -> Self {
        Self {
            question_key: question_key.to_string(),
            answer: Some(answer.to_string()),
        }
    }
}

/// Questions the engine reads, by stable key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Question {
    FoundersCount,
    EmployeesCount,
    ProductStage,
    ProductMarketFit,
    Scalability,
    MarketSize,
    GrossMargin,
    Revenue,
    CashOnHand,
    GrowthRate,
    BurnRate,
    RunwayMonths,
    ProfitMargin,
    ExpectedValuation,
}

impl Question {
    pub fn key(self) -> &'static str {
        match self {
            Question::FoundersCount => "1.1",
            Question::EmployeesCount => "1.6",
            Question::ProductStage => "2.1",
            Question::ProductMarketFit => "2.7",
            Question::Scalability => "2.9",
            Question::MarketSize => "3.1",
            Question::GrossMargin => "4.3",
            Question::Revenue => "6.1",
            Question::CashOnHand => "6.2",
            Question::GrowthRate => "6.3",
            Question::BurnRate => "6.4",
            Question::RunwayMonths => "6.5",
            Question::ProfitMargin => "6.6",
            Question::ExpectedValuation => "7.8",
        }
    }
}

/// Read a numeric answer. Tolerates surrounding whitespace, thousands
/// separators, a leading `$` and a trailing `%`.
pub fn parse_numeric(question: Question, raw: &str) -> EngineResult<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();

    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| ValuationEngineError::InvalidNumericInput {
            question: question.key().to_string(),
            answer: raw.to_string(),
        })
}

// ─── Categorical tiers ───────────────────────────────────────────────────────

/// Q2.1: how far the product has come.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStage {
    IdeaOnly,
    PrototypeMvp,
    LimitedFeatures,
    CompleteProduct,
    MatureProduct,
    Unrecognized(String),
}

impl ProductStage {
    pub fn parse(answer: &str) -> Self {
        if answer.contains("Idea/Concept Only") {
            ProductStage::IdeaOnly
        } else if answer.contains("Prototype/MVP") {
            ProductStage::PrototypeMvp
        } else if answer.contains("Working Product with Limited Features") {
            ProductStage::LimitedFeatures
        } else if answer.contains("Complete Product with Full Functionality") {
            ProductStage::CompleteProduct
        } else if answer.contains("Mature Product with Multiple Iterations") {
            ProductStage::MatureProduct
        } else {
            ProductStage::Unrecognized(answer.to_string())
        }
    }

    pub fn score(&self) -> Option<Percent> {
        match self {
            ProductStage::IdeaOnly => Some(dec!(20)),
            ProductStage::PrototypeMvp => Some(dec!(40)),
            ProductStage::LimitedFeatures => Some(dec!(60)),
            ProductStage::CompleteProduct => Some(dec!(80)),
            ProductStage::MatureProduct => Some(dec!(100)),
            ProductStage::Unrecognized(_) => None,
        }
    }
}

/// Q2.7: evidence of product-market fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketFitEvidence {
    NoMetrics,
    EarlyIndicators,
    StrongEvidence,
    ClearFitWithRetention,
    Unrecognized(String),
}

impl MarketFitEvidence {
    pub fn parse(answer: &str) -> Self {
        if answer.contains("No Metrics Yet") {
            MarketFitEvidence::NoMetrics
        } else if answer.contains("Early Indicators but Not Conclusive") {
            MarketFitEvidence::EarlyIndicators
        } else if answer.contains("Strong Evidence of Product-Market Fit") {
            MarketFitEvidence::StrongEvidence
        } else if answer.contains("Clear Product-Market Fit with Retention Data") {
            MarketFitEvidence::ClearFitWithRetention
        } else {
            MarketFitEvidence::Unrecognized(answer.to_string())
        }
    }

    pub fn score(&self) -> Option<Percent> {
        match self {
            MarketFitEvidence::NoMetrics => Some(dec!(25)),
            MarketFitEvidence::EarlyIndicators => Some(dec!(50)),
            MarketFitEvidence::StrongEvidence => Some(dec!(75)),
            MarketFitEvidence::ClearFitWithRetention => Some(dec!(100)),
            MarketFitEvidence::Unrecognized(_) => None,
        }
    }
}

/// Q2.9: how well the product scales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalability {
    Difficult,
    Moderate,
    High,
    Complete,
    Unrecognized(String),
}

impl Scalability {
    pub fn parse(answer: &str) -> Self {
        if answer.contains("Difficult to Scale") {
            Scalability::Difficult
        } else if answer.contains("Moderately Scalable") {
            Scalability::Moderate
        } else if answer.contains("Highly Scalable") {
            Scalability::High
        } else if answer.contains("Completely Scalable") {
            Scalability::Complete
        } else {
            Scalability::Unrecognized(answer.to_string())
        }
    }

    pub fn score(&self) -> Option<Percent> {
        match self {
            Scalability::Difficult => Some(dec!(25)),
            Scalability::Moderate => Some(dec!(50)),
            Scalability::High => Some(dec!(75)),
            Scalability::Complete => Some(dec!(100)),
            Scalability::Unrecognized(_) => None,
        }
    }
}

/// Q3.1: total addressable market range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketSizeBucket {
    UnderHundredMillion,
    HundredMillionToBillion,
    BillionToTenBillion,
    OverTenBillion,
    Unrecognized(String),
}

impl MarketSizeBucket {
    pub fn parse(answer: &str) -> Self {
        if answer.contains("Less Than $100 Million") {
            MarketSizeBucket::UnderHundredMillion
        } else if answer.contains("$100 Million - $1 Billion") {
            MarketSizeBucket::HundredMillionToBillion
        } else if answer.contains("$1 Billion - $10 Billion") {
            MarketSizeBucket::BillionToTenBillion
        } else if answer.contains("More Than $10 Billion") {
            MarketSizeBucket::OverTenBillion
        } else {
            MarketSizeBucket::Unrecognized(answer.to_string())
        }
    }

    /// Upper edge of the bucket. The open-ended top bucket is pinned at $20B.
    pub fn ceiling(&self) -> Option<Money> {
        match self {
            MarketSizeBucket::UnderHundredMillion => Some(dec!(100_000_000)),
            MarketSizeBucket::HundredMillionToBillion => Some(dec!(1_000_000_000)),
            MarketSizeBucket::BillionToTenBillion => Some(dec!(10_000_000_000)),
            MarketSizeBucket::OverTenBillion => Some(dec!(20_000_000_000)),
            MarketSizeBucket::Unrecognized(_) => None,
        }
    }
}
