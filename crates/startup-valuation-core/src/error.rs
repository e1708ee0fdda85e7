use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationEngineError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Required company or valuation context is absent. Fatal for a calculation.
    #[error("Missing prerequisite data: {0}")]
    MissingPrerequisiteData(String),

    /// A questionnaire answer that could not be read as a number. The resolver
    /// recovers from this locally by treating the answer as absent.
    #[error("Invalid numeric input for question {question}: '{answer}'")]
    InvalidNumericInput { question: String, answer: String },

    #[error("Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: String },

    #[error("Persistence failure in {store}: {reason}")]
    Persistence { store: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ValuationEngineError {
    pub fn overflow(context: impl Into<String>) -> Self {
        ValuationEngineError::ArithmeticOverflow {
            context: context.into(),
        }
    }

    pub fn persistence(store: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ValuationEngineError::Persistence {
            store: store.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for ValuationEngineError {
    fn from(e: serde_json::Error) -> Self {
        ValuationEngineError::SerializationError(e.to_string())
    }
}
