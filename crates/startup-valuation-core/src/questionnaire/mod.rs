pub mod answers;
pub mod resolver;

pub use answers::{
    MarketFitEvidence, MarketSizeBucket, ProductStage, Question, QuestionnaireAnswer, Scalability,
};
pub use resolver::{resolve_answers, resolve_inputs, ResolvedInputs, ValueSource};
