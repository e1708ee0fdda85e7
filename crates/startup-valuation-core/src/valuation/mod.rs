pub mod combine;
pub mod methods;
pub mod normalize;

pub use combine::{
    calculate_valuation, combine, default_results, stage_weights, MethodWeightConfig,
    MethodWeights, ValuationInput, ValuationOutput,
};
pub use methods::{evaluate_all, CompanyStage, MethodValues, ValuationMethod};
pub use normalize::{normalize_method_values, normalize_values, NormalizationOutcome, NormalizeInput};
