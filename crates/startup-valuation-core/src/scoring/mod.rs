pub mod aggregate;
pub mod metrics;

pub use aggregate::{aggregate, calculate_startup_score, category_score, ScoreData, ScoreTier};
pub use metrics::{
    evaluate_metric, evaluate_metrics, metric_value, ScoreCategory, ScoreMetric,
    ScoreMetricDetail, ScoringInput,
};
