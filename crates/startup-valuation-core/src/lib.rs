pub mod benchmarks;
pub mod config;
pub mod error;
pub mod questionnaire;
pub mod session;
pub mod store;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "scoring")]
pub mod scoring;

#[cfg(feature = "engine")]
pub mod engine;

pub use error::ValuationEngineError;
pub use types::*;

/// Standard result type for all engine operations
pub type EngineResult<T> = Result<T, ValuationEngineError>;
