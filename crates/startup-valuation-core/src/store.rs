//! Persistence collaborators.
//!
//! The engine never talks to a database directly. It writes through these
//! traits; callers plug in whatever backs them. [`MemoryStore`] implements all
//! three for tests and embedded use.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::benchmarks::BenchmarkOverrides;
use crate::error::ValuationEngineError;
use crate::types::Money;
use crate::EngineResult;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Coarse score row as a structured store keeps it: integer-rounded scores
/// only. Per-metric details travel separately as a JSON blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub company_id: String,
    pub total_score: Decimal,
    pub finance_score: Decimal,
    pub team_score: Decimal,
    pub growth_score: Decimal,
    pub market_score: Decimal,
    pub product_score: Decimal,
    pub calculation_date: DateTime<Utc>,
}

/// Valuation write-back payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationUpdate {
    pub selected_valuation: Money,
    pub pre_money_valuation: Money,
    pub investment: Money,
    pub post_money_valuation: Money,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

pub trait ValuationStore {
    fn update_valuation(&mut self, valuation_id: &str, update: &ValuationUpdate)
        -> EngineResult<()>;
}

pub trait ScoreStore {
    /// Insert or replace the score row for `record.company_id`.
    fn upsert_score(&mut self, record: &ScoreRecord) -> EngineResult<()>;

    fn save_score_details(
        &mut self,
        company_id: &str,
        details: &serde_json::Value,
    ) -> EngineResult<()>;

    fn latest_score(&self, company_id: &str) -> EngineResult<Option<ScoreRecord>>;
}

pub trait BenchmarkStore {
    fn load_user_benchmarks(&self) -> EngineResult<BenchmarkOverrides>;

    fn save_user_benchmarks(&mut self, values: &BenchmarkOverrides) -> EngineResult<()>;

    /// Drop every user override so resolution falls back to defaults.
    fn reset_user_benchmarks(&mut self) -> EngineResult<()>;

    /// Industry-specific values, when the backend has any.
    fn industry_benchmarks(&self, _industry: &str) -> EngineResult<Option<BenchmarkOverrides>> {
        Ok(None)
    }
}

/// Everything a full assessment writes to.
pub trait AssessmentStore: ValuationStore + ScoreStore {}

impl<T: ValuationStore + ScoreStore> AssessmentStore for T {}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Store kept entirely in memory. `fail_writes` makes every write return a
/// persistence error, which is how callers exercise the best-effort save path.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub valuations: BTreeMap<String, ValuationUpdate>,
    pub scores: BTreeMap<String, ScoreRecord>,
    pub score_details: BTreeMap<String, serde_json::Value>,
    pub user_benchmarks: BenchmarkOverrides,
    pub industry: BTreeMap<String, BenchmarkOverrides>,
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self, store: &str) -> EngineResult<()> {
        if self.fail_writes {
            return Err(ValuationEngineError::persistence(
                store,
                "memory store is read-only",
            ));
        }
        Ok(())
    }
}

impl ValuationStore for MemoryStore {
    fn update_valuation(
        &mut self,
        valuation_id: &str,
        update: &ValuationUpdate,
    ) -> EngineResult<()> {
        self.check_writable("valuations")?;
        self.valuations
            .insert(valuation_id.to_string(), update.clone());
        Ok(())
    }
}

impl ScoreStore for MemoryStore {
    fn upsert_score(&mut self, record: &ScoreRecord) -> EngineResult<()> {
        self.check_writable("startup_scores")?;
        self.scores
            .insert(record.company_id.clone(), record.clone());
        Ok(())
    }

    fn save_score_details(
        &mut self,
        company_id: &str,
        details: &serde_json::Value,
    ) -> EngineResult<()> {
        self.check_writable("score_details")?;
        self.score_details
            .insert(company_id.to_string(), details.clone());
        Ok(())
    }

    fn latest_score(&self, company_id: &str) -> EngineResult<Option<ScoreRecord>> {
        Ok(self.scores.get(company_id).cloned())
    }
}

impl BenchmarkStore for MemoryStore {
    fn load_user_benchmarks(&self) -> EngineResult<BenchmarkOverrides> {
        Ok(self.user_benchmarks.clone())
    }

    fn save_user_benchmarks(&mut self, values: &BenchmarkOverrides) -> EngineResult<()> {
        self.check_writable("user_benchmarks")?;
        self.user_benchmarks = values.clone();
        Ok(())
    }

    fn reset_user_benchmarks(&mut self) -> EngineResult<()> {
        self.check_writable("user_benchmarks")?;
        self.user_benchmarks.clear();
        Ok(())
    }

    fn industry_benchmarks(&self, industry: &str) -> EngineResult<Option<BenchmarkOverrides>> {
        Ok(self.industry.get(industry).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_upsert_replaces_existing_row() {
        let mut store = MemoryStore::new();
        let mut record = ScoreRecord {
            company_id: "acme".into(),
            total_score: dec!(40),
            finance_score: dec!(30),
            team_score: dec!(50),
            growth_score: dec!(60),
            market_score: dec!(70),
            product_score: dec!(80),
            calculation_date: Utc::now(),
        };
        store.upsert_score(&record).unwrap();
        record.total_score = dec!(55);
        store.upsert_score(&record).unwrap();

        assert_eq!(store.scores.len(), 1);
        let latest = store.latest_score("acme").unwrap().unwrap();
        assert_eq!(latest.total_score, dec!(55));
    }

    #[test]
    fn test_failing_store_reports_persistence_error() {
        let mut store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let err = store.reset_user_benchmarks().unwrap_err();
        assert!(matches!(err, ValuationEngineError::Persistence { .. }));
    }
}
