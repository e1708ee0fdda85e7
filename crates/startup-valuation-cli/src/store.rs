//! File-backed store: one JSON document per record under a root directory.
//!
//! ```text
//! <root>/valuations/<valuation_id>.json
//! <root>/scores/<company_id>.json
//! <root>/score_details/<company_id>.json
//! <root>/benchmarks/user.json
//! <root>/benchmarks/industry/<industry>.json
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use startup_valuation_core::benchmarks::BenchmarkOverrides;
use startup_valuation_core::store::{
    BenchmarkStore, ScoreRecord, ScoreStore, ValuationStore, ValuationUpdate,
};
use startup_valuation_core::{EngineResult, ValuationEngineError};

pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path(&self, table: &str, id: &str) -> PathBuf {
        self.root.join(table).join(format!("{}.json", file_stem(id)))
    }

    fn write<T: Serialize + ?Sized>(&self, table: &str, id: &str, value: &T) -> EngineResult<()> {
        let path = self.path(table, id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ValuationEngineError::persistence(table, e))?;
        }
        let body = serde_json::to_string_pretty(value)?;
        fs::write(&path, body).map_err(|e| ValuationEngineError::persistence(table, e))?;
        debug!(path = %path.display(), "Record written");
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, table: &str, id: &str) -> EngineResult<Option<T>> {
        let path = self.path(table, id);
        let body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ValuationEngineError::persistence(table, e)),
        };
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ValuationEngineError::persistence(table, format!("{}: {e}", path.display())))
    }

    fn remove(&self, table: &str, id: &str) -> EngineResult<()> {
        match fs::remove_file(self.path(table, id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ValuationEngineError::persistence(table, e)),
        }
    }
}

/// Ids become file names; anything outside `[A-Za-z0-9._-]` is replaced.
fn file_stem(id: &str) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        stem
    }
}

impl ValuationStore for JsonDirStore {
    fn update_valuation(&mut self, valuation_id: &str, update: &ValuationUpdate) -> EngineResult<()> {
        self.write("valuations", valuation_id, update)
    }
}

impl ScoreStore for JsonDirStore {
    fn upsert_score(&mut self, record: &ScoreRecord) -> EngineResult<()> {
        self.write("scores", &record.company_id, record)
    }

    fn save_score_details(&mut self, company_id: &str, details: &serde_json::Value) -> EngineResult<()> {
        self.write("score_details", company_id, details)
    }

    fn latest_score(&self, company_id: &str) -> EngineResult<Option<ScoreRecord>> {
        self.read("scores", company_id)
    }
}

impl BenchmarkStore for JsonDirStore {
    fn load_user_benchmarks(&self) -> EngineResult<BenchmarkOverrides> {
        Ok(self.read("benchmarks", "user")?.unwrap_or_default())
    }

    fn save_user_benchmarks(&mut self, values: &BenchmarkOverrides) -> EngineResult<()> {
        self.write("benchmarks", "user", values)
    }

    fn reset_user_benchmarks(&mut self) -> EngineResult<()> {
        self.remove("benchmarks", "user")
    }

    fn industry_benchmarks(&self, industry: &str) -> EngineResult<Option<BenchmarkOverrides>> {
        self.read("benchmarks/industry", industry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_score_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDirStore::new(dir.path());
        assert_eq!(store.latest_score("acme").unwrap(), None);

        let record = ScoreRecord {
            company_id: "acme".into(),
            total_score: dec!(57),
            finance_score: dec!(40),
            team_score: dec!(100),
            growth_score: dec!(12),
            market_score: dec!(80),
            product_score: dec!(75),
            calculation_date: Utc::now(),
        };
        store.upsert_score(&record).unwrap();
        assert_eq!(store.latest_score("acme").unwrap(), Some(record));
    }

    #[test]
    fn test_reset_removes_user_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonDirStore::new(dir.path());
        let values: BenchmarkOverrides = [("avg_revenue".to_string(), dec!(500000))].into_iter().collect();

        store.save_user_benchmarks(&values).unwrap();
        assert_eq!(store.load_user_benchmarks().unwrap(), values);

        store.reset_user_benchmarks().unwrap();
        assert!(store.load_user_benchmarks().unwrap().is_empty());
        // Resetting twice is fine.
        store.reset_user_benchmarks().unwrap();
    }

    #[test]
    fn test_ids_cannot_escape_the_root() {
        assert_eq!(file_stem("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(file_stem(".."), "_");
        assert_eq!(file_stem("Health Tech"), "Health_Tech");
    }
}
