//! Benchmark resolution.
//!
//! Merges built-in defaults, optional industry values and user overrides into a
//! complete [`BenchmarkTable`]. The table is an explicit value: callers resolve
//! it once, pass it into each calculation and resolve again after an edit.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::store::BenchmarkStore;
use crate::types::{with_metadata, ComputationOutput};
use crate::EngineResult;

/// Flat metric → value map as persisted by a benchmark store.
pub type BenchmarkOverrides = BTreeMap<String, Decimal>;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BenchmarkKey {
    #[serde(rename = "avg_revenue")]
    Revenue,
    #[serde(rename = "avg_gross_margin")]
    GrossMargin,
    #[serde(rename = "avg_team_size")]
    TeamSize,
    #[serde(rename = "avg_valuation")]
    Valuation,
    #[serde(rename = "avg_growth_rate")]
    GrowthRate,
    #[serde(rename = "avg_cash_on_hand")]
    CashOnHand,
    #[serde(rename = "avg_annual_roi")]
    AnnualRoi,
    #[serde(rename = "avg_market_size")]
    MarketSize,
    #[serde(rename = "product_readiness")]
    ProductReadiness,
}

impl BenchmarkKey {
    pub const ALL: [BenchmarkKey; 9] = [
        BenchmarkKey::Revenue,
        BenchmarkKey::GrossMargin,
        BenchmarkKey::TeamSize,
        BenchmarkKey::Valuation,
        BenchmarkKey::GrowthRate,
        BenchmarkKey::CashOnHand,
        BenchmarkKey::AnnualRoi,
        BenchmarkKey::MarketSize,
        BenchmarkKey::ProductReadiness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BenchmarkKey::Revenue => "avg_revenue",
            BenchmarkKey::GrossMargin => "avg_gross_margin",
            BenchmarkKey::TeamSize => "avg_team_size",
            BenchmarkKey::Valuation => "avg_valuation",
            BenchmarkKey::GrowthRate => "avg_growth_rate",
            BenchmarkKey::CashOnHand => "avg_cash_on_hand",
            BenchmarkKey::AnnualRoi => "avg_annual_roi",
            BenchmarkKey::MarketSize => "avg_market_size",
            BenchmarkKey::ProductReadiness => "product_readiness",
        }
    }

    /// Built-in reference value. Always present.
    pub fn default_value(self) -> Decimal {
        match self {
            BenchmarkKey::Revenue => dec!(350_000),
            BenchmarkKey::GrossMargin => dec!(65),
            BenchmarkKey::TeamSize => dec!(15),
            BenchmarkKey::Valuation => dec!(1_500_000),
            BenchmarkKey::GrowthRate => dec!(25),
            BenchmarkKey::CashOnHand => dec!(150_000),
            BenchmarkKey::AnnualRoi => dec!(20),
            BenchmarkKey::MarketSize => dec!(5_000_000),
            BenchmarkKey::ProductReadiness => dec!(100),
        }
    }
}

impl fmt::Display for BenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BenchmarkKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BenchmarkKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown benchmark metric '{s}'"))
    }
}

/// Which layer a resolved benchmark value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkSource {
    Default,
    Industry,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub value: Decimal,
    pub source: BenchmarkSource,
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Complete benchmark lookup table. Every key has a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkTable {
    entries: BTreeMap<BenchmarkKey, BenchmarkEntry>,
}

impl Default for BenchmarkTable {
    fn default() -> Self {
        let entries = BenchmarkKey::ALL
            .into_iter()
            .map(|k| {
                (
                    k,
                    BenchmarkEntry {
                        value: k.default_value(),
                        source: BenchmarkSource::Default,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

impl BenchmarkTable {
    /// Reference value for `key`. A non-positive stored value falls back to
    /// the built-in default so callers can always divide by it.
    pub fn get(&self, key: BenchmarkKey) -> Decimal {
        match self.entries.get(&key) {
            Some(entry) if entry.value > Decimal::ZERO => entry.value,
            _ => key.default_value(),
        }
    }

    pub fn source(&self, key: BenchmarkKey) -> BenchmarkSource {
        self.entries
            .get(&key)
            .map(|e| e.source)
            .unwrap_or(BenchmarkSource::Default)
    }

    pub fn entries(&self) -> &BTreeMap<BenchmarkKey, BenchmarkEntry> {
        &self.entries
    }

    /// Flat `metric → value` view, the shape benchmark stores persist.
    pub fn to_overrides(&self) -> BenchmarkOverrides {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str().to_string(), e.value))
            .collect()
    }

    fn apply(
        &mut self,
        layer: &BenchmarkOverrides,
        source: BenchmarkSource,
        warnings: &mut Vec<String>,
    ) {
        for (metric, value) in layer {
            let key = match metric.parse::<BenchmarkKey>() {
                Ok(k) => k,
                Err(reason) => {
                    warnings.push(format!("Ignoring {source:?} benchmark: {reason}"));
                    continue;
                }
            };
            if *value <= Decimal::ZERO {
                warnings.push(format!(
                    "Ignoring {source:?} benchmark {metric} = {value}: value must be positive"
                ));
                continue;
            }
            self.entries.insert(
                key,
                BenchmarkEntry {
                    value: *value,
                    source,
                },
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Input for a benchmark resolution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BenchmarkInput {
    #[serde(default)]
    pub user_overrides: BenchmarkOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_values: Option<BenchmarkOverrides>,
}

/// Merge defaults ← industry values ← user overrides. Industry values only
/// land on keys the user has not overridden.
pub fn merge_benchmarks(
    user_overrides: &BenchmarkOverrides,
    industry_values: Option<&BenchmarkOverrides>,
    warnings: &mut Vec<String>,
) -> BenchmarkTable {
    let mut table = BenchmarkTable::default();
    let first_new = warnings.len();
    if let Some(industry) = industry_values {
        table.apply(industry, BenchmarkSource::Industry, warnings);
    }
    table.apply(user_overrides, BenchmarkSource::User, warnings);
    for w in &warnings[first_new..] {
        warn!("{w}");
    }
    debug!(table = ?table.to_overrides(), "Benchmarks resolved");
    table
}

/// Resolve a complete benchmark table from explicit layers.
pub fn resolve_benchmarks(
    input: &BenchmarkInput,
) -> EngineResult<ComputationOutput<BenchmarkTable>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let table = merge_benchmarks(
        &input.user_overrides,
        input.industry_values.as_ref(),
        &mut warnings,
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Benchmark resolution (user > industry > default)",
        &serde_json::json!({
            "user_overrides": input.user_overrides.len(),
            "industry_values": input.industry_values.as_ref().map(|m| m.len()),
        }),
        warnings,
        elapsed,
        table,
    ))
}

/// Resolve the table from a store. Read failures degrade to the layers that
/// could be read; the defaults are always available.
pub fn load_benchmarks(
    store: &dyn BenchmarkStore,
    industry: Option<&str>,
    warnings: &mut Vec<String>,
) -> BenchmarkTable {
    let user = store.load_user_benchmarks().unwrap_or_else(|e| {
        warnings.push(format!("User benchmarks unavailable, using defaults: {e}"));
        BenchmarkOverrides::new()
    });
    let industry_values = match industry {
        Some(name) => store.industry_benchmarks(name).unwrap_or_else(|e| {
            warnings.push(format!("Industry benchmarks for '{name}' unavailable: {e}"));
            None
        }),
        None => None,
    };
    merge_benchmarks(&user, industry_values.as_ref(), warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn overrides(pairs: &[(&str, Decimal)]) -> BenchmarkOverrides {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_defaults_are_complete() {
        let table = BenchmarkTable::default();
        assert_eq!(table.entries().len(), 9);
        assert_eq!(table.get(BenchmarkKey::Revenue), dec!(350000));
        assert_eq!(table.get(BenchmarkKey::ProductReadiness), dec!(100));
    }

    #[test]
    fn test_user_beats_industry_beats_default() {
        let user = overrides(&[("avg_revenue", dec!(500000))]);
        let industry = overrides(&[("avg_revenue", dec!(400000)), ("avg_team_size", dec!(25))]);
        let mut warnings = Vec::new();
        let table = merge_benchmarks(&user, Some(&industry), &mut warnings);

        assert_eq!(table.get(BenchmarkKey::Revenue), dec!(500000));
        assert_eq!(table.source(BenchmarkKey::Revenue), BenchmarkSource::User);
        assert_eq!(table.get(BenchmarkKey::TeamSize), dec!(25));
        assert_eq!(table.source(BenchmarkKey::TeamSize), BenchmarkSource::Industry);
        assert_eq!(table.get(BenchmarkKey::GrowthRate), dec!(25));
        assert_eq!(table.source(BenchmarkKey::GrowthRate), BenchmarkSource::Default);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_and_non_positive_overrides_ignored() {
        let user = overrides(&[("avg_unicorns", dec!(3)), ("avg_valuation", dec!(0))]);
        let mut warnings = Vec::new();
        let table = merge_benchmarks(&user, None, &mut warnings);
        assert_eq!(table.get(BenchmarkKey::Valuation), dec!(1500000));
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_earlier_warnings_left_alone() {
        let user = overrides(&[("avg_unicorns", dec!(3))]);
        let mut warnings = vec!["Industry benchmarks unavailable".to_string()];
        merge_benchmarks(&user, None, &mut warnings);
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0], "Industry benchmarks unavailable");
        assert!(warnings[1].contains("avg_unicorns"));
    }

    #[test]
    fn test_key_round_trips_through_wire_name() {
        for key in BenchmarkKey::ALL {
            assert_eq!(key.as_str().parse::<BenchmarkKey>().unwrap(), key);
        }
    }
}
