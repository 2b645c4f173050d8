use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use costkit_plugin::plugin::operation;
use costkit_types::PerformanceBaseline;

/// Per-operation latency baselines, loaded from TOML or built in.
///
/// ```toml
/// [[baseline]]
/// method = "GetActualCost"
/// standard_ms = 100
/// advanced_ms = 50
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSet {
    entries: Vec<PerformanceBaseline>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBaselineFile {
    #[serde(default)]
    baseline: Vec<PerformanceBaseline>,
}

impl Default for BaselineSet {
    /// Built-in thresholds for the four core operations.
    fn default() -> Self {
        Self {
            entries: vec![
                PerformanceBaseline::new(operation::GET_ACTUAL_COST, Some(100), Some(50)),
                PerformanceBaseline::new(operation::GET_PROJECTED_COST, Some(100), Some(50)),
                PerformanceBaseline::new(operation::GET_PRICING_SPEC, Some(200), Some(100)),
                PerformanceBaseline::new(operation::ESTIMATE_COST, Some(150), Some(75)),
            ],
        }
    }
}

impl BaselineSet {
    /// Parse and validate baseline TOML.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let raw: RawBaselineFile =
            toml::from_str(input).context("failed to parse baseline TOML")?;
        let set = Self {
            entries: raw.baseline,
        };
        set.validate()?;
        Ok(set)
    }

    /// Load and validate baselines from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read baseline file at {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid baseline file at {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();

        for entry in &self.entries {
            if entry.method.trim().is_empty() {
                bail!("baseline method must not be empty");
            }
            if !seen.insert(entry.method.as_str()) {
                bail!("duplicate baseline for method {:?}", entry.method);
            }
            if entry.standard_ms == Some(0) || entry.advanced_ms == Some(0) {
                bail!(
                    "baseline for {:?} has a zero threshold; omit the field instead",
                    entry.method
                );
            }
            if let (Some(standard), Some(advanced)) = (entry.standard_ms, entry.advanced_ms) {
                if advanced > standard {
                    bail!(
                        "baseline for {:?} has advanced_ms {} above standard_ms {}",
                        entry.method,
                        advanced,
                        standard
                    );
                }
            }
        }

        Ok(())
    }

    pub fn get(&self, method: &str) -> Option<&PerformanceBaseline> {
        self.entries.iter().find(|entry| entry.method == method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerformanceBaseline> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_BASELINES: &str = r#"
[[baseline]]
method = "GetActualCost"
standard_ms = 100
advanced_ms = 50

[[baseline]]
method = "GetBudgets"
standard_ms = 250
"#;

    #[test]
    fn parses_valid_baselines() {
        let set = BaselineSet::from_toml_str(VALID_BASELINES).unwrap();
        let actual = set.get("GetActualCost").unwrap();
        assert_eq!(actual.standard_ms, Some(100));
        assert_eq!(actual.advanced_ms, Some(50));
        let budgets = set.get("GetBudgets").unwrap();
        assert_eq!(budgets.advanced_ms, None);
    }

    #[test]
    fn duplicate_method_is_rejected() {
        let raw = format!("{VALID_BASELINES}\n[[baseline]]\nmethod = \"GetActualCost\"\n");
        let err = BaselineSet::from_toml_str(&raw).unwrap_err().to_string();
        assert!(err.contains("duplicate baseline"));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let raw = "[[baseline]]\nmethod = \"EstimateCost\"\nstandard_ms = 0\n";
        let err = BaselineSet::from_toml_str(raw).unwrap_err().to_string();
        assert!(err.contains("zero threshold"));
    }

    #[test]
    fn advanced_above_standard_is_rejected() {
        let raw = "[[baseline]]\nmethod = \"EstimateCost\"\nstandard_ms = 50\nadvanced_ms = 100\n";
        let err = BaselineSet::from_toml_str(raw).unwrap_err().to_string();
        assert!(err.contains("advanced_ms"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = "[[baseline]]\nmethod = \"EstimateCost\"\np99_ms = 10\n";
        assert!(BaselineSet::from_toml_str(raw).is_err());
    }

    #[test]
    fn default_covers_core_operations() {
        let set = BaselineSet::default();
        for method in [
            operation::GET_ACTUAL_COST,
            operation::GET_PROJECTED_COST,
            operation::GET_PRICING_SPEC,
            operation::ESTIMATE_COST,
        ] {
            assert!(set.get(method).is_some(), "missing baseline for {method}");
        }
    }
}
