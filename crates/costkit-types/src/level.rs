use std::fmt;

use serde::{Deserialize, Serialize};

/// Certification tiers, ordered from least to most strict.
///
/// Achieving a level requires passing every registered test whose
/// `min_level` is at or below it. The derive of `Ord` relies on the
/// declaration order `Basic < Standard < Advanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConformanceLevel {
    Basic,
    Standard,
    Advanced,
}

impl ConformanceLevel {
    /// All levels in ascending order.
    pub const ALL: [ConformanceLevel; 3] = [
        ConformanceLevel::Basic,
        ConformanceLevel::Standard,
        ConformanceLevel::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConformanceLevel::Basic => "basic",
            ConformanceLevel::Standard => "standard",
            ConformanceLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ConformanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping of conformance tests for reporting.
///
/// Categories never influence pass/fail; they only shape the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    Functional,
    ErrorHandling,
    Concurrency,
    Performance,
    Compatibility,
}

impl TestCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TestCategory::Functional => "functional",
            TestCategory::ErrorHandling => "error_handling",
            TestCategory::Concurrency => "concurrency",
            TestCategory::Performance => "performance",
            TestCategory::Compatibility => "compatibility",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(ConformanceLevel::Basic < ConformanceLevel::Standard);
        assert!(ConformanceLevel::Standard < ConformanceLevel::Advanced);
    }

    #[test]
    fn all_lists_levels_ascending() {
        let mut sorted = ConformanceLevel::ALL;
        sorted.sort();
        assert_eq!(sorted, ConformanceLevel::ALL);
    }
}
