use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::level::{ConformanceLevel, TestCategory};

/// Outcome of one conformance test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// Name of the test that produced this result.
    pub method: String,
    pub category: TestCategory,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration: Duration,
    pub details: String,
}

/// Aggregated tallies for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Aggregated tallies across the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConformanceSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Immutable structured output of one conformance run.
///
/// Produced exactly once per suite run and never mutated; all access goes
/// through read-only accessors. The invariant `summary.total == passed +
/// failed + skipped` holds by construction.
#[derive(Debug, Clone, Serialize)]
pub struct ConformanceResult {
    plugin_name: String,
    level_achieved: Option<ConformanceLevel>,
    summary: ConformanceSummary,
    categories: BTreeMap<TestCategory, CategoryResult>,
    results: Vec<TestResult>,
    duration: Duration,
    completed_at_unix: u64,
}

impl ConformanceResult {
    /// Assemble a result from per-test outcomes, computing all tallies.
    pub fn from_results(
        plugin_name: String,
        level_achieved: Option<ConformanceLevel>,
        results: Vec<TestResult>,
        skipped: Vec<(TestCategory, String)>,
        duration: Duration,
        completed_at_unix: u64,
    ) -> Self {
        let mut summary = ConformanceSummary::default();
        let mut categories: BTreeMap<TestCategory, CategoryResult> = BTreeMap::new();

        for result in &results {
            let entry = categories.entry(result.category).or_default();
            entry.total += 1;
            summary.total += 1;
            if result.success {
                entry.passed += 1;
                summary.passed += 1;
            } else {
                entry.failed += 1;
                summary.failed += 1;
            }
        }

        for (category, _name) in &skipped {
            let entry = categories.entry(*category).or_default();
            entry.total += 1;
            entry.skipped += 1;
            summary.total += 1;
            summary.skipped += 1;
        }

        Self {
            plugin_name,
            level_achieved,
            summary,
            categories,
            results,
            duration,
            completed_at_unix,
        }
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn level_achieved(&self) -> Option<ConformanceLevel> {
        self.level_achieved
    }

    pub fn summary(&self) -> ConformanceSummary {
        self.summary
    }

    pub fn category(&self, category: TestCategory) -> Option<CategoryResult> {
        self.categories.get(&category).copied()
    }

    pub fn categories(&self) -> &BTreeMap<TestCategory, CategoryResult> {
        &self.categories
    }

    /// Per-test results in the order they were produced.
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn completed_at_unix(&self) -> u64 {
        self.completed_at_unix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passed(name: &str, category: TestCategory) -> TestResult {
        TestResult {
            method: name.to_string(),
            category,
            success: true,
            error: None,
            duration: Duration::from_millis(1),
            details: String::new(),
        }
    }

    fn failed(name: &str, category: TestCategory) -> TestResult {
        TestResult {
            method: name.to_string(),
            category,
            success: false,
            error: Some("assertion failed".to_string()),
            duration: Duration::from_millis(1),
            details: String::new(),
        }
    }

    #[test]
    fn summary_total_equals_passed_failed_skipped() {
        let result = ConformanceResult::from_results(
            "test-plugin".into(),
            Some(ConformanceLevel::Basic),
            vec![
                passed("a", TestCategory::Functional),
                failed("b", TestCategory::ErrorHandling),
            ],
            vec![(TestCategory::Concurrency, "c".into())],
            Duration::from_millis(5),
            0,
        );

        let summary = result.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.total,
            summary.passed + summary.failed + summary.skipped
        );
    }

    #[test]
    fn category_tallies_are_grouped() {
        let result = ConformanceResult::from_results(
            "test-plugin".into(),
            None,
            vec![
                passed("a", TestCategory::Functional),
                passed("b", TestCategory::Functional),
                failed("c", TestCategory::Functional),
            ],
            vec![],
            Duration::ZERO,
            0,
        );

        let functional = result.category(TestCategory::Functional).unwrap();
        assert_eq!(functional.total, 3);
        assert_eq!(functional.passed, 2);
        assert_eq!(functional.failed, 1);
        assert!(result.category(TestCategory::Performance).is_none());
    }

    #[test]
    fn results_preserve_production_order() {
        let result = ConformanceResult::from_results(
            "test-plugin".into(),
            None,
            vec![
                passed("first", TestCategory::Functional),
                passed("second", TestCategory::Compatibility),
            ],
            vec![],
            Duration::ZERO,
            0,
        );
        let names: Vec<&str> = result.results().iter().map(|r| r.method.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
