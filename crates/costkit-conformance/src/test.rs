use costkit_harness::InProcessHarness;
use costkit_types::{ConformanceLevel, PluginError, TestCategory};

/// What a test body reports back to the suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub success: bool,
    pub error: Option<String>,
    pub details: String,
}

impl TestOutcome {
    pub fn pass(details: impl Into<String>) -> Self {
        Self {
            success: true,
            error: None,
            details: details.into(),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            details: String::new(),
        }
    }

    /// Failure derived from a plugin error, keeping its typed code visible.
    pub fn from_error(err: &PluginError) -> Self {
        Self::fail(format!("{err} (code {})", err.code()))
    }
}

/// A named, categorized, level-gated unit of verification.
///
/// Immutable after construction: the suite only reads. The body receives
/// the shared harness and must not assume exclusive access to the plugin.
pub struct ConformanceTest {
    name: String,
    description: String,
    category: TestCategory,
    min_level: ConformanceLevel,
    run: Box<dyn Fn(&InProcessHarness) -> TestOutcome + Send + Sync>,
}

impl ConformanceTest {
    pub fn new(
        name: &str,
        description: &str,
        category: TestCategory,
        min_level: ConformanceLevel,
        run: impl Fn(&InProcessHarness) -> TestOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category,
            min_level,
            run: Box::new(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> TestCategory {
        self.category
    }

    pub fn min_level(&self) -> ConformanceLevel {
        self.min_level
    }

    pub fn execute(&self, harness: &InProcessHarness) -> TestOutcome {
        (self.run)(harness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_from_error_includes_code() {
        let outcome = TestOutcome::from_error(&PluginError::not_implemented("GetBudgets"));
        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("GetBudgets"));
        assert!(error.contains("-32601"));
    }

    #[test]
    fn test_exposes_its_registration_fields() {
        let test = ConformanceTest::new(
            "example",
            "an example check",
            TestCategory::Functional,
            ConformanceLevel::Standard,
            |_| TestOutcome::pass(""),
        );
        assert_eq!(test.name(), "example");
        assert_eq!(test.category(), TestCategory::Functional);
        assert_eq!(test.min_level(), ConformanceLevel::Standard);
    }
}
