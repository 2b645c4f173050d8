use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use tracing::info;

use costkit_harness::InProcessHarness;
use costkit_plugin::plugin::CostSourcePlugin;
use costkit_types::{ConformanceLevel, ConformanceResult, PluginError, TestCategory, TestResult};

use crate::baseline::BaselineSet;
use crate::battery;
use crate::test::{ConformanceTest, TestOutcome};

/// An ordered registry of conformance tests.
///
/// Tests execute in registration order; duplicate names are rejected at
/// registration so report lines stay unambiguous.
pub struct ConformanceSuite {
    tests: Vec<ConformanceTest>,
    index: HashMap<String, usize>,
}

impl Default for ConformanceSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl ConformanceSuite {
    pub fn new() -> Self {
        Self {
            tests: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Suite pre-loaded with the default battery for the given baselines.
    pub fn with_default_battery(baselines: &BaselineSet) -> Self {
        let mut suite = Self::new();
        for test in battery::default_battery(baselines) {
            suite.register(test).expect("battery names are unique");
        }
        suite
    }

    pub fn register(&mut self, test: ConformanceTest) -> Result<()> {
        let name = test.name().to_string();
        if self.index.contains_key(&name) {
            bail!("duplicate conformance test name: {}", name);
        }
        let idx = self.tests.len();
        self.index.insert(name, idx);
        self.tests.push(test);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Run every test applicable at `requested` against the harness.
    ///
    /// Tests gated above the requested level are recorded as skipped. A
    /// panic inside a test body is trapped and converted into a failed
    /// result; nothing escapes the suite boundary. The achieved level is
    /// the highest level at or below the request for which every
    /// applicable test passed, which may be lower than requested.
    pub fn run(
        &self,
        harness: &InProcessHarness,
        requested: ConformanceLevel,
    ) -> ConformanceResult {
        let started = Instant::now();
        let mut results: Vec<TestResult> = Vec::new();
        let mut result_levels: Vec<(ConformanceLevel, bool)> = Vec::new();
        let mut skipped: Vec<(TestCategory, String)> = Vec::new();

        for test in &self.tests {
            if test.min_level() > requested {
                skipped.push((test.category(), test.name().to_string()));
                continue;
            }

            let test_started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| test.execute(harness)))
                .unwrap_or_else(|_| TestOutcome::fail("test panicked; treated as failure"));
            let duration = test_started.elapsed();

            info!(
                test = test.name(),
                category = %test.category(),
                success = outcome.success,
                "conformance test finished"
            );

            result_levels.push((test.min_level(), outcome.success));
            results.push(TestResult {
                method: test.name().to_string(),
                category: test.category(),
                success: outcome.success,
                error: outcome.error,
                duration,
                details: outcome.details,
            });
        }

        let level_achieved = achieved_level(requested, &result_levels);

        let completed_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        ConformanceResult::from_results(
            harness.plugin_name().to_string(),
            level_achieved,
            results,
            skipped,
            started.elapsed(),
            completed_at_unix,
        )
    }
}

/// Highest level at or below `requested` for which every executed test
/// gated at or below that level passed.
fn achieved_level(
    requested: ConformanceLevel,
    results: &[(ConformanceLevel, bool)],
) -> Option<ConformanceLevel> {
    let mut achieved = None;
    for level in ConformanceLevel::ALL {
        if level > requested {
            break;
        }
        let all_passed = results
            .iter()
            .filter(|(min_level, _)| *min_level <= level)
            .all(|(_, success)| *success);
        if all_passed {
            achieved = Some(level);
        } else {
            // Levels are cumulative; a failure here blocks everything above.
            break;
        }
    }
    achieved
}

fn run_conformance(
    plugin: Arc<dyn CostSourcePlugin>,
    level: ConformanceLevel,
) -> Result<ConformanceResult, PluginError> {
    let harness = InProcessHarness::new(plugin)?;
    let baselines = BaselineSet::default();
    let suite = ConformanceSuite::with_default_battery(&baselines);
    info!(
        plugin = harness.plugin_name(),
        level = %level,
        tests = suite.len(),
        "starting conformance run"
    );
    Ok(suite.run(&harness, level))
}

/// Certify a plugin at the Basic level with the default battery.
///
/// Fails before any harness is constructed when the plugin is unusable
/// (for example, it reports an empty name).
pub fn run_basic_conformance(
    plugin: Arc<dyn CostSourcePlugin>,
) -> Result<ConformanceResult, PluginError> {
    run_conformance(plugin, ConformanceLevel::Basic)
}

/// Certify a plugin at the Standard level with the default battery.
pub fn run_standard_conformance(
    plugin: Arc<dyn CostSourcePlugin>,
) -> Result<ConformanceResult, PluginError> {
    run_conformance(plugin, ConformanceLevel::Standard)
}

/// Certify a plugin at the Advanced level with the default battery.
pub fn run_advanced_conformance(
    plugin: Arc<dyn CostSourcePlugin>,
) -> Result<ConformanceResult, PluginError> {
    run_conformance(plugin, ConformanceLevel::Advanced)
}
