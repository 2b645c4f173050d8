//! The default conformance test battery.
//!
//! Functional and error-handling checks exercise the harness client, which
//! already validates requests and enforces the granular capability gate, so
//! every test observes the plugin exactly as a production host would.

use costkit_harness::{
    run_concurrent, ConcurrentCall, InProcessHarness, LatencyProbe, PerformanceValidator,
    DEFAULT_ITERATIONS,
};
use costkit_plugin::plugin::operation;
use costkit_types::error::error_code;
use costkit_types::request::{
    ActualCostRequest, EstimateCostRequest, PricingSpecRequest, ProjectedCostRequest,
    RecommendationsRequest,
};
use costkit_types::{
    legacy_name_of, CapabilitySet, ConformanceLevel, PerformanceResult, RecommendationFilter,
    ResourceDescriptor, TestCategory, MAX_TARGET_RESOURCES,
};

use crate::baseline::BaselineSet;
use crate::test::{ConformanceTest, TestOutcome};

/// Resource used by functional and performance checks.
///
/// The provider comes from the plugin's own metadata when it advertises one,
/// so plugins scoped to a single provider are probed on territory they
/// recognize.
fn probe_resource(harness: &InProcessHarness) -> ResourceDescriptor {
    let provider = harness
        .capability_info()
        .ok()
        .and_then(|info| info.providers().into_iter().next())
        .unwrap_or_else(|| "example".to_string());
    ResourceDescriptor::new(&provider, "compute")
}

fn actual_request(resource: ResourceDescriptor, start_unix: u64, end_unix: u64) -> ActualCostRequest {
    ActualCostRequest {
        resource,
        start_unix,
        end_unix,
    }
}

fn metadata_identity() -> ConformanceTest {
    ConformanceTest::new(
        "metadata_identity",
        "plugin metadata validates and matches the registered name",
        TestCategory::Functional,
        ConformanceLevel::Basic,
        |harness| {
            let info = match harness.capability_info() {
                Ok(info) => info,
                Err(err) => return TestOutcome::from_error(&err),
            };
            if info.name() != harness.plugin_name() {
                return TestOutcome::fail(format!(
                    "metadata name {:?} does not match registered name {:?}",
                    info.name(),
                    harness.plugin_name()
                ));
            }
            TestOutcome::pass(format!(
                "{} v{} targeting contract {}",
                info.name(),
                info.version(),
                info.spec_version()
            ))
        },
    )
}

fn currency_outcome(operation_name: &str, amount: f64, currency: &str) -> TestOutcome {
    if !amount.is_finite() {
        return TestOutcome::fail(format!("{operation_name} returned a non-finite amount"));
    }
    if currency.trim().is_empty() {
        return TestOutcome::fail(format!("{operation_name} returned an empty currency"));
    }
    TestOutcome::pass(format!("{amount} {currency}"))
}

fn actual_cost_contract() -> ConformanceTest {
    ConformanceTest::new(
        "actual_cost_contract",
        "GetActualCost answers a well-formed query over a closed window",
        TestCategory::Functional,
        ConformanceLevel::Basic,
        |harness| {
            let request = actual_request(probe_resource(harness), 0, 86_400);
            match harness.client().actual_cost(&request) {
                Ok(response) => currency_outcome(
                    operation::GET_ACTUAL_COST,
                    response.total,
                    &response.currency,
                ),
                Err(err) => TestOutcome::from_error(&err),
            }
        },
    )
}

fn projected_cost_contract() -> ConformanceTest {
    ConformanceTest::new(
        "projected_cost_contract",
        "GetProjectedCost answers a well-formed query",
        TestCategory::Functional,
        ConformanceLevel::Basic,
        |harness| {
            let request = ProjectedCostRequest {
                resource: probe_resource(harness),
            };
            match harness.client().projected_cost(&request) {
                Ok(response) => currency_outcome(
                    operation::GET_PROJECTED_COST,
                    response.monthly,
                    &response.currency,
                ),
                Err(err) => TestOutcome::from_error(&err),
            }
        },
    )
}

fn pricing_spec_contract() -> ConformanceTest {
    ConformanceTest::new(
        "pricing_spec_contract",
        "GetPricingSpec returns a non-null pricing document",
        TestCategory::Functional,
        ConformanceLevel::Basic,
        |harness| {
            let request = PricingSpecRequest {
                resource: probe_resource(harness),
            };
            match harness.client().pricing_spec(&request) {
                Ok(response) if response.spec.is_null() => {
                    TestOutcome::fail("GetPricingSpec returned a null document")
                }
                Ok(_) => TestOutcome::pass("pricing document returned"),
                Err(err) => TestOutcome::from_error(&err),
            }
        },
    )
}

fn estimate_cost_contract() -> ConformanceTest {
    ConformanceTest::new(
        "estimate_cost_contract",
        "EstimateCost answers a usage-based query",
        TestCategory::Functional,
        ConformanceLevel::Basic,
        |harness| {
            let request = EstimateCostRequest {
                resource: probe_resource(harness),
                usage: serde_json::json!({ "hours": 730 }),
            };
            match harness.client().estimate_cost(&request) {
                Ok(response) => currency_outcome(
                    operation::ESTIMATE_COST,
                    response.estimated,
                    &response.currency,
                ),
                Err(err) => TestOutcome::from_error(&err),
            }
        },
    )
}

fn malformed_resource_rejected() -> ConformanceTest {
    ConformanceTest::new(
        "malformed_resource_rejected",
        "a resource with an empty provider is rejected before dispatch",
        TestCategory::ErrorHandling,
        ConformanceLevel::Basic,
        |harness| {
            let request = actual_request(ResourceDescriptor::new("", "compute"), 0, 3_600);
            match harness.client().actual_cost(&request) {
                Err(err) if err.code() == error_code::INVALID_PARAMS => {
                    TestOutcome::pass("rejected with invalid-params")
                }
                Err(err) => TestOutcome::fail(format!(
                    "expected invalid-params ({}), got {err} (code {})",
                    error_code::INVALID_PARAMS,
                    err.code()
                )),
                Ok(_) => TestOutcome::fail("malformed resource was accepted"),
            }
        },
    )
}

fn oversized_target_list_rejected() -> ConformanceTest {
    ConformanceTest::new(
        "oversized_target_list_rejected",
        "a recommendation filter over the target-list limit is rejected",
        TestCategory::ErrorHandling,
        ConformanceLevel::Basic,
        |harness| {
            let resource = probe_resource(harness);
            let targets: Vec<ResourceDescriptor> = (0..=MAX_TARGET_RESOURCES)
                .map(|_| resource.clone())
                .collect();
            let request = RecommendationsRequest {
                filter: RecommendationFilter {
                    target_resources: targets,
                    ..RecommendationFilter::default()
                },
            };
            match harness.client().recommendations(&request) {
                Err(err) if err.code() == error_code::INVALID_PARAMS => {
                    TestOutcome::pass("rejected with invalid-params")
                }
                Err(err) => TestOutcome::fail(format!(
                    "expected invalid-params ({}), got {err} (code {})",
                    error_code::INVALID_PARAMS,
                    err.code()
                )),
                Ok(_) => TestOutcome::fail("oversized target list was accepted"),
            }
        },
    )
}

fn granular_inheritance() -> ConformanceTest {
    ConformanceTest::new(
        "granular_inheritance",
        "effective capabilities follow the inheritance rule of the support answer",
        TestCategory::Compatibility,
        ConformanceLevel::Basic,
        |harness| {
            let resource = probe_resource(harness);
            let answer = match harness.client().supports(&resource) {
                Ok(answer) => answer,
                Err(err) => return TestOutcome::from_error(&err),
            };
            let effective = match harness.effective_capabilities(&resource) {
                Ok(effective) => effective,
                Err(err) => return TestOutcome::from_error(&err),
            };

            let expected = if !answer.supported {
                CapabilitySet::new()
            } else if answer.capabilities.is_empty() {
                harness.global_capabilities()
            } else {
                answer.capabilities.clone()
            };

            if effective != expected {
                return TestOutcome::fail(format!(
                    "effective set {effective} does not follow the support answer (expected {expected})"
                ));
            }
            TestOutcome::pass(format!("effective set {effective}"))
        },
    )
}

fn legacy_projection_round_trip() -> ConformanceTest {
    ConformanceTest::new(
        "legacy_projection_round_trip",
        "every mapped capability survives projection to and from the legacy map",
        TestCategory::Compatibility,
        ConformanceLevel::Basic,
        |harness| {
            let global = harness.global_capabilities();
            let restored = CapabilitySet::from_legacy_map(&global.to_legacy_map());
            for capability in global.iter() {
                if legacy_name_of(capability).is_some() && !restored.contains(capability) {
                    return TestOutcome::fail(format!(
                        "capability {capability} was lost in the legacy projection"
                    ));
                }
            }
            TestOutcome::pass(format!("projected {} capabilities", global.len()))
        },
    )
}

fn unsupported_resource_error_is_explicit() -> ConformanceTest {
    ConformanceTest::new(
        "unsupported_resource_error_is_explicit",
        "operations on an unsupported resource fail with the distinct error code",
        TestCategory::ErrorHandling,
        ConformanceLevel::Standard,
        |harness| {
            let foreign = ResourceDescriptor::new("no-such-provider", "no-such-type");
            let answer = match harness.client().supports(&foreign) {
                Ok(answer) => answer,
                Err(err) => return TestOutcome::from_error(&err),
            };
            if answer.supported {
                // A plugin may legitimately claim universal coverage; the
                // gate then has nothing to refuse.
                return TestOutcome::pass("plugin claims support for arbitrary resources");
            }
            let request = actual_request(foreign, 0, 3_600);
            match harness.client().actual_cost(&request) {
                Err(err) if err.code() == error_code::UNSUPPORTED_RESOURCE => {
                    TestOutcome::pass("refused with unsupported-resource")
                }
                Err(err) => TestOutcome::fail(format!(
                    "expected unsupported-resource ({}), got {err} (code {})",
                    error_code::UNSUPPORTED_RESOURCE,
                    err.code()
                )),
                Ok(_) => TestOutcome::fail("call on an unsupported resource succeeded"),
            }
        },
    )
}

/// Measure one core operation through the harness client.
///
/// Returns `None` for methods the battery has no measurement recipe for.
fn measure_operation(harness: &InProcessHarness, method: &str) -> Option<PerformanceResult> {
    let client = harness.client();
    let resource = probe_resource(harness);

    let result = match method {
        operation::GET_ACTUAL_COST => {
            let request = actual_request(resource, 0, 86_400);
            LatencyProbe::measure(method, DEFAULT_ITERATIONS, || {
                client.actual_cost(&request).map(|_| ())
            })
        }
        operation::GET_PROJECTED_COST => {
            let request = ProjectedCostRequest { resource };
            LatencyProbe::measure(method, DEFAULT_ITERATIONS, || {
                client.projected_cost(&request).map(|_| ())
            })
        }
        operation::GET_PRICING_SPEC => {
            let request = PricingSpecRequest { resource };
            LatencyProbe::measure(method, DEFAULT_ITERATIONS, || {
                client.pricing_spec(&request).map(|_| ())
            })
        }
        operation::ESTIMATE_COST => {
            let request = EstimateCostRequest {
                resource,
                usage: serde_json::json!({ "hours": 730 }),
            };
            LatencyProbe::measure(method, DEFAULT_ITERATIONS, || {
                client.estimate_cost(&request).map(|_| ())
            })
        }
        _ => return None,
    };

    Some(result)
}

fn snake_case(method: &str) -> String {
    let mut out = String::with_capacity(method.len() + 4);
    for (i, ch) in method.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

fn latency_outcome(result: &PerformanceResult, passed: bool) -> TestOutcome {
    if passed {
        TestOutcome::pass(if result.implemented {
            format!(
                "avg {:.1}ms over {} iterations (variance {:+.1}%)",
                result.avg_latency.as_secs_f64() * 1000.0,
                result.iterations,
                result.variance_percent
            )
        } else {
            "operation not implemented; no latency requirement".to_string()
        })
    } else {
        TestOutcome::fail(
            result
                .error
                .clone()
                .unwrap_or_else(|| "latency threshold exceeded".to_string()),
        )
    }
}

fn performance_tests(baselines: &BaselineSet) -> Vec<ConformanceTest> {
    let mut tests = Vec::new();

    for baseline in baselines.iter() {
        let method = baseline.method.clone();
        let stem = snake_case(&method);

        let standard_baseline = baseline.clone();
        let standard_method = method.clone();
        tests.push(ConformanceTest::new(
            &format!("{stem}_latency_standard"),
            "average latency stays within the standard baseline",
            TestCategory::Performance,
            ConformanceLevel::Standard,
            move |harness| match measure_operation(harness, &standard_method) {
                Some(result) => {
                    let result = PerformanceValidator::validate(result, &standard_baseline);
                    latency_outcome(&result, result.passed_standard)
                }
                None => TestOutcome::fail(format!(
                    "no measurement recipe for method {standard_method:?}"
                )),
            },
        ));

        if baseline.advanced_ms.is_some() {
            let advanced_baseline = baseline.clone();
            let advanced_method = method.clone();
            tests.push(ConformanceTest::new(
                &format!("{stem}_latency_advanced"),
                "average latency stays within the advanced baseline",
                TestCategory::Performance,
                ConformanceLevel::Advanced,
                move |harness| match measure_operation(harness, &advanced_method) {
                    Some(result) => {
                        let result = PerformanceValidator::validate(result, &advanced_baseline);
                        latency_outcome(&result, result.passed_advanced)
                    }
                    None => TestOutcome::fail(format!(
                        "no measurement recipe for method {advanced_method:?}"
                    )),
                },
            ));
        }
    }

    tests
}

fn concurrent_mixed_windows() -> ConformanceTest {
    ConformanceTest::new(
        "concurrent_mixed_windows",
        "simultaneous queries over distinct windows do not corrupt each other",
        TestCategory::Concurrency,
        ConformanceLevel::Advanced,
        |harness| {
            let resource = probe_resource(harness);
            let windows: [(u64, u64); 3] = [(0, 3_600), (0, 86_400), (86_400, 172_800)];

            // Sequential answers first; those are the ground truth the
            // concurrent fan-out must reproduce.
            let mut calls = Vec::new();
            for (round, (start, end)) in windows.iter().copied().cycle().take(6).enumerate() {
                let request = actual_request(resource.clone(), start, end);
                let expected = match harness.client().actual_cost(&request) {
                    Ok(response) => response,
                    Err(err) => return TestOutcome::from_error(&err),
                };
                let client = harness.client();
                calls.push(ConcurrentCall::new(
                    &format!("window-{start}-{end}#{round}"),
                    Some(expected),
                    move || client.actual_cost(&request),
                ));
            }

            let report = run_concurrent(calls, harness.deadline());
            if report.all_succeeded {
                TestOutcome::pass(format!(
                    "{} concurrent calls, max latency {}ms",
                    report.outcomes.len(),
                    report.max_latency.as_millis()
                ))
            } else if report.mismatch_count > 0 {
                TestOutcome::fail(format!(
                    "{} of {} concurrent calls returned another call's answer",
                    report.mismatch_count,
                    report.outcomes.len()
                ))
            } else {
                let first_error = report
                    .outcomes
                    .iter()
                    .find_map(|o| o.error.clone())
                    .unwrap_or_else(|| "concurrent call failed".to_string());
                TestOutcome::fail(format!(
                    "{} of {} concurrent calls failed: {first_error}",
                    report.error_count,
                    report.outcomes.len()
                ))
            }
        },
    )
}

/// The default battery, in execution order.
pub fn default_battery(baselines: &BaselineSet) -> Vec<ConformanceTest> {
    let mut tests = vec![
        metadata_identity(),
        actual_cost_contract(),
        projected_cost_contract(),
        pricing_spec_contract(),
        estimate_cost_contract(),
        malformed_resource_rejected(),
        oversized_target_list_rejected(),
        granular_inheritance(),
        legacy_projection_round_trip(),
        unsupported_resource_error_is_explicit(),
    ];
    tests.extend(performance_tests(baselines));
    tests.push(concurrent_mixed_windows());
    tests
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    use costkit_plugin::plugin::CostSourcePlugin;
    use costkit_types::request::{
        ActualCostResponse, EstimateCostResponse, PricingSpecResponse, ProjectedCostResponse,
    };
    use costkit_types::{PluginError, PluginMetadata};

    struct WindowedSource;

    impl CostSourcePlugin for WindowedSource {
        fn name(&self) -> &str {
            "windowed"
        }

        fn metadata(&self) -> Result<PluginMetadata, PluginError> {
            Ok(PluginMetadata {
                name: "windowed".into(),
                version: "1.0.0".into(),
                spec_version: "1.0.0".into(),
                providers: vec!["aws".into()],
                ..PluginMetadata::default()
            })
        }

        fn actual_cost(
            &self,
            request: &ActualCostRequest,
        ) -> Result<ActualCostResponse, PluginError> {
            // Per-window answer so corruption is observable.
            Ok(ActualCostResponse {
                total: (request.end_unix - request.start_unix) as f64 / 3_600.0,
                currency: "USD".into(),
            })
        }

        fn projected_cost(
            &self,
            _request: &ProjectedCostRequest,
        ) -> Result<ProjectedCostResponse, PluginError> {
            Ok(ProjectedCostResponse {
                monthly: 730.0,
                currency: "USD".into(),
            })
        }

        fn pricing_spec(
            &self,
            _request: &PricingSpecRequest,
        ) -> Result<PricingSpecResponse, PluginError> {
            Ok(PricingSpecResponse {
                spec: serde_json::json!({ "billing_mode": "per_hour", "rate": 1.0 }),
            })
        }

        fn estimate_cost(
            &self,
            request: &EstimateCostRequest,
        ) -> Result<EstimateCostResponse, PluginError> {
            let hours = request.usage.get("hours").and_then(|v| v.as_f64()).unwrap_or(0.0);
            Ok(EstimateCostResponse {
                estimated: hours,
                currency: "USD".into(),
            })
        }
    }

    fn harness() -> InProcessHarness {
        InProcessHarness::new(Arc::new(WindowedSource)).unwrap()
    }

    #[test]
    fn battery_names_are_unique() {
        let battery = default_battery(&BaselineSet::default());
        let mut seen = HashSet::new();
        for test in &battery {
            assert!(seen.insert(test.name().to_string()), "duplicate {}", test.name());
        }
    }

    #[test]
    fn battery_covers_every_category() {
        let battery = default_battery(&BaselineSet::default());
        let categories: HashSet<TestCategory> =
            battery.iter().map(|test| test.category()).collect();
        for category in [
            TestCategory::Functional,
            TestCategory::ErrorHandling,
            TestCategory::Concurrency,
            TestCategory::Performance,
            TestCategory::Compatibility,
        ] {
            assert!(categories.contains(&category), "missing {category:?}");
        }
    }

    #[test]
    fn advanced_latency_test_requires_advanced_threshold() {
        let baselines = BaselineSet::from_toml_str(
            "[[baseline]]\nmethod = \"GetActualCost\"\nstandard_ms = 100\n",
        )
        .unwrap();
        let battery = performance_tests(&baselines);
        assert_eq!(battery.len(), 1);
        assert_eq!(battery[0].name(), "get_actual_cost_latency_standard");
    }

    #[test]
    fn functional_checks_pass_against_a_correct_plugin() {
        let harness = harness();
        for test in [
            metadata_identity(),
            actual_cost_contract(),
            projected_cost_contract(),
            pricing_spec_contract(),
            estimate_cost_contract(),
        ] {
            let outcome = test.execute(&harness);
            assert!(outcome.success, "{} failed: {:?}", test.name(), outcome.error);
        }
    }

    #[test]
    fn error_handling_checks_pass_against_a_correct_plugin() {
        let harness = harness();
        for test in [malformed_resource_rejected(), oversized_target_list_rejected()] {
            let outcome = test.execute(&harness);
            assert!(outcome.success, "{} failed: {:?}", test.name(), outcome.error);
        }
    }

    #[test]
    fn compatibility_checks_pass_against_a_correct_plugin() {
        let harness = harness();
        for test in [granular_inheritance(), legacy_projection_round_trip()] {
            let outcome = test.execute(&harness);
            assert!(outcome.success, "{} failed: {:?}", test.name(), outcome.error);
        }
    }

    #[test]
    fn concurrency_check_detects_consistent_plugin() {
        let outcome = concurrent_mixed_windows().execute(&harness());
        assert!(outcome.success, "failed: {:?}", outcome.error);
    }

    #[test]
    fn snake_case_splits_method_names() {
        assert_eq!(snake_case("GetActualCost"), "get_actual_cost");
        assert_eq!(snake_case("EstimateCost"), "estimate_cost");
    }
}
