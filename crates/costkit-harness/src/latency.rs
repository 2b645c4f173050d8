use std::time::{Duration, Instant};

use costkit_types::{PerformanceBaseline, PerformanceResult, PluginError};

/// Default number of sequential iterations per measurement.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Times repeated sequential invocations of one operation.
///
/// Iterations are deliberately sequential so measurements are not skewed by
/// scheduler contention; concurrency is certified separately.
pub struct LatencyProbe;

impl LatencyProbe {
    /// Measure `iterations` sequential calls of `op`, tracking min/avg/max.
    ///
    /// A `NotImplemented` answer on the first call short-circuits to an
    /// automatic pass: performance requirements apply only to implemented
    /// operations. Any other error aborts the measurement and is recorded
    /// on the result as a failure at both levels.
    pub fn measure<F>(method: &str, iterations: usize, mut op: F) -> PerformanceResult
    where
        F: FnMut() -> Result<(), PluginError>,
    {
        let iterations = iterations.max(1);
        let mut latencies = Vec::with_capacity(iterations);

        for iteration in 0..iterations {
            let start = Instant::now();
            let outcome = op();
            let elapsed = start.elapsed();

            match outcome {
                Ok(()) => latencies.push(elapsed),
                Err(err) if err.is_not_implemented() && iteration == 0 => {
                    return PerformanceResult::unimplemented(method);
                }
                Err(err) => {
                    return PerformanceResult {
                        method: method.to_string(),
                        iterations: iteration,
                        implemented: true,
                        min_latency: latencies.iter().min().copied().unwrap_or(Duration::ZERO),
                        avg_latency: average(&latencies),
                        max_latency: latencies.iter().max().copied().unwrap_or(Duration::ZERO),
                        variance_percent: 0.0,
                        passed_standard: false,
                        passed_advanced: false,
                        error: Some(format!("{method} failed during measurement: {err}")),
                    };
                }
            }
        }

        PerformanceResult {
            method: method.to_string(),
            iterations,
            implemented: true,
            min_latency: latencies.iter().min().copied().unwrap_or(Duration::ZERO),
            avg_latency: average(&latencies),
            max_latency: latencies.iter().max().copied().unwrap_or(Duration::ZERO),
            variance_percent: 0.0,
            passed_standard: true,
            passed_advanced: true,
            error: None,
        }
    }
}

fn average(latencies: &[Duration]) -> Duration {
    if latencies.is_empty() {
        return Duration::ZERO;
    }
    latencies.iter().sum::<Duration>() / latencies.len() as u32
}

/// Applies per-operation latency baselines to probe output.
pub struct PerformanceValidator;

impl PerformanceValidator {
    /// Compare a measurement against a baseline.
    ///
    /// Pass/fail uses the average latency only; min and max stay
    /// diagnostic. A missing threshold means the level imposes no
    /// requirement. Variance is relative to the standard threshold.
    pub fn validate(
        mut result: PerformanceResult,
        baseline: &PerformanceBaseline,
    ) -> PerformanceResult {
        if !result.implemented || result.error.is_some() {
            return result;
        }

        let avg_ms = result.avg_latency.as_secs_f64() * 1000.0;

        if let Some(standard_ms) = baseline.standard_ms {
            let threshold = standard_ms as f64;
            result.variance_percent = (avg_ms - threshold) / threshold * 100.0;
            result.passed_standard = avg_ms <= threshold;
            if !result.passed_standard {
                result.error = Some(format!(
                    "{} average latency {avg_ms:.1}ms exceeds standard threshold {standard_ms}ms",
                    result.method
                ));
            }
        } else {
            result.passed_standard = true;
        }

        if let Some(advanced_ms) = baseline.advanced_ms {
            result.passed_advanced = avg_ms <= advanced_ms as f64;
            if !result.passed_advanced && result.error.is_none() {
                result.error = Some(format!(
                    "{} average latency {avg_ms:.1}ms exceeds advanced threshold {advanced_ms}ms",
                    result.method
                ));
            }
        } else {
            result.passed_advanced = true;
        }

        result
    }
}
