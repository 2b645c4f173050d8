use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Per-operation latency thresholds, in milliseconds of average latency.
///
/// An absent threshold means the level imposes no requirement on the
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerformanceBaseline {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advanced_ms: Option<u64>,
}

impl PerformanceBaseline {
    pub fn new(method: &str, standard_ms: Option<u64>, advanced_ms: Option<u64>) -> Self {
        Self {
            method: method.to_string(),
            standard_ms,
            advanced_ms,
        }
    }
}

/// Outcome of a latency probe, before or after baseline validation.
///
/// Pass/fail decisions use `avg_latency` only; `min_latency` and
/// `max_latency` are diagnostic. An operation the plugin does not implement
/// is an automatic pass at every level (`implemented` is false and no
/// iterations ran).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceResult {
    pub method: String,
    pub iterations: usize,
    pub implemented: bool,
    pub min_latency: Duration,
    pub avg_latency: Duration,
    pub max_latency: Duration,
    pub variance_percent: f64,
    pub passed_standard: bool,
    pub passed_advanced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PerformanceResult {
    /// Automatic pass for an operation the plugin does not implement.
    pub fn unimplemented(method: &str) -> Self {
        Self {
            method: method.to_string(),
            iterations: 0,
            implemented: false,
            min_latency: Duration::ZERO,
            avg_latency: Duration::ZERO,
            max_latency: Duration::ZERO,
            variance_percent: 0.0,
            passed_standard: true,
            passed_advanced: true,
            error: None,
        }
    }
}
