use std::time::{Duration, Instant};

use costkit_types::PluginError;

/// One labelled call in a concurrency fan-out.
///
/// The optional expected value lets the probe detect cross-call corruption:
/// calls on independent inputs must each come back with their own answer.
pub struct ConcurrentCall<T> {
    pub label: String,
    pub expected: Option<T>,
    pub op: Box<dyn Fn() -> Result<T, PluginError> + Send + Sync>,
}

impl<T> ConcurrentCall<T> {
    pub fn new(
        label: &str,
        expected: Option<T>,
        op: impl Fn() -> Result<T, PluginError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.to_string(),
            expected,
            op: Box::new(op),
        }
    }
}

/// Outcome of one call in the fan-out, attributable via its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    pub label: String,
    pub latency: Duration,
    pub error: Option<String>,
    /// False when the call succeeded but returned a value that does not
    /// match its paired expectation.
    pub matched: bool,
}

/// Fan-in summary of a concurrency probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyReport {
    pub all_succeeded: bool,
    pub error_count: usize,
    pub mismatch_count: usize,
    pub max_latency: Duration,
    pub avg_latency: Duration,
    pub outcomes: Vec<CallOutcome>,
}

/// Issue every call simultaneously against the shared plugin instance.
///
/// Used to certify thread-safety, not throughput: the interesting property
/// is that simultaneous calls on independent inputs do not corrupt each
/// other's results. Completion order is unspecified, but each outcome is
/// attributable to its originating call. Ops are plain closures, so the
/// deadline is asserted on observed latency; callers measuring harness
/// operations get preemptive timeouts from the harness dispatch itself.
pub fn run_concurrent<T>(calls: Vec<ConcurrentCall<T>>, deadline: Duration) -> ConcurrencyReport
where
    T: PartialEq + Send + Sync,
{
    let mut outcomes: Vec<Option<CallOutcome>> = Vec::new();
    outcomes.resize_with(calls.len(), || None);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(calls.len());
        for call in &calls {
            handles.push(scope.spawn(move || {
                let start = Instant::now();
                let result = (call.op)();
                let latency = start.elapsed();

                let (error, matched) = match result {
                    Ok(value) => {
                        let matched = call
                            .expected
                            .as_ref()
                            .map_or(true, |expected| *expected == value);
                        let error = if latency > deadline {
                            Some(format!(
                                "call exceeded deadline: {}ms > {}ms",
                                latency.as_millis(),
                                deadline.as_millis()
                            ))
                        } else {
                            None
                        };
                        (error, matched)
                    }
                    Err(err) => (Some(err.to_string()), true),
                };

                CallOutcome {
                    label: call.label.clone(),
                    latency,
                    error,
                    matched,
                }
            }));
        }

        for (slot, handle) in outcomes.iter_mut().zip(handles) {
            *slot = Some(handle.join().unwrap_or_else(|_| CallOutcome {
                label: String::new(),
                latency: Duration::ZERO,
                error: Some("call panicked".to_string()),
                matched: true,
            }));
        }
    });

    let outcomes: Vec<CallOutcome> = outcomes.into_iter().flatten().collect();
    let error_count = outcomes.iter().filter(|o| o.error.is_some()).count();
    let mismatch_count = outcomes.iter().filter(|o| !o.matched).count();
    let max_latency = outcomes
        .iter()
        .map(|o| o.latency)
        .max()
        .unwrap_or(Duration::ZERO);
    let avg_latency = if outcomes.is_empty() {
        Duration::ZERO
    } else {
        outcomes.iter().map(|o| o.latency).sum::<Duration>() / outcomes.len() as u32
    };

    ConcurrencyReport {
        all_succeeded: error_count == 0 && mismatch_count == 0,
        error_count,
        mismatch_count,
        max_latency,
        avg_latency,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn all_calls_run_and_are_attributable() {
        let counter = Arc::new(AtomicUsize::new(0));
        let calls: Vec<ConcurrentCall<usize>> = (0..8)
            .map(|i| {
                let counter = counter.clone();
                ConcurrentCall::new(&format!("call-{i}"), Some(i), move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        let report = run_concurrent(calls, Duration::from_secs(1));
        assert!(report.all_succeeded);
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        assert_eq!(report.outcomes.len(), 8);
        for (i, outcome) in report.outcomes.iter().enumerate() {
            assert_eq!(outcome.label, format!("call-{i}"));
        }
    }

    #[test]
    fn mismatched_answers_are_flagged_as_corruption() {
        let calls = vec![
            ConcurrentCall::new("ec2", Some(10u64), || Ok(10)),
            ConcurrentCall::new("rds", Some(20u64), || Ok(99)),
        ];
        let report = run_concurrent(calls, Duration::from_secs(1));
        assert!(!report.all_succeeded);
        assert_eq!(report.mismatch_count, 1);
        let bad = report.outcomes.iter().find(|o| !o.matched).unwrap();
        assert_eq!(bad.label, "rds");
    }

    #[test]
    fn errors_are_counted_per_call() {
        let calls = vec![
            ConcurrentCall::new("ok", None::<u64>, || Ok(1)),
            ConcurrentCall::new("bad", None, || {
                Err(PluginError::PluginFailure("backend down".into()))
            }),
        ];
        let report = run_concurrent(calls, Duration::from_secs(1));
        assert!(!report.all_succeeded);
        assert_eq!(report.error_count, 1);
    }

    #[test]
    fn slow_call_is_recorded_as_deadline_failure() {
        let calls = vec![ConcurrentCall::new("slow", None::<u64>, || {
            std::thread::sleep(Duration::from_millis(50));
            Ok(1)
        })];
        let report = run_concurrent(calls, Duration::from_millis(5));
        assert_eq!(report.error_count, 1);
        assert!(report.outcomes[0]
            .error
            .as_deref()
            .unwrap()
            .contains("deadline"));
    }

    #[test]
    fn latency_aggregates_are_consistent() {
        let calls: Vec<ConcurrentCall<u64>> = (0..4)
            .map(|i| ConcurrentCall::new(&format!("c{i}"), None, move || Ok(i)))
            .collect();
        let report = run_concurrent(calls, Duration::from_secs(1));
        assert!(report.avg_latency <= report.max_latency);
    }
}
