//! Conformance certification for cost-source plugins.
//!
//! A [`suite::ConformanceSuite`] is an ordered registry of
//! [`test::ConformanceTest`]s. The default battery covers the functional
//! contract, error handling, capability compatibility, latency baselines,
//! and thread-safety; the entry points
//! [`run_basic_conformance`](suite::run_basic_conformance),
//! [`run_standard_conformance`](suite::run_standard_conformance), and
//! [`run_advanced_conformance`](suite::run_advanced_conformance) wrap a
//! plugin in an in-process harness and return an immutable
//! `ConformanceResult`.

pub mod baseline;
pub mod battery;
pub mod logging;
pub mod report;
pub mod suite;
pub mod test;

pub use baseline::BaselineSet;
pub use battery::default_battery;
pub use logging::{CaptureLayer, LogBuffer, LogEntry, LogLevel};
pub use report::{render, render_to_string};
pub use suite::{
    run_advanced_conformance, run_basic_conformance, run_standard_conformance, ConformanceSuite,
};
pub use test::{ConformanceTest, TestOutcome};
