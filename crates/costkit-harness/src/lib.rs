//! In-process test harness and probes for cost-source plugins.
//!
//! [`harness::InProcessHarness`] binds a plugin implementation to an
//! in-memory client with no socket I/O: every RPC operation is an ordinary
//! synchronous call bounded by a per-call deadline, and
//! [`harness::HarnessClient`] handles can be cloned for concurrent callers.
//! [`latency::LatencyProbe`] and [`concurrency::run_concurrent`] measure
//! timing and thread-safety over that surface.

pub mod concurrency;
pub mod harness;
pub mod latency;

pub use concurrency::{run_concurrent, CallOutcome, ConcurrencyReport, ConcurrentCall};
pub use harness::{HarnessClient, InProcessHarness};
pub use latency::{LatencyProbe, PerformanceValidator, DEFAULT_ITERATIONS};
