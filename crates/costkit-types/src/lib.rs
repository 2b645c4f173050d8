//! Data model for the costkit plugin contract.
//!
//! This crate defines the types shared by the capability negotiator, the
//! in-process harness, and the conformance suite: capability enumerations
//! and their legacy projections, resource descriptors and matching rules,
//! conformance and performance result types, plugin errors with typed RPC
//! codes, and the thin request/response payloads of the cost contract.

pub mod capability;
pub mod error;
pub mod level;
pub mod metadata;
pub mod perf;
pub mod request;
pub mod resource;
pub mod result;

pub use capability::{
    capability_for_legacy, legacy_name_of, CapabilitySet, LegacyWarning, PluginCapability,
};
pub use error::{error_code, PluginError};
pub use level::{ConformanceLevel, TestCategory};
pub use metadata::{GlobalCapabilityInfo, PluginMetadata};
pub use perf::{PerformanceBaseline, PerformanceResult};
pub use resource::{
    validate_target_resources, GranularSupportResponse, RecommendationFilter, ResourceDescriptor,
    MAX_TARGET_RESOURCES,
};
pub use result::{CategoryResult, ConformanceResult, ConformanceSummary, TestResult};
