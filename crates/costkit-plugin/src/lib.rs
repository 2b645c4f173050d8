//! The cost-source plugin contract and capability negotiation.
//!
//! A plugin is any value implementing [`CostSourcePlugin`]. Optional
//! features are expressed as provider traits surfaced through accessor
//! methods, and the [`negotiate::CapabilityNegotiator`] turns those
//! accessors into a global capability set, resolves per-resource granular
//! capabilities, and enforces the granular gate before dispatch.

pub mod metadata;
pub mod negotiate;
pub mod plugin;

pub use metadata::{global_capability_info, SPEC_VERSION, SUPPORTED_SPEC_VERSIONS};
pub use negotiate::CapabilityNegotiator;
pub use plugin::{BudgetsProvider, CostSourcePlugin, DryRunHandler, RecommendationsProvider};
