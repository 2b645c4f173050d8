//! Request and response payloads of the cost-estimation contract.
//!
//! These are thin serde-serializable records; schema generation and
//! document validation live outside this crate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resource::{RecommendationFilter, ResourceDescriptor};

/// Query for observed spend over a time window (unix seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualCostRequest {
    pub resource: ResourceDescriptor,
    pub start_unix: u64,
    pub end_unix: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualCostResponse {
    pub total: f64,
    pub currency: String,
}

/// Query for forward-looking monthly spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCostRequest {
    pub resource: ResourceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCostResponse {
    pub monthly: f64,
    pub currency: String,
}

/// Query for the pricing specification document of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSpecRequest {
    pub resource: ResourceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingSpecResponse {
    /// Opaque pricing document; validated by external tooling.
    pub spec: Value,
}

/// Query for a usage-based cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateCostRequest {
    pub resource: ResourceDescriptor,
    /// Opaque usage parameters interpreted by the plugin.
    pub usage: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateCostResponse {
    pub estimated: f64,
    pub currency: String,
}

/// Recommendation grouping used by filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationCategory {
    Cost,
    Performance,
    Security,
    Reliability,
}

/// Recommendation urgency used by filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationPriority {
    Low,
    Medium,
    High,
}

/// A single actionable recommendation returned by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub description: String,
    pub category: RecommendationCategory,
    pub priority: RecommendationPriority,
    pub resource: ResourceDescriptor,
}

/// Query for recommendations, optionally scoped by filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsRequest {
    #[serde(default)]
    pub filter: RecommendationFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

/// Dismiss a previously returned recommendation by ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissRecommendationRequest {
    pub recommendation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissRecommendationResponse {
    pub dismissed: bool,
}

/// A budget tracked by the plugin's backing system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetsResponse {
    pub budgets: Vec<Budget>,
}

/// Preview the cost impact of a proposed change without applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunRequest {
    pub resource: ResourceDescriptor,
    /// Opaque change description interpreted by the plugin.
    pub change: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryRunResponse {
    pub projected_delta: f64,
    pub currency: String,
}
