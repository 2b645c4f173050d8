//! Reference plugins for exercising the harness and conformance suite.
//!
//! [`StaticSource`] is a complete, deterministic implementation of the cost
//! contract backed by an in-memory rate table; it is what a fully
//! conformant plugin looks like. [`MinimalSource`] implements only actual
//! costs, matching the oldest plugins still in the field, and exists so the
//! suite's failure paths stay covered.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use costkit_plugin::plugin::{
    operation, BudgetsProvider, CostSourcePlugin, DryRunHandler, RecommendationsProvider,
};
use costkit_types::request::{
    ActualCostRequest, ActualCostResponse, Budget, BudgetsResponse, DismissRecommendationRequest,
    DismissRecommendationResponse, DryRunRequest, DryRunResponse, EstimateCostRequest,
    EstimateCostResponse, PricingSpecRequest, PricingSpecResponse, ProjectedCostRequest,
    ProjectedCostResponse, Recommendation, RecommendationCategory, RecommendationPriority,
    RecommendationsRequest, RecommendationsResponse,
};
use costkit_types::{
    CapabilitySet, GranularSupportResponse, PluginCapability, PluginError, PluginMetadata,
    ResourceDescriptor,
};

const PROVIDER: &str = "aws";
const CURRENCY: &str = "USD";
const HOURS_PER_MONTH: f64 = 730.0;

/// Resource type served only through dry-run previews.
///
/// Archive storage has no live billing feed in the rate table, so granular
/// discovery narrows it to the dry-run capability alone.
const ARCHIVE_TYPE: &str = "archive";

fn hourly_rate(resource_type: &str) -> f64 {
    match resource_type {
        "compute" => 1.0,
        "database" => 2.5,
        "storage" => 0.1,
        _ => 0.5,
    }
}

/// Deterministic full-featured plugin backed by an in-memory rate table.
///
/// Every answer is a pure function of the request except dismissals, which
/// record the dismissed IDs so repeated calls stay idempotent.
pub struct StaticSource {
    dismissed: Mutex<HashSet<String>>,
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSource {
    pub fn new() -> Self {
        Self {
            dismissed: Mutex::new(HashSet::new()),
        }
    }

    fn window_hours(start_unix: u64, end_unix: u64) -> Result<f64, PluginError> {
        if end_unix < start_unix {
            return Err(PluginError::InvalidRequest(
                "window end precedes window start".to_string(),
            ));
        }
        Ok((end_unix - start_unix) as f64 / 3_600.0)
    }
}

impl CostSourcePlugin for StaticSource {
    fn name(&self) -> &str {
        "static-source"
    }

    fn metadata(&self) -> Result<PluginMetadata, PluginError> {
        Ok(PluginMetadata {
            name: self.name().to_string(),
            version: "1.2.0".to_string(),
            spec_version: "1.0.0".to_string(),
            providers: vec![PROVIDER.to_string()],
            capabilities: CapabilitySet::new(),
            legacy_metadata: BTreeMap::new(),
        })
    }

    fn actual_cost(&self, request: &ActualCostRequest) -> Result<ActualCostResponse, PluginError> {
        let hours = Self::window_hours(request.start_unix, request.end_unix)?;
        Ok(ActualCostResponse {
            total: hourly_rate(&request.resource.resource_type) * hours,
            currency: CURRENCY.to_string(),
        })
    }

    fn projected_cost(
        &self,
        request: &ProjectedCostRequest,
    ) -> Result<ProjectedCostResponse, PluginError> {
        Ok(ProjectedCostResponse {
            monthly: hourly_rate(&request.resource.resource_type) * HOURS_PER_MONTH,
            currency: CURRENCY.to_string(),
        })
    }

    fn pricing_spec(
        &self,
        request: &PricingSpecRequest,
    ) -> Result<PricingSpecResponse, PluginError> {
        Ok(PricingSpecResponse {
            spec: serde_json::json!({
                "provider": PROVIDER,
                "resource_type": request.resource.resource_type,
                "billing_mode": "per_hour",
                "rate": hourly_rate(&request.resource.resource_type),
                "currency": CURRENCY,
            }),
        })
    }

    fn estimate_cost(
        &self,
        request: &EstimateCostRequest,
    ) -> Result<EstimateCostResponse, PluginError> {
        let hours = request
            .usage
            .get("hours")
            .and_then(|value| value.as_f64())
            .ok_or_else(|| {
                PluginError::InvalidRequest("usage must carry a numeric hours field".to_string())
            })?;
        if hours < 0.0 {
            return Err(PluginError::InvalidRequest(
                "usage hours must not be negative".to_string(),
            ));
        }
        Ok(EstimateCostResponse {
            estimated: hourly_rate(&request.resource.resource_type) * hours,
            currency: CURRENCY.to_string(),
        })
    }

    fn supports(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<GranularSupportResponse, PluginError> {
        if resource.provider != PROVIDER {
            return Ok(GranularSupportResponse::unsupported(&format!(
                "provider {:?} is not covered by the rate table",
                resource.provider
            )));
        }
        if resource.resource_type == ARCHIVE_TYPE {
            return Ok(GranularSupportResponse::with_capabilities(
                CapabilitySet::from_capabilities([PluginCapability::DryRun]),
            ));
        }
        Ok(GranularSupportResponse::inherit_global())
    }

    fn recommendations(&self) -> Option<&dyn RecommendationsProvider> {
        Some(self)
    }

    fn budgets(&self) -> Option<&dyn BudgetsProvider> {
        Some(self)
    }

    fn dry_run(&self) -> Option<&dyn DryRunHandler> {
        Some(self)
    }
}

impl RecommendationsProvider for StaticSource {
    fn get_recommendations(
        &self,
        request: &RecommendationsRequest,
    ) -> Result<RecommendationsResponse, PluginError> {
        let candidates = [
            Recommendation {
                id: "rightsize-compute".to_string(),
                description: "downsize underutilized compute".to_string(),
                category: RecommendationCategory::Cost,
                priority: RecommendationPriority::High,
                resource: ResourceDescriptor::new(PROVIDER, "compute"),
            },
            Recommendation {
                id: "archive-cold-storage".to_string(),
                description: "move cold objects to archive storage".to_string(),
                category: RecommendationCategory::Cost,
                priority: RecommendationPriority::Low,
                resource: ResourceDescriptor::new(PROVIDER, "storage"),
            },
            Recommendation {
                id: "enable-backups".to_string(),
                description: "enable automated database backups".to_string(),
                category: RecommendationCategory::Reliability,
                priority: RecommendationPriority::Medium,
                resource: ResourceDescriptor::new(PROVIDER, "database"),
            },
        ];

        let dismissed = self
            .dismissed
            .lock()
            .map_err(|_| PluginError::PluginFailure("dismissal state poisoned".to_string()))?;

        let recommendations = candidates
            .into_iter()
            .filter(|candidate| !dismissed.contains(&candidate.id))
            .filter(|candidate| {
                request
                    .filter
                    .matches(&candidate.resource, candidate.category, candidate.priority)
            })
            .collect();

        Ok(RecommendationsResponse { recommendations })
    }

    fn dismiss_recommendation(
        &self,
        request: &DismissRecommendationRequest,
    ) -> Result<DismissRecommendationResponse, PluginError> {
        let mut dismissed = self
            .dismissed
            .lock()
            .map_err(|_| PluginError::PluginFailure("dismissal state poisoned".to_string()))?;
        dismissed.insert(request.recommendation_id.clone());
        Ok(DismissRecommendationResponse { dismissed: true })
    }

    fn supports_dismissal(&self) -> bool {
        true
    }
}

impl BudgetsProvider for StaticSource {
    fn get_budgets(&self) -> Result<BudgetsResponse, PluginError> {
        Ok(BudgetsResponse {
            budgets: vec![
                Budget {
                    id: "monthly-infra".to_string(),
                    name: "monthly infrastructure".to_string(),
                    amount: 10_000.0,
                    currency: CURRENCY.to_string(),
                },
                Budget {
                    id: "quarterly-data".to_string(),
                    name: "quarterly data platform".to_string(),
                    amount: 45_000.0,
                    currency: CURRENCY.to_string(),
                },
            ],
        })
    }
}

impl DryRunHandler for StaticSource {
    fn handle_dry_run(&self, request: &DryRunRequest) -> Result<DryRunResponse, PluginError> {
        let instances = request
            .change
            .get("instances")
            .and_then(|value| value.as_f64())
            .unwrap_or(1.0);
        Ok(DryRunResponse {
            projected_delta: hourly_rate(&request.resource.resource_type)
                * HOURS_PER_MONTH
                * instances,
            currency: CURRENCY.to_string(),
        })
    }
}

/// A plugin from before most of the contract existed.
///
/// Only actual costs are implemented; everything else answers
/// `NotImplemented`, and capabilities are advertised through the legacy
/// string map alone.
pub struct MinimalSource;

impl CostSourcePlugin for MinimalSource {
    fn name(&self) -> &str {
        "minimal-source"
    }

    fn metadata(&self) -> Result<PluginMetadata, PluginError> {
        let mut legacy_metadata = BTreeMap::new();
        legacy_metadata.insert("supports_actual_costs".to_string(), "true".to_string());
        Ok(PluginMetadata {
            name: self.name().to_string(),
            version: "0.3.1".to_string(),
            spec_version: "1.0.0".to_string(),
            providers: vec![PROVIDER.to_string()],
            capabilities: CapabilitySet::new(),
            legacy_metadata,
        })
    }

    fn actual_cost(&self, request: &ActualCostRequest) -> Result<ActualCostResponse, PluginError> {
        if request.end_unix < request.start_unix {
            return Err(PluginError::InvalidRequest(
                "window end precedes window start".to_string(),
            ));
        }
        Ok(ActualCostResponse {
            total: (request.end_unix - request.start_unix) as f64 / 3_600.0,
            currency: CURRENCY.to_string(),
        })
    }

    fn projected_cost(
        &self,
        _request: &ProjectedCostRequest,
    ) -> Result<ProjectedCostResponse, PluginError> {
        Err(PluginError::not_implemented(operation::GET_PROJECTED_COST))
    }

    fn pricing_spec(
        &self,
        _request: &PricingSpecRequest,
    ) -> Result<PricingSpecResponse, PluginError> {
        Err(PluginError::not_implemented(operation::GET_PRICING_SPEC))
    }

    fn estimate_cost(
        &self,
        _request: &EstimateCostRequest,
    ) -> Result<EstimateCostResponse, PluginError> {
        Err(PluginError::not_implemented(operation::ESTIMATE_COST))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute() -> ResourceDescriptor {
        ResourceDescriptor::new(PROVIDER, "compute")
    }

    #[test]
    fn actual_cost_scales_with_window() {
        let source = StaticSource::new();
        let one_hour = source
            .actual_cost(&ActualCostRequest {
                resource: compute(),
                start_unix: 0,
                end_unix: 3_600,
            })
            .unwrap();
        let two_hours = source
            .actual_cost(&ActualCostRequest {
                resource: compute(),
                start_unix: 0,
                end_unix: 7_200,
            })
            .unwrap();
        assert_eq!(one_hour.total * 2.0, two_hours.total);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = StaticSource::new()
            .actual_cost(&ActualCostRequest {
                resource: compute(),
                start_unix: 7_200,
                end_unix: 0,
            })
            .unwrap_err();
        assert!(err.to_string().contains("precedes"));
    }

    #[test]
    fn estimate_requires_numeric_hours() {
        let source = StaticSource::new();
        let err = source
            .estimate_cost(&EstimateCostRequest {
                resource: compute(),
                usage: serde_json::json!({ "hours": "many" }),
            })
            .unwrap_err();
        assert!(err.to_string().contains("hours"));
    }

    #[test]
    fn foreign_provider_is_unsupported() {
        let answer = StaticSource::new()
            .supports(&ResourceDescriptor::new("gcp", "compute"))
            .unwrap();
        assert!(!answer.supported);
        assert!(answer.reason.contains("gcp"));
    }

    #[test]
    fn archive_narrows_to_dry_run_only() {
        let answer = StaticSource::new()
            .supports(&ResourceDescriptor::new(PROVIDER, ARCHIVE_TYPE))
            .unwrap();
        assert!(answer.supported);
        assert_eq!(answer.capabilities.to_vec(), vec![PluginCapability::DryRun]);
    }

    #[test]
    fn dismissed_recommendations_stay_gone() {
        let source = StaticSource::new();
        let before = source
            .get_recommendations(&RecommendationsRequest::default())
            .unwrap();
        assert!(before.recommendations.iter().any(|r| r.id == "rightsize-compute"));

        source
            .dismiss_recommendation(&DismissRecommendationRequest {
                recommendation_id: "rightsize-compute".to_string(),
            })
            .unwrap();

        let after = source
            .get_recommendations(&RecommendationsRequest::default())
            .unwrap();
        assert!(!after.recommendations.iter().any(|r| r.id == "rightsize-compute"));
        assert_eq!(after.recommendations.len(), before.recommendations.len() - 1);
    }

    #[test]
    fn recommendation_filter_is_applied() {
        use costkit_types::RecommendationFilter;

        let source = StaticSource::new();
        let response = source
            .get_recommendations(&RecommendationsRequest {
                filter: RecommendationFilter {
                    category: Some(RecommendationCategory::Reliability),
                    ..RecommendationFilter::default()
                },
            })
            .unwrap();
        assert_eq!(response.recommendations.len(), 1);
        assert_eq!(response.recommendations[0].id, "enable-backups");
    }

    #[test]
    fn minimal_source_answers_actual_costs_only() {
        let source = MinimalSource;
        assert!(source
            .actual_cost(&ActualCostRequest {
                resource: compute(),
                start_unix: 0,
                end_unix: 3_600,
            })
            .is_ok());
        assert!(source
            .projected_cost(&ProjectedCostRequest { resource: compute() })
            .unwrap_err()
            .is_not_implemented());
        assert!(source.recommendations().is_none());
        assert!(source.budgets().is_none());
        assert!(source.dry_run().is_none());
    }

    #[test]
    fn minimal_source_advertises_through_legacy_map() {
        let metadata = MinimalSource.metadata().unwrap();
        assert_eq!(
            metadata.legacy_metadata.get("supports_actual_costs"),
            Some(&"true".to_string())
        );
        assert!(metadata.capabilities.is_empty());
    }
}
