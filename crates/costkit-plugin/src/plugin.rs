use costkit_types::request::{
    ActualCostRequest, ActualCostResponse, BudgetsResponse, DismissRecommendationRequest,
    DismissRecommendationResponse, DryRunRequest, DryRunResponse, EstimateCostRequest,
    EstimateCostResponse, PricingSpecRequest, PricingSpecResponse, ProjectedCostRequest,
    ProjectedCostResponse, RecommendationsRequest, RecommendationsResponse,
};
use costkit_types::{GranularSupportResponse, PluginError, PluginMetadata, ResourceDescriptor};

/// Operation names as they appear on the wire and in reports.
pub mod operation {
    pub const GET_ACTUAL_COST: &str = "GetActualCost";
    pub const GET_PROJECTED_COST: &str = "GetProjectedCost";
    pub const GET_PRICING_SPEC: &str = "GetPricingSpec";
    pub const ESTIMATE_COST: &str = "EstimateCost";
    pub const GET_RECOMMENDATIONS: &str = "GetRecommendations";
    pub const DISMISS_RECOMMENDATION: &str = "DismissRecommendation";
    pub const GET_BUDGETS: &str = "GetBudgets";
    pub const HANDLE_DRY_RUN: &str = "HandleDryRun";
    pub const SUPPORTS: &str = "Supports";
}

/// A cost-source plugin behind the synchronous RPC contract.
///
/// The four cost operations are the base contract: every plugin must
/// provide handlers, though a handler may return
/// [`PluginError::NotImplemented`] for operations its backing source lacks
/// (the conformance suite will fail such a plugin at the level requiring
/// the operation). Optional features are exposed through the provider
/// accessors; returning `Some` is how a plugin advertises the capability to
/// auto-discovery.
pub trait CostSourcePlugin: Send + Sync {
    /// Stable plugin name used in reports and logs.
    fn name(&self) -> &str;

    /// Self-reported identity and capability metadata.
    fn metadata(&self) -> Result<PluginMetadata, PluginError>;

    fn actual_cost(&self, request: &ActualCostRequest) -> Result<ActualCostResponse, PluginError>;

    fn projected_cost(
        &self,
        request: &ProjectedCostRequest,
    ) -> Result<ProjectedCostResponse, PluginError>;

    fn pricing_spec(
        &self,
        request: &PricingSpecRequest,
    ) -> Result<PricingSpecResponse, PluginError>;

    fn estimate_cost(
        &self,
        request: &EstimateCostRequest,
    ) -> Result<EstimateCostResponse, PluginError>;

    /// Per-resource support check backing granular discovery.
    ///
    /// The default inherits the plugin's global capability set for every
    /// resource, which is the correct behavior for plugins unaware of
    /// granular discovery.
    fn supports(
        &self,
        _resource: &ResourceDescriptor,
    ) -> Result<GranularSupportResponse, PluginError> {
        Ok(GranularSupportResponse::inherit_global())
    }

    /// Recommendations feature, when implemented.
    fn recommendations(&self) -> Option<&dyn RecommendationsProvider> {
        None
    }

    /// Budgets feature, when implemented.
    fn budgets(&self) -> Option<&dyn BudgetsProvider> {
        None
    }

    /// Dry-run feature, when implemented.
    fn dry_run(&self) -> Option<&dyn DryRunHandler> {
        None
    }
}

/// Optional recommendations feature of a plugin.
pub trait RecommendationsProvider: Send + Sync {
    fn get_recommendations(
        &self,
        request: &RecommendationsRequest,
    ) -> Result<RecommendationsResponse, PluginError>;

    /// Dismissal is part of the recommendations feature but advertised as a
    /// separate capability; plugins without backing support return
    /// `NotImplemented`.
    fn dismiss_recommendation(
        &self,
        request: &DismissRecommendationRequest,
    ) -> Result<DismissRecommendationResponse, PluginError> {
        let _ = request;
        Err(PluginError::not_implemented(
            operation::DISMISS_RECOMMENDATION,
        ))
    }

    /// True when dismissal is backed by a real handler.
    fn supports_dismissal(&self) -> bool {
        false
    }
}

/// Optional budgets feature of a plugin.
pub trait BudgetsProvider: Send + Sync {
    fn get_budgets(&self) -> Result<BudgetsResponse, PluginError>;
}

/// Optional dry-run feature of a plugin.
pub trait DryRunHandler: Send + Sync {
    fn handle_dry_run(&self, request: &DryRunRequest) -> Result<DryRunResponse, PluginError>;
}
