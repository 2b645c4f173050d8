use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use costkit_plugin::metadata::global_capability_info;
use costkit_plugin::plugin::{operation, CostSourcePlugin};
use costkit_plugin::CapabilityNegotiator;
use costkit_types::request::{
    ActualCostRequest, ActualCostResponse, BudgetsResponse, DismissRecommendationRequest,
    DismissRecommendationResponse, DryRunRequest, DryRunResponse, EstimateCostRequest,
    EstimateCostResponse, PricingSpecRequest, PricingSpecResponse, ProjectedCostRequest,
    ProjectedCostResponse, RecommendationsRequest, RecommendationsResponse,
};
use costkit_types::{
    CapabilitySet, GlobalCapabilityInfo, GranularSupportResponse, PluginCapability, PluginError,
    ResourceDescriptor,
};

/// Default per-call deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Run one plugin call on a worker thread, bounded by `deadline`.
///
/// A stuck plugin cannot wedge the caller: on timeout the worker is
/// abandoned and exits whenever the call finally returns. Panics inside the
/// plugin are trapped and surfaced as an unavailability error.
fn dispatch<T, F>(
    plugin: Arc<dyn CostSourcePlugin>,
    deadline: Duration,
    operation: &str,
    call: F,
) -> Result<T, PluginError>
where
    T: Send + 'static,
    F: FnOnce(&dyn CostSourcePlugin) -> Result<T, PluginError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let op = operation.to_string();
    let worker_op = op.clone();

    thread::spawn(move || {
        let outcome = catch_unwind(AssertUnwindSafe(|| call(plugin.as_ref())));
        // The receiver may have timed out and gone away; that is fine.
        let _ = tx.send((worker_op, outcome));
    });

    match rx.recv_timeout(deadline) {
        Ok((_, Ok(result))) => result,
        Ok((worker_op, Err(panic))) => {
            let detail = panic_message(&panic);
            warn!(operation = %worker_op, detail, "plugin panicked during call");
            Err(PluginError::Unavailable(format!(
                "plugin panicked during {worker_op}"
            )))
        }
        Err(RecvTimeoutError::Timeout) => Err(PluginError::Timeout {
            operation: op,
            timeout_ms: deadline.as_millis() as u64,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(PluginError::Unavailable(format!(
            "plugin worker exited without responding to {op}"
        ))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A cloneable in-memory client for issuing calls against the plugin.
///
/// Every operation validates its request, enforces the granular capability
/// gate where a resource is in play, and dispatches under the per-call
/// deadline. Clones share the plugin instance, which is what the
/// concurrency probe relies on.
#[derive(Clone)]
pub struct HarnessClient {
    plugin: Arc<dyn CostSourcePlugin>,
    negotiator: Arc<CapabilityNegotiator>,
    deadline: Duration,
}

impl HarnessClient {
    /// The effective capability set for one resource.
    ///
    /// The plugin's support check runs through [`supports`](Self::supports),
    /// so it carries the same deadline and panic trap as every other call;
    /// only the resolution of the answer happens on the caller thread.
    pub fn effective_capabilities(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<CapabilitySet, PluginError> {
        let response = self.supports(resource)?;
        Ok(self
            .negotiator
            .resolve_effective(self.plugin.as_ref(), response))
    }

    fn gate(
        &self,
        resource: &ResourceDescriptor,
        capability: PluginCapability,
        operation: &str,
    ) -> Result<(), PluginError> {
        let effective = self.effective_capabilities(resource)?;
        if effective.contains(capability) {
            Ok(())
        } else {
            Err(PluginError::UnsupportedResource {
                operation: operation.to_string(),
                provider: resource.provider.clone(),
                resource_type: resource.resource_type.clone(),
            })
        }
    }

    pub fn actual_cost(
        &self,
        request: &ActualCostRequest,
    ) -> Result<ActualCostResponse, PluginError> {
        request.resource.validate()?;
        self.gate(
            &request.resource,
            PluginCapability::ActualCosts,
            operation::GET_ACTUAL_COST,
        )?;
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::GET_ACTUAL_COST,
            move |plugin| plugin.actual_cost(&request),
        )
    }

    pub fn projected_cost(
        &self,
        request: &ProjectedCostRequest,
    ) -> Result<ProjectedCostResponse, PluginError> {
        request.resource.validate()?;
        self.gate(
            &request.resource,
            PluginCapability::ProjectedCosts,
            operation::GET_PROJECTED_COST,
        )?;
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::GET_PROJECTED_COST,
            move |plugin| plugin.projected_cost(&request),
        )
    }

    pub fn pricing_spec(
        &self,
        request: &PricingSpecRequest,
    ) -> Result<PricingSpecResponse, PluginError> {
        request.resource.validate()?;
        self.gate(
            &request.resource,
            PluginCapability::PricingSpec,
            operation::GET_PRICING_SPEC,
        )?;
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::GET_PRICING_SPEC,
            move |plugin| plugin.pricing_spec(&request),
        )
    }

    pub fn estimate_cost(
        &self,
        request: &EstimateCostRequest,
    ) -> Result<EstimateCostResponse, PluginError> {
        request.resource.validate()?;
        self.gate(
            &request.resource,
            PluginCapability::EstimateCost,
            operation::ESTIMATE_COST,
        )?;
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::ESTIMATE_COST,
            move |plugin| plugin.estimate_cost(&request),
        )
    }

    /// Granular support check for one resource; never cached.
    pub fn supports(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<GranularSupportResponse, PluginError> {
        resource.validate()?;
        let resource = resource.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::SUPPORTS,
            move |plugin| plugin.supports(&resource),
        )
    }

    pub fn recommendations(
        &self,
        request: &RecommendationsRequest,
    ) -> Result<RecommendationsResponse, PluginError> {
        request.filter.validate()?;
        if self.plugin.recommendations().is_none() {
            return Err(PluginError::not_implemented(operation::GET_RECOMMENDATIONS));
        }
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::GET_RECOMMENDATIONS,
            move |plugin| match plugin.recommendations() {
                Some(provider) => provider.get_recommendations(&request),
                None => Err(PluginError::not_implemented(operation::GET_RECOMMENDATIONS)),
            },
        )
    }

    pub fn dismiss_recommendation(
        &self,
        request: &DismissRecommendationRequest,
    ) -> Result<DismissRecommendationResponse, PluginError> {
        if request.recommendation_id.trim().is_empty() {
            return Err(PluginError::InvalidRequest(
                "recommendation_id must not be empty".to_string(),
            ));
        }
        match self.plugin.recommendations() {
            Some(provider) if provider.supports_dismissal() => {}
            _ => {
                return Err(PluginError::not_implemented(
                    operation::DISMISS_RECOMMENDATION,
                ))
            }
        }
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::DISMISS_RECOMMENDATION,
            move |plugin| match plugin.recommendations() {
                Some(provider) => provider.dismiss_recommendation(&request),
                None => Err(PluginError::not_implemented(
                    operation::DISMISS_RECOMMENDATION,
                )),
            },
        )
    }

    pub fn budgets(&self) -> Result<BudgetsResponse, PluginError> {
        if self.plugin.budgets().is_none() {
            return Err(PluginError::not_implemented(operation::GET_BUDGETS));
        }
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::GET_BUDGETS,
            move |plugin| match plugin.budgets() {
                Some(provider) => provider.get_budgets(),
                None => Err(PluginError::not_implemented(operation::GET_BUDGETS)),
            },
        )
    }

    pub fn dry_run(&self, request: &DryRunRequest) -> Result<DryRunResponse, PluginError> {
        request.resource.validate()?;
        if self.plugin.dry_run().is_none() {
            return Err(PluginError::not_implemented(operation::HANDLE_DRY_RUN));
        }
        self.gate(
            &request.resource,
            PluginCapability::DryRun,
            operation::HANDLE_DRY_RUN,
        )?;
        let request = request.clone();
        dispatch(
            self.plugin.clone(),
            self.deadline,
            operation::HANDLE_DRY_RUN,
            move |plugin| match plugin.dry_run() {
                Some(handler) => handler.handle_dry_run(&request),
                None => Err(PluginError::not_implemented(operation::HANDLE_DRY_RUN)),
            },
        )
    }
}

/// Binds a plugin implementation to an in-memory client for testing.
///
/// Construction is fail-fast: a plugin with an empty name is rejected with
/// a descriptive error before any harness state is built, which prevents
/// confusing downstream panics during test execution. The global
/// capability set is negotiated once here and is immutable for the life of
/// the harness.
pub struct InProcessHarness {
    client: HarnessClient,
    plugin_name: String,
    global_capabilities: CapabilitySet,
}

impl std::fmt::Debug for InProcessHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessHarness")
            .field("plugin_name", &self.plugin_name)
            .field("global_capabilities", &self.global_capabilities)
            .finish_non_exhaustive()
    }
}

impl InProcessHarness {
    pub fn new(plugin: Arc<dyn CostSourcePlugin>) -> Result<Self, PluginError> {
        Self::with_negotiator(plugin, CapabilityNegotiator::auto())
    }

    /// Build a harness with a caller-supplied negotiator (for explicit
    /// capability overrides).
    pub fn with_negotiator(
        plugin: Arc<dyn CostSourcePlugin>,
        negotiator: CapabilityNegotiator,
    ) -> Result<Self, PluginError> {
        let plugin_name = plugin.name().to_string();
        if plugin_name.trim().is_empty() {
            return Err(PluginError::InvalidRequest(
                "plugin reports an empty name; refusing to build a harness around it".to_string(),
            ));
        }

        let global_capabilities = negotiator.global_capabilities(plugin.as_ref());
        Ok(Self {
            client: HarnessClient {
                plugin,
                negotiator: Arc::new(negotiator),
                deadline: DEFAULT_DEADLINE,
            },
            plugin_name,
            global_capabilities,
        })
    }

    /// Replace the per-call deadline.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.client.deadline = deadline;
        self
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    pub fn deadline(&self) -> Duration {
        self.client.deadline
    }

    /// The global capability set negotiated at construction.
    ///
    /// Returns a fresh copy; the internal set is never mutated.
    pub fn global_capabilities(&self) -> CapabilitySet {
        self.global_capabilities.clone()
    }

    /// A client handle for issuing calls; clones share the plugin.
    pub fn client(&self) -> HarnessClient {
        self.client.clone()
    }

    /// Validated global capability metadata for the wrapped plugin.
    pub fn capability_info(&self) -> Result<GlobalCapabilityInfo, PluginError> {
        global_capability_info(self.client.plugin.as_ref(), self.client.negotiator.as_ref())
    }

    /// Effective capability set for one resource (granular resolution).
    pub fn effective_capabilities(
        &self,
        resource: &ResourceDescriptor,
    ) -> Result<CapabilitySet, PluginError> {
        self.client.effective_capabilities(resource)
    }
}
