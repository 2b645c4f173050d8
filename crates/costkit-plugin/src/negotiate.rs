use costkit_types::{
    CapabilitySet, GranularSupportResponse, PluginCapability, PluginError, ResourceDescriptor,
};

use crate::plugin::CostSourcePlugin;

/// Capabilities every plugin carries by virtue of the base contract.
///
/// The trait requires handlers for these four operations, so auto-discovery
/// asserts them unconditionally; a plugin that wants to advertise less
/// supplies an explicit override list.
const CORE_CAPABILITIES: [PluginCapability; 4] = [
    PluginCapability::ActualCosts,
    PluginCapability::ProjectedCosts,
    PluginCapability::PricingSpec,
    PluginCapability::EstimateCost,
];

fn probe_recommendations(plugin: &dyn CostSourcePlugin) -> bool {
    plugin.recommendations().is_some()
}

fn probe_dismissal(plugin: &dyn CostSourcePlugin) -> bool {
    plugin
        .recommendations()
        .is_some_and(|provider| provider.supports_dismissal())
}

fn probe_budgets(plugin: &dyn CostSourcePlugin) -> bool {
    plugin.budgets().is_some()
}

fn probe_dry_run(plugin: &dyn CostSourcePlugin) -> bool {
    plugin.dry_run().is_some()
}

/// Fixed table pairing each optional capability with its discovery probe.
///
/// Discovery is a plain accessor check, never runtime introspection: a
/// plugin advertises a capability by returning `Some` from the matching
/// provider accessor.
const OPTIONAL_PROBES: [(PluginCapability, fn(&dyn CostSourcePlugin) -> bool); 4] = [
    (PluginCapability::Recommendations, probe_recommendations),
    (PluginCapability::DismissRecommendations, probe_dismissal),
    (PluginCapability::Budgets, probe_budgets),
    (PluginCapability::DryRun, probe_dry_run),
];

/// Computes global and per-resource capability sets for a plugin.
///
/// Global capabilities come from auto-discovery unless an explicit override
/// list was supplied at construction; the override is authoritative,
/// including when it is empty. Granular capabilities delegate to the
/// plugin's own support check and apply the inheritance fallback.
#[derive(Debug, Clone, Default)]
pub struct CapabilityNegotiator {
    explicit: Option<CapabilitySet>,
}

impl CapabilityNegotiator {
    /// Negotiator using interface auto-discovery.
    pub fn auto() -> Self {
        Self { explicit: None }
    }

    /// Negotiator with an authoritative capability list.
    ///
    /// An empty list means zero capabilities, not "decide for me".
    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        Self {
            explicit: Some(capabilities),
        }
    }

    /// Compute the plugin's global capability set.
    pub fn global_capabilities(&self, plugin: &dyn CostSourcePlugin) -> CapabilitySet {
        if let Some(explicit) = &self.explicit {
            return explicit.clone();
        }

        let mut set = CapabilitySet::from_capabilities(CORE_CAPABILITIES);
        for (capability, probe) in OPTIONAL_PROBES {
            if probe(plugin) {
                set.insert(capability);
            }
        }
        set
    }

    /// Resolve the plugin's granular support answer for one resource.
    ///
    /// The raw plugin response is returned as-is; use
    /// [`effective_capabilities`](Self::effective_capabilities) for the
    /// resolved set with inheritance applied.
    pub fn granular_capabilities(
        &self,
        plugin: &dyn CostSourcePlugin,
        resource: &ResourceDescriptor,
    ) -> Result<GranularSupportResponse, PluginError> {
        resource.validate()?;
        plugin.supports(resource)
    }

    /// Resolve a granular support answer into the effective set.
    ///
    /// Resolution, in order: `supported=false` wins and yields an empty
    /// set regardless of any listed capabilities; a non-empty response list
    /// is authoritative and complete; an empty list inherits the full
    /// global set. This step never calls into the plugin's support check,
    /// so hosts that obtained `response` through their own guarded call
    /// path (deadline, panic trap) keep those guarantees.
    pub fn resolve_effective(
        &self,
        plugin: &dyn CostSourcePlugin,
        response: GranularSupportResponse,
    ) -> CapabilitySet {
        if !response.supported {
            return CapabilitySet::new();
        }
        if response.capabilities.is_empty() {
            return self.global_capabilities(plugin);
        }
        response.capabilities
    }

    /// The effective capability set for one resource.
    ///
    /// Queries the plugin's support check directly and applies
    /// [`resolve_effective`](Self::resolve_effective). Responses are
    /// computed fresh per call, never cached.
    pub fn effective_capabilities(
        &self,
        plugin: &dyn CostSourcePlugin,
        resource: &ResourceDescriptor,
    ) -> Result<CapabilitySet, PluginError> {
        let response = self.granular_capabilities(plugin, resource)?;
        Ok(self.resolve_effective(plugin, response))
    }

    /// Hard gate: fail unless `capability` is effective for `resource`.
    ///
    /// Hosts call this before dispatching an operation; exclusion is a
    /// contract violation, not a hint, so the error is explicit rather than
    /// best-effort.
    pub fn ensure_supported(
        &self,
        plugin: &dyn CostSourcePlugin,
        resource: &ResourceDescriptor,
        capability: PluginCapability,
        operation: &str,
    ) -> Result<(), PluginError> {
        let effective = self.effective_capabilities(plugin, resource)?;
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
}
