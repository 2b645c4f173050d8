use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::{CapabilitySet, PluginCapability};

/// Self-reported plugin identity and capability metadata.
///
/// This is raw plugin output; it is validated at the host boundary before
/// being promoted to a [`GlobalCapabilityInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub spec_version: String,
    #[serde(default)]
    pub providers: Vec<String>,
    #[serde(default)]
    pub capabilities: CapabilitySet,
    #[serde(default)]
    pub legacy_metadata: BTreeMap<String, String>,
}

/// Validated plugin metadata returned from the capability query.
///
/// Constructed only by the host after validation; accessors hand out
/// independently owned copies so callers cannot mutate internal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalCapabilityInfo {
    name: String,
    version: String,
    spec_version: String,
    providers: Vec<String>,
    capabilities: CapabilitySet,
    legacy_metadata: BTreeMap<String, String>,
}

impl GlobalCapabilityInfo {
    /// Assemble validated info. Callers are expected to have validated the
    /// identity fields already; this constructor only stores.
    pub fn new(
        name: String,
        version: String,
        spec_version: String,
        providers: Vec<String>,
        capabilities: CapabilitySet,
        legacy_metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name,
            version,
            spec_version,
            providers,
            capabilities,
            legacy_metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn spec_version(&self) -> &str {
        &self.spec_version
    }

    /// Fresh copy of the provider list.
    pub fn providers(&self) -> Vec<String> {
        self.providers.clone()
    }

    /// Fresh copy of the capability enum list.
    pub fn capabilities(&self) -> Vec<PluginCapability> {
        self.capabilities.to_vec()
    }

    pub fn capability_set(&self) -> CapabilitySet {
        self.capabilities.clone()
    }

    /// Fresh copy of the legacy string metadata map.
    pub fn legacy_metadata(&self) -> BTreeMap<String, String> {
        self.legacy_metadata.clone()
    }
}
