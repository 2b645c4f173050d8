use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A feature a cost-source plugin can support.
///
/// The enumeration is closed: hosts and plugins must agree on this list, and
/// unknown values never round-trip through the legacy projection.
/// [`Unspecified`](PluginCapability::Unspecified) is a wire placeholder and
/// is never a positive assertion of support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginCapability {
    Unspecified,
    ActualCosts,
    ProjectedCosts,
    PricingSpec,
    EstimateCost,
    Recommendations,
    DismissRecommendations,
    Budgets,
    DryRun,
}

/// Legacy string names for capabilities, keyed by enum value.
///
/// This table is the single source of truth for enum-to-string conversion.
/// Every projection must route through it; re-deriving the mapping anywhere
/// else is a defect. `Unspecified` and `DryRun` deliberately have no entry:
/// the legacy metadata format predates dry-run support.
const LEGACY_NAMES: &[(PluginCapability, &str)] = &[
    (PluginCapability::ActualCosts, "supports_actual_costs"),
    (PluginCapability::ProjectedCosts, "supports_projected_costs"),
    (PluginCapability::PricingSpec, "supports_pricing_spec"),
    (PluginCapability::EstimateCost, "supports_estimate_cost"),
    (PluginCapability::Recommendations, "supports_recommendations"),
    (
        PluginCapability::DismissRecommendations,
        "supports_dismiss_recommendations",
    ),
    (PluginCapability::Budgets, "supports_budgets"),
];

impl PluginCapability {
    /// Every capability that is a positive assertion of support.
    pub const ALL: [PluginCapability; 8] = [
        PluginCapability::ActualCosts,
        PluginCapability::ProjectedCosts,
        PluginCapability::PricingSpec,
        PluginCapability::EstimateCost,
        PluginCapability::Recommendations,
        PluginCapability::DismissRecommendations,
        PluginCapability::Budgets,
        PluginCapability::DryRun,
    ];

    /// Stable identifier used in logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            PluginCapability::Unspecified => "UNSPECIFIED",
            PluginCapability::ActualCosts => "ACTUAL_COSTS",
            PluginCapability::ProjectedCosts => "PROJECTED_COSTS",
            PluginCapability::PricingSpec => "PRICING_SPEC",
            PluginCapability::EstimateCost => "ESTIMATE_COST",
            PluginCapability::Recommendations => "RECOMMENDATIONS",
            PluginCapability::DismissRecommendations => "DISMISS_RECOMMENDATIONS",
            PluginCapability::Budgets => "BUDGETS",
            PluginCapability::DryRun => "DRY_RUN",
        }
    }
}

impl fmt::Display for PluginCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look up the legacy string name for a capability, if one exists.
pub fn legacy_name_of(capability: PluginCapability) -> Option<&'static str> {
    LEGACY_NAMES
        .iter()
        .find(|(cap, _)| *cap == capability)
        .map(|(_, name)| *name)
}

/// Inverse lookup: the capability a legacy name maps to, if any.
pub fn capability_for_legacy(name: &str) -> Option<PluginCapability> {
    LEGACY_NAMES
        .iter()
        .find(|(_, legacy)| *legacy == name)
        .map(|(cap, _)| *cap)
}

/// A capability skipped during legacy projection, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyWarning {
    pub capability: PluginCapability,
    pub reason: String,
}

/// An ordered, duplicate-free set of capabilities.
///
/// Insertion order is preserved so negotiated sets render deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilitySet {
    entries: Vec<PluginCapability>,
}

// Deserialization routes through `insert` so wire input cannot smuggle
// duplicates or `Unspecified` into the set.
impl<'de> Deserialize<'de> for CapabilitySet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let entries = Vec::<PluginCapability>::deserialize(deserializer)?;
        Ok(Self::from_capabilities(entries))
    }
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from capabilities, dropping duplicates and `Unspecified`.
    pub fn from_capabilities<I: IntoIterator<Item = PluginCapability>>(capabilities: I) -> Self {
        let mut set = Self::new();
        for capability in capabilities {
            set.insert(capability);
        }
        set
    }

    /// Insert a capability, preserving order and ignoring duplicates.
    ///
    /// `Unspecified` is never stored; it is not a positive assertion.
    pub fn insert(&mut self, capability: PluginCapability) {
        if capability == PluginCapability::Unspecified {
            return;
        }
        if !self.entries.contains(&capability) {
            self.entries.push(capability);
        }
    }

    pub fn contains(&self, capability: PluginCapability) -> bool {
        self.entries.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PluginCapability> + '_ {
        self.entries.iter().copied()
    }

    /// Return an independently owned copy of the entries.
    ///
    /// Callers get a fresh vector, never a handle into internal state.
    pub fn to_vec(&self) -> Vec<PluginCapability> {
        self.entries.clone()
    }

    /// Project to the legacy `name -> "true"` string map.
    ///
    /// Capabilities without a legacy name are silently skipped.
    pub fn to_legacy_map(&self) -> BTreeMap<String, String> {
        self.to_legacy_map_with_warnings().0
    }

    /// Project to the legacy string map, reporting skipped capabilities.
    pub fn to_legacy_map_with_warnings(&self) -> (BTreeMap<String, String>, Vec<LegacyWarning>) {
        let mut map = BTreeMap::new();
        let mut warnings = Vec::new();

        for capability in self.iter() {
            match legacy_name_of(capability) {
                Some(name) => {
                    map.insert(name.to_string(), "true".to_string());
                }
                None => warnings.push(LegacyWarning {
                    capability,
                    reason: format!("capability {capability} has no legacy equivalent"),
                }),
            }
        }

        (map, warnings)
    }

    /// Project to the legacy per-resource `name -> bool` flag map.
    pub fn to_legacy_flags(&self) -> BTreeMap<String, bool> {
        self.iter()
            .filter_map(legacy_name_of)
            .map(|name| (name.to_string(), true))
            .collect()
    }

    /// Rebuild a set from a legacy string map.
    ///
    /// Unknown keys are ignored; only entries with value `"true"` count.
    pub fn from_legacy_map(map: &BTreeMap<String, String>) -> Self {
        let mut set = Self::new();
        for (name, value) in map {
            if value == "true" {
                if let Some(capability) = capability_for_legacy(name) {
                    set.insert(capability);
                }
            }
        }
        set
    }
}

impl FromIterator<PluginCapability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = PluginCapability>>(iter: I) -> Self {
        Self::from_capabilities(iter)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(PluginCapability::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_preserves_order_and_drops_duplicates() {
        let mut set = CapabilitySet::new();
        set.insert(PluginCapability::Budgets);
        set.insert(PluginCapability::ActualCosts);
        set.insert(PluginCapability::Budgets);
        assert_eq!(
            set.to_vec(),
            vec![PluginCapability::Budgets, PluginCapability::ActualCosts]
        );
    }

    #[test]
    fn unspecified_is_never_stored() {
        let set = CapabilitySet::from_capabilities([
            PluginCapability::Unspecified,
            PluginCapability::ActualCosts,
        ]);
        assert_eq!(set.to_vec(), vec![PluginCapability::ActualCosts]);
    }

    #[test]
    fn legacy_round_trip_preserves_mapped_capabilities() {
        let set = CapabilitySet::from_capabilities([
            PluginCapability::ActualCosts,
            PluginCapability::Recommendations,
            PluginCapability::Budgets,
        ]);
        let restored = CapabilitySet::from_legacy_map(&set.to_legacy_map());
        for capability in set.iter() {
            assert!(restored.contains(capability), "lost {capability}");
        }
    }

    #[test]
    fn unmapped_capability_is_dropped_with_warning() {
        let set = CapabilitySet::from_capabilities([
            PluginCapability::DryRun,
            PluginCapability::ActualCosts,
        ]);
        let (map, warnings) = set.to_legacy_map_with_warnings();
        assert!(map.contains_key("supports_actual_costs"));
        assert!(!map.values().any(|v| v != "true"));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].capability, PluginCapability::DryRun);
    }

    #[test]
    fn dropping_unmapped_does_not_corrupt_mapped_entries() {
        let set = CapabilitySet::from_capabilities([
            PluginCapability::DryRun,
            PluginCapability::Budgets,
            PluginCapability::EstimateCost,
        ]);
        let restored = CapabilitySet::from_legacy_map(&set.to_legacy_map());
        assert_eq!(
            restored.to_vec(),
            vec![PluginCapability::EstimateCost, PluginCapability::Budgets]
        );
    }

    #[test]
    fn from_legacy_ignores_false_and_unknown_entries() {
        let mut map = BTreeMap::new();
        map.insert("supports_budgets".to_string(), "false".to_string());
        map.insert("supports_actual_costs".to_string(), "true".to_string());
        map.insert("supports_teleport".to_string(), "true".to_string());
        let set = CapabilitySet::from_legacy_map(&map);
        assert_eq!(set.to_vec(), vec![PluginCapability::ActualCosts]);
    }

    #[test]
    fn deserialization_normalizes_duplicates_and_unspecified() {
        let set: CapabilitySet =
            serde_json::from_str(r#"["ACTUAL_COSTS", "ACTUAL_COSTS", "UNSPECIFIED", "DRY_RUN"]"#)
                .unwrap();
        assert_eq!(
            set.to_vec(),
            vec![PluginCapability::ActualCosts, PluginCapability::DryRun]
        );
    }

    #[test]
    fn to_vec_returns_independent_copy() {
        let set = CapabilitySet::from_capabilities([PluginCapability::ActualCosts]);
        let mut copy = set.to_vec();
        copy.push(PluginCapability::Budgets);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn legacy_flags_skip_unmapped() {
        let set = CapabilitySet::from_capabilities([
            PluginCapability::DryRun,
            PluginCapability::PricingSpec,
        ]);
        let flags = set.to_legacy_flags();
        assert_eq!(flags.len(), 1);
        assert_eq!(flags.get("supports_pricing_spec"), Some(&true));
    }
}
