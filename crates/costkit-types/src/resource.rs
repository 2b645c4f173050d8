use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capability::CapabilitySet;
use crate::error::PluginError;
use crate::request::{RecommendationCategory, RecommendationPriority};

/// Maximum number of entries accepted in a target-resource list.
///
/// Longer lists are rejected before any plugin dispatch.
pub const MAX_TARGET_RESOURCES: usize = 50;

/// Identifies a billable resource for matching and granular discovery.
///
/// `provider` and `resource_type` are required and always compared exactly.
/// `sku`, `region`, and `tags` are optional and participate in matching only
/// when the target side specifies them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub provider: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    /// Build a descriptor from the two required fields.
    pub fn new(provider: &str, resource_type: &str) -> Self {
        Self {
            provider: provider.to_string(),
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_sku(mut self, sku: &str) -> Self {
        self.sku = Some(sku.to_string());
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    /// Reject descriptors whose required fields are missing.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.provider.trim().is_empty() {
            return Err(PluginError::InvalidRequest(
                "resource descriptor provider must not be empty".to_string(),
            ));
        }
        if self.resource_type.trim().is_empty() {
            return Err(PluginError::InvalidRequest(
                "resource descriptor resource_type must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return true when `candidate` satisfies this descriptor as a target.
    ///
    /// Required fields compare exactly. Optional fields unset on the target
    /// mean "don't care". Every tag on the target must appear on the
    /// candidate with an equal value; extra candidate tags are ignored.
    pub fn matches(&self, candidate: &ResourceDescriptor) -> bool {
        if self.provider != candidate.provider || self.resource_type != candidate.resource_type {
            return false;
        }
        if let Some(sku) = &self.sku {
            if candidate.sku.as_ref() != Some(sku) {
                return false;
            }
        }
        if let Some(region) = &self.region {
            if candidate.region.as_ref() != Some(region) {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|(key, value)| candidate.tags.get(key) == Some(value))
    }
}

/// Validate a target-resource list before dispatch.
pub fn validate_target_resources(targets: &[ResourceDescriptor]) -> Result<(), PluginError> {
    if targets.len() > MAX_TARGET_RESOURCES {
        return Err(PluginError::InvalidRequest(format!(
            "target resource list has {} entries, maximum is {}",
            targets.len(),
            MAX_TARGET_RESOURCES
        )));
    }
    for target in targets {
        target.validate()?;
    }
    Ok(())
}

/// Criteria for scoping recommendation queries.
///
/// Matching is an AND: a candidate must satisfy the category and priority
/// filters, and must match at least one target resource when any are
/// listed. An empty target list means no resource scoping, which preserves
/// the behavior of callers predating resource scoping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecommendationCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<RecommendationPriority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_resources: Vec<ResourceDescriptor>,
}

impl RecommendationFilter {
    /// Reject filters whose target list fails validation.
    pub fn validate(&self) -> Result<(), PluginError> {
        validate_target_resources(&self.target_resources)
    }

    /// Return true when a recommendation for `resource` with the given
    /// category and priority passes this filter.
    pub fn matches(
        &self,
        resource: &ResourceDescriptor,
        category: RecommendationCategory,
        priority: RecommendationPriority,
    ) -> bool {
        if let Some(wanted) = self.category {
            if wanted != category {
                return false;
            }
        }
        if let Some(wanted) = self.priority {
            if wanted != priority {
                return false;
            }
        }
        if self.target_resources.is_empty() {
            return true;
        }
        self.target_resources
            .iter()
            .any(|target| target.matches(resource))
    }
}

/// Per-resource support answer from granular capability discovery.
///
/// An empty `capabilities` set means "identical to the plugin's global
/// capability set", never "no capabilities". A non-empty set is the
/// complete supported subset for the resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularSupportResponse {
    pub supported: bool,
    pub reason: String,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

impl GranularSupportResponse {
    /// A supporting response that inherits the global capability set.
    pub fn inherit_global() -> Self {
        Self {
            supported: true,
            reason: String::new(),
            capabilities: CapabilitySet::new(),
        }
    }

    /// A supporting response with an explicit capability subset.
    pub fn with_capabilities(capabilities: CapabilitySet) -> Self {
        Self {
            supported: true,
            reason: String::new(),
            capabilities,
        }
    }

    /// An unsupporting response carrying the plugin's reason.
    pub fn unsupported(reason: &str) -> Self {
        Self {
            supported: false,
            reason: reason.to_string(),
            capabilities: CapabilitySet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::PluginCapability;

    fn ec2() -> ResourceDescriptor {
        ResourceDescriptor::new("aws", "ec2")
    }

    #[test]
    fn required_fields_must_match_exactly() {
        let target = ec2();
        assert!(target.matches(&ec2()));
        assert!(!target.matches(&ResourceDescriptor::new("gcp", "ec2")));
        assert!(!target.matches(&ResourceDescriptor::new("aws", "rds")));
    }

    #[test]
    fn unset_optional_fields_are_dont_care() {
        let target = ec2();
        let candidate = ec2().with_sku("t3.micro").with_region("us-east-1");
        assert!(target.matches(&candidate));
    }

    #[test]
    fn set_optional_fields_must_match() {
        let target = ec2().with_sku("t3.micro");
        assert!(target.matches(&ec2().with_sku("t3.micro")));
        assert!(!target.matches(&ec2().with_sku("m5.large")));
        assert!(!target.matches(&ec2()));
    }

    #[test]
    fn target_tags_are_subset_matched() {
        let target = ec2().with_tag("env", "prod");
        let candidate = ec2().with_tag("env", "prod").with_tag("team", "billing");
        assert!(target.matches(&candidate));
        assert!(!target.matches(&ec2().with_tag("env", "dev")));
        assert!(!target.matches(&ec2()));
    }

    #[test]
    fn empty_provider_fails_validation() {
        let descriptor = ResourceDescriptor::new("", "ec2");
        let err = descriptor.validate().unwrap_err();
        assert!(err.to_string().contains("provider"));
    }

    #[test]
    fn oversized_target_list_is_rejected() {
        let targets: Vec<ResourceDescriptor> =
            (0..=MAX_TARGET_RESOURCES).map(|_| ec2()).collect();
        let err = validate_target_resources(&targets).unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn filter_without_targets_applies_filter_alone() {
        let filter = RecommendationFilter {
            category: Some(RecommendationCategory::Cost),
            ..RecommendationFilter::default()
        };
        assert!(filter.matches(
            &ec2(),
            RecommendationCategory::Cost,
            RecommendationPriority::Low,
        ));
        assert!(!filter.matches(
            &ec2(),
            RecommendationCategory::Performance,
            RecommendationPriority::Low,
        ));
    }

    #[test]
    fn filter_with_targets_requires_both() {
        let filter = RecommendationFilter {
            category: Some(RecommendationCategory::Cost),
            priority: None,
            target_resources: vec![ec2().with_sku("t3.micro")],
        };

        // Matches: right sku and right category.
        assert!(filter.matches(
            &ec2().with_sku("t3.micro"),
            RecommendationCategory::Cost,
            RecommendationPriority::High,
        ));
        // Wrong sku.
        assert!(!filter.matches(
            &ec2().with_sku("m5.large"),
            RecommendationCategory::Cost,
            RecommendationPriority::High,
        ));
        // Right sku, wrong category.
        assert!(!filter.matches(
            &ec2().with_sku("t3.micro"),
            RecommendationCategory::Security,
            RecommendationPriority::High,
        ));
    }

    #[test]
    fn granular_inherit_is_empty_and_supported() {
        let response = GranularSupportResponse::inherit_global();
        assert!(response.supported);
        assert!(response.capabilities.is_empty());
    }

    #[test]
    fn granular_with_capabilities_is_authoritative_payload() {
        let response = GranularSupportResponse::with_capabilities(
            CapabilitySet::from_capabilities([PluginCapability::DryRun]),
        );
        assert!(response.supported);
        assert_eq!(response.capabilities.len(), 1);
    }
}
