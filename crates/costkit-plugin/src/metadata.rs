use semver::{Version, VersionReq};
use tracing::warn;

use costkit_types::{GlobalCapabilityInfo, PluginError, PluginMetadata};

use crate::negotiate::CapabilityNegotiator;
use crate::plugin::CostSourcePlugin;

/// Spec version this host implements.
pub const SPEC_VERSION: &str = "1.0.0";
/// Semver range of plugin spec versions this host accepts.
pub const SUPPORTED_SPEC_VERSIONS: &str = "^1";

/// The generic message surfaced to callers for any metadata failure.
///
/// The exact validation failure is logged at the host boundary only; it
/// never crosses to the caller.
const METADATA_FAILURE: &str = "plugin metadata validation failed";

/// Query and validate a plugin's global capability metadata.
///
/// The capability set comes from the negotiator (computed once per
/// registration by callers that hold a harness), while identity fields and
/// legacy metadata come from the plugin's own report. Invalid or incomplete
/// metadata yields an internal error with a generic message.
pub fn global_capability_info(
    plugin: &dyn CostSourcePlugin,
    negotiator: &CapabilityNegotiator,
) -> Result<GlobalCapabilityInfo, PluginError> {
    let metadata = plugin.metadata().map_err(|err| {
        warn!(plugin = plugin.name(), error = %err, "plugin metadata query failed");
        PluginError::PluginFailure(METADATA_FAILURE.to_string())
    })?;

    validate_metadata(&metadata).map_err(|detail| {
        warn!(plugin = plugin.name(), detail, "plugin metadata rejected");
        PluginError::PluginFailure(METADATA_FAILURE.to_string())
    })?;

    let capabilities = negotiator.global_capabilities(plugin);
    let (mut legacy, warnings) = capabilities.to_legacy_map_with_warnings();
    for warning in &warnings {
        warn!(
            plugin = plugin.name(),
            capability = %warning.capability,
            "capability skipped in legacy projection"
        );
    }
    // Plugin-supplied legacy entries win over the derived projection; they
    // may carry keys the enum does not model.
    legacy.extend(metadata.legacy_metadata.clone());

    Ok(GlobalCapabilityInfo::new(
        metadata.name,
        metadata.version,
        metadata.spec_version,
        metadata.providers,
        capabilities,
        legacy,
    ))
}

fn validate_metadata(metadata: &PluginMetadata) -> Result<(), String> {
    if metadata.name.trim().is_empty() {
        return Err("metadata name is empty".to_string());
    }
    if metadata.version.trim().is_empty() {
        return Err("metadata version is empty".to_string());
    }
    if metadata.spec_version.trim().is_empty() {
        return Err("metadata spec_version is empty".to_string());
    }

    let spec_version = Version::parse(&metadata.spec_version)
        .map_err(|err| format!("spec_version {:?} is not valid semver: {err}", metadata.spec_version))?;

    // The requirement constant is host-controlled; a parse failure here is
    // a host defect, reported like any other validation failure.
    let supported = VersionReq::parse(SUPPORTED_SPEC_VERSIONS)
        .map_err(|err| format!("host supported range is invalid: {err}"))?;

    if !supported.matches(&spec_version) {
        return Err(format!(
            "spec_version {spec_version} is outside supported range {SUPPORTED_SPEC_VERSIONS}"
        ));
    }

    Ok(())
}
