use std::fmt;

/// Typed RPC error codes shared by hosts and plugins.
///
/// Codes follow the JSON-RPC convention: the `-326xx` range is standard,
/// the `-320xx` range is reserved for host-defined conditions.
pub mod error_code {
    /// The requested operation is not implemented by the plugin.
    pub const NOT_IMPLEMENTED: i32 = -32601;
    /// The request was malformed or failed validation.
    pub const INVALID_PARAMS: i32 = -32602;
    /// The plugin failed internally; detail is available server-side only.
    pub const INTERNAL: i32 = -32603;
    /// The plugin's declared spec version is not supported by the host.
    pub const UNSUPPORTED_SPEC_VERSION: i32 = -32001;
    /// The operation is not implemented for the targeted resource.
    pub const UNSUPPORTED_RESOURCE: i32 = -32004;
    /// The call did not complete within its deadline.
    pub const DEADLINE_EXCEEDED: i32 = -32005;
    /// The plugin is unavailable (crashed or unreachable).
    pub const PLUGIN_UNAVAILABLE: i32 = -32003;
}

/// Failures surfaced by plugin calls and capability queries.
///
/// Messages are what crosses the plugin/host boundary; they name the
/// operation that failed but never carry internal validation detail. The
/// detailed cause, where one exists, is logged at the host boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// The plugin does not implement this operation at all.
    NotImplemented { operation: String },
    /// Granular discovery excludes this operation for the given resource.
    UnsupportedResource {
        operation: String,
        provider: String,
        resource_type: String,
    },
    /// The request failed validation before dispatch.
    InvalidRequest(String),
    /// The plugin reported a failure; only a generic message is surfaced.
    PluginFailure(String),
    /// The call exceeded its deadline.
    Timeout { operation: String, timeout_ms: u64 },
    /// The plugin panicked or became unreachable mid-call.
    Unavailable(String),
}

impl PluginError {
    /// Convenience constructor for the not-implemented signal.
    pub fn not_implemented(operation: &str) -> Self {
        Self::NotImplemented {
            operation: operation.to_string(),
        }
    }

    /// Map this failure to its typed RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::NotImplemented { .. } => error_code::NOT_IMPLEMENTED,
            Self::UnsupportedResource { .. } => error_code::UNSUPPORTED_RESOURCE,
            Self::InvalidRequest(_) => error_code::INVALID_PARAMS,
            Self::PluginFailure(_) => error_code::INTERNAL,
            Self::Timeout { .. } => error_code::DEADLINE_EXCEEDED,
            Self::Unavailable(_) => error_code::PLUGIN_UNAVAILABLE,
        }
    }

    /// True when the plugin legitimately lacks the operation.
    ///
    /// Callers use this to degrade gracefully instead of failing a run.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }

    /// True when the failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotImplemented { operation } => {
                write!(f, "operation is not implemented: {operation}")
            }
            Self::UnsupportedResource {
                operation,
                provider,
                resource_type,
            } => write!(
                f,
                "operation {operation} is not implemented for resource {provider}/{resource_type}"
            ),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::PluginFailure(msg) => write!(f, "{msg}"),
            Self::Timeout {
                operation,
                timeout_ms,
            } => write!(
                f,
                "operation {operation} timed out after {timeout_ms}ms"
            ),
            Self::Unavailable(msg) => write!(f, "plugin unavailable: {msg}"),
        }
    }
}

impl std::error::Error for PluginError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_taxonomy() {
        assert_eq!(
            PluginError::not_implemented("GetBudgets").code(),
            error_code::NOT_IMPLEMENTED
        );
        assert_eq!(
            PluginError::InvalidRequest("empty provider".into()).code(),
            error_code::INVALID_PARAMS
        );
        assert_eq!(
            PluginError::Timeout {
                operation: "GetActualCost".into(),
                timeout_ms: 5000,
            }
            .code(),
            error_code::DEADLINE_EXCEEDED
        );
    }

    #[test]
    fn timeout_is_distinguishable_from_other_failures() {
        let timeout = PluginError::Timeout {
            operation: "EstimateCost".into(),
            timeout_ms: 100,
        };
        assert!(timeout.is_timeout());
        assert!(!timeout.is_not_implemented());
        assert!(!PluginError::PluginFailure("boom".into()).is_timeout());
    }

    #[test]
    fn unsupported_resource_names_operation_and_resource() {
        let err = PluginError::UnsupportedResource {
            operation: "HandleDryRun".into(),
            provider: "aws".into(),
            resource_type: "ec2".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("HandleDryRun"));
        assert!(msg.contains("aws/ec2"));
    }
}
