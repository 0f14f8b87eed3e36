use serde::{Deserialize, Serialize};

use crate::diagnostics::InvokeError;

/// Linker behavior switches.
///
/// ```
/// use invoke::linkage::LinkerConfig;
///
/// let config = LinkerConfig::from_json_str(r#"{ "allow_handle_results": true }"#).unwrap();
/// assert!(config.allow_handle_results);
/// assert!(!config.trace_linkage);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Accept a bare handle from a bootstrap method and wrap it in a
    /// constant call site.
    pub allow_handle_results: bool,
    /// Log link events at `info` instead of `debug`.
    pub trace_linkage: bool,
}

impl LinkerConfig {
    pub fn with_handle_results(mut self, allow: bool) -> Self {
        self.allow_handle_results = allow;
        self
    }

    pub fn with_trace_linkage(mut self, trace: bool) -> Self {
        self.trace_linkage = trace;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, InvokeError> {
        serde_json::from_str(json)
            .map_err(|e| InvokeError::illegal(format!("invalid linker config: {}", e)))
    }

    pub fn to_json_string(&self) -> Result<String, InvokeError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InvokeError::illegal(format!("cannot encode linker config: {}", e)))
    }
}
