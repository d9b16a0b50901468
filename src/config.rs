//! Runtime configuration

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::errors::MetalResult;

/// Base URL for relative documentation links in raised errors
pub const DEFAULT_DOCS_BASE_URL: &str = "http://github.com/thejameskyle/backbone-metal";

/// Configuration for a [`crate::Metal`] facade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MetalConfig {
    /// Prefix for error urls starting with `#` or `/`
    pub docs_base_url: String,

    /// Deprecation warning behaviour
    pub deprecation: DeprecationConfig,
}

impl Default for MetalConfig {
    fn default() -> Self {
        Self {
            docs_base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            deprecation: DeprecationConfig::default(),
        }
    }
}

impl MetalConfig {
    /// Parse a configuration document; missing fields take their defaults
    pub fn from_json(json: &str) -> MetalResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> MetalResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// JSON schema of the configuration document
    pub fn json_schema() -> MetalResult<serde_json::Value> {
        Ok(serde_json::to_value(schema_for!(MetalConfig))?)
    }
}

/// Configuration for deprecation warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeprecationConfig {
    /// Emit warnings at all
    pub enabled: bool,

    /// Emit each distinct message only once
    pub deduplicate: bool,
}

impl Default for DeprecationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            deduplicate: true,
        }
    }
}
