//! The `Metal` facade

use tracing::debug;

use crate::class::Class;
use crate::config::MetalConfig;
use crate::deprecate::{Deprecation, DeprecationRecord, Deprecator, WarningSink};
use crate::errors::{ErrorInfo, MetalError, MetalResult};
use crate::events::events_mixin;
use crate::mixin::{Mixin, Props};
use crate::utils::utils_mixin;
use crate::value::Value;

/// Entry point bundling the root class, the built-in mixins, deprecation
/// warnings and configuration
///
/// # Example
///
/// ```
/// use metal_composition::{Metal, Props, Value};
///
/// let metal = Metal::new();
/// let view = metal
///     .class()
///     .extend(&Props::new().method("render", |_, _| Ok(Value::from("<div>"))))
///     .unwrap();
/// let instance = view.instantiate(&[]).unwrap();
/// assert_eq!(instance.call("render", &[]).unwrap(), Value::from("<div>"));
/// ```
#[derive(Debug)]
pub struct Metal {
    config: MetalConfig,
    deprecator: Deprecator,
}

impl Metal {
    /// Create a facade with the default configuration
    pub fn new() -> Self {
        Self::with_config(MetalConfig::default())
    }

    /// Create a facade with the given configuration
    pub fn with_config(config: MetalConfig) -> Self {
        debug!(docs_base_url = %config.docs_base_url, "configured metal");
        let deprecator = Deprecator::new(config.deprecation);
        Self { config, deprecator }
    }

    /// Create a facade whose deprecation warnings go to `sink`
    pub fn with_sink(config: MetalConfig, sink: Box<dyn WarningSink>) -> Self {
        let deprecator = Deprecator::with_sink(config.deprecation, sink);
        Self { config, deprecator }
    }

    /// The active configuration
    pub fn config(&self) -> &MetalConfig {
        &self.config
    }

    /// The root class
    pub fn class(&self) -> Class {
        Class::root()
    }

    /// The `Events` mixin
    pub fn events(&self) -> Mixin {
        events_mixin()
    }

    /// The `Utils` mixin
    pub fn utils(&self) -> Mixin {
        utils_mixin()
    }

    /// Freeze `props` into a mixin
    pub fn mixin(&self, props: Props) -> Mixin {
        Mixin::new(props)
    }

    /// Warn about a deprecation; see [`Deprecator::deprecate`]
    pub fn deprecate(&mut self, deprecation: impl Into<Deprecation>, test: Option<bool>) -> bool {
        self.deprecator.deprecate(deprecation, test)
    }

    /// Warnings emitted so far
    pub fn deprecations(&self) -> Vec<DeprecationRecord> {
        self.deprecator.history().cloned().collect()
    }

    /// Forget emitted warnings
    pub fn reset_deprecations(&mut self) {
        self.deprecator.reset();
    }

    /// A raisable error with the default name
    pub fn error(&self, message: impl Into<String>) -> MetalError {
        MetalError::Raised(ErrorInfo::new(message))
    }

    /// A raisable error built from a message and an options map
    ///
    /// Relative urls are resolved against the configured docs base url.
    pub fn error_with(&self, message: impl Into<String>, options: &Value) -> MetalResult<MetalError> {
        let info = ErrorInfo::with_options(message, options)?.resolve_url(&self.config.docs_base_url);
        Ok(MetalError::Raised(info))
    }
}

impl Default for Metal {
    fn default() -> Self {
        Self::new()
    }
}
