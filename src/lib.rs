//! # Metal Composition
//!
//! Class composition for dynamic object graphs.
//!
//! This crate provides a small object model built from explicit descriptors:
//! - **Classes**: Descriptors with an instance table, a static table and a constructor
//! - **Inheritance**: `extend` creates a child whose lookups fall back to the parent
//! - **Mixins**: Frozen property bags merged into instance or static tables
//! - **Super Calls**: Overriding methods receive the method they replace, explicitly
//! - **Events**: Per-receiver listeners on every instance and class
//! - **Utils**: `trigger_method` and `get_option` helpers on every instance
//! - **Deprecations**: Deduplicated warnings routed through `tracing`
//!
//! ## Design Principles
//!
//! 1. **Explicit Overrides**: Only methods declared overriding are bound to a super method
//! 2. **No Hidden State**: The super context lives for one call and is passed as an argument
//! 3. **Parents Are Immutable**: Creating a subclass never writes to its parent
//! 4. **Tagged Capabilities**: `is_class` and `is_mixin` inspect the value's variant
//!
//! ## Example
//!
//! ```
//! use metal_composition::{is_class, Class, Props, Value};
//!
//! let base = Class::root()
//!     .extend(&Props::new().method("greet", |_, _| Ok(Value::from("base"))))
//!     .unwrap();
//! let child = base
//!     .extend(&Props::new().overriding("greet", |_, sup, _| {
//!         let parent = sup.call(&[])?;
//!         Ok(Value::from(format!("child+{}", parent.as_str().unwrap_or(""))))
//!     }))
//!     .unwrap();
//!
//! let instance = child.instantiate(&[]).unwrap();
//! assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("child+base"));
//! assert!(is_class(&Value::from(instance)));
//! ```

#![warn(missing_docs)]

mod class;
mod config;
mod deprecate;
mod errors;
mod events;
mod identifiers;
mod instance;
mod metal;
mod method;
mod mixin;
mod utils;
mod value;

// Re-export core types
pub use class::{
    create_class, include_into, is_class, is_mixin, mixin_into, Class, ANONYMOUS_CLASS,
    CID_PREFIX_KEY, CONSTRUCTOR_KEY, DISPLAY_NAME_KEY,
};
pub use config::{DeprecationConfig, MetalConfig, DEFAULT_DOCS_BASE_URL};
pub use deprecate::{Deprecation, DeprecationRecord, Deprecator, TracingSink, WarningSink};
pub use errors::{ErrorInfo, MetalError, MetalResult, DEFAULT_ERROR_NAME, ERROR_PROPS};
pub use events::{events_mixin, EventRegistry, ALL_EVENTS};
pub use identifiers::{ClassId, InstanceId};
pub use instance::Instance;
pub use metal::Metal;
pub use method::{merge_entry, wrap, Method, OverridingFn, PlainFn, SuperCall};
pub use mixin::{Mixin, PropertyTable, Props};
pub use utils::{handler_name, utils_mixin};
pub use value::Value;
