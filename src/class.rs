//! Class descriptors and the composition engine
//!
//! Classes form an explicit tree. Each descriptor owns its instance table,
//! its static table and its constructor, and points at its parent. Instance
//! lookups fall back through the parent chain; static tables are copied from
//! the parent when a class is created.
//!
//! ```mermaid
//! graph TD
//!     Root[Class root] -->|extend| A[Class A]
//!     A -->|extend| B[Class B]
//!     M[Mixin] -.->|mixin / include| B
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

use crate::errors::{MetalError, MetalResult};
use crate::events::{events_mixin, EventRegistry};
use crate::identifiers::ClassId;
use crate::instance::Instance;
use crate::method::{merge_entry, wrap, Method};
use crate::mixin::{PropertyTable, Props};
use crate::utils::utils_mixin;
use crate::value::Value;

/// Key of the explicit constructor in an instance property table
pub const CONSTRUCTOR_KEY: &str = "constructor";

/// Key of the class display name in an instance property table
pub const DISPLAY_NAME_KEY: &str = "display_name";

/// Key of the instance id prefix
pub const CID_PREFIX_KEY: &str = "cid_prefix";

/// Name reported for classes created without a display name
pub const ANONYMOUS_CLASS: &str = "anonymous";

const ROOT_NAME: &str = "Metal.Class";
const DEFAULT_CID_PREFIX: &str = "metal";

thread_local! {
    static ROOT: Class = build_root();
}

struct ClassInner {
    id: ClassId,
    name: Option<String>,
    parent: Option<Class>,
    super_prototype: Option<PropertyTable>,
    prototype: PropertyTable,
    statics: PropertyTable,
    constructor: Method,
    events: RefCell<EventRegistry>,
}

/// A constructible class descriptor
///
/// Cloning a `Class` clones the handle; equality is identity.
///
/// # Example
///
/// ```
/// use metal_composition::{Class, Props, Value};
///
/// let base = Class::root()
///     .extend(&Props::new().method("greet", |_, _| Ok(Value::from("base"))))
///     .unwrap();
/// let child = base
///     .extend(&Props::new().overriding("greet", |_, sup, _| {
///         let inner = sup.call(&[])?;
///         Ok(Value::from(format!("child+{}", inner.as_str().unwrap_or(""))))
///     }))
///     .unwrap();
///
/// let instance = child.instantiate(&[]).unwrap();
/// assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("child+base"));
/// ```
#[derive(Clone)]
pub struct Class {
    inner: Rc<ClassInner>,
}

impl Class {
    /// The root class every other class descends from
    ///
    /// There is one root per thread.
    pub fn root() -> Class {
        ROOT.with(Class::clone)
    }

    /// Unique identifier of this descriptor
    pub fn id(&self) -> ClassId {
        self.inner.id
    }

    /// Display name, or `"anonymous"`
    pub fn name(&self) -> &str {
        self.inner.name.as_deref().unwrap_or(ANONYMOUS_CLASS)
    }

    /// Display name, if one was given
    pub fn display_name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// True for the root class
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// The parent class; metadata only, dispatch does not use it
    pub fn superclass(&self) -> Option<Class> {
        self.inner.parent.clone()
    }

    /// Handle to the parent's instance table; metadata only
    pub fn super_prototype(&self) -> Option<PropertyTable> {
        self.inner.super_prototype.clone()
    }

    /// Handle to this class's own instance table
    pub fn prototype(&self) -> PropertyTable {
        self.inner.prototype.clone()
    }

    /// Handle to this class's static table
    pub fn statics(&self) -> PropertyTable {
        self.inner.statics.clone()
    }

    /// The constructor run by [`Class::instantiate`]
    pub fn constructor(&self) -> &Method {
        &self.inner.constructor
    }

    /// Resolve an instance property through the class chain
    pub fn resolve(&self, name: &str) -> Option<Value> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(value) = class.inner.prototype.get(name) {
                return Some(value);
            }
            current = class.inner.parent.as_ref();
        }
        None
    }

    /// Check for an entry in this class's own instance table
    pub fn has_own(&self, name: &str) -> bool {
        self.inner.prototype.contains(name)
    }

    /// Look up a static property
    pub fn get_static(&self, name: &str) -> Option<Value> {
        self.inner.statics.get(name)
    }

    /// Call a static method with the class as receiver
    pub fn call_static(&self, name: &str, args: &[Value]) -> MetalResult<Value> {
        Value::Class(self.clone()).call(name, args)
    }

    /// This class followed by its ancestors up to the root
    pub fn ancestors(&self) -> Vec<Class> {
        let mut chain = vec![self.clone()];
        let mut current = self.inner.parent.clone();
        while let Some(class) = current {
            current = class.inner.parent.clone();
            chain.push(class);
        }
        chain
    }

    /// True if `other` is this class or one of its ancestors
    pub fn inherits_from(&self, other: &Class) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class == other {
                return true;
            }
            current = class.inner.parent.as_ref();
        }
        false
    }

    /// True if `other` is a strict ancestor of this class
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self != other && self.inherits_from(other)
    }

    /// Construct an instance, running the constructor with `args`
    pub fn instantiate(&self, args: &[Value]) -> MetalResult<Instance> {
        let prefix = self
            .resolve(CID_PREFIX_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CID_PREFIX.to_string());
        let instance = Instance::allocate(self.clone(), &prefix);
        self.inner
            .constructor
            .invoke(&Value::Instance(instance.clone()), args)?;
        Ok(instance)
    }

    /// Create a subclass with instance properties
    pub fn extend(&self, instance_props: &Props) -> MetalResult<Class> {
        create_class(self, Some(instance_props), None)
    }

    /// Create a subclass with instance and static properties
    pub fn extend_with(&self, instance_props: &Props, static_props: &Props) -> MetalResult<Class> {
        create_class(self, Some(instance_props), Some(static_props))
    }

    /// Create a subclass that adds nothing
    pub fn subclass(&self) -> MetalResult<Class> {
        create_class(self, None, None)
    }

    /// Merge properties into the instance table; see [`mixin_into`]
    pub fn mixin(&self, props: impl AsRef<Props>) -> MetalResult<Class> {
        mixin_into(self, props.as_ref())
    }

    /// Merge properties into the static table; see [`include_into`]
    pub fn include(&self, props: impl AsRef<Props>) -> MetalResult<Class> {
        include_into(self, props.as_ref())
    }

    pub(crate) fn events(&self) -> &RefCell<EventRegistry> {
        &self.inner.events
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .field("parent", &self.inner.parent.as_ref().map(Class::name))
            .field("prototype", &self.inner.prototype)
            .field("statics", &self.inner.statics)
            .finish()
    }
}

/// Create a new class descending from `parent`
///
/// The parent is never modified. The child's static table starts as a copy
/// of the parent's; its instance table starts empty and falls back to the
/// parent's. Overriding methods in either table are bound to what they
/// replace at this moment.
///
/// # Errors
///
/// `InvalidArgument` when the `constructor` entry is not a method or a
/// property name is empty.
pub fn create_class(
    parent: &Class,
    instance_props: Option<&Props>,
    static_props: Option<&Props>,
) -> MetalResult<Class> {
    let name = instance_props
        .and_then(|props| props.get(DISPLAY_NAME_KEY))
        .and_then(Value::as_str)
        .map(str::to_string);

    let constructor = child_constructor(parent, instance_props, name.as_deref())?;

    let statics = PropertyTable::from_props(&parent.inner.statics.snapshot());
    if let Some(props) = static_props {
        let prefix = name.as_ref().map(|n| format!("{n}."));
        merge_props(&statics, props, prefix.as_deref(), |key| statics.get(key))?;
    }

    let prototype = PropertyTable::new();
    if let Some(props) = instance_props {
        let own: Props = props
            .iter()
            .filter(|(key, _)| key.as_str() != CONSTRUCTOR_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let prefix = name.as_ref().map(|n| format!("{n}.prototype."));
        merge_props(&prototype, &own, prefix.as_deref(), |key| {
            prototype.get(key).or_else(|| parent.resolve(key))
        })?;
    }

    let class = Class {
        inner: Rc::new(ClassInner {
            id: ClassId::new(),
            name,
            parent: Some(parent.clone()),
            super_prototype: Some(parent.inner.prototype.clone()),
            prototype,
            statics,
            constructor,
            events: RefCell::new(EventRegistry::new()),
        }),
    };

    debug!(
        class = class.name(),
        id = %class.id(),
        parent = parent.name(),
        instance_keys = class.inner.prototype.len(),
        static_keys = class.inner.statics.len(),
        "created class"
    );
    Ok(class)
}

/// Merge `props` into the instance table of `class`
///
/// Overriding methods are bound to whatever the class currently resolves
/// for the same name, so applying the same mixin twice binds the second
/// copy to the first and the super chain grows by one link.
///
/// Not transactional: if a property is rejected, the ones before it stay
/// applied.
///
/// # Errors
///
/// `InvalidArgument` for an empty property name or a `constructor` entry.
pub fn mixin_into(class: &Class, props: &Props) -> MetalResult<Class> {
    if let Some((key, _)) = props.iter().find(|(key, _)| key.as_str() == CONSTRUCTOR_KEY) {
        return Err(MetalError::invalid(format!(
            "{key} can only be set when the class is created"
        )));
    }
    let prototype = &class.inner.prototype;
    merge_props(prototype, props, None, |key| class.resolve(key))?;
    debug!(class = class.name(), keys = props.len(), "mixed into instance table");
    Ok(class.clone())
}

/// Merge `props` into the static table of `class`
///
/// Same wrapping rules as [`mixin_into`]; instance behaviour is untouched.
///
/// # Errors
///
/// `InvalidArgument` for an empty property name.
pub fn include_into(class: &Class, props: &Props) -> MetalResult<Class> {
    let statics = &class.inner.statics;
    merge_props(statics, props, None, |key| statics.get(key))?;
    debug!(class = class.name(), keys = props.len(), "included into static table");
    Ok(class.clone())
}

/// True for class descriptors and instances constructed from them
pub fn is_class(value: &Value) -> bool {
    matches!(value, Value::Class(_) | Value::Instance(_))
}

/// True only for mixins
pub fn is_mixin(value: &Value) -> bool {
    matches!(value, Value::Mixin(_))
}

fn merge_props<F>(
    table: &PropertyTable,
    props: &Props,
    name_prefix: Option<&str>,
    existing: F,
) -> MetalResult<()>
where
    F: Fn(&str) -> Option<Value>,
{
    for (key, value) in props.iter() {
        if key.is_empty() {
            return Err(MetalError::invalid("property names must not be empty"));
        }
        let candidate = match name_prefix {
            Some(prefix) => named(value, &format!("{prefix}{key}")),
            None => value.clone(),
        };
        let current = existing(key);
        let entry = merge_entry(key, &candidate, current.as_ref());
        table.insert(key.clone(), entry);
    }
    Ok(())
}

fn named(value: &Value, display_name: &str) -> Value {
    match value {
        Value::Method(method) if method.name().is_none() => {
            Value::Method(method.clone().with_name(display_name))
        }
        other => other.clone(),
    }
}

fn child_constructor(
    parent: &Class,
    instance_props: Option<&Props>,
    class_name: Option<&str>,
) -> MetalResult<Method> {
    let explicit = instance_props.and_then(|props| props.get(CONSTRUCTOR_KEY));
    let constructor = match explicit {
        None => {
            let parent_constructor = parent.inner.constructor.clone();
            Method::new(move |this, args| parent_constructor.invoke(this, args))
        }
        Some(Value::Method(method)) => {
            let method = match (class_name, method.name()) {
                (Some(name), None) => method.clone().with_name(name),
                _ => method.clone(),
            };
            if method.requests_super() {
                wrap(&method, &parent.inner.constructor)
            } else {
                method
            }
        }
        Some(other) => {
            return Err(MetalError::invalid(format!(
                "{CONSTRUCTOR_KEY} must be a method, got {}",
                other.type_name()
            )))
        }
    };
    Ok(match (class_name, constructor.name()) {
        (Some(name), None) => constructor.with_name(name),
        _ => constructor,
    })
}

fn build_root() -> Class {
    let constructor = Method::new(|this, args| {
        this.call("initialize", args)?;
        Ok(Value::Nil)
    })
    .with_name(ROOT_NAME);

    let prototype = PropertyTable::from_props(
        &Props::new()
            .with(CID_PREFIX_KEY, DEFAULT_CID_PREFIX)
            .with(
                "initialize",
                Method::new(|_, _| Ok(Value::Nil)).with_name("Metal.Class.prototype.initialize"),
            )
            .with(
                "destroy",
                Method::new(|this, _| this.call("stop_listening", &[]))
                    .with_name("Metal.Class.prototype.destroy"),
            ),
    );

    let root = Class {
        inner: Rc::new(ClassInner {
            id: ClassId::new(),
            name: Some(ROOT_NAME.to_string()),
            parent: None,
            super_prototype: None,
            prototype,
            statics: PropertyTable::from_props(events_mixin().props()),
            constructor,
            events: RefCell::new(EventRegistry::new()),
        }),
    };

    for mixin in [events_mixin(), utils_mixin()] {
        let prototype = &root.inner.prototype;
        for (key, value) in mixin.props().iter() {
            let entry = merge_entry(key, value, prototype.get(key).as_ref());
            prototype.insert(key.clone(), entry);
        }
    }
    root
}
