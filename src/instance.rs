// Copyright 2025 Cowboy AI, LLC.

//! Instances and method dispatch

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::errors::{MetalError, MetalResult};
use crate::events::EventRegistry;
use crate::identifiers::InstanceId;
use crate::value::Value;

struct InstanceInner {
    id: InstanceId,
    cid: String,
    class: Class,
    fields: RefCell<IndexMap<String, Value>>,
    events: RefCell<EventRegistry>,
}

/// An object constructed from a [`Class`]
///
/// Own fields shadow the class chain. Equality is identity.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    pub(crate) fn allocate(class: Class, cid_prefix: &str) -> Self {
        let id = InstanceId::new();
        Self {
            inner: Rc::new(InstanceInner {
                id,
                cid: id.with_prefix(cid_prefix),
                class,
                fields: RefCell::new(IndexMap::new()),
                events: RefCell::new(EventRegistry::new()),
            }),
        }
    }

    /// Correlation id generated at construction
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Client id, `<cid_prefix>-<id>`
    pub fn cid(&self) -> &str {
        &self.inner.cid
    }

    /// The class this instance was constructed from
    pub fn class(&self) -> &Class {
        &self.inner.class
    }

    /// True if the instance's class is `class` or descends from it
    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.inner.class.inherits_from(class)
    }

    /// Look up a property: own fields first, then the class chain
    pub fn get(&self, name: &str) -> Option<Value> {
        self.get_own(name).or_else(|| self.inner.class.resolve(name))
    }

    /// Look up an own field
    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.inner.fields.borrow().get(name).cloned()
    }

    /// Set an own field, returning the previous value
    pub fn set(&self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner
            .fields
            .borrow_mut()
            .insert(name.into(), value.into())
    }

    /// Names of own fields in insertion order
    pub fn field_names(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Dispatch a method with this instance as receiver
    pub fn call(&self, name: &str, args: &[Value]) -> MetalResult<Value> {
        Value::Instance(self.clone()).call(name, args)
    }

    pub(crate) fn events(&self) -> &RefCell<EventRegistry> {
        &self.inner.events
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("cid", &self.inner.cid)
            .field("class", &self.inner.class.name())
            .field("fields", &self.field_names())
            .finish()
    }
}

impl Value {
    /// Resolve a property on this value as a receiver
    ///
    /// Instances resolve fields then their class chain, classes resolve
    /// statics, mixins and maps resolve their own entries.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self {
            Value::Instance(instance) => instance.get(name),
            Value::Class(class) => class.get_static(name),
            Value::Mixin(mixin) => mixin.get(name).cloned(),
            Value::Map(map) => map.get(name).cloned(),
            _ => None,
        }
    }

    /// Dispatch `name` with this value as receiver
    ///
    /// # Errors
    ///
    /// `MethodNotFound` when nothing resolves, `NotCallable` when the entry is
    /// data; otherwise whatever the method returns.
    pub fn call(&self, name: &str, args: &[Value]) -> MetalResult<Value> {
        match self.lookup(name) {
            Some(Value::Method(method)) => method.invoke(self, args),
            Some(_) => Err(MetalError::NotCallable {
                name: name.to_string(),
            }),
            None => Err(MetalError::MethodNotFound {
                receiver: self.describe(),
                name: name.to_string(),
            }),
        }
    }
}
