//! Property tables and mixins
//!
//! [`Props`] is the plain, ordered property table handed to `extend`,
//! `mixin` and `include`. A [`Mixin`] freezes a `Props` so it can be shared
//! between classes. [`PropertyTable`] is the mutable storage behind a class's
//! instance and static tables.

use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::errors::MetalResult;
use crate::method::{Method, SuperCall};
use crate::value::Value;

/// An ordered table of named properties and methods
///
/// # Example
///
/// ```
/// use metal_composition::{Props, Value};
///
/// let props = Props::new()
///     .with("cid_prefix", "view")
///     .method("render", |_this, _args| Ok(Value::Nil));
/// assert_eq!(props.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: IndexMap<String, Value>,
}

impl Props {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Add a property, builder style
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a plain method, builder style
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> MetalResult<Value> + 'static,
    {
        self.with(name, Method::new(f))
    }

    /// Add an overriding method, builder style
    pub fn overriding<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &SuperCall<'_>, &[Value]) -> MetalResult<Value> + 'static,
    {
        self.with(name, Method::overriding(f))
    }

    /// Insert or replace a property
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Look up a property
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Check if a property exists
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Property names in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unwrap into the underlying map
    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.entries
    }
}

impl AsRef<Props> for Props {
    fn as_ref(&self) -> &Props {
        self
    }
}

impl From<IndexMap<String, Value>> for Props {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A reusable, non-constructible bag of properties
///
/// Mixins are frozen at construction and shared by every class that mixes
/// them in; merging copies entries out, it never writes back.
///
/// # Example
///
/// ```
/// use metal_composition::{is_mixin, Mixin, Props, Value};
///
/// let alerts = Mixin::new(Props::new().with("level", "warn"));
/// assert!(is_mixin(&Value::from(alerts.clone())));
/// assert_eq!(alerts.get("level"), Some(&Value::from("warn")));
/// ```
#[derive(Clone)]
pub struct Mixin {
    props: Rc<Props>,
}

impl Mixin {
    /// Freeze a property table into a mixin
    pub fn new(props: Props) -> Self {
        Self {
            props: Rc::new(props),
        }
    }

    /// The frozen properties
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Look up a property
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.props.get(name)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Mixin) -> bool {
        Rc::ptr_eq(&self.props, &other.props)
    }
}

impl AsRef<Props> for Mixin {
    fn as_ref(&self) -> &Props {
        &self.props
    }
}

impl From<Props> for Mixin {
    fn from(props: Props) -> Self {
        Mixin::new(props)
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.props.keys().map(String::as_str).collect();
        f.debug_struct("Mixin").field("keys", &keys).finish()
    }
}

/// Shared, mutable storage for one of a class's tables
///
/// Handles are cheap to clone and compare by identity.
#[derive(Clone, Default)]
pub struct PropertyTable {
    entries: Rc<RefCell<IndexMap<String, Value>>>,
}

impl PropertyTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding a copy of `props`
    pub fn from_props(props: &Props) -> Self {
        let table = Self::new();
        for (name, value) in props.iter() {
            table.insert(name.clone(), value.clone());
        }
        table
    }

    /// Look up an own entry
    pub fn get(&self, name: &str) -> Option<Value> {
        self.entries.borrow().get(name).cloned()
    }

    /// Insert or replace an entry
    pub fn insert(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.borrow_mut().insert(name.into(), value)
    }

    /// Check for an own entry
    pub fn contains(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Own entry names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Number of own entries
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Copy the current entries out
    pub fn snapshot(&self) -> Props {
        Props::from(self.entries.borrow().clone())
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &PropertyTable) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for PropertyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyTable")
            .field("keys", &self.keys())
            .finish()
    }
}
