// Copyright 2025 Cowboy AI, LLC.

//! Methods and explicit super dispatch
//!
//! A method is declared either *plain* or *overriding*. Only overriding
//! methods receive a [`SuperCall`] and only they are wrapped when merged over
//! an existing callable. The overridden method is captured when the wrap
//! happens and handed to the body on every invocation, so there is no
//! per-receiver super slot to save and restore.

use std::fmt;
use std::rc::Rc;
use tracing::trace;

use crate::errors::{MetalError, MetalResult};
use crate::value::Value;

/// Signature of a plain method body
pub type PlainFn = dyn Fn(&Value, &[Value]) -> MetalResult<Value>;

/// Signature of an overriding method body
pub type OverridingFn = dyn Fn(&Value, &SuperCall<'_>, &[Value]) -> MetalResult<Value>;

const ANONYMOUS: &str = "anonymous";

#[derive(Clone)]
enum Body {
    Plain(Rc<PlainFn>),
    Overriding(Rc<OverridingFn>),
    Wrapped {
        body: Rc<OverridingFn>,
        overridden: Rc<Method>,
    },
}

/// A callable entry in a method table
///
/// # Example
///
/// ```
/// use metal_composition::{Method, Value};
///
/// let greet = Method::new(|_this, _args| Ok(Value::from("hello")));
/// assert_eq!(greet.invoke(&Value::Nil, &[]).unwrap(), Value::from("hello"));
/// ```
#[derive(Clone)]
pub struct Method {
    name: Option<Rc<str>>,
    body: Body,
}

impl Method {
    /// Create a plain method; it can never reach an overridden method
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> MetalResult<Value> + 'static,
    {
        Self {
            name: None,
            body: Body::Plain(Rc::new(f)),
        }
    }

    /// Create an overriding method that receives the super-call context
    pub fn overriding<F>(f: F) -> Self
    where
        F: Fn(&Value, &SuperCall<'_>, &[Value]) -> MetalResult<Value> + 'static,
    {
        Self {
            name: None,
            body: Body::Overriding(Rc::new(f)),
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(Rc::from(name.as_ref()));
        self
    }

    /// The display name, if one was assigned
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The display name or `"anonymous"`
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(ANONYMOUS)
    }

    /// True for an overriding method that has not been wrapped yet
    pub fn requests_super(&self) -> bool {
        matches!(self.body, Body::Overriding(_))
    }

    /// True once the method has been bound to an overridden method
    pub fn is_wrapped(&self) -> bool {
        matches!(self.body, Body::Wrapped { .. })
    }

    /// The method this one overrides, if bound
    pub fn overridden(&self) -> Option<&Method> {
        match &self.body {
            Body::Wrapped { overridden, .. } => Some(overridden),
            _ => None,
        }
    }

    /// Number of wrapped links reachable through the super chain
    pub fn super_depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.overridden();
        while let Some(method) = current {
            depth += 1;
            current = method.overridden();
        }
        depth
    }

    /// Identity comparison of the method bodies
    pub fn ptr_eq(&self, other: &Method) -> bool {
        match (&self.body, &other.body) {
            (Body::Plain(a), Body::Plain(b)) => Rc::ptr_eq(a, b),
            (Body::Overriding(a), Body::Overriding(b)) => Rc::ptr_eq(a, b),
            (
                Body::Wrapped {
                    body: a,
                    overridden: oa,
                },
                Body::Wrapped {
                    body: b,
                    overridden: ob,
                },
            ) => Rc::ptr_eq(a, b) && Rc::ptr_eq(oa, ob),
            _ => false,
        }
    }

    /// Invoke the method with `this` as receiver
    pub fn invoke(&self, this: &Value, args: &[Value]) -> MetalResult<Value> {
        match &self.body {
            Body::Plain(f) => f(this, args),
            Body::Overriding(f) => f(this, &SuperCall::unbound(this, self.display_name()), args),
            Body::Wrapped { body, overridden } => invoke_bound(body, this, overridden, self, args),
        }
    }
}

fn invoke_bound(
    body: &Rc<OverridingFn>,
    this: &Value,
    overridden: &Method,
    caller: &Method,
    args: &[Value],
) -> MetalResult<Value> {
    let sup = SuperCall {
        this,
        overridden: Some(overridden),
        caller: caller.display_name(),
    };
    body(this, &sup, args)
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.body {
            Body::Plain(_) => "plain",
            Body::Overriding(_) => "overriding",
            Body::Wrapped { .. } => "wrapped",
        };
        f.debug_struct("Method")
            .field("name", &self.display_name())
            .field("kind", &kind)
            .field("super_depth", &self.super_depth())
            .finish()
    }
}

/// The super-call context handed to an overriding method
///
/// Lives for exactly one invocation. Calling it dispatches the overridden
/// method on the same receiver.
pub struct SuperCall<'a> {
    this: &'a Value,
    overridden: Option<&'a Method>,
    caller: &'a str,
}

impl<'a> SuperCall<'a> {
    fn unbound(this: &'a Value, caller: &'a str) -> Self {
        Self {
            this,
            overridden: None,
            caller,
        }
    }

    /// Invoke the overridden method with the given arguments
    ///
    /// # Errors
    ///
    /// Returns `SuperCallMisuse` when nothing was overridden.
    pub fn call(&self, args: &[Value]) -> MetalResult<Value> {
        match self.overridden {
            Some(method) => method.invoke(self.this, args),
            None => Err(MetalError::SuperCallMisuse {
                method: self.caller.to_string(),
            }),
        }
    }

    /// Whether an overridden method is available
    pub fn is_bound(&self) -> bool {
        self.overridden.is_some()
    }

    /// The overridden method
    pub fn method(&self) -> Option<&'a Method> {
        self.overridden
    }

    /// The receiver of the current invocation
    pub fn this(&self) -> &'a Value {
        self.this
    }
}

/// Bind `method` to `overridden`
///
/// Only overriding methods can be wrapped; anything else is returned
/// unchanged.
pub fn wrap(method: &Method, overridden: &Method) -> Method {
    match &method.body {
        Body::Overriding(body) => Method {
            name: method
                .name
                .as_ref()
                .map(|n| Rc::from(format!("superWrapper({n})").as_str())),
            body: Body::Wrapped {
                body: Rc::clone(body),
                overridden: Rc::new(overridden.clone()),
            },
        },
        _ => method.clone(),
    }
}

/// Decide what to install when `candidate` replaces `existing`
///
/// The candidate is wrapped only when it is an overriding method and the
/// existing entry is callable; otherwise it is installed as-is.
pub fn merge_entry(name: &str, candidate: &Value, existing: Option<&Value>) -> Value {
    match (candidate, existing) {
        (Value::Method(method), Some(Value::Method(previous))) if method.requests_super() => {
            trace!(
                method = name,
                overridden = previous.display_name(),
                "wrapping overriding method"
            );
            Value::Method(wrap(method, previous))
        }
        _ => {
            trace!(method = name, kind = candidate.type_name(), "installing entry as-is");
            candidate.clone()
        }
    }
}
