//! Publish/subscribe for instances and classes
//!
//! Every instance and every class owns an [`EventRegistry`]. The `Events`
//! mixin exposes it as the `on`, `once`, `off`, `trigger` and
//! `listener_count` methods and is mixed into the root class.
//!
//! `listen_to` subscribes the receiver to another emitter and remembers the
//! subscription on the receiver's own registry, so `stop_listening` can undo
//! exactly what the receiver registered and nothing else.

use indexmap::IndexMap;
use std::cell::RefCell;

use crate::errors::{MetalError, MetalResult};
use crate::method::Method;
use crate::mixin::{Mixin, Props};
use crate::value::Value;

/// Event name whose listeners receive every event
pub const ALL_EVENTS: &str = "all";

thread_local! {
    static EVENTS: Mixin = build_events_mixin();
}

#[derive(Clone)]
struct Listener {
    callback: Method,
    once: bool,
}

/// A subscription made through `listen_to`
#[derive(Clone)]
struct Subscription {
    target: Value,
    event: String,
    /// Callback as given by the caller
    callback: Method,
    /// Callback as registered on the target
    bound: Method,
}

impl Subscription {
    fn matches(&self, target: Option<&Value>, event: Option<&str>, callback: Option<&Method>) -> bool {
        target.map_or(true, |t| *t == self.target)
            && event.map_or(true, |e| e == self.event)
            && callback.map_or(true, |c| c.ptr_eq(&self.callback))
    }
}

/// Listeners registered on one receiver, keyed by event name, plus the
/// subscriptions the receiver made on other emitters
#[derive(Default)]
pub struct EventRegistry {
    listeners: IndexMap<String, Vec<Listener>>,
    listening: Vec<Subscription>,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn on(&mut self, event: &str, callback: Method, once: bool) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(Listener { callback, once });
    }

    /// Remove listeners matching the event and callback; `None` matches all
    ///
    /// Returns the number of listeners removed.
    pub fn off(&mut self, event: Option<&str>, callback: Option<&Method>) -> usize {
        let mut removed = 0;
        for (name, listeners) in self.listeners.iter_mut() {
            if event.is_some_and(|e| e != name) {
                continue;
            }
            let before = listeners.len();
            listeners.retain(|l| callback.is_some_and(|c| !l.callback.ptr_eq(c)));
            removed += before - listeners.len();
        }
        self.listeners.retain(|_, listeners| !listeners.is_empty());
        removed
    }

    /// Callbacks to run for `event`, in registration order
    ///
    /// `once` listeners are dropped from the registry here, before they run.
    pub fn take_for_dispatch(&mut self, event: &str) -> Vec<Method> {
        let Some(listeners) = self.listeners.get_mut(event) else {
            return Vec::new();
        };
        let callbacks = listeners.iter().map(|l| l.callback.clone()).collect();
        listeners.retain(|l| !l.once);
        if listeners.is_empty() {
            self.listeners.shift_remove(event);
        }
        callbacks
    }

    /// Number of listeners for `event`, or for all events
    pub fn count(&self, event: Option<&str>) -> usize {
        match event {
            Some(name) => self.listeners.get(name).map_or(0, Vec::len),
            None => self.listeners.values().map(Vec::len).sum(),
        }
    }

    /// Number of subscriptions this receiver holds on other emitters
    pub fn listening_count(&self) -> usize {
        self.listening.len()
    }

    fn track(&mut self, subscription: Subscription) {
        self.listening.push(subscription);
    }

    fn untrack(
        &mut self,
        target: Option<&Value>,
        event: Option<&str>,
        callback: Option<&Method>,
    ) -> Vec<Subscription> {
        let (matched, kept) = self
            .listening
            .drain(..)
            .partition(|sub| sub.matches(target, event, callback));
        self.listening = kept;
        matched
    }
}

/// The `Events` mixin
pub fn events_mixin() -> Mixin {
    EVENTS.with(Mixin::clone)
}

fn registry_of(this: &Value) -> MetalResult<&RefCell<EventRegistry>> {
    match this {
        Value::Instance(instance) => Ok(instance.events()),
        Value::Class(class) => Ok(class.events()),
        other => Err(MetalError::invalid(format!(
            "events need an instance or class receiver, got {}",
            other.type_name()
        ))),
    }
}

fn event_names(args: &[Value]) -> MetalResult<Vec<String>> {
    event_names_at(args, 0)
}

fn event_names_at(args: &[Value], index: usize) -> MetalResult<Vec<String>> {
    let names = args
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| MetalError::invalid("event name must be a string"))?;
    let names: Vec<String> = names.split_whitespace().map(str::to_string).collect();
    if names.is_empty() {
        return Err(MetalError::invalid("event name must not be empty"));
    }
    Ok(names)
}

fn callback_arg(args: &[Value]) -> MetalResult<Method> {
    callback_at(args, 1)
}

fn callback_at(args: &[Value], index: usize) -> MetalResult<Method> {
    match args.get(index) {
        Some(Value::Method(method)) => Ok(method.clone()),
        Some(other) => Err(MetalError::invalid(format!(
            "event callback must be a method, got {}",
            other.type_name()
        ))),
        None => Err(MetalError::invalid("event callback is required")),
    }
}

fn register(this: &Value, args: &[Value], once: bool) -> MetalResult<Value> {
    let names = event_names(args)?;
    let callback = callback_arg(args)?;
    let mut registry = registry_of(this)?.borrow_mut();
    for name in &names {
        registry.on(name, callback.clone(), once);
    }
    Ok(this.clone())
}

fn unregister(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let events = match args.first() {
        None | Some(Value::Nil) => None,
        Some(_) => Some(event_names(args)?),
    };
    let callback = match args.get(1) {
        None | Some(Value::Nil) => None,
        Some(_) => Some(callback_arg(args)?),
    };
    let mut registry = registry_of(this)?.borrow_mut();
    match events {
        None => {
            registry.off(None, callback.as_ref());
        }
        Some(names) => {
            for name in &names {
                registry.off(Some(name), callback.as_ref());
            }
        }
    }
    Ok(this.clone())
}

fn trigger(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let names = event_names(args)?;
    let rest = &args[1..];
    let registry = registry_of(this)?;
    for name in names {
        // the borrow ends before any listener runs
        let direct = registry.borrow_mut().take_for_dispatch(&name);
        for callback in direct {
            callback.invoke(this, rest)?;
        }
        let catch_all = registry.borrow_mut().take_for_dispatch(ALL_EVENTS);
        if !catch_all.is_empty() {
            let mut with_name = Vec::with_capacity(rest.len() + 1);
            with_name.push(Value::from(name.as_str()));
            with_name.extend_from_slice(rest);
            for callback in catch_all {
                callback.invoke(this, &with_name)?;
            }
        }
    }
    Ok(this.clone())
}

fn listen_to(this: &Value, args: &[Value], once: bool) -> MetalResult<Value> {
    let target = args
        .first()
        .ok_or_else(|| MetalError::invalid("listen_to needs an emitter"))?;
    let names = event_names_at(args, 1)?;
    let callback = callback_at(args, 2)?;

    let listener = this.clone();
    let inner = callback.clone();
    let bound = Method::new(move |_, args| inner.invoke(&listener, args));

    let target_registry = registry_of(target)?;
    let own_registry = registry_of(this)?;
    for name in names {
        target_registry.borrow_mut().on(&name, bound.clone(), once);
        own_registry.borrow_mut().track(Subscription {
            target: target.clone(),
            event: name,
            callback: callback.clone(),
            bound: bound.clone(),
        });
    }
    Ok(this.clone())
}

fn stop_listening(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let target = args.first().filter(|v| !v.is_nil());
    let events = match args.get(1) {
        None | Some(Value::Nil) => None,
        Some(_) => Some(event_names_at(args, 1)?),
    };
    let callback = match args.get(2) {
        None | Some(Value::Nil) => None,
        Some(_) => Some(callback_at(args, 2)?),
    };

    let own_registry = registry_of(this)?;
    let released = match &events {
        None => own_registry
            .borrow_mut()
            .untrack(target, None, callback.as_ref()),
        Some(names) => {
            let mut registry = own_registry.borrow_mut();
            let mut released = Vec::new();
            for name in names {
                released.extend(registry.untrack(target, Some(name.as_str()), callback.as_ref()));
            }
            released
        }
    };
    for sub in released {
        registry_of(&sub.target)?
            .borrow_mut()
            .off(Some(&sub.event), Some(&sub.bound));
    }
    Ok(this.clone())
}

fn listener_count(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let event = args.first().and_then(Value::as_str);
    let count = registry_of(this)?.borrow().count(event);
    Ok(Value::Int(count as i64))
}

fn build_events_mixin() -> Mixin {
    Mixin::new(
        Props::new()
            .with("on", Method::new(|this, args| register(this, args, false)).with_name("Events.on"))
            .with("once", Method::new(|this, args| register(this, args, true)).with_name("Events.once"))
            .with("off", Method::new(unregister).with_name("Events.off"))
            .with("trigger", Method::new(trigger).with_name("Events.trigger"))
            .with("listener_count", Method::new(listener_count).with_name("Events.listener_count"))
            .with(
                "listen_to",
                Method::new(|this, args| listen_to(this, args, false)).with_name("Events.listen_to"),
            )
            .with(
                "listen_to_once",
                Method::new(|this, args| listen_to(this, args, true)).with_name("Events.listen_to_once"),
            )
            .with("stop_listening", Method::new(stop_listening).with_name("Events.stop_listening")),
    )
}
