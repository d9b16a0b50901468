// Copyright 2025 Cowboy AI, LLC.

//! The `Utils` mixin: handler dispatch and option lookup

use crate::errors::{MetalError, MetalResult};
use crate::method::Method;
use crate::mixin::{Mixin, Props};
use crate::value::Value;

const OPTIONS_KEY: &str = "options";

thread_local! {
    static UTILS: Mixin = build_utils_mixin();
}

/// Handler method name for an event
///
/// ```
/// use metal_composition::handler_name;
///
/// assert_eq!(handler_name("foo:bar"), "on_foo_bar");
/// ```
pub fn handler_name(event: &str) -> String {
    format!("on_{}", event.replace(':', "_"))
}

/// The `Utils` mixin
pub fn utils_mixin() -> Mixin {
    UTILS.with(Mixin::clone)
}

fn trigger_method(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let event = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| MetalError::invalid("event name must be a string"))?;

    let result = match this.lookup(&handler_name(event)) {
        Some(Value::Method(handler)) => handler.invoke(this, &args[1..])?,
        _ => Value::Nil,
    };
    if let Some(Value::Method(trigger)) = this.lookup("trigger") {
        trigger.invoke(this, args)?;
    }
    Ok(result)
}

fn get_option(this: &Value, args: &[Value]) -> MetalResult<Value> {
    let name = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| MetalError::invalid("option name must be a string"))?;

    let from_options = this
        .lookup(OPTIONS_KEY)
        .and_then(|options| options.as_map().and_then(|map| map.get(name).cloned()))
        .filter(|value| !value.is_nil());

    Ok(from_options
        .or_else(|| this.lookup(name))
        .unwrap_or_default())
}

fn build_utils_mixin() -> Mixin {
    Mixin::new(
        Props::new()
            .with(
                "trigger_method",
                Method::new(trigger_method).with_name("Utils.trigger_method"),
            )
            .with("get_option", Method::new(get_option).with_name("Utils.get_option")),
    )
}
