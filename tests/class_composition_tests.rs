//! Class creation, mixins and super dispatch through the public API

use metal_composition::{
    create_class, include_into, mixin_into, Class, MetalError, Mixin, Props, Value,
};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn text(value: Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

fn base_with_greet() -> Class {
    Class::root()
        .extend(&Props::new().method("greet", |_, _| Ok(Value::from("base"))))
        .unwrap()
}

#[test]
fn super_dispatch_reaches_parent_method() {
    let child = base_with_greet()
        .extend(&Props::new().overriding("greet", |_, sup, _| {
            Ok(Value::from(format!("child+{}", text(sup.call(&[])?))))
        }))
        .unwrap();

    let instance = child.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("child+base"));
}

#[test]
fn super_dispatch_walks_several_levels() {
    let middle = base_with_greet()
        .extend(&Props::new().overriding("greet", |_, sup, _| {
            Ok(Value::from(format!("middle+{}", text(sup.call(&[])?))))
        }))
        .unwrap();
    let leaf = middle
        .extend(&Props::new().overriding("greet", |_, sup, _| {
            Ok(Value::from(format!("leaf+{}", text(sup.call(&[])?))))
        }))
        .unwrap();

    let instance = leaf.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("leaf+middle+base"));
}

#[test]
fn nested_calls_on_one_receiver_keep_their_own_super() {
    let parent = Class::root()
        .extend(
            &Props::new()
                .method("a", |_, _| Ok(Value::from("parent-a")))
                .method("b", |_, _| Ok(Value::from("parent-b"))),
        )
        .unwrap();
    let child = parent
        .extend(
            &Props::new()
                .overriding("a", |this, sup, _| {
                    let from_b = text(this.call("b", &[])?);
                    let from_super = text(sup.call(&[])?);
                    Ok(Value::from(format!("{from_b}|{from_super}")))
                })
                .overriding("b", |_, sup, _| {
                    Ok(Value::from(format!("child-b+{}", text(sup.call(&[])?))))
                }),
        )
        .unwrap();

    let instance = child.instantiate(&[]).unwrap();
    assert_eq!(
        instance.call("a", &[]).unwrap(),
        Value::from("child-b+parent-b|parent-a")
    );
}

#[test]
fn super_reaches_a_method_that_fails() {
    let parent = Class::root()
        .extend(&Props::new().method("save", |_, _| Err(MetalError::raise("disk full"))))
        .unwrap();
    let child = parent
        .extend(&Props::new().overriding("save", |_, sup, args| sup.call(args)))
        .unwrap();
    let instance = child.instantiate(&[]).unwrap();

    let err = instance.call("save", &[]).unwrap_err();
    assert_eq!(err.raised().map(|info| info.message.as_str()), Some("disk full"));

    // a failing call leaves later calls unaffected
    let err = instance.call("save", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Error: disk full");
}

#[test]
fn overriding_method_without_parent_fails_fast() {
    let class = Class::root()
        .extend(&Props::new().overriding("fresh", |_, sup, _| sup.call(&[])))
        .unwrap();
    let instance = class.instantiate(&[]).unwrap();
    let err = instance.call("fresh", &[]).unwrap_err();
    assert!(matches!(err, MetalError::SuperCallMisuse { .. }));
}

#[test]
fn plain_override_replaces_without_super() {
    let child = base_with_greet()
        .extend(&Props::new().method("greet", |_, _| Ok(Value::from("plain"))))
        .unwrap();
    let greet = child.resolve("greet").unwrap();
    assert!(!greet.as_method().unwrap().is_wrapped());
    let instance = child.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("plain"));
}

#[test]
fn overriding_data_installs_as_is() {
    let parent = Class::root().extend(&Props::new().with("greet", "data")).unwrap();
    let child = parent
        .extend(&Props::new().overriding("greet", |_, sup, _| sup.call(&[])))
        .unwrap();
    let greet = child.resolve("greet").unwrap();
    assert!(!greet.as_method().unwrap().is_wrapped());
}

#[test]
fn wrapped_method_captures_parent_at_creation() {
    let parent = base_with_greet();
    let child = parent
        .extend(&Props::new().overriding("greet", |_, sup, _| sup.call(&[])))
        .unwrap();

    parent
        .mixin(Props::new().method("greet", |_, _| Ok(Value::from("later"))))
        .unwrap();

    let instance = child.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("base"));
}

#[test]
fn every_instance_prop_lands_on_the_child() {
    let parent = Class::root();
    let props = Props::new()
        .with("property1", "value1")
        .with("count", 3)
        .method("method1", |_, _| Ok(Value::Nil));
    let child = create_class(&parent, Some(&props), None).unwrap();

    assert_eq!(child.superclass(), Some(parent.clone()));
    assert_eq!(child.resolve("property1"), Some(Value::from("value1")));
    assert_eq!(child.resolve("count"), Some(Value::from(3)));
    assert!(child.resolve("method1").unwrap().is_callable());
    assert!(child.instantiate(&[]).unwrap().is_instance_of(&parent));
}

#[test]
fn default_constructor_forwards_arguments_to_root() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let class = create_class(&Class::root(), None, None).unwrap();
    class
        .mixin(Props::new().method("initialize", move |_, args| {
            sink.borrow_mut().extend(args.iter().cloned());
            Ok(Value::Nil)
        }))
        .unwrap();

    class.instantiate(&[Value::from(1), Value::from(2)]).unwrap();
    assert_eq!(*seen.borrow(), vec![Value::from(1), Value::from(2)]);
}

#[test]
fn static_props_are_merged_with_wrapping() {
    let parent = Class::root()
        .extend_with(
            &Props::new(),
            &Props::new().method("describe", |_, _| Ok(Value::from("parent"))),
        )
        .unwrap();
    let child = parent
        .extend_with(
            &Props::new(),
            &Props::new().overriding("describe", |_, sup, _| {
                Ok(Value::from(format!("child+{}", text(sup.call(&[])?))))
            }),
        )
        .unwrap();

    assert_eq!(child.call_static("describe", &[]).unwrap(), Value::from("child+parent"));
    assert_eq!(parent.call_static("describe", &[]).unwrap(), Value::from("parent"));
}

#[test]
fn static_receiver_is_the_class() {
    let class = Class::root()
        .extend_with(
            &Props::new(),
            &Props::new().method("whoami", |this, _| {
                Ok(Value::from(this.as_class().map(|c| c.name().to_string())))
            }),
        )
        .unwrap();
    assert_eq!(class.call_static("whoami", &[]).unwrap(), Value::from("anonymous"));
}

#[test]
fn include_leaves_instance_behavior_alone() {
    let class = base_with_greet();
    let instance = class.instantiate(&[]).unwrap();

    include_into(
        &class,
        &Props::new().method("greet", |_, _| Ok(Value::from("static"))),
    )
    .unwrap();

    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("base"));
    assert_eq!(class.call_static("greet", &[]).unwrap(), Value::from("static"));
}

#[test]
fn include_wraps_overriding_static_over_existing_static() {
    let class = Class::root()
        .extend_with(
            &Props::new().method("describe", |_, _| Ok(Value::from("instance"))),
            &Props::new().method("describe", |_, _| Ok(Value::from("original"))),
        )
        .unwrap();
    let instance = class.instantiate(&[]).unwrap();

    class
        .include(Props::new().overriding("describe", |_, sup, _| {
            Ok(Value::from(format!("included+{}", text(sup.call(&[])?))))
        }))
        .unwrap();

    assert_eq!(
        class.call_static("describe", &[]).unwrap(),
        Value::from("included+original")
    );
    let describe = class.get_static("describe").unwrap();
    assert_eq!(describe.as_method().unwrap().super_depth(), 1);
    assert_eq!(instance.call("describe", &[]).unwrap(), Value::from("instance"));
    assert!(!class.resolve("describe").unwrap().as_method().unwrap().is_wrapped());
}

#[test]
fn mixins_do_not_cross_contaminate() {
    let m1 = Mixin::new(Props::new().with("a", 1));
    let m2 = Mixin::new(Props::new().with("b", 2));
    let d1 = Class::root().subclass().unwrap();
    let d2 = Class::root().subclass().unwrap();

    d1.mixin(m1.clone()).unwrap().mixin(m2).unwrap();
    d2.mixin(m1.clone()).unwrap();

    assert_eq!(d1.resolve("a"), Some(Value::from(1)));
    assert_eq!(d1.resolve("b"), Some(Value::from(2)));
    assert_eq!(d2.resolve("a"), Some(Value::from(1)));
    assert_eq!(d2.resolve("b"), None);
    assert_eq!(m1.props().len(), 1);
}

#[test]
fn repeated_mixin_grows_the_super_chain() {
    let class = base_with_greet().subclass().unwrap();
    let suffix = Mixin::new(Props::new().overriding("greet", |_, sup, _| {
        Ok(Value::from(format!("{}+m", text(sup.call(&[])?))))
    }));

    mixin_into(&class, suffix.props()).unwrap();
    let instance = class.instantiate(&[]).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("base+m"));

    mixin_into(&class, suffix.props()).unwrap();
    assert_eq!(instance.call("greet", &[]).unwrap(), Value::from("base+m+m"));
    let greet = class.resolve("greet").unwrap();
    assert_eq!(greet.as_method().unwrap().super_depth(), 2);
}

#[test]
fn mixin_of_plain_values_is_idempotent() {
    let class = Class::root().subclass().unwrap();
    let mixin = Mixin::new(Props::new().with("a", 1).method("m", |_, _| Ok(Value::from(1))));
    class.mixin(mixin.clone()).unwrap();
    let first = class.prototype().snapshot();
    class.mixin(mixin).unwrap();
    assert_eq!(class.prototype().snapshot(), first);
}

#[test]
fn existing_instances_see_mixed_in_methods() {
    let class = Class::root().subclass().unwrap();
    let instance = class.instantiate(&[]).unwrap();
    class
        .mixin(Props::new().method("late", |_, _| Ok(Value::from("late"))))
        .unwrap();
    assert_eq!(instance.call("late", &[]).unwrap(), Value::from("late"));
}

#[test]
fn overriding_initialize_runs_parent_initialize() {
    let log = Rc::new(RefCell::new(Vec::<String>::new()));
    let parent_log = Rc::clone(&log);
    let child_log = Rc::clone(&log);

    let parent = Class::root()
        .extend(&Props::new().method("initialize", move |_, _| {
            parent_log.borrow_mut().push("parent".to_string());
            Ok(Value::Nil)
        }))
        .unwrap();
    let child = parent
        .extend(&Props::new().overriding("initialize", move |_, sup, args| {
            child_log.borrow_mut().push("child".to_string());
            sup.call(args)
        }))
        .unwrap();

    child.instantiate(&[]).unwrap();
    assert_eq!(*log.borrow(), vec!["child", "parent"]);
}
