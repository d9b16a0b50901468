//! Built-in events and utils on instances and classes

use metal_composition::{Class, Method, MetalError, Metal, Props, Value};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;
use test_case::test_case;

type Log = Rc<RefCell<Vec<String>>>;

fn logging(log: &Log, label: &'static str) -> Method {
    let log = Rc::clone(log);
    Method::new(move |_, args| {
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| format!("{a:?}")))
            .collect();
        log.borrow_mut().push(format!("{label}({})", rendered.join(",")));
        Ok(Value::Nil)
    })
}

fn instance() -> Value {
    Value::from(Class::root().subclass().unwrap().instantiate(&[]).unwrap())
}

#[test]
fn listeners_run_in_registration_order() {
    let log = Log::default();
    let this = instance();
    this.call("on", &[Value::from("change"), Value::from(logging(&log, "first"))]).unwrap();
    this.call("on", &[Value::from("change"), Value::from(logging(&log, "second"))]).unwrap();
    this.call("on", &[Value::from("all"), Value::from(logging(&log, "all"))]).unwrap();

    this.call("trigger", &[Value::from("change"), Value::from("x")]).unwrap();
    assert_eq!(*log.borrow(), vec!["first(x)", "second(x)", "all(change,x)"]);
}

#[test]
fn on_returns_the_receiver() {
    let this = instance();
    let returned = this
        .call("on", &[Value::from("a"), Value::from(Method::new(|_, _| Ok(Value::Nil)))])
        .unwrap();
    assert_eq!(returned, this);
}

#[test]
fn listener_receives_receiver_as_this() {
    let this = instance();
    let seen = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&seen);
    let listener = Method::new(move |receiver, _| {
        *sink.borrow_mut() = Some(receiver.clone());
        Ok(Value::Nil)
    });
    this.call("on", &[Value::from("ping"), Value::from(listener)]).unwrap();
    this.call("trigger", &[Value::from("ping")]).unwrap();
    assert_eq!(seen.borrow().clone(), Some(this));
}

#[test]
fn off_with_event_only_removes_that_event() {
    let log = Log::default();
    let this = instance();
    this.call("on", &[Value::from("a b"), Value::from(logging(&log, "l"))]).unwrap();
    this.call("off", &[Value::from("a")]).unwrap();
    this.call("trigger", &[Value::from("a")]).unwrap();
    this.call("trigger", &[Value::from("b")]).unwrap();
    assert_eq!(*log.borrow(), vec!["l()"]);
}

#[test_case(Value::from(1) ; "numeric event name")]
#[test_case(Value::from("   ") ; "blank event name")]
fn bad_event_names_are_rejected(event: Value) {
    let this = instance();
    let err = this.call("trigger", &[event]).unwrap_err();
    assert!(matches!(err, MetalError::InvalidArgument(_)));
}

#[test]
fn trigger_method_dispatches_to_handler_and_listeners() {
    let log = Log::default();
    let handler = logging(&log, "handler");
    let class = Class::root()
        .extend(&Props::new().with("on_item_added", handler))
        .unwrap();
    let this = Value::from(class.instantiate(&[]).unwrap());
    this.call("on", &[Value::from("item:added"), Value::from(logging(&log, "listener"))])
        .unwrap();

    this.call("trigger_method", &[Value::from("item:added"), Value::from("x")]).unwrap();
    assert_eq!(*log.borrow(), vec!["handler(x)", "listener(x)"]);
}

#[test]
fn trigger_method_returns_handler_result() {
    let class = Class::root()
        .extend(&Props::new().method("on_foo", |_, args| Ok(Value::from(args.len() as i64))))
        .unwrap();
    let this = class.instantiate(&[]).unwrap();
    let result = this
        .call("trigger_method", &[Value::from("foo"), Value::from(1), Value::from(2)])
        .unwrap();
    assert_eq!(result, Value::from(2));
}

#[test]
fn get_option_reads_options_then_instance() {
    let class = Class::root()
        .extend(&Props::new().method("initialize", |this, args| {
            if let (Some(instance), Some(options)) = (this.as_instance(), args.first()) {
                instance.set("options", options.clone());
            }
            Ok(Value::Nil)
        }))
        .unwrap();
    let options = Value::from_json(serde_json::json!({ "title": "from options" }));
    let instance = class.instantiate(&[options]).unwrap();
    instance.set("width", 10);

    assert_eq!(
        instance.call("get_option", &[Value::from("title")]).unwrap(),
        Value::from("from options")
    );
    assert_eq!(instance.call("get_option", &[Value::from("width")]).unwrap(), Value::from(10));
}

#[test]
fn classes_can_emit_events() {
    let log = Log::default();
    let metal = Metal::new();
    let class = Value::from(metal.class().subclass().unwrap());
    class.call("once", &[Value::from("ready"), Value::from(logging(&log, "ready"))]).unwrap();
    class.call("trigger", &[Value::from("ready")]).unwrap();
    class.call("trigger", &[Value::from("ready")]).unwrap();
    assert_eq!(*log.borrow(), vec!["ready()"]);
}

#[test]
fn utils_can_be_included_into_statics() {
    let metal = Metal::new();
    let class = metal.class().subclass().unwrap();
    class.include(metal.utils()).unwrap();
    let result = Value::from(class).call("trigger_method", &[Value::from("nothing")]).unwrap();
    assert_eq!(result, Value::Nil);
}
