//! The `document` and `window` host functions, called the way an engine
//! adapter calls them.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use dom::{BridgeConfig, HostContext, ScriptContext};
use js::{HostBindings, JSError, JSValue, JsEngine, JsFunctionRef};

fn id(value: i64) -> JSValue {
    JSValue::Number(value as f64)
}

fn call(bindings: &HostBindings<HostContext>, context: &HostContext, path: (&str, &str), args: Vec<JSValue>) -> Result<JSValue, JSError> {
    bindings
        .function(path.0, path.1)
        .unwrap_or_else(|| panic!("{}.{} is not bound", path.0, path.1))
        .call(context, args)
}

#[test]
fn document_functions_drive_the_tree() {
    let script = ScriptContext::headless(BridgeConfig::default());
    let bindings = script.bindings();
    let host = script.host_context();
    let document = |name| ("document", name);

    let properties = BTreeMap::from([(String::from("lang"), JSValue::from("en"))]);
    call(&bindings, &host, document("createElement"), vec![id(1), "p".into(), JSValue::Object(properties), "click".into()])
        .expect("p");
    call(&bindings, &host, document("createTextNode"), vec![id(2), "a".into()]).expect("text");
    call(&bindings, &host, document("createTextNode"), vec![id(3), "b".into()]).expect("text");
    call(&bindings, &host, document("appendChild"), vec![id(1), id(3)]).expect("append");
    call(&bindings, &host, document("insertBefore"), vec![id(1), id(2), id(3)]).expect("insert");
    call(&bindings, &host, document("insertAdjacentNode"), vec![id(-1), "beforeEnd".into(), id(1)]).expect("adjacent");

    assert_eq!(call(&bindings, &host, document("textContent"), vec![id(1)]), Ok("ab".into()));
    assert_eq!(call(&bindings, &host, document("childCount"), vec![id(1)]), Ok(JSValue::Number(2.0)));
    assert_eq!(call(&bindings, &host, document("firstChild"), vec![id(1)]), Ok(id(2)));
    assert_eq!(call(&bindings, &host, document("nextSibling"), vec![id(3)]), Ok(JSValue::Null));
    assert_eq!(call(&bindings, &host, document("parentNode"), vec![id(1)]), Ok(id(-1)));
    assert_eq!(call(&bindings, &host, document("ownerDocument"), vec![id(2)]), Ok(id(-3)));
    assert_eq!(call(&bindings, &host, document("isConnected"), vec![id(3)]), Ok(JSValue::Boolean(true)));
    assert_eq!(call(&bindings, &host, document("nodeType"), vec![id(1)]), Ok(JSValue::Number(1.0)));
    assert_eq!(call(&bindings, &host, document("nodeType"), vec![id(-2)]), Ok(JSValue::Null));

    assert_eq!(call(&bindings, &host, document("getProperty"), vec![id(1), "lang".into()]), Ok("en".into()));
    assert!(script.dispatcher().expect("lock").tree().node(js::NodeKey(1)).is_some_and(|node| node.has_event("click")));

    call(&bindings, &host, document("setProperty"), vec![id(1), "title".into(), "greeting".into()]).expect("set");
    assert_eq!(call(&bindings, &host, document("getProperty"), vec![id(1), "title".into()]), Ok("greeting".into()));
    call(&bindings, &host, document("removeProperty"), vec![id(1), "title".into()]).expect("remove");
    assert_eq!(call(&bindings, &host, document("getProperty"), vec![id(1), "title".into()]), Ok(JSValue::Undefined));

    call(&bindings, &host, document("removeChild"), vec![id(1), id(2)]).expect("remove child");
    assert_eq!(call(&bindings, &host, document("parentNode"), vec![id(2)]), Ok(JSValue::Null));
    call(&bindings, &host, document("disposeNode"), vec![id(2)]).expect("dispose");
    call(&bindings, &host, document("disposeNode"), vec![id(2)]).expect("dispose again");
    assert!(matches!(
        call(&bindings, &host, document("parentNode"), vec![id(2)]),
        Err(JSError::DomException(message)) if message.starts_with("InvalidAccessError")
    ));
}

#[test]
fn document_functions_report_script_errors() {
    let script = ScriptContext::headless(BridgeConfig::default());
    let bindings = script.bindings();
    let host = script.host_context();
    let document = |name| ("document", name);

    assert_eq!(
        call(&bindings, &host, document("createElement"), vec!["1".into(), "div".into()]),
        Err(JSError::TypeError(String::from("id must be an integer node id")))
    );
    assert!(matches!(
        call(&bindings, &host, document("createElement"), vec![JSValue::Number(1.5), "div".into()]),
        Err(JSError::TypeError(_))
    ));

    assert_eq!(
        call(&bindings, &host, document("createElement"), vec![id(1), "div".into(), "click".into()]),
        Err(JSError::TypeError(String::from("properties must be an object")))
    );
    call(&bindings, &host, document("createElement"), vec![id(1), "div".into(), JSValue::Null, "click".into()])
        .expect("div");
    assert!(matches!(
        call(&bindings, &host, document("createElement"), vec![id(1), "span".into()]),
        Err(JSError::DomException(message)) if message.starts_with("InvalidStateError")
    ));
    assert!(matches!(
        call(&bindings, &host, document("insertAdjacentNode"), vec![id(-1), "inside".into(), id(1)]),
        Err(JSError::DomException(message)) if message.starts_with("SyntaxError")
    ));
    assert!(matches!(
        call(&bindings, &host, document("removeChild"), vec![id(-1), id(1)]),
        Err(JSError::DomException(message)) if message.starts_with("NotFoundError")
    ));
    call(&bindings, &host, document("appendChild"), vec![id(-1), id(1)]).expect("append");
    assert!(matches!(
        call(&bindings, &host, document("appendChild"), vec![id(1), id(-1)]),
        Err(JSError::DomException(message)) if message.starts_with("HierarchyRequestError")
    ));
}

#[test]
fn reserved_handles_are_exposed_as_properties() {
    let script = ScriptContext::headless(BridgeConfig::default());
    let bindings = script.bindings();
    let document = bindings.namespaces.get("document").expect("document namespace");
    assert_eq!(document.properties.get("BODY"), Some(&id(-1)));
    assert_eq!(document.properties.get("WINDOW"), Some(&id(-2)));
    assert_eq!(document.properties.get("DOCUMENT"), Some(&id(-3)));
}

#[test]
fn timer_functions_validate_and_number_from_one() {
    let script = ScriptContext::headless(BridgeConfig::default());
    let bindings = script.bindings();
    let host = script.host_context();
    let window = |name| ("window", name);
    let callback = JSValue::Function(JsFunctionRef(1));

    assert_eq!(
        call(&bindings, &host, window("setTimeout"), Vec::new()),
        Err(JSError::TypeError(String::from(
            "Failed to execute 'setTimeout': 1 argument required, but only 0 present."
        )))
    );
    assert_eq!(
        call(&bindings, &host, window("setInterval"), vec![callback.clone(), "5".into()]),
        Err(JSError::TypeError(String::from(
            "Failed to execute 'setInterval': parameter 2 (timeout) only can be a number or undefined."
        )))
    );

    assert_eq!(call(&bindings, &host, window("setTimeout"), vec![callback.clone()]), Ok(JSValue::Number(1.0)));
    assert_eq!(
        call(&bindings, &host, window("setInterval"), vec![callback, JSValue::Number(10.0)]),
        Ok(JSValue::Number(2.0))
    );
    assert_eq!(call(&bindings, &host, window("clearInterval"), vec![JSValue::Number(2.0)]), Ok(JSValue::Null));
    assert_eq!(call(&bindings, &host, window("clearTimeout"), vec!["2".into()]), Ok(JSValue::Null));
    assert!(call(&bindings, &host, window("clearTimeout"), Vec::new()).is_err());
    assert!(host.timers().expect("timers").is_pending(js::TimerId(1)));
    assert!(!host.timers().expect("timers").is_pending(js::TimerId(2)));
}

/// Engine whose callbacks re-enter the host functions.
struct ReentrantEngine {
    bindings: HostBindings<HostContext>,
    host: HostContext,
    fired: Vec<JsFunctionRef>,
}

impl JsEngine for ReentrantEngine {
    fn call_function(&mut self, function: JsFunctionRef) -> anyhow::Result<()> {
        self.fired.push(function);
        if function == JsFunctionRef(1) {
            call(
                &self.bindings,
                &self.host,
                ("window", "setTimeout"),
                vec![JSValue::Function(JsFunctionRef(2)), JSValue::Number(0.0)],
            )?;
            call(
                &self.bindings,
                &self.host,
                ("document", "createComment"),
                vec![id(9), "from timer".into()],
            )?;
        }
        Ok(())
    }

    fn run_jobs(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn timer_callbacks_can_call_back_into_the_host() {
    let script = ScriptContext::headless(BridgeConfig::default());
    let host = script.host_context();
    let mut engine = ReentrantEngine { bindings: script.bindings(), host: host.clone(), fired: Vec::new() };

    call(&engine.bindings, &host, ("window", "setTimeout"), vec![JSValue::Function(JsFunctionRef(1))]).expect("set");
    let later = Instant::now() + Duration::from_millis(5);
    assert_eq!(script.tick_timers(later, &mut engine), 1);
    assert!(script.next_timer_deadline().is_some());
    assert_eq!(script.tick_timers(Instant::now() + Duration::from_millis(5), &mut engine), 1);
    assert_eq!(engine.fired, vec![JsFunctionRef(1), JsFunctionRef(2)]);
    assert!(script.dispatcher().expect("lock").tree().contains(js::NodeKey(9)));
    assert_eq!(script.next_timer_deadline(), None);
}
