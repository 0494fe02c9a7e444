//! End-to-end flows through a `ScriptContext`: queued commands, tree-changed
//! batches, observer mirrors and render notifications.

use std::collections::BTreeMap;
use std::sync::Arc;

use dom::{BridgeConfig, DomError, ElementFactory, RecordingRenderBridge, RenderEvent, ScriptContext};
use js::{BridgeCommand, DOMUpdate, DomIndex, JSValue, NodeKey, NodeType};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn commands(payloads: &[&str]) -> Vec<BridgeCommand> {
    payloads
        .iter()
        .map(|payload| BridgeCommand::from_json(payload).expect("valid command"))
        .collect()
}

#[test]
fn queued_json_commands_build_a_connected_tree() {
    init_logging();
    let mut context = ScriptContext::headless(BridgeConfig::default());
    let sender = context.command_sender();
    sender
        .try_send(commands(&[
            r#"{"command":"createElement","id":1,"tag":"DIV","properties":{"id":"root"},"events":["click"]}"#,
            r#"{"command":"createTextNode","id":2,"data":"hello"}"#,
            r#"{"command":"insertAdjacentNode","target":1,"position":"beforeend","node":2}"#,
            r#"{"command":"insertAdjacentNode","target":-1,"position":"afterbegin","node":1}"#,
            r#"{"command":"getProperty","target":1,"key":"id"}"#,
        ]))
        .expect("queue");

    let results = context.update();
    assert_eq!(results.len(), 5);
    assert!(results[..4].iter().all(Result::is_ok));
    assert_eq!(results[4], Ok(JSValue::from("root")));

    let dispatcher = context.dispatcher().expect("lock");
    let tree = dispatcher.tree();
    assert_eq!(tree.children(NodeKey::BODY), vec![NodeKey(1)]);
    assert!(tree.is_connected(NodeKey(2)));
    assert_eq!(tree.text_content(NodeKey::BODY).as_deref(), Some("hello"));
    assert!(tree.node(NodeKey(1)).is_some_and(|node| node.has_event("click")));
    assert_eq!(tree.node(NodeKey(1)).and_then(|node| node.element()).map(|el| el.tag.as_str()), Some("div"));
    tree.check_invariants().expect("invariants");
}

#[test]
fn one_failing_command_does_not_stop_the_batch() {
    let mut context = ScriptContext::headless(BridgeConfig::default());
    context
        .command_sender()
        .try_send(commands(&[
            r#"{"command":"setStyle","target":42,"key":"color","value":"red"}"#,
            r#"{"command":"createComment","id":3,"data":"note"}"#,
            r#"{"command":"insertAdjacentNode","target":3,"position":"afterbegin","node":-1}"#,
        ]))
        .expect("queue");

    let results = context.update();
    assert_eq!(results[0], Err(DomError::DanglingReference(NodeKey(42))));
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(DomError::Argument(_))));
    assert!(context.dispatcher().expect("lock").tree().contains(NodeKey(3)));
}

#[test]
fn every_command_publishes_one_batch() {
    let context = ScriptContext::headless(BridgeConfig::default());
    let mut updates = context.subscribe().expect("subscribe");

    context.apply_json(r#"{"command":"createElement","id":7,"tag":"span","properties":{"title":"x"}}"#).expect("create");
    context.apply_json(r#"{"command":"insertAdjacentNode","target":-1,"position":"beforeend","node":7}"#).expect("insert");
    context.apply_json(r#"{"command":"getProperty","target":7,"key":"title"}"#).expect("query");
    context.apply_json(r#"{"command":"removeNode","id":7}"#).expect("remove");

    assert_eq!(
        updates.try_recv().expect("created"),
        vec![
            DOMUpdate::Created {
                node: NodeKey(7),
                node_type: NodeType::Element,
                tag: Some(String::from("span")),
                data: None,
            },
            DOMUpdate::SetProperty { node: NodeKey(7), name: String::from("title"), value: JSValue::from("x") },
        ]
    );
    assert_eq!(
        updates.try_recv().expect("inserted"),
        vec![DOMUpdate::Inserted { parent: NodeKey::BODY, node: NodeKey(7), pos: 0 }]
    );
    assert_eq!(
        updates.try_recv().expect("removed"),
        vec![DOMUpdate::Removed { parent: NodeKey::BODY, node: NodeKey(7) }]
    );
    assert!(updates.try_recv().is_err());
}

#[test]
fn mirror_tracks_the_tree() {
    init_logging();
    let context = ScriptContext::headless(BridgeConfig::default());
    let (index, state) = DomIndex::new();
    let mut mirror = context.mirror(index).expect("mirror");

    {
        let mut dispatcher = context.dispatcher().expect("lock");
        let mut properties = BTreeMap::new();
        properties.insert(String::from("id"), JSValue::from("list"));
        dispatcher.create_element(NodeKey(1), "ul", properties, &[]).expect("ul");
        dispatcher.create_element(NodeKey(2), "li", Default::default(), &[]).expect("li");
        dispatcher.create_element(NodeKey(3), "li", Default::default(), &[]).expect("li");
        dispatcher.create_text_node(NodeKey(4), "one").expect("text");
        dispatcher.append_child(NodeKey::BODY, NodeKey(1)).expect("append");
        dispatcher.append_child(NodeKey(1), NodeKey(3)).expect("append");
        dispatcher.insert_before(NodeKey(1), NodeKey(2), Some(NodeKey(3))).expect("insert");
        dispatcher.append_child(NodeKey(2), NodeKey(4)).expect("append");
        dispatcher.set_property(NodeKey(4), "data", JSValue::from("first")).expect("data");
    }
    mirror.try_update_sync().expect("apply");

    let state = state.lock().expect("state");
    assert_eq!(state.get_element_by_id("list"), Some(NodeKey(1)));
    assert_eq!(state.children(NodeKey(1)), &[NodeKey(2), NodeKey(3)]);
    assert_eq!(state.get_elements_by_tag_name("LI"), vec![NodeKey(2), NodeKey(3)]);
    assert_eq!(state.get_text_content(NodeKey(1)), "first");
}

#[test]
fn render_sees_connection_transitions() {
    init_logging();
    let render = RecordingRenderBridge::new();
    let context = ScriptContext::new(
        BridgeConfig::default(),
        Arc::new(ElementFactory::with_builtin_types()),
        Box::new(render.clone()),
    );
    render.take_events();

    let mut dispatcher = context.dispatcher().expect("lock");
    dispatcher.create_element(NodeKey(1), "section", Default::default(), &[]).expect("section");
    dispatcher.create_text_node(NodeKey(2), "body text").expect("text");
    dispatcher.append_child(NodeKey(1), NodeKey(2)).expect("append");
    assert!(render.events().is_empty());

    dispatcher.append_child(NodeKey::BODY, NodeKey(1)).expect("connect");
    assert_eq!(
        render.take_events(),
        vec![
            RenderEvent::Attach { node: NodeKey(1), node_type: NodeType::Element },
            RenderEvent::Attach { node: NodeKey(2), node_type: NodeType::Text },
        ]
    );

    dispatcher.remove_node(NodeKey(1)).expect("disconnect");
    let detached = render.take_events();
    assert_eq!(detached.len(), 2);
    assert!(detached.contains(&RenderEvent::Detach { node: NodeKey(1) }));
    assert!(detached.contains(&RenderEvent::Detach { node: NodeKey(2) }));
    assert!(!render.is_attached(NodeKey(2)));
}

#[test]
fn teardown_releases_undisposed_nodes() {
    init_logging();
    let mut context = ScriptContext::headless(BridgeConfig::default());
    context.apply_json(r#"{"command":"createElement","id":1,"tag":"div"}"#).expect("create");
    context.apply_json(r#"{"command":"createElement","id":2,"tag":"div"}"#).expect("create");
    context.apply_json(r#"{"command":"insertAdjacentNode","target":-1,"position":"beforeend","node":1}"#).expect("insert");
    context.apply_json(r#"{"command":"disposeNode","id":2}"#).expect("dispose");

    assert_eq!(context.teardown(), 1);
    let dispatcher = context.dispatcher().expect("lock");
    assert!(!dispatcher.tree().contains(NodeKey(1)));
    assert!(dispatcher.tree().children(NodeKey::BODY).is_empty());
}

#[test]
fn updates_serialize_with_camel_case_tags() {
    let update = DOMUpdate::Inserted { parent: NodeKey::BODY, node: NodeKey(5), pos: 2 };
    let json = serde_json::to_value(&update).expect("serialize");
    assert_eq!(json, serde_json::json!({"type": "inserted", "parent": -1, "node": 5, "pos": 2}));

    let created = DOMUpdate::Created {
        node: NodeKey(6),
        node_type: NodeType::DocumentFragment,
        tag: None,
        data: None,
    };
    let json = serde_json::to_value(&created).expect("serialize");
    assert_eq!(json["type"], serde_json::json!("created"));
    assert_eq!(json["node_type"], serde_json::json!("documentFragment"));
}
