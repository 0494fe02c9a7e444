//! Document namespace builder.
//!
//! This module provides the `document` namespace for JavaScript, including:
//! - Creation: createElement, createTextNode, createComment, createDocumentFragment
//! - Structure: appendChild, insertBefore, removeChild, replaceChild,
//!   insertAdjacentNode, removeNode, cloneNode
//! - Properties and style: setProperty, getProperty, removeProperty, setStyle
//! - Events: addEvent, removeEvent
//! - Lifecycle: disposeNode
//! - Queries: parentNode, firstChild, lastChild, previousSibling, nextSibling,
//!   childNodes count, isConnected, nodeType, ownerDocument, textContent
//!
//! Node handles travel as integral numbers chosen by the script side.

use std::collections::BTreeMap;
use std::sync::Arc;

use js::{AdjacentPosition, HostFnSync, HostNamespace, JSError, JSValue, NodeKey};

use super::{key_value, parse_key, parse_optional_key, parse_string, HostContext};
use crate::tree::NodeTree;

/// Build the `document` namespace.
pub fn build_document_namespace() -> HostNamespace<HostContext> {
    HostNamespace::new()
        .with_property("BODY", JSValue::Number(NodeKey::BODY.0 as f64))
        .with_property("WINDOW", JSValue::Number(NodeKey::WINDOW.0 as f64))
        .with_property("DOCUMENT", JSValue::Number(NodeKey::DOCUMENT.0 as f64))
        .with_sync_fn("createElement", build_create_element())
        .with_sync_fn("createTextNode", build_create_character_data(false))
        .with_sync_fn("createComment", build_create_character_data(true))
        .with_sync_fn("createDocumentFragment", build_create_document_fragment())
        .with_sync_fn("cloneNode", build_clone_node())
        .with_sync_fn("removeNode", build_remove_node())
        .with_sync_fn("appendChild", build_append_child())
        .with_sync_fn("insertBefore", build_insert_before())
        .with_sync_fn("removeChild", build_remove_child())
        .with_sync_fn("replaceChild", build_replace_child())
        .with_sync_fn("insertAdjacentNode", build_insert_adjacent_node())
        .with_sync_fn("setProperty", build_set_property())
        .with_sync_fn("getProperty", build_get_property())
        .with_sync_fn("removeProperty", build_remove_property())
        .with_sync_fn("setStyle", build_set_style())
        .with_sync_fn("addEvent", build_event(true))
        .with_sync_fn("removeEvent", build_event(false))
        .with_sync_fn("disposeNode", build_dispose_node())
        .with_sync_fn("parentNode", build_relation(NodeTree::parent))
        .with_sync_fn("firstChild", build_relation(NodeTree::first_child))
        .with_sync_fn("lastChild", build_relation(NodeTree::last_child))
        .with_sync_fn("previousSibling", build_relation(NodeTree::previous_sibling))
        .with_sync_fn("nextSibling", build_relation(NodeTree::next_sibling))
        .with_sync_fn("ownerDocument", build_relation(NodeTree::owner_document))
        .with_sync_fn("childCount", build_child_count())
        .with_sync_fn("isConnected", build_is_connected())
        .with_sync_fn("nodeType", build_node_type())
        .with_sync_fn("textContent", build_text_content())
}

/// Build createElement(id, tag, properties?, ...eventTypes).
///
/// `properties` is a plain object, or `null`/`undefined` for none.
fn build_create_element() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let tag = parse_string(args.get(1), "tag")?;
        let properties = match args.get(2) {
            None | Some(JSValue::Null | JSValue::Undefined) => BTreeMap::new(),
            Some(JSValue::Object(entries)) => entries.clone(),
            Some(_) => return Err(JSError::TypeError(String::from("properties must be an object"))),
        };
        let events = args
            .iter()
            .skip(3)
            .map(|value| parse_string(Some(value), "event type"))
            .collect::<Result<Vec<_>, _>>()?;
        context.dispatcher()?.create_element(id, &tag, properties, &events)?;
        Ok(JSValue::Undefined)
    })
}

/// Build createTextNode(id, data) or createComment(id, data).
fn build_create_character_data(comment: bool) -> Arc<HostFnSync<HostContext>> {
    Arc::new(move |context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let data = args.get(1).map(JSValue::to_display_string).unwrap_or_default();
        let mut dispatcher = context.dispatcher()?;
        if comment {
            dispatcher.create_comment(id, &data)?;
        } else {
            dispatcher.create_text_node(id, &data)?;
        }
        Ok(JSValue::Undefined)
    })
}

fn build_create_document_fragment() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        context.dispatcher()?.create_document_fragment(id)?;
        Ok(JSValue::Undefined)
    })
}

fn build_clone_node() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let source = parse_key(args.first(), "source")?;
        let target = parse_key(args.get(1), "target")?;
        context.dispatcher()?.clone_node(source, target)?;
        Ok(JSValue::Undefined)
    })
}

fn build_remove_node() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        context.dispatcher()?.remove_node(id)?;
        Ok(JSValue::Undefined)
    })
}

fn build_append_child() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let parent = parse_key(args.first(), "parent")?;
        let node = parse_key(args.get(1), "node")?;
        context.dispatcher()?.append_child(parent, node)?;
        Ok(JSValue::Undefined)
    })
}

fn build_insert_before() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let parent = parse_key(args.first(), "parent")?;
        let node = parse_key(args.get(1), "node")?;
        let reference = parse_optional_key(args.get(2), "reference")?;
        context.dispatcher()?.insert_before(parent, node, reference)?;
        Ok(JSValue::Undefined)
    })
}

fn build_remove_child() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let parent = parse_key(args.first(), "parent")?;
        let node = parse_key(args.get(1), "node")?;
        context.dispatcher()?.remove_child(parent, node)?;
        Ok(JSValue::Undefined)
    })
}

fn build_replace_child() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let parent = parse_key(args.first(), "parent")?;
        let new_child = parse_key(args.get(1), "newChild")?;
        let old_child = parse_key(args.get(2), "oldChild")?;
        context.dispatcher()?.replace_child(parent, new_child, old_child)?;
        Ok(JSValue::Undefined)
    })
}

/// Build insertAdjacentNode(target, position, node).
fn build_insert_adjacent_node() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let position: AdjacentPosition = parse_string(args.get(1), "position")?.parse()?;
        let node = parse_key(args.get(2), "node")?;
        context.dispatcher()?.insert_adjacent_node(target, position, node)?;
        Ok(JSValue::Undefined)
    })
}

fn build_set_property() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let key = parse_string(args.get(1), "key")?;
        let value = args.get(2).cloned().unwrap_or(JSValue::Undefined);
        context.dispatcher()?.set_property(target, &key, value)?;
        Ok(JSValue::Undefined)
    })
}

fn build_get_property() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let key = parse_string(args.get(1), "key")?;
        Ok(context.dispatcher()?.get_property(target, &key)?)
    })
}

fn build_remove_property() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let key = parse_string(args.get(1), "key")?;
        context.dispatcher()?.remove_property(target, &key)?;
        Ok(JSValue::Undefined)
    })
}

fn build_set_style() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let key = parse_string(args.get(1), "key")?;
        let value = args.get(2).map(JSValue::to_display_string).unwrap_or_default();
        context.dispatcher()?.set_style(target, &key, &value)?;
        Ok(JSValue::Undefined)
    })
}

/// Build addEvent(target, type) or removeEvent(target, type).
fn build_event(add: bool) -> Arc<HostFnSync<HostContext>> {
    Arc::new(move |context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let target = parse_key(args.first(), "target")?;
        let event = parse_string(args.get(1), "event type")?;
        let mut dispatcher = context.dispatcher()?;
        if add {
            dispatcher.add_event(target, &event)?;
        } else {
            dispatcher.remove_event(target, &event)?;
        }
        Ok(JSValue::Undefined)
    })
}

/// Build disposeNode(id). Never raises for well-formed ids.
fn build_dispose_node() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        context.dispatcher()?.dispose_node(id);
        Ok(JSValue::Undefined)
    })
}

/// Build a query returning a related handle, or `null`.
fn build_relation(relation: fn(&NodeTree, NodeKey) -> Option<NodeKey>) -> Arc<HostFnSync<HostContext>> {
    Arc::new(move |context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let dispatcher = context.dispatcher()?;
        let tree = dispatcher.tree();
        ensure_live(tree, id)?;
        Ok(key_value(relation(tree, id)))
    })
}

fn build_child_count() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let dispatcher = context.dispatcher()?;
        ensure_live(dispatcher.tree(), id)?;
        Ok(JSValue::Number(dispatcher.tree().children(id).len() as f64))
    })
}

fn build_is_connected() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let dispatcher = context.dispatcher()?;
        ensure_live(dispatcher.tree(), id)?;
        Ok(JSValue::Boolean(dispatcher.tree().is_connected(id)))
    })
}

/// Build nodeType(id): the standard code, `null` for the window.
fn build_node_type() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let dispatcher = context.dispatcher()?;
        ensure_live(dispatcher.tree(), id)?;
        Ok(dispatcher
            .tree()
            .node_type(id)
            .and_then(js::NodeType::code)
            .map_or(JSValue::Null, |code| JSValue::Number(f64::from(code))))
    })
}

fn build_text_content() -> Arc<HostFnSync<HostContext>> {
    Arc::new(|context: &HostContext, args: Vec<JSValue>| -> Result<JSValue, JSError> {
        let id = parse_key(args.first(), "id")?;
        let dispatcher = context.dispatcher()?;
        ensure_live(dispatcher.tree(), id)?;
        Ok(dispatcher.tree().text_content(id).map_or(JSValue::Null, JSValue::String))
    })
}

fn ensure_live(tree: &NodeTree, id: NodeKey) -> Result<(), JSError> {
    if tree.contains(id) {
        Ok(())
    } else {
        Err(crate::error::DomError::DanglingReference(id).into())
    }
}
