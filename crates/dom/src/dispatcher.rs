//! The command surface of one context.
//!
//! `MutationDispatcher` validates every command against the identifier
//! registry, applies it to the [`NodeTree`], forwards connectivity
//! transitions to the [`RenderBridge`] and publishes one `DOMUpdate` batch per
//! completed command. A failed command publishes nothing and leaves the tree
//! untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use js::{AdjacentPosition, BridgeCommand, DOMUpdate, JSValue, NodeKey, NodeType};
use tokio::sync::broadcast;

use crate::error::DomError;
use crate::factory::ElementFactory;
use crate::node::{DomNode, NativeHandle, NodeKind};
use crate::render::RenderBridge;
use crate::tree::{NodeTree, Transition};

/// Property key that addresses the character data of text and comments.
const DATA_PROPERTY: &str = "data";

/// Where a node sat before a structural command.
struct Placement {
    node: NodeKey,
    parent: Option<NodeKey>,
    index: Option<usize>,
}

/// Owner of a context's tree; applies bridge commands in arrival order.
pub struct MutationDispatcher {
    tree: NodeTree,
    factory: Arc<ElementFactory>,
    render: Box<dyn RenderBridge>,
    updates: broadcast::Sender<Vec<DOMUpdate>>,
}

impl MutationDispatcher {
    /// Build a dispatcher over a fresh tree.
    pub fn new(
        factory: Arc<ElementFactory>,
        render: Box<dyn RenderBridge>,
        updates: broadcast::Sender<Vec<DOMUpdate>>,
    ) -> Self {
        let mut dispatcher = Self { tree: NodeTree::new(), factory, render, updates };
        let roots = dispatcher.tree.connected_subtree(NodeKey::DOCUMENT);
        let transitions: Vec<Transition> =
            roots.into_iter().map(|node| Transition { node, connected: true }).collect();
        dispatcher.notify_render(&transitions);
        dispatcher
    }

    /// Read access to the tree for queries.
    #[inline]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// A new receiver for tree-changed batches.
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<DOMUpdate>> {
        self.updates.subscribe()
    }

    // --- creation ----------------------------------------------------------

    /// `createElement`: register `id` as a detached element of type `tag`.
    ///
    /// # Errors
    /// `DuplicateIdentifier` for a live id, `Argument` for an empty tag or the
    /// root body tag.
    pub fn create_element(
        &mut self,
        id: NodeKey,
        tag: &str,
        properties: BTreeMap<String, JSValue>,
        events: &[String],
    ) -> Result<(), DomError> {
        self.create_element_with_native(id, tag, None, properties, events)
    }

    /// [`Self::create_element`] for an element backed by a native object.
    ///
    /// # Errors
    /// As [`Self::create_element`].
    pub fn create_element_with_native(
        &mut self,
        id: NodeKey,
        tag: &str,
        native: Option<NativeHandle>,
        properties: BTreeMap<String, JSValue>,
        events: &[String],
    ) -> Result<(), DomError> {
        if self.tree.contains(id) {
            return Err(DomError::DuplicateIdentifier(id));
        }
        if tag.is_empty() {
            return Err(DomError::Argument(String::from("element tag must not be empty")));
        }
        let Some(mut data) = self.factory.create_for(id, tag, native) else {
            return Err(DomError::Argument(format!(
                "'{tag}' is created with the context and cannot be created for {id}"
            )));
        };

        let mut batch = Vec::with_capacity(properties.len() + 1);
        batch.push(DOMUpdate::Created {
            node: id,
            node_type: NodeType::Element,
            tag: Some(data.tag.clone()),
            data: None,
        });
        for (name, value) in properties {
            batch.push(DOMUpdate::SetProperty { node: id, name: name.clone(), value: value.clone() });
            data.properties.insert(name, value);
        }
        self.tree.insert_node(id, NodeKind::Element(data))?;
        if let Some(node) = self.tree.node_mut(id) {
            for event in events {
                node.add_event(event);
            }
        }
        self.publish(batch);
        Ok(())
    }

    /// `createTextNode`.
    ///
    /// # Errors
    /// `DuplicateIdentifier` for a live id.
    pub fn create_text_node(&mut self, id: NodeKey, data: &str) -> Result<(), DomError> {
        self.create_leaf(id, NodeKind::Text(data.to_owned()))
    }

    /// `createComment`.
    ///
    /// # Errors
    /// `DuplicateIdentifier` for a live id.
    pub fn create_comment(&mut self, id: NodeKey, data: &str) -> Result<(), DomError> {
        self.create_leaf(id, NodeKind::Comment(data.to_owned()))
    }

    /// `createDocumentFragment`.
    ///
    /// # Errors
    /// `DuplicateIdentifier` for a live id.
    pub fn create_document_fragment(&mut self, id: NodeKey) -> Result<(), DomError> {
        self.create_leaf(id, NodeKind::DocumentFragment)
    }

    fn create_leaf(&mut self, id: NodeKey, kind: NodeKind) -> Result<(), DomError> {
        let created = DOMUpdate::Created {
            node: id,
            node_type: kind.node_type(),
            tag: None,
            data: kind.character_data().map(str::to_owned),
        };
        self.tree.insert_node(id, kind)?;
        self.publish(vec![created]);
        Ok(())
    }

    // --- structure ---------------------------------------------------------

    /// `cloneNode`: shallow copy of `source`'s state onto `target`.
    ///
    /// # Errors
    /// `DanglingReference`, or `Argument` for identical or mismatched nodes.
    pub fn clone_node(&mut self, source: NodeKey, target: NodeKey) -> Result<(), DomError> {
        let stale: Vec<String> = self
            .tree
            .node(target)
            .and_then(DomNode::element)
            .map(|data| data.properties.keys().cloned().collect())
            .unwrap_or_default();
        self.tree.clone_into(source, target)?;

        let mut batch = vec![DOMUpdate::Cloned { source, target }];
        match self.tree.node(target).map(DomNode::kind) {
            Some(NodeKind::Element(data)) => {
                let removed = stale.into_iter().filter(|name| !data.properties.contains_key(name));
                batch.extend(removed.map(|name| DOMUpdate::RemoveProperty { node: target, name }));
                batch.extend(data.properties.iter().map(|(name, value)| DOMUpdate::SetProperty {
                    node: target,
                    name: name.clone(),
                    value: value.clone(),
                }));
                batch.extend(data.style.iter().map(|(name, value)| DOMUpdate::SetStyle {
                    node: target,
                    name: name.clone(),
                    value: value.clone(),
                }));
            }
            Some(NodeKind::Text(data) | NodeKind::Comment(data)) => {
                batch.push(DOMUpdate::SetText { node: target, data: data.clone() });
            }
            _ => {}
        }
        self.publish(batch);
        Ok(())
    }

    /// `removeNode`: detach `id` from its current parent. The handle stays
    /// registered; a parentless node is left alone.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn remove_node(&mut self, id: NodeKey) -> Result<(), DomError> {
        if !self.tree.contains(id) {
            return Err(DomError::DanglingReference(id));
        }
        let Some(parent) = self.tree.parent(id) else {
            log::debug!("removeNode on detached {id} ignored");
            return Ok(());
        };
        let detached: Vec<Transition> = self
            .tree
            .connected_subtree(id)
            .into_iter()
            .map(|node| Transition { node, connected: false })
            .collect();
        self.notify_render(&detached);
        self.tree.remove_child(parent, id)?;
        self.publish(vec![DOMUpdate::Removed { parent, node: id }]);
        Ok(())
    }

    /// `appendChild`.
    ///
    /// # Errors
    /// `DanglingReference`, `Argument` or `CyclicInsertion`.
    pub fn append_child(&mut self, parent: NodeKey, node: NodeKey) -> Result<(), DomError> {
        let before = self.placements(node);
        self.structural(before, |tree| tree.append_child(parent, node))
    }

    /// `insertBefore`; `None` appends.
    ///
    /// # Errors
    /// As [`Self::append_child`], plus `NotFound` for a foreign reference.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        node: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<(), DomError> {
        let before = self.placements(node);
        self.structural(before, |tree| tree.insert_before(parent, node, reference))
    }

    /// `removeChild`.
    ///
    /// # Errors
    /// `DanglingReference` or `NotFound`.
    pub fn remove_child(&mut self, parent: NodeKey, node: NodeKey) -> Result<(), DomError> {
        let transitions = self.tree.remove_child(parent, node)?;
        self.notify_render(&transitions);
        self.publish(vec![DOMUpdate::Removed { parent, node }]);
        Ok(())
    }

    /// `replaceChild`.
    ///
    /// # Errors
    /// As [`Self::insert_before`] with `old_child` as reference.
    pub fn replace_child(
        &mut self,
        parent: NodeKey,
        new_child: NodeKey,
        old_child: NodeKey,
    ) -> Result<(), DomError> {
        let mut before = vec![self.placement(old_child)];
        before.extend(self.placements(new_child));
        self.structural(before, |tree| tree.replace_child(parent, new_child, old_child))
    }

    /// `insertAdjacentNode`.
    ///
    /// # Errors
    /// As [`Self::insert_before`].
    pub fn insert_adjacent_node(
        &mut self,
        target: NodeKey,
        position: AdjacentPosition,
        node: NodeKey,
    ) -> Result<(), DomError> {
        let before = self.placements(node);
        self.structural(before, |tree| tree.insert_adjacent(target, position, node))
    }

    /// Run a tree insertion, then report render transitions and how the
    /// tracked nodes moved.
    fn structural<F>(&mut self, before: Vec<Placement>, operation: F) -> Result<(), DomError>
    where
        F: FnOnce(&mut NodeTree) -> Result<Vec<Transition>, DomError>,
    {
        let transitions = operation(&mut self.tree)?;
        self.notify_render(&transitions);

        let mut batch = Vec::new();
        for placement in before {
            let parent = self.tree.parent(placement.node);
            let index = self.tree.index_in_parent(placement.node);
            if parent == placement.parent && index == placement.index {
                continue;
            }
            if let Some(old_parent) = placement.parent {
                batch.push(DOMUpdate::Removed { parent: old_parent, node: placement.node });
            }
            if let (Some(parent), Some(pos)) = (parent, index) {
                batch.push(DOMUpdate::Inserted { parent, node: placement.node, pos });
            }
        }
        self.publish(batch);
        Ok(())
    }

    /// The nodes an insertion of `node` can move: a fragment's children, or
    /// the node itself.
    fn placements(&self, node: NodeKey) -> Vec<Placement> {
        let moved = match self.tree.node_type(node) {
            Some(NodeType::DocumentFragment) => self.tree.children(node),
            _ => vec![node],
        };
        moved.into_iter().map(|node| self.placement(node)).collect()
    }

    fn placement(&self, node: NodeKey) -> Placement {
        Placement { node, parent: self.tree.parent(node), index: self.tree.index_in_parent(node) }
    }

    // --- properties, style, events ------------------------------------------

    /// `setProperty`. Text and comment nodes accept only `data`; other
    /// non-element targets are ignored.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn set_property(&mut self, target: NodeKey, key: &str, value: JSValue) -> Result<(), DomError> {
        let node = self.tree.node_mut(target).ok_or(DomError::DanglingReference(target))?;
        let update = match node.kind_mut() {
            NodeKind::Element(data) => {
                data.properties.insert(key.to_owned(), value.clone());
                DOMUpdate::SetProperty { node: target, name: key.to_owned(), value }
            }
            NodeKind::Text(data) | NodeKind::Comment(data) if key == DATA_PROPERTY => {
                *data = value.to_display_string();
                DOMUpdate::SetText { node: target, data: data.clone() }
            }
            other => {
                log::debug!("setProperty('{key}') ignored on {:?} node {target}", other.node_type());
                return Ok(());
            }
        };
        self.publish(vec![update]);
        Ok(())
    }

    /// `getProperty`; `undefined` when unset or not applicable.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn get_property(&self, target: NodeKey, key: &str) -> Result<JSValue, DomError> {
        let node = self.tree.node(target).ok_or(DomError::DanglingReference(target))?;
        let value = match node.kind() {
            NodeKind::Element(data) => data.properties.get(key).cloned(),
            NodeKind::Text(data) | NodeKind::Comment(data) if key == DATA_PROPERTY => {
                Some(JSValue::String(data.clone()))
            }
            other => {
                log::debug!("getProperty('{key}') on {:?} node {target}", other.node_type());
                None
            }
        };
        Ok(value.unwrap_or(JSValue::Undefined))
    }

    /// `removeProperty`.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn remove_property(&mut self, target: NodeKey, key: &str) -> Result<(), DomError> {
        let node = self.tree.node_mut(target).ok_or(DomError::DanglingReference(target))?;
        let Some(data) = node.element_mut() else {
            log::debug!("removeProperty('{key}') ignored on {:?} node {target}", node.node_type());
            return Ok(());
        };
        if data.properties.remove(key).is_some() {
            self.publish(vec![DOMUpdate::RemoveProperty { node: target, name: key.to_owned() }]);
        }
        Ok(())
    }

    /// `setStyle`.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn set_style(&mut self, target: NodeKey, key: &str, value: &str) -> Result<(), DomError> {
        let node = self.tree.node_mut(target).ok_or(DomError::DanglingReference(target))?;
        let Some(data) = node.element_mut() else {
            log::debug!("setStyle('{key}') ignored on {:?} node {target}", node.node_type());
            return Ok(());
        };
        data.style.insert(key.to_owned(), value.to_owned());
        self.publish(vec![DOMUpdate::SetStyle {
            node: target,
            name: key.to_owned(),
            value: value.to_owned(),
        }]);
        Ok(())
    }

    /// `addEvent`: record `event` on the target.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn add_event(&mut self, target: NodeKey, event: &str) -> Result<(), DomError> {
        let node = self.tree.node_mut(target).ok_or(DomError::DanglingReference(target))?;
        node.add_event(event);
        Ok(())
    }

    /// `removeEvent`.
    ///
    /// # Errors
    /// `DanglingReference`.
    pub fn remove_event(&mut self, target: NodeKey, event: &str) -> Result<(), DomError> {
        let node = self.tree.node_mut(target).ok_or(DomError::DanglingReference(target))?;
        if !node.remove_event(event) {
            log::debug!("removeEvent('{event}') on {target} had nothing to remove");
        }
        Ok(())
    }

    // --- lifecycle ---------------------------------------------------------

    /// `disposeNode`: release `id` for good. Unknown, already disposed and
    /// reserved ids are ignored. An attached node is detached first; its
    /// children become parentless and stay registered.
    pub fn dispose_node(&mut self, id: NodeKey) {
        if id.is_reserved() {
            log::debug!("disposeNode ignored reserved {id}");
            return;
        }
        let Some(disposal) = self.tree.dispose(id) else {
            log::debug!("disposeNode ignored unknown {id}");
            return;
        };
        self.notify_render(&disposal.transitions);

        let mut batch = Vec::with_capacity(disposal.orphans.len() + 2);
        if let Some(parent) = disposal.former_parent {
            batch.push(DOMUpdate::Removed { parent, node: id });
        }
        batch.extend(disposal.orphans.into_iter().map(|orphan| DOMUpdate::Removed { parent: id, node: orphan }));
        batch.push(DOMUpdate::Disposed { node: id });
        self.publish(batch);
    }

    /// Dispose every live non-reserved node. Returns how many were released.
    pub fn sweep(&mut self) -> usize {
        let leaked: Vec<NodeKey> = self.tree.handles().into_iter().filter(|handle| !handle.is_reserved()).collect();
        for handle in &leaked {
            self.dispose_node(*handle);
        }
        leaked.len()
    }

    // --- command entry point ------------------------------------------------

    /// Apply one decoded bridge command. Returns the value a query produced,
    /// `undefined` otherwise.
    ///
    /// # Errors
    /// Whatever the addressed operation reports.
    pub fn apply(&mut self, command: BridgeCommand) -> Result<JSValue, DomError> {
        match command {
            BridgeCommand::CreateElement { id, tag, properties, events } => {
                self.create_element(id, &tag, properties, &events)?;
            }
            BridgeCommand::CreateTextNode { id, data } => self.create_text_node(id, &data)?,
            BridgeCommand::CreateComment { id, data } => self.create_comment(id, &data)?,
            BridgeCommand::CreateDocumentFragment { id } => self.create_document_fragment(id)?,
            BridgeCommand::CloneNode { source, target } => self.clone_node(source, target)?,
            BridgeCommand::RemoveNode { id } => self.remove_node(id)?,
            BridgeCommand::AppendChild { parent, node } => self.append_child(parent, node)?,
            BridgeCommand::InsertBefore { parent, node, reference } => {
                self.insert_before(parent, node, reference)?;
            }
            BridgeCommand::RemoveChild { parent, node } => self.remove_child(parent, node)?,
            BridgeCommand::ReplaceChild { parent, new_child, old_child } => {
                self.replace_child(parent, new_child, old_child)?;
            }
            BridgeCommand::InsertAdjacentNode { target, position, node } => {
                self.insert_adjacent_node(target, position, node)?;
            }
            BridgeCommand::SetProperty { target, key, value } => self.set_property(target, &key, value)?,
            BridgeCommand::GetProperty { target, key } => return self.get_property(target, &key),
            BridgeCommand::RemoveProperty { target, key } => self.remove_property(target, &key)?,
            BridgeCommand::SetStyle { target, key, value } => self.set_style(target, &key, &value)?,
            BridgeCommand::AddEvent { target, event } => self.add_event(target, &event)?,
            BridgeCommand::RemoveEvent { target, event } => self.remove_event(target, &event)?,
            BridgeCommand::DisposeNode { id } => self.dispose_node(id),
        }
        Ok(JSValue::Undefined)
    }

    // --- collaborators -----------------------------------------------------

    fn notify_render(&mut self, transitions: &[Transition]) {
        for transition in transitions {
            let result = if transition.connected {
                match self.tree.node(transition.node) {
                    Some(node) => self.render.attach(transition.node, node),
                    None => continue,
                }
            } else {
                self.render.detach(transition.node)
            };
            if let Err(error) = result {
                let error = DomError::RenderAdapter { node: transition.node, reason: format!("{error:#}") };
                log::warn!("{error}");
            }
        }
    }

    fn publish(&self, batch: Vec<DOMUpdate>) {
        if batch.is_empty() {
            return;
        }
        if self.updates.send(batch).is_err() {
            log::trace!("no tree-changed subscribers; batch dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingRenderBridge, RenderEvent};

    fn dispatcher() -> (MutationDispatcher, RecordingRenderBridge, broadcast::Receiver<Vec<DOMUpdate>>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let render = RecordingRenderBridge::new();
        let (updates, receiver) = broadcast::channel(64);
        let dispatcher = MutationDispatcher::new(
            Arc::new(ElementFactory::with_builtin_types()),
            Box::new(render.clone()),
            updates,
        );
        render.take_events();
        (dispatcher, render, receiver)
    }

    fn div(dispatcher: &mut MutationDispatcher, id: i64) -> NodeKey {
        dispatcher.create_element(NodeKey(id), "div", BTreeMap::new(), &[]).expect("create");
        NodeKey(id)
    }

    #[test]
    fn creation_rejects_live_ids() {
        let (mut dispatcher, _, _) = dispatcher();
        let node = div(&mut dispatcher, 1);
        assert_eq!(
            dispatcher.create_text_node(node, "x"),
            Err(DomError::DuplicateIdentifier(node))
        );
        assert_eq!(
            dispatcher.create_element(NodeKey::BODY, "div", BTreeMap::new(), &[]),
            Err(DomError::DuplicateIdentifier(NodeKey::BODY))
        );
        assert!(matches!(
            dispatcher.create_element(NodeKey(2), "body", BTreeMap::new(), &[]),
            Err(DomError::Argument(_))
        ));
        assert!(!dispatcher.tree().contains(NodeKey(2)));
    }

    #[test]
    fn dangling_references_are_reported() {
        let (mut dispatcher, _, _) = dispatcher();
        let missing = NodeKey(42);
        assert_eq!(dispatcher.remove_node(missing), Err(DomError::DanglingReference(missing)));
        assert_eq!(dispatcher.set_style(missing, "color", "red"), Err(DomError::DanglingReference(missing)));
        assert_eq!(dispatcher.get_property(missing, "id"), Err(DomError::DanglingReference(missing)));
        assert_eq!(
            dispatcher.insert_adjacent_node(NodeKey::BODY, AdjacentPosition::BeforeEnd, missing),
            Err(DomError::DanglingReference(missing))
        );
    }

    #[test]
    fn render_sees_each_transition_once() {
        let (mut dispatcher, render, _) = dispatcher();
        let outer = div(&mut dispatcher, 1);
        let inner = div(&mut dispatcher, 2);
        dispatcher.append_child(outer, inner).expect("append");
        assert!(render.events().is_empty());

        dispatcher.append_child(NodeKey::BODY, outer).expect("attach");
        dispatcher.append_child(NodeKey::BODY, outer).expect("move within connected tree");
        assert_eq!(render.take_events(), vec![
            RenderEvent::Attach { node: outer, node_type: NodeType::Element },
            RenderEvent::Attach { node: inner, node_type: NodeType::Element },
        ]);

        dispatcher.remove_node(outer).expect("remove");
        dispatcher.remove_node(outer).expect("already detached");
        assert_eq!(render.take_events(), vec![
            RenderEvent::Detach { node: outer },
            RenderEvent::Detach { node: inner },
        ]);
        assert!(dispatcher.tree().contains(outer));
        assert!(!dispatcher.tree().is_connected(inner));
    }

    #[test]
    fn render_failures_do_not_roll_back() {
        let (mut dispatcher, render, _) = dispatcher();
        let node = div(&mut dispatcher, 1);
        render.fail_for(node);
        dispatcher.append_child(NodeKey::BODY, node).expect("logical insert succeeds");
        assert!(dispatcher.tree().is_connected(node));
        assert!(!render.is_attached(node));
    }

    #[test]
    fn properties_follow_node_kind() {
        let (mut dispatcher, _, _) = dispatcher();
        let node = div(&mut dispatcher, 1);
        dispatcher.set_property(node, "title", JSValue::from("hello")).expect("set");
        assert_eq!(dispatcher.get_property(node, "title"), Ok(JSValue::from("hello")));
        dispatcher.remove_property(node, "title").expect("remove");
        assert_eq!(dispatcher.get_property(node, "title"), Ok(JSValue::Undefined));

        let text = NodeKey(2);
        dispatcher.create_text_node(text, "before").expect("text");
        dispatcher.set_property(text, "data", JSValue::from("after")).expect("data");
        dispatcher.set_property(text, "title", JSValue::from("ignored")).expect("no-op");
        dispatcher.set_style(text, "color", "red").expect("no-op");
        assert_eq!(dispatcher.get_property(text, "data"), Ok(JSValue::from("after")));
        assert_eq!(dispatcher.get_property(text, "title"), Ok(JSValue::Undefined));
    }

    #[test]
    fn events_are_recorded_on_any_target() {
        let (mut dispatcher, _, _) = dispatcher();
        dispatcher
            .create_element(NodeKey(1), "button", BTreeMap::new(), &[String::from("click")])
            .expect("create");
        dispatcher.add_event(NodeKey::WINDOW, "resize").expect("window event");
        dispatcher.remove_event(NodeKey(1), "click").expect("remove");
        dispatcher.remove_event(NodeKey(1), "click").expect("remove twice");
        let tree = dispatcher.tree();
        assert!(tree.node(NodeKey::WINDOW).is_some_and(|node| node.has_event("resize")));
        assert!(tree.node(NodeKey(1)).is_some_and(|node| node.events().next().is_none()));
    }

    #[test]
    fn dispose_is_idempotent_and_publishes_once() {
        let (mut dispatcher, render, mut receiver) = dispatcher();
        let parent = div(&mut dispatcher, 1);
        let child = div(&mut dispatcher, 2);
        dispatcher.append_child(parent, child).expect("append");
        dispatcher.append_child(NodeKey::BODY, parent).expect("attach");
        while receiver.try_recv().is_ok() {}
        render.take_events();

        dispatcher.dispose_node(parent);
        dispatcher.dispose_node(parent);
        dispatcher.dispose_node(NodeKey(999));
        dispatcher.dispose_node(NodeKey::BODY);

        assert_eq!(receiver.try_recv().expect("one batch"), vec![
            DOMUpdate::Removed { parent: NodeKey::BODY, node: parent },
            DOMUpdate::Removed { parent, node: child },
            DOMUpdate::Disposed { node: parent },
        ]);
        assert!(receiver.try_recv().is_err());
        assert_eq!(render.take_events(), vec![
            RenderEvent::Detach { node: parent },
            RenderEvent::Detach { node: child },
        ]);
        assert!(dispatcher.tree().contains(child));
        assert!(dispatcher.tree().contains(NodeKey::BODY));
    }

    #[test]
    fn commands_route_through_apply() {
        let (mut dispatcher, _, _) = dispatcher();
        let create = BridgeCommand::from_json(
            r#"{"command":"createElement","id":1,"tag":"p","properties":{"id":"intro"}}"#,
        )
        .expect("decode");
        dispatcher.apply(create).expect("create");
        dispatcher
            .apply(BridgeCommand::InsertAdjacentNode {
                target: NodeKey::BODY,
                position: AdjacentPosition::AfterBegin,
                node: NodeKey(1),
            })
            .expect("insert");
        let value = dispatcher
            .apply(BridgeCommand::GetProperty { target: NodeKey(1), key: String::from("id") })
            .expect("query");
        assert_eq!(value, JSValue::from("intro"));
        assert_eq!(dispatcher.tree().children(NodeKey::BODY), vec![NodeKey(1)]);
    }

    #[test]
    fn structural_commands_apply_through_the_channel_schema() {
        let (mut dispatcher, _, _) = dispatcher();
        let commands = [
            r#"{"command":"createDocumentFragment","id":10}"#,
            r#"{"command":"createElement","id":1,"tag":"li"}"#,
            r#"{"command":"createElement","id":2,"tag":"li"}"#,
            r#"{"command":"createElement","id":3,"tag":"li"}"#,
            r#"{"command":"appendChild","parent":10,"node":1}"#,
            r#"{"command":"appendChild","parent":-1,"node":10}"#,
            r#"{"command":"insertBefore","parent":-1,"node":2,"reference":1}"#,
            r#"{"command":"replaceChild","parent":-1,"newChild":3,"oldChild":2}"#,
            r#"{"command":"removeChild","parent":-1,"node":1}"#,
        ];
        for payload in commands {
            let command = BridgeCommand::from_json(payload).expect("decode");
            dispatcher.apply(command).expect(payload);
        }
        let tree = dispatcher.tree();
        assert_eq!(tree.children(NodeKey::BODY), vec![NodeKey(3)]);
        assert!(tree.children(NodeKey(10)).is_empty());
        assert_eq!(tree.parent(NodeKey(2)), None);
        tree.check_invariants().expect("invariants");
    }

    #[test]
    fn batches_with_engine_only_values_still_serialize() {
        let (mut dispatcher, _, mut receiver) = dispatcher();
        let node = div(&mut dispatcher, 1);
        receiver.try_recv().expect("created");
        dispatcher.set_property(node, "onclick", JSValue::Undefined).expect("undefined");
        dispatcher.set_property(node, "handler", JSValue::Function(js::JsFunctionRef(3))).expect("function");

        for _ in 0..2 {
            let batch = receiver.try_recv().expect("batch");
            let json = serde_json::to_value(&batch).expect("serializable batch");
            assert_eq!(json[0]["value"], serde_json::Value::Null);
            let decoded: Vec<DOMUpdate> = serde_json::from_value(json).expect("decodable batch");
            assert!(matches!(&decoded[0], DOMUpdate::SetProperty { value: JSValue::Null, .. }));
        }
    }
}
