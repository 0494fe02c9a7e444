//! A DOM index mirror for observer-side lookups.
//!
//! This mirror subscribes to DOMUpdate batches and maintains small indices for
//! readers that live outside the tree owner (for example a render thread): the
//! parent/children relation, tag names, text data and the `id`/`class`
//! properties. It only tracks what is needed for those lookups.

use crate::{DOMSubscriber, DOMUpdate, NodeKey};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Internal mutable state for the DOM index.
#[derive(Default, Debug)]
pub struct DomIndexState {
    /// Map node -> current tag name (for elements), lowercase.
    pub tag_by_key: HashMap<NodeKey, String>,
    /// Map node -> current id property (if any).
    pub id_by_key: HashMap<NodeKey, String>,
    /// Map node -> current class list tokens (lowercase).
    pub classes_by_key: HashMap<NodeKey, HashSet<String>>,
    /// Parent -> ordered children.
    pub children_by_parent: HashMap<NodeKey, Vec<NodeKey>>,
    /// Child -> parent relation.
    pub parent_by_child: HashMap<NodeKey, NodeKey>,
    /// id -> node
    pub id_index: HashMap<String, NodeKey>,
    /// Map text/comment node key -> current character data.
    pub text_by_key: HashMap<NodeKey, String>,
}

impl DomIndexState {
    fn unlink(&mut self, node: NodeKey) {
        if let Some(parent) = self.parent_by_child.remove(&node) {
            if let Some(children) = self.children_by_parent.get_mut(&parent) {
                children.retain(|child| *child != node);
            }
        }
    }

    fn link(&mut self, parent: NodeKey, node: NodeKey, pos: usize) {
        self.unlink(node);
        let children = self.children_by_parent.entry(parent).or_default();
        let pos = pos.min(children.len());
        children.insert(pos, node);
        self.parent_by_child.insert(node, parent);
    }

    /// Forget a disposed node. Its children become parentless, like in the tree.
    fn forget(&mut self, node: NodeKey) {
        self.unlink(node);
        if let Some(children) = self.children_by_parent.remove(&node) {
            for child in children {
                self.parent_by_child.remove(&child);
            }
        }
        self.set_id_for(node, None);
        self.classes_by_key.remove(&node);
        self.tag_by_key.remove(&node);
        self.text_by_key.remove(&node);
    }

    fn set_id_for(&mut self, node: NodeKey, id: Option<&str>) {
        if let Some(old) = self.id_by_key.remove(&node) {
            if self.id_index.get(&old).copied() == Some(node) {
                self.id_index.remove(&old);
            }
        }
        if let Some(id) = id.filter(|value| !value.is_empty()) {
            self.id_by_key.insert(node, id.to_owned());
            self.id_index.insert(id.to_owned(), node);
        }
    }

    /// Update class tokens for a node from a whitespace-separated class list.
    fn set_classes_for(&mut self, node: NodeKey, class_attr: &str) {
        let set: HashSet<String> = class_attr
            .split_whitespace()
            .map(str::to_ascii_lowercase)
            .collect();
        if set.is_empty() {
            self.classes_by_key.remove(&node);
        } else {
            self.classes_by_key.insert(node, set);
        }
    }

    fn apply(&mut self, update: DOMUpdate) {
        match update {
            DOMUpdate::Created { node, tag, data, .. } => {
                if let Some(tag) = tag {
                    self.tag_by_key.insert(node, tag.to_ascii_lowercase());
                }
                if let Some(data) = data {
                    self.text_by_key.insert(node, data);
                }
            }
            DOMUpdate::Inserted { parent, node, pos } => self.link(parent, node, pos),
            DOMUpdate::Removed { node, .. } => self.unlink(node),
            DOMUpdate::SetProperty { node, name, value } => match name.as_str() {
                "id" => self.set_id_for(node, Some(&value.to_display_string())),
                "className" | "class" => self.set_classes_for(node, &value.to_display_string()),
                _ => {}
            },
            DOMUpdate::RemoveProperty { node, name } => match name.as_str() {
                "id" => self.set_id_for(node, None),
                "className" | "class" => {
                    self.classes_by_key.remove(&node);
                }
                _ => {}
            },
            DOMUpdate::SetText { node, data } => {
                self.text_by_key.insert(node, data);
            }
            DOMUpdate::Disposed { node } => self.forget(node),
            DOMUpdate::SetStyle { .. } | DOMUpdate::Cloned { .. } => {}
        }
    }
}

/// A DOMSubscriber implementation that updates a shared DomIndexState.
#[derive(Clone)]
pub struct DomIndex {
    inner: SharedDomIndex,
}

impl DomIndex {
    /// Create a new DomIndex and return the subscriber and its shared state Arc.
    /// The state starts with the body linked under the document, the shape
    /// every context is created with.
    pub fn new() -> (Self, SharedDomIndex) {
        let mut state = DomIndexState::default();
        state.tag_by_key.insert(NodeKey::BODY, String::from("body"));
        state.link(NodeKey::DOCUMENT, NodeKey::BODY, 0);
        let inner = Arc::new(Mutex::new(state));
        (Self { inner: Arc::clone(&inner) }, inner)
    }
}

impl DOMSubscriber for DomIndex {
    /// Apply a DOM update to keep indices current.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| anyhow::anyhow!("DomIndexState poisoned"))?;
        guard.apply(update);
        Ok(())
    }
}

/// Accessor helpers for observers.
impl DomIndexState {
    /// Children of `node` in order.
    pub fn children(&self, node: NodeKey) -> &[NodeKey] {
        self.children_by_parent
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Return the NodeKey for the element with the given id (case-sensitive, as in HTML).
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeKey> {
        self.id_index.get(id).copied()
    }

    /// Return NodeKeys for connected elements with a given tag name (case-insensitive), in DOM order.
    pub fn get_elements_by_tag_name(&self, tag: &str) -> Vec<NodeKey> {
        let needle = tag.to_ascii_lowercase();
        let mut out = Vec::new();
        self.walk(NodeKey::DOCUMENT, &mut |state, node| {
            if state.tag_by_key.get(&node).is_some_and(|tag| *tag == needle) {
                out.push(node);
            }
        });
        out
    }

    /// Return NodeKeys for connected elements carrying the class token, in DOM order.
    pub fn get_elements_by_class_name(&self, class: &str) -> Vec<NodeKey> {
        let needle = class.to_ascii_lowercase();
        let mut out = Vec::new();
        self.walk(NodeKey::DOCUMENT, &mut |state, node| {
            if state.classes_by_key.get(&node).is_some_and(|set| set.contains(&needle)) {
                out.push(node);
            }
        });
        out
    }

    /// Compute the textContent for the given node by concatenating all descendant text data.
    pub fn get_text_content(&self, node: NodeKey) -> String {
        let mut result = String::new();
        self.walk(node, &mut |state, current| {
            if let Some(text) = state.text_by_key.get(&current) {
                result.push_str(text);
            }
        });
        result
    }

    fn walk<V: FnMut(&Self, NodeKey)>(&self, node: NodeKey, visit: &mut V) {
        visit(self, node);
        for child in self.children(node) {
            self.walk(*child, visit);
        }
    }
}

/// Shared handle to the index state.
pub type SharedDomIndex = Arc<Mutex<DomIndexState>>;
