//! Arena-backed node tree.
//!
//! Nodes live in an `indextree` arena; the identifier registry maps the
//! scripting side's handles onto arena ids. Every structural operation
//! validates all of its preconditions before touching the arena, so a failed
//! command leaves the tree exactly as it was.
//!
//! Connectivity is stored per node and recomputed only for the subtree that
//! moved. Each recomputation reports the nodes whose flag flipped, in
//! pre-order, so the caller can forward attach/detach transitions.

use indextree::{Arena, NodeId};
use js::{AdjacentPosition, NodeKey, NodeType};

use crate::error::DomError;
use crate::factory::ROOT_BODY_TAG;
use crate::node::{DomNode, ElementData, NodeKind};
use crate::registry::IdentifierRegistry;

/// A node whose connected flag flipped during an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub node: NodeKey,
    pub connected: bool,
}

/// Outcome of disposing a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disposal {
    /// Parent the node was detached from, if any.
    pub former_parent: Option<NodeKey>,
    /// Children left parentless, in their former order.
    pub orphans: Vec<NodeKey>,
    pub transitions: Vec<Transition>,
}

/// The node tree of one context.
pub struct NodeTree {
    arena: Arena<DomNode>,
    registry: IdentifierRegistry<NodeId>,
}

impl NodeTree {
    /// A tree holding the document, the window and the root body element.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let mut registry = IdentifierRegistry::new();

        let mut document_node = DomNode::new(NodeKey::DOCUMENT, NodeKind::Document);
        document_node.connected = true;
        let mut body_node =
            DomNode::new(NodeKey::BODY, NodeKind::Element(ElementData::new(ROOT_BODY_TAG)));
        body_node.connected = true;

        let document = arena.new_node(document_node);
        let window = arena.new_node(DomNode::new(NodeKey::WINDOW, NodeKind::Window));
        let body = arena.new_node(body_node);
        document.append(body, &mut arena);

        registry.seed(NodeKey::DOCUMENT, document);
        registry.seed(NodeKey::WINDOW, window);
        registry.seed(NodeKey::BODY, body);
        Self { arena, registry }
    }

    /// Register a new, detached node under `handle`.
    ///
    /// # Errors
    /// `DuplicateIdentifier` when `handle` is live.
    pub fn insert_node(&mut self, handle: NodeKey, kind: NodeKind) -> Result<(), DomError> {
        if self.registry.contains(handle) {
            return Err(DomError::DuplicateIdentifier(handle));
        }
        let id = self.arena.new_node(DomNode::new(handle, kind));
        if let Err(error) = self.registry.register(handle, id) {
            id.remove(&mut self.arena);
            return Err(error);
        }
        Ok(())
    }

    // --- queries -----------------------------------------------------------

    #[inline]
    pub fn contains(&self, handle: NodeKey) -> bool {
        self.registry.contains(handle)
    }

    /// Number of live nodes, reserved ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Live handles in ascending order.
    pub fn handles(&self) -> Vec<NodeKey> {
        self.registry.handles()
    }

    pub fn node(&self, handle: NodeKey) -> Option<&DomNode> {
        let id = *self.registry.lookup(handle)?;
        self.arena.get(id).map(indextree::Node::get)
    }

    pub(crate) fn node_mut(&mut self, handle: NodeKey) -> Option<&mut DomNode> {
        let id = *self.registry.lookup(handle)?;
        self.arena.get_mut(id).map(indextree::Node::get_mut)
    }

    pub fn parent(&self, handle: NodeKey) -> Option<NodeKey> {
        let id = *self.registry.lookup(handle)?;
        self.arena[id].parent().map(|parent| self.key_of(parent))
    }

    /// Children of `handle` in order; empty for unknown handles.
    pub fn children(&self, handle: NodeKey) -> Vec<NodeKey> {
        match self.registry.lookup(handle) {
            Some(id) => id.children(&self.arena).map(|child| self.key_of(child)).collect(),
            None => Vec::new(),
        }
    }

    pub fn first_child(&self, handle: NodeKey) -> Option<NodeKey> {
        let id = *self.registry.lookup(handle)?;
        self.arena[id].first_child().map(|child| self.key_of(child))
    }

    pub fn last_child(&self, handle: NodeKey) -> Option<NodeKey> {
        let id = *self.registry.lookup(handle)?;
        self.arena[id].last_child().map(|child| self.key_of(child))
    }

    pub fn previous_sibling(&self, handle: NodeKey) -> Option<NodeKey> {
        let id = *self.registry.lookup(handle)?;
        self.arena[id].previous_sibling().map(|sibling| self.key_of(sibling))
    }

    pub fn next_sibling(&self, handle: NodeKey) -> Option<NodeKey> {
        let id = *self.registry.lookup(handle)?;
        self.arena[id].next_sibling().map(|sibling| self.key_of(sibling))
    }

    /// Position of `handle` among its parent's children.
    pub fn index_in_parent(&self, handle: NodeKey) -> Option<usize> {
        let id = *self.registry.lookup(handle)?;
        let parent = self.arena[id].parent()?;
        parent.children(&self.arena).position(|child| child == id)
    }

    pub fn node_type(&self, handle: NodeKey) -> Option<NodeType> {
        self.node(handle).map(DomNode::node_type)
    }

    /// The owning document, `None` for the document itself.
    pub fn owner_document(&self, handle: NodeKey) -> Option<NodeKey> {
        self.node(handle)?.owner_document()
    }

    pub fn is_connected(&self, handle: NodeKey) -> bool {
        self.node(handle).is_some_and(DomNode::is_connected)
    }

    /// `textContent`: character data for text and comments, the concatenated
    /// descendant text for containers, `None` for the window.
    pub fn text_content(&self, handle: NodeKey) -> Option<String> {
        let id = *self.registry.lookup(handle)?;
        match self.arena[id].get().kind() {
            NodeKind::Window => None,
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
            NodeKind::Element(_) | NodeKind::Document | NodeKind::DocumentFragment => Some(
                id.descendants(&self.arena)
                    .filter_map(|descendant| match self.arena[descendant].get().kind() {
                        NodeKind::Text(data) => Some(data.as_str()),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }

    /// Connected nodes of the subtree rooted at `handle`, in pre-order.
    pub fn connected_subtree(&self, handle: NodeKey) -> Vec<NodeKey> {
        let Some(id) = self.registry.lookup(handle) else {
            return Vec::new();
        };
        id.descendants(&self.arena)
            .filter(|descendant| self.arena[*descendant].get().is_connected())
            .map(|descendant| self.key_of(descendant))
            .collect()
    }

    // --- structural mutations ---------------------------------------------

    /// Append `node` as the last child of `parent`, moving it if attached.
    ///
    /// # Errors
    /// `DanglingReference`, `Argument` for kinds that cannot take part, or
    /// `CyclicInsertion`.
    pub fn append_child(&mut self, parent: NodeKey, node: NodeKey) -> Result<Vec<Transition>, DomError> {
        let parent_id = self.resolve(parent)?;
        let node_id = self.resolve(node)?;
        self.ensure_insertable(parent_id, node_id)?;
        self.insert_at(parent_id, node_id, None)
    }

    /// Insert `node` before `reference` under `parent`; `None` appends.
    ///
    /// # Errors
    /// As [`Self::append_child`], plus `NotFound` when `reference` is not a
    /// child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeKey,
        node: NodeKey,
        reference: Option<NodeKey>,
    ) -> Result<Vec<Transition>, DomError> {
        let Some(reference) = reference else {
            return self.append_child(parent, node);
        };
        let parent_id = self.resolve(parent)?;
        let node_id = self.resolve(node)?;
        let reference_id = self.resolve(reference)?;
        if self.arena[reference_id].parent() != Some(parent_id) {
            return Err(DomError::NotFound { parent, node: reference });
        }
        self.ensure_insertable(parent_id, node_id)?;
        if reference_id == node_id {
            return Ok(Vec::new());
        }
        self.insert_at(parent_id, node_id, Some(reference_id))
    }

    /// Detach `node` from `parent`. The node stays registered.
    ///
    /// # Errors
    /// `DanglingReference`, or `NotFound` when `node` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, node: NodeKey) -> Result<Vec<Transition>, DomError> {
        let parent_id = self.resolve(parent)?;
        let node_id = self.resolve(node)?;
        if self.arena[node_id].parent() != Some(parent_id) {
            return Err(DomError::NotFound { parent, node });
        }
        node_id.detach(&mut self.arena);
        Ok(self.refresh_connected(node_id))
    }

    /// Put `new_child` where `old_child` is and detach `old_child`.
    ///
    /// # Errors
    /// As [`Self::insert_before`] with `old_child` as the reference.
    pub fn replace_child(
        &mut self,
        parent: NodeKey,
        new_child: NodeKey,
        old_child: NodeKey,
    ) -> Result<Vec<Transition>, DomError> {
        let parent_id = self.resolve(parent)?;
        let new_id = self.resolve(new_child)?;
        let old_id = self.resolve(old_child)?;
        if self.arena[old_id].parent() != Some(parent_id) {
            return Err(DomError::NotFound { parent, node: old_child });
        }
        self.ensure_insertable(parent_id, new_id)?;
        if new_id == old_id {
            return Ok(Vec::new());
        }
        let mut transitions = self.insert_at(parent_id, new_id, Some(old_id))?;
        old_id.detach(&mut self.arena);
        transitions.extend(self.refresh_connected(old_id));
        Ok(transitions)
    }

    /// Place `node` relative to `target`.
    ///
    /// `beforebegin` and `afterend` on a parentless target do nothing.
    ///
    /// # Errors
    /// As [`Self::insert_before`].
    pub fn insert_adjacent(
        &mut self,
        target: NodeKey,
        position: AdjacentPosition,
        node: NodeKey,
    ) -> Result<Vec<Transition>, DomError> {
        let target_id = self.resolve(target)?;
        self.resolve(node)?;
        let parent = self.arena[target_id].parent().map(|parent| self.key_of(parent));
        match position {
            AdjacentPosition::BeforeBegin => match parent {
                Some(parent) => self.insert_before(parent, node, Some(target)),
                None => Ok(Vec::new()),
            },
            AdjacentPosition::AfterBegin => {
                let first = self.arena[target_id].first_child().map(|child| self.key_of(child));
                self.insert_before(target, node, first)
            }
            AdjacentPosition::BeforeEnd => self.append_child(target, node),
            AdjacentPosition::AfterEnd => match parent {
                Some(parent) => {
                    let next = self.arena[target_id].next_sibling().map(|sibling| self.key_of(sibling));
                    self.insert_before(parent, node, next)
                }
                None => Ok(Vec::new()),
            },
        }
    }

    /// Copy `source`'s state onto `target`.
    ///
    /// Elements get `source`'s property bag and have its style merged in;
    /// text and comments copy their data. Children and events are not copied.
    ///
    /// # Errors
    /// `DanglingReference`, or `Argument` when the two are the same node or of
    /// different kinds.
    pub fn clone_into(&mut self, source: NodeKey, target: NodeKey) -> Result<(), DomError> {
        let source_id = self.resolve(source)?;
        let target_id = self.resolve(target)?;
        if source_id == target_id {
            return Err(DomError::Argument(format!("cannot clone {source} into itself")));
        }
        let source_kind = self.arena[source_id].get().kind().clone();
        let target_kind = self.arena[target_id].get_mut().kind_mut();
        match (source_kind, target_kind) {
            (NodeKind::Element(from), NodeKind::Element(to)) => {
                to.properties = from.properties;
                to.style.extend(from.style);
            }
            (NodeKind::Text(data), NodeKind::Text(to)) | (NodeKind::Comment(data), NodeKind::Comment(to)) => {
                *to = data;
            }
            (from, to) if from.node_type() == to.node_type() => {}
            (from, to) => {
                return Err(DomError::Argument(format!(
                    "cannot clone a {:?} node into a {:?} node",
                    from.node_type(),
                    to.node_type()
                )));
            }
        }
        Ok(())
    }

    /// Detach `handle`, orphan its children, unregister it and free its slot.
    ///
    /// Returns `None` for reserved or unknown handles.
    pub fn dispose(&mut self, handle: NodeKey) -> Option<Disposal> {
        if handle.is_reserved() {
            return None;
        }
        let id = self.registry.unregister(handle)?;
        let former_parent = self.arena[id].parent().map(|parent| self.key_of(parent));
        id.detach(&mut self.arena);
        let mut transitions = self.refresh_connected(id);

        let children: Vec<NodeId> = id.children(&self.arena).collect();
        let mut orphans = Vec::with_capacity(children.len());
        for child in children {
            child.detach(&mut self.arena);
            transitions.extend(self.refresh_connected(child));
            orphans.push(self.key_of(child));
        }
        id.remove(&mut self.arena);
        Some(Disposal { former_parent, orphans, transitions })
    }

    /// Walk every live node and verify the structural invariants: links agree
    /// in both directions, no node is its own ancestor, and the connected flag
    /// matches reachability from the document.
    ///
    /// # Errors
    /// `Internal` describing the first violation found.
    pub fn check_invariants(&self) -> Result<(), DomError> {
        let document = self.resolve(NodeKey::DOCUMENT)?;
        for handle in self.registry.handles() {
            let id = self.resolve(handle)?;
            let node = &self.arena[id];
            if node.get().handle() != handle {
                return Err(DomError::Internal(format!("{handle} maps to {}", node.get().handle())));
            }
            if let Some(parent) = node.parent() {
                let occurrences = parent.children(&self.arena).filter(|child| *child == id).count();
                if occurrences != 1 {
                    return Err(DomError::Internal(format!(
                        "{handle} appears {occurrences} times under its parent"
                    )));
                }
            }
            if let Some(next) = node.next_sibling() {
                if self.arena[next].previous_sibling() != Some(id) {
                    return Err(DomError::Internal(format!("sibling links of {handle} disagree")));
                }
            }
            let mut reached_document = false;
            for (depth, ancestor) in id.ancestors(&self.arena).enumerate() {
                if depth > 0 && ancestor == id {
                    return Err(DomError::Internal(format!("{handle} is its own ancestor")));
                }
                reached_document |= ancestor == document;
            }
            if node.get().is_connected() != reached_document {
                return Err(DomError::Internal(format!("connected flag of {handle} is stale")));
            }
        }
        Ok(())
    }

    // --- internals ---------------------------------------------------------

    fn resolve(&self, handle: NodeKey) -> Result<NodeId, DomError> {
        self.registry.lookup(handle).copied().ok_or(DomError::DanglingReference(handle))
    }

    fn key_of(&self, id: NodeId) -> NodeKey {
        self.arena[id].get().handle()
    }

    fn ensure_insertable(&self, parent: NodeId, node: NodeId) -> Result<(), DomError> {
        let parent_node = self.arena[parent].get();
        let child_node = self.arena[node].get();
        if !parent_node.kind().can_have_children() {
            return Err(DomError::Argument(format!(
                "{} ({:?}) cannot have children",
                parent_node.handle(),
                parent_node.node_type()
            )));
        }
        if !child_node.kind().can_be_child() {
            return Err(DomError::Argument(format!(
                "{} ({:?}) cannot be inserted into a tree",
                child_node.handle(),
                child_node.node_type()
            )));
        }
        if parent.ancestors(&self.arena).any(|ancestor| ancestor == node) {
            return Err(DomError::CyclicInsertion { parent: parent_node.handle(), node: child_node.handle() });
        }
        Ok(())
    }

    /// Insert a validated node; fragments hand over their children instead.
    fn insert_at(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<Vec<Transition>, DomError> {
        if !matches!(self.arena[node].get().kind(), NodeKind::DocumentFragment) {
            return self.link(parent, node, reference);
        }
        let moved: Vec<NodeId> = node.children(&self.arena).collect();
        let mut transitions = Vec::new();
        for child in moved {
            transitions.extend(self.link(parent, child, reference)?);
        }
        Ok(transitions)
    }

    fn link(
        &mut self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<Vec<Transition>, DomError> {
        node.detach(&mut self.arena);
        let linked = match reference {
            Some(reference) => reference.checked_insert_before(node, &mut self.arena),
            None => parent.checked_append(node, &mut self.arena),
        };
        linked.map_err(|error| DomError::Internal(format!("arena rejected insertion: {error}")))?;
        Ok(self.refresh_connected(node))
    }

    /// Recompute `node`'s connectivity from its parent and propagate a change
    /// through its subtree.
    fn refresh_connected(&mut self, node: NodeId) -> Vec<Transition> {
        let connected = match self.arena[node].parent() {
            Some(parent) => self.arena[parent].get().is_connected(),
            None => matches!(self.arena[node].get().kind(), NodeKind::Document),
        };
        if self.arena[node].get().is_connected() == connected {
            return Vec::new();
        }
        let subtree: Vec<NodeId> = node.descendants(&self.arena).collect();
        let mut transitions = Vec::with_capacity(subtree.len());
        for id in subtree {
            let data = self.arena[id].get_mut();
            if data.connected != connected {
                data.connected = connected;
                transitions.push(Transition { node: data.handle(), connected });
            }
        }
        transitions
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}
