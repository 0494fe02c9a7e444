//! Node payloads stored in the tree arena.

use std::collections::{BTreeSet, HashMap};

use js::{JSValue, NodeKey, NodeType};

/// Opaque pointer-sized handle to the native object backing an element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeHandle(pub u64);

/// Element state: type tag plus the property and style bags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    /// Lowercase type tag.
    pub tag: String,
    pub properties: HashMap<String, JSValue>,
    pub style: HashMap<String, String>,
    /// Set when the tag had no registered constructor.
    pub unknown: bool,
    pub native: Option<NativeHandle>,
}

impl ElementData {
    /// A plain element for `tag`.
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_ascii_lowercase(), ..Self::default() }
    }
}

/// Kind-specific node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
    Document,
    Window,
    DocumentFragment,
}

impl NodeKind {
    /// The kind tag shared with subscribers.
    pub const fn node_type(&self) -> NodeType {
        match self {
            Self::Element(_) => NodeType::Element,
            Self::Text(_) => NodeType::Text,
            Self::Comment(_) => NodeType::Comment,
            Self::Document => NodeType::Document,
            Self::Window => NodeType::Window,
            Self::DocumentFragment => NodeType::DocumentFragment,
        }
    }

    /// Only containers accept children.
    #[inline]
    pub const fn can_have_children(&self) -> bool {
        matches!(self, Self::Element(_) | Self::Document | Self::DocumentFragment)
    }

    /// Roots of a context can never become someone's child.
    #[inline]
    pub const fn can_be_child(&self) -> bool {
        !matches!(self, Self::Document | Self::Window)
    }

    /// Character data of text and comment nodes.
    pub fn character_data(&self) -> Option<&str> {
        match self {
            Self::Text(data) | Self::Comment(data) => Some(data),
            _ => None,
        }
    }
}

/// One node in the arena.
///
/// Parent and sibling links live in the arena itself; the node only records
/// what the arena cannot: its handle, payload, owning document, connectivity
/// and registered event types.
#[derive(Debug, Clone)]
pub struct DomNode {
    handle: NodeKey,
    kind: NodeKind,
    owner_document: Option<NodeKey>,
    pub(crate) connected: bool,
    events: BTreeSet<String>,
}

impl DomNode {
    pub(crate) fn new(handle: NodeKey, kind: NodeKind) -> Self {
        let owner_document = (handle != NodeKey::DOCUMENT).then_some(NodeKey::DOCUMENT);
        Self { handle, kind, owner_document, connected: false, events: BTreeSet::new() }
    }

    #[inline]
    pub const fn handle(&self) -> NodeKey {
        self.handle
    }

    #[inline]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    #[inline]
    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    #[inline]
    pub const fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Handle of the owning document, resolved through the registry by callers.
    #[inline]
    pub const fn owner_document(&self) -> Option<NodeKey> {
        self.owner_document
    }

    /// Reachable from the document root.
    #[inline]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    /// Event types registered on this target.
    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    pub(crate) fn add_event(&mut self, event: &str) -> bool {
        self.events.insert(event.to_owned())
    }

    pub(crate) fn remove_event(&mut self, event: &str) -> bool {
        self.events.remove(event)
    }
}
