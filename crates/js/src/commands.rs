//! The bridge command schema.
//!
//! Script engines emit these commands toward the tree owner, either as typed
//! values over the context's command channel or as JSON payloads decoded with
//! [`BridgeCommand::from_json`].

use core::fmt::{Display, Formatter, Result as FmtResult};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::bindings::{JSError, JSValue};
use crate::NodeKey;

/// Where `insertAdjacentNode` places the new node relative to its target.
///
/// Decoding goes through [`FromStr`], so any letter case is accepted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum AdjacentPosition {
    /// Immediately before the target, as its previous sibling.
    BeforeBegin,
    /// Inside the target, before its first child.
    AfterBegin,
    /// Inside the target, after its last child.
    BeforeEnd,
    /// Immediately after the target, as its next sibling.
    AfterEnd,
}

impl AdjacentPosition {
    /// The lowercase keyword used on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeBegin => "beforebegin",
            Self::AfterBegin => "afterbegin",
            Self::BeforeEnd => "beforeend",
            Self::AfterEnd => "afterend",
        }
    }
}

impl Display for AdjacentPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjacentPosition {
    type Err = JSError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "beforebegin" => Ok(Self::BeforeBegin),
            "afterbegin" => Ok(Self::AfterBegin),
            "beforeend" => Ok(Self::BeforeEnd),
            "afterend" => Ok(Self::AfterEnd),
            _ => Err(JSError::DomException(format!(
                "SyntaxError: The value provided ('{value}') is not one of 'beforeBegin', 'afterBegin', 'beforeEnd', or 'afterEnd'."
            ))),
        }
    }
}

impl TryFrom<String> for AdjacentPosition {
    type Error = JSError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One mutation or query issued by the scripting side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BridgeCommand {
    CreateElement {
        id: NodeKey,
        tag: String,
        #[serde(default)]
        properties: BTreeMap<String, JSValue>,
        #[serde(default)]
        events: Vec<String>,
    },
    CreateTextNode { id: NodeKey, data: String },
    CreateComment { id: NodeKey, data: String },
    CreateDocumentFragment { id: NodeKey },
    CloneNode { source: NodeKey, target: NodeKey },
    RemoveNode { id: NodeKey },
    AppendChild { parent: NodeKey, node: NodeKey },
    /// A missing `reference` appends.
    InsertBefore {
        parent: NodeKey,
        node: NodeKey,
        #[serde(default)]
        reference: Option<NodeKey>,
    },
    RemoveChild { parent: NodeKey, node: NodeKey },
    ReplaceChild { parent: NodeKey, new_child: NodeKey, old_child: NodeKey },
    InsertAdjacentNode { target: NodeKey, position: AdjacentPosition, node: NodeKey },
    SetProperty { target: NodeKey, key: String, value: JSValue },
    GetProperty { target: NodeKey, key: String },
    RemoveProperty { target: NodeKey, key: String },
    SetStyle { target: NodeKey, key: String, value: String },
    AddEvent { target: NodeKey, event: String },
    RemoveEvent { target: NodeKey, event: String },
    DisposeNode { id: NodeKey },
}

impl BridgeCommand {
    /// Decode a single JSON command, e.g. `{"command":"removeNode","id":7}`.
    ///
    /// # Errors
    /// Returns the decoder error when the payload has the wrong shape or types.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    /// Command name as it appears on the wire.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateElement { .. } => "createElement",
            Self::CreateTextNode { .. } => "createTextNode",
            Self::CreateComment { .. } => "createComment",
            Self::CreateDocumentFragment { .. } => "createDocumentFragment",
            Self::CloneNode { .. } => "cloneNode",
            Self::RemoveNode { .. } => "removeNode",
            Self::AppendChild { .. } => "appendChild",
            Self::InsertBefore { .. } => "insertBefore",
            Self::RemoveChild { .. } => "removeChild",
            Self::ReplaceChild { .. } => "replaceChild",
            Self::InsertAdjacentNode { .. } => "insertAdjacentNode",
            Self::SetProperty { .. } => "setProperty",
            Self::GetProperty { .. } => "getProperty",
            Self::RemoveProperty { .. } => "removeProperty",
            Self::SetStyle { .. } => "setStyle",
            Self::AddEvent { .. } => "addEvent",
            Self::RemoveEvent { .. } => "removeEvent",
            Self::DisposeNode { .. } => "disposeNode",
        }
    }
}
