//! Typed failures surfaced to command issuers.

use js::{JSError, NodeKey};
use thiserror::Error;

/// Everything a bridge command can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// Malformed command shape or argument types.
    #[error("invalid argument: {0}")]
    Argument(String),
    /// A creation command reused a live handle.
    #[error("identifier {0} is already registered")]
    DuplicateIdentifier(NodeKey),
    /// A command referenced a handle that does not resolve.
    #[error("identifier {0} does not resolve to a live node")]
    DanglingReference(NodeKey),
    /// A structural precondition was not met.
    #[error("node {node} is not a child of {parent}")]
    NotFound { parent: NodeKey, node: NodeKey },
    /// Inserting `node` under `parent` would make a node its own ancestor.
    #[error("inserting {node} under {parent} would create a cycle")]
    CyclicInsertion { parent: NodeKey, node: NodeKey },
    /// An element type tag was defined twice.
    #[error("element type '{0}' is already defined")]
    DuplicateTypeDefinition(String),
    /// The render collaborator failed; logged, never propagated.
    #[error("render adapter failed for {node}: {reason}")]
    RenderAdapter { node: NodeKey, reason: String },
    /// Shared state was poisoned by a panicking holder.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomError {
    /// DOMException-style name reported to scripts.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Argument(_) => "TypeError",
            Self::DuplicateIdentifier(_) => "InvalidStateError",
            Self::DanglingReference(_) => "InvalidAccessError",
            Self::NotFound { .. } => "NotFoundError",
            Self::CyclicInsertion { .. } => "HierarchyRequestError",
            Self::DuplicateTypeDefinition(_) => "NotSupportedError",
            Self::RenderAdapter { .. } | Self::Internal(_) => "OperationError",
        }
    }
}

impl From<DomError> for JSError {
    fn from(error: DomError) -> Self {
        match error {
            DomError::Argument(message) => Self::TypeError(message),
            other => Self::DomException(format!("{}: {other}", other.name())),
        }
    }
}
