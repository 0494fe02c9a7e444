//! Native side of the script/DOM bridge.
//!
//! Each [`ScriptContext`] owns an arena-backed node tree, the identifier
//! registry naming its nodes, the [`MutationDispatcher`] that applies bridge
//! commands to it and a timer queue. Render integration goes through the
//! [`RenderBridge`] trait; external observers follow the tree through
//! `js::DOMUpdate` batches.

pub mod bindings;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod factory;
pub mod node;
pub mod registry;
pub mod render;
pub mod tree;

pub use bindings::{build_bindings, HostContext};
pub use config::BridgeConfig;
pub use context::ScriptContext;
pub use dispatcher::MutationDispatcher;
pub use error::DomError;
pub use factory::{ElementFactory, ElementInit, ROOT_BODY_TAG};
pub use node::{DomNode, ElementData, NativeHandle, NodeKind};
pub use registry::IdentifierRegistry;
pub use render::{NoopRenderBridge, RecordingRenderBridge, RenderBridge, RenderEvent};
pub use tree::{Disposal, NodeTree, Transition};
