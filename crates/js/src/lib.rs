//! Engine-agnostic JavaScript facade and DOM mirroring primitives.
//! This crate centralizes the types shared between script engine adapters and
//! the DOM owner: node handles, the bridge command schema, tree-changed
//! notifications, host binding tables and the timer scheduler.

use anyhow::Result;
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};

pub mod console;
pub use console::{ConsoleLogger, CONSOLE_TARGET};

/// Engine-agnostic host bindings facade: values, logger, and namespace builders.
pub mod bindings;
pub use bindings::{
    build_console_namespace, stringify_arguments, HostBindings, HostEnvironment, HostFnKind,
    HostFnSync, HostLogger, HostNamespace, JSError, JSValue, JsFunctionRef, LogLevel,
};

/// Command schema emitted by the scripting side.
pub mod commands;
pub use commands::{AdjacentPosition, BridgeCommand};

/// DOM index mirror for observer-side lookups.
pub mod dom_index;
pub use dom_index::{DomIndex, DomIndexState, SharedDomIndex};

/// Per-context timed callbacks.
pub mod timers;
pub use timers::{DueTimer, TimerId, TimerKind, TimerScheduler};

// ============================
// Engine-agnostic JS context trait
// ============================

/// A minimal interface the context needs from a per-page engine.
/// Keep this trait small so engines can be swapped (e.g., QuickJS/V8).
pub trait JsEngine {
    /// Invoke a callable previously handed to the host (timer callbacks).
    fn call_function(&mut self, function: JsFunctionRef) -> Result<()>;
    /// Run pending microtasks/jobs until idle.
    fn run_jobs(&mut self) -> Result<()>;
}

// ============================
// Node handles (shared across subsystems)
// ============================

/// Per-context integer handle naming a live node.
///
/// Handles are chosen by the scripting side; only the three negative values
/// below are reserved for nodes every context creates up front.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(pub i64);

impl NodeKey {
    /// The root `<body>` element.
    pub const BODY: Self = Self(-1);
    /// The window event target.
    pub const WINDOW: Self = Self(-2);
    /// The document root.
    pub const DOCUMENT: Self = Self(-3);

    /// Whether this handle is one of the context-owned reserved handles.
    #[inline]
    pub const fn is_reserved(self) -> bool {
        matches!(self.0, -3..=-1)
    }
}

impl Display for NodeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// Node kinds as seen by subscribers, with the standard DOM numeric codes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Element,
    Text,
    Comment,
    Document,
    DocumentFragment,
    /// The window is an event target without a standard node code.
    Window,
}

impl NodeType {
    /// Standard `Node.nodeType` value, `None` for the window.
    #[inline]
    pub const fn code(self) -> Option<u16> {
        match self {
            Self::Element => Some(1),
            Self::Text => Some(3),
            Self::Comment => Some(8),
            Self::Document => Some(9),
            Self::DocumentFragment => Some(11),
            Self::Window => None,
        }
    }
}

// ============================
// DOM Update model + mirror pattern
// ============================

/// A tree-changed notification mirrored to subscribers.
///
/// The tree owner broadcasts one batch per completed command, so subscribers
/// only ever observe states between commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DOMUpdate {
    Created { node: NodeKey, node_type: NodeType, tag: Option<String>, data: Option<String> },
    Inserted { parent: NodeKey, node: NodeKey, pos: usize },
    Removed { parent: NodeKey, node: NodeKey },
    SetProperty { node: NodeKey, name: String, value: JSValue },
    RemoveProperty { node: NodeKey, name: String },
    SetStyle { node: NodeKey, name: String, value: String },
    SetText { node: NodeKey, data: String },
    Cloned { source: NodeKey, target: NodeKey },
    Disposed { node: NodeKey },
}

/// A subscriber that receives DOMUpdate values and mirrors them into its own state.
pub trait DOMSubscriber {
    /// Apply a single DOMUpdate to the subscriber state.
    fn apply_update(&mut self, update: DOMUpdate) -> Result<()>;
}

/// Generic mirror that applies incoming tree changes and can send commands back to the tree owner.
pub struct DOMMirror<T: DOMSubscriber> {
    in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
    out_commands: mpsc::Sender<Vec<BridgeCommand>>,
    mirror: T,
}

impl<T: DOMSubscriber> DOMMirror<T> {
    /// Create a new DOMMirror wrapping a subscriber implementation.
    pub fn new(
        out_commands: mpsc::Sender<Vec<BridgeCommand>>,
        in_updater: broadcast::Receiver<Vec<DOMUpdate>>,
        mirror: T,
    ) -> Self {
        Self { in_updater, out_commands, mirror }
    }

    /// Drain and apply all pending DOMUpdate batches asynchronously.
    ///
    /// # Errors
    /// Returns an error if the tree owner went away or the subscriber rejects an update.
    pub async fn update(&mut self) -> Result<()> {
        self.try_update_sync()
    }

    /// Synchronous, non-async variant for draining pending updates (for blocking threads)
    ///
    /// # Errors
    /// Returns an error if the tree owner went away or the subscriber rejects an update.
    pub fn try_update_sync(&mut self) -> Result<()> {
        loop {
            match self.in_updater.try_recv() {
                Ok(batch) => {
                    for update in batch {
                        self.mirror.apply_update(update)?;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("DOM mirror lagged behind, {skipped} update batches were dropped");
                }
                Err(TryRecvError::Closed) => {
                    return Err(anyhow::anyhow!("Recv channel was closed before document ended!"));
                }
            }
        }
        Ok(())
    }

    /// Access the inner mirror mutably (engine-level integration)
    pub fn mirror_mut(&mut self) -> &mut T {
        &mut self.mirror
    }

    /// Access the inner mirror immutably (read-only access)
    pub fn mirror(&self) -> &T {
        &self.mirror
    }

    /// Send a batch of commands to the tree owner.
    ///
    /// # Errors
    /// Returns an error if the tree owner dropped its command receiver.
    pub async fn send_commands(&self, commands: Vec<BridgeCommand>) -> Result<()> {
        self.out_commands.send(commands).await?;
        Ok(())
    }
}
