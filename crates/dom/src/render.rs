//! Contract with the native render tree.
//!
//! The dispatcher calls [`RenderBridge::attach`] once for every node that
//! becomes reachable from the document and [`RenderBridge::detach`] for every
//! node that stops being reachable. Failures are logged by the caller and
//! never undo the logical tree mutation.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Result, anyhow};
use js::{NodeKey, NodeType};

use crate::node::DomNode;

/// Native render-tree collaborator.
pub trait RenderBridge: Send {
    /// Create and insert the render primitive for a newly connected node.
    ///
    /// # Errors
    /// Any native-side failure; the caller logs it.
    fn attach(&mut self, key: NodeKey, node: &DomNode) -> Result<()>;

    /// Tear down the render primitive of a disconnected node. Must tolerate
    /// nodes that are not attached.
    ///
    /// # Errors
    /// Any native-side failure; the caller logs it.
    fn detach(&mut self, key: NodeKey) -> Result<()>;
}

/// A bridge for headless contexts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderBridge;

impl RenderBridge for NoopRenderBridge {
    fn attach(&mut self, _key: NodeKey, _node: &DomNode) -> Result<()> {
        Ok(())
    }

    fn detach(&mut self, _key: NodeKey) -> Result<()> {
        Ok(())
    }
}

/// One call observed by a [`RecordingRenderBridge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Attach { node: NodeKey, node_type: NodeType },
    Detach { node: NodeKey },
}

#[derive(Default)]
struct RecordingState {
    events: Vec<RenderEvent>,
    attached: HashSet<NodeKey>,
    failing: HashSet<NodeKey>,
}

/// A bridge that keeps a shared log of the calls it received, for embedders
/// that mirror render primitives elsewhere and for tests.
///
/// Attaching an attached node is reported as an error and recorded once;
/// detaching a detached node is a silent no-op.
#[derive(Clone, Default)]
pub struct RecordingRenderBridge {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingRenderBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far.
    pub fn events(&self) -> Vec<RenderEvent> {
        self.lock().events.clone()
    }

    /// Drain the call log.
    pub fn take_events(&self) -> Vec<RenderEvent> {
        core::mem::take(&mut self.lock().events)
    }

    /// Whether `key` currently has a render primitive.
    pub fn is_attached(&self, key: NodeKey) -> bool {
        self.lock().attached.contains(&key)
    }

    /// Make every future call for `key` fail.
    pub fn fail_for(&self, key: NodeKey) {
        self.lock().failing.insert(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderBridge for RecordingRenderBridge {
    fn attach(&mut self, key: NodeKey, node: &DomNode) -> Result<()> {
        let mut state = self.lock();
        if state.failing.contains(&key) {
            return Err(anyhow!("native view for {key} could not be created"));
        }
        if !state.attached.insert(key) {
            return Err(anyhow!("{key} is already attached"));
        }
        state.events.push(RenderEvent::Attach { node: key, node_type: node.node_type() });
        Ok(())
    }

    fn detach(&mut self, key: NodeKey) -> Result<()> {
        let mut state = self.lock();
        if state.failing.contains(&key) {
            return Err(anyhow!("native view for {key} could not be removed"));
        }
        if state.attached.remove(&key) {
            state.events.push(RenderEvent::Detach { node: key });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    #[test]
    fn recording_bridge_is_idempotent() {
        let mut bridge = RecordingRenderBridge::new();
        let node = DomNode::new(NodeKey(1), NodeKind::Text(String::from("x")));
        bridge.attach(NodeKey(1), &node).expect("attach");
        assert!(bridge.attach(NodeKey(1), &node).is_err());
        bridge.detach(NodeKey(1)).expect("detach");
        bridge.detach(NodeKey(1)).expect("second detach");
        assert_eq!(bridge.take_events(), vec![
            RenderEvent::Attach { node: NodeKey(1), node_type: NodeType::Text },
            RenderEvent::Detach { node: NodeKey(1) },
        ]);
        assert!(bridge.events().is_empty());
    }
}
