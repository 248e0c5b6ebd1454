// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node signals and observers.
//!
//! A model reports changes by emitting [`NodeEvent`]s into the [`NodeSignals`]
//! sink it is handed during a call. The graph drains the sink after the call
//! returns, forwards every event to the node's [`NodeObservers`] and then
//! propagates data events downstream.

use crate::node::NodeId;
use crate::port::PortIndex;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Event emitted by a node model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    /// New data is available on an output port
    DataUpdated(PortIndex),
    /// An output port no longer holds valid data
    DataInvalidated(PortIndex),
    /// The model started a computation
    ComputingStarted,
    /// The model finished a computation
    ComputingFinished,
}

impl NodeEvent {
    /// The output port this event carries data for, if any
    pub fn output_port(&self) -> Option<PortIndex> {
        match self {
            Self::DataUpdated(port) | Self::DataInvalidated(port) => Some(*port),
            Self::ComputingStarted | Self::ComputingFinished => None,
        }
    }
}

/// Sink collecting the events a model emits during one call
#[derive(Debug, Default)]
pub struct NodeSignals {
    events: Vec<NodeEvent>,
}

impl NodeSignals {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an event
    pub fn emit(&mut self, event: NodeEvent) {
        self.events.push(event);
    }

    /// Announce new data on an output port
    pub fn data_updated(&mut self, port: PortIndex) {
        self.emit(NodeEvent::DataUpdated(port));
    }

    /// Announce that an output port was invalidated
    pub fn data_invalidated(&mut self, port: PortIndex) {
        self.emit(NodeEvent::DataInvalidated(port));
    }

    /// Announce the start of a computation
    pub fn computing_started(&mut self) {
        self.emit(NodeEvent::ComputingStarted);
    }

    /// Announce the end of a computation
    pub fn computing_finished(&mut self) {
        self.emit(NodeEvent::ComputingFinished);
    }

    /// Events emitted so far
    pub fn events(&self) -> &[NodeEvent] {
        &self.events
    }

    /// Whether nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Unique identifier for an observer subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random subscription ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Callback invoked for every event a node emits
pub type NodeObserver = Box<dyn FnMut(NodeId, &NodeEvent)>;

/// Observer list of one node
#[derive(Default)]
pub struct NodeObservers {
    observers: IndexMap<SubscriptionId, NodeObserver>,
}

impl NodeObservers {
    /// Create an empty observer list
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer
    pub fn subscribe(&mut self, observer: impl FnMut(NodeId, &NodeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.observers.insert(id, Box::new(observer));
        id
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.shift_remove(&id).is_some()
    }

    /// Deliver an event to every observer in subscription order
    pub fn notify(&mut self, node: NodeId, event: &NodeEvent) {
        for observer in self.observers.values_mut() {
            observer(node, event);
        }
    }

    /// Number of observers
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no observers
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl fmt::Debug for NodeObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeObservers")
            .field("count", &self.observers.len())
            .finish()
    }
}
