// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node models and the graph's per-node state.
//!
//! A [`NodeDataModel`] is the computational unit: it declares its ports,
//! consumes inbound data and produces outbound data. The graph wraps every
//! model in a [`Node`] that additionally tracks port occupancy, observers and
//! the model's activation.
//!
//! Model construction must stay cheap and free of side effects. The registry
//! instantiates throwaway models just to read their name. Anything expensive
//! belongs in [`NodeDataModel::activate`], which the graph calls once the node
//! is placed and pairs with [`NodeDataModel::deactivate`] when it is removed.

use crate::connection::{Connection, ConnectionId};
use crate::data::SharedData;
use crate::events::{NodeObservers, NodeSignals};
use crate::port::{ConnectionPolicy, PortDataType, PortDirection, PortIndex};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validation state reported by a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeValidationState {
    /// Inputs are usable and outputs are current
    #[default]
    Valid,
    /// Outputs are computed but something is off
    Warning,
    /// The node cannot compute; its outputs are empty
    Error,
}

/// Contract every node implementation fulfils.
///
/// The graph only ever holds models through this trait.
pub trait NodeDataModel: Any {
    /// Unique model name, used as the registry key
    fn name(&self) -> &str;

    /// Caption shown on the node
    fn caption(&self) -> String {
        self.name().to_string()
    }

    /// Whether the caption is shown
    fn caption_visible(&self) -> bool {
        true
    }

    /// Tooltip text for the node
    fn tooltip(&self) -> String {
        String::new()
    }

    /// Application-defined kind tag, e.g. to pick a presentation.
    ///
    /// `None` when the model has no kind.
    fn node_type(&self) -> Option<u32> {
        None
    }

    /// Extra information the model exposes under `key`
    fn extra_info(&self, _key: &str) -> Option<String> {
        None
    }

    /// Label of an individual port
    fn port_caption(&self, _direction: PortDirection, _index: PortIndex) -> String {
        String::new()
    }

    /// Whether the port label is shown
    fn port_caption_visible(&self, _direction: PortDirection, _index: PortIndex) -> bool {
        false
    }

    /// Number of ports in a direction. Fixed for the model's lifetime.
    fn n_ports(&self, direction: PortDirection) -> usize;

    /// Data type of a port.
    ///
    /// Must stay the same for the model's lifetime; changing it while the
    /// port is connected is not supported.
    fn data_type(&self, direction: PortDirection, index: PortIndex) -> PortDataType;

    /// Connection policy of an output port
    fn port_out_connection_policy(&self, _index: PortIndex) -> ConnectionPolicy {
        ConnectionPolicy::Many
    }

    /// Connection policy of an input port
    fn port_in_connection_policy(&self, _index: PortIndex) -> ConnectionPolicy {
        ConnectionPolicy::One
    }

    /// Deliver a new value to an input and recompute.
    ///
    /// `None` signals upstream invalidation. Changed outputs are announced on
    /// `signals`; failures become an [`NodeValidationState::Error`] state with
    /// empty outputs.
    fn set_in_data(&mut self, data: Option<SharedData>, port: PortIndex, signals: &mut NodeSignals);

    /// Connection-aware delivery, used for inputs with a `Many` policy
    fn set_in_data_from(
        &mut self,
        data: Option<SharedData>,
        port: PortIndex,
        _connection: ConnectionId,
        signals: &mut NodeSignals,
    ) {
        self.set_in_data(data, port, signals);
    }

    /// Current value of an output, `None` if not computed or invalidated
    fn out_data(&self, port: PortIndex) -> Option<SharedData>;

    /// Current validation state
    fn validation_state(&self) -> NodeValidationState {
        NodeValidationState::Valid
    }

    /// Message explaining the validation state
    fn validation_message(&self) -> String {
        String::new()
    }

    /// Whether the node can be resized by the editor
    fn resizable(&self) -> bool {
        false
    }

    /// Whether the user edited the model's own data
    fn data_edited(&self) -> bool {
        false
    }

    /// Model-owned state kept by snapshots, `None` for stateless models
    fn save_state(&self) -> Option<String> {
        None
    }

    /// Reapply state produced by [`NodeDataModel::save_state`].
    ///
    /// Changed outputs are announced on `signals` as for any edit.
    fn restore_state(&mut self, _state: &str, _signals: &mut NodeSignals) {}

    /// Acquire expensive resources after the node is placed in a graph
    fn activate(&mut self) {}

    /// Release what [`NodeDataModel::activate`] acquired
    fn deactivate(&mut self) {}

    /// Called after a connection into one of the inputs was created
    fn input_connection_created(&mut self, _connection: &Connection) {}

    /// Called after a connection into one of the inputs was removed
    fn input_connection_deleted(&mut self, _connection: &Connection) {}

    /// Called after a connection from one of the outputs was created
    fn output_connection_created(&mut self, _connection: &Connection) {}

    /// Called after a connection from one of the outputs was removed
    fn output_connection_deleted(&mut self, _connection: &Connection) {}

    /// Access as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Mutable access as `Any` for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of input ports
    fn input_count(&self) -> usize {
        self.n_ports(PortDirection::In)
    }

    /// Number of output ports
    fn output_count(&self) -> usize {
        self.n_ports(PortDirection::Out)
    }

    /// Connection policy of any port
    fn connection_policy(&self, direction: PortDirection, index: PortIndex) -> ConnectionPolicy {
        match direction {
            PortDirection::In => self.port_in_connection_policy(index),
            PortDirection::Out => self.port_out_connection_policy(index),
        }
    }
}

/// A node placed in a graph
pub struct Node {
    id: NodeId,
    model: Box<dyn NodeDataModel>,
    inputs: Vec<IndexSet<ConnectionId>>,
    outputs: Vec<IndexSet<ConnectionId>>,
    pub(crate) observers: NodeObservers,
    active: bool,
}

impl Node {
    /// Wrap a model, sizing occupancy from its port counts
    pub(crate) fn new(model: Box<dyn NodeDataModel>) -> Self {
        let inputs = vec![IndexSet::new(); model.input_count()];
        let outputs = vec![IndexSet::new(); model.output_count()];
        Self {
            id: NodeId::new(),
            model,
            inputs,
            outputs,
            observers: NodeObservers::new(),
            active: false,
        }
    }

    /// Node ID
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's model
    pub fn model(&self) -> &dyn NodeDataModel {
        &*self.model
    }

    pub(crate) fn model_mut(&mut self) -> &mut dyn NodeDataModel {
        &mut *self.model
    }

    /// Downcast the model to a concrete type
    pub fn model_as<T: NodeDataModel>(&self) -> Option<&T> {
        self.model.as_any().downcast_ref::<T>()
    }

    /// Mutably downcast the model to a concrete type.
    ///
    /// Changes made this way emit no signals; outside the crate models are
    /// mutated through [`Graph::update_model`](crate::Graph::update_model).
    pub(crate) fn model_as_mut<T: NodeDataModel>(&mut self) -> Option<&mut T> {
        self.model.as_any_mut().downcast_mut::<T>()
    }

    /// Connections currently attached to a port, `None` if the index is out of range
    pub fn connections(&self, direction: PortDirection, index: PortIndex) -> Option<&IndexSet<ConnectionId>> {
        match direction {
            PortDirection::In => self.inputs.get(index),
            PortDirection::Out => self.outputs.get(index),
        }
    }

    pub(crate) fn connections_mut(
        &mut self,
        direction: PortDirection,
        index: PortIndex,
    ) -> Option<&mut IndexSet<ConnectionId>> {
        match direction {
            PortDirection::In => self.inputs.get_mut(index),
            PortDirection::Out => self.outputs.get_mut(index),
        }
    }

    /// All connections attached to any port of this node
    pub fn all_connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .flat_map(|ids| ids.iter().copied())
    }

    /// Number of ports in a direction
    pub fn port_count(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => self.inputs.len(),
            PortDirection::Out => self.outputs.len(),
        }
    }

    /// Whether the model has been activated
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn activate(&mut self) {
        if !self.active {
            self.model.activate();
            self.active = true;
        }
    }

    pub(crate) fn deactivate(&mut self) {
        if self.active {
            self.model.deactivate();
            self.active = false;
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.deactivate();
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("model", &self.model.name())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("active", &self.active)
            .finish()
    }
}
