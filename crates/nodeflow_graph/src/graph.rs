// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is the mutation interface consumed by an editor: nodes and
//! connections are created and destroyed here, and every mutation that moves
//! data runs a propagation pass to completion before returning.

use crate::config::GraphConfig;
use crate::connection::{Connection, ConnectionId};
use crate::converter::{Conversion, TypeConverterRegistry};
use crate::data::SharedData;
use crate::error::{ConnectionError, GraphError, Result};
use crate::events::{NodeEvent, NodeSignals, SubscriptionId};
use crate::node::{Node, NodeDataModel, NodeId};
use crate::port::{ConnectionPolicy, PortDataType, PortDirection, PortIndex, PortRef};
use crate::propagation::{PropagationReport, Work};
use crate::registry::NodeModelRegistry;
use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// A dataflow node graph
pub struct Graph {
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Connections between nodes
    connections: IndexMap<ConnectionId, Connection>,
    /// Converters consulted when linking differing port types
    converters: TypeConverterRegistry,
    config: GraphConfig,
    last_report: PropagationReport,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, GraphConfig::default())
    }

    /// Create a new empty graph with a configuration
    pub fn with_config(name: impl Into<String>, config: GraphConfig) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            converters: TypeConverterRegistry::new(),
            config,
            last_report: PropagationReport::default(),
        }
    }

    /// Create a new empty graph using the converters of a model registry
    pub fn from_registry(name: impl Into<String>, registry: &NodeModelRegistry) -> Self {
        let mut graph = Self::new(name);
        graph.converters = registry.converters().clone();
        graph
    }

    /// Graph configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Type converters used when linking ports
    pub fn converters(&self) -> &TypeConverterRegistry {
        &self.converters
    }

    /// Mutable access to the type converters.
    ///
    /// Existing connections keep the converter they were created with.
    pub fn converters_mut(&mut self) -> &mut TypeConverterRegistry {
        &mut self.converters
    }

    /// Report of the most recent propagation pass
    pub fn last_report(&self) -> &PropagationReport {
        &self.last_report
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node to the graph and activate its model
    pub fn add_node(&mut self, model: Box<dyn NodeDataModel>) -> NodeId {
        let mut node = Node::new(model);
        let id = node.id();
        node.activate();
        tracing::debug!("Added node {} ({})", id, node.model().name());
        self.nodes.insert(id, node);
        id
    }

    /// Create a node from a registered model name
    pub fn create_node(&mut self, registry: &NodeModelRegistry, model_name: &str) -> Result<NodeId> {
        let model = registry
            .create(model_name)
            .ok_or_else(|| GraphError::UnknownModel(model_name.to_string()))?;
        Ok(self.add_node(model))
    }

    /// Remove a node after removing all of its connections.
    ///
    /// Downstream nodes receive an invalidation for every output connection.
    pub fn remove_node(&mut self, node_id: NodeId) -> Result<PropagationReport> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;

        // Outputs first so the removed node's recompute reaches nobody.
        // A self-loop sits on both sides and is removed once.
        let mut attached: IndexSet<ConnectionId> = (0..node.port_count(PortDirection::Out))
            .filter_map(|port| node.connections(PortDirection::Out, port))
            .flat_map(|ids| ids.iter().copied())
            .collect();
        attached.extend(
            (0..node.port_count(PortDirection::In))
                .filter_map(|port| node.connections(PortDirection::In, port))
                .flat_map(|ids| ids.iter().copied()),
        );

        let mut report = PropagationReport::default();
        for connection_id in attached {
            report.merge(self.disconnect(connection_id)?);
        }

        if let Some(mut node) = self.nodes.shift_remove(&node_id) {
            node.deactivate();
            tracing::debug!("Removed node {} ({})", node_id, node.model().name());
        }
        self.last_report = report.clone();
        Ok(report)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a node's model downcast to a concrete type
    pub fn model<T: NodeDataModel>(&self, node_id: NodeId) -> Option<&T> {
        self.nodes.get(&node_id)?.model_as::<T>()
    }

    /// Get all nodes
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Ports
    // ------------------------------------------------------------------

    /// Data type of a port
    pub fn data_type(&self, port: PortRef) -> Result<PortDataType> {
        let node = self.nodes.get(&port.node).ok_or(GraphError::NodeNotFound(port.node))?;
        check_range(node, port)?;
        Ok(node.model().data_type(port.direction, port.index))
    }

    /// Connection policy of a port
    pub fn connection_policy(&self, port: PortRef) -> Result<ConnectionPolicy> {
        let node = self.nodes.get(&port.node).ok_or(GraphError::NodeNotFound(port.node))?;
        check_range(node, port)?;
        Ok(node.model().connection_policy(port.direction, port.index))
    }

    /// Connections currently attached to a port
    pub fn connections_at(&self, port: PortRef) -> impl Iterator<Item = &Connection> {
        self.nodes
            .get(&port.node)
            .and_then(|node| node.connections(port.direction, port.index))
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.connections.get(id))
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    /// Check whether a connection could be created, without creating it.
    ///
    /// Returns how values would travel across it.
    pub fn can_connect(
        &self,
        out_node: NodeId,
        out_port: PortIndex,
        in_node: NodeId,
        in_port: PortIndex,
    ) -> std::result::Result<Conversion, ConnectionError> {
        let source = self.nodes.get(&out_node).ok_or(ConnectionError::NodeNotFound(out_node))?;
        let target = self.nodes.get(&in_node).ok_or(ConnectionError::NodeNotFound(in_node))?;

        let output = PortRef::output(out_node, out_port);
        let input = PortRef::input(in_node, in_port);
        check_range(source, output)?;
        check_range(target, input)?;

        let from = source.model().data_type(PortDirection::Out, out_port);
        let to = target.model().data_type(PortDirection::In, in_port);
        let conversion = self
            .converters
            .resolve(&from, &to)
            .ok_or(ConnectionError::Incompatible { from, to })?;

        for (node, port) in [(target, input), (source, output)] {
            let policy = node.model().connection_policy(port.direction, port.index);
            let occupied = node
                .connections(port.direction, port.index)
                .map_or(0, indexmap::IndexSet::len);
            if !policy.accepts(occupied) {
                return Err(ConnectionError::Capacity(port));
            }
        }

        Ok(conversion)
    }

    /// Connect an output port to an input port.
    ///
    /// Nothing changes unless every check passes. On success the output's
    /// current value, if any, is pushed through the new connection.
    pub fn connect(
        &mut self,
        out_node: NodeId,
        out_port: PortIndex,
        in_node: NodeId,
        in_port: PortIndex,
    ) -> std::result::Result<ConnectionId, ConnectionError> {
        let conversion = self.can_connect(out_node, out_port, in_node, in_port)?;
        let connection = Connection::new(out_node, out_port, in_node, in_port, conversion);
        let id = connection.id;

        for direction in [PortDirection::Out, PortDirection::In] {
            let port = connection.endpoint(direction);
            if let Some(ids) = self
                .nodes
                .get_mut(&port.node)
                .and_then(|node| node.connections_mut(direction, port.index))
            {
                ids.insert(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&out_node) {
            node.model_mut().output_connection_created(&connection);
        }
        if let Some(node) = self.nodes.get_mut(&in_node) {
            node.model_mut().input_connection_created(&connection);
        }
        tracing::debug!(
            "Connected {} ({})",
            connection,
            if connection.has_converter() { "converted" } else { "direct" }
        );
        self.connections.insert(id, connection);

        let report = self.run_pass(vec![Work::Initial { connection: id }]);
        self.last_report = report;
        Ok(id)
    }

    /// Remove a connection and invalidate the input it fed
    pub fn disconnect(&mut self, connection_id: ConnectionId) -> std::result::Result<PropagationReport, ConnectionError> {
        let connection = self
            .connections
            .shift_remove(&connection_id)
            .ok_or(ConnectionError::ConnectionNotFound(connection_id))?;

        for direction in [PortDirection::Out, PortDirection::In] {
            let port = connection.endpoint(direction);
            if let Some(ids) = self
                .nodes
                .get_mut(&port.node)
                .and_then(|node| node.connections_mut(direction, port.index))
            {
                ids.shift_remove(&connection_id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&connection.out_node) {
            node.model_mut().output_connection_deleted(&connection);
        }
        if let Some(node) = self.nodes.get_mut(&connection.in_node) {
            node.model_mut().input_connection_deleted(&connection);
        }
        tracing::debug!("Disconnected {}", connection);

        let report = self.run_pass(vec![Work::deliver(
            connection.in_node,
            connection.in_port,
            Some(connection_id),
            None,
        )]);
        self.last_report = report.clone();
        Ok(report)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&connection_id)
    }

    /// Get all connections
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ------------------------------------------------------------------
    // Data
    // ------------------------------------------------------------------

    /// Set an input value directly, typically on a node with no upstream
    pub fn set_input_data(
        &mut self,
        node_id: NodeId,
        port: PortIndex,
        data: Option<SharedData>,
    ) -> Result<PropagationReport> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        check_range(node, PortRef::input(node_id, port))?;

        let report = self.run_pass(vec![Work::deliver(node_id, port, None, data)]);
        self.last_report = report.clone();
        Ok(report)
    }

    /// Let a node change its own state and emit signals, then propagate them.
    ///
    /// This is how a source node publishes a new output value.
    pub fn update_node<F>(&mut self, node_id: NodeId, update: F) -> Result<PropagationReport>
    where
        F: FnOnce(&mut dyn NodeDataModel, &mut NodeSignals),
    {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let mut signals = NodeSignals::new();
        update(node.model_mut(), &mut signals);
        Ok(self.propagate_signals(node_id, signals))
    }

    /// Typed variant of [`Graph::update_node`].
    ///
    /// Fails with [`GraphError::NodeNotFound`] if the node's model is not a `T`.
    pub fn update_model<T, F>(&mut self, node_id: NodeId, update: F) -> Result<PropagationReport>
    where
        T: NodeDataModel,
        F: FnOnce(&mut T, &mut NodeSignals),
    {
        let model = self
            .nodes
            .get_mut(&node_id)
            .and_then(Node::model_as_mut::<T>)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let mut signals = NodeSignals::new();
        update(model, &mut signals);
        Ok(self.propagate_signals(node_id, signals))
    }

    /// Announce new data on a node's output and propagate it
    pub fn emit_data_updated(&mut self, node_id: NodeId, port: PortIndex) -> Result<PropagationReport> {
        self.update_node(node_id, |_, signals| signals.data_updated(port))
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Observe the events a node emits
    pub fn subscribe(
        &mut self,
        node_id: NodeId,
        observer: impl FnMut(NodeId, &NodeEvent) + 'static,
    ) -> Result<SubscriptionId> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        Ok(node.observers.subscribe(observer))
    }

    /// Stop observing a node. Returns false if the subscription was unknown.
    pub fn unsubscribe(&mut self, node_id: NodeId, subscription: SubscriptionId) -> bool {
        self.nodes
            .get_mut(&node_id)
            .is_some_and(|node| node.observers.unsubscribe(subscription))
    }

    /// Propagate the signals a node emitted outside of a pass
    fn propagate_signals(&mut self, node_id: NodeId, mut signals: NodeSignals) -> PropagationReport {
        let mut seed = Vec::new();
        self.dispatch(node_id, signals.take(), &None, &mut seed);
        let report = self.run_pass(seed);
        self.last_report = report.clone();
        report
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut IndexMap<NodeId, Node> {
        &mut self.nodes
    }

    pub(crate) fn connections_map(&self) -> &IndexMap<ConnectionId, Connection> {
        &self.connections
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("config", &self.config)
            .finish()
    }
}

fn check_range(node: &Node, port: PortRef) -> std::result::Result<(), ConnectionError> {
    let count = node.port_count(port.direction);
    if port.index < count {
        Ok(())
    } else {
        Err(ConnectionError::PortOutOfRange { port, count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NumberData, TextData};
    use crate::nodes::calculator::{
        register_converters, NumberDisplayModel, NumberSourceModel, ScaleModel, TextDisplayModel,
    };

    fn source(graph: &mut Graph, value: f64) -> NodeId {
        let id = graph.add_node(Box::new(NumberSourceModel::default()));
        graph
            .update_model::<NumberSourceModel, _>(id, |model, signals| model.set_number(value, signals))
            .unwrap();
        id
    }

    #[test]
    fn test_add_and_remove_node() {
        let mut graph = Graph::default();
        let id = graph.add_node(Box::new(NumberDisplayModel::default()));
        assert_eq!(graph.node_count(), 1);
        assert!(graph.node(id).unwrap().is_active());

        graph.remove_node(id).unwrap();
        assert_eq!(graph.node_count(), 0);
        assert!(matches!(graph.remove_node(id), Err(GraphError::NodeNotFound(_))));
    }

    #[test]
    fn test_create_node_from_registry() {
        let mut registry = NodeModelRegistry::new();
        let name = registry.register::<ScaleModel>(crate::registry::NodeCategory::Math);
        let mut graph = Graph::from_registry("test", &registry);

        let id = graph.create_node(&registry, &name).unwrap();
        assert_eq!(graph.node(id).unwrap().model().name(), "Scale");
        assert!(matches!(
            graph.create_node(&registry, "Nope"),
            Err(GraphError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_initial_propagation_on_connect() {
        let mut graph = Graph::default();
        let src = source(&mut graph, 5.0);
        let double = graph.add_node(Box::new(ScaleModel::new(2.0)));

        graph.connect(src, 0, double, 0).unwrap();

        let out = graph.node(double).unwrap().model().out_data(0).unwrap();
        assert_eq!(out.downcast_ref::<NumberData>(), Some(&NumberData(10.0)));
        assert_eq!(graph.last_report().deliveries, 1);
    }

    #[test]
    fn test_port_out_of_range() {
        let mut graph = Graph::default();
        let src = source(&mut graph, 1.0);
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));

        let err = graph.connect(src, 3, display, 0).unwrap_err();
        assert!(matches!(err, ConnectionError::PortOutOfRange { count: 1, .. }));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_capacity_keeps_first_connection() {
        let mut graph = Graph::default();
        let a = source(&mut graph, 1.0);
        let b = source(&mut graph, 2.0);
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));

        let first = graph.connect(a, 0, display, 0).unwrap();
        let err = graph.connect(b, 0, display, 0).unwrap_err();
        assert!(matches!(err, ConnectionError::Capacity(port) if port == PortRef::input(display, 0)));

        let attached: Vec<_> = graph.connections_at(PortRef::input(display, 0)).map(|c| c.id).collect();
        assert_eq!(attached, vec![first]);
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), Some(1.0));
    }

    #[test]
    fn test_converter_is_resolved_at_connect_time() {
        let mut graph = Graph::default();
        let src = source(&mut graph, 5.0);
        let text = graph.add_node(Box::new(TextDisplayModel::default()));

        let err = graph.connect(src, 0, text, 0).unwrap_err();
        assert!(matches!(err, ConnectionError::Incompatible { .. }));

        register_converters(graph.converters_mut());
        let id = graph.connect(src, 0, text, 0).unwrap();
        assert!(graph.connection(id).unwrap().has_converter());
        assert_eq!(graph.model::<TextDisplayModel>(text).unwrap().text(), Some("5"));

        let port = PortRef::input(text, 0);
        assert_eq!(graph.data_type(port).unwrap(), TextData::port_type());
    }

    #[test]
    fn test_disconnect_invalidates_and_is_idempotent() {
        let mut graph = Graph::default();
        let src = source(&mut graph, 3.0);
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));
        let id = graph.connect(src, 0, display, 0).unwrap();
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), Some(3.0));

        let report = graph.disconnect(id).unwrap();
        assert_eq!(report.deliveries, 1);
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), None);
        assert_eq!(graph.connections_at(PortRef::output(src, 0)).count(), 0);
        assert_eq!(graph.connections_at(PortRef::input(display, 0)).count(), 0);

        assert!(matches!(
            graph.disconnect(id),
            Err(ConnectionError::ConnectionNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_remove_node_drops_its_connections() {
        let mut graph = Graph::default();
        let src = source(&mut graph, 4.0);
        let scale = graph.add_node(Box::new(ScaleModel::new(2.0)));
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));
        graph.connect(src, 0, scale, 0).unwrap();
        graph.connect(scale, 0, display, 0).unwrap();
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), Some(8.0));

        graph.remove_node(scale).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.connections_for_node(src).count(), 0);
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), None);
    }

    #[test]
    fn test_set_input_data_checks_range() {
        let mut graph = Graph::default();
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));

        graph
            .set_input_data(display, 0, Some(NumberData::shared(7.0)))
            .unwrap();
        assert_eq!(graph.model::<NumberDisplayModel>(display).unwrap().value(), Some(7.0));
        assert!(graph.set_input_data(display, 1, None).is_err());
    }

    #[test]
    fn test_update_model_rejects_wrong_type() {
        let mut graph = Graph::default();
        let display = graph.add_node(Box::new(NumberDisplayModel::default()));
        let result = graph.update_model::<NumberSourceModel, _>(display, |model, signals| {
            model.set_number(1.0, signals);
        });
        assert!(result.is_err());
    }
}
