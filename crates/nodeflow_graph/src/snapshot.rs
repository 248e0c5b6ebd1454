// SPDX-License-Identifier: MIT OR Apache-2.0
//! Topology snapshots for saving and rebuilding graphs.
//!
//! A snapshot records model names, the state each model chooses to save
//! through [`save_state`](crate::NodeDataModel::save_state), and connection endpoints. Restoring
//! goes through the same creation APIs an editor uses, so every connection is
//! validated and initial propagation runs again.

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::PortIndex;
use crate::registry::NodeModelRegistry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Connection endpoints, with nodes referenced by their snapshot position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Position of the source node
    pub out_node: usize,
    /// Source output port
    pub out_port: PortIndex,
    /// Position of the target node
    pub in_node: usize,
    /// Target input port
    pub in_port: PortIndex,
}

/// A node as recorded in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Registered model name
    pub model: String,
    /// Saved model state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl NodeSpec {
    /// A node without saved state
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            state: None,
        }
    }
}

/// Serializable graph topology and model state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Graph name
    pub name: String,
    /// Each node, in graph order
    pub nodes: Vec<NodeSpec>,
    /// Connections in creation order
    pub connections: Vec<ConnectionSpec>,
}

impl GraphSnapshot {
    /// Record the topology of a graph
    pub fn capture(graph: &Graph) -> Self {
        let positions: IndexMap<NodeId, usize> = graph
            .node_ids()
            .enumerate()
            .map(|(position, id)| (id, position))
            .collect();

        let connections = graph
            .connections()
            .filter_map(|c| {
                Some(ConnectionSpec {
                    out_node: *positions.get(&c.out_node)?,
                    out_port: c.out_port,
                    in_node: *positions.get(&c.in_node)?,
                    in_port: c.in_port,
                })
            })
            .collect();

        Self {
            name: graph.name.clone(),
            nodes: graph
                .nodes()
                .map(|node| NodeSpec {
                    model: node.model().name().to_string(),
                    state: node.model().save_state(),
                })
                .collect(),
            connections,
        }
    }

    /// Rebuild a graph from the registry's models and converters.
    ///
    /// Returns the graph and the new node IDs in snapshot order.
    pub fn restore(&self, registry: &NodeModelRegistry) -> Result<(Graph, Vec<NodeId>)> {
        let mut graph = Graph::from_registry(self.name.clone(), registry);
        let mut ids = Vec::with_capacity(self.nodes.len());
        for spec in &self.nodes {
            let id = graph.create_node(registry, &spec.model)?;
            if let Some(state) = &spec.state {
                graph.update_node(id, |model, signals| model.restore_state(state, signals))?;
            }
            ids.push(id);
        }

        for spec in &self.connections {
            let out_node = *ids
                .get(spec.out_node)
                .ok_or(GraphError::DanglingSnapshotNode(spec.out_node))?;
            let in_node = *ids
                .get(spec.in_node)
                .ok_or(GraphError::DanglingSnapshotNode(spec.in_node))?;
            graph.connect(out_node, spec.out_port, in_node, spec.in_port)?;
        }

        tracing::debug!(
            "Restored graph '{}' with {} nodes and {} connections",
            graph.name,
            graph.node_count(),
            graph.connection_count()
        );
        Ok((graph, ids))
    }

    /// Encode as RON
    pub fn to_ron(&self) -> std::result::Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Decode from RON
    pub fn from_ron(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }
}
