// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph mutation and value conversion.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use crate::port::{PortDataType, PortRef};

/// Error when creating or removing a connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port index beyond the node's port count
    #[error("Port out of range: {port} (node has {count} ports in that direction)")]
    PortOutOfRange {
        /// Offending port
        port: PortRef,
        /// Number of ports the node declares in that direction
        count: usize,
    },

    /// Data types differ and no converter is registered
    #[error("Incompatible port types: {from} cannot flow into {to}")]
    Incompatible {
        /// Data type of the output port
        from: PortDataType,
        /// Data type of the input port
        to: PortDataType,
    },

    /// Port already holds as many connections as its policy allows
    #[error("Port at capacity: {0}")]
    Capacity(PortRef),

    /// Connection does not exist (never created or already removed)
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
}

/// Error from a graph-level operation
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// No model registered under this name
    #[error("Unknown node model: {0}")]
    UnknownModel(String),

    /// Connection failure
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Snapshot encoding failure
    #[error("Snapshot encoding error: {0}")]
    Encode(#[from] ron::Error),

    /// Snapshot decoding failure
    #[error("Snapshot decoding error: {0}")]
    Decode(#[from] ron::error::SpannedError),

    /// Snapshot refers to a node index it does not contain
    #[error("Snapshot refers to missing node #{0}")]
    DanglingSnapshotNode(usize),
}

/// Failure inside a type converter
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// Input value was not of the converter's source type
    #[error("Expected a value of type '{expected}', got '{actual}'")]
    UnexpectedType {
        /// Source type id the converter handles
        expected: String,
        /// Type id of the value received
        actual: String,
    },

    /// Value could not be represented in the destination type
    #[error("Cannot convert value: {0}")]
    Unrepresentable(String),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
