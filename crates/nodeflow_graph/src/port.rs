// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.
//!
//! A port is not an object of its own: it is addressed by the owning node,
//! a direction and an index. Its data type and connection policy are answered
//! by the node's model.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a port among the ports of one direction on a node
pub type PortIndex = usize;

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    In,
    /// Output port
    Out,
}

impl PortDirection {
    /// The direction a connection's other end must have
    pub fn opposite(self) -> Self {
        match self {
            Self::In => Self::Out,
            Self::Out => Self::In,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.write_str("in"),
            Self::Out => f.write_str("out"),
        }
    }
}

/// Identity of the kind of value a port carries.
///
/// Two types are directly compatible iff their ids are equal. The name is
/// only a display label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortDataType {
    /// Identifier compared for compatibility
    pub id: String,
    /// Human-readable name
    pub name: String,
}

impl PortDataType {
    /// Create a new data type
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Check if values of this type can flow into `other` without conversion
    pub fn is_compatible_with(&self, other: &PortDataType) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for PortDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Maximum number of simultaneous connections on a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionPolicy {
    /// At most one connection
    One,
    /// Any number of connections
    Many,
}

impl ConnectionPolicy {
    /// Whether a port currently holding `occupied` connections accepts another
    pub fn accepts(self, occupied: usize) -> bool {
        match self {
            Self::One => occupied == 0,
            Self::Many => true,
        }
    }
}

/// Address of a port: owning node, direction and index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// Owning node
    pub node: NodeId,
    /// Port direction
    pub direction: PortDirection,
    /// Port index within its direction
    pub index: PortIndex,
}

impl PortRef {
    /// Address an input port
    pub fn input(node: NodeId, index: PortIndex) -> Self {
        Self {
            node,
            direction: PortDirection::In,
            index,
        }
    }

    /// Address an output port
    pub fn output(node: NodeId, index: PortIndex) -> Self {
        Self {
            node,
            direction: PortDirection::Out,
            index,
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.node, self.direction, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compatibility_is_by_id() {
        let a = PortDataType::new("number", "Number");
        let b = PortDataType::new("number", "Decimal");
        let c = PortDataType::new("text", "Number");
        assert!(a.is_compatible_with(&b));
        assert!(!a.is_compatible_with(&c));
    }

    #[test]
    fn test_policy_capacity() {
        assert!(ConnectionPolicy::One.accepts(0));
        assert!(!ConnectionPolicy::One.accepts(1));
        assert!(ConnectionPolicy::Many.accepts(0));
        assert!(ConnectionPolicy::Many.accepts(42));
    }

    #[test]
    fn test_port_ref_constructors() {
        let node = NodeId::new();
        let port = PortRef::input(node, 2);
        assert_eq!(port.direction, PortDirection::In);
        assert_eq!(port.index, 2);
        assert_eq!(PortRef::output(node, 0).direction.opposite(), PortDirection::In);
    }
}
