// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.

use crate::converter::Conversion;
use crate::data::SharedData;
use crate::error::ConversionError;
use crate::node::NodeId;
use crate::port::{PortDirection, PortIndex, PortRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed connection from an output port to an input port.
///
/// Connections own no data. When the two port types differ the connection
/// carries the converter that was resolved when it was created.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Unique connection ID
    pub id: ConnectionId,
    /// Source node ID
    pub out_node: NodeId,
    /// Source output port
    pub out_port: PortIndex,
    /// Target node ID
    pub in_node: NodeId,
    /// Target input port
    pub in_port: PortIndex,
    conversion: Conversion,
}

impl Connection {
    /// Create a new connection
    pub(crate) fn new(
        out_node: NodeId,
        out_port: PortIndex,
        in_node: NodeId,
        in_port: PortIndex,
        conversion: Conversion,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            out_node,
            out_port,
            in_node,
            in_port,
            conversion,
        }
    }

    /// The output end
    pub fn output(&self) -> PortRef {
        PortRef::output(self.out_node, self.out_port)
    }

    /// The input end
    pub fn input(&self) -> PortRef {
        PortRef::input(self.in_node, self.in_port)
    }

    /// The end with the given direction
    pub fn endpoint(&self, direction: PortDirection) -> PortRef {
        match direction {
            PortDirection::Out => self.output(),
            PortDirection::In => self.input(),
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.out_node == node_id || self.in_node == node_id
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, port: PortRef) -> bool {
        self.output() == port || self.input() == port
    }

    /// How values are carried across
    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    /// Whether values are converted on the way
    pub fn has_converter(&self) -> bool {
        !self.conversion.is_identity()
    }

    /// Carry a value across, converting it when needed. Empty stays empty.
    pub fn transfer(&self, data: Option<SharedData>) -> Result<Option<SharedData>, ConversionError> {
        data.map(|value| self.conversion.apply(value)).transpose()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.output(), self.input())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NumberData, TextData};
    use std::rc::Rc;

    #[test]
    fn test_endpoints() {
        let (a, b) = (NodeId::new(), NodeId::new());
        let connection = Connection::new(a, 0, b, 1, Conversion::Identity);
        assert_eq!(connection.output(), PortRef::output(a, 0));
        assert_eq!(connection.endpoint(PortDirection::In), PortRef::input(b, 1));
        assert!(connection.involves_node(a));
        assert!(connection.involves_port(PortRef::input(b, 1)));
        assert!(!connection.involves_port(PortRef::input(b, 0)));
        assert!(!connection.has_converter());
    }

    #[test]
    fn test_transfer_converts_values_and_keeps_empty() {
        let convert = Conversion::Convert(Rc::new(|data: SharedData| -> Result<SharedData, ConversionError> {
            let number = data.downcast_ref::<NumberData>().map_or(0.0, |n| n.0);
            Ok(TextData::shared(number.to_string()))
        }));
        let connection = Connection::new(NodeId::new(), 0, NodeId::new(), 0, convert);
        assert!(connection.has_converter());

        let text = connection.transfer(Some(NumberData::shared(5.0))).unwrap().unwrap();
        assert_eq!(text.downcast_ref::<TextData>().unwrap().0, "5");
        assert!(connection.transfer(None).unwrap().is_none());
    }
}
