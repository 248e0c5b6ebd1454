// SPDX-License-Identifier: MIT OR Apache-2.0
//! Dataflow graph engine for node editors.
//!
//! Users compose typed processing nodes into a directed graph, connect output
//! ports to input ports, and data recomputes along those connections.
//!
//! ## Architecture
//!
//! - [`port`]: port addressing, data type identity and connection policies
//! - [`data`]: type-erased values flowing through ports
//! - [`converter`]: converters that let differing port types connect
//! - [`node`]: the [`NodeDataModel`] contract every node implements
//! - [`events`]: signals emitted by models and per-node observers
//! - [`connection`]: directed edges between an output and an input
//! - [`graph`]: the node/connection store and its mutation interface
//! - [`propagation`]: depth-first propagation passes with a cycle guard
//! - [`registry`]: model factories and converters by name
//! - [`snapshot`]: topology capture and restore
//!
//! Rendering, geometry and interaction live outside this crate; they read the
//! query interface and subscribe to node events.
//!
//! The engine is single-threaded. Every mutation runs its propagation pass to
//! completion before returning.

pub mod config;
pub mod connection;
pub mod converter;
pub mod data;
pub mod error;
pub mod events;
pub mod graph;
pub mod node;
pub mod nodes;
pub mod port;
pub mod propagation;
pub mod registry;
pub mod snapshot;

pub use config::GraphConfig;
pub use connection::{Connection, ConnectionId};
pub use converter::{Conversion, TypeConverter, TypeConverterRegistry};
pub use data::{IntegerData, NodeData, NumberData, SharedData, TextData};
pub use error::{ConnectionError, ConversionError, GraphError};
pub use events::{NodeEvent, NodeSignals, SubscriptionId};
pub use graph::Graph;
pub use node::{Node, NodeDataModel, NodeId, NodeValidationState};
pub use port::{ConnectionPolicy, PortDataType, PortDirection, PortIndex, PortRef};
pub use propagation::{CycleDetected, PropagationReport};
pub use registry::{NodeCategory, NodeModelRegistry};
pub use snapshot::{GraphSnapshot, NodeSpec};
