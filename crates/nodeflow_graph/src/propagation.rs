// SPDX-License-Identifier: MIT OR Apache-2.0
//! Propagation of data changes through the graph.
//!
//! A pass starts from one root change and runs depth-first until no work is
//! left. Every delivery remembers the chain of input deliveries that caused
//! it. A delivery to an input already on its own chain means the change came
//! around a cycle; it is skipped and recorded as [`CycleDetected`]. Inputs
//! reached along several acyclic paths, as in a diamond, are delivered once
//! per path so the last delivery carries the settled value.

use crate::connection::ConnectionId;
use crate::data::SharedData;
use crate::events::{NodeEvent, NodeSignals};
use crate::graph::Graph;
use crate::node::{NodeId, NodeValidationState};
use crate::port::{ConnectionPolicy, PortDirection, PortIndex};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A delivery suppressed because it would re-enter an input that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleDetected {
    /// Node whose input was revisited
    pub node: NodeId,
    /// Revisited input port
    pub port: PortIndex,
    /// Connection the suppressed delivery came through
    pub connection: Option<ConnectionId>,
}

/// Outcome of one propagation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Values (or invalidations) handed to node inputs
    pub deliveries: usize,
    /// Conversions that failed and were delivered as empty
    pub conversion_failures: usize,
    /// Deliveries suppressed by the cycle guard
    pub cycles: Vec<CycleDetected>,
    /// Whether the pass stopped at the configured delivery bound
    pub aborted: bool,
}

impl PropagationReport {
    /// Whether the pass saw no cycle, no failed conversion and no abort
    pub fn is_clean(&self) -> bool {
        self.cycles.is_empty() && self.conversion_failures == 0 && !self.aborted
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: PropagationReport) {
        self.deliveries += other.deliveries;
        self.conversion_failures += other.conversion_failures;
        self.cycles.extend(other.cycles);
        self.aborted |= other.aborted;
    }
}

/// Identity of an input delivery.
///
/// Inputs with a `Many` policy are keyed per connection so that several
/// sources feeding the same port are told apart.
type VisitKey = (NodeId, PortIndex, Option<ConnectionId>);

/// Link in the chain of deliveries a piece of work descends from
pub(crate) struct Ancestry {
    key: VisitKey,
    parent: Path,
}

/// Innermost delivery first; `None` at the root change
pub(crate) type Path = Option<Rc<Ancestry>>;

fn extend(path: &Path, key: VisitKey) -> Path {
    Some(Rc::new(Ancestry {
        key,
        parent: path.clone(),
    }))
}

fn descends_from(path: &Path, key: &VisitKey) -> bool {
    let mut link = path.as_deref();
    while let Some(ancestry) = link {
        if ancestry.key == *key {
            return true;
        }
        link = ancestry.parent.as_deref();
    }
    false
}

/// Pending step of a pass
pub(crate) enum Work {
    /// Push the current output through a freshly created connection
    Initial {
        connection: ConnectionId,
    },
    /// An output changed; feed every connection leaving it
    Output {
        node: NodeId,
        port: PortIndex,
        invalidated: bool,
        path: Path,
    },
    /// Hand a value to an input
    Deliver {
        node: NodeId,
        port: PortIndex,
        connection: Option<ConnectionId>,
        data: Option<SharedData>,
        path: Path,
    },
}

impl Work {
    /// Root delivery of a value to an input
    pub(crate) fn deliver(
        node: NodeId,
        port: PortIndex,
        connection: Option<ConnectionId>,
        data: Option<SharedData>,
    ) -> Self {
        Work::Deliver {
            node,
            port,
            connection,
            data,
            path: None,
        }
    }
}

impl Graph {
    /// Run a pass to completion starting from `seed`
    pub(crate) fn run_pass(&mut self, seed: Vec<Work>) -> PropagationReport {
        let max_deliveries = self.config().max_deliveries_per_pass;
        let log_cycles = self.config().log_cycles;

        let mut report = PropagationReport::default();
        let mut stack: Vec<Work> = seed.into_iter().rev().collect();

        while let Some(work) = stack.pop() {
            match work {
                Work::Initial { connection } => {
                    let Some(link) = self.connections_map().get(&connection) else {
                        continue;
                    };
                    let (out_node, out_port) = (link.out_node, link.out_port);
                    if self.output_value(out_node, out_port).is_some() {
                        self.expand_output(out_node, out_port, false, Some(connection), &None, &mut stack, &mut report);
                    }
                }
                Work::Output { node, port, invalidated, path } => {
                    self.expand_output(node, port, invalidated, None, &path, &mut stack, &mut report);
                }
                Work::Deliver { node, port, connection, data, path } => {
                    if report.deliveries >= max_deliveries {
                        tracing::error!(
                            "Propagation stopped after {} deliveries; a node keeps emitting",
                            report.deliveries
                        );
                        report.aborted = true;
                        break;
                    }

                    let Some(target) = self.nodes_mut().get_mut(&node) else {
                        continue;
                    };
                    let many = target.model().port_in_connection_policy(port) == ConnectionPolicy::Many;
                    let key = (node, port, if many { connection } else { None });
                    if descends_from(&path, &key) {
                        if log_cycles {
                            tracing::warn!("Cycle detected at {}.in{}; delivery skipped", node, port);
                        }
                        report.cycles.push(CycleDetected { node, port, connection });
                        continue;
                    }

                    report.deliveries += 1;
                    tracing::trace!(
                        "Delivering {} to {}.in{}",
                        if data.is_some() { "data" } else { "invalidation" },
                        node,
                        port
                    );

                    let mut signals = NodeSignals::new();
                    match connection {
                        Some(connection) if many => {
                            target.model_mut().set_in_data_from(data, port, connection, &mut signals);
                        }
                        _ => target.model_mut().set_in_data(data, port, &mut signals),
                    }
                    self.dispatch(node, signals.take(), &extend(&path, key), &mut stack);
                }
            }
        }

        report
    }

    /// Forward a node's events to its observers and queue data events.
    ///
    /// Queued outputs are processed in emission order and inherit `path`.
    pub(crate) fn dispatch(&mut self, node_id: NodeId, events: Vec<NodeEvent>, path: &Path, stack: &mut Vec<Work>) {
        let Some(node) = self.nodes_mut().get_mut(&node_id) else {
            return;
        };
        for event in &events {
            node.observers.notify(node_id, event);
        }

        let outputs: Vec<Work> = events
            .iter()
            .filter_map(|event| match *event {
                NodeEvent::DataUpdated(port) => Some((port, false)),
                NodeEvent::DataInvalidated(port) => Some((port, true)),
                NodeEvent::ComputingStarted | NodeEvent::ComputingFinished => None,
            })
            .map(|(port, invalidated)| Work::Output {
                node: node_id,
                port,
                invalidated,
                path: path.clone(),
            })
            .collect();
        stack.extend(outputs.into_iter().rev());
    }

    /// Value an output currently propagates, honouring the error policy
    fn output_value(&self, node_id: NodeId, port: PortIndex) -> Option<SharedData> {
        let model = self.node(node_id)?.model();
        if self.config().invalidate_on_error && model.validation_state() == NodeValidationState::Error {
            return None;
        }
        model.out_data(port)
    }

    /// Queue deliveries for the connections leaving an output.
    ///
    /// With `only` set, just that connection is fed.
    fn expand_output(
        &self,
        node_id: NodeId,
        port: PortIndex,
        invalidated: bool,
        only: Option<ConnectionId>,
        path: &Path,
        stack: &mut Vec<Work>,
        report: &mut PropagationReport,
    ) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        let Some(attached) = node.connections(PortDirection::Out, port) else {
            tracing::warn!("Node {} signalled unknown output {}", node_id, port);
            return;
        };
        let data = if invalidated { None } else { self.output_value(node_id, port) };

        let mut deliveries = Vec::with_capacity(attached.len());
        for id in attached.iter().filter(|id| only.map_or(true, |only| only == **id)) {
            let Some(connection) = self.connection(*id) else {
                continue;
            };
            let value = match connection.transfer(data.clone()) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!("Conversion failed on {}: {}", connection, err);
                    report.conversion_failures += 1;
                    None
                }
            };
            deliveries.push(Work::Deliver {
                node: connection.in_node,
                port: connection.in_port,
                connection: Some(connection.id),
                data: value,
                path: path.clone(),
            });
        }
        stack.extend(deliveries.into_iter().rev());
    }
}
