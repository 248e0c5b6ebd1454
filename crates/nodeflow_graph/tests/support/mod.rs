// SPDX-License-Identifier: MIT OR Apache-2.0
//! Instrumented models shared by the integration tests.

#![allow(dead_code)]

use nodeflow_graph::{
    Connection, ConnectionId, ConnectionPolicy, NodeDataModel, NodeSignals, NumberData, PortDataType,
    PortDirection, PortIndex, SharedData,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Shared log of lifecycle hook calls
pub type HookLog = Rc<RefCell<Vec<String>>>;

/// Passes its number input through and counts deliveries
#[derive(Default)]
pub struct Relay {
    pub deliveries: Rc<Cell<usize>>,
    pub hooks: HookLog,
    pub active: Rc<Cell<i32>>,
    value: Option<f64>,
    exclusive_output: bool,
}

impl Relay {
    pub fn counted(deliveries: Rc<Cell<usize>>) -> Self {
        Self {
            deliveries,
            ..Self::default()
        }
    }

    pub fn with_hooks(hooks: HookLog) -> Self {
        Self {
            hooks,
            ..Self::default()
        }
    }

    pub fn with_activation(active: Rc<Cell<i32>>) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    pub fn exclusive() -> Self {
        Self {
            exclusive_output: true,
            ..Self::default()
        }
    }

    /// Publish a value as if the user had typed it into the node
    pub fn seed(&mut self, value: f64, signals: &mut NodeSignals) {
        self.value = Some(value);
        signals.data_updated(0);
    }
}

impl NodeDataModel for Relay {
    fn name(&self) -> &str {
        "Relay"
    }

    fn n_ports(&self, _direction: PortDirection) -> usize {
        1
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn port_out_connection_policy(&self, _index: PortIndex) -> ConnectionPolicy {
        if self.exclusive_output {
            ConnectionPolicy::One
        } else {
            ConnectionPolicy::Many
        }
    }

    fn set_in_data(&mut self, data: Option<SharedData>, _port: PortIndex, signals: &mut NodeSignals) {
        self.deliveries.set(self.deliveries.get() + 1);
        self.value = data
            .as_ref()
            .and_then(|value| value.downcast_ref::<NumberData>())
            .map(|number| number.0);
        if self.value.is_some() {
            signals.data_updated(0);
        } else {
            signals.data_invalidated(0);
        }
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        self.value.map(NumberData::shared)
    }

    fn activate(&mut self) {
        self.active.set(self.active.get() + 1);
    }

    fn deactivate(&mut self) {
        self.active.set(self.active.get() - 1);
    }

    fn input_connection_created(&mut self, _connection: &Connection) {
        self.hooks.borrow_mut().push("input_created".to_string());
    }

    fn input_connection_deleted(&mut self, _connection: &Connection) {
        self.hooks.borrow_mut().push("input_deleted".to_string());
    }

    fn output_connection_created(&mut self, _connection: &Connection) {
        self.hooks.borrow_mut().push("output_created".to_string());
    }

    fn output_connection_deleted(&mut self, _connection: &Connection) {
        self.hooks.borrow_mut().push("output_deleted".to_string());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sums every source connected to its single `Many` input
#[derive(Default)]
pub struct Sum {
    contributions: HashMap<ConnectionId, f64>,
}

impl Sum {
    pub fn total(&self) -> f64 {
        self.contributions.values().sum()
    }

    pub fn sources(&self) -> usize {
        self.contributions.len()
    }
}

impl NodeDataModel for Sum {
    fn name(&self) -> &str {
        "Sum"
    }

    fn n_ports(&self, _direction: PortDirection) -> usize {
        1
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn port_in_connection_policy(&self, _index: PortIndex) -> ConnectionPolicy {
        ConnectionPolicy::Many
    }

    fn set_in_data(&mut self, _data: Option<SharedData>, _port: PortIndex, _signals: &mut NodeSignals) {}

    fn set_in_data_from(
        &mut self,
        data: Option<SharedData>,
        _port: PortIndex,
        connection: ConnectionId,
        signals: &mut NodeSignals,
    ) {
        match data.as_ref().and_then(|value| value.downcast_ref::<NumberData>()) {
            Some(number) => {
                self.contributions.insert(connection, number.0);
            }
            None => {
                self.contributions.remove(&connection);
            }
        }
        signals.data_updated(0);
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        Some(NumberData::shared(self.total()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
