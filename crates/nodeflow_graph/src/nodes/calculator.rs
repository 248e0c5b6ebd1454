// SPDX-License-Identifier: MIT OR Apache-2.0
//! Calculator node set: number sources, arithmetic and displays.
//!
//! Also provides the converters between numbers, integers and text.

use crate::converter::{expect_data, TypeConverterRegistry};
use crate::data::{IntegerData, NumberData, SharedData, TextData};
use crate::error::ConversionError;
use crate::events::NodeSignals;
use crate::node::{NodeDataModel, NodeValidationState};
use crate::port::{PortDataType, PortDirection, PortIndex};
use crate::registry::{NodeCategory, NodeModelRegistry};
use std::any::Any;

/// Create the calculator node registry with all models and converters
pub fn create_calculator_registry() -> NodeModelRegistry {
    let mut registry = NodeModelRegistry::new();

    registry.register::<NumberSourceModel>(NodeCategory::Input);
    registry.register::<ScaleModel>(NodeCategory::Math);
    registry.register::<AdditionModel>(NodeCategory::Math);
    registry.register::<DivisionModel>(NodeCategory::Math);
    registry.register::<NumberDisplayModel>(NodeCategory::Output);
    registry.register::<TextDisplayModel>(NodeCategory::Output);

    register_converters(registry.converters_mut());
    registry
}

/// Register the converters between numbers, integers and text
pub fn register_converters(converters: &mut TypeConverterRegistry) {
    converters.register("number", "text", |data| {
        let number = expect_data::<NumberData>(&data, "number")?;
        Ok(TextData::shared(number.0.to_string()))
    });
    converters.register("text", "number", |data| {
        let text = expect_data::<TextData>(&data, "text")?;
        text.0
            .trim()
            .parse::<f64>()
            .map(NumberData::shared)
            .map_err(|_| ConversionError::Unrepresentable(format!("'{}' is not a number", text.0)))
    });
    converters.register("number", "integer", |data| {
        let number = expect_data::<NumberData>(&data, "number")?.0;
        if !number.is_finite() || number.abs() >= i64::MAX as f64 {
            return Err(ConversionError::Unrepresentable(format!("{number} does not fit an integer")));
        }
        Ok(IntegerData::shared(number.round() as i64))
    });
    converters.register("integer", "number", |data| {
        let integer = expect_data::<IntegerData>(&data, "integer")?;
        Ok(NumberData::shared(integer.0 as f64))
    });
}

/// Read a number input. `Err` when a value of another type arrives.
fn read_number(data: Option<&SharedData>) -> Result<Option<f64>, String> {
    match data {
        None => Ok(None),
        Some(value) => value
            .downcast_ref::<NumberData>()
            .map(|number| Some(number.0))
            .ok_or_else(|| format!("Expected a number, got '{}'", value.data_type().name)),
    }
}

/// Emit the signal matching an output's new state
fn announce(output: Option<f64>, signals: &mut NodeSignals) {
    if output.is_some() {
        signals.data_updated(0);
    } else {
        signals.data_invalidated(0);
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Source node holding a number set by the user
#[derive(Debug, Default)]
pub struct NumberSourceModel {
    number: Option<f64>,
    edited: bool,
}

impl NumberSourceModel {
    /// Set the value and announce it
    pub fn set_number(&mut self, number: f64, signals: &mut NodeSignals) {
        self.number = Some(number);
        self.edited = true;
        signals.data_updated(0);
    }

    /// Clear the value and announce the invalidation
    pub fn clear(&mut self, signals: &mut NodeSignals) {
        self.number = None;
        signals.data_invalidated(0);
    }

    /// Current value
    pub fn number(&self) -> Option<f64> {
        self.number
    }
}

impl NodeDataModel for NumberSourceModel {
    fn name(&self) -> &str {
        "NumberSource"
    }

    fn caption(&self) -> String {
        "Number Source".to_string()
    }

    fn n_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => 0,
            PortDirection::Out => 1,
        }
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn set_in_data(&mut self, _data: Option<SharedData>, _port: PortIndex, _signals: &mut NodeSignals) {}

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        self.number.map(NumberData::shared)
    }

    fn data_edited(&self) -> bool {
        self.edited
    }

    fn save_state(&self) -> Option<String> {
        self.number.map(|number| number.to_string())
    }

    fn restore_state(&mut self, state: &str, signals: &mut NodeSignals) {
        match state.parse::<f64>() {
            Ok(number) => self.set_number(number, signals),
            Err(_) => tracing::warn!("Ignoring saved number '{}'", state),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Math
// ============================================================================

/// Multiplies its input by a constant factor
#[derive(Debug)]
pub struct ScaleModel {
    factor: f64,
    input: Option<f64>,
    result: Option<f64>,
    state: NodeValidationState,
    message: String,
}

impl ScaleModel {
    /// Create a scale node with a factor
    pub fn new(factor: f64) -> Self {
        Self {
            factor,
            input: None,
            result: None,
            state: NodeValidationState::Valid,
            message: String::new(),
        }
    }

    /// Change the factor and recompute
    pub fn set_factor(&mut self, factor: f64, signals: &mut NodeSignals) {
        self.factor = factor;
        self.compute(signals);
    }

    /// Current factor
    pub fn factor(&self) -> f64 {
        self.factor
    }

    fn compute(&mut self, signals: &mut NodeSignals) {
        self.result = self.input.map(|input| input * self.factor);
        announce(self.result, signals);
    }
}

impl Default for ScaleModel {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl NodeDataModel for ScaleModel {
    fn name(&self) -> &str {
        "Scale"
    }

    fn caption(&self) -> String {
        format!("Scale x{}", self.factor)
    }

    fn n_ports(&self, _direction: PortDirection) -> usize {
        1
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn set_in_data(&mut self, data: Option<SharedData>, _port: PortIndex, signals: &mut NodeSignals) {
        match read_number(data.as_ref()) {
            Ok(input) => {
                self.input = input;
                self.state = NodeValidationState::Valid;
                self.message.clear();
            }
            Err(message) => {
                self.input = None;
                self.state = NodeValidationState::Error;
                self.message = message;
            }
        }
        self.compute(signals);
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        self.result.map(NumberData::shared)
    }

    fn save_state(&self) -> Option<String> {
        Some(self.factor.to_string())
    }

    fn restore_state(&mut self, state: &str, signals: &mut NodeSignals) {
        match state.parse::<f64>() {
            Ok(factor) => self.set_factor(factor, signals),
            Err(_) => tracing::warn!("Ignoring saved factor '{}'", state),
        }
    }

    fn validation_state(&self) -> NodeValidationState {
        self.state
    }

    fn validation_message(&self) -> String {
        self.message.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Shared state of two-operand operations
#[derive(Debug, Default)]
struct Operands {
    values: [Option<f64>; 2],
    result: Option<f64>,
    state: NodeValidationState,
    message: String,
}

impl Operands {
    /// Store an operand; false if it had the wrong type
    fn store(&mut self, data: Option<SharedData>, port: PortIndex) -> bool {
        let Some(slot) = self.values.get_mut(port) else {
            return false;
        };
        match read_number(data.as_ref()) {
            Ok(value) => {
                *slot = value;
                true
            }
            Err(message) => {
                *slot = None;
                self.fail(NodeValidationState::Error, message);
                false
            }
        }
    }

    fn both(&self) -> Option<(f64, f64)> {
        Some((self.values[0]?, self.values[1]?))
    }

    fn succeed(&mut self, result: f64) {
        self.result = Some(result);
        self.state = NodeValidationState::Valid;
        self.message.clear();
    }

    fn fail(&mut self, state: NodeValidationState, message: impl Into<String>) {
        self.result = None;
        self.state = state;
        self.message = message.into();
    }
}

/// Adds two numbers
#[derive(Debug, Default)]
pub struct AdditionModel {
    operands: Operands,
}

impl NodeDataModel for AdditionModel {
    fn name(&self) -> &str {
        "Addition"
    }

    fn n_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => 2,
            PortDirection::Out => 1,
        }
    }

    fn port_caption(&self, direction: PortDirection, index: PortIndex) -> String {
        match (direction, index) {
            (PortDirection::In, 0) => "A".to_string(),
            (PortDirection::In, _) => "B".to_string(),
            (PortDirection::Out, _) => "Result".to_string(),
        }
    }

    fn port_caption_visible(&self, _direction: PortDirection, _index: PortIndex) -> bool {
        true
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn set_in_data(&mut self, data: Option<SharedData>, port: PortIndex, signals: &mut NodeSignals) {
        signals.computing_started();
        if self.operands.store(data, port) {
            match self.operands.both() {
                Some((a, b)) => self.operands.succeed(a + b),
                None => self
                    .operands
                    .fail(NodeValidationState::Warning, "Missing or incorrect inputs"),
            }
        }
        announce(self.operands.result, signals);
        signals.computing_finished();
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        self.operands.result.map(NumberData::shared)
    }

    fn validation_state(&self) -> NodeValidationState {
        self.operands.state
    }

    fn validation_message(&self) -> String {
        self.operands.message.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Divides a numerator by a denominator
#[derive(Debug, Default)]
pub struct DivisionModel {
    operands: Operands,
}

impl NodeDataModel for DivisionModel {
    fn name(&self) -> &str {
        "Division"
    }

    fn n_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => 2,
            PortDirection::Out => 1,
        }
    }

    fn port_caption(&self, direction: PortDirection, index: PortIndex) -> String {
        match (direction, index) {
            (PortDirection::In, 0) => "Dividend".to_string(),
            (PortDirection::In, _) => "Divisor".to_string(),
            (PortDirection::Out, _) => "Result".to_string(),
        }
    }

    fn port_caption_visible(&self, _direction: PortDirection, _index: PortIndex) -> bool {
        true
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        NumberData::port_type()
    }

    fn set_in_data(&mut self, data: Option<SharedData>, port: PortIndex, signals: &mut NodeSignals) {
        signals.computing_started();
        if self.operands.store(data, port) {
            match self.operands.both() {
                Some((_, divisor)) if divisor == 0.0 => self
                    .operands
                    .fail(NodeValidationState::Error, "Division by zero error"),
                Some((dividend, divisor)) => self.operands.succeed(dividend / divisor),
                None => self
                    .operands
                    .fail(NodeValidationState::Warning, "Missing or incorrect inputs"),
            }
        }
        announce(self.operands.result, signals);
        signals.computing_finished();
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        self.operands.result.map(NumberData::shared)
    }

    fn validation_state(&self) -> NodeValidationState {
        self.operands.state
    }

    fn validation_message(&self) -> String {
        self.operands.message.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Displays
// ============================================================================

/// Sink showing the last number it received
#[derive(Debug)]
pub struct NumberDisplayModel {
    input_type: PortDataType,
    value: Option<f64>,
}

impl NumberDisplayModel {
    /// Create a display whose input accepts a custom data type
    pub fn with_type(input_type: PortDataType) -> Self {
        Self {
            input_type,
            value: None,
        }
    }

    /// Last received value
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Default for NumberDisplayModel {
    fn default() -> Self {
        Self::with_type(NumberData::port_type())
    }
}

impl NodeDataModel for NumberDisplayModel {
    fn name(&self) -> &str {
        "NumberDisplay"
    }

    fn caption(&self) -> String {
        "Result".to_string()
    }

    fn n_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => 1,
            PortDirection::Out => 0,
        }
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        self.input_type.clone()
    }

    fn set_in_data(&mut self, data: Option<SharedData>, _port: PortIndex, _signals: &mut NodeSignals) {
        self.value = read_number(data.as_ref()).ok().flatten();
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Sink showing the last text it received
#[derive(Debug, Default)]
pub struct TextDisplayModel {
    text: Option<String>,
}

impl TextDisplayModel {
    /// Last received text
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl NodeDataModel for TextDisplayModel {
    fn name(&self) -> &str {
        "TextDisplay"
    }

    fn n_ports(&self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::In => 1,
            PortDirection::Out => 0,
        }
    }

    fn data_type(&self, _direction: PortDirection, _index: PortIndex) -> PortDataType {
        TextData::port_type()
    }

    fn set_in_data(&mut self, data: Option<SharedData>, _port: PortIndex, _signals: &mut NodeSignals) {
        self.text = data
            .as_ref()
            .and_then(|value| value.downcast_ref::<TextData>())
            .map(|text| text.0.clone());
    }

    fn out_data(&self, _port: PortIndex) -> Option<SharedData> {
        None
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contents() {
        let registry = create_calculator_registry();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains("Addition"));
        assert!(registry.converters().contains("number", "text"));
        assert!(registry.converters().contains("text", "number"));
    }

    #[test]
    fn test_text_to_number_rejects_garbage() {
        let mut converters = TypeConverterRegistry::new();
        register_converters(&mut converters);
        let convert = converters.get("text", "number").unwrap();

        let number = convert(TextData::shared(" 2.5 ")).unwrap();
        assert_eq!(number.downcast_ref::<NumberData>(), Some(&NumberData(2.5)));
        assert!(matches!(
            convert(TextData::shared("abc")),
            Err(ConversionError::Unrepresentable(_))
        ));
    }

    #[test]
    fn test_number_to_integer_rounds() {
        let mut converters = TypeConverterRegistry::new();
        register_converters(&mut converters);
        let convert = converters.get("number", "integer").unwrap();

        let integer = convert(NumberData::shared(2.6)).unwrap();
        assert_eq!(integer.downcast_ref::<IntegerData>(), Some(&IntegerData(3)));
        assert!(convert(NumberData::shared(f64::NAN)).is_err());
    }

    #[test]
    fn test_number_to_integer_rejects_overflow_boundary() {
        let mut converters = TypeConverterRegistry::new();
        register_converters(&mut converters);
        let convert = converters.get("number", "integer").unwrap();

        // 2^63 is the first f64 past i64::MAX
        let boundary = 9_223_372_036_854_775_808.0_f64;
        assert!(matches!(
            convert(NumberData::shared(boundary)),
            Err(ConversionError::Unrepresentable(_))
        ));
        let below = convert(NumberData::shared(9_007_199_254_740_992.0)).unwrap();
        assert_eq!(below.downcast_ref::<IntegerData>(), Some(&IntegerData(9_007_199_254_740_992)));
    }

    #[test]
    fn test_addition_warns_until_both_inputs() {
        let mut add = AdditionModel::default();
        let mut signals = NodeSignals::new();

        add.set_in_data(Some(NumberData::shared(1.0)), 0, &mut signals);
        assert_eq!(add.validation_state(), NodeValidationState::Warning);
        assert!(add.out_data(0).is_none());

        add.set_in_data(Some(NumberData::shared(2.0)), 1, &mut signals);
        assert_eq!(add.validation_state(), NodeValidationState::Valid);
        let sum = add.out_data(0).unwrap();
        assert_eq!(sum.downcast_ref::<NumberData>(), Some(&NumberData(3.0)));
    }

    #[test]
    fn test_scale_rejects_wrong_type() {
        let mut scale = ScaleModel::default();
        let mut signals = NodeSignals::new();
        scale.set_in_data(Some(TextData::shared("5")), 0, &mut signals);
        assert_eq!(scale.validation_state(), NodeValidationState::Error);
        assert!(scale.out_data(0).is_none());
        assert_eq!(signals.events(), &[crate::events::NodeEvent::DataInvalidated(0)]);
    }

    #[test]
    fn test_division_by_zero_is_an_error_state() {
        let mut divide = DivisionModel::default();
        let mut signals = NodeSignals::new();
        divide.set_in_data(Some(NumberData::shared(1.0)), 0, &mut signals);
        divide.set_in_data(Some(NumberData::shared(0.0)), 1, &mut signals);
        assert_eq!(divide.validation_state(), NodeValidationState::Error);
        assert_eq!(divide.validation_message(), "Division by zero error");
        assert!(divide.out_data(0).is_none());
    }
}
