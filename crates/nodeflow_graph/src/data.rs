// SPDX-License-Identifier: MIT OR Apache-2.0
//! Values that flow through ports.
//!
//! Port values are type-erased so node sets can bring their own data types.
//! An absent value (`None`) means "not yet computed" or "invalidated".

use crate::port::PortDataType;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A value carried on a port
pub trait NodeData: Any + fmt::Debug {
    /// The data type this value belongs to
    fn data_type(&self) -> PortDataType;

    /// Access as `Any` for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a port value
pub type SharedData = Rc<dyn NodeData>;

impl dyn NodeData {
    /// Downcast to a concrete data type
    pub fn downcast_ref<T: NodeData>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Floating point number
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberData(pub f64);

impl NumberData {
    /// Data type of numbers
    pub fn port_type() -> PortDataType {
        PortDataType::new("number", "Number")
    }

    /// Wrap a number into a shared port value
    pub fn shared(value: f64) -> SharedData {
        Rc::new(Self(value))
    }
}

impl NodeData for NumberData {
    fn data_type(&self) -> PortDataType {
        Self::port_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Whole number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerData(pub i64);

impl IntegerData {
    /// Data type of integers
    pub fn port_type() -> PortDataType {
        PortDataType::new("integer", "Integer")
    }

    /// Wrap an integer into a shared port value
    pub fn shared(value: i64) -> SharedData {
        Rc::new(Self(value))
    }
}

impl NodeData for IntegerData {
    fn data_type(&self) -> PortDataType {
        Self::port_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Text value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextData(pub String);

impl TextData {
    /// Data type of text
    pub fn port_type() -> PortDataType {
        PortDataType::new("text", "Text")
    }

    /// Wrap a string into a shared port value
    pub fn shared(value: impl Into<String>) -> SharedData {
        Rc::new(Self(value.into()))
    }
}

impl NodeData for TextData {
    fn data_type(&self) -> PortDataType {
        Self::port_type()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let value = NumberData::shared(2.5);
        assert_eq!(value.downcast_ref::<NumberData>(), Some(&NumberData(2.5)));
        assert!(value.downcast_ref::<TextData>().is_none());
        assert_eq!(value.data_type().id, "number");
    }
}
