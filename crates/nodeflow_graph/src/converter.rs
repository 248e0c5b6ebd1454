// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type converter registry enabling links between differing port types.
//!
//! Converters are looked up by the ordered pair `(source id, destination id)`.
//! Equal ids never hit the registry: they resolve to [`Conversion::Identity`].

use crate::data::{NodeData, SharedData};
use crate::error::ConversionError;
use crate::port::PortDataType;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Function converting a value of one data type into another
pub type TypeConverter = Rc<dyn Fn(SharedData) -> Result<SharedData, ConversionError>>;

/// How a value travels along a connection
#[derive(Clone)]
pub enum Conversion {
    /// Types are equal, the value passes through unchanged
    Identity,
    /// Types differ, the value is converted first
    Convert(TypeConverter),
}

impl Conversion {
    /// Apply the conversion to a value
    pub fn apply(&self, data: SharedData) -> Result<SharedData, ConversionError> {
        match self {
            Self::Identity => Ok(data),
            Self::Convert(convert) => convert(data),
        }
    }

    /// Whether values pass through unchanged
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

impl fmt::Debug for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            Self::Convert(_) => f.write_str("Convert(..)"),
        }
    }
}

/// Registry of converters keyed by `(source type id, destination type id)`
#[derive(Clone, Default)]
pub struct TypeConverterRegistry {
    converters: IndexMap<(String, String), TypeConverter>,
}

impl TypeConverterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a converter. An existing entry for the same pair is replaced.
    pub fn register<F>(&mut self, from: impl Into<String>, to: impl Into<String>, convert: F)
    where
        F: Fn(SharedData) -> Result<SharedData, ConversionError> + 'static,
    {
        let key = (from.into(), to.into());
        tracing::debug!("Registering type converter {} -> {}", key.0, key.1);
        if self.converters.insert(key, Rc::new(convert)).is_some() {
            tracing::debug!("Replaced previously registered converter");
        }
    }

    /// Remove the converter for a pair, returning it if present
    pub fn unregister(&mut self, from: &str, to: &str) -> Option<TypeConverter> {
        self.converters
            .shift_remove(&(from.to_string(), to.to_string()))
    }

    /// Look up the converter for an ordered pair of type ids
    pub fn get(&self, from: &str, to: &str) -> Option<TypeConverter> {
        self.converters
            .get(&(from.to_string(), to.to_string()))
            .cloned()
    }

    /// Check if a converter exists for an ordered pair of type ids
    pub fn contains(&self, from: &str, to: &str) -> bool {
        self.converters
            .contains_key(&(from.to_string(), to.to_string()))
    }

    /// Decide how values of type `from` reach a port of type `to`.
    ///
    /// Returns `None` when the types differ and no converter is registered.
    pub fn resolve(&self, from: &PortDataType, to: &PortDataType) -> Option<Conversion> {
        if from.is_compatible_with(to) {
            return Some(Conversion::Identity);
        }
        self.get(&from.id, &to.id).map(Conversion::Convert)
    }

    /// All registered `(from, to)` pairs in registration order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.converters
            .keys()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Number of registered converters
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Whether no converter is registered
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for TypeConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.pairs()).finish()
    }
}

/// Downcast a converter input, failing with [`ConversionError::UnexpectedType`]
pub fn expect_data<'a, T: NodeData>(
    data: &'a SharedData,
    expected: &str,
) -> Result<&'a T, ConversionError> {
    data.downcast_ref::<T>()
        .ok_or_else(|| ConversionError::UnexpectedType {
            expected: expected.to_string(),
            actual: data.data_type().id,
        })
}
