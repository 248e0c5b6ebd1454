// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of available node models and type converters.

use crate::converter::TypeConverterRegistry;
use crate::data::SharedData;
use crate::error::ConversionError;
use crate::node::NodeDataModel;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node model category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Source nodes (constants, parameters)
    Input,
    /// Sink nodes (displays, previews)
    Output,
    /// Math operations
    Math,
    /// Type conversion
    Conversion,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// Function constructing a fresh model instance
pub type ModelFactory = Box<dyn Fn() -> Box<dyn NodeDataModel>>;

struct RegisteredModel {
    category: NodeCategory,
    factory: ModelFactory,
}

/// Registry of node model factories and the converters that go with them
#[derive(Default)]
pub struct NodeModelRegistry {
    models: IndexMap<String, RegisteredModel>,
    converters: TypeConverterRegistry,
}

impl NodeModelRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model factory. Returns the model name it was registered under.
    ///
    /// The name is read from a throwaway instance, so factories must be cheap.
    /// Registering a second factory for the same name replaces the first.
    pub fn register_model<F>(&mut self, category: NodeCategory, factory: F) -> String
    where
        F: Fn() -> Box<dyn NodeDataModel> + 'static,
    {
        let name = factory().name().to_string();
        tracing::debug!("Registering node model '{}' ({:?})", name, category);
        self.models.insert(
            name.clone(),
            RegisteredModel {
                category,
                factory: Box::new(factory),
            },
        );
        name
    }

    /// Register a model type constructed through `Default`
    pub fn register<M>(&mut self, category: NodeCategory) -> String
    where
        M: NodeDataModel + Default,
    {
        self.register_model(category, || Box::new(M::default()))
    }

    /// Register a type converter
    pub fn register_converter<F>(&mut self, from: impl Into<String>, to: impl Into<String>, convert: F)
    where
        F: Fn(SharedData) -> Result<SharedData, ConversionError> + 'static,
    {
        self.converters.register(from, to, convert);
    }

    /// Create a model instance by name
    pub fn create(&self, name: &str) -> Option<Box<dyn NodeDataModel>> {
        self.models.get(name).map(|model| (model.factory)())
    }

    /// Check if a model is registered
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Category of a registered model
    pub fn category_of(&self, name: &str) -> Option<NodeCategory> {
        self.models.get(name).map(|model| model.category)
    }

    /// All model names in registration order
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Model names in a category
    pub fn models_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &str> {
        self.models
            .iter()
            .filter(move |(_, model)| model.category == category)
            .map(|(name, _)| name.as_str())
    }

    /// Number of registered models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Registered type converters
    pub fn converters(&self) -> &TypeConverterRegistry {
        &self.converters
    }

    /// Mutable access to the registered type converters
    pub fn converters_mut(&mut self) -> &mut TypeConverterRegistry {
        &mut self.converters
    }
}

impl fmt::Debug for NodeModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeModelRegistry")
            .field("models", &self.models.keys().collect::<Vec<_>>())
            .field("converters", &self.converters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::calculator::{NumberDisplayModel, NumberSourceModel};

    #[test]
    fn test_register_and_create() {
        let mut registry = NodeModelRegistry::new();
        let name = registry.register::<NumberSourceModel>(NodeCategory::Input);
        registry.register::<NumberDisplayModel>(NodeCategory::Output);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&name));
        assert_eq!(registry.category_of(&name), Some(NodeCategory::Input));

        let model = registry.create(&name).unwrap();
        assert_eq!(model.name(), name);
        assert!(registry.create("Missing").is_none());
    }

    #[test]
    fn test_models_in_category() {
        let mut registry = NodeModelRegistry::new();
        registry.register::<NumberSourceModel>(NodeCategory::Input);
        registry.register::<NumberDisplayModel>(NodeCategory::Output);

        let outputs: Vec<_> = registry.models_in_category(NodeCategory::Output).collect();
        assert_eq!(outputs, vec!["NumberDisplay"]);
    }
}
