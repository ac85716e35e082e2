use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use zoe_model::ModelTool;

use crate::tool::Tool;
use crate::tool::object::{ToolObject, ToolObjectImpl};

/// Errors raised while building a [`Registry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two tools share the same key.
    #[error("duplicate tool key: {0}")]
    DuplicateKey(String),
}

/// An immutable handle to a registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub(crate) object: Arc<dyn ToolObject>,
}

impl ToolDescriptor {
    /// Returns the key of the tool.
    #[inline]
    pub fn key(&self) -> &str {
        self.object.key()
    }

    /// Returns the human readable name of the tool.
    #[inline]
    pub fn display_name(&self) -> &str {
        self.object.display_name()
    }

    /// Returns the description shown to the model.
    #[inline]
    pub fn description(&self) -> &str {
        self.object.description()
    }

    /// Returns the parameter schema of the tool.
    #[inline]
    pub fn parameter_schema(&self) -> &Value {
        self.object.parameter_schema()
    }

    /// Returns the definition advertised to the model.
    pub fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.key().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameter_schema().clone(),
        }
    }
}

impl Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("key", &self.key())
            .finish_non_exhaustive()
    }
}

/// [`Registry`] builder.
#[derive(Default)]
pub struct RegistryBuilder {
    tools: Vec<ToolDescriptor>,
}

impl RegistryBuilder {
    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(ToolDescriptor {
            object: Arc::new(ToolObjectImpl(tool)),
        });
        self
    }

    /// Builds the registry, rejecting duplicate keys.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut index = HashMap::with_capacity(self.tools.len());
        for (idx, tool) in self.tools.iter().enumerate() {
            if index.insert(tool.key().to_owned(), idx).is_some() {
                return Err(RegistryError::DuplicateKey(tool.key().to_owned()));
            }
        }
        Ok(Registry {
            tools: self.tools,
            index,
        })
    }
}

/// All tools known to the process, keyed by their unique key.
///
/// A registry is built once at startup and never changes afterwards.
pub struct Registry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Creates a builder.
    #[inline]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Returns the keys of all tools in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::key).collect()
    }

    /// Returns the tool with the given key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&ToolDescriptor> {
        self.index.get(key).map(|idx| &self.tools[*idx])
    }

    /// Returns the tools for the given keys.
    ///
    /// Unknown keys are dropped, and the result keeps registration order
    /// regardless of the order of `keys`.
    pub fn resolve<I>(&self, keys: I) -> ToolSet
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut selected = vec![false; self.tools.len()];
        for key in keys {
            let key = key.as_ref();
            match self.index.get(key) {
                Some(idx) => selected[*idx] = true,
                None => warn!("ignoring unknown tool key: {key}"),
            }
        }
        let tools = self
            .tools
            .iter()
            .zip(selected)
            .filter_map(|(tool, selected)| selected.then(|| tool.clone()))
            .collect();
        ToolSet { tools }
    }

    /// Returns every registered tool.
    #[inline]
    pub fn all(&self) -> ToolSet {
        ToolSet {
            tools: self.tools.clone(),
        }
    }
}

/// The subset of tools offered to the model during a session.
#[derive(Clone, Debug, Default)]
pub struct ToolSet {
    tools: Vec<ToolDescriptor>,
}

impl ToolSet {
    /// Returns the tool with the given key.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|tool| tool.key() == key)
    }

    /// Returns the keys in this set.
    pub fn keys(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::key).collect()
    }

    /// Returns the definitions advertised to the model.
    #[inline]
    pub fn definitions(&self) -> Vec<ModelTool> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    /// Iterates over the entries in order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if there are no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
