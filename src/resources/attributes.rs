//! Shader Attributes
//!
//! Attributes are registered once by name ([`AttributeRegistry::add`]) and
//! then referenced by name when a VBO is added. The VBO's name list becomes an
//! [`AttributeLayout`]: an interleaved layout whose stride is the sum of the
//! attribute sizes and whose offsets follow declaration order.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::errors::{Result, StrataError};
use crate::resources::types::DataType;

/// Registered description of one vertex attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeState {
    /// Registration index, stable for the lifetime of the registry.
    pub index: usize,
    pub name: String,
    pub components: usize,
    pub normalize: bool,
    /// Full size of the attribute in bytes (all components).
    pub size: usize,
    pub data_type: DataType,
}

/// Name-keyed table of known vertex attributes.
#[derive(Debug, Default)]
pub struct AttributeRegistry {
    attributes: Vec<AttributeState>,
    lookup: FxHashMap<String, usize>,
}

impl AttributeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an attribute. Re-registering a name replaces its description
    /// and keeps its index.
    pub fn add(
        &mut self,
        name: &str,
        components: usize,
        normalize: bool,
        size: usize,
        data_type: DataType,
    ) -> usize {
        if let Some(&index) = self.lookup.get(name) {
            let state = &mut self.attributes[index];
            state.components = components;
            state.normalize = normalize;
            state.size = size;
            state.data_type = data_type;
            return index;
        }

        let index = self.attributes.len();
        self.attributes.push(AttributeState {
            index,
            name: name.to_string(),
            components,
            normalize,
            size,
            data_type,
        });
        self.lookup.insert(name.to_string(), index);
        index
    }

    pub fn get(&self, name: &str) -> Result<&AttributeState> {
        self.lookup
            .get(name)
            .map(|&index| &self.attributes[index])
            .ok_or_else(|| StrataError::AttributeNotFound(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Builds the interleaved layout for a VBO from its attribute names.
    pub fn layout<S: AsRef<str>>(&self, names: &[S]) -> Result<AttributeLayout> {
        let mut attributes = SmallVec::new();
        for name in names {
            attributes.push(self.get(name.as_ref())?.clone());
        }
        Ok(AttributeLayout { attributes })
    }
}

/// Interleaved attribute layout of one VBO.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeLayout {
    attributes: SmallVec<[AttributeState; 4]>,
}

impl AttributeLayout {
    #[must_use]
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.size).sum()
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Attributes paired with their byte offset inside one vertex.
    pub fn iter_with_offsets(&self) -> impl Iterator<Item = (&AttributeState, usize)> {
        self.attributes.iter().scan(0usize, |offset, attr| {
            let current = *offset;
            *offset += attr.size;
            Some((attr, current))
        })
    }

    /// Returns the first attribute in `required` this layout does not provide.
    #[must_use]
    pub fn first_missing<'a, S: AsRef<str>>(&self, required: &'a [S]) -> Option<&'a str> {
        required
            .iter()
            .map(AsRef::as_ref)
            .find(|name| !self.has_attribute(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}
