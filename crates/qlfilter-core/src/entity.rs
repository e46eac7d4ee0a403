//! Module: entity
//! Responsibility: in-memory object graphs evaluated by the memory backend
//! and the entity matcher.
//! Does not own: schema conformance; graphs are read leniently and absent
//! attributes read as null.

use crate::value::Value;
use std::collections::BTreeMap;

///
/// Attribute
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Attribute {
    Value(Value),
    Reference(Option<Box<Entity>>),
    Collection(Vec<Entity>),
    Map(BTreeMap<String, Value>),
}

///
/// Entity
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Entity {
    attributes: BTreeMap<String, Attribute>,
}

impl Entity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes
            .insert(name.into(), Attribute::Value(value.into()));
        self
    }

    #[must_use]
    pub fn with_reference(mut self, name: impl Into<String>, entity: Self) -> Self {
        self.attributes
            .insert(name.into(), Attribute::Reference(Some(Box::new(entity))));
        self
    }

    #[must_use]
    pub fn with_collection(mut self, name: impl Into<String>, entities: Vec<Self>) -> Self {
        self.attributes
            .insert(name.into(), Attribute::Collection(entities));
        self
    }

    #[must_use]
    pub fn with_map<K, V>(
        mut self,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.attributes.insert(name.into(), Attribute::Map(map));
        self
    }

    pub fn set(&mut self, name: impl Into<String>, attribute: Attribute) {
        self.attributes.insert(name.into(), attribute);
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Scalar value of `name`; absent attributes and explicit nulls both
    /// read as `None`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.attributes.get(name) {
            Some(Attribute::Value(value)) if !value.is_null() => Some(value),
            _ => None,
        }
    }

    /// Related entities reachable through `name`: the referenced entity for
    /// a reference, every element for a collection.
    #[must_use]
    pub fn related(&self, name: &str) -> Vec<&Self> {
        match self.attributes.get(name) {
            Some(Attribute::Reference(Some(entity))) => vec![entity.as_ref()],
            Some(Attribute::Collection(entities)) => entities.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of the map attribute `name`, in key order.
    #[must_use]
    pub fn entries(&self, name: &str) -> Vec<(&str, &Value)> {
        match self.attributes.get(name) {
            Some(Attribute::Map(map)) => map.iter().map(|(k, v)| (k.as_str(), v)).collect(),
            _ => Vec::new(),
        }
    }
}
