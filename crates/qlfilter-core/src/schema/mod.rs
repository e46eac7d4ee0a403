//! Module: schema
//! Responsibility: entity attribute graphs and the filterable field table.
//! Does not own: selector parsing or path resolution policy.
//! Boundary: built and validated once at startup, read-only afterwards.

mod registry;


use crate::value::ValueType;
use thiserror::Error as ThisError;

pub use registry::{EntityKind, RegistryBuilder, SchemaRegistry};

/// Identifier attribute assumed when a model does not name one.
pub const DEFAULT_IDENTIFIER: &str = "id";

///
/// SchemaError
///
/// Raised while building a registry; a registry that builds is internally
/// consistent and never produces these at filter time.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("duplicate entity model '{0}'")]
    DuplicateModel(String),

    #[error("duplicate entity kind '{0}'")]
    DuplicateKind(String),

    #[error("entity model '{0}' is not declared")]
    UnknownModel(String),

    #[error("entity model '{model}' has no attribute '{attribute}'")]
    UnknownAttribute { model: String, attribute: String },

    #[error("entity model '{model}' declares attribute '{attribute}' twice")]
    DuplicateAttribute { model: String, attribute: String },

    #[error("entity model '{model}': identifier '{identifier}' must be a value attribute")]
    InvalidIdentifier { model: String, identifier: String },

    #[error("entity kind '{kind}' declares field '{field}' twice")]
    DuplicateField { kind: String, field: String },

    #[error("entity kind '{kind}', field '{field}': {message}")]
    InvalidField {
        kind: String,
        field: String,
        message: String,
    },

    #[error("entity kind '{kind}': legacy default '{field}.{sub_attribute}' is not a declared sub-attribute")]
    InvalidLegacyDefault {
        kind: String,
        field: String,
        sub_attribute: String,
    },
}

///
/// AttributeKind
///
/// Shape of one attribute in an entity model. Relationship kinds name the
/// target model; the registry checks every name resolves.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    Value(ValueType),
    Reference(String),
    Collection(String),
    Map(ValueType),
}

///
/// Cardinality
///
/// Shape of one relationship hop between entity models.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Cardinality {
    One,
    Many,
    Map,
}

impl Cardinality {
    /// Relationships whose hop may yield more than one element per parent.
    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        matches!(self, Self::Many | Self::Map)
    }
}

///
/// Relation
///
/// One relationship hop in a resolved attribute chain.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relation {
    pub attribute: String,
    pub cardinality: Cardinality,
}

///
/// AttributeModel
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeModel {
    pub name: String,
    pub kind: AttributeKind,
}

impl AttributeModel {
    #[must_use]
    pub fn value(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Value(value_type),
        }
    }

    #[must_use]
    pub fn reference(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Reference(model.into()),
        }
    }

    #[must_use]
    pub fn collection(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Collection(model.into()),
        }
    }

    #[must_use]
    pub fn map(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Map(value_type),
        }
    }
}

///
/// EntityModel
///
/// Attribute graph node for one persisted entity type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityModel {
    pub name: String,
    pub identifier: String,
    pub attributes: Vec<AttributeModel>,
}

impl EntityModel {
    #[must_use]
    pub fn new(name: impl Into<String>, attributes: Vec<AttributeModel>) -> Self {
        Self {
            name: name.into(),
            identifier: DEFAULT_IDENTIFIER.to_string(),
            attributes,
        }
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Exact-name attribute lookup.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeModel> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }
}

///
/// MapSpec
///
/// How a map field stores its entries: a native key/value map attribute, or
/// a collection of related entities carrying key and value attributes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MapSpec {
    Native,
    Entries { key: String, value: String },
}

///
/// FieldSpec
///
/// One filterable field exposed for an entity kind.
///
/// `name` is the symbolic selector prefix, `attribute` the underlying model
/// attribute. Sub-attributes are dot paths below that attribute; a single
/// sub-attribute doubles as the implicit default for a bare selector.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSpec {
    name: String,
    attribute: String,
    sub_attributes: Vec<String>,
    map: Option<MapSpec>,
    identifier: Option<String>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: attribute.into(),
            sub_attributes: Vec::new(),
            map: None,
            identifier: None,
        }
    }

    #[must_use]
    pub fn with_sub_attributes<S: Into<String>>(
        mut self,
        sub_attributes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.sub_attributes = sub_attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the field as a native key/value map attribute.
    #[must_use]
    pub fn native_map(mut self) -> Self {
        self.map = Some(MapSpec::Native);
        self
    }

    /// Mark the field as a map stored in related key/value entities.
    #[must_use]
    pub fn entry_map(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map = Some(MapSpec::Entries {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    #[must_use]
    pub fn sub_attributes(&self) -> &[String] {
        &self.sub_attributes
    }

    #[must_use]
    pub const fn map(&self) -> Option<&MapSpec> {
        self.map.as_ref()
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        self.map.is_some()
    }

    /// Identifier used to correlate subqueries, when overridden per field.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Case-insensitive lookup of a declared sub-attribute; returns the
    /// declared spelling.
    #[must_use]
    pub fn find_sub_attribute(&self, candidate: &str) -> Option<&str> {
        self.sub_attributes
            .iter()
            .find(|sub| sub.eq_ignore_ascii_case(candidate))
            .map(String::as_str)
    }
}
