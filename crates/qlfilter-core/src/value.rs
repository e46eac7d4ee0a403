//! Module: value
//! Responsibility: literal and stored value vocabulary shared by every layer.
//! Does not own: literal normalization policy or comparison semantics.
//! Boundary: produced by the normalizer and entity graphs, consumed by backends.

use std::fmt;

///
/// Value
///
/// Typed scalar flowing through compiled predicates and in-memory entities.
/// `Null` is the explicit null sentinel; literals that could not be typed
/// stay `Text` and are coerced by the backend.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Bool(bool),
    Symbol(String),
}

impl Value {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn symbol(value: impl Into<String>) -> Self {
        Self::Symbol(value.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Stable lowercase label used in diagnostics.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Bool(_) => "boolean",
            Self::Symbol(_) => "symbol",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Symbol(symbol) => f.write_str(symbol),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

///
/// SymbolSet
///
/// Closed set of symbolic constants a field may hold.
/// Symbols keep their declared spelling; lookups are case-insensitive.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolSet {
    name: String,
    symbols: Vec<String>,
}

impl SymbolSet {
    #[must_use]
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            name: name.into(),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Find the declared spelling of `literal`, ignoring case.
    #[must_use]
    pub fn find(&self, literal: &str) -> Option<&str> {
        self.symbols
            .iter()
            .find(|symbol| symbol.eq_ignore_ascii_case(literal))
            .map(String::as_str)
    }
}

///
/// ValueType
///
/// Declared type of a value attribute in an entity model.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    Text,
    Integer,
    Boolean,
    Symbol(SymbolSet),
}

impl ValueType {
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::Boolean => f.write_str("boolean"),
            Self::Symbol(set) => write!(f, "symbol({})", set.name()),
        }
    }
}
