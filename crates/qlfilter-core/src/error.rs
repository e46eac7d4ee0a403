//! Module: error
//! Responsibility: caller-facing filter error taxonomy.
//! Does not own: schema construction errors (see `schema::SchemaError`).
//! Boundary: every parse/resolve/normalize/compile/backend failure lands here.

use std::fmt;
use thiserror::Error as ThisError;

///
/// ErrorKind
///
/// Stable classification of a filter failure.
/// Codes are part of the external error surface and must not be renumbered.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ErrorKind {
    UnsupportedField = 0x01,
    Syntax = 0x02,
    ValueCoercion = 0x03,
    Backend = 0x04,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedField => "unsupported_field",
            Self::Syntax => "syntax",
            Self::ValueCoercion => "value_coercion",
            Self::Backend => "backend",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// FilterError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FilterError {
    #[error("unsupported field '{selector}': {message}; expected one of [{}]", expected.join(", "))]
    UnsupportedField {
        selector: String,
        message: String,
        expected: Vec<String>,
    },

    #[error("syntax error: {message}")]
    Syntax { message: String },

    #[error("invalid value '{literal}' for '{selector}': {message}")]
    ValueCoercion {
        selector: String,
        literal: String,
        message: String,
        expected: Vec<String>,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl FilterError {
    pub(crate) fn unsupported_field(
        selector: impl Into<String>,
        message: impl Into<String>,
        expected: Vec<String>,
    ) -> Self {
        Self::UnsupportedField {
            selector: selector.into(),
            message: message.into(),
            expected,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
        }
    }

    pub(crate) fn value_coercion(
        selector: impl Into<String>,
        literal: impl Into<String>,
        message: impl Into<String>,
        expected: Vec<String>,
    ) -> Self {
        Self::ValueCoercion {
            selector: selector.into(),
            literal: literal.into(),
            message: message.into(),
            expected,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedField { .. } => ErrorKind::UnsupportedField,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::ValueCoercion { .. } => ErrorKind::ValueCoercion,
            Self::Backend(_) => ErrorKind::Backend,
        }
    }

    /// Field names or symbols the caller could have used instead.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        match self {
            Self::UnsupportedField { expected, .. } | Self::ValueCoercion { expected, .. } => {
                expected
            }
            Self::Syntax { .. } | Self::Backend(_) => &[],
        }
    }
}

///
/// BackendError
///
/// Opaque failure raised by a backend adapter while lowering or executing a
/// compiled predicate.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{backend} backend error: {message}")]
pub struct BackendError {
    pub backend: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(backend: &'static str, message: impl Into<String>) -> Self {
        Self {
            backend,
            message: message.into(),
        }
    }
}
