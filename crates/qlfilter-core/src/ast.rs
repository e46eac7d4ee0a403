//! Module: ast
//! Responsibility: syntax tree produced by the filter parser.
//! Does not own: selector resolution, literal typing, or predicate semantics.
//! Boundary: the parser's output and the compiler's/matcher's input.

use std::fmt;

///
/// ComparisonOperator
///
/// Operators of the filter language. FIQL spellings (`=lt=`, `=ge=`, ...)
/// parse to the same variants as their symbolic forms.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ComparisonOperator {
    Eq = 0x01,
    Ne = 0x02,
    IsNull = 0x03,
    NotNull = 0x04,
    Gt = 0x05,
    Gte = 0x06,
    Lt = 0x07,
    Lte = 0x08,
    In = 0x09,
    Out = 0x0a,
}

impl ComparisonOperator {
    /// Map an operator spelling to its variant.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let operator = match symbol {
            "==" | "=eq=" => Self::Eq,
            "!=" | "=ne=" => Self::Ne,
            "=is=" => Self::IsNull,
            "=not=" => Self::NotNull,
            ">" | "=gt=" => Self::Gt,
            ">=" | "=ge=" => Self::Gte,
            "<" | "=lt=" => Self::Lt,
            "<=" | "=le=" => Self::Lte,
            "=in=" => Self::In,
            "=out=" => Self::Out,
            _ => return None,
        };

        Some(operator)
    }

    /// Null check spelled by `=eq=`/`=ne=` when their only argument is
    /// `null`; the plain spellings `==`/`!=` have no such reading.
    #[must_use]
    pub fn null_aware(symbol: &str) -> Option<Self> {
        match symbol {
            "=eq=" => Some(Self::IsNull),
            "=ne=" => Some(Self::NotNull),
            _ => None,
        }
    }

    /// Canonical spelling used when printing trees.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::IsNull => "=is=",
            Self::NotNull => "=not=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "=in=",
            Self::Out => "=out=",
        }
    }

    /// Operators that accept a list of one or more arguments.
    #[must_use]
    pub const fn is_multi_value(self) -> bool {
        matches!(self, Self::In | Self::Out)
    }

    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    /// Operators whose only accepted literal is `null`.
    #[must_use]
    pub const fn is_null_check(self) -> bool {
        matches!(self, Self::IsNull | Self::NotNull)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

///
/// FilterNode
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterNode {
    And(Vec<Self>),
    Or(Vec<Self>),
    Compare {
        selector: String,
        operator: ComparisonOperator,
        arguments: Vec<String>,
    },
}

impl FilterNode {
    #[must_use]
    pub fn compare<S: Into<String>>(
        selector: impl Into<String>,
        operator: ComparisonOperator,
        arguments: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::Compare {
            selector: selector.into(),
            operator,
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Visit every comparison in the tree, depth first.
    pub fn for_each_compare(&self, f: &mut impl FnMut(&str, ComparisonOperator, &[String])) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_compare(f);
                }
            }
            Self::Compare {
                selector,
                operator,
                arguments,
            } => f(selector, *operator, arguments),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(children) | Self::Or(children) => {
                let separator = if matches!(self, Self::And(_)) {
                    " and "
                } else {
                    " or "
                };
                f.write_str("(")?;
                for (index, child) in children.iter().enumerate() {
                    if index > 0 {
                        f.write_str(separator)?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str(")")
            }
            Self::Compare {
                selector,
                operator,
                arguments,
            } => {
                write!(f, "{selector}{operator}")?;
                if let [single] = arguments.as_slice() {
                    write_argument(f, single)
                } else {
                    f.write_str("(")?;
                    for (index, argument) in arguments.iter().enumerate() {
                        if index > 0 {
                            f.write_str(",")?;
                        }
                        write_argument(f, argument)?;
                    }
                    f.write_str(")")
                }
            }
        }
    }
}

// Quote arguments that would not survive re-parsing as bare words.
fn write_argument(f: &mut fmt::Formatter<'_>, argument: &str) -> fmt::Result {
    let bare = !argument.is_empty()
        && !argument.chars().any(crate::parse::is_reserved)
        && !argument.eq_ignore_ascii_case("and")
        && !argument.eq_ignore_ascii_case("or");
    if bare {
        f.write_str(argument)
    } else {
        write!(f, "'{}'", argument.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}
