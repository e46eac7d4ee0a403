//! Module: predicate
//! Responsibility: backend-agnostic predicate trees produced by the compiler.
//! Does not own: how joins or subqueries are executed.
//! Boundary: the compiler's output and the backend adapters' input.

mod display;
mod pattern;

pub use pattern::{LikeDialect, Pattern, PatternToken};

use crate::{resolve::Leaf, schema::Cardinality, value::Value};
use derive_more::Display;
use std::ops::{BitAnd, BitOr, Not};

///
/// JoinId
///
/// Handle naming one bound relationship within a compiled filter.
/// Ids are unique across the root scope and every subquery scope.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("j{_0}")]
pub struct JoinId(pub u32);

///
/// Source
///
/// Element an operand reads from: the scope's root entity or a join.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Source {
    Root,
    Join(JoinId),
}

///
/// JoinMode
///
/// `Left` keeps the parent when the relationship is empty; `Inner` drops it.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinMode {
    Left,
    Inner,
}

///
/// Join
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Join {
    pub id: JoinId,
    pub parent: Source,
    pub attribute: String,
    pub cardinality: Cardinality,
    pub mode: JoinMode,
}

///
/// Scope
///
/// Ordered join declarations of one query level; parents always precede
/// their children.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scope {
    pub joins: Vec<Join>,
}

///
/// Operand
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operand {
    pub source: Source,
    pub leaf: Leaf,
}

impl Operand {
    #[must_use]
    pub const fn new(source: Source, leaf: Leaf) -> Self {
        Self { source, leaf }
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Lte = 0x04,
    Gt = 0x05,
    Gte = 0x06,
    In = 0x07,
}

impl CompareOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::In => "IN",
        }
    }
}

///
/// CaseMode
///
/// `Insensitive` upper-cases both sides of a text comparison.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CaseMode {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseMode {
    #[must_use]
    pub const fn folds(self) -> bool {
        matches!(self, Self::Insensitive)
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ComparePredicate {
    pub operand: Operand,
    pub op: CompareOp,
    pub values: Vec<Value>,
    pub case: CaseMode,
}

///
/// LikePredicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LikePredicate {
    pub operand: Operand,
    pub pattern: Pattern,
    pub case: CaseMode,
}

///
/// Subquery
///
/// Correlated existence test. The subquery root is the entity whose
/// `identifier` equals the outer root's; its joins are always inner.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subquery {
    pub identifier: String,
    pub scope: Scope,
    pub predicate: Predicate,
}

///
/// Predicate
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
    Like(LikePredicate),
    IsNull(Operand),
    IsNotNull(Operand),
    Exists(Box<Subquery>),
    NotExists(Box<Subquery>),
}

impl Predicate {
    #[must_use]
    pub fn compare(operand: Operand, op: CompareOp, values: Vec<Value>, case: CaseMode) -> Self {
        Self::Compare(ComparePredicate {
            operand,
            op,
            values,
            case,
        })
    }

    #[must_use]
    pub const fn like(operand: Operand, pattern: Pattern, case: CaseMode) -> Self {
        Self::Like(LikePredicate {
            operand,
            pattern,
            case,
        })
    }

    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        if children.is_empty() {
            Self::True
        } else {
            Self::And(children)
        }
    }

    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        if children.is_empty() {
            Self::True
        } else {
            Self::Or(children)
        }
    }

    /// Count subquery nodes anywhere in the tree.
    #[must_use]
    pub fn subquery_count(&self) -> usize {
        match self {
            Self::And(children) | Self::Or(children) => {
                children.iter().map(Self::subquery_count).sum()
            }
            Self::Not(inner) => inner.subquery_count(),
            Self::Exists(subquery) | Self::NotExists(subquery) => {
                1 + subquery.predicate.subquery_count()
            }
            Self::True
            | Self::Compare(_)
            | Self::Like(_)
            | Self::IsNull(_)
            | Self::IsNotNull(_) => 0,
        }
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}

impl Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

///
/// CompiledFilter
///
/// Output of one compilation: the root scope's joins and the predicate over
/// them, for a single entity kind.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledFilter {
    pub entity_kind: String,
    pub model: String,
    pub identifier: String,
    pub scope: Scope,
    pub predicate: Predicate,
}
