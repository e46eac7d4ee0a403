//! Module: backend::memory
//! Responsibility: reference backend executing compiled filters over
//! in-memory entity graphs with relational semantics.
//! Does not own: filter semantics; it executes exactly the joins,
//! three-valued comparisons and correlated subqueries it is given.
//! Boundary: used for differential testing and for small in-process sets.

use crate::{
    backend::{Backend, lower},
    entity::Entity,
    error::BackendError,
    predicate::{CaseMode, CompareOp, CompiledFilter, Join, JoinMode, LikeDialect, Pattern},
    resolve::Leaf,
    schema::Cardinality,
    semantics::{self, MatchToken},
    value::Value,
};
use std::cmp::Ordering;

const BACKEND: &str = "memory";

fn error(message: impl Into<String>) -> BackendError {
    BackendError::new(BACKEND, message)
}

///
/// MemoryOptions
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MemoryOptions {
    /// Compare all text case-insensitively, like a case-insensitive
    /// database collation.
    pub case_insensitive_collation: bool,
}

///
/// Slot
///
/// Position of a bound element: scope index and element index within the
/// scope's rows (0 is the scope root).
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Slot {
    scope: usize,
    index: usize,
}

///
/// MemoryOperand
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryOperand {
    slot: Slot,
    leaf: Leaf,
}

///
/// LikeTokens
///
/// Compiled `LIKE` pattern, already folded when the comparison is.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LikeTokens(Vec<MatchToken>);

#[derive(Clone, Debug)]
struct Step {
    parent: usize,
    attribute: String,
    cardinality: Cardinality,
    mode: JoinMode,
}

#[derive(Clone, Debug, Default)]
struct ScopeProgram {
    identifier: Option<String>,
    steps: Vec<Step>,
}

///
/// MemoryPredicate
///
/// Lowered predicate; `fold` marks text comparisons performed upper-cased.
///

#[derive(Clone, Debug)]
pub enum MemoryPredicate {
    True,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare {
        operand: MemoryOperand,
        op: CompareOp,
        values: Vec<Value>,
        fold: bool,
    },
    Like {
        operand: MemoryOperand,
        tokens: LikeTokens,
        fold: bool,
    },
    IsNull(MemoryOperand),
    IsNotNull(MemoryOperand),
    Exists {
        scope: usize,
        predicate: Box<Self>,
        negated: bool,
    },
}

///
/// MemoryBackend
///
/// Lowering target. Collects one scope program per query level; evaluation
/// happens on the resulting [`MemoryQuery`].
///

#[derive(Debug, Default)]
pub struct MemoryBackend {
    options: MemoryOptions,
    scopes: Vec<ScopeProgram>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(options: MemoryOptions) -> Self {
        Self {
            options,
            scopes: Vec::new(),
        }
    }

    /// Lower `filter` into an executable query.
    pub fn prepare(
        filter: &CompiledFilter,
        options: MemoryOptions,
    ) -> Result<MemoryQuery, BackendError> {
        let mut backend = Self::new(options);
        let predicate = lower(&mut backend, filter)?;

        Ok(MemoryQuery {
            scopes: backend.scopes,
            predicate,
        })
    }

    const fn fold(&self, case: CaseMode) -> bool {
        case.folds() || self.options.case_insensitive_collation
    }

    fn push_scope(&mut self, identifier: Option<String>) -> Slot {
        self.scopes.push(ScopeProgram {
            identifier,
            steps: Vec::new(),
        });
        Slot {
            scope: self.scopes.len() - 1,
            index: 0,
        }
    }
}

impl Backend for MemoryBackend {
    type Relation = Slot;
    type Operand = MemoryOperand;
    type Predicate = MemoryPredicate;
    type Subquery = usize;

    fn root(&mut self) -> Result<Slot, BackendError> {
        Ok(self.push_scope(None))
    }

    fn resolve_relationship(&mut self, parent: &Slot, join: &Join) -> Result<Slot, BackendError> {
        let scope = self
            .scopes
            .get_mut(parent.scope)
            .ok_or_else(|| error(format!("scope {} is not open", parent.scope)))?;
        scope.steps.push(Step {
            parent: parent.index,
            attribute: join.attribute.clone(),
            cardinality: join.cardinality,
            mode: join.mode,
        });

        Ok(Slot {
            scope: parent.scope,
            index: scope.steps.len(),
        })
    }

    fn resolve_leaf(
        &mut self,
        relation: &Slot,
        leaf: &Leaf,
    ) -> Result<MemoryOperand, BackendError> {
        Ok(MemoryOperand {
            slot: *relation,
            leaf: leaf.clone(),
        })
    }

    fn compare(
        &mut self,
        operand: MemoryOperand,
        op: CompareOp,
        values: &[Value],
        case: CaseMode,
    ) -> Result<MemoryPredicate, BackendError> {
        Ok(MemoryPredicate::Compare {
            operand,
            op,
            values: values.to_vec(),
            fold: self.fold(case),
        })
    }

    fn like(
        &mut self,
        operand: MemoryOperand,
        pattern: &Pattern,
        case: CaseMode,
    ) -> Result<MemoryPredicate, BackendError> {
        let fold = self.fold(case);
        let dialect = LikeDialect::Standard;
        let mut rendered = pattern.to_like(dialect);
        if fold {
            rendered = semantics::fold(&rendered);
        }

        Ok(MemoryPredicate::Like {
            operand,
            tokens: LikeTokens(semantics::like_tokens(&rendered, dialect.escape_char())),
            fold,
        })
    }

    fn is_null(&mut self, operand: MemoryOperand) -> Result<MemoryPredicate, BackendError> {
        Ok(MemoryPredicate::IsNull(operand))
    }

    fn is_not_null(&mut self, operand: MemoryOperand) -> Result<MemoryPredicate, BackendError> {
        Ok(MemoryPredicate::IsNotNull(operand))
    }

    fn begin_subquery(&mut self, identifier: &str) -> Result<(usize, Slot), BackendError> {
        let root = self.push_scope(Some(identifier.to_string()));
        Ok((root.scope, root))
    }

    fn exists(
        &mut self,
        subquery: usize,
        predicate: MemoryPredicate,
    ) -> Result<MemoryPredicate, BackendError> {
        Ok(MemoryPredicate::Exists {
            scope: subquery,
            predicate: Box::new(predicate),
            negated: false,
        })
    }

    fn not_exists(
        &mut self,
        subquery: usize,
        predicate: MemoryPredicate,
    ) -> Result<MemoryPredicate, BackendError> {
        Ok(MemoryPredicate::Exists {
            scope: subquery,
            predicate: Box::new(predicate),
            negated: true,
        })
    }

    fn and(&mut self, children: Vec<MemoryPredicate>) -> MemoryPredicate {
        MemoryPredicate::And(children)
    }

    fn or(&mut self, children: Vec<MemoryPredicate>) -> MemoryPredicate {
        MemoryPredicate::Or(children)
    }

    fn not(&mut self, inner: MemoryPredicate) -> MemoryPredicate {
        MemoryPredicate::Not(Box::new(inner))
    }

    fn always_true(&mut self) -> MemoryPredicate {
        MemoryPredicate::True
    }
}

///
/// Element
///
/// One bound element of a row: an entity, or an entry of a native map.
///

#[derive(Clone, Copy, Debug)]
enum Element<'a> {
    Entity(&'a Entity),
    Entry(&'a str, &'a Value),
}

type Row<'a> = Vec<Option<Element<'a>>>;

///
/// MemoryQuery
///
/// Executable query. A root entity matches when at least one row of its
/// left-joined root scope satisfies the predicate (`SELECT DISTINCT`).
///

#[derive(Clone, Debug)]
pub struct MemoryQuery {
    scopes: Vec<ScopeProgram>,
    predicate: MemoryPredicate,
}

impl MemoryQuery {
    /// Entities of `dataset` selected by the query, in dataset order.
    /// Correlated subqueries range over the same dataset.
    pub fn filter<'e>(&self, dataset: &'e [Entity]) -> Result<Vec<&'e Entity>, BackendError> {
        let mut selected = Vec::new();
        for entity in dataset {
            if self.matches(entity, dataset)? {
                selected.push(entity);
            }
        }

        Ok(selected)
    }

    /// Whether `entity` is selected; `dataset` backs correlated subqueries.
    pub fn matches(&self, entity: &Entity, dataset: &[Entity]) -> Result<bool, BackendError> {
        let scope = self.scope(0)?;
        for row in rows(scope, entity)? {
            if eval(self, &self.predicate, &row, dataset)? == Some(true) {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn scope(&self, index: usize) -> Result<&ScopeProgram, BackendError> {
        self.scopes
            .get(index)
            .ok_or_else(|| error(format!("scope {index} is not declared")))
    }
}

// Expand the join steps of `scope` from `root` into rows.
fn rows<'a>(scope: &ScopeProgram, root: &'a Entity) -> Result<Vec<Row<'a>>, BackendError> {
    let mut rows: Vec<Row<'a>> = vec![vec![Some(Element::Entity(root))]];

    for step in &scope.steps {
        let mut next = Vec::new();
        for row in rows {
            let parent = row.get(step.parent).copied().flatten();
            let children = match parent {
                Some(element) => children(element, step)?,
                None => Vec::new(),
            };

            if children.is_empty() {
                if step.mode == JoinMode::Left {
                    let mut extended = row;
                    extended.push(None);
                    next.push(extended);
                }
                continue;
            }

            for child in children {
                let mut extended = row.clone();
                extended.push(Some(child));
                next.push(extended);
            }
        }
        rows = next;
    }

    Ok(rows)
}

fn children<'a>(parent: Element<'a>, step: &Step) -> Result<Vec<Element<'a>>, BackendError> {
    let Element::Entity(entity) = parent else {
        return Err(error(format!("cannot join '{}' from a map entry", step.attribute)));
    };

    Ok(match step.cardinality {
        Cardinality::One | Cardinality::Many => entity
            .related(&step.attribute)
            .into_iter()
            .map(Element::Entity)
            .collect(),
        Cardinality::Map => entity
            .entries(&step.attribute)
            .into_iter()
            .map(|(key, value)| Element::Entry(key, value))
            .collect(),
    })
}

fn leaf_value(row: &Row<'_>, operand: &MemoryOperand) -> Result<Option<Value>, BackendError> {
    let Some(element) = row.get(operand.slot.index).copied().flatten() else {
        return Ok(None);
    };

    match (element, &operand.leaf) {
        (Element::Entity(entity), Leaf::Attribute(name)) => Ok(entity.value(name).cloned()),
        (Element::Entry(key, _), Leaf::MapKey) => Ok(Some(Value::text(key))),
        (Element::Entry(_, value), Leaf::MapValue) => {
            Ok((!value.is_null()).then(|| value.clone()))
        }
        (Element::Entity(_), leaf) => Err(error(format!("{leaf:?} read from an entity"))),
        (Element::Entry(..), leaf) => Err(error(format!("{leaf:?} read from a map entry"))),
    }
}

// Three-valued evaluation; `None` is SQL's UNKNOWN.
fn eval(
    query: &MemoryQuery,
    predicate: &MemoryPredicate,
    row: &Row<'_>,
    dataset: &[Entity],
) -> Result<Option<bool>, BackendError> {
    Ok(match predicate {
        MemoryPredicate::True => Some(true),
        MemoryPredicate::And(children) => {
            let mut result = Some(true);
            for child in children {
                match eval(query, child, row, dataset)? {
                    Some(false) => return Ok(Some(false)),
                    None => result = None,
                    Some(true) => {}
                }
            }
            result
        }
        MemoryPredicate::Or(children) => {
            let mut result = Some(false);
            for child in children {
                match eval(query, child, row, dataset)? {
                    Some(true) => return Ok(Some(true)),
                    None => result = None,
                    Some(false) => {}
                }
            }
            result
        }
        MemoryPredicate::Not(inner) => eval(query, inner, row, dataset)?.map(|value| !value),
        MemoryPredicate::IsNull(operand) => Some(leaf_value(row, operand)?.is_none()),
        MemoryPredicate::IsNotNull(operand) => Some(leaf_value(row, operand)?.is_some()),
        MemoryPredicate::Compare {
            operand,
            op,
            values,
            fold,
        } => match leaf_value(row, operand)? {
            Some(stored) => Some(compare(&stored, *op, values, *fold)?),
            None => None,
        },
        MemoryPredicate::Like {
            operand,
            tokens,
            fold,
        } => leaf_value(row, operand)?.map(|stored| {
            let text = semantics::match_text(&stored);
            let text = if *fold { semantics::fold(&text) } else { text };
            semantics::wildcard_match(&text, &tokens.0)
        }),
        MemoryPredicate::Exists {
            scope,
            predicate,
            negated,
        } => {
            let found = exists(query, *scope, predicate, row, dataset)?;
            Some(found != *negated)
        }
    })
}

fn compare(
    stored: &Value,
    op: CompareOp,
    values: &[Value],
    fold: bool,
) -> Result<bool, BackendError> {
    let ordering = |literal: &Value| semantics::compare(stored, literal, fold).map_err(error);

    if op == CompareOp::In {
        for literal in values {
            if ordering(literal)? == Ordering::Equal {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    let literal = values
        .first()
        .ok_or_else(|| error(format!("'{}' needs a value", op.symbol())))?;
    let ordering = ordering(literal)?;

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::In => false,
    })
}

// Correlate on the identifier: the subquery root ranges over every dataset
// entity whose identifier equals the outer root's.
fn exists(
    query: &MemoryQuery,
    scope_index: usize,
    predicate: &MemoryPredicate,
    outer: &Row<'_>,
    dataset: &[Entity],
) -> Result<bool, BackendError> {
    let scope = query.scope(scope_index)?;
    let identifier = scope
        .identifier
        .as_deref()
        .ok_or_else(|| error(format!("scope {scope_index} is not a subquery")))?;
    let Some(Element::Entity(outer_root)) = outer.first().copied().flatten() else {
        return Err(error("subquery outside of an entity scope"));
    };
    let Some(key) = outer_root.value(identifier) else {
        return Ok(false);
    };

    for candidate in dataset {
        if candidate.value(identifier) != Some(key) {
            continue;
        }
        for row in rows(scope, candidate)? {
            if eval(query, predicate, &row, dataset)? == Some(true) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}
