//! Module: backend
//! Responsibility: the adapter contract between compiled predicates and a
//! concrete query backend, plus the generic lowering walk.
//! Does not own: predicate semantics; adapters implement exactly what the
//! compiled tree states.
//! Boundary: backends only ever see `CompiledFilter` trees.

pub mod jpql;
pub mod memory;

use crate::{
    error::BackendError,
    predicate::{
        CaseMode, CompareOp, CompiledFilter, Join, JoinId, Operand, Pattern, Predicate, Scope,
        Source,
    },
    resolve::Leaf,
    value::Value,
};
use std::collections::BTreeMap;

///
/// Backend
///
/// Adapter a backend implements to receive a compiled filter.
///
/// Handles are opaque to the lowering walk: `Relation` names a bound element
/// (a scope root or a join), `Operand` a readable leaf on it.
///

pub trait Backend {
    type Relation: Clone;
    type Operand;
    type Predicate;
    type Subquery;

    /// Root element of the outermost query.
    fn root(&mut self) -> Result<Self::Relation, BackendError>;

    /// Bind `join` below `parent`.
    fn resolve_relationship(
        &mut self,
        parent: &Self::Relation,
        join: &Join,
    ) -> Result<Self::Relation, BackendError>;

    fn resolve_leaf(
        &mut self,
        relation: &Self::Relation,
        leaf: &Leaf,
    ) -> Result<Self::Operand, BackendError>;

    fn compare(
        &mut self,
        operand: Self::Operand,
        op: CompareOp,
        values: &[Value],
        case: CaseMode,
    ) -> Result<Self::Predicate, BackendError>;

    fn like(
        &mut self,
        operand: Self::Operand,
        pattern: &Pattern,
        case: CaseMode,
    ) -> Result<Self::Predicate, BackendError>;

    fn is_null(&mut self, operand: Self::Operand) -> Result<Self::Predicate, BackendError>;

    fn is_not_null(&mut self, operand: Self::Operand) -> Result<Self::Predicate, BackendError>;

    /// Open a subquery correlated with the current root on `identifier`;
    /// returns the subquery handle and its root element.
    fn begin_subquery(
        &mut self,
        identifier: &str,
    ) -> Result<(Self::Subquery, Self::Relation), BackendError>;

    fn exists(
        &mut self,
        subquery: Self::Subquery,
        predicate: Self::Predicate,
    ) -> Result<Self::Predicate, BackendError>;

    fn not_exists(
        &mut self,
        subquery: Self::Subquery,
        predicate: Self::Predicate,
    ) -> Result<Self::Predicate, BackendError>;

    fn and(&mut self, children: Vec<Self::Predicate>) -> Self::Predicate;

    fn or(&mut self, children: Vec<Self::Predicate>) -> Self::Predicate;

    fn not(&mut self, inner: Self::Predicate) -> Self::Predicate;

    fn always_true(&mut self) -> Self::Predicate;
}

/// Drive `backend` through `filter`, returning the backend's predicate.
pub fn lower<B: Backend>(
    backend: &mut B,
    filter: &CompiledFilter,
) -> Result<B::Predicate, BackendError> {
    let root = backend.root()?;
    let bindings = bind_scope(backend, root, &filter.scope)?;

    lower_predicate(backend, &bindings, &filter.predicate)
}

///
/// Bindings
///

struct Bindings<R> {
    root: R,
    joins: BTreeMap<JoinId, R>,
}

impl<R> Bindings<R> {
    fn get(&self, source: Source) -> Result<&R, BackendError> {
        match source {
            Source::Root => Ok(&self.root),
            Source::Join(id) => self.joins.get(&id).ok_or_else(|| {
                BackendError::new("lower", format!("join {id} is not bound in scope"))
            }),
        }
    }
}

fn bind_scope<B: Backend>(
    backend: &mut B,
    root: B::Relation,
    scope: &Scope,
) -> Result<Bindings<B::Relation>, BackendError> {
    let mut bindings = Bindings {
        root,
        joins: BTreeMap::new(),
    };

    for join in &scope.joins {
        let parent = bindings.get(join.parent)?.clone();
        let relation = backend.resolve_relationship(&parent, join)?;
        bindings.joins.insert(join.id, relation);
    }

    Ok(bindings)
}

fn resolve_operand<B: Backend>(
    backend: &mut B,
    bindings: &Bindings<B::Relation>,
    operand: &Operand,
) -> Result<B::Operand, BackendError> {
    let relation = bindings.get(operand.source)?;
    backend.resolve_leaf(relation, &operand.leaf)
}

fn lower_predicate<B: Backend>(
    backend: &mut B,
    bindings: &Bindings<B::Relation>,
    predicate: &Predicate,
) -> Result<B::Predicate, BackendError> {
    match predicate {
        Predicate::True => Ok(backend.always_true()),
        Predicate::And(children) | Predicate::Or(children) => {
            let lowered = children
                .iter()
                .map(|child| lower_predicate(backend, bindings, child))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(if matches!(predicate, Predicate::And(_)) {
                backend.and(lowered)
            } else {
                backend.or(lowered)
            })
        }
        Predicate::Not(inner) => {
            let inner = lower_predicate(backend, bindings, inner)?;
            Ok(backend.not(inner))
        }
        Predicate::Compare(compare) => {
            let leaf = resolve_operand(backend, bindings, &compare.operand)?;
            backend.compare(leaf, compare.op, &compare.values, compare.case)
        }
        Predicate::Like(like) => {
            let leaf = resolve_operand(backend, bindings, &like.operand)?;
            backend.like(leaf, &like.pattern, like.case)
        }
        Predicate::IsNull(target) => {
            let leaf = resolve_operand(backend, bindings, target)?;
            backend.is_null(leaf)
        }
        Predicate::IsNotNull(target) => {
            let leaf = resolve_operand(backend, bindings, target)?;
            backend.is_not_null(leaf)
        }
        Predicate::Exists(subquery) | Predicate::NotExists(subquery) => {
            let (handle, root) = backend.begin_subquery(&subquery.identifier)?;
            let inner = bind_scope(backend, root, &subquery.scope)?;
            let lowered = lower_predicate(backend, &inner, &subquery.predicate)?;

            if matches!(predicate, Predicate::Exists(_)) {
                backend.exists(handle, lowered)
            } else {
                backend.not_exists(handle, lowered)
            }
        }
    }
}
