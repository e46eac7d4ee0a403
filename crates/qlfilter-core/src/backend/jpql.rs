//! Module: backend::jpql
//! Responsibility: render compiled filters as JPQL select statements with
//! positional parameters.
//! Does not own: execution or parameter conversion; literals are bound as
//! they were normalized.
//! Boundary: text output only; callers hand it to their persistence layer.

use crate::{
    backend::{Backend, lower},
    error::BackendError,
    predicate::{CaseMode, CompareOp, CompiledFilter, Join, JoinMode, LikeDialect, Pattern},
    resolve::Leaf,
    semantics,
    value::Value,
};
use std::fmt::{self, Write as _};

const BACKEND: &str = "jpql";
const ROOT_ALIAS: &str = "e";
const TRUE: &str = "1 = 1";

fn error(message: impl Into<String>) -> BackendError {
    BackendError::new(BACKEND, message)
}

///
/// JpqlQuery
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JpqlQuery {
    pub text: String,
    /// Values for `?1`, `?2`, ... in order.
    pub parameters: Vec<Value>,
}

impl fmt::Display for JpqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render `filter` as `SELECT DISTINCT` over its model.
pub fn render(filter: &CompiledFilter, dialect: LikeDialect) -> Result<JpqlQuery, BackendError> {
    let mut backend = JpqlBackend::new(&filter.model, dialect);
    let predicate = lower(&mut backend, filter)?;

    let root = backend
        .scopes
        .first()
        .ok_or_else(|| error("root scope was never opened"))?;
    let mut text = format!("SELECT DISTINCT {ROOT_ALIAS} FROM {} {ROOT_ALIAS}", filter.model);
    for clause in &root.joins {
        text.push(' ');
        text.push_str(clause);
    }
    if predicate != TRUE {
        text.push_str(" WHERE ");
        text.push_str(&predicate);
    }

    tracing::trace!(query = %text, parameters = backend.parameters.len(), "rendered jpql");

    Ok(JpqlQuery {
        text,
        parameters: backend.parameters,
    })
}

///
/// JpqlRelation
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JpqlRelation {
    scope: usize,
    alias: String,
}

#[derive(Debug)]
struct JpqlScope {
    alias: String,
    identifier: Option<String>,
    joins: Vec<String>,
}

///
/// JpqlBackend
///

#[derive(Debug)]
pub struct JpqlBackend {
    model: String,
    dialect: LikeDialect,
    scopes: Vec<JpqlScope>,
    open: Vec<usize>,
    parameters: Vec<Value>,
}

impl JpqlBackend {
    #[must_use]
    pub fn new(model: &str, dialect: LikeDialect) -> Self {
        Self {
            model: model.to_string(),
            dialect,
            scopes: Vec::new(),
            open: Vec::new(),
            parameters: Vec::new(),
        }
    }

    fn bind(&mut self, value: Value, case: CaseMode) -> String {
        let value = match value {
            Value::Text(text) if case.folds() => Value::Text(semantics::fold(&text)),
            value => value,
        };
        self.parameters.push(value);
        format!("?{}", self.parameters.len())
    }

    fn open_scope(&mut self, alias: String, identifier: Option<String>) -> JpqlRelation {
        self.scopes.push(JpqlScope {
            alias: alias.clone(),
            identifier,
            joins: Vec::new(),
        });
        let scope = self.scopes.len() - 1;
        self.open.push(scope);

        JpqlRelation { scope, alias }
    }

    fn close_scope(&mut self, scope: usize) -> Result<&JpqlScope, BackendError> {
        if self.open.pop() != Some(scope) {
            return Err(error(format!("subquery {scope} closed out of order")));
        }
        self.scopes
            .get(scope)
            .ok_or_else(|| error(format!("subquery {scope} was never opened")))
    }

    fn subquery(
        &mut self,
        scope: usize,
        predicate: &str,
        negated: bool,
    ) -> Result<String, BackendError> {
        let model = self.model.clone();
        let inner = self.close_scope(scope)?;
        let alias = inner.alias.clone();
        let identifier = inner
            .identifier
            .clone()
            .ok_or_else(|| error(format!("scope {scope} is not a subquery")))?;
        let joins = inner.joins.join(" ");
        let outer = self
            .open
            .last()
            .and_then(|outer| self.scopes.get(*outer))
            .ok_or_else(|| error("subquery outside of an enclosing query"))?;

        let mut text = String::new();
        if negated {
            text.push_str("NOT ");
        }
        let _ = write!(text, "EXISTS (SELECT {alias} FROM {model} {alias}");
        if !joins.is_empty() {
            let _ = write!(text, " {joins}");
        }
        let _ = write!(
            text,
            " WHERE {alias}.{identifier} = {}.{identifier}",
            outer.alias
        );
        if predicate != TRUE {
            let _ = write!(text, " AND {predicate}");
        }
        text.push(')');

        Ok(text)
    }
}

impl Backend for JpqlBackend {
    type Relation = JpqlRelation;
    type Operand = String;
    type Predicate = String;
    type Subquery = usize;

    fn root(&mut self) -> Result<JpqlRelation, BackendError> {
        Ok(self.open_scope(ROOT_ALIAS.to_string(), None))
    }

    fn resolve_relationship(
        &mut self,
        parent: &JpqlRelation,
        join: &Join,
    ) -> Result<JpqlRelation, BackendError> {
        let alias = join.id.to_string();
        let keyword = match join.mode {
            JoinMode::Left => "LEFT JOIN",
            JoinMode::Inner => "JOIN",
        };
        let scope = self
            .scopes
            .get_mut(parent.scope)
            .ok_or_else(|| error(format!("scope {} is not open", parent.scope)))?;
        scope
            .joins
            .push(format!("{keyword} {}.{} {alias}", parent.alias, join.attribute));

        Ok(JpqlRelation {
            scope: parent.scope,
            alias,
        })
    }

    fn resolve_leaf(
        &mut self,
        relation: &JpqlRelation,
        leaf: &Leaf,
    ) -> Result<String, BackendError> {
        Ok(match leaf {
            Leaf::Attribute(name) => format!("{}.{name}", relation.alias),
            Leaf::MapKey => format!("KEY({})", relation.alias),
            Leaf::MapValue => format!("VALUE({})", relation.alias),
        })
    }

    fn compare(
        &mut self,
        path: String,
        op: CompareOp,
        values: &[Value],
        case: CaseMode,
    ) -> Result<String, BackendError> {
        let target = if case.folds() {
            format!("UPPER({path})")
        } else {
            path
        };

        if op == CompareOp::In {
            if values.is_empty() {
                return Err(error("IN needs at least one value"));
            }
            let params = values
                .iter()
                .map(|value| self.bind(value.clone(), case))
                .collect::<Vec<_>>();
            return Ok(format!("{target} IN ({})", params.join(", ")));
        }

        let value = values
            .first()
            .ok_or_else(|| error(format!("'{}' needs a value", op.symbol())))?;
        let param = self.bind(value.clone(), case);

        Ok(format!("{target} {} {param}", op.symbol()))
    }

    fn like(
        &mut self,
        path: String,
        pattern: &Pattern,
        case: CaseMode,
    ) -> Result<String, BackendError> {
        let target = if case.folds() {
            format!("UPPER({path})")
        } else {
            path
        };
        let param = self.bind(Value::Text(pattern.to_like(self.dialect)), case);

        Ok(match self.dialect.escape_char() {
            Some(escape) => format!("{target} LIKE {param} ESCAPE '{escape}'"),
            None => format!("{target} LIKE {param}"),
        })
    }

    fn is_null(&mut self, path: String) -> Result<String, BackendError> {
        Ok(format!("{path} IS NULL"))
    }

    fn is_not_null(&mut self, path: String) -> Result<String, BackendError> {
        Ok(format!("{path} IS NOT NULL"))
    }

    fn begin_subquery(&mut self, identifier: &str) -> Result<(usize, JpqlRelation), BackendError> {
        let alias = format!("s{}", self.scopes.len());
        let relation = self.open_scope(alias, Some(identifier.to_string()));

        Ok((relation.scope, relation))
    }

    fn exists(&mut self, subquery: usize, predicate: String) -> Result<String, BackendError> {
        self.subquery(subquery, &predicate, false)
    }

    fn not_exists(&mut self, subquery: usize, predicate: String) -> Result<String, BackendError> {
        self.subquery(subquery, &predicate, true)
    }

    fn and(&mut self, children: Vec<String>) -> String {
        group(children, " AND ")
    }

    fn or(&mut self, children: Vec<String>) -> String {
        group(children, " OR ")
    }

    fn not(&mut self, inner: String) -> String {
        format!("NOT ({inner})")
    }

    fn always_true(&mut self) -> String {
        TRUE.to_string()
    }
}

fn group(children: Vec<String>, separator: &str) -> String {
    match children.len() {
        0 => TRUE.to_string(),
        1 => children.into_iter().next().unwrap_or_else(|| TRUE.to_string()),
        _ => format!("({})", children.join(separator)),
    }
}
