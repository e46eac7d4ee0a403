//! Module: compile
//! Responsibility: filter trees to backend-agnostic predicate trees with
//! join scopes.
//! Does not own: selector resolution or literal typing (delegated), nor
//! execution of joins and subqueries (backend concern).
//! Boundary: `compile` is the single entry point; one call, one scope.

pub(crate) mod context;

#[cfg(test)]
mod tests;

use crate::{
    ast::{ComparisonOperator, FilterNode},
    error::FilterError,
    normalize::normalize,
    predicate::{
        CaseMode, CompareOp, CompiledFilter, Join, JoinId, JoinMode, Operand, Pattern, Predicate,
        Scope, Source, Subquery,
    },
    resolve::{AttributeChain, ResolvedPath, resolve},
    schema::{Cardinality, Relation, SchemaRegistry},
    value::Value,
};
use context::JoinContext;
use std::collections::BTreeMap;

///
/// CompileOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CompileOptions {
    /// Upper-case both sides of text comparisons. Disable when the backend
    /// already compares case-insensitively.
    pub ignore_case: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { ignore_case: true }
    }
}

/// Compile `node` for `entity_kind` against `registry`.
pub fn compile(
    registry: &SchemaRegistry,
    entity_kind: &str,
    node: &FilterNode,
    options: CompileOptions,
) -> Result<CompiledFilter, FilterError> {
    let Some(kind) = registry.kind(entity_kind) else {
        return Err(FilterError::unsupported_field(
            entity_kind,
            format!("unknown entity kind '{entity_kind}'"),
            Vec::new(),
        ));
    };
    let model = registry.model(kind.model()).ok_or_else(|| {
        FilterError::unsupported_field(
            entity_kind,
            format!("entity model '{}' is not declared", kind.model()),
            Vec::new(),
        )
    })?;

    tracing::debug!(entity_kind, filter = %node, "compiling filter");

    let mut compiler = Compiler {
        registry,
        entity_kind,
        options,
        next_join: 0,
        joins: Vec::new(),
        references: BTreeMap::new(),
    };
    let (predicate, _) = compiler.node(node, JoinContext::isolated())?;

    tracing::trace!(
        joins = compiler.joins.len(),
        subqueries = predicate.subquery_count(),
        "filter compiled"
    );

    Ok(CompiledFilter {
        entity_kind: kind.name().to_string(),
        model: model.name.clone(),
        identifier: model.identifier.clone(),
        scope: Scope {
            joins: compiler.joins,
        },
        predicate,
    })
}

///
/// Compiler
///
/// Per-call state: join id allocation, root-scope join declarations and the
/// shared to-one joins. Join reuse for multi-valued hops lives in the
/// `JoinContext` value instead.
///

struct Compiler<'a> {
    registry: &'a SchemaRegistry,
    entity_kind: &'a str,
    options: CompileOptions,
    next_join: u32,
    joins: Vec<Join>,
    references: BTreeMap<(Source, String), JoinId>,
}

impl Compiler<'_> {
    fn node(
        &mut self,
        node: &FilterNode,
        ctx: JoinContext,
    ) -> Result<(Predicate, JoinContext), FilterError> {
        match node {
            FilterNode::And(children) => {
                let mut ctx = ctx;
                let mut compiled = Vec::with_capacity(children.len());
                for child in children {
                    let (predicate, next) = self.node(child, ctx)?;
                    compiled.push(predicate);
                    ctx = next;
                }

                Ok((Predicate::and(compiled), ctx))
            }
            FilterNode::Or(children) => {
                let mut inner = JoinContext::disjunction();
                let mut compiled = Vec::with_capacity(children.len());
                for child in children {
                    let (predicate, next) = self.node(child, inner)?;
                    compiled.push(predicate);
                    inner = next;
                }

                Ok((Predicate::or(compiled), ctx))
            }
            FilterNode::Compare {
                selector,
                operator,
                arguments,
            } => self.compare(selector, *operator, arguments, ctx),
        }
    }

    fn compare(
        &mut self,
        selector: &str,
        operator: ComparisonOperator,
        arguments: &[String],
        ctx: JoinContext,
    ) -> Result<(Predicate, JoinContext), FilterError> {
        let resolved = resolve(self.registry, self.entity_kind, selector)?;
        let values = normalize(selector, operator, arguments, &resolved.chain.value_type)?;
        let case = self.case_for(resolved.chain.value_type.is_text());

        if resolved.chain.map_key.is_some() {
            return Ok(self.map_compare(&resolved, operator, values, case, ctx));
        }

        if resolved.chain.relations.is_empty() {
            let operand = Operand::new(Source::Root, resolved.chain.leaf.clone());
            return Ok((simple_predicate(operand, operator, &values, case), ctx));
        }

        // Negated forms over a relationship must hold for every related
        // element, so they become self-contained subqueries.
        let negated = match operator {
            ComparisonOperator::Ne => Some(eq_predicate as PositiveFn),
            ComparisonOperator::Out => Some(in_predicate as PositiveFn),
            ComparisonOperator::IsNull => Some(not_null_predicate as PositiveFn),
            _ => None,
        };
        if let Some(positive) = negated {
            // `''` also matches a missing element, so its negation needs the
            // chain to reach at least one element.
            let present = (operator != ComparisonOperator::IsNull
                && values.iter().any(is_empty_text))
            .then(|| self.subquery(&resolved, |_| Predicate::True));
            let absent = Predicate::NotExists(Box::new(
                self.subquery(&resolved, |leaf| positive(leaf, &values, case)),
            ));

            let predicate = match present {
                Some(present) => Predicate::Exists(Box::new(present)) & absent,
                None => absent,
            };
            return Ok((predicate, ctx));
        }

        let (source, ctx) = self.bind(&resolved.chain.relations, ctx);
        let operand = Operand::new(source, resolved.chain.leaf.clone());

        Ok((simple_predicate(operand, operator, &values, case), ctx))
    }

    fn map_compare(
        &mut self,
        resolved: &ResolvedPath<'_>,
        operator: ComparisonOperator,
        values: Vec<Value>,
        case: CaseMode,
        ctx: JoinContext,
    ) -> (Predicate, JoinContext) {
        let chain = &resolved.chain;
        let key_case = self.case_for(true);

        if operator.is_null_check() {
            let subquery = self.subquery(resolved, |value_operand| {
                key_match(chain, value_operand.source, key_case)
            });
            let predicate = if operator == ComparisonOperator::IsNull {
                Predicate::NotExists(Box::new(subquery))
            } else {
                Predicate::Exists(Box::new(subquery))
            };
            return (predicate, ctx);
        }

        let (source, ctx) = self.bind(&chain.relations, ctx);
        let operand = Operand::new(source, chain.leaf.clone());
        let predicate = Predicate::And(vec![
            key_match(chain, source, key_case),
            simple_predicate(operand, operator, &values, case),
        ]);

        (predicate, ctx)
    }

    const fn case_for(&self, text_target: bool) -> CaseMode {
        if self.options.ignore_case && text_target {
            CaseMode::Insensitive
        } else {
            CaseMode::Sensitive
        }
    }

    fn allocate(&mut self) -> JoinId {
        self.next_join += 1;
        JoinId(self.next_join)
    }

    // Bind the relationship hops in the root scope as left joins.
    // To-one hops are shared for the whole compilation; multi-valued hops
    // are shared only as far as `ctx` allows.
    fn bind(&mut self, relations: &[Relation], mut ctx: JoinContext) -> (Source, JoinContext) {
        let mut parent = Source::Root;
        let mut path = String::new();

        for relation in relations {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&relation.attribute);

            let reused = match relation.cardinality {
                Cardinality::One => self
                    .references
                    .get(&(parent, relation.attribute.clone()))
                    .copied(),
                Cardinality::Many | Cardinality::Map => ctx.handle(&path),
            };

            let id = match reused {
                Some(id) => id,
                None => {
                    let id = self.allocate();
                    tracing::trace!(
                        %id,
                        path = %path,
                        cardinality = ?relation.cardinality,
                        "binding join"
                    );
                    self.joins.push(Join {
                        id,
                        parent,
                        attribute: relation.attribute.clone(),
                        cardinality: relation.cardinality,
                        mode: JoinMode::Left,
                    });
                    if relation.cardinality == Cardinality::One {
                        self.references
                            .insert((parent, relation.attribute.clone()), id);
                    } else {
                        ctx = ctx.with_handle(&path, id);
                    }
                    id
                }
            };

            parent = Source::Join(id);
        }

        (parent, ctx)
    }

    // Build a correlated subquery binding the whole chain as inner joins;
    // `inner` receives the leaf operand on the last bound element.
    fn subquery(
        &mut self,
        resolved: &ResolvedPath<'_>,
        inner: impl FnOnce(Operand) -> Predicate,
    ) -> Subquery {
        let mut scope = Scope::default();
        let mut parent = Source::Root;

        for relation in &resolved.chain.relations {
            let id = self.allocate();
            scope.joins.push(Join {
                id,
                parent,
                attribute: relation.attribute.clone(),
                cardinality: relation.cardinality,
                mode: JoinMode::Inner,
            });
            parent = Source::Join(id);
        }

        Subquery {
            identifier: resolved.identifier().to_string(),
            scope,
            predicate: inner(Operand::new(parent, resolved.chain.leaf.clone())),
        }
    }
}

type PositiveFn = fn(Operand, &[Value], CaseMode) -> Predicate;

fn key_match(chain: &AttributeChain, source: Source, case: CaseMode) -> Predicate {
    match &chain.map_key {
        Some(map_key) => Predicate::compare(
            Operand::new(source, map_key.leaf.clone()),
            CompareOp::Eq,
            vec![Value::text(map_key.key.clone())],
            case,
        ),
        None => Predicate::True,
    }
}

// Literals compared as plain text; escaped wildcards read as themselves.
fn plain(values: &[Value]) -> Vec<Value> {
    values
        .iter()
        .map(|value| match value {
            Value::Text(text) => Value::text(Pattern::unescape(text)),
            other => other.clone(),
        })
        .collect()
}

fn is_empty_text(value: &Value) -> bool {
    value.as_text().is_some_and(str::is_empty)
}

// Predicate for a path whose operand needs no further relationship
// handling: a root attribute, a map value, or a positively bound join.
fn simple_predicate(
    operand: Operand,
    operator: ComparisonOperator,
    values: &[Value],
    case: CaseMode,
) -> Predicate {
    match operator {
        ComparisonOperator::Eq => eq_predicate(operand, values, case),
        ComparisonOperator::Ne => ne_predicate(operand, values, case),
        ComparisonOperator::IsNull => Predicate::IsNull(operand),
        ComparisonOperator::NotNull => not_null_predicate(operand, values, case),
        ComparisonOperator::Gt => Predicate::compare(operand, CompareOp::Gt, plain(values), case),
        ComparisonOperator::Gte => Predicate::compare(operand, CompareOp::Gte, plain(values), case),
        ComparisonOperator::Lt => Predicate::compare(operand, CompareOp::Lt, plain(values), case),
        ComparisonOperator::Lte => Predicate::compare(operand, CompareOp::Lte, plain(values), case),
        ComparisonOperator::In => in_predicate(operand, values, case),
        ComparisonOperator::Out => out_predicate(operand, values, case),
    }
}

fn not_null_predicate(operand: Operand, _: &[Value], _: CaseMode) -> Predicate {
    Predicate::IsNotNull(operand)
}

fn eq_predicate(operand: Operand, values: &[Value], case: CaseMode) -> Predicate {
    let Some(value) = values.first() else {
        return Predicate::True;
    };

    match value {
        Value::Null => Predicate::IsNull(operand),
        Value::Text(text) if text.is_empty() => Predicate::Or(vec![
            Predicate::IsNull(operand.clone()),
            Predicate::compare(operand, CompareOp::Eq, vec![value.clone()], case),
        ]),
        Value::Text(text) => match Pattern::from_literal(text) {
            Some(pattern) => Predicate::like(operand, pattern, case),
            None => Predicate::compare(operand, CompareOp::Eq, plain(values), case),
        },
        _ => Predicate::compare(
            operand,
            CompareOp::Eq,
            vec![value.clone()],
            CaseMode::Sensitive,
        ),
    }
}

fn ne_predicate(operand: Operand, values: &[Value], case: CaseMode) -> Predicate {
    let Some(value) = values.first() else {
        return Predicate::True;
    };

    match value {
        Value::Null => Predicate::IsNotNull(operand),
        Value::Text(text) if text.is_empty() => Predicate::And(vec![
            Predicate::IsNotNull(operand.clone()),
            Predicate::compare(operand, CompareOp::Ne, vec![value.clone()], case),
        ]),
        Value::Text(text) => {
            let negated = match Pattern::from_literal(text) {
                Some(pattern) => !Predicate::like(operand.clone(), pattern, case),
                None => Predicate::compare(operand.clone(), CompareOp::Ne, plain(values), case),
            };
            Predicate::IsNull(operand) | negated
        }
        _ => {
            Predicate::IsNull(operand.clone())
                | Predicate::compare(
                    operand,
                    CompareOp::Ne,
                    vec![value.clone()],
                    CaseMode::Sensitive,
                )
        }
    }
}

// Membership; an empty literal in the set also admits absent values, as
// equality does.
fn in_predicate(operand: Operand, values: &[Value], case: CaseMode) -> Predicate {
    let membership = Predicate::compare(operand.clone(), CompareOp::In, plain(values), case);

    if values.iter().any(is_empty_text) {
        Predicate::IsNull(operand) | membership
    } else {
        membership
    }
}

fn out_predicate(operand: Operand, values: &[Value], case: CaseMode) -> Predicate {
    let excluded = !Predicate::compare(operand.clone(), CompareOp::In, plain(values), case);

    if values.iter().any(is_empty_text) {
        Predicate::IsNotNull(operand) & excluded
    } else {
        Predicate::IsNull(operand) | excluded
    }
}
