//! Module: matcher
//! Responsibility: evaluate filter trees directly against in-memory entity
//! graphs, without compiling to predicates.
//! Does not own: selector resolution or literal typing (shared with the
//! compiler), nor scalar comparison rules (see `semantics`).
//! Boundary: every comparison is resolved up front, so a filter that fails
//! to compile fails here before any entity is read.

use crate::{
    ast::{ComparisonOperator, FilterNode},
    compile::context::JoinContext,
    entity::Entity,
    error::{BackendError, FilterError},
    normalize::normalize,
    predicate::{JoinId, Pattern, PatternToken},
    resolve::{AttributeChain, Leaf, resolve},
    schema::{Cardinality, Relation, SchemaRegistry},
    semantics::{self, MatchToken},
    value::Value,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

const MATCHER: &str = "matcher";

fn failure(message: String) -> FilterError {
    FilterError::Backend(BackendError::new(MATCHER, message))
}

///
/// EntityMatcher
///
/// Reference semantics for one entity kind. Relationship comparisons hold
/// when any related element satisfies them; `!=`, `=out=` and `=is=` over a
/// relationship hold when no related element violates them. Comparisons
/// inside one disjunction that name the same relationship path range over
/// the same element, as the compiled joins do.
///

#[derive(Clone, Copy, Debug)]
pub struct EntityMatcher<'a> {
    registry: &'a SchemaRegistry,
    entity_kind: &'a str,
    ignore_case: bool,
}

impl<'a> EntityMatcher<'a> {
    #[must_use]
    pub const fn new(
        registry: &'a SchemaRegistry,
        entity_kind: &'a str,
        ignore_case: bool,
    ) -> Self {
        Self {
            registry,
            entity_kind,
            ignore_case,
        }
    }

    /// Resolve and type every comparison in `node`.
    pub fn prepare(&self, node: &FilterNode) -> Result<MatchPlan, FilterError> {
        let mut planner = Planner {
            matcher: *self,
            next_slot: 0,
            slots: BTreeMap::new(),
            references: BTreeMap::new(),
        };
        let (root, _) = planner.plan(node, JoinContext::isolated())?;

        Ok(MatchPlan {
            root,
            slots: planner.slots,
        })
    }

    pub fn matches(&self, node: &FilterNode, entity: &Entity) -> Result<bool, FilterError> {
        self.prepare(node)?.matches(entity)
    }

    pub fn filter<'e>(
        &self,
        node: &FilterNode,
        entities: &'e [Entity],
    ) -> Result<Vec<&'e Entity>, FilterError> {
        self.prepare(node)?.filter(entities)
    }
}

///
/// Planner
///
/// Allocates one slot per relationship element a comparison ranges over,
/// reusing slots exactly where the compiler reuses joins.
///

struct Planner<'a> {
    matcher: EntityMatcher<'a>,
    next_slot: u32,
    slots: BTreeMap<JoinId, Slot>,
    references: BTreeMap<(Option<JoinId>, String), JoinId>,
}

impl Planner<'_> {
    fn plan(
        &mut self,
        node: &FilterNode,
        ctx: JoinContext,
    ) -> Result<(Check, JoinContext), FilterError> {
        match node {
            FilterNode::And(children) => {
                let mut ctx = ctx;
                let mut planned = Vec::with_capacity(children.len());
                for child in children {
                    let (check, next) = self.plan(child, ctx)?;
                    planned.push(check);
                    ctx = next;
                }

                Ok((Check::All(Group::new(planned)), ctx))
            }
            FilterNode::Or(children) => {
                let mut inner = JoinContext::disjunction();
                let mut planned = Vec::with_capacity(children.len());
                for child in children {
                    let (check, next) = self.plan(child, inner)?;
                    planned.push(check);
                    inner = next;
                }

                Ok((Check::Any(Group::new(planned)), ctx))
            }
            FilterNode::Compare {
                selector,
                operator,
                arguments,
            } => {
                let matcher = self.matcher;
                let resolved = resolve(matcher.registry, matcher.entity_kind, selector)?;
                let values = normalize(selector, *operator, arguments, &resolved.chain.value_type)?;
                let fold = matcher.ignore_case && resolved.chain.value_type.is_text();
                let chain = resolved.chain;

                let (binding, ctx) = match (&chain.map_key, positive_form(*operator)) {
                    (Some(_), _) if operator.is_null_check() => (Binding::Keyed, ctx),
                    (None, Some(positive)) if !chain.relations.is_empty() => {
                        (Binding::Excluded(positive), ctx)
                    }
                    _ => {
                        let (joins, ctx) = self.bind(&chain.relations, ctx);
                        (Binding::Joined(joins), ctx)
                    }
                };

                Ok((
                    Check::Compare(Comparison {
                        chain,
                        binding,
                        operator: *operator,
                        values,
                        fold,
                        fold_keys: matcher.ignore_case,
                    }),
                    ctx,
                ))
            }
        }
    }

    // Same reuse rules as the compiler's root-scope joins: to-one hops are
    // shared everywhere, multi-valued hops as far as `ctx` allows.
    fn bind(&mut self, relations: &[Relation], mut ctx: JoinContext) -> (Vec<JoinId>, JoinContext) {
        let mut joins: Vec<JoinId> = Vec::with_capacity(relations.len());
        let mut path = String::new();

        for relation in relations {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(&relation.attribute);

            let parent = joins.last().copied();
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
                    self.next_slot += 1;
                    let id = JoinId(self.next_slot);
                    self.slots.insert(
                        id,
                        Slot {
                            parent,
                            relation: relation.clone(),
                        },
                    );
                    if relation.cardinality == Cardinality::One {
                        self.references
                            .insert((parent, relation.attribute.clone()), id);
                    } else {
                        ctx = ctx.with_handle(&path, id);
                    }
                    id
                }
            };

            joins.push(id);
        }

        (joins, ctx)
    }
}

// Positive form of an operator that must hold for no related element.
const fn positive_form(operator: ComparisonOperator) -> Option<ComparisonOperator> {
    match operator {
        ComparisonOperator::Ne => Some(ComparisonOperator::Eq),
        ComparisonOperator::Out => Some(ComparisonOperator::In),
        ComparisonOperator::IsNull => Some(ComparisonOperator::NotNull),
        _ => None,
    }
}

///
/// MatchPlan
///
/// Prepared filter; evaluation only reads entities.
///

#[derive(Clone, Debug)]
pub struct MatchPlan {
    root: Check,
    slots: BTreeMap<JoinId, Slot>,
}

impl MatchPlan {
    pub fn matches(&self, entity: &Entity) -> Result<bool, FilterError> {
        let evaluation = Evaluation {
            slots: &self.slots,
            entity,
        };

        evaluation.check(&self.root, &mut BTreeMap::new())
    }

    pub fn filter<'e>(&self, entities: &'e [Entity]) -> Result<Vec<&'e Entity>, FilterError> {
        let mut selected = Vec::new();
        for entity in entities {
            if self.matches(entity)? {
                selected.push(entity);
            }
        }

        Ok(selected)
    }
}

// One related element ranged over by the comparisons naming its path.
#[derive(Clone, Debug)]
struct Slot {
    parent: Option<JoinId>,
    relation: Relation,
}

#[derive(Clone, Debug)]
enum Check {
    All(Group),
    Any(Group),
    Compare(Comparison),
}

impl Check {
    fn slots(&self, into: &mut BTreeSet<JoinId>) {
        match self {
            Self::All(group) | Self::Any(group) => {
                for child in &group.children {
                    child.slots(into);
                }
            }
            Self::Compare(comparison) => {
                if let Binding::Joined(joins) = &comparison.binding {
                    into.extend(joins.iter().copied());
                }
            }
        }
    }
}

// Children plus the slots more than one of them ranges over; those are
// bound once for the whole group.
#[derive(Clone, Debug)]
struct Group {
    children: Vec<Check>,
    shared: Vec<JoinId>,
}

impl Group {
    fn new(children: Vec<Check>) -> Self {
        let mut seen = BTreeSet::new();
        let mut shared = BTreeSet::new();
        for child in &children {
            let mut used = BTreeSet::new();
            child.slots(&mut used);
            for id in used {
                if !seen.insert(id) {
                    shared.insert(id);
                }
            }
        }

        Self {
            children,
            shared: shared.into_iter().collect(),
        }
    }
}

type Bindings<'e> = BTreeMap<JoinId, Option<Candidate<'e>>>;

// Evaluation of one entity. A slot is bound to one reached element, or to
// `None` when its hop reaches nothing, at the group that shares it.
struct Evaluation<'p, 'e> {
    slots: &'p BTreeMap<JoinId, Slot>,
    entity: &'e Entity,
}

impl<'e> Evaluation<'_, 'e> {
    fn check(&self, check: &Check, bound: &mut Bindings<'e>) -> Result<bool, FilterError> {
        match check {
            Check::All(group) => self.exists(&group.shared, bound, &mut |bound| {
                for child in &group.children {
                    if !self.check(child, bound)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }),
            Check::Any(group) => self.exists(&group.shared, bound, &mut |bound| {
                for child in &group.children {
                    if self.check(child, bound)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }),
            Check::Compare(comparison) => match &comparison.binding {
                Binding::Joined(joins) => self.exists(joins, bound, &mut |bound| {
                    let target = match joins.last() {
                        Some(id) => bound.get(id).copied().flatten(),
                        None => Some(Candidate::Entity(self.entity)),
                    };
                    comparison.eval_bound(target)
                }),
                Binding::Excluded(positive) => comparison.excludes(self.entity, *positive),
                Binding::Keyed => comparison.keyed(self.entity),
            },
        }
    }

    // True when some assignment of the unbound `ids` satisfies `body`.
    // Parents are allocated before their children, so ascending order binds
    // a parent first.
    fn exists(
        &self,
        ids: &[JoinId],
        bound: &mut Bindings<'e>,
        body: &mut dyn FnMut(&mut Bindings<'e>) -> Result<bool, FilterError>,
    ) -> Result<bool, FilterError> {
        let Some(position) = ids.iter().position(|id| !bound.contains_key(id)) else {
            return body(bound);
        };
        let id = ids[position];

        for candidate in self.reach(id, bound) {
            bound.insert(id, candidate);
            let found = self.exists(&ids[position + 1..], bound, body);
            bound.remove(&id);
            if found? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn reach(&self, id: JoinId, bound: &Bindings<'e>) -> Vec<Option<Candidate<'e>>> {
        let Some(slot) = self.slots.get(&id) else {
            return vec![None];
        };
        let parent = match slot.parent {
            None => Some(Candidate::Entity(self.entity)),
            Some(parent) => bound.get(&parent).copied().flatten(),
        };

        let reached = step(parent, &slot.relation);
        if reached.is_empty() {
            vec![None]
        } else {
            reached.into_iter().map(Some).collect()
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Candidate<'e> {
    Entity(&'e Entity),
    Entry(&'e str, &'e Value),
}

// How a comparison reaches its leaf.
#[derive(Clone, Debug)]
enum Binding {
    /// Leaf on the element bound to the last slot, or on the entity itself
    /// when there are no slots.
    Joined(Vec<JoinId>),
    /// Holds when no reachable element satisfies the positive operator.
    Excluded(ComparisonOperator),
    /// Map entry presence.
    Keyed,
}

#[derive(Clone, Debug)]
struct Comparison {
    chain: AttributeChain,
    binding: Binding,
    operator: ComparisonOperator,
    values: Vec<Value>,
    fold: bool,
    fold_keys: bool,
}

impl Comparison {
    fn eval_bound(&self, target: Option<Candidate<'_>>) -> Result<bool, FilterError> {
        if self.chain.map_key.is_some() {
            let Some(candidate) = target else {
                return Ok(false);
            };
            if !self.key_matches(candidate)? {
                return Ok(false);
            }
        }

        let value = entity_leaf(target, &self.chain.leaf)?;
        self.holds(self.operator, value.as_ref())
    }

    // Map entry presence for `=is=`/`=not=` on a keyed selector.
    fn keyed(&self, entity: &Entity) -> Result<bool, FilterError> {
        let mut keyed = false;
        for candidate in walk(entity, &self.chain).into_iter().flatten() {
            if self.key_matches(candidate)? {
                keyed = true;
                break;
            }
        }

        Ok(keyed == (self.operator == ComparisonOperator::NotNull))
    }

    // Holds when no reachable element satisfies `positive`.
    fn excludes(&self, entity: &Entity, positive: ComparisonOperator) -> Result<bool, FilterError> {
        let mut reached = false;
        for candidate in walk(entity, &self.chain).into_iter().flatten() {
            reached = true;
            let value = entity_leaf(Some(candidate), &self.chain.leaf)?;
            if self.holds(positive, value.as_ref())? {
                return Ok(false);
            }
        }

        // `''` also matches a missing element, so its negation needs the
        // chain to reach at least one element.
        Ok(reached
            || self.operator == ComparisonOperator::IsNull
            || !self.values.iter().any(|value| value.as_text() == Some("")))
    }

    fn key_matches(&self, candidate: Candidate<'_>) -> Result<bool, FilterError> {
        let Some(map_key) = &self.chain.map_key else {
            return Ok(true);
        };
        let Some(stored) = entity_leaf(Some(candidate), &map_key.leaf)? else {
            return Ok(false);
        };

        semantics::compare(&stored, &Value::text(map_key.key.clone()), self.fold_keys)
            .map(Ordering::is_eq)
            .map_err(failure)
    }

    // Single-valued semantics of `operator` against one possibly absent value.
    fn holds(
        &self,
        operator: ComparisonOperator,
        value: Option<&Value>,
    ) -> Result<bool, FilterError> {
        let values = &self.values;
        let any_empty = values.iter().any(|value| value.as_text() == Some(""));

        match operator {
            ComparisonOperator::IsNull => Ok(value.is_none()),
            ComparisonOperator::NotNull => Ok(value.is_some()),
            ComparisonOperator::Eq => self.equals(value),
            ComparisonOperator::Ne => match values.first() {
                Some(Value::Null) => Ok(value.is_some()),
                Some(literal) if literal.as_text() == Some("") => {
                    Ok(value.is_some() && !self.equals(value)?)
                }
                _ => Ok(value.is_none() || !self.equals(value)?),
            },
            ComparisonOperator::In => {
                if any_empty && value.is_none() {
                    return Ok(true);
                }
                self.member(value)
            }
            ComparisonOperator::Out => {
                if value.is_none() {
                    return Ok(!any_empty);
                }
                Ok(!self.member(value)?)
            }
            ComparisonOperator::Gt
            | ComparisonOperator::Gte
            | ComparisonOperator::Lt
            | ComparisonOperator::Lte => {
                let (Some(stored), Some(literal)) = (value, values.first()) else {
                    return Ok(false);
                };
                let ordering = self.order(stored, literal)?;
                Ok(match operator {
                    ComparisonOperator::Gt => ordering.is_gt(),
                    ComparisonOperator::Gte => ordering.is_ge(),
                    ComparisonOperator::Lt => ordering.is_lt(),
                    _ => ordering.is_le(),
                })
            }
        }
    }

    fn equals(&self, value: Option<&Value>) -> Result<bool, FilterError> {
        let Some(literal) = self.values.first() else {
            return Ok(false);
        };

        match (literal, value) {
            (Value::Null, value) => Ok(value.is_none()),
            (Value::Text(text), None) => Ok(text.is_empty()),
            (_, None) => Ok(false),
            (Value::Text(text), Some(stored)) => match Pattern::from_literal(text) {
                Some(pattern) => Ok(self.like(stored, &pattern)),
                None => Ok(self.order(stored, literal)?.is_eq()),
            },
            (_, Some(stored)) => Ok(self.order(stored, literal)?.is_eq()),
        }
    }

    fn member(&self, value: Option<&Value>) -> Result<bool, FilterError> {
        let Some(stored) = value else {
            return Ok(false);
        };
        for literal in &self.values {
            if self.order(stored, literal)?.is_eq() {
                return Ok(true);
            }
        }

        Ok(false)
    }

    // Wildcard-free literals compare as plain text, `\*` reading as `*`.
    fn order(&self, stored: &Value, literal: &Value) -> Result<Ordering, FilterError> {
        let literal = match literal {
            Value::Text(text) => Value::text(Pattern::unescape(text)),
            other => other.clone(),
        };

        semantics::compare(stored, &literal, self.fold).map_err(failure)
    }

    fn like(&self, stored: &Value, pattern: &Pattern) -> bool {
        let fold = |text: &str| {
            if self.fold {
                semantics::fold(text)
            } else {
                text.to_string()
            }
        };

        let mut tokens = Vec::new();
        for token in pattern.tokens() {
            match token {
                PatternToken::AnySequence => tokens.push(MatchToken::AnySequence),
                PatternToken::Literal(text) => {
                    tokens.extend(fold(text).chars().map(MatchToken::Literal));
                }
            }
        }

        semantics::wildcard_match(&fold(&semantics::match_text(stored)), &tokens)
    }
}

// Every element reachable along the chain's relations. A hop that yields
// nothing contributes a `None` candidate, so the caller sees dead ends.
fn walk<'e>(entity: &'e Entity, chain: &AttributeChain) -> Vec<Option<Candidate<'e>>> {
    let mut candidates = vec![Some(Candidate::Entity(entity))];

    for relation in &chain.relations {
        let mut next = Vec::new();
        for candidate in candidates {
            let reached = step(candidate, relation);
            if reached.is_empty() {
                next.push(None);
            } else {
                next.extend(reached.into_iter().map(Some));
            }
        }
        candidates = next;
    }

    candidates
}

// Elements one hop away from `candidate`.
fn step<'e>(candidate: Option<Candidate<'e>>, relation: &Relation) -> Vec<Candidate<'e>> {
    match candidate {
        Some(Candidate::Entity(parent)) => match relation.cardinality {
            Cardinality::One | Cardinality::Many => parent
                .related(&relation.attribute)
                .into_iter()
                .map(Candidate::Entity)
                .collect(),
            Cardinality::Map => parent
                .entries(&relation.attribute)
                .into_iter()
                .map(|(key, value)| Candidate::Entry(key, value))
                .collect(),
        },
        Some(Candidate::Entry(..)) | None => Vec::new(),
    }
}

fn entity_leaf(
    candidate: Option<Candidate<'_>>,
    leaf: &Leaf,
) -> Result<Option<Value>, FilterError> {
    let Some(candidate) = candidate else {
        return Ok(None);
    };

    match (candidate, leaf) {
        (Candidate::Entity(entity), Leaf::Attribute(name)) => Ok(entity.value(name).cloned()),
        (Candidate::Entry(key, _), Leaf::MapKey) => Ok(Some(Value::text(key))),
        (Candidate::Entry(_, value), Leaf::MapValue) => {
            Ok((!value.is_null()).then(|| value.clone()))
        }
        (_, leaf) => Err(failure(format!("{leaf:?} is not readable here"))),
    }
}
