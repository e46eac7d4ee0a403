//! Module: resolve
//! Responsibility: selector strings to canonical query paths and typed
//! attribute chains.
//! Does not own: literal typing or predicate construction.
//! Boundary: consumed by the compiler and the entity matcher alike.

use crate::{
    error::FilterError,
    schema::{
        AttributeKind, Cardinality, EntityModel, FieldSpec, MapSpec, Relation, SchemaRegistry,
    },
    value::ValueType,
};

///
/// QueryPath
///
/// Canonical form of a selector. `segments[0]` is the field's attribute;
/// for map fields the last segment is the map key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryPath<'a> {
    pub field: &'a FieldSpec,
    pub segments: Vec<String>,
}

impl QueryPath<'_> {
    /// Single-segment paths, and `<map>.<key>` paths, need no relationship
    /// semantics beyond the map join.
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1 || (self.segments.len() == 2 && self.field.is_map())
    }

    #[must_use]
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}

///
/// Leaf
///
/// Addressable value on a bound element: a named attribute, or the key or
/// value of a native map entry.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Leaf {
    Attribute(String),
    MapKey,
    MapValue,
}

///
/// AttributeChain
///
/// Typed walk of a query path through the model graph: relationship hops
/// from the root, the leaf on the last bound element, and its value type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeChain {
    pub relations: Vec<Relation>,
    pub leaf: Leaf,
    pub value_type: ValueType,
    pub map_key: Option<MapKey>,
}

impl AttributeChain {
    /// True when any hop may bind more than one element.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.relations
            .iter()
            .any(|relation| relation.cardinality.is_multi_valued())
    }
}

///
/// MapKey
///
/// Key constraint attached to the last hop of a map path.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MapKey {
    pub leaf: Leaf,
    pub key: String,
}

///
/// ResolvedPath
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPath<'a> {
    pub path: QueryPath<'a>,
    pub chain: AttributeChain,
    pub model: &'a EntityModel,
}

impl ResolvedPath<'_> {
    /// Identifier used to correlate subqueries over this path.
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.path
            .field
            .identifier()
            .unwrap_or(&self.model.identifier)
    }
}

/// Resolve `selector` against the field table of `entity_kind`.
pub fn resolve<'a>(
    registry: &'a SchemaRegistry,
    entity_kind: &str,
    selector: &str,
) -> Result<ResolvedPath<'a>, FilterError> {
    let (name, rest) = match selector.split_once('.') {
        Some((name, rest)) => (name, Some(rest)),
        None => (selector, None),
    };

    let field = registry.lookup(entity_kind, name)?;
    let unsupported = |message: String| {
        FilterError::unsupported_field(
            selector,
            message,
            registry.expected_field_list(entity_kind),
        )
    };

    let kind = registry
        .kind(entity_kind)
        .ok_or_else(|| unsupported(format!("unknown entity kind '{entity_kind}'")))?;
    let model = registry
        .model(kind.model())
        .ok_or_else(|| unsupported(format!("entity model '{}' is not declared", kind.model())))?;

    if let Some(map) = field.map() {
        let key = rest
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                unsupported(format!("map search field must be {}.<key>", field.name()))
            })?;

        let chain = map_chain(registry, model, field, map, key).map_err(unsupported)?;
        let path = QueryPath {
            field,
            segments: vec![field.attribute().to_string(), key.to_string()],
        };

        return Ok(ResolvedPath { path, chain, model });
    }

    let sub_attribute = match (rest, field.sub_attributes()) {
        (None, []) => None,
        (Some(_), []) => {
            return Err(unsupported(format!(
                "field '{}' has no sub-attributes",
                field.name()
            )));
        }
        (None, [only]) => Some(only.as_str()),
        (None, _) => Some(kind.legacy_default(field.name()).ok_or_else(|| {
            unsupported(format!(
                "field '{}' needs a sub-attribute",
                field.name()
            ))
        })?),
        (Some(rest), _) => Some(field.find_sub_attribute(rest).ok_or_else(|| {
            unsupported(format!(
                "'{rest}' is not a sub-attribute of '{}'",
                field.name()
            ))
        })?),
    };

    let mut segments = vec![field.attribute().to_string()];
    let attribute_path = match sub_attribute {
        Some(sub) => {
            segments.extend(sub.split('.').map(str::to_string));
            format!("{}.{sub}", field.attribute())
        }
        None => field.attribute().to_string(),
    };

    let walked = registry.walk(model, &attribute_path).map_err(unsupported)?;
    let chain = AttributeChain {
        relations: walked.relations,
        leaf: Leaf::Attribute(walked.leaf.to_string()),
        value_type: walked.value_type.clone(),
        map_key: None,
    };

    Ok(ResolvedPath {
        path: QueryPath { field, segments },
        chain,
        model,
    })
}

fn map_chain(
    registry: &SchemaRegistry,
    model: &EntityModel,
    field: &FieldSpec,
    map: &MapSpec,
    key: &str,
) -> Result<AttributeChain, String> {
    let attribute = model
        .attribute(field.attribute())
        .ok_or_else(|| format!("'{}' has no attribute '{}'", model.name, field.attribute()))?;

    match (map, &attribute.kind) {
        (MapSpec::Native, AttributeKind::Map(value_type)) => Ok(AttributeChain {
            relations: vec![Relation {
                attribute: attribute.name.clone(),
                cardinality: Cardinality::Map,
            }],
            leaf: Leaf::MapValue,
            value_type: value_type.clone(),
            map_key: Some(MapKey {
                leaf: Leaf::MapKey,
                key: key.to_string(),
            }),
        }),
        (MapSpec::Entries { key: key_attr, value }, AttributeKind::Collection(_)) => {
            let walked = registry.walk(model, &format!("{}.{value}", attribute.name))?;
            Ok(AttributeChain {
                relations: walked.relations,
                leaf: Leaf::Attribute(value.clone()),
                value_type: walked.value_type.clone(),
                map_key: Some(MapKey {
                    leaf: Leaf::Attribute(key_attr.clone()),
                    key: key.to_string(),
                }),
            })
        }
        _ => Err(format!("'{}' is not a map attribute", attribute.name)),
    }
}
