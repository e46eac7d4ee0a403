//! Module: schema::registry
//! Responsibility: validated lookup tables for entity models and field specs.
//! Does not own: selector splitting or default sub-attribute policy.
//! Boundary: the only source of schema truth for resolver and compiler.

use crate::{
    error::FilterError,
    schema::{
        AttributeKind, Cardinality, EntityModel, FieldSpec, MapSpec, Relation, SchemaError,
    },
    value::ValueType,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// EntityKind
///
/// Filterable surface of one entity kind: its root model, its field table and
/// the legacy default sub-attributes for bare selectors.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityKind {
    name: String,
    model: String,
    fields: Vec<FieldSpec>,
    legacy_defaults: BTreeMap<String, String>,
}

impl EntityKind {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Case-insensitive field lookup.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }

    /// Sub-attribute a bare selector for `field` historically meant.
    #[must_use]
    pub fn legacy_default(&self, field: &str) -> Option<&str> {
        self.legacy_defaults
            .get(&field.to_ascii_lowercase())
            .map(String::as_str)
    }
}

///
/// WalkedPath
///
/// Result of walking a dotted attribute path through the model graph.
///

#[derive(Clone, Debug)]
pub(crate) struct WalkedPath<'a> {
    pub(crate) relations: Vec<Relation>,
    pub(crate) leaf: &'a str,
    pub(crate) value_type: &'a ValueType,
}

///
/// SchemaRegistry
///
/// Immutable schema table. Construct through [`SchemaRegistry::builder`].
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SchemaRegistry {
    models: BTreeMap<String, EntityModel>,
    kinds: BTreeMap<String, EntityKind>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    #[must_use]
    pub fn model(&self, name: &str) -> Option<&EntityModel> {
        self.models.get(name)
    }

    /// Case-insensitive entity kind lookup.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<&EntityKind> {
        self.kinds.get(&name.to_ascii_lowercase())
    }

    pub fn kinds(&self) -> impl Iterator<Item = &EntityKind> {
        self.kinds.values()
    }

    /// Resolve the field spec addressed by `field_name` for `entity_kind`.
    pub fn lookup(&self, entity_kind: &str, field_name: &str) -> Result<&FieldSpec, FilterError> {
        let Some(kind) = self.kind(entity_kind) else {
            return Err(FilterError::unsupported_field(
                field_name,
                format!("unknown entity kind '{entity_kind}'"),
                Vec::new(),
            ));
        };

        kind.field(field_name).ok_or_else(|| {
            FilterError::unsupported_field(
                field_name,
                "unknown field",
                self.expected_field_list(entity_kind),
            )
        })
    }

    /// Every selector spelling accepted for `entity_kind`, in declaration order.
    #[must_use]
    pub fn expected_field_list(&self, entity_kind: &str) -> Vec<String> {
        let Some(kind) = self.kind(entity_kind) else {
            return Vec::new();
        };

        let mut expected = Vec::new();
        for field in kind.fields() {
            let name = field.name().to_ascii_lowercase();
            if field.is_map() {
                expected.push(format!("{name}.<keyName>"));
            } else if field.sub_attributes().is_empty() {
                expected.push(name);
            } else {
                expected.extend(
                    field
                        .sub_attributes()
                        .iter()
                        .map(|sub| format!("{name}.{sub}")),
                );
            }
        }

        expected
    }

    /// Walk a dotted attribute path starting at `model`.
    ///
    /// Every segment but the last must be a reference or collection; the last
    /// must be a value attribute.
    pub(crate) fn walk<'a>(
        &'a self,
        model: &'a EntityModel,
        path: &str,
    ) -> Result<WalkedPath<'a>, String> {
        let mut current = model;
        let mut relations = Vec::new();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let attribute = current
                .attribute(segment)
                .ok_or_else(|| format!("'{}' has no attribute '{segment}'", current.name))?;
            let last = segments.peek().is_none();

            match (&attribute.kind, last) {
                (AttributeKind::Value(value_type), true) => {
                    return Ok(WalkedPath {
                        relations,
                        leaf: &attribute.name,
                        value_type,
                    });
                }
                (AttributeKind::Reference(target) | AttributeKind::Collection(target), false) => {
                    let cardinality = if matches!(attribute.kind, AttributeKind::Reference(_)) {
                        Cardinality::One
                    } else {
                        Cardinality::Many
                    };
                    relations.push(Relation {
                        attribute: attribute.name.clone(),
                        cardinality,
                    });
                    current = self
                        .model(target)
                        .ok_or_else(|| format!("entity model '{target}' is not declared"))?;
                }
                (AttributeKind::Value(_) | AttributeKind::Map(_), false) => {
                    return Err(format!("'{segment}' has no nested attributes"));
                }
                (_, true) => {
                    return Err(format!("'{segment}' is a relationship, not a value"));
                }
            }
        }

        Err("empty attribute path".to_string())
    }
}

///
/// RegistryBuilder
///

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    models: Vec<EntityModel>,
    kinds: Vec<(String, String, Vec<FieldSpec>)>,
    legacy_defaults: Vec<(String, String, String)>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn model(mut self, model: EntityModel) -> Self {
        self.models.push(model);
        self
    }

    /// Expose `fields` of the model named `model` as entity kind `kind`.
    #[must_use]
    pub fn kind(
        mut self,
        kind: impl Into<String>,
        model: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        self.kinds.push((kind.into(), model.into(), fields));
        self
    }

    /// Record that a bare `field` selector on `kind` means `field.sub_attribute`.
    #[must_use]
    pub fn legacy_default(
        mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        sub_attribute: impl Into<String>,
    ) -> Self {
        self.legacy_defaults
            .push((kind.into(), field.into(), sub_attribute.into()));
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut registry = SchemaRegistry::default();

        for model in self.models {
            if registry.models.contains_key(&model.name) {
                return Err(SchemaError::DuplicateModel(model.name));
            }
            registry.models.insert(model.name.clone(), model);
        }

        for model in registry.models.values() {
            validate_model(&registry, model)?;
        }

        for (kind, model, fields) in self.kinds {
            let key = kind.to_ascii_lowercase();
            if registry.kinds.contains_key(&key) {
                return Err(SchemaError::DuplicateKind(kind));
            }
            let root = registry
                .model(&model)
                .ok_or_else(|| SchemaError::UnknownModel(model.clone()))?;

            let mut seen = BTreeSet::new();
            for field in &fields {
                if !seen.insert(field.name().to_ascii_lowercase()) {
                    return Err(SchemaError::DuplicateField {
                        kind,
                        field: field.name().to_string(),
                    });
                }
                validate_field(&registry, root, field).map_err(|message| {
                    SchemaError::InvalidField {
                        kind: kind.clone(),
                        field: field.name().to_string(),
                        message,
                    }
                })?;
            }

            registry.kinds.insert(
                key,
                EntityKind {
                    name: kind,
                    model,
                    fields,
                    legacy_defaults: BTreeMap::new(),
                },
            );
        }

        for (kind, field, sub_attribute) in self.legacy_defaults {
            let invalid = || SchemaError::InvalidLegacyDefault {
                kind: kind.clone(),
                field: field.clone(),
                sub_attribute: sub_attribute.clone(),
            };
            let entry = registry
                .kinds
                .get_mut(&kind.to_ascii_lowercase())
                .ok_or_else(invalid)?;
            let declared = entry
                .field(&field)
                .and_then(|spec| spec.find_sub_attribute(&sub_attribute))
                .map(str::to_string)
                .ok_or_else(invalid)?;

            entry
                .legacy_defaults
                .insert(field.to_ascii_lowercase(), declared);
        }

        tracing::debug!(
            models = registry.models.len(),
            kinds = registry.kinds.len(),
            "schema registry built"
        );

        Ok(registry)
    }
}

fn validate_model(registry: &SchemaRegistry, model: &EntityModel) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for attribute in &model.attributes {
        if !seen.insert(attribute.name.as_str()) {
            return Err(SchemaError::DuplicateAttribute {
                model: model.name.clone(),
                attribute: attribute.name.clone(),
            });
        }
        if let AttributeKind::Reference(target) | AttributeKind::Collection(target) =
            &attribute.kind
            && registry.model(target).is_none()
        {
            return Err(SchemaError::UnknownModel(target.clone()));
        }
    }

    match model.attribute(&model.identifier) {
        Some(attribute) if matches!(attribute.kind, AttributeKind::Value(_)) => Ok(()),
        _ => Err(SchemaError::InvalidIdentifier {
            model: model.name.clone(),
            identifier: model.identifier.clone(),
        }),
    }
}

fn validate_field(
    registry: &SchemaRegistry,
    root: &EntityModel,
    field: &FieldSpec,
) -> Result<(), String> {
    if field.name().is_empty() || field.name().contains('.') {
        return Err("field names must be non-empty and must not contain '.'".to_string());
    }

    if let Some(identifier) = field.identifier()
        && !matches!(
            root.attribute(identifier).map(|attribute| &attribute.kind),
            Some(AttributeKind::Value(_))
        )
    {
        return Err(format!("identifier '{identifier}' is not a value attribute"));
    }

    let attribute = root
        .attribute(field.attribute())
        .ok_or_else(|| format!("'{}' has no attribute '{}'", root.name, field.attribute()))?;

    match (field.map(), &attribute.kind) {
        (Some(MapSpec::Native), AttributeKind::Map(_)) => {
            if field.sub_attributes().is_empty() {
                Ok(())
            } else {
                Err("native map fields take no sub-attributes".to_string())
            }
        }
        (Some(MapSpec::Entries { key, value }), AttributeKind::Collection(target)) => {
            let entries = registry
                .model(target)
                .ok_or_else(|| format!("entity model '{target}' is not declared"))?;
            for name in [key, value] {
                if !matches!(
                    entries.attribute(name).map(|attribute| &attribute.kind),
                    Some(AttributeKind::Value(_))
                ) {
                    return Err(format!("map entry attribute '{name}' is not a value"));
                }
            }
            match field.sub_attributes() {
                [] => Ok(()),
                [only] if only == value => Ok(()),
                _ => Err(format!(
                    "map fields may only declare the value attribute '{value}'"
                )),
            }
        }
        (Some(_), _) => Err("map declaration does not match the attribute kind".to_string()),
        (None, AttributeKind::Map(_)) => Err("map attributes must be declared as maps".to_string()),
        (None, AttributeKind::Value(_)) => {
            if field.sub_attributes().is_empty() {
                Ok(())
            } else {
                Err("value attributes take no sub-attributes".to_string())
            }
        }
        (None, AttributeKind::Reference(_) | AttributeKind::Collection(_)) => {
            if field.sub_attributes().is_empty() {
                return Err("relationship fields need at least one sub-attribute".to_string());
            }
            for sub in field.sub_attributes() {
                let path = format!("{}.{sub}", field.attribute());
                registry.walk(root, &path)?;
            }

            Ok(())
        }
    }
}
