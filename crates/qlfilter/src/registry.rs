//! Module: registry
//! Responsibility: configuration tables to a validated `SchemaRegistry`.
//! Does not own: consistency rules; the registry builder enforces them.
//! Boundary: pure conversion, run once at startup.

use qlfilter_config::{
    AttributeConfig, AttributeKindConfig, EntityConfig, FieldConfig, FilterConfig,
    LikeDialectConfig, MapConfig, ScalarTypeConfig,
};
use qlfilter_core::{
    predicate::LikeDialect,
    schema::{AttributeModel, EntityModel, FieldSpec, SchemaError, SchemaRegistry},
    value::{SymbolSet, ValueType},
};

/// Build the registry described by `config`.
pub fn build_registry(config: &FilterConfig) -> Result<SchemaRegistry, SchemaError> {
    let mut builder = SchemaRegistry::builder();

    for entity in &config.entities {
        builder = builder.model(entity_model(entity));
    }

    for kind in &config.kinds {
        let fields = kind.fields.iter().map(field_spec).collect();
        builder = builder.kind(&kind.name, &kind.model, fields);

        for (field, sub_attribute) in &kind.legacy_defaults {
            builder = builder.legacy_default(&kind.name, field, sub_attribute);
        }
    }

    let registry = builder.build()?;
    tracing::debug!(
        models = config.entities.len(),
        kinds = config.kinds.len(),
        "schema registry built from config"
    );

    Ok(registry)
}

#[must_use]
pub const fn like_dialect(dialect: LikeDialectConfig) -> LikeDialect {
    match dialect {
        LikeDialectConfig::Standard => LikeDialect::Standard,
        LikeDialectConfig::Sqlserver => LikeDialect::SqlServer,
    }
}

fn entity_model(entity: &EntityConfig) -> EntityModel {
    let attributes = entity
        .attributes
        .iter()
        .map(|attribute| attribute_model(&entity.name, attribute))
        .collect();
    let model = EntityModel::new(&entity.name, attributes);

    match &entity.identifier {
        Some(identifier) => model.with_identifier(identifier),
        None => model,
    }
}

fn attribute_model(entity: &str, attribute: &AttributeConfig) -> AttributeModel {
    let name = attribute.name.as_str();

    match &attribute.kind {
        AttributeKindConfig::Text => AttributeModel::value(name, ValueType::Text),
        AttributeKindConfig::Integer => AttributeModel::value(name, ValueType::Integer),
        AttributeKindConfig::Boolean => AttributeModel::value(name, ValueType::Boolean),
        AttributeKindConfig::Symbol { set, symbols } => {
            // unnamed sets are labelled after their attribute
            let set_name = set.clone().unwrap_or_else(|| format!("{entity}.{name}"));
            AttributeModel::value(
                name,
                ValueType::Symbol(SymbolSet::new(set_name, symbols.iter().cloned())),
            )
        }
        AttributeKindConfig::Reference { target } => AttributeModel::reference(name, target),
        AttributeKindConfig::Collection { target } => AttributeModel::collection(name, target),
        AttributeKindConfig::Map { value_type } => {
            AttributeModel::map(name, scalar_type(*value_type))
        }
    }
}

const fn scalar_type(value_type: ScalarTypeConfig) -> ValueType {
    match value_type {
        ScalarTypeConfig::Text => ValueType::Text,
        ScalarTypeConfig::Integer => ValueType::Integer,
        ScalarTypeConfig::Boolean => ValueType::Boolean,
    }
}

fn field_spec(field: &FieldConfig) -> FieldSpec {
    let mut spec = FieldSpec::new(&field.name, field.attribute())
        .with_sub_attributes(field.sub_attributes.iter().cloned());

    spec = match &field.map {
        Some(MapConfig::Native) => spec.native_map(),
        Some(MapConfig::Entries { key, value }) => spec.entry_map(key, value),
        None => spec,
    };

    match &field.identifier {
        Some(identifier) => spec.with_identifier(identifier),
        None => spec,
    }
}
