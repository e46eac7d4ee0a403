//! Module: entities
//! Responsibility: JSON documents to entity graphs typed by the schema.
//! Does not own: filter evaluation.
//! Boundary: CLI input only; unknown attributes are rejected.

use crate::error::CliError;
use qlfilter::core::{
    entity::Entity,
    schema::{AttributeKind, EntityModel, SchemaRegistry},
    value::{Value, ValueType},
};
use serde_json::Value as Json;
use std::{fs, path::Path};

/// Read a JSON array of `entity_kind` entities from `path`.
pub fn load(
    registry: &SchemaRegistry,
    entity_kind: &str,
    path: &Path,
) -> Result<(Vec<Json>, Vec<Entity>), CliError> {
    let source = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let documents: Vec<Json> = serde_json::from_str(&source)?;
    let entities = convert(registry, entity_kind, &documents)?;

    Ok((documents, entities))
}

pub fn convert(
    registry: &SchemaRegistry,
    entity_kind: &str,
    documents: &[Json],
) -> Result<Vec<Entity>, CliError> {
    let model = registry
        .kind(entity_kind)
        .and_then(|kind| registry.model(kind.model()))
        .ok_or_else(|| CliError::UnknownKind(entity_kind.to_string()))?;

    documents
        .iter()
        .enumerate()
        .map(|(index, document)| entity(registry, model, document, &format!("[{index}]")))
        .collect()
}

fn entity(
    registry: &SchemaRegistry,
    model: &EntityModel,
    document: &Json,
    path: &str,
) -> Result<Entity, CliError> {
    let Json::Object(fields) = document else {
        return Err(invalid(path, format!("expected a {} object", model.name)));
    };

    let mut entity = Entity::new();
    for (name, json) in fields {
        let path = format!("{path}.{name}");
        let attribute = model
            .attribute(name)
            .ok_or_else(|| invalid(&path, format!("{} has no attribute '{name}'", model.name)))?;

        entity = match (&attribute.kind, json) {
            (_, Json::Null) => entity,
            (AttributeKind::Value(value_type), json) => {
                entity.with_value(name.as_str(), scalar(value_type, json, &path)?)
            }
            (AttributeKind::Reference(target), json) => {
                let target = target_model(registry, target, &path)?;
                entity.with_reference(name.as_str(), self::entity(registry, target, json, &path)?)
            }
            (AttributeKind::Collection(target), Json::Array(items)) => {
                let target = target_model(registry, target, &path)?;
                let elements = items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| {
                        self::entity(registry, target, item, &format!("{path}[{index}]"))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                entity.with_collection(name.as_str(), elements)
            }
            (AttributeKind::Map(value_type), Json::Object(entries)) => {
                let entries = entries
                    .iter()
                    .map(|(key, json)| {
                        let value = match json {
                            Json::Null => Value::Null,
                            json => scalar(value_type, json, &format!("{path}.{key}"))?,
                        };
                        Ok((key.clone(), value))
                    })
                    .collect::<Result<Vec<_>, CliError>>()?;
                entity.with_map(name.as_str(), entries)
            }
            (AttributeKind::Collection(_), _) => return Err(invalid(&path, "expected an array")),
            (AttributeKind::Map(_), _) => return Err(invalid(&path, "expected an object")),
        };
    }

    Ok(entity)
}

fn target_model<'a>(
    registry: &'a SchemaRegistry,
    target: &str,
    path: &str,
) -> Result<&'a EntityModel, CliError> {
    registry
        .model(target)
        .ok_or_else(|| invalid(path, format!("entity model '{target}' is not declared")))
}

fn scalar(value_type: &ValueType, json: &Json, path: &str) -> Result<Value, CliError> {
    match (value_type, json) {
        (ValueType::Text, Json::String(text)) => Ok(Value::text(text.as_str())),
        (ValueType::Integer, Json::Number(number)) => number
            .as_i64()
            .map(Value::Integer)
            .ok_or_else(|| invalid(path, format!("{number} is not a 64-bit integer"))),
        (ValueType::Boolean, Json::Bool(flag)) => Ok(Value::Bool(*flag)),
        (ValueType::Symbol(set), Json::String(text)) => set
            .find(text)
            .map(Value::symbol)
            .ok_or_else(|| invalid(path, format!("'{text}' is not a {} value", set.name()))),
        (value_type, json) => Err(invalid(path, format!("expected {value_type}, got {json}"))),
    }
}

fn invalid(path: &str, message: impl Into<String>) -> CliError {
    CliError::Entity {
        path: path.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qlfilter::{config::FilterConfig, registry::build_registry};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let config = FilterConfig::from_toml_str(
            r#"
[[entities]]
name = "Tag"
attributes = [{ name = "id", kind = "integer" }, { name = "name", kind = "text" }]

[[entities]]
name = "Target"
attributes = [
    { name = "id", kind = "integer" },
    { name = "name", kind = "text" },
    { name = "state", kind = "symbol", symbols = ["ONLINE", "OFFLINE"] },
    { name = "enabled", kind = "boolean" },
    { name = "tags", kind = "collection", target = "Tag" },
    { name = "attributes", kind = "map" },
]

[[kinds]]
name = "target"
model = "Target"
fields = [{ name = "name" }]
"#,
        )
        .expect("config");

        build_registry(&config).expect("registry")
    }

    #[test]
    fn documents_become_typed_entities() {
        let documents = vec![json!({
            "id": 7,
            "name": "lab",
            "state": "online",
            "enabled": true,
            "tags": [{ "name": "eu" }],
            "attributes": { "rev": "1.0", "gone": null },
        })];

        let entities = convert(&registry(), "target", &documents).expect("entities");
        let target = &entities[0];

        assert_eq!(target.value("id"), Some(&Value::Integer(7)));
        assert_eq!(target.value("state"), Some(&Value::symbol("ONLINE")));
        assert_eq!(target.value("enabled"), Some(&Value::Bool(true)));
        assert_eq!(target.related("tags").len(), 1);
        assert_eq!(
            target.entries("attributes"),
            vec![("gone", &Value::Null), ("rev", &Value::text("1.0"))]
        );
    }

    #[test]
    fn mismatched_documents_are_rejected_with_a_path() {
        let registry = registry();

        let err = convert(&registry, "target", &[json!({ "tags": [{ "colour": "red" }] })])
            .expect_err("unknown attribute");
        assert!(err.to_string().contains("[0].tags[0].colour"), "{err}");

        let err =
            convert(&registry, "target", &[json!({ "id": "seven" })]).expect_err("wrong type");
        assert!(err.to_string().contains("expected integer"), "{err}");

        let err =
            convert(&registry, "target", &[json!({ "state": "lost" })]).expect_err("bad symbol");
        assert!(err.to_string().contains("'lost'"), "{err}");

        let err = convert(&registry, "device", &[]).expect_err("unknown kind");
        assert!(matches!(err, CliError::UnknownKind(_)));
    }
}
