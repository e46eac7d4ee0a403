use crate::{
    entity::Entity,
    schema::{AttributeModel, EntityModel, FieldSpec, SchemaRegistry},
    value::{SymbolSet, Value, ValueType},
};

///
/// registry
///
/// Schema shared by unit tests: a `root` kind covering every field shape
/// (plain values, to-one, to-many, native map, entry map, legacy default)
/// and a `sub` kind without the legacy `type` shortcut.
///

pub(crate) fn registry() -> SchemaRegistry {
    let status = ValueType::Symbol(SymbolSet::new("status", ["ACTIVE", "RETIRED"]));

    SchemaRegistry::builder()
        .model(EntityModel::new(
            "Type",
            vec![
                AttributeModel::value("id", ValueType::Integer),
                AttributeModel::value("key", ValueType::Text),
                AttributeModel::value("name", ValueType::Text),
            ],
        ))
        .model(EntityModel::new(
            "Sub",
            vec![
                AttributeModel::value("id", ValueType::Integer),
                AttributeModel::value("strValue", ValueType::Text),
                AttributeModel::value("intValue", ValueType::Integer),
                AttributeModel::reference("subType", "Type"),
            ],
        ))
        .model(EntityModel::new(
            "Meta",
            vec![
                AttributeModel::value("id", ValueType::Integer),
                AttributeModel::value("key", ValueType::Text),
                AttributeModel::value("value", ValueType::Text),
            ],
        ))
        .model(EntityModel::new(
            "Tag",
            vec![
                AttributeModel::value("id", ValueType::Integer),
                AttributeModel::value("name", ValueType::Text),
            ],
        ))
        .model(EntityModel::new(
            "Root",
            vec![
                AttributeModel::value("id", ValueType::Integer),
                AttributeModel::value("strValue", ValueType::Text),
                AttributeModel::value("intValue", ValueType::Integer),
                AttributeModel::value("status", status),
                AttributeModel::value("enabled", ValueType::Boolean),
                AttributeModel::reference("subEntity", "Sub"),
                AttributeModel::collection("subSet", "Sub"),
                AttributeModel::map("subMap", ValueType::Text),
                AttributeModel::collection("tags", "Tag"),
                AttributeModel::reference("rootType", "Type"),
                AttributeModel::collection("metadata", "Meta"),
            ],
        ))
        .kind("root", "Root", root_fields())
        .kind(
            "sub",
            "Sub",
            vec![
                FieldSpec::new("strValue", "strValue"),
                FieldSpec::new("intValue", "intValue"),
                FieldSpec::new("type", "subType").with_sub_attributes(["key", "name"]),
            ],
        )
        .legacy_default("root", "type", "key")
        .build()
        .expect("fixture registry builds")
}

fn root_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("strValue", "strValue"),
        FieldSpec::new("intValue", "intValue"),
        FieldSpec::new("status", "status"),
        FieldSpec::new("enabled", "enabled"),
        FieldSpec::new("subEntity", "subEntity").with_sub_attributes([
            "strValue",
            "intValue",
            "subType.key",
        ]),
        FieldSpec::new("subSet", "subSet").with_sub_attributes(["strValue", "intValue"]),
        FieldSpec::new("subMap", "subMap").native_map(),
        FieldSpec::new("tag", "tags").with_sub_attributes(["name"]),
        FieldSpec::new("type", "rootType").with_sub_attributes(["key", "name"]),
        FieldSpec::new("meta", "metadata").entry_map("key", "value"),
    ]
}

pub(crate) fn sub(str_value: Option<&str>, int_value: Option<i64>) -> Entity {
    let mut entity = Entity::new();
    if let Some(text) = str_value {
        entity = entity.with_value("strValue", text);
    }
    if let Some(number) = int_value {
        entity = entity.with_value("intValue", number);
    }
    entity
}

pub(crate) fn type_entity(key: &str, name: &str) -> Entity {
    Entity::new().with_value("key", key).with_value("name", name)
}

pub(crate) fn meta(key: &str, value: &str) -> Entity {
    Entity::new().with_value("key", key).with_value("value", value)
}

pub(crate) fn tag(name: &str) -> Entity {
    Entity::new().with_value("name", name)
}

///
/// dataset
///
/// Five roots. `strValue` is `rootx, rootx, rooty, rooty, <absent>`; the
/// relationship fields cover empty, null-valued and multi-element shapes.
///

pub(crate) fn dataset() -> Vec<Entity> {
    vec![
        Entity::new()
            .with_value("id", 1_i64)
            .with_value("strValue", "rootx")
            .with_value("intValue", 10_i64)
            .with_value("status", Value::symbol("ACTIVE"))
            .with_value("enabled", true)
            .with_reference(
                "subEntity",
                sub(Some("a"), Some(1)).with_reference("subType", type_entity("T1", "One")),
            )
            .with_collection("subSet", vec![sub(Some("a"), Some(1)), sub(Some("b"), Some(2))])
            .with_map("subMap", [("x", "rootx"), ("color", "red")])
            .with_collection("tags", vec![tag("blue")])
            .with_reference("rootType", type_entity("alpha", "Alpha"))
            .with_collection("metadata", vec![meta("env", "prod")]),
        Entity::new()
            .with_value("id", 2_i64)
            .with_value("strValue", "rootx")
            .with_value("intValue", 20_i64)
            .with_value("status", Value::symbol("RETIRED"))
            .with_value("enabled", false)
            .with_reference("subEntity", sub(Some("b"), Some(2)))
            .with_collection("subSet", vec![sub(Some("b"), Some(3))])
            .with_map("subMap", [("x", "rooty")])
            .with_collection("tags", Vec::new())
            .with_reference("rootType", type_entity("beta", "Beta"))
            .with_collection("metadata", vec![meta("env", "dev"), meta("owner", "")]),
        Entity::new()
            .with_value("id", 3_i64)
            .with_value("strValue", "rooty")
            .with_value("intValue", 30_i64)
            .with_value("status", Value::symbol("ACTIVE"))
            .with_collection("subSet", Vec::new())
            .with_map("subMap", Vec::<(&str, &str)>::new())
            .with_collection("tags", vec![tag("red"), tag("Blue")]),
        Entity::new()
            .with_value("id", 4_i64)
            .with_value("strValue", "rooty")
            .with_value("enabled", true)
            .with_reference("subEntity", sub(None, Some(4)))
            .with_collection("subSet", vec![sub(None, Some(4)), sub(Some("50%*"), None)])
            .with_map("subMap", [("x", "ROOTX")])
            .with_reference("rootType", type_entity("alpha", "Alpha Two")),
        Entity::new()
            .with_value("id", 5_i64)
            .with_value("intValue", 50_i64)
            .with_value("status", Value::symbol("RETIRED"))
            .with_collection("subSet", vec![sub(Some("a"), None)])
            .with_map("subMap", [("y", "rootx")])
            .with_collection("metadata", vec![meta("ENV", "prod")]),
    ]
}

/// Identifiers of `entities`, in order.
pub(crate) fn ids(entities: &[&Entity]) -> Vec<i64> {
    entities
        .iter()
        .filter_map(|entity| match entity.value("id") {
            Some(Value::Integer(id)) => Some(*id),
            _ => None,
        })
        .collect()
}
