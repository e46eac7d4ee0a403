use qlfilter::{SupportError, config::FilterConfig, prelude::*};

const CONFIG: &str = r#"
[options]
ignore_case = true

[virtual_properties]
OVERDUE_TS = "1000"

[[entities]]
name = "Tag"
attributes = [{ name = "id", kind = "integer" }, { name = "name", kind = "text" }]

[[entities]]
name = "DistributionSet"
attributes = [
    { name = "id", kind = "integer" },
    { name = "name", kind = "text" },
    { name = "version", kind = "text" },
]

[[entities]]
name = "Meta"
attributes = [
    { name = "id", kind = "integer" },
    { name = "key", kind = "text" },
    { name = "value", kind = "text" },
]

[[entities]]
name = "Target"
attributes = [
    { name = "id", kind = "integer" },
    { name = "controllerId", kind = "text" },
    { name = "name", kind = "text" },
    { name = "updateStatus", kind = "symbol", symbols = ["UNKNOWN", "IN_SYNC", "PENDING", "ERROR"] },
    { name = "lastSeen", kind = "integer" },
    { name = "tags", kind = "collection", target = "Tag" },
    { name = "attributes", kind = "map" },
    { name = "assignedDs", kind = "reference", target = "DistributionSet" },
    { name = "metadata", kind = "collection", target = "Meta" },
]

[[kinds]]
name = "target"
model = "Target"
fields = [
    { name = "controllerId" },
    { name = "name" },
    { name = "updateStatus" },
    { name = "lastControllerRequestAt", attribute = "lastSeen" },
    { name = "tag", attribute = "tags", sub_attributes = ["name"] },
    { name = "attribute", attribute = "attributes", map = { storage = "native" } },
    { name = "assignedDs", sub_attributes = ["name", "version"] },
    { name = "metadata", map = { storage = "entries", key = "key", value = "value" } },
]
"#;

fn support() -> FilterSupport {
    let config = FilterConfig::from_toml_str(CONFIG).expect("config");
    FilterSupport::from_config(&config).expect("support")
}

fn tag(name: &str) -> Entity {
    Entity::new().with_value("name", name)
}

fn targets() -> Vec<Entity> {
    vec![
        Entity::new()
            .with_value("id", 1_i64)
            .with_value("controllerId", "dev-01")
            .with_value("name", "Lab A")
            .with_value("updateStatus", Value::symbol("IN_SYNC"))
            .with_value("lastSeen", 2000_i64)
            .with_collection("tags", vec![tag("prod"), tag("eu")])
            .with_map("attributes", [("revision", "1.2"), ("region", "eu")])
            .with_reference(
                "assignedDs",
                Entity::new().with_value("name", "os").with_value("version", "1.0"),
            )
            .with_collection(
                "metadata",
                vec![Entity::new().with_value("key", "owner").with_value("value", "ops")],
            ),
        Entity::new()
            .with_value("id", 2_i64)
            .with_value("controllerId", "dev-02")
            .with_value("name", "Lab B")
            .with_value("updateStatus", Value::symbol("PENDING"))
            .with_value("lastSeen", 500_i64)
            .with_collection("tags", vec![tag("test")])
            .with_map("attributes", [("revision", "2.0")]),
        Entity::new()
            .with_value("id", 3_i64)
            .with_value("controllerId", "gw-01")
            .with_value("updateStatus", Value::symbol("ERROR"))
            .with_reference(
                "assignedDs",
                Entity::new().with_value("name", "os").with_value("version", "2.0"),
            )
            .with_collection(
                "metadata",
                vec![Entity::new().with_value("key", "OWNER").with_value("value", "dev")],
            ),
    ]
}

fn ids(entities: &[&Entity]) -> Vec<i64> {
    entities
        .iter()
        .filter_map(|entity| match entity.value("id") {
            Some(Value::Integer(id)) => Some(*id),
            _ => None,
        })
        .collect()
}

// Both evaluation paths must select the same targets.
fn select(support: &FilterSupport, filter: &str) -> Vec<i64> {
    let targets = targets();
    let compiled = ids(&support.filter("target", filter, &targets).expect("filter"));

    let node = support.parse(filter).expect("parse");
    let direct = ids(
        &support
            .matcher("target")
            .filter(&node, &targets)
            .expect("matcher"),
    );
    assert_eq!(compiled, direct, "evaluators disagree on {filter}");

    compiled
}

#[test]
fn filters_select_targets() {
    let support = support();

    assert_eq!(select(&support, "controllerId==dev-*"), vec![1, 2]);
    assert_eq!(select(&support, "CONTROLLERID==DEV-01"), vec![1]);
    assert_eq!(select(&support, "name=is=null"), vec![3]);
    assert_eq!(select(&support, "updatestatus=in=(in_sync,error)"), vec![1, 3]);
    assert_eq!(select(&support, "tag==prod"), vec![1]);
    assert_eq!(select(&support, "tag!=prod"), vec![2, 3]);
    assert_eq!(select(&support, "assignedds.version==2.0 or name=is=null"), vec![3]);
    assert_eq!(select(&support, "assignedds.name!=os"), vec![2]);
}

#[test]
fn map_fields_need_the_key() {
    let support = support();

    assert_eq!(select(&support, "attribute.revision==1.2"), vec![1]);
    assert_eq!(select(&support, "attribute.revision!=1.2"), vec![2]);
    assert_eq!(select(&support, "attribute.revision=is=null"), vec![3]);
    assert_eq!(select(&support, "metadata.owner==ops"), vec![1]);
    assert_eq!(select(&support, "metadata.owner=not=null"), vec![1, 3]);
}

#[test]
fn virtual_properties_expand_before_compilation() {
    let support = support();

    assert_eq!(select(&support, "lastcontrollerrequestat<${OVERDUE_TS}"), vec![2]);

    let node = support.parse("name==$${OVERDUE_TS}").expect("parse");
    assert_eq!(
        node,
        FilterNode::compare("name", ComparisonOperator::Eq, ["${OVERDUE_TS}"])
    );
}

#[test]
fn validation_reports_stable_error_kinds() {
    let support = support();

    support.validate("target", "tag.name==prod;lastcontrollerrequestat>=10").expect("valid");

    let err = support.validate("target", "unknown==x").expect_err("unknown field");
    assert_eq!(err.kind(), ErrorKind::UnsupportedField);
    assert!(err.expected().contains(&"tag.name".to_string()));
    assert!(err.expected().contains(&"attribute.<keyName>".to_string()));

    let err = support.validate("target", "updatestatus==bogus").expect_err("bad symbol");
    assert_eq!(err.kind(), ErrorKind::ValueCoercion);

    let err = support.validate("target", "name==(").expect_err("bad syntax");
    assert_eq!(err.kind(), ErrorKind::Syntax);

    let err = support.validate("device", "name==x").expect_err("unknown kind");
    assert_eq!(err.kind(), ErrorKind::UnsupportedField);
}

#[test]
fn jpql_uses_the_configured_model() {
    let support = support();
    let query = support.to_jpql("target", "tag==prod").expect("jpql");

    assert_eq!(
        query.text,
        "SELECT DISTINCT e FROM Target e LEFT JOIN e.tags j1 WHERE UPPER(j1.name) = ?1"
    );
    assert_eq!(query.parameters, vec![Value::text("PROD")]);
}

#[test]
fn case_insensitive_database_skips_upper_casing() {
    let config = FilterConfig::from_toml_str(&CONFIG.replace(
        "ignore_case = true",
        "ignore_case = true\ncase_insensitive_db = true\nlike_dialect = \"sqlserver\"",
    ))
    .expect("config");
    let support = FilterSupport::from_config(&config).expect("support");

    let query = support.to_jpql("target", "controllerId==dev_*").expect("jpql");
    assert_eq!(
        query.text,
        "SELECT DISTINCT e FROM Target e WHERE e.controllerId LIKE ?1"
    );
    assert_eq!(query.parameters, vec![Value::text("dev[_]%")]);

    assert_eq!(select(&support, "controllerId==DEV-01"), vec![1]);
}

#[test]
fn broken_schema_is_a_support_error() {
    let config = FilterConfig::from_toml_str(
        "[[kinds]]\nname = \"target\"\nmodel = \"Missing\"\nfields = [{ name = \"name\" }]\n",
    )
    .expect("config");

    let err = FilterSupport::from_config(&config).expect_err("unknown model");
    assert!(matches!(err, SupportError::Schema(_)));
}
