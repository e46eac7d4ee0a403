use super::{matcher_ids, memory_ids};
use crate::{
    ast::{ComparisonOperator, FilterNode},
    entity::Entity,
    schema::SchemaRegistry,
    test_fixtures::{ids, meta, registry, sub, tag, type_entity},
    value::Value,
};
use proptest::prelude::*;
use std::sync::LazyLock;

static REGISTRY: LazyLock<SchemaRegistry> = LazyLock::new(registry);

const TEXT_POOL: &[&str] = &["a", "b", "A", "rootx", "ROOTY", "", "ab*", "50%"];
const INT_POOL: &[i64] = &[1, 2, 10, -3];
const STATUSES: &[&str] = &["ACTIVE", "RETIRED"];
const TYPE_KEYS: &[&str] = &["alpha", "beta"];
const MAP_KEYS: &[&str] = &["x", "y", "X"];
const ENTRY_KEYS: &[&str] = &["env", "ENV", "owner"];
// Fields behind a relationship hop, where negation ranges over every element.
const RELATED_FIELDS: &[&str] = &[
    "subSet.strValue",
    "subSet.intValue",
    "tag.name",
    "subEntity.strValue",
    "subEntity.intValue",
];

// Fields reachable without a multi-valued hop.
const SINGLE_VALUED: &[&str] = &[
    "strValue",
    "intValue",
    "status",
    "enabled",
    "subEntity.strValue",
    "subEntity.intValue",
    "type",
    "type.name",
];

// Fields behind a collection or a map.
const MULTI_VALUED: &[&str] = &[
    "subSet.strValue",
    "subSet.intValue",
    "tag.name",
    "subMap.x",
    "subMap.y",
    "meta.env",
];

fn literals(selector: &str) -> &'static [&'static str] {
    match selector {
        "intValue" | "subEntity.intValue" | "subSet.intValue" => &["1", "2", "10", "-3"],
        "status" => &["active", "RETIRED"],
        "enabled" => &["true", "false"],
        _ => &["a", "b", "rootx", "ROOTX", "", "a*", "*x", "r*t*", r"ab\*", "50%*"],
    }
}

fn ordered(selector: &str) -> bool {
    !matches!(selector, "status" | "enabled")
}

fn select(node: &FilterNode, dataset: &[Entity], ignore_case: bool) -> (Vec<i64>, Vec<i64>) {
    (
        memory_ids(&REGISTRY, node, dataset, ignore_case),
        matcher_ids(&REGISTRY, node, dataset, ignore_case),
    )
}

fn compare(selector: &str, operator: ComparisonOperator, arguments: &[&str]) -> FilterNode {
    FilterNode::compare(selector, operator, arguments.iter().copied())
}

fn arb_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(prop::sample::select(TEXT_POOL).prop_map(str::to_string))
}

fn arb_int() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(prop::sample::select(INT_POOL))
}

fn arb_entity() -> impl Strategy<Value = Entity> {
    let scalars = (
        arb_text(),
        arb_int(),
        prop::option::of(prop::sample::select(STATUSES)),
        prop::option::of(any::<bool>()),
    );
    let relations = (
        prop::option::of((arb_text(), arb_int())),
        prop::collection::vec((arb_text(), arb_int()), 0..3),
        prop::collection::vec(prop::sample::select(TEXT_POOL), 0..3),
        prop::option::of(prop::sample::select(TYPE_KEYS)),
    );
    let maps = (
        prop::collection::btree_map(
            prop::sample::select(MAP_KEYS),
            prop::sample::select(TEXT_POOL),
            0..3,
        ),
        prop::collection::vec(
            (prop::sample::select(ENTRY_KEYS), prop::sample::select(TEXT_POOL)),
            0..3,
        ),
    );

    (scalars, relations, maps).prop_map(
        |((text, int, status, enabled), (single, many, tags, kind), (map, entries))| {
            let mut entity = Entity::new();
            if let Some(text) = text {
                entity = entity.with_value("strValue", text);
            }
            if let Some(int) = int {
                entity = entity.with_value("intValue", int);
            }
            if let Some(status) = status {
                entity = entity.with_value("status", Value::symbol(status));
            }
            if let Some(enabled) = enabled {
                entity = entity.with_value("enabled", enabled);
            }
            if let Some((text, int)) = single {
                entity = entity.with_reference("subEntity", sub(text.as_deref(), int));
            }
            if let Some(key) = kind {
                entity = entity.with_reference("rootType", type_entity(key, key));
            }

            entity
                .with_collection(
                    "subSet",
                    many.iter().map(|(text, int)| sub(text.as_deref(), *int)).collect(),
                )
                .with_collection("tags", tags.into_iter().map(tag).collect())
                .with_map("subMap", map)
                .with_collection(
                    "metadata",
                    entries.into_iter().map(|(key, value)| meta(key, value)).collect(),
                )
        },
    )
}

fn arb_dataset() -> impl Strategy<Value = Vec<Entity>> {
    prop::collection::vec(arb_entity(), 0..6).prop_map(|entities| {
        entities
            .into_iter()
            .zip(1_i64..)
            .map(|(entity, id)| entity.with_value("id", id))
            .collect()
    })
}

fn arb_operator(selector: &'static str) -> impl Strategy<Value = ComparisonOperator> {
    let mut operators = vec![
        ComparisonOperator::Eq,
        ComparisonOperator::Ne,
        ComparisonOperator::IsNull,
        ComparisonOperator::NotNull,
        ComparisonOperator::In,
        ComparisonOperator::Out,
    ];
    if ordered(selector) {
        operators.extend([
            ComparisonOperator::Gt,
            ComparisonOperator::Gte,
            ComparisonOperator::Lt,
            ComparisonOperator::Lte,
        ]);
    }

    prop::sample::select(operators)
}

fn arb_leaf(selectors: &'static [&'static str]) -> impl Strategy<Value = FilterNode> {
    prop::sample::select(selectors).prop_flat_map(|selector| {
        let arguments = prop::collection::vec(prop::sample::select(literals(selector)), 1..3);

        (arb_operator(selector), arguments).prop_map(move |(operator, arguments)| {
            if operator.is_null_check() {
                compare(selector, operator, &["null"])
            } else if operator.is_multi_value() {
                compare(selector, operator, &arguments)
            } else {
                compare(selector, operator, &arguments[..1])
            }
        })
    })
}

fn all_fields() -> Vec<&'static str> {
    SINGLE_VALUED.iter().chain(MULTI_VALUED).copied().collect()
}

fn arb_any_leaf() -> impl Strategy<Value = FilterNode> {
    prop_oneof![arb_leaf(SINGLE_VALUED), arb_leaf(MULTI_VALUED)]
}

fn arb_filter() -> impl Strategy<Value = FilterNode> {
    let disjunct = prop_oneof![
        2 => arb_any_leaf(),
        1 => prop::collection::vec(arb_any_leaf(), 2..4).prop_map(FilterNode::And),
    ];
    let clause = prop_oneof![
        2 => arb_any_leaf(),
        1 => prop::collection::vec(disjunct, 2..4).prop_map(FilterNode::Or),
    ];

    prop::collection::vec(clause, 1..4).prop_map(|mut clauses| {
        if clauses.len() == 1 {
            clauses.remove(0)
        } else {
            FilterNode::And(clauses)
        }
    })
}

fn difference(all: &[i64], removed: &[i64]) -> Vec<i64> {
    all.iter().copied().filter(|id| !removed.contains(id)).collect()
}

proptest! {
    #[test]
    fn compiled_filter_agrees_with_direct_matcher(
        node in arb_filter(),
        dataset in arb_dataset(),
        ignore_case in any::<bool>(),
    ) {
        let (compiled, direct) = select(&node, &dataset, ignore_case);

        prop_assert_eq!(compiled, direct, "filter {}", node);
    }

    #[test]
    fn null_checks_partition_every_field(dataset in arb_dataset()) {
        let everyone = ids(&dataset.iter().collect::<Vec<_>>());

        for selector in all_fields() {
            let (null, direct_null) =
                select(&compare(selector, ComparisonOperator::IsNull, &["null"]), &dataset, true);
            let (present, direct_present) =
                select(&compare(selector, ComparisonOperator::NotNull, &["null"]), &dataset, true);

            prop_assert_eq!(&null, &direct_null);
            prop_assert_eq!(&present, &direct_present);
            prop_assert!(null.iter().all(|id| !present.contains(id)), "overlap on {}", selector);
            let mut union = [null, present].concat();
            union.sort_unstable();
            prop_assert_eq!(union, everyone.clone(), "union on {}", selector);
        }
    }

    #[test]
    fn related_inequality_is_the_complement_of_equality(
        dataset in arb_dataset(),
        selector in prop::sample::select(RELATED_FIELDS),
        index in 0_usize..5,
    ) {
        let everyone = ids(&dataset.iter().collect::<Vec<_>>());
        let pool = literals(selector);
        let literal = pool[index % pool.len()];

        let (matching, _) = select(
            &compare(selector, ComparisonOperator::Eq, &[literal]),
            &dataset,
            true,
        );
        let (excluded, _) = select(
            &compare(selector, ComparisonOperator::Ne, &[literal]),
            &dataset,
            true,
        );
        prop_assert_eq!(excluded, difference(&everyone, &matching), "{}!={:?}", selector, literal);

        let (members, _) = select(
            &compare(selector, ComparisonOperator::In, &[literal]),
            &dataset,
            true,
        );
        let (outside, _) = select(
            &compare(selector, ComparisonOperator::Out, &[literal]),
            &dataset,
            true,
        );
        prop_assert_eq!(outside, difference(&everyone, &members), "{}=out={:?}", selector, literal);
    }

    #[test]
    fn equality_matches_single_membership(
        dataset in arb_dataset(),
        selector in prop::sample::select(all_fields()),
        index in 0_usize..2,
    ) {
        let literal = literals(selector)[index];
        let (eq, _) = select(
            &compare(selector, ComparisonOperator::Eq, &[literal]),
            &dataset,
            true,
        );
        let (member, _) = select(
            &compare(selector, ComparisonOperator::In, &[literal]),
            &dataset,
            true,
        );
        let (ne, _) = select(
            &compare(selector, ComparisonOperator::Ne, &[literal]),
            &dataset,
            true,
        );
        let (out, _) = select(
            &compare(selector, ComparisonOperator::Out, &[literal]),
            &dataset,
            true,
        );

        prop_assert_eq!(eq, member);
        prop_assert_eq!(ne, out);
    }

    #[test]
    fn wildcards_anchor_where_the_asterisk_is_absent(
        stored in prop::collection::vec(prop::option::of("[ab*]{0,4}"), 0..6),
        needle in "[ab]{1,2}",
    ) {
        let dataset = stored
            .iter()
            .zip(1_i64..)
            .map(|(text, id)| {
                let entity = Entity::new().with_value("id", id);
                match text {
                    Some(text) => entity.with_value("strValue", text.as_str()),
                    None => entity,
                }
            })
            .collect::<Vec<_>>();
        let expected = |keep: &dyn Fn(&str) -> bool| -> Vec<i64> {
            stored
                .iter()
                .zip(1_i64..)
                .filter(|(text, _)| text.as_deref().is_some_and(keep))
                .map(|(_, id)| id)
                .collect()
        };

        let prefix = format!("{needle}*");
        let (starts, _) = select(
            &compare("strValue", ComparisonOperator::Eq, &[prefix.as_str()]),
            &dataset,
            false,
        );
        prop_assert_eq!(starts, expected(&|text| text.starts_with(needle.as_str())));

        let suffix = format!("*{needle}");
        let (ends, _) = select(
            &compare("strValue", ComparisonOperator::Eq, &[suffix.as_str()]),
            &dataset,
            false,
        );
        prop_assert_eq!(ends, expected(&|text| text.ends_with(needle.as_str())));

        let escaped = format!("{needle}\\*");
        let literal = format!("{needle}*");
        let (exact, _) = select(
            &compare("strValue", ComparisonOperator::Eq, &[escaped.as_str()]),
            &dataset,
            false,
        );
        prop_assert_eq!(exact, expected(&|text| text == literal));
    }
}
