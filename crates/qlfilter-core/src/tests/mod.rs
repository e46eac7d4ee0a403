//! End-to-end checks across the parser, the compiler, both in-memory
//! evaluators and the JPQL renderer.

mod property;

use crate::{
    ast::FilterNode,
    backend::memory::{MemoryBackend, MemoryOptions},
    compile::{CompileOptions, compile},
    entity::Entity,
    matcher::EntityMatcher,
    parse::parse,
    schema::SchemaRegistry,
    test_fixtures::ids,
};

/// Selected ids through compile + memory backend.
pub(crate) fn memory_ids(
    registry: &SchemaRegistry,
    node: &FilterNode,
    dataset: &[Entity],
    ignore_case: bool,
) -> Vec<i64> {
    let compiled =
        compile(registry, "root", node, CompileOptions { ignore_case }).expect("compile");
    let query = MemoryBackend::prepare(&compiled, MemoryOptions::default()).expect("lower");

    ids(&query.filter(dataset).expect("memory filter"))
}

/// Selected ids through the direct AST matcher.
pub(crate) fn matcher_ids(
    registry: &SchemaRegistry,
    node: &FilterNode,
    dataset: &[Entity],
    ignore_case: bool,
) -> Vec<i64> {
    let matcher = EntityMatcher::new(registry, "root", ignore_case);

    ids(&matcher.filter(node, dataset).expect("matcher filter"))
}

/// Parse `filter` and run it through both evaluators, asserting they agree.
pub(crate) fn select(registry: &SchemaRegistry, filter: &str, dataset: &[Entity]) -> Vec<i64> {
    let node = parse(filter).expect("parse");
    let compiled = memory_ids(registry, &node, dataset, true);
    let direct = matcher_ids(registry, &node, dataset, true);
    assert_eq!(compiled, direct, "evaluators disagree on {filter}");

    compiled
}
