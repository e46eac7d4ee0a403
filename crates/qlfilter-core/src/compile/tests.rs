use super::*;
use crate::{error::ErrorKind, parse::parse, test_fixtures::registry};

fn compiled_with(filter: &str, options: CompileOptions) -> CompiledFilter {
    let registry = registry();
    let node = parse(filter).expect("parse");

    compile(&registry, "root", &node, options).expect("compile")
}

fn compiled(filter: &str) -> CompiledFilter {
    compiled_with(filter, CompileOptions::default())
}

fn predicate(filter: &str) -> String {
    compiled(filter).predicate.to_string()
}

fn error_kind(filter: &str) -> ErrorKind {
    let registry = registry();
    let node = parse(filter).expect("parse");

    compile(&registry, "root", &node, CompileOptions::default())
        .expect_err("compile should fail")
        .kind()
}

//
// simple paths
//

#[test]
fn equality_folds_text_by_default() {
    let filter = compiled("strValue==rootx");

    assert_eq!(
        filter.to_string(),
        "root [Root] WHERE UPPER(root.strValue) = UPPER('rootx')"
    );
    assert!(filter.scope.joins.is_empty());
    assert_eq!(filter.identifier, "id");
}

#[test]
fn ignore_case_off_compares_verbatim() {
    let filter = compiled_with("strValue==rootx", CompileOptions { ignore_case: false });

    assert_eq!(filter.predicate.to_string(), "root.strValue = 'rootx'");
}

#[test]
fn inequality_admits_nulls() {
    assert_eq!(
        predicate("strValue!=rootx"),
        "(root.strValue IS NULL OR UPPER(root.strValue) <> UPPER('rootx'))"
    );
}

#[test]
fn empty_literal_pairs_with_null() {
    assert_eq!(
        predicate("strValue==''"),
        "(root.strValue IS NULL OR UPPER(root.strValue) = UPPER(''))"
    );
    assert_eq!(
        predicate("strValue!=''"),
        "(root.strValue IS NOT NULL AND UPPER(root.strValue) <> UPPER(''))"
    );
}

#[test]
fn null_checks_and_the_null_text() {
    assert_eq!(predicate("strValue=is=null"), "root.strValue IS NULL");
    assert_eq!(predicate("strValue=not=NULL"), "root.strValue IS NOT NULL");
    assert_eq!(
        predicate("strValue==null"),
        "UPPER(root.strValue) = UPPER('null')"
    );
}

#[test]
fn wildcards_become_like() {
    assert_eq!(
        predicate("strValue==root*"),
        "UPPER(root.strValue) LIKE UPPER('root*')"
    );
    assert_eq!(
        predicate("strValue!=*tx"),
        "(root.strValue IS NULL OR NOT (UPPER(root.strValue) LIKE UPPER('*tx')))"
    );
}

#[test]
fn escaped_wildcard_stays_an_equality() {
    let filter = compiled(r"strValue==a\*b");

    let Predicate::Compare(compare) = &filter.predicate else {
        panic!("expected a comparison, got {}", filter.predicate);
    };
    assert_eq!(compare.op, CompareOp::Eq);
    assert_eq!(compare.values, vec![Value::text("a*b")]);

    assert_eq!(
        predicate(r"strValue=in=(a\*b,c\d)"),
        r"UPPER(root.strValue) IN (UPPER('a*b'), UPPER('c\d'))"
    );
}

#[test]
fn membership_handles_empty_literals() {
    assert_eq!(
        predicate("strValue=in=(a,b)"),
        "UPPER(root.strValue) IN (UPPER('a'), UPPER('b'))"
    );
    assert_eq!(
        predicate("strValue=in=(a,'')"),
        "(root.strValue IS NULL OR UPPER(root.strValue) IN (UPPER('a'), UPPER('')))"
    );
    assert_eq!(
        predicate("strValue=out=(a)"),
        "(root.strValue IS NULL OR NOT (UPPER(root.strValue) IN (UPPER('a'))))"
    );
    assert_eq!(
        predicate("strValue=out=(a,'')"),
        "(root.strValue IS NOT NULL AND NOT (UPPER(root.strValue) IN (UPPER('a'), UPPER(''))))"
    );
}

#[test]
fn typed_values_are_never_folded() {
    assert_eq!(predicate("status==active"), "root.status = ACTIVE");
    assert_eq!(predicate("enabled==true"), "root.enabled = true");
    assert_eq!(predicate("intValue>=5"), "root.intValue >= '5'");
}

//
// relationships
//

#[test]
fn to_one_joins_are_shared_across_conjuncts() {
    let filter = compiled("subEntity.strValue==a;subEntity.intValue==1");

    assert_eq!(filter.scope.joins.len(), 1);
    assert_eq!(filter.scope.joins[0].cardinality, Cardinality::One);
    assert_eq!(filter.scope.joins[0].mode, JoinMode::Left);
}

#[test]
fn nested_to_one_chain_binds_each_hop() {
    let filter = compiled("subEntity.subType.key==T1");

    assert_eq!(
        filter.scope.to_string(),
        "left join root.subEntity j1 (One), left join j1.subType j2 (One)"
    );
    assert_eq!(filter.predicate.to_string(), "UPPER(j2.key) = UPPER('T1')");
}

#[test]
fn conjunction_binds_collections_independently() {
    let filter = compiled("subSet.strValue==a;subSet.intValue==1");
    let ids: Vec<_> = filter.scope.joins.iter().map(|join| join.id).collect();

    assert_eq!(ids, vec![JoinId(1), JoinId(2)]);
    assert_eq!(
        filter.predicate.to_string(),
        "(UPPER(j1.strValue) = UPPER('a') AND j2.intValue = '1')"
    );
}

#[test]
fn disjunction_shares_collection_joins() {
    let filter = compiled("subSet.strValue==a,subSet.intValue==1");

    assert_eq!(filter.scope.joins.len(), 1);
    assert_eq!(
        filter.predicate.to_string(),
        "(UPPER(j1.strValue) = UPPER('a') OR j1.intValue = '1')"
    );
}

#[test]
fn disjunction_context_does_not_leak_to_siblings() {
    let filter =
        compiled("subSet.strValue==a;(subSet.intValue==1,subSet.intValue==2);subSet.strValue==b");

    assert_eq!(filter.scope.joins.len(), 3);
    assert_eq!(
        filter.predicate.to_string(),
        "(UPPER(j1.strValue) = UPPER('a') AND (j2.intValue = '1' OR j2.intValue = '2') \
         AND UPPER(j3.strValue) = UPPER('b'))"
    );
}

#[test]
fn conjunction_inside_disjunction_reuses_the_shared_join() {
    let filter = compiled("(subSet.strValue==a;subSet.intValue==1),strValue==z");

    assert_eq!(filter.scope.joins.len(), 1);
}

#[test]
fn negated_relationship_operators_become_subqueries() {
    let filter = compiled("subSet.strValue!=a");

    assert!(filter.scope.joins.is_empty());
    assert_eq!(
        filter.predicate.to_string(),
        "NOT EXISTS (on id inner join root.subSet j1 (Many) WHERE UPPER(j1.strValue) = UPPER('a'))"
    );

    assert_eq!(
        predicate("subSet.strValue=out=(a,b)"),
        "NOT EXISTS (on id inner join root.subSet j1 (Many) \
         WHERE UPPER(j1.strValue) IN (UPPER('a'), UPPER('b')))"
    );
    assert_eq!(
        predicate("subEntity.strValue=is=null"),
        "NOT EXISTS (on id inner join root.subEntity j1 (One) WHERE j1.strValue IS NOT NULL)"
    );
}

#[test]
fn negated_empty_literal_over_relationship_needs_an_element() {
    assert_eq!(
        predicate("subSet.strValue!=''"),
        "(EXISTS (on id inner join root.subSet j1 (Many) WHERE TRUE) \
         AND NOT EXISTS (on id inner join root.subSet j2 (Many) \
         WHERE (j2.strValue IS NULL OR UPPER(j2.strValue) = UPPER(''))))"
    );
    assert_eq!(
        predicate("subEntity.strValue=out=(a,'')"),
        "(EXISTS (on id inner join root.subEntity j1 (One) WHERE TRUE) \
         AND NOT EXISTS (on id inner join root.subEntity j2 (One) \
         WHERE (j2.strValue IS NULL OR UPPER(j2.strValue) IN (UPPER('a'), UPPER('')))))"
    );
}

#[test]
fn positive_relationship_null_check_left_joins() {
    let filter = compiled("subSet.strValue=not=null");

    assert_eq!(filter.scope.joins.len(), 1);
    assert_eq!(filter.predicate.to_string(), "j1.strValue IS NOT NULL");
}

#[test]
fn subquery_join_ids_never_collide_with_root_joins() {
    let filter = compiled("subSet.strValue==a;subSet.strValue!=b");

    let Predicate::And(children) = &filter.predicate else {
        panic!("expected a conjunction, got {}", filter.predicate);
    };
    let Predicate::NotExists(subquery) = &children[1] else {
        panic!("expected a subquery, got {}", children[1]);
    };
    assert_eq!(filter.scope.joins[0].id, JoinId(1));
    assert_eq!(subquery.scope.joins[0].id, JoinId(2));
    assert_eq!(subquery.scope.joins[0].mode, JoinMode::Inner);
    assert_eq!(filter.predicate.subquery_count(), 1);
}

#[test]
fn default_sub_attributes_resolve_before_compiling() {
    assert_eq!(predicate("tag==blue"), "UPPER(j1.name) = UPPER('blue')");
    assert_eq!(predicate("type==alpha"), "UPPER(j1.key) = UPPER('alpha')");
}

//
// maps
//

#[test]
fn native_map_matches_key_and_value() {
    let filter = compiled("subMap.x==rootx");

    assert_eq!(filter.scope.joins[0].cardinality, Cardinality::Map);
    assert_eq!(
        filter.predicate.to_string(),
        "(UPPER(key(j1)) = UPPER('x') AND UPPER(value(j1)) = UPPER('rootx'))"
    );
}

#[test]
fn map_null_checks_test_key_presence() {
    assert_eq!(
        predicate("subMap.x=is=null"),
        "NOT EXISTS (on id inner join root.subMap j1 (Map) WHERE UPPER(key(j1)) = UPPER('x'))"
    );
    assert_eq!(
        predicate("subMap.x=not=null"),
        "EXISTS (on id inner join root.subMap j1 (Map) WHERE UPPER(key(j1)) = UPPER('x'))"
    );
}

#[test]
fn map_inequality_requires_the_key() {
    assert_eq!(
        predicate("subMap.x!=rootx"),
        "(UPPER(key(j1)) = UPPER('x') AND (value(j1) IS NULL OR UPPER(value(j1)) <> UPPER('rootx')))"
    );
}

#[test]
fn entry_maps_read_key_and_value_attributes() {
    let filter = compiled("meta.env==prod");

    assert_eq!(
        filter.scope.to_string(),
        "left join root.metadata j1 (Many)"
    );
    assert_eq!(
        filter.predicate.to_string(),
        "(UPPER(j1.key) = UPPER('env') AND UPPER(j1.value) = UPPER('prod'))"
    );
}

#[test]
fn map_keys_are_kept_verbatim() {
    let filter = compiled_with("subMap.Some.Key==v", CompileOptions { ignore_case: false });

    assert_eq!(
        filter.predicate.to_string(),
        "(key(j1) = 'Some.Key' AND value(j1) = 'v')"
    );
}

//
// errors
//

#[test]
fn unsupported_selectors_are_reported() {
    assert_eq!(error_kind("nope==a"), ErrorKind::UnsupportedField);
    assert_eq!(error_kind("subSet.nope==a"), ErrorKind::UnsupportedField);
    assert_eq!(error_kind("subMap==a"), ErrorKind::UnsupportedField);
}

#[test]
fn malformed_comparisons_are_syntax_errors() {
    assert_eq!(error_kind("strValue==(a,b)"), ErrorKind::Syntax);
    assert_eq!(error_kind("strValue=is=x"), ErrorKind::Syntax);
    assert_eq!(error_kind("enabled>true"), ErrorKind::Syntax);
}

#[test]
fn uncoercible_literals_are_value_errors() {
    assert_eq!(error_kind("status==gone"), ErrorKind::ValueCoercion);
    assert_eq!(error_kind("enabled==yes"), ErrorKind::ValueCoercion);
}

#[test]
fn unknown_entity_kind_is_unsupported() {
    let registry = registry();
    let node = parse("strValue==a").expect("parse");
    let err = compile(&registry, "ghost", &node, CompileOptions::default()).expect_err("kind");

    assert_eq!(err.kind(), ErrorKind::UnsupportedField);
}

#[test]
fn sub_kind_compiles_against_its_own_model() {
    let registry = registry();
    let node = parse("type.name==One").expect("parse");
    let filter = compile(&registry, "SUB", &node, CompileOptions::default()).expect("compile");

    assert_eq!(filter.entity_kind, "sub");
    assert_eq!(filter.model, "Sub");
    assert_eq!(filter.scope.to_string(), "left join root.subType j1 (One)");
}
