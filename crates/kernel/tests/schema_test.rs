#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Query schema tests.
//!
//! Loads schema files from disk and renders filtered SELECTs through the
//! declared fields and builder map.

use std::path::PathBuf;
use std::sync::Arc;

use sea_query::{Expr, PostgresQueryBuilder};
use sift_kernel::attribute::TypedValidatorFactory;
use sift_kernel::condition::{
    Condition, ConditionBuilder, FilterSet, FilterValue, parse_query_string,
};
use sift_kernel::container::ServiceMap;
use sift_kernel::error::{QueryError, QueryResult};
use sift_kernel::field::{Field, QuerySchema};
use sift_test_utils::TEST_SCHEMA;
use sift_test_utils::assert::{sql_contains, sql_not_contains};

/// Matches `near=<anything>` against geo fields.
struct Near;

impl ConditionBuilder for Near {
    fn build(&self, field: &dyn Field, _key: &str, value: FilterValue) -> QueryResult<Condition> {
        let expr = format!("{} <-> $1 < 1000", field.sql_expression().unwrap_or_default());
        Ok(Condition::Custom(Expr::cust_with_values(
            expr,
            [value.as_string().unwrap_or_default()],
        )))
    }

    fn can_apply(&self, _field: &dyn Field, key: &str, _value: &FilterValue) -> Option<bool> {
        Some(key == "near")
    }
}

fn write_schema(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sift-schema-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn filter_set(schema: &QuerySchema) -> FilterSet {
    let builders = ServiceMap::<dyn ConditionBuilder>::new().with("geo_radius", || Arc::new(Near));
    schema
        .filter_set(Arc::new(TypedValidatorFactory), Arc::new(builders))
        .unwrap()
}

#[test]
fn test_yaml_schema_from_file() {
    let path = write_schema("schema.yaml", TEST_SCHEMA);
    let schema = QuerySchema::from_path(&path).unwrap();
    assert_eq!(schema.base_table, "item");
    assert_eq!(schema.fields.len(), 5);

    let set = filter_set(&schema);
    let params = parse_query_string("owner=ada&near=POINT(1 2)&tags[]=a&tags[]=b").unwrap();
    let sql = set
        .select(&schema.base_table, &params)
        .unwrap()
        .to_string(PostgresQueryBuilder);

    sql_contains(&sql, "item.owner = 'ada'");
    sql_contains(&sql, "item.location <-> 'POINT(1 2)' < 1000");
    sql_contains(&sql, "item.fields->>'tags' IN ('a', 'b')");
    sql_contains(&sql, "item.location AS \"location\"");
    sql_not_contains(&sql, "item.created AS");
}

#[test]
fn test_json_schema_from_file() {
    let path = write_schema(
        "schema.json",
        r#"{
            "base_table": "node",
            "fields": [
                {"name": "nid", "expression": "node.nid", "attribute": {"kind": "integer"}},
                {"name": "promoted", "expression": "node.promote", "attribute": {"kind": "boolean"}}
            ]
        }"#,
    );
    let schema = QuerySchema::from_path(&path).unwrap();
    let set = filter_set(&schema);
    let params = parse_query_string("nid_gt=5&promoted=true").unwrap();
    let sql = set
        .select(&schema.base_table, &params)
        .unwrap()
        .to_string(PostgresQueryBuilder);

    sql_contains(&sql, "FROM \"node\"");
    sql_contains(&sql, "node.nid > 5");
    sql_contains(&sql, "node.promote = TRUE");
}

#[test]
fn test_invalid_schema_files_are_rejected() {
    let path = write_schema("broken.yaml", "fields: [ { name: x, expression: ");
    assert!(QuerySchema::from_path(&path).is_err());

    let missing = std::env::temp_dir().join("sift-schema-test-does-not-exist.yaml");
    let err = QuerySchema::from_path(&missing).unwrap_err();
    assert!(err.to_string().contains("failed to read schema"));
}

#[test]
fn test_unsafe_jsonb_path_is_rejected() {
    let schema = QuerySchema::from_yaml_str(
        r"
fields:
  - name: bad
    jsonb: { column: item.fields, path: 'a; DROP TABLE item' }
",
    )
    .unwrap();
    assert!(schema.build_fields(Arc::new(TypedValidatorFactory)).is_err());
}

#[test]
fn test_unmatched_keys_skip_past_builder_fields() {
    let schema = QuerySchema::from_yaml_str(TEST_SCHEMA).unwrap();
    let set = filter_set(&schema);
    let params = parse_query_string("owner=ada&page=2").unwrap();
    let sql = set
        .select(&schema.base_table, &params)
        .unwrap()
        .to_string(PostgresQueryBuilder);

    sql_contains(&sql, "item.owner = 'ada'");
    sql_not_contains(&sql, "page");
}

#[test]
fn test_unregistered_builder_is_rejected_when_wiring() {
    let schema = QuerySchema::from_yaml_str(TEST_SCHEMA).unwrap();
    let err = schema
        .filter_set(
            Arc::new(TypedValidatorFactory),
            Arc::new(ServiceMap::<dyn ConditionBuilder>::new()),
        )
        .err()
        .unwrap();

    assert!(err.to_string().contains("'geo_radius'"), "{err}");
    assert!(matches!(
        err.downcast_ref::<QueryError>(),
        Some(QueryError::UnknownBuilder { .. })
    ));
}
