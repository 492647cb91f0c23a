#![allow(missing_docs)]

use qproj::{
    CompilerOptions, FilterCompiler, FilterDescriptor, FilterOperator, Mapping, MemoryQuery,
    ProjectionCompiler, Schema, ShapeCache, TypeRef, Value,
};

const SCHEMA: &str = r#"{
    "records": [
        {"name": "Order", "fields": [
            {"name": "Number", "type": "int"},
            {"name": "Customer", "type": "Customer?"},
            {"name": "Status", "type": "Status"},
            {"name": "Placed", "type": "date"},
            {"name": "Note", "type": "string"}
        ]},
        {"name": "Customer", "fields": [
            {"name": "Name", "type": "string"},
            {"name": "Tier", "type": "int?"}
        ]}
    ],
    "enums": [
        {"name": "Status", "constants": [
            {"name": "Open", "value": 1},
            {"name": "Shipped", "value": 2},
            {"name": "Cancelled", "value": 3}
        ]}
    ]
}"#;

const ROWS: &str = r#"[
    {"Number": 1, "Customer": {"Name": "Ada", "Tier": 2}, "Status": "Open",
     "Placed": "2024-01-05", "Note": "gift"},
    {"Number": 2, "Customer": null, "Status": "Shipped",
     "Placed": "2024-02-10", "Note": ""},
    {"Number": 3, "Customer": {"Name": "Grace", "Tier": null}, "Status": 3,
     "Placed": "2024-03-15", "Note": "rush"},
    {"Number": 4, "Customer": {"Name": "Alan", "Tier": 1}, "Status": "Shipped",
     "Placed": "2024-04-20"}
]"#;

fn load() -> (Schema, TypeRef, Vec<Value>) {
    let schema = Schema::from_json_str(SCHEMA).expect("schema parses");
    schema.validate().expect("schema validates");
    let root = TypeRef::parse("Order", &schema).expect("root type");
    let json: serde_json::Value = serde_json::from_str(ROWS).expect("rows parse");
    let rows = json
        .as_array()
        .expect("array")
        .iter()
        .map(|item| Value::from_json(item, &root, &schema).expect("row converts"))
        .collect();
    (schema, root, rows)
}

fn numbers(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .map(|row| match row {
            Value::Shape(instance) => instance.get("Number").map(Value::to_text).unwrap_or_default(),
            Value::Record(record) => record.get("Number").map(Value::to_text).unwrap_or_default(),
            other => other.to_text(),
        })
        .collect()
}

#[test]
fn filter_then_project_over_json_rows() {
    let (schema, root, rows) = load();
    let cache = ShapeCache::new();
    let descriptors = FilterDescriptor::list_from_json(
        r#"[{"property": "Status", "operator": "In", "value": "Open,Shipped"},
            {"property": "Placed", "operator": "GreaterThanOrEqual", "value": "2024-02-01"},
            {"property": "Note", "operator": "None", "value": "ignored"}]"#,
    )
    .expect("descriptors parse");
    let predicate = FilterCompiler::new(&schema)
        .compile(&root, &descriptors)
        .expect("filter compiles");
    let projection = ProjectionCompiler::new(&schema)
        .with_cache(&cache)
        .compile(
            &root,
            &[
                Mapping::direct("Number", "Number"),
                Mapping::direct("Who", "Customer.Name"),
            ],
        )
        .expect("projection compiles");

    let query = MemoryQuery::new(rows).filter(predicate).project(&projection);
    let result = query.to_vec().expect("query runs");
    assert_eq!(numbers(&result), ["2", "4"]);

    let Value::Shape(first) = &result[0] else {
        panic!("expected shape instance, got {:?}", result[0]);
    };
    assert_eq!(first.get("Who"), Some(&Value::Null));
    assert_eq!(
        result[1].to_json(),
        serde_json::json!({"Number": 4, "Who": "Alan"})
    );
}

#[test]
fn is_empty_matches_null_and_blank_text() {
    let (schema, root, rows) = load();
    let predicate = FilterCompiler::new(&schema)
        .compile(
            &root,
            &[FilterDescriptor::new("Note", FilterOperator::IsEmpty, None)],
        )
        .expect("compiles");
    let result = MemoryQuery::new(rows).filter(predicate).to_vec().unwrap();
    assert_eq!(numbers(&result), ["2", "4"]);
}

#[test]
fn nullable_nested_comparison_skips_missing_values() {
    let (schema, root, rows) = load();
    let predicate = FilterCompiler::new(&schema)
        .compile(
            &root,
            &[FilterDescriptor::new(
                "Customer.Tier",
                FilterOperator::LessThanOrEqual,
                Some("2"),
            )],
        )
        .expect("compiles");
    let result = MemoryQuery::new(rows).filter(predicate).to_vec().unwrap();
    assert_eq!(numbers(&result), ["1", "4"]);
}

#[test]
fn text_filter_on_nested_property() {
    let (schema, root, rows) = load();
    let predicate = FilterCompiler::new(&schema)
        .text_filter(&root, "Customer.Name", "A% or Grace")
        .expect("compiles");
    let result = MemoryQuery::new(rows).filter(predicate).to_vec().unwrap();
    assert_eq!(numbers(&result), ["1", "3", "4"]);
}

#[test]
fn configured_separator_applies_to_in() {
    let (schema, root, rows) = load();
    let options = CompilerOptions::from_toml_str("[filter]\nin_separator = \";\"\n")
        .expect("options parse");
    let predicate = FilterCompiler::new(&schema)
        .with_options(&options)
        .compile(
            &root,
            &[FilterDescriptor::new("Number", FilterOperator::In, Some("1;3"))],
        )
        .expect("compiles");
    let result = MemoryQuery::new(rows).filter(predicate).to_vec().unwrap();
    assert_eq!(numbers(&result), ["1", "3"]);
}

#[test]
fn repeated_compilation_reuses_the_shape() {
    let (schema, root, _) = load();
    let cache = ShapeCache::new();
    let compiler = ProjectionCompiler::new(&schema).with_cache(&cache);
    let mappings = [Mapping::direct("Number", "Number")];
    let first = compiler.compile(&root, &mappings).unwrap();
    let second = compiler.compile(&root, &mappings).unwrap();
    assert!(std::sync::Arc::ptr_eq(first.shape(), second.shape()));
    assert_eq!(cache.stats().hits, 1);
}
