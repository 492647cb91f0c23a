#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const SCHEMA: &str = r#"{
    "records": [
        {"name": "Person", "fields": [
            {"name": "Name", "type": "string"},
            {"name": "Age", "type": "int"},
            {"name": "Animal", "type": "string?"}
        ]}
    ]
}"#;

const DATA: &str = r#"[
    {"Name": "John", "Age": 21, "Animal": "Lion"},
    {"Name": "Jane", "Age": 34, "Animal": "Zebra"},
    {"Name": "Mark", "Age": 10, "Animal": null}
]"#;

struct Fixture {
    dir: TempDir,
    schema: PathBuf,
    data: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let schema = dir.path().join("schema.json");
        let data = dir.path().join("people.json");
        fs::write(&schema, SCHEMA).expect("write schema");
        fs::write(&data, DATA).expect("write data");
        Self { dir, schema, data }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write fixture file");
        path
    }

    fn input_args(&self) -> Vec<String> {
        vec![
            "--schema".into(),
            path_arg(&self.schema),
            "--root".into(),
            "Person".into(),
            "--data".into(),
            path_arg(&self.data),
        ]
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn names(json: &Value) -> Vec<String> {
    json["rows"]
        .as_array()
        .expect("rows array")
        .iter()
        .map(|row| row["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn filter_emits_matching_rows_as_json() {
    let fixture = Fixture::new();
    let filters = fixture.write(
        "filters.json",
        r#"[{"property": "Age", "operator": "GreaterThan", "value": "18"}]"#,
    );
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .args(["--format", "json", "filter"])
        .args(fixture.input_args())
        .arg("--filters")
        .arg(&filters)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(names(&json), ["John", "Jane"]);
    assert!(json.get("expression").is_none());
}

#[test]
fn text_filter_with_explain_prints_expression() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .args(["--explain", "text-filter"])
        .args(fixture.input_args())
        .args(["--property", "Name", "--text", "Ja% or %rk"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some(r#"expression: x => (x.Name.starts_with("Ja") || x.Name.ends_with("rk"))"#)
    );
    assert!(text.contains("Name = Jane"));
    assert!(text.contains("Name = Mark"));
    assert!(!text.contains("Name = John"));
    assert!(text.trim_end().ends_with("(2 rows)"));
}

#[test]
fn project_builds_shape_rows() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .args(["--format", "json", "--explain", "project"])
        .args(fixture.input_args())
        .args(["--map", "Who=Name", "--map", "Pet=Animal"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    let rows = json["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], serde_json::json!({"Who": "John", "Pet": "Lion"}));
    assert_eq!(rows[2], serde_json::json!({"Who": "Mark", "Pet": null}));
    let expression = json["expression"].as_str().expect("expression");
    assert!(expression.starts_with("x => new shape#"));
    assert!(expression.ends_with("(x.Name, x.Animal)"));
}

#[test]
fn config_file_changes_root_parameter() {
    let fixture = Fixture::new();
    let config = fixture.write("qproj.toml", "[filter]\nroot_parameter = \"person\"\n");
    let output = cargo_bin_cmd!("qproj")
        .args(["--explain", "--config"])
        .arg(&config)
        .arg("text-filter")
        .args(fixture.input_args())
        .args(["--property", "Name", "--text", "John"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.starts_with(r#"expression: person => person.Name.equals("John")"#));
}

#[test]
fn unknown_operator_fails_with_error_code() {
    let fixture = Fixture::new();
    let filters = fixture.write(
        "filters.json",
        r#"[{"property": "Age", "operator": "Between", "value": "1"}]"#,
    );
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .arg("filter")
        .args(fixture.input_args())
        .arg("--filters")
        .arg(&filters)
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("error: [UnsupportedOperator]"), "{stderr}");
}

#[test]
fn unknown_property_reports_path_resolution() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .arg("project")
        .args(fixture.input_args())
        .args(["--map", "X=Height"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("[PathResolution]"), "{stderr}");
}

#[test]
fn malformed_mapping_argument_is_rejected() {
    let fixture = Fixture::new();
    let output = cargo_bin_cmd!("qproj")
        .env_remove("QPROJ_CONFIG")
        .arg("project")
        .args(fixture.input_args())
        .args(["--map", "NoEquals"])
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("must look like TO=FROM"), "{stderr}");
}
