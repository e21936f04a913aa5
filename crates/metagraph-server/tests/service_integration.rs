//! Integration tests for the type service lifecycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use metagraph_server::lineage::HIVE_LINEAGE;
use metagraph_server::{Error, LineageRecord, ServerConfig, TypeService};
use metagraph_types::{TypeCategory, TypeError, ValidationError, Value};
use pretty_assertions::assert_eq;

const HIVE_MODEL: &str = r#"{
    "enums": [
        {"name": "HivePrincipalType", "values": [
            {"name": "USER", "ordinal": 1},
            {"name": "ROLE", "ordinal": 2},
            {"name": "GROUP", "ordinal": 3}
        ]}
    ],
    "types": [
        {
            "name": "HiveTable",
            "category": "class",
            "superTypes": ["DataSet"],
            "attributeDefinitions": [
                {"name": "db", "dataTypeName": "HiveDB",
                 "multiplicity": {"lower": 1, "upper": 1}},
                {"name": "ownerType", "dataTypeName": "HivePrincipalType",
                 "multiplicity": {"lower": 0, "upper": 1}}
            ]
        },
        {
            "name": "DataSet",
            "category": "class",
            "attributeDefinitions": [
                {"name": "name", "dataTypeName": "string",
                 "multiplicity": {"lower": 1, "upper": 1},
                 "isUnique": true, "isIndexed": true}
            ]
        },
        {
            "name": "HiveDB",
            "category": "class",
            "superTypes": ["DataSet"]
        },
        {"name": "PII", "category": "trait"}
    ]
}"#;

fn write_model(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_bootstrap_and_restart() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "hive.json", HIVE_MODEL);
    let config = ServerConfig::new(dir.path().join("data"))
        .with_bootstrap_file(&model)
        .without_lineage_types();

    let first_version = {
        let service = TypeService::start(&config).unwrap();
        let registry = service.registry();

        assert_eq!(
            registry.type_names(),
            vec!["DataSet", "HiveDB", "HiveTable", "PII"]
        );
        assert_eq!(
            registry.type_names_by_category(TypeCategory::Trait),
            vec!["PII"]
        );
        assert_eq!(registry.subtypes_of("DataSet"), vec!["HiveDB", "HiveTable"]);
        registry.version()
    };

    // Restart: batches replay, the bootstrap file adds nothing new.
    let service = TypeService::start(&config).unwrap();
    let registry = service.registry();
    assert_eq!(registry.version(), first_version);

    let table = registry.get_type("HiveTable").unwrap();
    let names: Vec<_> = table.attributes().keys().cloned().collect();
    assert_eq!(names, vec!["db", "name", "ownerType"]);
}

#[test]
fn test_validate_against_bootstrapped_types() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path(), "hive.json", HIVE_MODEL);
    let config = ServerConfig::new(dir.path().join("data"))
        .with_bootstrap_file(model)
        .without_lineage_types();
    let service = TypeService::start(&config).unwrap();
    let registry = service.registry();

    let values: HashMap<String, Value> = [
        ("name".to_string(), Value::from("sales")),
        ("db".to_string(), Value::Reference("db-1".into())),
        ("ownerType".to_string(), Value::from("TEAM")),
    ]
    .into_iter()
    .collect();

    assert_eq!(
        registry.validate_entity("HiveTable", &values),
        vec![ValidationError::TypeMismatch {
            type_name: "HiveTable".into(),
            attribute: "ownerType".into(),
            expected: "HivePrincipalType".into(),
            found: "string".into(),
        }]
    );
}

#[test]
fn test_bad_bootstrap_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(
        dir.path(),
        "broken.json",
        r#"{"types": [
            {"name": "A", "category": "class", "superTypes": ["B"]},
            {"name": "B", "category": "class", "superTypes": ["A"]}
        ]}"#,
    );
    let config = ServerConfig::new(dir.path().join("data"))
        .with_bootstrap_file(&model)
        .without_lineage_types();

    let Err(Error::Bootstrap { path, source }) = TypeService::start(&config) else {
        panic!("expected bootstrap error");
    };
    assert_eq!(path, model);
    let metagraph_types::Error::Registration(registration) = source else {
        panic!("expected registration error");
    };
    assert!(registration
        .iter()
        .any(|e| matches!(e, TypeError::CyclicInheritance { .. })));

    // Nothing was committed.
    let service = TypeService::open(&dir.path().join("data")).unwrap();
    assert_eq!(service.registry().version(), 0);
}

#[test]
fn test_restart_with_changed_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(
        dir.path(),
        "tables.json",
        r#"{"types": [{"name": "Table", "category": "class", "attributeDefinitions": [
            {"name": "name", "dataTypeName": "string", "multiplicity": {"lower": 1, "upper": 1}}
        ]}]}"#,
    );
    let config = ServerConfig::new(dir.path().join("data"))
        .with_bootstrap_file(&model)
        .without_lineage_types();
    let first_version = TypeService::start(&config).unwrap().registry().version();

    write_model(
        dir.path(),
        "tables.json",
        r#"{"types": [{"name": "Table", "category": "class", "attributeDefinitions": [
            {"name": "id", "dataTypeName": "long", "multiplicity": {"lower": 1, "upper": 1}}
        ]}]}"#,
    );
    let Err(Error::Bootstrap { path, source }) = TypeService::start(&config) else {
        panic!("expected bootstrap error");
    };
    assert_eq!(path, model);
    let metagraph_types::Error::Registration(registration) = source else {
        panic!("expected registration error");
    };
    assert_eq!(
        registration.errors,
        vec![TypeError::DuplicateType {
            name: "Table".into()
        }]
    );

    // The committed definition is untouched.
    let service = TypeService::open(&dir.path().join("data")).unwrap();
    let registry = service.registry();
    assert_eq!(registry.version(), first_version);
    let table = registry.get_type("Table").unwrap();
    let names: Vec<_> = table.attributes().keys().cloned().collect();
    assert_eq!(names, vec!["name"]);
}

#[test]
fn test_lineage_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let service = TypeService::start(&ServerConfig::new(dir.path())).unwrap();
    let ingestor = service.lineage_ingestor();

    assert!(service.registry().get_type(HIVE_LINEAGE).is_some());

    let record = LineageRecord {
        user: Some("analyst".into()),
        table_name: Some("daily_sales".into()),
        ..LineageRecord::new("hive_20240101_0001")
    };
    let values = ingestor.ingest(&record).unwrap();
    assert_eq!(values["user"], Value::from("analyst"));

    let err = ingestor
        .ingest_json(r#"{"queryId": "q", "cluster": "prod"}"#)
        .unwrap_err();
    let Error::Validation { errors, .. } = err else {
        panic!("expected validation error");
    };
    assert_eq!(
        errors,
        vec![ValidationError::UnknownAttribute {
            type_name: HIVE_LINEAGE.into(),
            attribute: "cluster".into(),
        }]
    );
    assert_eq!((ingestor.accepted(), ingestor.rejected()), (1, 1));
}
