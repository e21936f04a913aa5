//! Integration tests for type registration, resolution and validation.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use metagraph_types::builder::{
    batch, class_type, enum_type, optional_attr, required_attr, trait_type, unique_required_attr,
};
use metagraph_types::{
    Multiplicity, PrimitiveType, ResolvedType, SchemaDocument, TypeCategory, TypeDefinition,
    TypeError, TypeRegistry, TypeStore, ValidationError, Value,
};
use pretty_assertions::assert_eq;

fn table_batch() -> Vec<TypeDefinition> {
    batch([
        class_type(
            "Table",
            [] as [&str; 0],
            [
                required_attr("name", PrimitiveType::String).unwrap(),
                optional_attr("owner", PrimitiveType::String).unwrap(),
            ],
        )
        .unwrap(),
        class_type(
            "HiveTable",
            ["Table"],
            [optional_attr("database", PrimitiveType::String).unwrap()],
        )
        .unwrap(),
    ])
}

#[test]
fn test_hive_table_inherits_table_attributes() {
    let registry = TypeRegistry::new();
    registry.register_types(table_batch()).unwrap();

    let hive_table = registry.get_type("HiveTable").unwrap();
    let attributes: Vec<(&str, Multiplicity)> = hive_table
        .attributes()
        .values()
        .map(|a| (a.name(), a.multiplicity()))
        .collect();

    assert_eq!(
        attributes,
        vec![
            ("database", Multiplicity::OPTIONAL),
            ("name", Multiplicity::REQUIRED),
            ("owner", Multiplicity::OPTIONAL),
        ]
    );
    assert!(hive_table.is_subtype_of("Table"));
}

#[test]
fn test_failing_batch_is_atomic() {
    let registry = TypeRegistry::new();
    registry.register_types(table_batch()).unwrap();
    let version = registry.version();

    let bad = batch([
        class_type("View", ["Table"], [] as [_; 0]).unwrap(),
        class_type("Partition", ["Ghost"], [] as [_; 0]).unwrap(),
    ]);
    let err = registry.register_types(bad).unwrap_err();

    assert_eq!(
        err.errors,
        vec![TypeError::UnknownTypeReference {
            type_name: "Partition".into(),
            reference: "Ghost".into(),
        }]
    );
    assert_eq!(registry.version(), version);
    assert!(registry.get_type("View").is_none());
    assert!(registry.get_type("Partition").is_none());
}

#[test]
fn test_duplicate_type_keeps_first_registration() {
    let registry = TypeRegistry::new();
    registry.register_types(table_batch()).unwrap();
    let first = registry.get_type("Table").unwrap();

    let again = batch([class_type(
        "Table",
        [] as [&str; 0],
        [required_attr("id", PrimitiveType::Long).unwrap()],
    )
    .unwrap()]);
    let err = registry.register_types(again).unwrap_err();

    assert_eq!(
        err.errors,
        vec![TypeError::DuplicateType {
            name: "Table".into()
        }]
    );
    assert_eq!(registry.get_type("Table").unwrap(), first);
}

#[test]
fn test_diamond_inheritance() {
    let registry = TypeRegistry::new();
    let shared = || optional_attr("qualifiedName", PrimitiveType::String).unwrap();

    registry
        .register_types(batch([
            trait_type("Referenceable", [] as [&str; 0], [shared()]).unwrap(),
            trait_type("Owned", ["Referenceable"], [shared()]).unwrap(),
            trait_type("Classified", ["Referenceable"], [shared()]).unwrap(),
            trait_type("Governed", ["Classified", "Owned"], [] as [_; 0]).unwrap(),
        ]))
        .unwrap();

    let governed = registry.get_type("Governed").unwrap();
    assert_eq!(governed.attributes().len(), 1);
    assert_eq!(
        governed.ancestors().iter().collect::<Vec<_>>(),
        vec!["Classified", "Owned", "Referenceable"]
    );
}

#[test]
fn test_diamond_conflict() {
    let registry = TypeRegistry::new();

    let err = registry
        .register_types(batch([
            class_type("Base", [] as [&str; 0], [] as [_; 0]).unwrap(),
            class_type("Left", ["Base"], [optional_attr("x", "string").unwrap()]).unwrap(),
            class_type("Right", ["Base"], [optional_attr("x", "int").unwrap()]).unwrap(),
            class_type("Bottom", ["Left", "Right"], [] as [_; 0]).unwrap(),
        ]))
        .unwrap_err();

    assert_eq!(err.errors.len(), 1);
    match &err.errors[0] {
        TypeError::AttributeConflict {
            type_name,
            attribute,
            existing_from,
            conflicting_from,
            ..
        } => {
            assert_eq!(type_name, "Bottom");
            assert_eq!(attribute, "x");
            assert_eq!(existing_from, "Left");
            assert_eq!(conflicting_from, "Right");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(registry.type_names().is_empty());
}

#[test]
fn test_cycle_commits_nothing() {
    let registry = TypeRegistry::new();

    let err = registry
        .register_types(batch([
            class_type("Standalone", [] as [&str; 0], [] as [_; 0]).unwrap(),
            class_type("A", ["B"], [] as [_; 0]).unwrap(),
            class_type("B", ["A"], [] as [_; 0]).unwrap(),
        ]))
        .unwrap_err();

    assert_eq!(
        err.errors,
        vec![TypeError::CyclicInheritance {
            path: vec!["A".into(), "B".into(), "A".into()],
        }]
    );
    assert_eq!(registry.version(), 0);
    assert!(registry.get_type("Standalone").is_none());
}

#[test]
fn test_required_versus_optional_validation() {
    let registry = TypeRegistry::new();
    registry.register_types(table_batch()).unwrap();

    let missing_name = registry.validate_entity("Table", &HashMap::new());
    assert_eq!(
        missing_name,
        vec![ValidationError::MissingRequired {
            type_name: "Table".into(),
            attribute: "name".into(),
        }]
    );

    let values: HashMap<String, Value> = [("name".to_string(), Value::from("orders"))]
        .into_iter()
        .collect();
    assert!(registry.validate_entity("Table", &values).is_empty());
}

#[test]
fn test_duplicate_enum_value() {
    let err = enum_type("OrderStatus", &[("NEW", 0), ("NEW", 1)]).unwrap_err();

    assert_eq!(
        err,
        TypeError::DuplicateEnumValue {
            enum_name: "OrderStatus".into(),
            value: "NEW".into(),
            ordinal: 1,
        }
    );
}

#[test]
fn test_enum_and_trait_lookups() {
    let registry = TypeRegistry::new();
    registry
        .register_types(batch([
            TypeDefinition::from(enum_type("Status", &[("ACTIVE", 0), ("DELETED", 1)]).unwrap()),
            trait_type("PII", [] as [&str; 0], [] as [_; 0]).unwrap().into(),
        ]))
        .unwrap();

    let status = registry.get_enum("Status").unwrap();
    assert_eq!(status.value("DELETED").unwrap().ordinal, 1);
    assert!(status.value("PURGED").is_err());

    assert_eq!(registry.enum_names(), vec!["Status".to_string()]);
    assert_eq!(
        registry.type_names_by_category(TypeCategory::Trait),
        vec!["PII".to_string()]
    );
    assert!(registry.get_type("Status").is_none());
}

#[test]
fn test_resolved_document_roundtrip() {
    let registry = TypeRegistry::new();
    registry.register_types(table_batch()).unwrap();
    let resolved = registry.get_type("HiveTable").unwrap();

    let json = serde_json::to_string(&resolved.to_document()).unwrap();
    let parsed = ResolvedType::from_document(serde_json::from_str(&json).unwrap()).unwrap();

    assert_eq!(&parsed, resolved.as_ref());
    assert_eq!(parsed.attributes(), resolved.attributes());
    assert_eq!(parsed.ancestors(), resolved.ancestors());
}

#[test]
fn test_export_and_reload() {
    let registry = TypeRegistry::new();
    registry
        .register_types(batch([TypeDefinition::from(
            enum_type("Status", &[("ACTIVE", 0)]).unwrap(),
        )]))
        .unwrap();
    registry.register_types(table_batch()).unwrap();

    let json = registry.export().to_json_pretty().unwrap();
    let reloaded = TypeRegistry::new();
    reloaded
        .register_types(SchemaDocument::from_json(&json).unwrap().into_batch().unwrap())
        .unwrap();

    assert_eq!(reloaded.type_names(), registry.type_names());
    assert_eq!(
        reloaded.get_type("HiveTable").unwrap(),
        registry.get_type("HiveTable").unwrap()
    );
}

#[test]
fn test_concurrent_registration_of_same_name() {
    let registry = Arc::new(TypeRegistry::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let def = class_type(
                    "Dataset",
                    [] as [&str; 0],
                    [unique_required_attr(format!("key{i}"), PrimitiveType::String).unwrap()],
                )
                .unwrap();
                registry.register_types(batch([def])).is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(registry.version(), 1);
    assert_eq!(registry.get_type("Dataset").unwrap().attributes().len(), 1);
}

#[test]
fn test_restore_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled::Config::new().path(dir.path());

    let expected = {
        let db = config.clone().open().unwrap();
        let store = TypeStore::open(&db).unwrap();
        let registry = TypeRegistry::new();
        registry.register_and_persist(table_batch(), &store).unwrap();
        store.flush().unwrap();
        registry.get_type("HiveTable").unwrap()
    };

    let db = config.open().unwrap();
    let store = TypeStore::open(&db).unwrap();
    let restored = TypeRegistry::restore(&store).unwrap();

    assert_eq!(store.latest_version().unwrap(), 1);
    assert_eq!(restored.get_type("HiveTable").unwrap(), expected);
}
