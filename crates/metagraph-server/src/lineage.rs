//! Hive query lineage ingestion.
//!
//! A lineage record describes one query: who ran it, which tables it read,
//! which columns it projected, filtered, grouped and created. Records map
//! field-for-field onto the `HiveLineage` class and its component classes.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use metagraph_types::builder::{class_type, collection_attr, optional_attr, unique_required_attr};
use metagraph_types::{
    AttributeDefinition, PrimitiveType, TypeDefinition, TypeError, TypeRegistry, Value,
};

use crate::error::Error;

/// Lineage class name.
pub const HIVE_LINEAGE: &str = "HiveLineage";
/// Source table component class.
pub const HIVE_LINEAGE_SOURCE_TABLE: &str = "HiveLineageSourceTable";
/// Projected column component class.
pub const HIVE_LINEAGE_QUERY_COLUMN: &str = "HiveLineageQueryColumn";
/// Filter predicate component class.
pub const HIVE_LINEAGE_WHERE_CLAUSE: &str = "HiveLineageWhereClause";
/// Grouping and ordering column component class.
pub const HIVE_LINEAGE_COLUMN_REF: &str = "HiveLineageColumnRef";
/// Created column component class.
pub const HIVE_LINEAGE_CREATE_COLUMN: &str = "HiveLineageCreateColumn";

/// A table read by the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTable {
    pub table_name: Option<String>,
    pub table_alias: Option<String>,
    pub database_name: Option<String>,
}

/// A projected column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryColumn {
    pub tb_alias_or_name: Option<String>,
    pub column_name: Option<String>,
    pub column_alias: Option<String>,
    pub column_function: Option<String>,
}

/// One predicate of the where clause.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhereClause {
    pub tb_alias_or_name: Option<String>,
    pub column_condition: Option<String>,
    pub column_name: Option<String>,
    pub column_operator: Option<String>,
    pub column_value: Option<String>,
}

/// A grouping or ordering column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRef {
    pub tb_alias_or_name: Option<String>,
    pub column_name: Option<String>,
}

/// A column created by the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateColumn {
    pub column_name: Option<String>,
    pub column_type: Option<String>,
}

/// Lineage of one Hive query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageRecord {
    pub query_id: String,
    pub user: Option<String>,
    pub query_start_time: Option<String>,
    pub query_end_time: Option<String>,
    pub query: Option<String>,
    pub table_name: Option<String>,
    pub table_location: Option<String>,
    #[serde(default)]
    pub source_tables: Vec<SourceTable>,
    #[serde(default)]
    pub query_columns: Vec<QueryColumn>,
    #[serde(default)]
    pub where_clause: Vec<WhereClause>,
    #[serde(default)]
    pub create_columns: Vec<CreateColumn>,
    #[serde(default)]
    pub group_by: Vec<ColumnRef>,
    #[serde(default)]
    pub order_by: Vec<ColumnRef>,
}

impl LineageRecord {
    /// Create a record for a query id.
    pub fn new(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            ..Self::default()
        }
    }

    /// Flatten to attribute values keyed by the `HiveLineage` attribute names.
    pub fn to_attributes(&self) -> HashMap<String, Value> {
        let mut values = HashMap::new();
        values.insert("queryId".to_string(), Value::from(self.query_id.as_str()));
        insert_opt(&mut values, "user", &self.user);
        insert_opt(&mut values, "queryStartTime", &self.query_start_time);
        insert_opt(&mut values, "queryEndTime", &self.query_end_time);
        insert_opt(&mut values, "query", &self.query);
        insert_opt(&mut values, "tableName", &self.table_name);
        insert_opt(&mut values, "tableLocation", &self.table_location);

        insert_list(&mut values, "sourceTables", &self.source_tables, |t| {
            fields([
                ("tableName", &t.table_name),
                ("tableAlias", &t.table_alias),
                ("databaseName", &t.database_name),
            ])
        });
        insert_list(&mut values, "queryColumns", &self.query_columns, |c| {
            fields([
                ("tbAliasOrName", &c.tb_alias_or_name),
                ("columnName", &c.column_name),
                ("columnAlias", &c.column_alias),
                ("columnFunction", &c.column_function),
            ])
        });
        insert_list(&mut values, "whereClause", &self.where_clause, |w| {
            fields([
                ("tbAliasOrName", &w.tb_alias_or_name),
                ("columnCondition", &w.column_condition),
                ("columnName", &w.column_name),
                ("columnOperator", &w.column_operator),
                ("columnValue", &w.column_value),
            ])
        });
        insert_list(&mut values, "createColumns", &self.create_columns, |c| {
            fields([("columnName", &c.column_name), ("columnType", &c.column_type)])
        });
        insert_list(&mut values, "groupBy", &self.group_by, column_ref);
        insert_list(&mut values, "orderBy", &self.order_by, column_ref);
        values
    }
}

fn insert_opt(values: &mut HashMap<String, Value>, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        values.insert(name.to_string(), Value::from(value.as_str()));
    }
}

fn insert_list<T>(
    values: &mut HashMap<String, Value>,
    name: &str,
    items: &[T],
    to_struct: impl Fn(&T) -> Value,
) {
    if !items.is_empty() {
        values.insert(name.to_string(), Value::Array(items.iter().map(to_struct).collect()));
    }
}

fn fields<const N: usize>(entries: [(&str, &Option<String>); N]) -> Value {
    let map: BTreeMap<String, Value> = entries
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .map(|v| (name.to_string(), Value::from(v.as_str())))
        })
        .collect();
    Value::Struct(map)
}

fn column_ref(c: &ColumnRef) -> Value {
    fields([("tbAliasOrName", &c.tb_alias_or_name), ("columnName", &c.column_name)])
}

/// Definitions of `HiveLineage` and its component classes.
pub fn lineage_type_definitions() -> Result<Vec<TypeDefinition>, TypeError> {
    let string = PrimitiveType::String;
    let component = |name: &str, attrs: &[&str]| -> Result<TypeDefinition, TypeError> {
        let attrs = attrs
            .iter()
            .map(|a| optional_attr(*a, string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(class_type(name, [] as [&str; 0], attrs)?.into())
    };
    let composite = |name: &str, element: &str| -> Result<AttributeDefinition, TypeError> {
        Ok(collection_attr(name, element)?.composite())
    };

    Ok(vec![
        component(
            HIVE_LINEAGE_SOURCE_TABLE,
            &["tableName", "tableAlias", "databaseName"],
        )?,
        component(
            HIVE_LINEAGE_QUERY_COLUMN,
            &["tbAliasOrName", "columnName", "columnAlias", "columnFunction"],
        )?,
        component(
            HIVE_LINEAGE_WHERE_CLAUSE,
            &[
                "tbAliasOrName",
                "columnCondition",
                "columnName",
                "columnOperator",
                "columnValue",
            ],
        )?,
        component(HIVE_LINEAGE_COLUMN_REF, &["tbAliasOrName", "columnName"])?,
        component(HIVE_LINEAGE_CREATE_COLUMN, &["columnName", "columnType"])?,
        class_type(
            HIVE_LINEAGE,
            [] as [&str; 0],
            [
                unique_required_attr("queryId", string)?,
                optional_attr("user", string)?,
                optional_attr("queryStartTime", string)?,
                optional_attr("queryEndTime", string)?,
                optional_attr("query", string)?,
                optional_attr("tableName", string)?,
                optional_attr("tableLocation", string)?,
                composite("sourceTables", HIVE_LINEAGE_SOURCE_TABLE)?,
                composite("queryColumns", HIVE_LINEAGE_QUERY_COLUMN)?,
                composite("whereClause", HIVE_LINEAGE_WHERE_CLAUSE)?,
                composite("createColumns", HIVE_LINEAGE_CREATE_COLUMN)?,
                composite("groupBy", HIVE_LINEAGE_COLUMN_REF)?,
                composite("orderBy", HIVE_LINEAGE_COLUMN_REF)?,
            ],
        )?
        .into(),
    ])
}

/// Validates lineage records against the registered `HiveLineage` class.
pub struct LineageIngestor {
    registry: Arc<TypeRegistry>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl LineageIngestor {
    /// Create an ingestor over a registry that already holds the lineage types.
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Validate a typed record and return its attribute values.
    pub fn ingest(&self, record: &LineageRecord) -> Result<HashMap<String, Value>, Error> {
        self.check(record.to_attributes())
    }

    /// Validate a raw JSON record. Fields the class does not define are rejected.
    pub fn ingest_json(&self, json: &str) -> Result<HashMap<String, Value>, Error> {
        let raw: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
        let values = raw
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect();
        self.check(values)
    }

    fn check(&self, values: HashMap<String, Value>) -> Result<HashMap<String, Value>, Error> {
        let errors = self.registry.validate_entity(HIVE_LINEAGE, &values);
        if errors.is_empty() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            debug!(query_id = ?values.get("queryId").and_then(|v| v.as_str()), "lineage record accepted");
            return Ok(values);
        }

        self.rejected.fetch_add(1, Ordering::Relaxed);
        warn!(violations = errors.len(), "lineage record rejected");
        Err(Error::Validation {
            type_name: HIVE_LINEAGE.to_string(),
            errors,
        })
    }

    /// Number of records accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Number of records rejected so far.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metagraph_types::ValidationError;

    fn ingestor() -> LineageIngestor {
        let registry = Arc::new(TypeRegistry::new());
        registry
            .register_types(lineage_type_definitions().unwrap())
            .unwrap();
        LineageIngestor::new(registry)
    }

    fn sample() -> LineageRecord {
        LineageRecord {
            user: Some("etl".into()),
            query: Some("INSERT INTO sales SELECT * FROM orders o".into()),
            table_name: Some("sales".into()),
            source_tables: vec![SourceTable {
                table_name: Some("orders".into()),
                table_alias: Some("o".into()),
                database_name: Some("default".into()),
            }],
            group_by: vec![ColumnRef {
                tb_alias_or_name: Some("o".into()),
                column_name: Some("region".into()),
            }],
            ..LineageRecord::new("q-1")
        }
    }

    #[test]
    fn test_lineage_types_register() {
        let registry = TypeRegistry::new();
        let resolved = registry
            .register_types(lineage_type_definitions().unwrap())
            .unwrap();

        assert_eq!(resolved.len(), 6);
        let lineage = registry.get_type(HIVE_LINEAGE).unwrap();
        assert_eq!(lineage.attributes().len(), 13);
        assert!(lineage.attribute("queryId").unwrap().is_unique());
    }

    #[test]
    fn test_to_attributes() {
        let values = sample().to_attributes();

        assert_eq!(values["queryId"], Value::from("q-1"));
        assert!(!values.contains_key("queryEndTime"));
        let Value::Array(tables) = &values["sourceTables"] else {
            panic!("expected array");
        };
        let Value::Struct(table) = &tables[0] else {
            panic!("expected struct");
        };
        assert_eq!(table["tableAlias"], Value::from("o"));
    }

    #[test]
    fn test_ingest_record() {
        let ingestor = ingestor();
        assert!(ingestor.ingest(&sample()).is_ok());
        assert_eq!(ingestor.accepted(), 1);
    }

    #[test]
    fn test_ingest_blank_query_id() {
        let ingestor = ingestor();
        let err = ingestor.ingest(&LineageRecord::new("")).unwrap_err();

        match err {
            Error::Validation { errors, .. } => assert!(matches!(
                errors[..],
                [ValidationError::InvalidUniqueValue { .. }]
            )),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(ingestor.rejected(), 1);
    }

    #[test]
    fn test_ingest_json_rejects_extra_fields() {
        let ingestor = ingestor();
        let err = ingestor
            .ingest_json(
                r#"{
                    "queryId": "q-2",
                    "sourceTables": [{"tableName": "orders", "owner": "bob"}],
                    "engine": "tez"
                }"#,
            )
            .unwrap_err();

        let Error::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        let unknown: Vec<_> = errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::UnknownAttribute {
                    type_name,
                    attribute,
                } => Some((type_name.as_str(), attribute.as_str())),
                _ => None,
            })
            .collect();
        assert_eq!(
            unknown,
            vec![(HIVE_LINEAGE_SOURCE_TABLE, "owner"), (HIVE_LINEAGE, "engine")]
        );
    }

    #[test]
    fn test_record_json_roundtrip() {
        let json = serde_json::to_string(&sample()).unwrap();
        let ingestor = ingestor();

        assert!(ingestor.ingest_json(&json).is_ok());
    }
}
