//! Validation and resolution of one registration batch.
//!
//! A batch is checked against the union of the committed snapshot and the
//! batch itself, so types in the same batch may reference each other in any
//! order. Every problem is collected; nothing is committed here.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::resolver::{detect_cycles, flatten};
use super::snapshot::TypeSnapshot;
use crate::error::TypeError;
use crate::types::{
    DataTypeRef, EnumTypeDefinition, HierarchicalTypeDefinition, ResolvedType, TypeCategory,
    TypeDefinition,
};

/// The outcome of a successful batch check.
#[derive(Debug, Default)]
pub(crate) struct StagedBatch {
    pub types: BTreeMap<String, ResolvedType>,
    pub enums: Vec<EnumTypeDefinition>,
}

/// Validate and resolve `batch` against `snapshot`.
pub(crate) fn stage_batch(
    snapshot: &TypeSnapshot,
    batch: &[TypeDefinition],
) -> Result<StagedBatch, Vec<TypeError>> {
    let mut errors = Vec::new();

    // Names: unique across the snapshot and within the batch.
    let mut seen = HashSet::new();
    let mut accepted = Vec::new();
    for def in batch {
        let name = def.name();
        if snapshot.contains(name) || !seen.insert(name) {
            errors.push(TypeError::DuplicateType {
                name: name.to_string(),
            });
            continue;
        }
        accepted.push(def);
    }

    let mut hierarchical: BTreeMap<&str, &HierarchicalTypeDefinition> = BTreeMap::new();
    let mut enums = Vec::new();
    for def in &accepted {
        match def {
            TypeDefinition::Enum(def) => enums.push(def.clone()),
            TypeDefinition::Hierarchical(def) => {
                hierarchical.insert(def.name(), def);
            }
        }
    }

    let scope = BatchScope {
        snapshot,
        hierarchical: &hierarchical,
        enums: &enums,
    };

    // References: supertypes must exist with the same category, attribute
    // data types must resolve. Broken supertypes block flattening.
    let mut blocked: HashSet<&str> = HashSet::new();
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for def in accepted.iter().filter_map(|d| match d {
        TypeDefinition::Hierarchical(def) => Some(def),
        TypeDefinition::Enum(_) => None,
    }) {
        let edges = graph.entry(def.name()).or_default();
        for super_name in def.super_types() {
            match scope.category_of(super_name) {
                None => {
                    errors.push(TypeError::UnknownTypeReference {
                        type_name: def.name().to_string(),
                        reference: super_name.clone(),
                    });
                    blocked.insert(def.name());
                }
                Some(category) if category != def.category() => {
                    errors.push(TypeError::InvalidSupertypeCategory {
                        type_name: def.name().to_string(),
                        category: def.category(),
                        super_type: super_name.clone(),
                        super_category: category,
                    });
                    blocked.insert(def.name());
                }
                Some(_) => {
                    if hierarchical.contains_key(super_name.as_str()) {
                        edges.push(super_name.as_str());
                    }
                }
            }
        }

        for attribute in def.attributes() {
            let data_type = DataTypeRef::parse(attribute.data_type_name());
            for reference in data_type.named_references() {
                if scope.category_of(reference).is_none() {
                    errors.push(TypeError::UnknownTypeReference {
                        type_name: def.name().to_string(),
                        reference: reference.to_string(),
                    });
                }
            }
        }
    }

    for path in detect_cycles(&graph) {
        for name in &path {
            if let Some((&key, _)) = hierarchical.get_key_value(name.as_str()) {
                blocked.insert(key);
            }
        }
        errors.push(TypeError::CyclicInheritance { path });
    }

    let mut resolver = BatchResolver {
        snapshot,
        hierarchical: &hierarchical,
        blocked: &blocked,
        resolved: BTreeMap::new(),
        failed: HashSet::new(),
        errors: Vec::new(),
    };
    for def in &accepted {
        if let TypeDefinition::Hierarchical(def) = def {
            resolver.resolve(def.name());
        }
    }
    let BatchResolver {
        resolved,
        errors: resolve_errors,
        ..
    } = resolver;
    errors.extend(resolve_errors);

    for def in &accepted {
        if let TypeDefinition::Hierarchical(def) = def {
            check_reverse_attributes(def, snapshot, &resolved, &mut errors);
        }
    }

    debug!(
        batch = batch.len(),
        resolved = resolved.len(),
        errors = errors.len(),
        "staged type batch"
    );

    if errors.is_empty() {
        Ok(StagedBatch {
            types: resolved,
            enums,
        })
    } else {
        Err(errors)
    }
}

/// Name lookups over the committed snapshot plus the batch.
struct BatchScope<'a> {
    snapshot: &'a TypeSnapshot,
    hierarchical: &'a BTreeMap<&'a str, &'a HierarchicalTypeDefinition>,
    enums: &'a [EnumTypeDefinition],
}

impl BatchScope<'_> {
    fn category_of(&self, name: &str) -> Option<TypeCategory> {
        if let Some(category) = self.snapshot.category_of(name) {
            return Some(category);
        }
        if let Some(def) = self.hierarchical.get(name) {
            return Some(def.category());
        }
        if self.enums.iter().any(|e| e.name() == name) {
            return Some(TypeCategory::Enum);
        }
        let parsed = DataTypeRef::parse(name);
        if parsed.is_collection()
            && parsed
                .named_references()
                .iter()
                .all(|n| self.category_of(n).is_some())
        {
            return Some(TypeCategory::Primitive);
        }
        None
    }
}

/// Resolves batch types in dependency order, memoising results.
struct BatchResolver<'a> {
    snapshot: &'a TypeSnapshot,
    hierarchical: &'a BTreeMap<&'a str, &'a HierarchicalTypeDefinition>,
    blocked: &'a HashSet<&'a str>,
    resolved: BTreeMap<String, ResolvedType>,
    failed: HashSet<String>,
    errors: Vec<TypeError>,
}

impl BatchResolver<'_> {
    /// Resolve one batch type. Returns false if it (or a supertype) failed.
    fn resolve(&mut self, name: &str) -> bool {
        if self.resolved.contains_key(name) {
            return true;
        }
        if self.failed.contains(name) || self.blocked.contains(name) {
            return false;
        }
        let Some(&def) = self.hierarchical.get(name) else {
            return false;
        };

        for super_name in def.super_types() {
            let in_batch = self.hierarchical.contains_key(super_name.as_str());
            if in_batch && !self.resolve(super_name) {
                // The supertype's own error is already recorded.
                self.failed.insert(name.to_string());
                return false;
            }
        }

        let snapshot = self.snapshot;
        let resolved = &self.resolved;
        let result = flatten(def, |n| {
            resolved
                .get(n)
                .or_else(|| snapshot.get_type(n).map(|t| t.as_ref()))
        });

        match result {
            Ok(resolved) => {
                self.resolved.insert(name.to_string(), resolved);
                true
            }
            Err(errors) => {
                self.errors.extend(errors);
                self.failed.insert(name.to_string());
                false
            }
        }
    }
}

/// Every reverse attribute must name an attribute of the referenced class.
fn check_reverse_attributes(
    def: &HierarchicalTypeDefinition,
    snapshot: &TypeSnapshot,
    resolved: &BTreeMap<String, ResolvedType>,
    errors: &mut Vec<TypeError>,
) {
    for attribute in def.attributes() {
        let Some(reverse) = attribute.reverse_attribute_name() else {
            continue;
        };
        let data_type = DataTypeRef::parse(attribute.data_type_name());
        let DataTypeRef::Named(target) = data_type.element() else {
            errors.push(invalid_reverse(def, attribute.name(), reverse, attribute.data_type_name()));
            continue;
        };

        let target_type = resolved
            .get(target.as_str())
            .or_else(|| snapshot.get_type(target).map(|t| t.as_ref()));
        match target_type {
            Some(target_type)
                if target_type.category() == TypeCategory::Class
                    && target_type.attribute(reverse).is_some() => {}
            Some(_) => errors.push(invalid_reverse(def, attribute.name(), reverse, target)),
            // Unresolved targets already carry their own error.
            None => {}
        }
    }
}

fn invalid_reverse(
    def: &HierarchicalTypeDefinition,
    attribute: &str,
    reverse: &str,
    target: &str,
) -> TypeError {
    TypeError::InvalidReverseAttribute {
        type_name: def.name().to_string(),
        attribute: attribute.to_string(),
        reverse: reverse.to_string(),
        target: target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributeDefinition, EnumValue, Multiplicity};

    fn attr(name: &str, data_type: &str) -> AttributeDefinition {
        AttributeDefinition::new(name, data_type, Multiplicity::OPTIONAL).unwrap()
    }

    fn class(name: &str, supers: &[&str], attrs: Vec<AttributeDefinition>) -> TypeDefinition {
        HierarchicalTypeDefinition::class(name, supers.iter().copied(), attrs)
            .unwrap()
            .into()
    }

    fn trait_def(name: &str, supers: &[&str]) -> TypeDefinition {
        HierarchicalTypeDefinition::trait_type(name, supers.iter().copied(), [])
            .unwrap()
            .into()
    }

    #[test]
    fn test_forward_references_in_batch() {
        let batch = vec![
            class("HiveTable", &["Table"], vec![attr("db", "HiveDb")]),
            class("HiveDb", &[], vec![attr("tables", "array<HiveTable>")]),
            class("Table", &[], vec![attr("name", "string")]),
        ];

        let staged = stage_batch(&TypeSnapshot::empty(), &batch).unwrap();
        assert_eq!(staged.types.len(), 3);
        assert!(staged.types["HiveTable"].attribute("name").is_some());
    }

    #[test]
    fn test_duplicate_in_batch() {
        let batch = vec![class("Table", &[], vec![]), class("Table", &[], vec![])];

        let errors = stage_batch(&TypeSnapshot::empty(), &batch).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::DuplicateType {
                name: "Table".into()
            }]
        );
    }

    #[test]
    fn test_primitive_name_is_taken() {
        let errors = stage_batch(&TypeSnapshot::empty(), &[class("string", &[], vec![])]).unwrap_err();
        assert!(matches!(&errors[0], TypeError::DuplicateType { name } if name == "string"));
    }

    #[test]
    fn test_category_mismatch() {
        let batch = vec![trait_def("PII", &[]), class("Table", &["PII"], vec![])];

        let errors = stage_batch(&TypeSnapshot::empty(), &batch).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::InvalidSupertypeCategory {
                type_name: "Table".into(),
                category: TypeCategory::Class,
                super_type: "PII".into(),
                super_category: TypeCategory::Trait,
            }]
        );
    }

    #[test]
    fn test_cycle_reported_once() {
        let batch = vec![
            class("A", &["B"], vec![]),
            class("B", &["A"], vec![]),
            class("C", &["A"], vec![]),
        ];

        let errors = stage_batch(&TypeSnapshot::empty(), &batch).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::CyclicInheritance {
                path: vec!["A".into(), "B".into(), "A".into()]
            }]
        );
    }

    #[test]
    fn test_all_errors_collected() {
        let status = EnumTypeDefinition::new("Status", [EnumValue::new("ON", 0)]).unwrap();
        let batch = vec![
            TypeDefinition::from(status.clone()),
            TypeDefinition::from(status),
            class("Table", &["Ghost"], vec![attr("state", "Missing")]),
        ];

        let errors = stage_batch(&TypeSnapshot::empty(), &batch).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], TypeError::DuplicateType { .. }));
        assert!(matches!(
            &errors[1],
            TypeError::UnknownTypeReference { reference, .. } if reference == "Ghost"
        ));
        assert!(matches!(
            &errors[2],
            TypeError::UnknownTypeReference { reference, .. } if reference == "Missing"
        ));
    }

    #[test]
    fn test_reverse_attribute_checked() {
        let table = class(
            "Table",
            &[],
            vec![attr("columns", "array<Column>").with_reverse("table")],
        );
        let column = class("Column", &[], vec![attr("name", "string")]);

        let errors = stage_batch(&TypeSnapshot::empty(), &[table, column]).unwrap_err();
        assert_eq!(
            errors,
            vec![TypeError::InvalidReverseAttribute {
                type_name: "Table".into(),
                attribute: "columns".into(),
                reverse: "table".into(),
                target: "Column".into(),
            }]
        );
    }

    #[test]
    fn test_reverse_attribute_accepted() {
        let table = class(
            "Table",
            &[],
            vec![attr("columns", "array<Column>").with_reverse("table")],
        );
        let column = class(
            "Column",
            &[],
            vec![attr("table", "Table").with_reverse("columns")],
        );

        assert!(stage_batch(&TypeSnapshot::empty(), &[table, column]).is_ok());
    }
}
