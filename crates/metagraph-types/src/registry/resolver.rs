//! Inheritance resolution.
//!
//! Two pure functions: [`detect_cycles`] over a supertype graph, and
//! [`flatten`], which merges a declaration's own attributes with those of its
//! already-resolved ancestors.
//!
//! Merging never lets a more derived definition shadow an inherited one. The
//! same attribute name reached along several paths is accepted only when every
//! definition is structurally identical.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::TypeError;
use crate::types::{AttributeDefinition, HierarchicalTypeDefinition, ResolvedType};

/// Find every cycle in a supertype graph.
///
/// `graph` maps a type name to the names of its direct supertypes. Nodes are
/// visited in key order so the reported paths are deterministic. Each path
/// starts and ends at the same type, e.g. `["A", "B", "A"]`.
pub fn detect_cycles(graph: &BTreeMap<&str, Vec<&str>>) -> Vec<Vec<String>> {
    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();

    for &start in graph.keys() {
        if !marks.contains_key(start) {
            visit(start, graph, &mut marks, &mut stack, &mut cycles);
        }
    }

    cycles
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

fn visit<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    marks: &mut HashMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    marks.insert(node, Mark::Visiting);
    stack.push(node);

    for &next in graph.get(node).into_iter().flatten() {
        match marks.get(next) {
            Some(Mark::Visiting) => {
                if let Some(pos) = stack.iter().position(|n| *n == next) {
                    let mut path: Vec<String> =
                        stack[pos..].iter().map(|n| n.to_string()).collect();
                    path.push(next.to_string());
                    cycles.push(path);
                }
            }
            Some(Mark::Done) => {}
            None => visit(next, graph, marks, stack, cycles),
        }
    }

    stack.pop();
    marks.insert(node, Mark::Done);
}

/// Flatten a declaration against its resolved ancestors.
///
/// `lookup` must return a resolved type for every direct supertype of `def`
/// and, transitively, for each of their ancestors. Own attributes are merged
/// first, in declaration order; ancestors follow in name order, each
/// contributing its full attribute set. All conflicts are collected before
/// returning.
pub fn flatten<'a, F>(def: &HierarchicalTypeDefinition, lookup: F) -> Result<ResolvedType, Vec<TypeError>>
where
    F: Fn(&str) -> Option<&'a ResolvedType>,
{
    let mut errors = Vec::new();
    let mut ancestors = BTreeSet::new();

    for super_name in def.super_types() {
        match lookup(super_name.as_str()) {
            Some(resolved) => {
                ancestors.insert(super_name.clone());
                ancestors.extend(resolved.ancestors().iter().cloned());
            }
            None => errors.push(TypeError::UnknownTypeReference {
                type_name: def.name().to_string(),
                reference: super_name.clone(),
            }),
        }
    }

    let mut merged = AttributeMerge::new(def.name());
    for attribute in def.attributes() {
        merged.add(def.name(), attribute);
    }
    for ancestor in &ancestors {
        match lookup(ancestor.as_str()) {
            Some(resolved) => {
                for attribute in resolved.attributes().values() {
                    merged.add(ancestor, attribute);
                }
            }
            None => errors.push(TypeError::UnknownTypeReference {
                type_name: def.name().to_string(),
                reference: ancestor.clone(),
            }),
        }
    }

    errors.extend(merged.conflicts);
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ResolvedType {
        name: def.name().to_string(),
        category: def.category(),
        super_types: def.super_types().iter().cloned().collect(),
        ancestors,
        attributes: merged
            .attributes
            .into_iter()
            .map(|(name, (attribute, _))| (name, attribute))
            .collect(),
    })
}

/// Accumulates attributes by name, remembering which type contributed each.
struct AttributeMerge<'d> {
    type_name: &'d str,
    attributes: BTreeMap<String, (AttributeDefinition, String)>,
    conflicts: Vec<TypeError>,
}

impl<'d> AttributeMerge<'d> {
    fn new(type_name: &'d str) -> Self {
        Self {
            type_name,
            attributes: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    fn add(&mut self, from: &str, attribute: &AttributeDefinition) {
        match self.attributes.get(attribute.name()) {
            None => {
                self.attributes.insert(
                    attribute.name().to_string(),
                    (attribute.clone(), from.to_string()),
                );
            }
            Some((existing, _)) if existing == attribute => {}
            Some((existing, existing_from)) => {
                self.conflicts.push(TypeError::AttributeConflict {
                    type_name: self.type_name.to_string(),
                    attribute: attribute.name().to_string(),
                    existing_from: existing_from.clone(),
                    existing: Box::new(existing.clone()),
                    conflicting_from: from.to_string(),
                    conflicting: Box::new(attribute.clone()),
                });
            }
        }
    }
}
