//! Resolved (flattened) class and trait types.

use super::attribute::AttributeDefinition;
use super::hierarchy::TypeCategory;
use std::collections::{BTreeMap, BTreeSet};

/// The immutable result of flattening a class or trait.
///
/// Holds the full attribute set (own plus inherited, keyed by name) and the
/// transitive closure of supertypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub(crate) name: String,
    pub(crate) category: TypeCategory,
    pub(crate) super_types: BTreeSet<String>,
    pub(crate) ancestors: BTreeSet<String>,
    pub(crate) attributes: BTreeMap<String, AttributeDefinition>,
}

impl ResolvedType {
    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class or trait.
    pub fn category(&self) -> TypeCategory {
        self.category
    }

    /// Directly declared supertypes.
    pub fn super_types(&self) -> &BTreeSet<String> {
        &self.super_types
    }

    /// Every supertype, transitively.
    pub fn ancestors(&self) -> &BTreeSet<String> {
        &self.ancestors
    }

    /// Check if `name` is a (transitive) supertype.
    pub fn is_subtype_of(&self, name: &str) -> bool {
        self.ancestors.contains(name)
    }

    /// Full attribute set keyed by name.
    pub fn attributes(&self) -> &BTreeMap<String, AttributeDefinition> {
        &self.attributes
    }

    /// Look up one attribute.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    /// Required attributes.
    pub fn required_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values().filter(|a| a.is_required())
    }

    /// Unique attributes; each is a candidate key for entity lookup.
    pub fn unique_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values().filter(|a| a.is_unique())
    }
}
