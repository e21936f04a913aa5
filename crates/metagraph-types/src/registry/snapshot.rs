//! Immutable registry snapshots.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::resolver::flatten;
use crate::types::{
    DataTypeRef, EnumTypeDefinition, PrimitiveType, ResolvedType, TypeCategory, TypeDefinition,
};

/// Current time in microseconds since the Unix epoch.
pub(crate) fn current_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_micros()).unwrap_or_default()
}

/// An immutable view of every committed type.
///
/// Snapshots are never modified. Each commit builds a new one from the
/// previous snapshot plus the batch, sharing unchanged entries through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TypeSnapshot {
    version: u64,
    created_at: u64,
    types: HashMap<String, Arc<ResolvedType>>,
    enums: HashMap<String, Arc<EnumTypeDefinition>>,
}

impl TypeSnapshot {
    /// An empty snapshot at version 0.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Commit version this snapshot was published at.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Commit time (microseconds since Unix epoch), 0 for the empty snapshot.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Get a class or trait.
    pub fn get_type(&self, name: &str) -> Option<&Arc<ResolvedType>> {
        self.types.get(name)
    }

    /// Get an enum.
    pub fn get_enum(&self, name: &str) -> Option<&Arc<EnumTypeDefinition>> {
        self.enums.get(name)
    }

    /// Check if a name is taken by a committed type or a primitive.
    pub fn contains(&self, name: &str) -> bool {
        self.category_of(name).is_some()
    }

    /// Category of a registered or built-in name.
    ///
    /// Collection names resolve to [`TypeCategory::Primitive`] when every
    /// element type resolves.
    pub fn category_of(&self, name: &str) -> Option<TypeCategory> {
        if let Some(resolved) = self.types.get(name) {
            return Some(resolved.category());
        }
        if self.enums.contains_key(name) {
            return Some(TypeCategory::Enum);
        }
        if PrimitiveType::from_name(name).is_some() {
            return Some(TypeCategory::Primitive);
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

    /// Class and trait names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Enum names, sorted.
    pub fn enum_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.enums.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Names of classes or traits of one category, sorted.
    pub fn type_names_by_category(&self, category: TypeCategory) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .types
            .values()
            .filter(|t| t.category() == category)
            .map(|t| t.name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Types whose ancestor closure contains `name`, sorted.
    pub fn subtypes_of(&self, name: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .types
            .values()
            .filter(|t| t.is_subtype_of(name))
            .map(|t| t.name())
            .collect();
        names.sort_unstable();
        names
    }

    /// Check if `def` is what was committed under its name.
    ///
    /// Classes and traits compare by their resolution against this snapshot,
    /// so only a change to the flattened form counts as a redefinition.
    pub fn is_committed(&self, def: &TypeDefinition) -> bool {
        match def {
            TypeDefinition::Enum(def) => self
                .enums
                .get(def.name())
                .map_or(false, |committed| committed.as_ref() == def),
            TypeDefinition::Hierarchical(def) => {
                let Some(committed) = self.types.get(def.name()) else {
                    return false;
                };
                flatten(def, |name| self.types.get(name).map(Arc::as_ref))
                    .map_or(false, |resolved| &resolved == committed.as_ref())
            }
        }
    }

    /// Number of registered classes, traits and enums.
    pub fn len(&self) -> usize {
        self.types.len() + self.enums.len()
    }

    /// Check if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate classes and traits in arbitrary order.
    pub fn types(&self) -> impl Iterator<Item = &Arc<ResolvedType>> {
        self.types.values()
    }

    /// Iterate enums in arbitrary order.
    pub fn enums(&self) -> impl Iterator<Item = &Arc<EnumTypeDefinition>> {
        self.enums.values()
    }

    /// Build the next snapshot: this one plus the given types and enums.
    pub(crate) fn extend(
        &self,
        version: u64,
        created_at: u64,
        types: impl IntoIterator<Item = Arc<ResolvedType>>,
        enums: impl IntoIterator<Item = Arc<EnumTypeDefinition>>,
    ) -> TypeSnapshot {
        let mut next = self.clone();
        next.version = version;
        next.created_at = created_at;
        for resolved in types {
            next.types.insert(resolved.name().to_string(), resolved);
        }
        for def in enums {
            next.enums.insert(def.name().to_string(), def);
        }
        next
    }
}

/// Resolved types of a batch, keyed by name.
pub type ResolvedTypes = BTreeMap<String, Arc<ResolvedType>>;
