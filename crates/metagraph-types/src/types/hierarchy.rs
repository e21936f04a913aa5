//! Class and trait declarations.

use super::attribute::AttributeDefinition;
use super::enum_type::EnumTypeDefinition;
use crate::error::TypeError;
use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// Category of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
pub enum TypeCategory {
    /// Built-in primitive.
    Primitive,
    /// Enumeration.
    Enum,
    /// Standalone entity schema.
    Class,
    /// Mixin contributing attributes to classes.
    Trait,
}

impl TypeCategory {
    /// Lowercase name used in documents and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeCategory::Primitive => "primitive",
            TypeCategory::Enum => "enum",
            TypeCategory::Class => "class",
            TypeCategory::Trait => "trait",
        }
    }

    /// Check if this category supports inheritance.
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, TypeCategory::Class | TypeCategory::Trait)
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A class or trait declaration: supertypes plus its own attributes.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct HierarchicalTypeDefinition {
    category: TypeCategory,
    name: String,
    /// Sorted and de-duplicated.
    super_types: Vec<String>,
    attributes: Vec<AttributeDefinition>,
}

impl HierarchicalTypeDefinition {
    /// Create a class or trait declaration.
    ///
    /// Only [`TypeCategory::Class`] and [`TypeCategory::Trait`] are accepted.
    pub fn new(
        category: TypeCategory,
        name: impl Into<String>,
        super_types: impl IntoIterator<Item = impl Into<String>>,
        attributes: impl IntoIterator<Item = AttributeDefinition>,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::EmptyName {
                kind: category.as_str(),
            });
        }
        if !category.is_hierarchical() {
            return Err(TypeError::InvalidCategory {
                type_name: name,
                category,
            });
        }

        let mut super_types: Vec<String> = super_types.into_iter().map(Into::into).collect();
        if super_types.iter().any(|s| s.trim().is_empty()) {
            return Err(TypeError::EmptyName { kind: "supertype" });
        }
        super_types.sort();
        super_types.dedup();

        Ok(Self {
            category,
            name,
            super_types,
            attributes: attributes.into_iter().collect(),
        })
    }

    /// Create a class declaration.
    pub fn class(
        name: impl Into<String>,
        super_types: impl IntoIterator<Item = impl Into<String>>,
        attributes: impl IntoIterator<Item = AttributeDefinition>,
    ) -> Result<Self, TypeError> {
        Self::new(TypeCategory::Class, name, super_types, attributes)
    }

    /// Create a trait declaration.
    pub fn trait_type(
        name: impl Into<String>,
        super_types: impl IntoIterator<Item = impl Into<String>>,
        attributes: impl IntoIterator<Item = AttributeDefinition>,
    ) -> Result<Self, TypeError> {
        Self::new(TypeCategory::Trait, name, super_types, attributes)
    }

    /// Class or trait.
    pub fn category(&self) -> TypeCategory {
        self.category
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct supertype names, sorted.
    pub fn super_types(&self) -> &[String] {
        &self.super_types
    }

    /// Attributes declared on this type, in declaration order.
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }
}

/// One element of a registration batch.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum TypeDefinition {
    /// An enumeration.
    Enum(EnumTypeDefinition),
    /// A class or trait.
    Hierarchical(HierarchicalTypeDefinition),
}

impl TypeDefinition {
    /// The defined type's name.
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Enum(def) => def.name(),
            TypeDefinition::Hierarchical(def) => def.name(),
        }
    }

    /// The defined type's category.
    pub fn category(&self) -> TypeCategory {
        match self {
            TypeDefinition::Enum(_) => TypeCategory::Enum,
            TypeDefinition::Hierarchical(def) => def.category(),
        }
    }
}

impl From<EnumTypeDefinition> for TypeDefinition {
    fn from(def: EnumTypeDefinition) -> Self {
        TypeDefinition::Enum(def)
    }
}

impl From<HierarchicalTypeDefinition> for TypeDefinition {
    fn from(def: HierarchicalTypeDefinition) -> Self {
        TypeDefinition::Hierarchical(def)
    }
}
