//! Attribute definitions for classes and traits.

use super::multiplicity::Multiplicity;
use crate::error::TypeError;
use rkyv::{Archive, Deserialize, Serialize};
use std::fmt;

/// One named, typed field of a class or trait.
///
/// Equality is structural: two definitions are identical only when every
/// field matches. Inheritance relies on this to tell diamond duplicates
/// apart from genuine conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct AttributeDefinition {
    name: String,
    data_type_name: String,
    multiplicity: Multiplicity,
    is_composite: bool,
    is_unique: bool,
    is_indexed: bool,
    reverse_attribute_name: Option<String>,
}

impl AttributeDefinition {
    /// Create an attribute with no flags set.
    pub fn new(
        name: impl Into<String>,
        data_type_name: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        let data_type_name = data_type_name.into();

        if name.trim().is_empty() {
            return Err(TypeError::EmptyName { kind: "attribute" });
        }
        if data_type_name.trim().is_empty() {
            return Err(TypeError::EmptyName { kind: "data type" });
        }
        // Re-run the bound checks so hand-built values cannot slip through.
        let multiplicity = Multiplicity::new(
            multiplicity.lower(),
            multiplicity.upper(),
            multiplicity.is_unique(),
        )?;

        Ok(Self {
            name,
            data_type_name,
            multiplicity,
            is_composite: false,
            is_unique: false,
            is_indexed: false,
            reverse_attribute_name: None,
        })
    }

    /// Mark as composite: the referenced entity's lifecycle is bound to the owner.
    pub fn composite(mut self) -> Self {
        self.is_composite = true;
        self
    }

    /// Mark as unique. Unique attributes are always indexed.
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self.is_indexed = true;
        self
    }

    /// Mark as indexed.
    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    /// Set the attribute on the referenced class that points back at the owner.
    pub fn with_reverse(mut self, reverse_attribute_name: impl Into<String>) -> Self {
        self.reverse_attribute_name = Some(reverse_attribute_name.into());
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the attribute's data type.
    pub fn data_type_name(&self) -> &str {
        &self.data_type_name
    }

    /// Cardinality contract.
    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    /// Whether the owner controls the referenced entity's lifecycle.
    pub fn is_composite(&self) -> bool {
        self.is_composite
    }

    /// Whether at most one entity instance may hold any given value.
    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    /// Whether the attribute is indexed by the storage layer.
    pub fn is_indexed(&self) -> bool {
        self.is_indexed
    }

    /// Reverse attribute for bidirectional relationships.
    pub fn reverse_attribute_name(&self) -> Option<&str> {
        self.reverse_attribute_name.as_deref()
    }

    /// Whether a value is mandatory.
    pub fn is_required(&self) -> bool {
        self.multiplicity.is_required()
    }
}

impl fmt::Display for AttributeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.name, self.data_type_name, self.multiplicity)?;
        if self.is_composite {
            write!(f, " composite")?;
        }
        if self.is_unique {
            write!(f, " unique")?;
        }
        if self.is_indexed {
            write!(f, " indexed")?;
        }
        if let Some(reverse) = &self.reverse_attribute_name {
            write!(f, " reverse={}", reverse)?;
        }
        Ok(())
    }
}
