//! Enumeration types.

use crate::error::TypeError;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashSet;

/// One named value of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
pub struct EnumValue {
    /// Value name (unique within its enum).
    pub name: String,
    /// Ordinal (unique within its enum).
    pub ordinal: u32,
}

impl EnumValue {
    /// Create an enum value.
    pub fn new(name: impl Into<String>, ordinal: u32) -> Self {
        Self {
            name: name.into(),
            ordinal,
        }
    }
}

/// A closed set of named ordinal values.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct EnumTypeDefinition {
    name: String,
    values: Vec<EnumValue>,
}

impl EnumTypeDefinition {
    /// Create an enum type, rejecting repeated names or ordinals.
    ///
    /// Global uniqueness of the enum name is checked at registration time.
    pub fn new(
        name: impl Into<String>,
        values: impl IntoIterator<Item = EnumValue>,
    ) -> Result<Self, TypeError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::EmptyName { kind: "enum" });
        }

        let values: Vec<EnumValue> = values.into_iter().collect();
        let mut names = HashSet::new();
        let mut ordinals = HashSet::new();
        for value in &values {
            if value.name.trim().is_empty() {
                return Err(TypeError::EmptyName { kind: "enum value" });
            }
            if !names.insert(value.name.as_str()) || !ordinals.insert(value.ordinal) {
                return Err(TypeError::DuplicateEnumValue {
                    enum_name: name,
                    value: value.name.clone(),
                    ordinal: value.ordinal,
                });
            }
        }

        Ok(Self { name, values })
    }

    /// Enum name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values in declaration order.
    pub fn values(&self) -> &[EnumValue] {
        &self.values
    }

    /// Look up a value by name.
    pub fn value(&self, name: &str) -> Result<&EnumValue, TypeError> {
        self.values
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| self.unknown(name.to_string()))
    }

    /// Look up a value by ordinal.
    pub fn value_by_ordinal(&self, ordinal: u32) -> Result<&EnumValue, TypeError> {
        self.values
            .iter()
            .find(|v| v.ordinal == ordinal)
            .ok_or_else(|| self.unknown(ordinal.to_string()))
    }

    /// Check if a value with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }

    fn unknown(&self, value: String) -> TypeError {
        TypeError::UnknownEnumValue {
            enum_name: self.name.clone(),
            value,
        }
    }
}
