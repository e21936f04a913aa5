//! Shorthand constructors for attributes and types.
//!
//! ```
//! use metagraph_types::builder::{class_type, optional_attr, required_attr};
//! use metagraph_types::PrimitiveType;
//!
//! let table = class_type(
//!     "Table",
//!     [] as [&str; 0],
//!     [
//!         required_attr("name", PrimitiveType::String)?,
//!         optional_attr("owner", PrimitiveType::String)?,
//!     ],
//! )?;
//! assert_eq!(table.name(), "Table");
//! # Ok::<(), metagraph_types::TypeError>(())
//! ```

use crate::error::TypeError;
use crate::types::{
    AttributeDefinition, EnumTypeDefinition, EnumValue, HierarchicalTypeDefinition, Multiplicity,
    TypeDefinition,
};

/// `[0..1]` attribute.
pub fn optional_attr(
    name: impl Into<String>,
    data_type: impl Into<String>,
) -> Result<AttributeDefinition, TypeError> {
    AttributeDefinition::new(name, data_type, Multiplicity::OPTIONAL)
}

/// `[1..1]` attribute.
pub fn required_attr(
    name: impl Into<String>,
    data_type: impl Into<String>,
) -> Result<AttributeDefinition, TypeError> {
    AttributeDefinition::new(name, data_type, Multiplicity::REQUIRED)
}

/// `[1..1]` attribute that is unique and indexed.
pub fn unique_required_attr(
    name: impl Into<String>,
    data_type: impl Into<String>,
) -> Result<AttributeDefinition, TypeError> {
    Ok(required_attr(name, data_type)?.unique())
}

/// `[0..*]` attribute.
pub fn collection_attr(
    name: impl Into<String>,
    data_type: impl Into<String>,
) -> Result<AttributeDefinition, TypeError> {
    AttributeDefinition::new(name, data_type, Multiplicity::COLLECTION)
}

/// Enum from `(name, ordinal)` pairs.
pub fn enum_type(
    name: impl Into<String>,
    values: &[(&str, u32)],
) -> Result<EnumTypeDefinition, TypeError> {
    EnumTypeDefinition::new(
        name,
        values
            .iter()
            .map(|(value, ordinal)| EnumValue::new(*value, *ordinal)),
    )
}

/// Class declaration.
pub fn class_type(
    name: impl Into<String>,
    super_types: impl IntoIterator<Item = impl Into<String>>,
    attributes: impl IntoIterator<Item = AttributeDefinition>,
) -> Result<HierarchicalTypeDefinition, TypeError> {
    HierarchicalTypeDefinition::class(name, super_types, attributes)
}

/// Trait declaration.
pub fn trait_type(
    name: impl Into<String>,
    super_types: impl IntoIterator<Item = impl Into<String>>,
    attributes: impl IntoIterator<Item = AttributeDefinition>,
) -> Result<HierarchicalTypeDefinition, TypeError> {
    HierarchicalTypeDefinition::trait_type(name, super_types, attributes)
}

/// Collect declarations into a registration batch.
pub fn batch<I, T>(definitions: I) -> Vec<TypeDefinition>
where
    I: IntoIterator<Item = T>,
    T: Into<TypeDefinition>,
{
    definitions.into_iter().map(Into::into).collect()
}
