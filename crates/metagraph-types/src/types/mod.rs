//! Type definitions: multiplicities, attributes, enums, classes and traits.
//!
//! Definitions are plain values. They are validated on construction and
//! resolved against each other by the [`TypeRegistry`](crate::TypeRegistry).

mod attribute;
mod data_type;
mod enum_type;
mod hierarchy;
mod multiplicity;
mod resolved;

pub use attribute::AttributeDefinition;
pub use data_type::{DataTypeRef, PrimitiveType};
pub use enum_type::{EnumTypeDefinition, EnumValue};
pub use hierarchy::{HierarchicalTypeDefinition, TypeCategory, TypeDefinition};
pub use multiplicity::Multiplicity;
pub use resolved::ResolvedType;
