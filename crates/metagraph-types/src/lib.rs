//! Metagraph type system - classes, traits and enums for metadata entities.
//!
//! Types are registered in atomic batches with a [`TypeRegistry`], which
//! resolves multiple inheritance into flattened [`ResolvedType`]s and
//! publishes them as immutable snapshots. Entities are checked against the
//! resolved types with [`TypeRegistry::validate_entity`].

pub mod builder;
pub mod document;
pub mod error;
pub mod registry;
pub mod types;
pub mod validation;
pub mod value;

pub use document::{
    AttributeDocument, CategoryDocument, EnumDocument, EnumValueDocument, MultiplicityDocument,
    SchemaDocument, TypeDocument,
};
pub use error::{Error, RegistrationError, TypeError, ValidationError};
pub use registry::{ResolvedTypes, TypeBatch, TypeRegistry, TypeSnapshot, TypeStore};
pub use types::{
    AttributeDefinition, DataTypeRef, EnumTypeDefinition, EnumValue, HierarchicalTypeDefinition,
    Multiplicity, PrimitiveType, ResolvedType, TypeCategory, TypeDefinition,
};
pub use validation::EntityValidator;
pub use value::Value;
