//! Error types for the type system.

use crate::types::{AttributeDefinition, TypeCategory};
use thiserror::Error;

/// A problem with a type definition or a registration batch.
///
/// Registration never stops at the first of these; see [`RegistrationError`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    /// A name was empty where one is required.
    #[error("{kind} name must not be empty")]
    EmptyName {
        /// What kind of name was empty.
        kind: &'static str,
    },

    /// Type name already registered or repeated within a batch.
    #[error("type {name} is already defined")]
    DuplicateType {
        /// The duplicated name.
        name: String,
    },

    /// Two enum values share a name or an ordinal.
    #[error("enum {enum_name}: duplicate value {value} (ordinal {ordinal})")]
    DuplicateEnumValue {
        /// The enum being defined.
        enum_name: String,
        /// The offending value name.
        value: String,
        /// The offending value ordinal.
        ordinal: u32,
    },

    /// A supertype or attribute data type names nothing known.
    #[error("type {type_name} references unknown type {reference}")]
    UnknownTypeReference {
        /// The type holding the reference.
        type_name: String,
        /// The unresolvable name.
        reference: String,
    },

    /// Enum lookup by name or ordinal failed.
    #[error("enum {enum_name} has no value {value}")]
    UnknownEnumValue {
        /// The enum searched.
        enum_name: String,
        /// The key that was looked up.
        value: String,
    },

    /// A class named a trait as supertype, or the other way around.
    #[error("{category} {type_name} cannot extend {super_category} {super_type}")]
    InvalidSupertypeCategory {
        /// The type declaring the supertype.
        type_name: String,
        /// Category of the declaring type.
        category: TypeCategory,
        /// The supertype name.
        super_type: String,
        /// Category of the supertype.
        super_category: TypeCategory,
    },

    /// Only classes and traits may declare supertypes and attributes.
    #[error("type {type_name}: a {category} cannot be declared hierarchically")]
    InvalidCategory {
        /// The declared name.
        type_name: String,
        /// The rejected category.
        category: TypeCategory,
    },

    /// The supertype graph contains a cycle.
    #[error("cyclic inheritance: {}", .path.join(" -> "))]
    CyclicInheritance {
        /// The cycle, starting and ending at the same type.
        path: Vec<String>,
    },

    /// The same attribute name is reachable with different definitions.
    #[error(
        "type {type_name}: attribute {attribute} from {existing_from} ({existing}) conflicts with {conflicting_from} ({conflicting})"
    )]
    AttributeConflict {
        /// The type being resolved.
        type_name: String,
        /// The attribute name.
        attribute: String,
        /// Type that contributed the definition kept so far.
        existing_from: String,
        /// Definition kept so far.
        existing: Box<AttributeDefinition>,
        /// Type that contributed the conflicting definition.
        conflicting_from: String,
        /// Conflicting definition.
        conflicting: Box<AttributeDefinition>,
    },

    /// Multiplicity bounds are inconsistent.
    #[error("invalid multiplicity (lower {lower}, upper {upper:?}, unique {is_unique}): {reason}")]
    InvalidMultiplicity {
        /// Lower bound.
        lower: u32,
        /// Upper bound, `None` when unbounded.
        upper: Option<u32>,
        /// Uniqueness flag.
        is_unique: bool,
        /// Which rule was broken.
        reason: &'static str,
    },

    /// A reverse attribute does not exist on the referenced class.
    #[error(
        "type {type_name}: attribute {attribute} names reverse attribute {reverse} which {target} does not define"
    )]
    InvalidReverseAttribute {
        /// The type holding the attribute.
        type_name: String,
        /// The attribute with the reverse reference.
        attribute: String,
        /// The reverse attribute name.
        reverse: String,
        /// The referenced type.
        target: String,
    },
}

/// A failed registration batch, carrying every problem found.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("type registration failed with {} error(s): {}", .errors.len(), join_errors(.errors))]
pub struct RegistrationError {
    /// All problems found in the batch, in batch order.
    pub errors: Vec<TypeError>,
}

impl RegistrationError {
    /// Wrap a list of type errors.
    pub fn new(errors: Vec<TypeError>) -> Self {
        Self { errors }
    }

    /// Iterate the individual errors.
    pub fn iter(&self) -> impl Iterator<Item = &TypeError> {
        self.errors.iter()
    }
}

fn join_errors(errors: &[TypeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One violated attribute constraint on an entity instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The type is not registered.
    #[error("unknown type {type_name}")]
    UnknownType {
        /// The requested type name.
        type_name: String,
    },

    /// Trait and enum types cannot be instantiated as entities.
    #[error("type {type_name} is a {category} and cannot be instantiated")]
    NotInstantiable {
        /// The requested type name.
        type_name: String,
        /// Its category.
        category: TypeCategory,
    },

    /// A required attribute has no value.
    #[error("{type_name}.{attribute} is required")]
    MissingRequired {
        /// Entity type.
        type_name: String,
        /// Attribute name.
        attribute: String,
    },

    /// The number of values is outside the multiplicity bounds.
    #[error("{type_name}.{attribute} has {count} value(s), expected {expected}")]
    MultiplicityViolation {
        /// Entity type.
        type_name: String,
        /// Attribute name.
        attribute: String,
        /// Values supplied.
        count: usize,
        /// Display form of the multiplicity.
        expected: String,
    },

    /// A value does not match the attribute's data type.
    #[error("{type_name}.{attribute}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Entity type.
        type_name: String,
        /// Attribute name.
        attribute: String,
        /// Expected data type name.
        expected: String,
        /// Short description of the supplied value.
        found: String,
    },

    /// A unique attribute carries an empty or null value.
    #[error("{type_name}.{attribute} is unique and cannot hold an empty value")]
    InvalidUniqueValue {
        /// Entity type.
        type_name: String,
        /// Attribute name.
        attribute: String,
    },

    /// A set-valued attribute contains repeated elements.
    #[error("{type_name}.{attribute} is a set but contains duplicate elements")]
    DuplicateElements {
        /// Entity type.
        type_name: String,
        /// Attribute name.
        attribute: String,
    },

    /// The supplied field is not an attribute of the type.
    #[error("{type_name} has no attribute {attribute}")]
    UnknownAttribute {
        /// Entity type.
        type_name: String,
        /// Field name supplied by the caller.
        attribute: String,
    },
}

impl ValidationError {
    /// The attribute this error is about, if any.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ValidationError::UnknownType { .. } | ValidationError::NotInstantiable { .. } => None,
            ValidationError::MissingRequired { attribute, .. }
            | ValidationError::MultiplicityViolation { attribute, .. }
            | ValidationError::TypeMismatch { attribute, .. }
            | ValidationError::InvalidUniqueValue { attribute, .. }
            | ValidationError::DuplicateElements { attribute, .. }
            | ValidationError::UnknownAttribute { attribute, .. } => Some(attribute),
        }
    }
}

/// Crate-level errors, including storage of committed batches.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// JSON document error.
    #[error("document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// A single definition was malformed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A registration batch was rejected.
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// Stored batches could not be replayed.
    #[error("type store corrupt: {0}")]
    Corrupt(String),
}
