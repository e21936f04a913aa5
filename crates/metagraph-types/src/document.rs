//! JSON document form of type definitions.
//!
//! These documents are what the storage collaborator consumes and what
//! bootstrap schema files contain. Field names are camelCase.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, TypeError};
use crate::registry::TypeSnapshot;
use crate::types::{
    AttributeDefinition, EnumTypeDefinition, EnumValue, HierarchicalTypeDefinition, Multiplicity,
    ResolvedType, TypeCategory, TypeDefinition,
};

/// Category tag of a type document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDocument {
    Class,
    Trait,
}

impl From<CategoryDocument> for TypeCategory {
    fn from(category: CategoryDocument) -> Self {
        match category {
            CategoryDocument::Class => TypeCategory::Class,
            CategoryDocument::Trait => TypeCategory::Trait,
        }
    }
}

impl TryFrom<TypeCategory> for CategoryDocument {
    type Error = TypeCategory;

    fn try_from(category: TypeCategory) -> Result<Self, Self::Error> {
        match category {
            TypeCategory::Class => Ok(CategoryDocument::Class),
            TypeCategory::Trait => Ok(CategoryDocument::Trait),
            other => Err(other),
        }
    }
}

/// Multiplicity as `{lower, upper, isUnique}`; `upper: null` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiplicityDocument {
    pub lower: u32,
    pub upper: Option<u32>,
    #[serde(default)]
    pub is_unique: bool,
}

impl From<Multiplicity> for MultiplicityDocument {
    fn from(m: Multiplicity) -> Self {
        Self {
            lower: m.lower(),
            upper: m.upper(),
            is_unique: m.is_unique(),
        }
    }
}

impl TryFrom<MultiplicityDocument> for Multiplicity {
    type Error = TypeError;

    fn try_from(doc: MultiplicityDocument) -> Result<Self, Self::Error> {
        Multiplicity::new(doc.lower, doc.upper, doc.is_unique)
    }
}

/// One attribute definition.
///
/// Unique attributes are always indexed: `isUnique: true` with
/// `isIndexed: false` parses to an indexed attribute and renders back with
/// `isIndexed: true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDocument {
    pub name: String,
    pub data_type_name: String,
    pub multiplicity: MultiplicityDocument,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub is_composite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_attribute_name: Option<String>,
}

impl From<&AttributeDefinition> for AttributeDocument {
    fn from(attr: &AttributeDefinition) -> Self {
        Self {
            name: attr.name().to_string(),
            data_type_name: attr.data_type_name().to_string(),
            multiplicity: attr.multiplicity().into(),
            is_unique: attr.is_unique(),
            is_indexed: attr.is_indexed(),
            is_composite: attr.is_composite(),
            reverse_attribute_name: attr.reverse_attribute_name().map(String::from),
        }
    }
}

impl TryFrom<AttributeDocument> for AttributeDefinition {
    type Error = TypeError;

    fn try_from(doc: AttributeDocument) -> Result<Self, Self::Error> {
        let mut attr =
            AttributeDefinition::new(doc.name, doc.data_type_name, doc.multiplicity.try_into()?)?;
        if doc.is_composite {
            attr = attr.composite();
        }
        if doc.is_unique {
            attr = attr.unique();
        }
        if doc.is_indexed {
            attr = attr.indexed();
        }
        if let Some(reverse) = doc.reverse_attribute_name {
            attr = attr.with_reverse(reverse);
        }
        Ok(attr)
    }
}

/// A class or trait.
///
/// Declared documents list the type's own attributes. Documents produced
/// from a resolved type list the flattened attribute set and carry the
/// ancestor closure in `allSuperTypes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDocument {
    pub name: String,
    pub category: CategoryDocument,
    #[serde(default)]
    pub super_types: Vec<String>,
    #[serde(default)]
    pub attribute_definitions: Vec<AttributeDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_super_types: Option<Vec<String>>,
}

impl TypeDocument {
    /// Build the declaration this document describes.
    pub fn into_definition(self) -> Result<HierarchicalTypeDefinition, TypeError> {
        let attributes = self
            .attribute_definitions
            .into_iter()
            .map(AttributeDefinition::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        HierarchicalTypeDefinition::new(self.category.into(), self.name, self.super_types, attributes)
    }
}

impl From<&HierarchicalTypeDefinition> for TypeDocument {
    fn from(def: &HierarchicalTypeDefinition) -> Self {
        Self {
            name: def.name().to_string(),
            category: category_document(def.category()),
            super_types: def.super_types().to_vec(),
            attribute_definitions: def.attributes().iter().map(AttributeDocument::from).collect(),
            all_super_types: None,
        }
    }
}

/// Hierarchical definitions only ever carry class or trait.
fn category_document(category: TypeCategory) -> CategoryDocument {
    CategoryDocument::try_from(category).unwrap_or(CategoryDocument::Class)
}

/// One enum value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueDocument {
    pub name: String,
    pub ordinal: u32,
}

/// An enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDocument {
    pub name: String,
    pub values: Vec<EnumValueDocument>,
}

impl From<&EnumTypeDefinition> for EnumDocument {
    fn from(def: &EnumTypeDefinition) -> Self {
        Self {
            name: def.name().to_string(),
            values: def
                .values()
                .iter()
                .map(|v| EnumValueDocument {
                    name: v.name.clone(),
                    ordinal: v.ordinal,
                })
                .collect(),
        }
    }
}

impl TryFrom<EnumDocument> for EnumTypeDefinition {
    type Error = TypeError;

    fn try_from(doc: EnumDocument) -> Result<Self, Self::Error> {
        EnumTypeDefinition::new(
            doc.name,
            doc.values
                .into_iter()
                .map(|v| EnumValue::new(v.name, v.ordinal)),
        )
    }
}

/// A set of enums and types, as found in bootstrap files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub enums: Vec<EnumDocument>,
    #[serde(default)]
    pub types: Vec<TypeDocument>,
}

impl SchemaDocument {
    /// Parse a schema document from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Convert into a registration batch: enums first, then types, in file order.
    pub fn into_batch(self) -> Result<Vec<TypeDefinition>, TypeError> {
        let mut batch = Vec::with_capacity(self.enums.len() + self.types.len());
        for doc in self.enums {
            batch.push(TypeDefinition::Enum(doc.try_into()?));
        }
        for doc in self.types {
            batch.push(TypeDefinition::Hierarchical(doc.into_definition()?));
        }
        Ok(batch)
    }

    /// Export every type in a snapshot, sorted by name.
    pub fn from_snapshot(snapshot: &TypeSnapshot) -> Self {
        let enums = snapshot
            .enum_names()
            .into_iter()
            .filter_map(|name| snapshot.get_enum(name))
            .map(|def| EnumDocument::from(def.as_ref()))
            .collect();
        let types = snapshot
            .type_names()
            .into_iter()
            .filter_map(|name| snapshot.get_type(name))
            .map(|resolved| resolved.to_document())
            .collect();
        Self { enums, types }
    }
}

impl ResolvedType {
    /// Document form carrying the flattened attributes and ancestor closure.
    pub fn to_document(&self) -> TypeDocument {
        TypeDocument {
            name: self.name.clone(),
            category: category_document(self.category),
            super_types: self.super_types.iter().cloned().collect(),
            attribute_definitions: self.attributes.values().map(AttributeDocument::from).collect(),
            all_super_types: Some(self.ancestors.iter().cloned().collect()),
        }
    }

    /// Parse a resolved document back.
    ///
    /// When `allSuperTypes` is absent the direct supertypes are taken as the
    /// closure.
    pub fn from_document(doc: TypeDocument) -> Result<Self, TypeError> {
        let super_types: BTreeSet<String> = doc.super_types.into_iter().collect();
        let ancestors = match doc.all_super_types {
            Some(all) => all.into_iter().collect(),
            None => super_types.clone(),
        };

        let mut attributes: BTreeMap<String, AttributeDefinition> = BTreeMap::new();
        for attr_doc in doc.attribute_definitions {
            let attr = AttributeDefinition::try_from(attr_doc)?;
            if let Some(existing) = attributes.get(attr.name()) {
                if existing != &attr {
                    return Err(TypeError::AttributeConflict {
                        type_name: doc.name.clone(),
                        attribute: attr.name().to_string(),
                        existing_from: doc.name.clone(),
                        existing: Box::new(existing.clone()),
                        conflicting_from: doc.name,
                        conflicting: Box::new(attr),
                    });
                }
                continue;
            }
            attributes.insert(attr.name().to_string(), attr);
        }

        Ok(Self {
            name: doc.name,
            category: doc.category.into(),
            super_types,
            ancestors,
            attributes,
        })
    }
}
