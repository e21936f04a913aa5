//! Entity validation against resolved types.
//!
//! The validator checks one entity's attribute values against a committed
//! class: required attributes, multiplicity bounds, data type shape, unique
//! values and set semantics. Cross-entity uniqueness belongs to storage.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate};

use crate::error::ValidationError;
use crate::registry::TypeSnapshot;
use crate::types::{AttributeDefinition, DataTypeRef, PrimitiveType, ResolvedType, TypeCategory};
use crate::value::Value;

/// Validate an entity's values against a class in `snapshot`.
///
/// Returns every violation found, attributes in name order followed by
/// unknown fields in name order.
pub fn validate_entity(
    snapshot: &TypeSnapshot,
    type_name: &str,
    values: &HashMap<String, Value>,
) -> Vec<ValidationError> {
    EntityValidator::new(snapshot).validate(type_name, values)
}

/// Validator bound to one snapshot.
pub struct EntityValidator<'a> {
    snapshot: &'a TypeSnapshot,
}

impl<'a> EntityValidator<'a> {
    /// Create a validator over a snapshot.
    pub fn new(snapshot: &'a TypeSnapshot) -> Self {
        Self { snapshot }
    }

    /// Validate one entity's values against the class `type_name`.
    pub fn validate(&self, type_name: &str, values: &HashMap<String, Value>) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let Some(resolved) = self.snapshot.get_type(type_name) else {
            if self.snapshot.get_enum(type_name).is_some() {
                errors.push(ValidationError::NotInstantiable {
                    type_name: type_name.to_string(),
                    category: TypeCategory::Enum,
                });
            } else {
                errors.push(ValidationError::UnknownType {
                    type_name: type_name.to_string(),
                });
            }
            return errors;
        };
        if resolved.category() != TypeCategory::Class {
            errors.push(ValidationError::NotInstantiable {
                type_name: type_name.to_string(),
                category: resolved.category(),
            });
            return errors;
        }

        let fields: BTreeMap<&str, &Value> = values.iter().map(|(k, v)| (k.as_str(), v)).collect();
        self.check_fields(resolved, &fields, &mut errors);
        errors
    }

    fn check_fields(
        &self,
        resolved: &ResolvedType,
        fields: &BTreeMap<&str, &Value>,
        errors: &mut Vec<ValidationError>,
    ) {
        for attr in resolved.attributes().values() {
            let value = fields.get(attr.name()).copied().unwrap_or(&Value::Null);
            self.check_attribute(resolved.name(), attr, value, errors);
        }

        for name in fields.keys() {
            if resolved.attribute(name).is_none() {
                errors.push(ValidationError::UnknownAttribute {
                    type_name: resolved.name().to_string(),
                    attribute: name.to_string(),
                });
            }
        }
    }

    fn check_attribute(
        &self,
        type_name: &str,
        attr: &AttributeDefinition,
        value: &Value,
        errors: &mut Vec<ValidationError>,
    ) {
        if value.is_null() {
            if attr.is_required() {
                errors.push(ValidationError::MissingRequired {
                    type_name: type_name.to_string(),
                    attribute: attr.name().to_string(),
                });
            }
            return;
        }

        let data_type = DataTypeRef::parse(attr.data_type_name());
        let multiplicity = attr.multiplicity();
        let ctx = Context {
            type_name,
            attribute: attr.name(),
        };

        let elements: Vec<&Value> = if multiplicity.is_many() {
            let elements: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            if !multiplicity.admits(elements.len()) {
                errors.push(ctx.multiplicity(elements.len(), multiplicity.to_string()));
            }
            if multiplicity.is_unique() && has_duplicates(&elements) {
                errors.push(ValidationError::DuplicateElements {
                    type_name: type_name.to_string(),
                    attribute: attr.name().to_string(),
                });
            }
            for element in &elements {
                self.check_value(&ctx, data_type.element(), element, errors);
            }
            elements
        } else {
            match (value, &data_type) {
                // An array is a shape error for a scalar, whatever its length.
                (Value::Array(_), dt) if !dt.is_collection() => {
                    errors.push(ctx.mismatch(dt, value));
                    return;
                }
                _ => self.check_value(&ctx, &data_type, value, errors),
            }
            vec![value]
        };

        if attr.is_unique() && elements.iter().any(|v| v.is_blank()) {
            errors.push(ValidationError::InvalidUniqueValue {
                type_name: type_name.to_string(),
                attribute: attr.name().to_string(),
            });
        }
    }

    fn check_value(
        &self,
        ctx: &Context<'_>,
        data_type: &DataTypeRef,
        value: &Value,
        errors: &mut Vec<ValidationError>,
    ) {
        match data_type {
            DataTypeRef::Primitive(primitive) => {
                // Nulls inside collections are left to the unique check.
                if !value.is_null() && !primitive_accepts(*primitive, value) {
                    errors.push(ctx.mismatch(data_type, value));
                }
            }
            DataTypeRef::Array(element) => match value {
                Value::Array(items) => {
                    for item in items {
                        self.check_value(ctx, element, item, errors);
                    }
                }
                other => errors.push(ctx.mismatch(data_type, other)),
            },
            DataTypeRef::Map(key, entry) => match value {
                Value::Struct(fields) => {
                    for (k, v) in fields {
                        if !self.map_key_accepted(key, k) {
                            errors.push(ctx.mismatch(key, &Value::String(k.clone())));
                        }
                        self.check_value(ctx, entry, v, errors);
                    }
                }
                other => errors.push(ctx.mismatch(data_type, other)),
            },
            DataTypeRef::Named(name) => self.check_named(ctx, data_type, name, value, errors),
        }
    }

    fn check_named(
        &self,
        ctx: &Context<'_>,
        data_type: &DataTypeRef,
        name: &str,
        value: &Value,
        errors: &mut Vec<ValidationError>,
    ) {
        if let Some(enum_type) = self.snapshot.get_enum(name) {
            let accepted = match value {
                Value::String(s) => enum_type.contains(s),
                Value::Int(i) => u32::try_from(*i)
                    .map(|ordinal| enum_type.value_by_ordinal(ordinal).is_ok())
                    .unwrap_or(false),
                _ => false,
            };
            if !accepted {
                errors.push(ctx.mismatch(data_type, value));
            }
            return;
        }

        let Some(resolved) = self.snapshot.get_type(name) else {
            errors.push(ctx.mismatch(data_type, value));
            return;
        };
        match value {
            Value::Reference(id) | Value::String(id) if !id.trim().is_empty() => {}
            Value::Struct(fields) => {
                let fields: BTreeMap<&str, &Value> =
                    fields.iter().map(|(k, v)| (k.as_str(), v)).collect();
                self.check_fields(resolved, &fields, errors);
            }
            other => errors.push(ctx.mismatch(data_type, other)),
        }
    }

    fn map_key_accepted(&self, key: &DataTypeRef, k: &str) -> bool {
        match key {
            DataTypeRef::Named(name) => self
                .snapshot
                .get_enum(name)
                .map_or(true, |e| e.contains(k)),
            _ => true,
        }
    }
}

struct Context<'a> {
    type_name: &'a str,
    attribute: &'a str,
}

impl Context<'_> {
    fn mismatch(&self, expected: &DataTypeRef, found: &Value) -> ValidationError {
        ValidationError::TypeMismatch {
            type_name: self.type_name.to_string(),
            attribute: self.attribute.to_string(),
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }

    fn multiplicity(&self, count: usize, expected: String) -> ValidationError {
        ValidationError::MultiplicityViolation {
            type_name: self.type_name.to_string(),
            attribute: self.attribute.to_string(),
            count,
            expected,
        }
    }
}

fn primitive_accepts(primitive: PrimitiveType, value: &Value) -> bool {
    match (primitive, value) {
        (PrimitiveType::Boolean, Value::Bool(_)) => true,
        (PrimitiveType::Byte, Value::Int(i)) => i8::try_from(*i).is_ok(),
        (PrimitiveType::Short, Value::Int(i)) => i16::try_from(*i).is_ok(),
        (PrimitiveType::Int, Value::Int(i)) => i32::try_from(*i).is_ok(),
        (PrimitiveType::Long | PrimitiveType::BigInteger, Value::Int(_)) => true,
        (PrimitiveType::BigInteger, Value::String(s)) => is_integer_literal(s),
        (PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::BigDecimal, Value::Int(_)) => {
            true
        }
        (PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::BigDecimal, Value::Float(f)) => {
            f.is_finite() || primitive != PrimitiveType::BigDecimal
        }
        (PrimitiveType::BigDecimal, Value::String(s)) => {
            s.parse::<f64>().map_or(false, |f| f.is_finite())
        }
        (PrimitiveType::Date, Value::Int(_)) => true,
        (PrimitiveType::Date, Value::String(s)) => {
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        }
        (PrimitiveType::String, Value::String(_)) => true,
        _ => false,
    }
}

fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn has_duplicates(elements: &[&Value]) -> bool {
    elements
        .iter()
        .enumerate()
        .any(|(i, a)| elements[..i].contains(a))
}
