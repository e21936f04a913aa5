//! Data type names: built-in primitives, collections and named types.

use std::fmt;

/// Built-in primitive data types. These resolve without registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `biginteger`
    BigInteger,
    /// `bigdecimal`
    BigDecimal,
    /// `date`
    Date,
    /// `string`
    String,
}

impl PrimitiveType {
    /// Every primitive, in declaration order.
    pub const ALL: [PrimitiveType; 11] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
        PrimitiveType::BigInteger,
        PrimitiveType::BigDecimal,
        PrimitiveType::Date,
        PrimitiveType::String,
    ];

    /// The registered name of this primitive.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
            PrimitiveType::BigInteger => "biginteger",
            PrimitiveType::BigDecimal => "bigdecimal",
            PrimitiveType::Date => "date",
            PrimitiveType::String => "string",
        }
    }

    /// Look up a primitive by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Check if this type is integral.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Int
                | PrimitiveType::Long
                | PrimitiveType::BigInteger
        )
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || matches!(
                self,
                PrimitiveType::Float | PrimitiveType::Double | PrimitiveType::BigDecimal
            )
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<PrimitiveType> for String {
    fn from(primitive: PrimitiveType) -> Self {
        primitive.name().to_string()
    }
}

/// A parsed attribute data type name.
///
/// Names of the form `array<T>` and `map<K,V>` denote collections; anything
/// else that is not a primitive names an enum, class or trait.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataTypeRef {
    /// A built-in primitive.
    Primitive(PrimitiveType),
    /// An ordered collection of elements.
    Array(Box<DataTypeRef>),
    /// A key/value map.
    Map(Box<DataTypeRef>, Box<DataTypeRef>),
    /// A registered enum, class or trait.
    Named(String),
}

impl DataTypeRef {
    /// Parse a data type name. Malformed collection syntax is treated as a
    /// plain name, which then fails to resolve.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(primitive) = PrimitiveType::from_name(name) {
            return DataTypeRef::Primitive(primitive);
        }
        if let Some(inner) = strip_generic(name, "array") {
            return DataTypeRef::Array(Box::new(DataTypeRef::parse(inner)));
        }
        if let Some(inner) = strip_generic(name, "map") {
            if let Some((key, value)) = split_top_level(inner) {
                return DataTypeRef::Map(
                    Box::new(DataTypeRef::parse(key)),
                    Box::new(DataTypeRef::parse(value)),
                );
            }
        }
        DataTypeRef::Named(name.to_string())
    }

    /// Every registered type name this reference depends on.
    pub fn named_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            DataTypeRef::Primitive(_) => {}
            DataTypeRef::Array(element) => element.collect_names(out),
            DataTypeRef::Map(key, value) => {
                key.collect_names(out);
                value.collect_names(out);
            }
            DataTypeRef::Named(name) => out.push(name),
        }
    }

    /// Check if this is a collection (array or map).
    pub fn is_collection(&self) -> bool {
        matches!(self, DataTypeRef::Array(_) | DataTypeRef::Map(..))
    }

    /// The element type for arrays, or the type itself otherwise.
    pub fn element(&self) -> &DataTypeRef {
        match self {
            DataTypeRef::Array(element) => element,
            other => other,
        }
    }
}

impl fmt::Display for DataTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataTypeRef::Primitive(p) => write!(f, "{}", p),
            DataTypeRef::Array(element) => write!(f, "array<{}>", element),
            DataTypeRef::Map(key, value) => write!(f, "map<{},{}>", key, value),
            DataTypeRef::Named(name) => f.write_str(name),
        }
    }
}

fn strip_generic<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)?
        .trim_start()
        .strip_prefix('<')?
        .strip_suffix('>')
}

/// Split `K,V` at the comma that is not nested inside angle brackets.
fn split_top_level(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((&inner[..idx], &inner[idx + 1..])),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_lookup() {
        assert_eq!(PrimitiveType::from_name("string"), Some(PrimitiveType::String));
        assert_eq!(PrimitiveType::from_name("biginteger"), Some(PrimitiveType::BigInteger));
        assert_eq!(PrimitiveType::from_name("String"), None);

        assert!(PrimitiveType::Long.is_integral());
        assert!(PrimitiveType::Double.is_numeric());
        assert!(!PrimitiveType::Date.is_numeric());
    }

    #[test]
    fn test_primitive_into_string() {
        assert_eq!(String::from(PrimitiveType::BigDecimal), "bigdecimal");
        let name: String = PrimitiveType::Long.into();
        assert_eq!(name, "long");
    }

    #[test]
    fn test_parse_simple() {
        assert_eq!(DataTypeRef::parse("int"), DataTypeRef::Primitive(PrimitiveType::Int));
        assert_eq!(DataTypeRef::parse("Table"), DataTypeRef::Named("Table".into()));
    }

    #[test]
    fn test_parse_collections() {
        let array = DataTypeRef::parse("array<Column>");
        assert_eq!(
            array,
            DataTypeRef::Array(Box::new(DataTypeRef::Named("Column".into())))
        );
        assert!(array.is_collection());
        assert_eq!(array.element(), &DataTypeRef::Named("Column".into()));

        let map = DataTypeRef::parse("map<string,array<int>>");
        assert_eq!(map.to_string(), "map<string,array<int>>");
        assert!(map.named_references().is_empty());

        let nested = DataTypeRef::parse("map<string, array<Column>>");
        assert_eq!(nested.named_references(), vec!["Column"]);
    }

    #[test]
    fn test_malformed_collection_is_named() {
        assert_eq!(
            DataTypeRef::parse("map<string>"),
            DataTypeRef::Named("map<string>".into())
        );
        assert_eq!(
            DataTypeRef::parse("array<int"),
            DataTypeRef::Named("array<int".into())
        );
    }
}
