use serde::{Deserialize, Serialize};

/// Primitive kinds of the canonical schema model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveKind {
    String,
    Number,
    Boolean,
}

/// A named member of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub schema: CanonicalSchema,
    pub required: bool,
}

/// Library-independent description of a validation schema.
///
/// Every supported validation library is normalized into this one recursive type.
/// Object fields keep the order in which the source schema declared them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CanonicalSchema {
    Object { fields: Vec<SchemaField> },
    Array { element: Box<CanonicalSchema> },
    Primitive { primitive: PrimitiveKind },
    Enum { values: Vec<String> },
    Optional { inner: Box<CanonicalSchema> },
    Union { variants: Vec<CanonicalSchema> },
    /// Nothing recognizable; `validates` records whether the source could still parse input
    Unknown { validates: bool },
}

impl CanonicalSchema {
    pub fn unknown() -> Self {
        CanonicalSchema::Unknown { validates: false }
    }

    pub fn primitive(primitive: PrimitiveKind) -> Self {
        CanonicalSchema::Primitive { primitive }
    }

    pub fn array(element: CanonicalSchema) -> Self {
        CanonicalSchema::Array {
            element: Box::new(element),
        }
    }

    /// Wrap in `Optional` unless the schema already is one.
    pub fn optional(inner: CanonicalSchema) -> Self {
        if inner.is_optional() {
            inner
        } else {
            CanonicalSchema::Optional {
                inner: Box::new(inner),
            }
        }
    }

    /// Build an object; each field is required unless its schema is `Optional`.
    pub fn object<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, CanonicalSchema)>,
        K: Into<String>,
    {
        let fields = members
            .into_iter()
            .map(|(name, schema)| SchemaField {
                name: name.into(),
                required: !schema.is_optional(),
                schema,
            })
            .collect();
        CanonicalSchema::Object { fields }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, CanonicalSchema::Optional { .. })
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, CanonicalSchema::Unknown { .. })
    }

    /// Look up an object field by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        match self {
            CanonicalSchema::Object { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    /// Names of required object fields, in declaration order
    pub fn required_fields(&self) -> Vec<&str> {
        match self {
            CanonicalSchema::Object { fields } => fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_does_not_double_wrap() {
        let once = CanonicalSchema::optional(CanonicalSchema::primitive(PrimitiveKind::String));
        let twice = CanonicalSchema::optional(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_object_required_follows_optional() {
        let schema = CanonicalSchema::object([
            ("name", CanonicalSchema::primitive(PrimitiveKind::String)),
            (
                "age",
                CanonicalSchema::optional(CanonicalSchema::primitive(PrimitiveKind::Number)),
            ),
        ]);
        assert!(schema.field("name").unwrap().required);
        assert!(!schema.field("age").unwrap().required);
        assert_eq!(schema.required_fields(), vec!["name"]);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let value = serde_json::to_value(CanonicalSchema::unknown()).unwrap();
        assert_eq!(value, serde_json::json!({ "kind": "unknown", "validates": false }));
    }
}
