//! Exporters rendering scanned endpoints into interchange documents.
//!
//! Both exporters are pure and deterministic: endpoints are ordered by
//! `(path template, method)` before rendering, so exporting the same scan twice yields
//! identical documents.
//!
//! - **Postman**: see [`postman::export_collection`]
//! - **OpenAPI**: see [`openapi::export_document`]

pub mod openapi;
pub mod postman;

use crate::discovery::ScannedEndpoint;
use crate::error::ExportError;
use crate::schema::{CanonicalSchema, PrimitiveKind};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Order endpoints for rendering and reject duplicate operations.
pub fn sorted_endpoints(endpoints: &[ScannedEndpoint]) -> Result<Vec<&ScannedEndpoint>, ExportError> {
    let mut sorted: Vec<&ScannedEndpoint> = endpoints.iter().collect();
    sorted.sort_by(|a, b| {
        a.template()
            .cmp(b.template())
            .then_with(|| a.method().as_str().cmp(b.method().as_str()))
    });

    let mut seen = HashSet::new();
    for endpoint in &sorted {
        if !seen.insert((endpoint.method(), endpoint.template())) {
            return Err(ExportError::DuplicateOperation {
                method: endpoint.method().as_str().to_string(),
                path: endpoint.template().to_string(),
            });
        }
    }
    Ok(sorted)
}

/// Representative value for a canonical schema.
///
/// Returns `None` for `Optional` nodes, which are left out of generated examples.
pub fn example_value(schema: &CanonicalSchema) -> Option<Value> {
    match schema {
        CanonicalSchema::Primitive { primitive } => Some(match primitive {
            PrimitiveKind::String => Value::String(String::new()),
            PrimitiveKind::Number => Value::from(0),
            PrimitiveKind::Boolean => Value::Bool(false),
        }),
        CanonicalSchema::Array { .. } => Some(Value::Array(Vec::new())),
        CanonicalSchema::Enum { values } => Some(
            values
                .first()
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
        ),
        CanonicalSchema::Object { fields } => {
            let mut object = Map::new();
            for field in fields {
                if let Some(value) = example_value(&field.schema) {
                    object.insert(field.name.clone(), value);
                }
            }
            Some(Value::Object(object))
        }
        CanonicalSchema::Optional { .. } => None,
        CanonicalSchema::Union { variants } => Some(
            variants
                .iter()
                .find_map(example_value)
                .unwrap_or_else(|| Value::Object(Map::new())),
        ),
        CanonicalSchema::Unknown { .. } => Some(Value::Object(Map::new())),
    }
}

/// Example request body; a schema that yields no value renders as `{}`.
pub fn example_body(schema: &CanonicalSchema) -> Value {
    example_value(schema).unwrap_or_else(|| Value::Object(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string() -> CanonicalSchema {
        CanonicalSchema::primitive(PrimitiveKind::String)
    }

    #[test]
    fn test_example_for_primitives_and_collections() {
        assert_eq!(example_value(&string()), Some(json!("")));
        assert_eq!(
            example_value(&CanonicalSchema::primitive(PrimitiveKind::Number)),
            Some(json!(0))
        );
        assert_eq!(
            example_value(&CanonicalSchema::primitive(PrimitiveKind::Boolean)),
            Some(json!(false))
        );
        assert_eq!(example_value(&CanonicalSchema::array(string())), Some(json!([])));
        assert_eq!(
            example_value(&CanonicalSchema::Enum {
                values: vec!["a".to_string(), "b".to_string()]
            }),
            Some(json!("a"))
        );
    }

    #[test]
    fn test_example_omits_optional_fields() {
        let schema = CanonicalSchema::object([
            ("name", string()),
            ("age", CanonicalSchema::optional(CanonicalSchema::primitive(PrimitiveKind::Number))),
            (
                "address",
                CanonicalSchema::object([
                    ("city", string()),
                    ("zip", CanonicalSchema::optional(string())),
                ]),
            ),
        ]);
        assert_eq!(
            example_body(&schema),
            json!({ "name": "", "address": { "city": "" } })
        );
    }

    #[test]
    fn test_example_for_unknown_and_top_level_optional() {
        assert_eq!(example_body(&CanonicalSchema::unknown()), json!({}));
        assert_eq!(
            example_body(&CanonicalSchema::Unknown { validates: true }),
            json!({})
        );
        assert_eq!(example_body(&CanonicalSchema::optional(string())), json!({}));
    }

    #[test]
    fn test_example_for_union_uses_first_renderable_variant() {
        let schema = CanonicalSchema::Union {
            variants: vec![CanonicalSchema::optional(string()), CanonicalSchema::primitive(PrimitiveKind::Number)],
        };
        assert_eq!(example_value(&schema), Some(json!(0)));
    }
}
