use crate::discovery::ScannedEndpoint;
use crate::error::ExportError;
use crate::exporter::sorted_endpoints;
use crate::schema::{CanonicalSchema, PrimitiveKind};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// OpenAPI paths: path template -> lower-case method -> operation
pub type OpenApiPaths = BTreeMap<String, BTreeMap<String, Operation>>;

/// Settings for an OpenAPI export
#[derive(Debug, Clone)]
pub struct OpenApiOptions {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

impl Default for OpenApiOptions {
    fn default() -> Self {
        Self {
            title: "Discovered API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("API documentation discovered from the running route tree".to_string()),
        }
    }
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI Operation object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub summary: String,
    /// Request body, present when a schema was located
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, Response>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: JsonSchema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
}

/// JSON-schema-like structure for request bodies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, JsonSchema>>,
    /// Non-optional object fields, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchema>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<JsonSchema>>,
}

impl JsonSchema {
    fn of_type(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    pub paths: OpenApiPaths,
}

/// Incremental OpenAPI document builder
pub struct OpenApiBuilder {
    info: Info,
    paths: OpenApiPaths,
}

impl OpenApiBuilder {
    /// Create a builder with default info
    pub fn new() -> Self {
        Self::with_options(&OpenApiOptions::default())
    }

    pub fn with_options(options: &OpenApiOptions) -> Self {
        Self {
            info: Info {
                title: options.title.clone(),
                version: options.version.clone(),
                description: options.description.clone(),
            },
            paths: BTreeMap::new(),
        }
    }

    /// Add one endpoint as an operation.
    ///
    /// # Errors
    ///
    /// Fails if the same path and method were already added.
    pub fn add_endpoint(&mut self, endpoint: &ScannedEndpoint) -> Result<(), ExportError> {
        debug!("Adding operation: {} {}", endpoint.method(), endpoint.template());

        let path = if endpoint.path().opaque {
            endpoint.template().to_string()
        } else {
            Self::convert_path_format(endpoint.template())
        };

        let request_body = endpoint.has_schema().then(|| RequestBody {
            required: true,
            content: BTreeMap::from([(
                "application/json".to_string(),
                MediaType {
                    schema: to_json_schema(&endpoint.schema),
                },
            )]),
        });

        let operation = Operation {
            summary: format!("{} {}", endpoint.method(), endpoint.template()),
            request_body,
            responses: BTreeMap::from([(
                "200".to_string(),
                Response {
                    description: "Successful response".to_string(),
                },
            )]),
        };

        let path_item = self.paths.entry(path).or_default();
        let method = endpoint.method().as_lowercase().to_string();
        if path_item.contains_key(&method) {
            return Err(ExportError::DuplicateOperation {
                method: endpoint.method().as_str().to_string(),
                path: endpoint.template().to_string(),
            });
        }
        path_item.insert(method, operation);
        Ok(())
    }

    /// Convert `:param` segments to OpenAPI `{param}` form
    fn convert_path_format(path: &str) -> String {
        path.split('/')
            .map(|part| match part.strip_prefix(':') {
                Some(name) => format!("{{{}}}", name),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn build(self) -> OpenApiDocument {
        debug!("Building OpenAPI document with {} paths", self.paths.len());
        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            paths: self.paths,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a canonical schema to its JSON-schema form.
///
/// `Optional` contributes its inner schema; optionality shows up only in the parent's
/// `required` list.
pub fn to_json_schema(schema: &CanonicalSchema) -> JsonSchema {
    match schema {
        CanonicalSchema::Object { fields } => {
            let properties = fields
                .iter()
                .map(|field| (field.name.clone(), to_json_schema(&field.schema)))
                .collect();
            let required: Vec<String> = fields
                .iter()
                .filter(|field| !field.schema.is_optional())
                .map(|field| field.name.clone())
                .collect();
            JsonSchema {
                schema_type: Some("object".to_string()),
                properties: Some(properties),
                required: (!required.is_empty()).then_some(required),
                ..JsonSchema::default()
            }
        }
        CanonicalSchema::Array { element } => JsonSchema {
            schema_type: Some("array".to_string()),
            items: Some(Box::new(to_json_schema(element))),
            ..JsonSchema::default()
        },
        CanonicalSchema::Primitive { primitive } => JsonSchema::of_type(match primitive {
            PrimitiveKind::String => "string",
            PrimitiveKind::Number => "number",
            PrimitiveKind::Boolean => "boolean",
        }),
        CanonicalSchema::Enum { values } => JsonSchema {
            schema_type: Some("string".to_string()),
            enum_values: Some(values.clone()),
            ..JsonSchema::default()
        },
        CanonicalSchema::Optional { inner } => to_json_schema(inner),
        CanonicalSchema::Union { variants } => JsonSchema {
            one_of: Some(variants.iter().map(to_json_schema).collect()),
            ..JsonSchema::default()
        },
        CanonicalSchema::Unknown { .. } => JsonSchema::of_type("object"),
    }
}

/// Render scanned endpoints as an OpenAPI document.
pub fn export_document(
    endpoints: &[ScannedEndpoint],
    options: &OpenApiOptions,
) -> Result<OpenApiDocument, ExportError> {
    let mut builder = OpenApiBuilder::with_options(options);
    for endpoint in sorted_endpoints(endpoints)? {
        builder.add_endpoint(endpoint)?;
    }
    Ok(builder.build())
}

/// Render only the `paths` section.
pub fn export_paths(endpoints: &[ScannedEndpoint]) -> Result<OpenApiPaths, ExportError> {
    Ok(export_document(endpoints, &OpenApiOptions::default())?.paths)
}
