use crate::discovery::ScannedEndpoint;
use crate::error::ExportError;
use crate::exporter::{example_body, sorted_endpoints};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema URL identifying the Postman collection format version
pub const POSTMAN_SCHEMA_URL: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Settings for a Postman export
#[derive(Debug, Clone)]
pub struct PostmanOptions {
    /// Collection name
    pub name: String,
    /// Variable holding the base URL, without braces
    pub base_url_variable: String,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for PostmanOptions {
    fn default() -> Self {
        Self {
            name: "Discovered API".to_string(),
            base_url_variable: "baseUrl".to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl PostmanOptions {
    /// All headers for a request, sorted by key; always includes `Content-Type`.
    pub fn request_headers(&self) -> Vec<PostmanHeader> {
        let mut headers = self.headers.clone();
        if !headers.keys().any(|key| key.eq_ignore_ascii_case("Content-Type")) {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        headers
            .into_iter()
            .map(|(key, value)| PostmanHeader {
                key,
                value,
                header_type: "text".to_string(),
            })
            .collect()
    }
}

/// Postman collection document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanCollection {
    pub info: PostmanInfo,
    pub item: Vec<PostmanItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanInfo {
    pub name: String,
    pub schema: String,
}

/// One request in the collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanItem {
    pub name: String,
    pub request: PostmanRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanRequest {
    pub method: String,
    pub header: Vec<PostmanHeader>,
    pub body: PostmanBody,
    pub url: PostmanUrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanHeader {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub header_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanBody {
    pub mode: String,
    pub raw: String,
    pub options: PostmanBodyOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanBodyOptions {
    pub raw: PostmanRawOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanRawOptions {
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanUrl {
    pub raw: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
}

/// Render scanned endpoints as a Postman collection.
///
/// # Errors
///
/// Fails if two endpoints share a method and path, or if an example body cannot be
/// rendered.
pub fn export_collection(
    endpoints: &[ScannedEndpoint],
    options: &PostmanOptions,
) -> Result<PostmanCollection, ExportError> {
    debug!("Exporting {} endpoints as Postman collection", endpoints.len());
    let headers = options.request_headers();
    let host = format!("{{{{{}}}}}", options.base_url_variable);

    let item = sorted_endpoints(endpoints)?
        .into_iter()
        .map(|endpoint| -> Result<PostmanItem, ExportError> {
            let raw = serde_json::to_string_pretty(&example_body(&endpoint.schema))?;
            let template = endpoint.template();
            Ok(PostmanItem {
                name: format!("{} {}", endpoint.method(), template),
                request: PostmanRequest {
                    method: endpoint.method().as_str().to_string(),
                    header: headers.clone(),
                    body: PostmanBody {
                        mode: "raw".to_string(),
                        raw,
                        options: PostmanBodyOptions {
                            raw: PostmanRawOptions {
                                language: "json".to_string(),
                            },
                        },
                    },
                    url: PostmanUrl {
                        raw: format!("{}{}", host, template),
                        host: vec![host.clone()],
                        path: url_path(template, endpoint.path().opaque),
                    },
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PostmanCollection {
        info: PostmanInfo {
            name: options.name.clone(),
            schema: POSTMAN_SCHEMA_URL.to_string(),
        },
        item,
    })
}

/// Non-empty path segments; an opaque marker stays a single element.
fn url_path(template: &str, opaque: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = template;
    while !rest.is_empty() {
        if opaque && rest.starts_with("<regexp:") {
            parts.push(rest.to_string());
            break;
        }
        let (part, tail) = rest.split_once('/').unwrap_or((rest, ""));
        if !part.is_empty() {
            parts.push(part.to_string());
        }
        rest = tail;
    }
    parts
}
