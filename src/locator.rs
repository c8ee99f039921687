//! Locating validation schemas attached to route handlers.
//!
//! Validation libraries and the middleware wrapping them attach schemas in different
//! places. [`SchemaLocator`] runs a fixed, ordered list of probes over a handler chain and
//! returns the first hit. A probe that fails while reading host properties counts as a
//! miss; locating never aborts a scan.

use crate::error::HostError;
use crate::host::{HostObject, HostValue};
use crate::walker::HandlerRef;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Caller-supplied last-resort extractor.
///
/// Receives the raw handler and returns a schema mapping, or `None` when it has nothing.
pub type SchemaExtractor =
    Arc<dyn Fn(&HostValue) -> Result<Option<HostValue>, HostError> + Send + Sync>;

/// Wrap a closure as a [`SchemaExtractor`].
pub fn extractor_fn<F>(f: F) -> SchemaExtractor
where
    F: Fn(&HostValue) -> Result<Option<HostValue>, HostError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Where a schema was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaSource {
    /// `handler.zodSchema`
    Direct,
    /// `handler.schema` or `handler.schema.zodSchema`
    SchemaProperty,
    /// `handler.params.zodSchema`
    Params,
    /// `handler.validator.schema`
    Validator,
    /// `handler.bodySchema`
    BodySchema,
    /// Any own property of the handler that looks like a schema
    PropertyScan,
    /// The caller-supplied extractor
    CustomExtractor,
}

impl fmt::Display for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaSource::Direct => "direct",
            SchemaSource::SchemaProperty => "schema property",
            SchemaSource::Params => "params",
            SchemaSource::Validator => "validator",
            SchemaSource::BodySchema => "body schema",
            SchemaSource::PropertyScan => "property scan",
            SchemaSource::CustomExtractor => "custom extractor",
        };
        f.write_str(name)
    }
}

/// A raw schema together with where it was found.
#[derive(Debug, Clone)]
pub struct LocatedSchema {
    pub source: SchemaSource,
    pub raw: HostValue,
}

type Probe = fn(&HostObject) -> Result<Option<HostValue>, HostError>;

/// Built-in probes, in priority order.
const PROBES: &[(SchemaSource, Probe)] = &[
    (SchemaSource::Direct, probe_direct),
    (SchemaSource::SchemaProperty, probe_schema_property),
    (SchemaSource::Params, probe_params),
    (SchemaSource::Validator, probe_validator),
    (SchemaSource::BodySchema, probe_body_schema),
    (SchemaSource::PropertyScan, probe_property_scan),
];

/// Schema locator with an optional custom extractor.
#[derive(Clone, Default)]
pub struct SchemaLocator {
    extractor: Option<SchemaExtractor>,
}

impl SchemaLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extractor(extractor: Option<SchemaExtractor>) -> Self {
        Self { extractor }
    }

    /// Find the schema for a handler chain.
    ///
    /// Probes run in priority order. Each probe looks at the terminal handler first and
    /// then at the enclosing handlers, nearest first. The custom extractor runs only after
    /// every built-in probe missed.
    pub fn locate(&self, chain: &[HandlerRef]) -> Option<LocatedSchema> {
        for (source, probe) in PROBES {
            for handler in chain.iter().rev() {
                let Some(obj) = handler.handler.as_object() else {
                    continue;
                };
                match probe(obj) {
                    Ok(Some(raw)) => {
                        debug!("Schema found via {} on node {}", source, handler.node);
                        return Some(LocatedSchema {
                            source: *source,
                            raw,
                        });
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Probe '{}' failed on node {}: {}", source, handler.node, e),
                }
            }
        }

        if let Some(extractor) = &self.extractor {
            for handler in chain.iter().rev() {
                match extractor(&handler.handler) {
                    Ok(Some(raw)) if raw.as_object().is_some() => {
                        debug!("Schema found via custom extractor on node {}", handler.node);
                        return Some(LocatedSchema {
                            source: SchemaSource::CustomExtractor,
                            raw,
                        });
                    }
                    Ok(Some(other)) => debug!(
                        "Custom extractor returned a {} on node {}, ignoring",
                        other.kind(),
                        handler.node
                    ),
                    Ok(None) => {}
                    Err(e) => debug!("Custom extractor failed on node {}: {}", handler.node, e),
                }
            }
        }

        None
    }
}

/// Structural test for "this object is a validation schema".
///
/// Matches an internal definition descriptor (`_def`), an explicit library marker
/// (`isJoi: true`), or a type tag combined with a key index (`type` plus `_ids` or `keys`).
pub fn looks_like_schema(obj: &HostObject) -> Result<bool, HostError> {
    if obj.get_object("_def")?.is_some() {
        return Ok(true);
    }
    if obj.is_flag_set("isJoi")? {
        return Ok(true);
    }
    Ok(obj.get_str("type")?.is_some() && has_key_index(obj)?)
}

/// True when the object carries a key index (`_ids` or `keys`)
pub(crate) fn has_key_index(obj: &HostObject) -> Result<bool, HostError> {
    Ok(obj.get_object("_ids")?.is_some() || obj.get_object("keys")?.is_some())
}

/// True when the object can validate input on its own
pub(crate) fn can_validate(obj: &HostObject) -> bool {
    obj.has_function("parse") || obj.has_function("safeParse") || obj.has_function("validate")
}

fn object_at(obj: &HostObject, key: &str) -> Result<Option<HostValue>, HostError> {
    Ok(obj.get_object(key)?.map(HostValue::Object))
}

fn nested_object(obj: &HostObject, outer: &str, inner: &str) -> Result<Option<HostValue>, HostError> {
    match obj.get_object(outer)? {
        Some(container) => object_at(&container, inner),
        None => Ok(None),
    }
}

fn probe_direct(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    object_at(handler, "zodSchema")
}

fn probe_schema_property(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    let Some(schema) = handler.get_object("schema")? else {
        return Ok(None);
    };
    if looks_like_schema(&schema)? || can_validate(&schema) {
        return Ok(Some(HostValue::Object(schema)));
    }
    object_at(&schema, "zodSchema")
}

fn probe_params(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    nested_object(handler, "params", "zodSchema")
}

fn probe_validator(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    nested_object(handler, "validator", "schema")
}

fn probe_body_schema(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    object_at(handler, "bodySchema")
}

fn probe_property_scan(handler: &HostObject) -> Result<Option<HostValue>, HostError> {
    for key in handler.keys() {
        // one unreadable property must not hide the others
        let candidate = match handler.get_object(key) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => continue,
            Err(e) => {
                debug!("Skipping unreadable property '{}': {}", key, e);
                continue;
            }
        };
        if looks_like_schema(&candidate).unwrap_or(false) {
            debug!("Property '{}' looks like a schema", key);
            return Ok(Some(HostValue::Object(candidate)));
        }
    }
    Ok(None)
}
