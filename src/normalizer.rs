//! Normalization of library-specific schema objects into [`CanonicalSchema`].
//!
//! Recognizers are pure shape tests tried in a fixed order; the first one that accepts a
//! raw object produces the canonical node. Supporting another validation library means
//! appending a recognizer to [`RECOGNIZERS`].
//!
//! Recursion is bounded: past the configured depth every node becomes
//! `Unknown { validates: false }`, which is how self-referential (lazy) schemas terminate.

use crate::error::HostError;
use crate::host::{HostObject, HostValue};
use crate::locator::{can_validate, has_key_index};
use crate::schema::{CanonicalSchema, PrimitiveKind};
use log::debug;

/// Default bound on schema nesting
pub const DEFAULT_MAX_SCHEMA_DEPTH: usize = 32;

/// Type tags of wrappers that make their inner schema optional-like.
const WRAPPER_TYPE_NAMES: &[&str] = &[
    "ZodOptional",
    "ZodNullable",
    "ZodDefault",
    "ZodEffects",
    "ZodCatch",
    "ZodBranded",
    "ZodReadonly",
];

type Recognizer =
    fn(&SchemaNormalizer, &HostObject, usize) -> Result<Option<CanonicalSchema>, HostError>;

/// Shape recognizers, in the order they are tried.
const RECOGNIZERS: &[(&str, Recognizer)] = &[
    ("wrapper", recognize_wrapper),
    ("lazy", recognize_lazy),
    ("object", recognize_object),
    ("enum", recognize_enum),
    ("array", recognize_array),
    ("union", recognize_union),
    ("primitive", recognize_primitive),
    ("keyed object", recognize_keyed_object),
    ("keyed array", recognize_keyed_array),
    ("keyed primitive", recognize_keyed_primitive),
    ("validating", recognize_validating),
];

/// Converts raw schema objects into the canonical model.
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    max_depth: usize,
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaNormalizer {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_SCHEMA_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Normalize a located schema. Never fails.
    pub fn normalize(&self, raw: &HostValue) -> CanonicalSchema {
        self.normalize_at(raw, 0)
    }

    /// Normalize a schema found `depth` levels below the root.
    pub fn normalize_at(&self, raw: &HostValue, depth: usize) -> CanonicalSchema {
        if depth > self.max_depth {
            debug!("Schema depth {} exceeds {}, truncating", depth, self.max_depth);
            return CanonicalSchema::unknown();
        }

        let obj = match raw.resolve() {
            Ok(HostValue::Object(obj)) => obj,
            Ok(other) => {
                debug!("Cannot normalize a {}", other.kind());
                return CanonicalSchema::unknown();
            }
            Err(e) => {
                debug!("Schema could not be read: {}", e);
                return CanonicalSchema::unknown();
            }
        };

        for (name, recognize) in RECOGNIZERS {
            match recognize(self, &obj, depth) {
                Ok(Some(schema)) => return schema,
                Ok(None) => {}
                Err(e) => debug!("Recognizer '{}' failed: {}", name, e),
            }
        }

        CanonicalSchema::unknown()
    }

    /// Normalize each member of a field map, keeping declaration order.
    fn normalize_members(&self, shape: &HostObject, depth: usize) -> CanonicalSchema {
        let members: Vec<(String, CanonicalSchema)> = shape
            .keys()
            .map(|key| {
                let schema = match shape.get(key) {
                    Ok(Some(member)) => self.normalize_at(&member, depth + 1),
                    Ok(None) => CanonicalSchema::unknown(),
                    Err(e) => {
                        debug!("Field '{}' could not be read: {}", key, e);
                        CanonicalSchema::unknown()
                    }
                };
                (key.to_string(), schema)
            })
            .collect();
        CanonicalSchema::object(members)
    }
}

/// `_def.typeName`, when present
fn type_name(obj: &HostObject) -> Result<Option<String>, HostError> {
    match obj.get_object("_def")? {
        Some(def) => def.get_str("typeName"),
        None => Ok(None),
    }
}

fn definition(obj: &HostObject) -> Result<Option<HostObject>, HostError> {
    obj.get_object("_def")
}

/// Resolve a field map that may be exposed directly or through a zero-argument accessor.
fn field_map(value: HostValue) -> Result<Option<HostObject>, HostError> {
    match value {
        HostValue::Object(obj) => Ok(Some(obj)),
        HostValue::Function(_) => Ok(value.call(&[])?.as_object().cloned()),
        _ => Ok(None),
    }
}

fn recognize_wrapper(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    let Some(def) = definition(obj)? else {
        return Ok(None);
    };
    let is_wrapper = match def.get_str("typeName")? {
        Some(name) => WRAPPER_TYPE_NAMES.contains(&name.as_str()),
        None => def.get("innerType")?.is_some(),
    };
    if !is_wrapper {
        return Ok(None);
    }

    let inner = match def.get("innerType")? {
        Some(inner) => Some(inner),
        None => match def.get("schema")? {
            Some(inner) => Some(inner),
            None => def.get("type")?,
        },
    };
    let inner = inner
        .map(|inner| normalizer.normalize_at(&inner, depth + 1))
        .unwrap_or_else(CanonicalSchema::unknown);
    Ok(Some(CanonicalSchema::optional(inner)))
}

fn recognize_lazy(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    if type_name(obj)?.as_deref() != Some("ZodLazy") {
        return Ok(None);
    }
    let Some(def) = definition(obj)? else {
        return Ok(None);
    };
    let resolved = match def.get("getter")? {
        Some(getter) => getter.call(&[])?,
        None => return Ok(Some(CanonicalSchema::unknown())),
    };
    Ok(Some(normalizer.normalize_at(&resolved, depth + 1)))
}

fn recognize_object(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    let shape = match obj.get("shape")? {
        Some(shape) => Some(shape),
        None => match definition(obj)? {
            Some(def) => def.get("shape")?,
            None => None,
        },
    };
    let Some(shape) = shape else {
        return Ok(None);
    };
    match field_map(shape)? {
        Some(fields) => Ok(Some(normalizer.normalize_members(&fields, depth))),
        None => Ok(None),
    }
}

fn recognize_enum(
    _normalizer: &SchemaNormalizer,
    obj: &HostObject,
    _depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    let values = match definition(obj)? {
        Some(def) => def.get("values")?,
        None => None,
    };
    let values = match values {
        Some(values) => Some(values),
        None => obj.get("values")?,
    };
    let Some(HostValue::Array(items)) = values else {
        return Ok(None);
    };

    let values = items
        .iter()
        .filter_map(|item| match item {
            HostValue::String(s) => Some(s.clone()),
            HostValue::Number(n) => Some(n.to_string()),
            HostValue::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .collect();
    Ok(Some(CanonicalSchema::Enum { values }))
}

fn recognize_array(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    if type_name(obj)?.as_deref() != Some("ZodArray") {
        return Ok(None);
    }
    let element = match definition(obj)? {
        Some(def) => def.get("type")?,
        None => None,
    };
    let element = element
        .map(|element| normalizer.normalize_at(&element, depth + 1))
        .unwrap_or_else(CanonicalSchema::unknown);
    Ok(Some(CanonicalSchema::array(element)))
}

fn recognize_union(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    match type_name(obj)?.as_deref() {
        Some("ZodUnion") | Some("ZodDiscriminatedUnion") => {}
        _ => return Ok(None),
    }
    let options = match definition(obj)? {
        Some(def) => def.get("options")?,
        None => None,
    };
    let variants = match options {
        Some(HostValue::Array(options)) => options
            .iter()
            .map(|option| normalizer.normalize_at(option, depth + 1))
            .collect(),
        _ => Vec::new(),
    };
    Ok(Some(CanonicalSchema::Union { variants }))
}

fn recognize_primitive(
    _normalizer: &SchemaNormalizer,
    obj: &HostObject,
    _depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    let kind = match type_name(obj)?.as_deref() {
        Some("ZodString") | Some("ZodDate") => PrimitiveKind::String,
        Some("ZodNumber") | Some("ZodBigInt") => PrimitiveKind::Number,
        Some("ZodBoolean") => PrimitiveKind::Boolean,
        _ => return Ok(None),
    };
    Ok(Some(CanonicalSchema::primitive(kind)))
}

/// Schemas that carry a library marker, a type string and a key index.
fn keyed_type(obj: &HostObject) -> Result<Option<String>, HostError> {
    if !obj.is_flag_set("isJoi")? {
        return Ok(None);
    }
    obj.get_str("type")
}

fn recognize_keyed_object(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    if keyed_type(obj)?.as_deref() != Some("object") || !has_key_index(obj)? {
        return Ok(None);
    }
    let by_key = match obj.get_object("_ids")? {
        Some(ids) => ids.get_object("_byKey")?,
        None => None,
    };
    let by_key = match by_key {
        Some(by_key) => by_key,
        None => match obj.get_object("keys")? {
            Some(keys) => keys,
            None => return Ok(Some(CanonicalSchema::Object { fields: Vec::new() })),
        },
    };

    let members: Vec<(String, CanonicalSchema)> = by_key
        .keys()
        .map(|key| {
            let schema = match by_key.get(key) {
                Ok(Some(entry)) => keyed_member(normalizer, &entry, depth),
                Ok(None) => CanonicalSchema::unknown(),
                Err(e) => {
                    debug!("Key '{}' could not be read: {}", key, e);
                    CanonicalSchema::unknown()
                }
            };
            (key.to_string(), schema)
        })
        .collect();
    Ok(Some(CanonicalSchema::object(members)))
}

/// A key index entry is either `{ schema, id }` or the schema itself.
fn keyed_member(normalizer: &SchemaNormalizer, entry: &HostValue, depth: usize) -> CanonicalSchema {
    let member = match entry.as_object().map(|obj| obj.get("schema")) {
        Some(Ok(Some(schema))) => schema,
        Some(Err(e)) => {
            debug!("Key entry schema could not be read: {}", e);
            return CanonicalSchema::unknown();
        }
        _ => entry.clone(),
    };

    let schema = normalizer.normalize_at(&member, depth + 1);
    let presence = member
        .as_object()
        .and_then(|obj| obj.get_object("_flags").ok().flatten())
        .and_then(|flags| flags.get_str("presence").ok().flatten());
    if presence.as_deref() == Some("optional") {
        CanonicalSchema::optional(schema)
    } else {
        schema
    }
}

fn recognize_keyed_array(
    normalizer: &SchemaNormalizer,
    obj: &HostObject,
    depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    if keyed_type(obj)?.as_deref() != Some("array") {
        return Ok(None);
    }
    let first_item = match obj.get_object("$_terms")? {
        Some(terms) => match terms.get("items")? {
            Some(HostValue::Array(items)) => items.first().cloned(),
            _ => None,
        },
        None => None,
    };
    let element = first_item
        .map(|item| normalizer.normalize_at(&item, depth + 1))
        .unwrap_or_else(CanonicalSchema::unknown);
    Ok(Some(CanonicalSchema::array(element)))
}

fn recognize_keyed_primitive(
    _normalizer: &SchemaNormalizer,
    obj: &HostObject,
    _depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    let kind = match keyed_type(obj)?.as_deref() {
        Some("string") | Some("date") => PrimitiveKind::String,
        Some("number") => PrimitiveKind::Number,
        Some("boolean") => PrimitiveKind::Boolean,
        _ => return Ok(None),
    };
    Ok(Some(CanonicalSchema::primitive(kind)))
}

fn recognize_validating(
    _normalizer: &SchemaNormalizer,
    obj: &HostObject,
    _depth: usize,
) -> Result<Option<CanonicalSchema>, HostError> {
    if can_validate(obj) {
        Ok(Some(CanonicalSchema::Unknown { validates: true }))
    } else {
        Ok(None)
    }
}
