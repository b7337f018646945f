//! Canonical model built from a raw schema
//!
//! A raw schema is one of:
//! - a notation string, describing the whole value
//! - a one-element array, describing an array and each of its elements
//! - an object mapping property keys to notation strings or nested schemas
//!
//! The special keys `''`, `'[]'` and `'*'` become explicit [`Selector`]s here
//! so the validator never re-inspects key text. A leading backslash turns a
//! special key back into a literal property name.

use std::path::Path;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

use crate::cache::DecodeCache;
use crate::error::{Result, SchemaError};
use crate::notation::TypeDescriptor;

/// Which values of the input a model entry applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// The value itself (`''`)
    Whole,
    /// Each element of an array (`'[]'`)
    Elements,
    /// Every property value of an object (`'*'`)
    AllValues,
    /// A single named property
    Named(String),
}

impl Selector {
    /// Parse a schema key
    pub fn from_key(key: &str) -> Self {
        match key {
            "" => Selector::Whole,
            "[]" => Selector::Elements,
            "*" => Selector::AllValues,
            _ => match key.strip_prefix('\\') {
                Some(literal) => Selector::Named(literal.to_string()),
                None => Selector::Named(key.to_string()),
            },
        }
    }

    /// The key as it would be written in a schema
    pub fn key(&self) -> String {
        match self {
            Selector::Whole => String::new(),
            Selector::Elements => "[]".to_string(),
            Selector::AllValues => "*".to_string(),
            Selector::Named(name) => match name.as_str() {
                "" | "[]" | "*" => format!("\\{name}"),
                _ if name.starts_with('\\') => format!("\\{name}"),
                _ => name.clone(),
            },
        }
    }
}

/// What a selector is checked against
#[derive(Debug, Clone)]
pub enum ModelEntry {
    /// A decoded notation string
    Leaf(Arc<TypeDescriptor>),
    /// A nested raw schema, normalized when the validator descends into it
    Nested(Value),
}

impl Serialize for ModelEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ModelEntry::Leaf(descriptor) => descriptor.serialize(serializer),
            ModelEntry::Nested(raw) => raw.serialize(serializer),
        }
    }
}

/// Ordered selector to entry map
#[derive(Debug, Clone, Default)]
pub struct CanonicalModel {
    entries: Vec<(Selector, ModelEntry)>,
}

impl CanonicalModel {
    /// Normalize a raw schema, decoding notation strings through `cache`
    pub fn normalize(raw: &Value, cache: &DecodeCache) -> Result<Self> {
        let entries = match raw {
            Value::String(notation) => {
                vec![(Selector::Whole, ModelEntry::Leaf(cache.decode(notation, "")?))]
            }
            Value::Array(items) => {
                let [element] = items.as_slice() else {
                    return Err(SchemaError::unsupported(
                        "",
                        format!("array schema must have exactly one element, found {}", items.len()),
                    ));
                };
                vec![
                    (Selector::Whole, ModelEntry::Leaf(cache.decode("[]", "")?)),
                    (Selector::Elements, entry(element, "[]", cache)?),
                ]
            }
            Value::Object(properties) => properties
                .iter()
                .map(|(key, value)| Ok((Selector::from_key(key), entry(value, key, cache)?)))
                .collect::<Result<Vec<_>>>()?,
            other => {
                return Err(SchemaError::unsupported(
                    "",
                    format!("expected string, array or object, found {other}"),
                ))
            }
        };
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(Selector, ModelEntry)] {
        &self.entries
    }

    pub fn get(&self, selector: &Selector) -> Option<&ModelEntry> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == selector)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CanonicalModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (selector, entry) in &self.entries {
            map.serialize_entry(&selector.key(), entry)?;
        }
        map.end()
    }
}

fn entry(value: &Value, key: &str, cache: &DecodeCache) -> Result<ModelEntry> {
    match value {
        Value::String(notation) => Ok(ModelEntry::Leaf(cache.decode(notation, key)?)),
        Value::Object(_) | Value::Array(_) => Ok(ModelEntry::Nested(value.clone())),
        other => Err(SchemaError::unsupported(
            key,
            format!("property schema must be a string, object or array, found {other}"),
        )),
    }
}

/// Read a raw schema or definitions table from a JSON file
pub fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
