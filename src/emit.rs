//! JSON Schema emission
//!
//! Converts a raw schema into a Draft 7 JSON Schema document. The mapping is
//! best effort: `'*'` becomes a `patternProperties` entry matching every
//! name. References keep their `#/a/b` pointers and every referenced
//! definition is emitted at that same path in the document, so the pointers
//! resolve without rewriting.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cache::DecodeCache;
use crate::error::{Result, SchemaError};
use crate::model::{CanonicalModel, ModelEntry, Selector};
use crate::notation::{Kind, TypeDescriptor};
use crate::resolve::resolve;

/// Emit a JSON Schema for `schema`, decoding through `cache`.
///
/// Referenced definitions are looked up in `definitions`; a reference that
/// does not resolve is an [`SchemaError::UnsupportedSchema`].
pub fn json_schema(
    schema: &Value,
    definitions: Option<&Value>,
    cache: &DecodeCache,
) -> Result<Value> {
    let mut emitter = Emitter {
        cache,
        pending: Vec::new(),
    };
    let model = CanonicalModel::normalize(schema, cache)?;
    let mut out = emitter.model_schema(&model)?;
    if schema.is_object() {
        out.insert("type".to_string(), json!("object"));
    }

    for (key, target) in emitter.embed_references(definitions)? {
        if out.contains_key(&key) {
            return Err(SchemaError::unsupported(
                format!("#/{key}"),
                "reference target collides with an emitted keyword",
            ));
        }
        out.insert(key, target);
    }

    out.insert(
        "$schema".to_string(),
        json!("http://json-schema.org/draft-07/schema#"),
    );
    Ok(Value::Object(out))
}

struct Emitter<'a> {
    cache: &'a DecodeCache,
    /// Reference paths seen while emitting, not yet embedded
    pending: Vec<Vec<String>>,
}

impl Emitter<'_> {
    fn model_schema(&mut self, model: &CanonicalModel) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (selector, entry) in model.entries() {
            let schema = self.entry_schema(entry)?;
            match selector {
                Selector::Whole => {
                    if let Value::Object(whole) = schema {
                        out.extend(whole);
                    }
                }
                Selector::Elements => {
                    out.insert("items".to_string(), schema);
                }
                Selector::AllValues => {
                    out.insert("patternProperties".to_string(), json!({ "": schema }));
                }
                Selector::Named(name) => {
                    let optional = matches!(entry, ModelEntry::Leaf(d) if d.optional);
                    if !optional {
                        required.push(Value::String(name.clone()));
                    }
                    properties.insert(name.clone(), schema);
                }
            }
        }

        if !properties.is_empty() {
            out.insert("properties".to_string(), Value::Object(properties));
        }
        if !required.is_empty() {
            out.insert("required".to_string(), Value::Array(required));
        }
        Ok(out)
    }

    fn entry_schema(&mut self, entry: &ModelEntry) -> Result<Value> {
        match entry {
            ModelEntry::Leaf(descriptor) => {
                if let Some(segments) = &descriptor.reference {
                    self.pending.push(segments.clone());
                }
                Ok(descriptor_schema(descriptor))
            }
            ModelEntry::Nested(raw) => self.raw_schema(raw).map(Value::Object),
        }
    }

    fn raw_schema(&mut self, raw: &Value) -> Result<Map<String, Value>> {
        let nested = CanonicalModel::normalize(raw, self.cache)?;
        let mut schema = self.model_schema(&nested)?;
        if raw.is_object() {
            schema.insert("type".to_string(), json!("object"));
        }
        Ok(schema)
    }

    /// Emit every referenced definition, following references they contain
    fn embed_references(&mut self, definitions: Option<&Value>) -> Result<Map<String, Value>> {
        let mut embedded = Map::new();
        let mut seen = HashSet::new();

        while let Some(segments) = self.pending.pop() {
            if !seen.insert(segments.clone()) {
                continue;
            }
            let pointer = format!("#/{}", segments.join("/"));
            let target = definitions
                .and_then(|defs| resolve(&segments, defs))
                .ok_or_else(|| {
                    SchemaError::unsupported(&pointer, "reference not found in definitions")
                })?;
            debug!(%pointer, "embedding referenced definition");
            let schema = self.raw_schema(target)?;
            place(&mut embedded, &segments, Value::Object(schema), &pointer)?;
        }
        Ok(embedded)
    }
}

/// Insert `schema` at the path named by `segments`, creating parents
fn place(
    root: &mut Map<String, Value>,
    segments: &[String],
    schema: Value,
    pointer: &str,
) -> Result<()> {
    let collision = || SchemaError::unsupported(pointer, "reference target overlaps another");
    let Some((last, parents)) = segments.split_last() else {
        return Err(SchemaError::unsupported(pointer, "reference to the whole definitions table"));
    };

    let mut node = root;
    for segment in parents {
        node = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(collision)?;
    }
    if node.contains_key(last) {
        return Err(collision());
    }
    node.insert(last.clone(), schema);
    Ok(())
}

/// JSON Schema for a single descriptor
pub fn descriptor_schema(descriptor: &TypeDescriptor) -> Value {
    let mut out = Map::new();
    match (descriptor.kind, descriptor.nullable) {
        (Kind::Variable, _) => {}
        (Kind::Undefined, true) => {
            out.insert("type".to_string(), json!("null"));
        }
        (Kind::Undefined, false) => {
            out.insert("not".to_string(), json!({}));
        }
        (kind, true) if kind != Kind::Null => {
            out.insert("type".to_string(), json!([kind.name(), "null"]));
        }
        (kind, _) => {
            out.insert("type".to_string(), json!(kind.name()));
        }
    }

    match descriptor.kind {
        Kind::Number | Kind::Integer => {
            if let Some(min) = descriptor.min {
                out.insert("exclusiveMinimum".to_string(), json!(min));
            }
            if let Some(max) = descriptor.max {
                out.insert("exclusiveMaximum".to_string(), json!(max));
            }
        }
        Kind::String => insert_length(&mut out, descriptor, "minLength", "maxLength"),
        Kind::Array => insert_length(&mut out, descriptor, "minItems", "maxItems"),
        _ => {}
    }

    if !descriptor.enum_values.is_empty() {
        let mut members = descriptor.enum_values.clone();
        if descriptor.nullable && !members.contains(&Value::Null) {
            members.push(Value::Null);
        }
        out.insert("enum".to_string(), Value::Array(members));
    }

    let Some(pointer) = descriptor.reference_pointer() else {
        return Value::Object(out);
    };
    // Draft 7 ignores keywords next to `$ref`
    let target = json!({ "$ref": pointer });
    let checked = if out.is_empty() {
        target
    } else {
        json!({ "allOf": [Value::Object(out), target] })
    };
    // null passes a nullable reference without reaching the definition
    if descriptor.nullable {
        json!({ "anyOf": [{ "type": "null" }, checked] })
    } else {
        checked
    }
}

/// Exclusive length bounds become inclusive item/length counts
fn insert_length(out: &mut Map<String, Value>, descriptor: &TypeDescriptor, min_key: &str, max_key: &str) {
    if let Some(min) = descriptor.min {
        out.insert(min_key.to_string(), json!((min.floor() as u64).saturating_add(1)));
    }
    if let Some(max) = descriptor.max {
        out.insert(max_key.to_string(), json!((max.ceil() as u64).saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation::decode;

    #[test]
    fn test_descriptor_types() {
        assert_eq!(descriptor_schema(&decode("$", "").unwrap()), json!({"type": "string"}));
        assert_eq!(
            descriptor_schema(&decode("0-", "").unwrap()),
            json!({"type": ["integer", "null"]})
        );
        assert_eq!(descriptor_schema(&decode("*", "").unwrap()), json!({}));
        assert_eq!(descriptor_schema(&decode("~", "").unwrap()), json!({"not": {}}));
    }

    #[test]
    fn test_length_bounds_become_inclusive() {
        let schema = descriptor_schema(&decode("$>4<10", "").unwrap());
        assert_eq!(schema["minLength"], 5);
        assert_eq!(schema["maxLength"], 9);
    }

    #[test]
    fn test_reference_pointer() {
        assert_eq!(
            descriptor_schema(&decode("*(#/defs/inner)", "").unwrap()),
            json!({"$ref": "#/defs/inner"})
        );
        let schema = descriptor_schema(&decode("{(#/defs/inner)}", "").unwrap());
        assert_eq!(schema["allOf"][1]["$ref"], "#/defs/inner");
    }

    #[test]
    fn test_object_required_and_items() {
        let cache = DecodeCache::new();
        let schema = json_schema(&json!({"a": "$", "b": "#?", "c": ["0"]}), None, &cache).unwrap();
        assert_eq!(schema["required"], json!(["a", "c"]));
        assert_eq!(schema["properties"]["c"]["type"], "array");
        assert_eq!(schema["properties"]["c"]["items"]["type"], "integer");
    }

    #[test]
    fn test_huge_length_bounds_saturate() {
        let schema = descriptor_schema(&decode("$>99999999999999999999", "").unwrap());
        assert_eq!(schema["minLength"], u64::MAX);

        let schema = descriptor_schema(&decode("[<99999999999999999999", "").unwrap());
        assert_eq!(schema["maxItems"], u64::MAX - 1);

        let schema = descriptor_schema(&decode("$<0", "").unwrap());
        assert_eq!(schema["maxLength"], 0);
    }

    #[test]
    fn test_nullable_reference_admits_null() {
        let schema = descriptor_schema(&decode("{-(#/defs/inner)}", "").unwrap());
        assert_eq!(schema["anyOf"][0], json!({"type": "null"}));
        assert_eq!(schema["anyOf"][1]["allOf"][1]["$ref"], "#/defs/inner");
    }

    #[test]
    fn test_references_embed_definitions_at_pointer() {
        let cache = DecodeCache::new();
        let defs = json!({"defs": {"inner": {"c": "$(#/defs/leaf)"}, "leaf": "$>0", "unused": "#"}});
        let schema = json_schema(&json!({"c": "{(#/defs/inner)}"}), Some(&defs), &cache).unwrap();

        assert_eq!(schema["defs"]["inner"]["type"], "object");
        assert_eq!(schema["defs"]["inner"]["properties"]["c"]["allOf"][1]["$ref"], "#/defs/leaf");
        assert_eq!(schema["defs"]["leaf"], json!({"type": "string", "minLength": 1}));
        assert!(schema["defs"].get("unused").is_none());
    }

    #[test]
    fn test_unresolved_reference_is_an_error() {
        let cache = DecodeCache::new();
        let err = json_schema(&json!({"c": "$(#/defs/gone)"}), None, &cache).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedSchema { ref path, .. } if path == "#/defs/gone"));
    }

    #[test]
    fn test_reference_colliding_with_keyword_is_an_error() {
        let cache = DecodeCache::new();
        let defs = json!({"properties": {"x": "$"}});
        let err = json_schema(&json!({"c": "$(#/properties/x)"}), Some(&defs), &cache).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedSchema { .. }));
    }
}
