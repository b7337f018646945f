//! Validator engine
//!
//! Walks a canonical model against a value. The walk stops at the first
//! mismatch and reports it through [`ValidationResult`]; only schemas that
//! cannot be decoded produce an `Err`.
//!
//! Checks for each selected value, in order:
//! 1. presence, unless the descriptor is optional
//! 2. kind, through the coercion table in [`admits`]
//! 3. exclusive length bounds for strings and arrays
//! 4. exclusive value bounds for numbers and integers
//! 5. enum membership
//! 6. the referenced schema, resolved from the definitions table
//!
//! A `null` accepted through a nullable descriptor skips 3 to 6.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, trace};

use crate::cache::DecodeCache;
use crate::config::ValidatorConfig;
use crate::emit;
use crate::error::Result;
use crate::model::{CanonicalModel, ModelEntry, Selector};
use crate::notation::{Kind, TypeDescriptor};
use crate::resolve::resolve;

static DEFAULT_VALIDATOR: Lazy<Validator> = Lazy::new(Validator::new);

/// Meta-schema for `validate_model`: every property value is a notation string
static META_SCHEMA: Lazy<Value> = Lazy::new(|| json!({"*": "$"}));

const DEFAULT_MAX_DEPTH: usize = 128;

/// Per-call options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Check the raw schema against the meta-schema before the data walk
    #[serde(default)]
    pub validate_model: bool,
    /// Maximum nesting of schemas, counting nested and referenced schemas
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            validate_model: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Which walk produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    /// The schema checked against the meta-schema
    Model,
    /// The value checked against the schema
    Object,
}

/// Why a value was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Missing,
    TypeMismatch,
    LengthBound,
    ValueBound,
    Enum,
    MissingReference,
    ReferenceCycle,
    DepthExceeded,
}

/// Outcome of one validation call
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    /// The container being walked when the walk stopped
    pub obj: Value,
    /// The model of that container
    pub model: CanonicalModel,
    pub step: Step,
    /// Empty when `ok`
    pub message: String,
    /// JSON pointer to the offending value
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
}

#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    message: String,
    path: String,
    obj: Option<Value>,
    model: Option<CanonicalModel>,
}

impl Failure {
    fn new(kind: FailureKind, path: &str, message: String) -> Self {
        Self {
            kind,
            message,
            path: path.to_string(),
            obj: None,
            model: None,
        }
    }
}

/// Validation engine owning its decode cache
#[derive(Debug, Default)]
pub struct Validator {
    cache: DecodeCache,
    options: ValidateOptions,
}

impl Validator {
    /// Engine with default options and an unbounded cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ValidateOptions) -> Self {
        Self {
            cache: DecodeCache::new(),
            options,
        }
    }

    /// Engine configured from a loaded [`ValidatorConfig`]
    pub fn from_config(config: &ValidatorConfig) -> Self {
        let cache = match config.cache.capacity {
            Some(capacity) => DecodeCache::with_capacity(capacity),
            None => DecodeCache::new(),
        };
        Self {
            cache,
            options: config.options(),
        }
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    pub fn cache(&self) -> &DecodeCache {
        &self.cache
    }

    /// Normalize a raw schema through this engine's cache
    pub fn normalize(&self, schema: &Value) -> Result<CanonicalModel> {
        CanonicalModel::normalize(schema, &self.cache)
    }

    /// Emit a JSON Schema document for `schema`, embedding the definitions
    /// its references point at
    pub fn json_schema(&self, schema: &Value, definitions: Option<&Value>) -> Result<Value> {
        emit::json_schema(schema, definitions, &self.cache)
    }

    /// Validate `value` against `schema` with the engine's options
    pub fn validate(
        &self,
        value: &Value,
        schema: &Value,
        definitions: Option<&Value>,
    ) -> Result<ValidationResult> {
        self.validate_with(value, schema, definitions, &self.options)
    }

    /// Validate with explicit options
    pub fn validate_with(
        &self,
        value: &Value,
        schema: &Value,
        definitions: Option<&Value>,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        if options.validate_model {
            let result = self.run(Step::Model, schema, &META_SCHEMA, None, options)?;
            if !result.ok {
                return Ok(result);
            }
        }
        self.run(Step::Object, value, schema, definitions, options)
    }

    fn run(
        &self,
        step: Step,
        value: &Value,
        schema: &Value,
        definitions: Option<&Value>,
        options: &ValidateOptions,
    ) -> Result<ValidationResult> {
        let model = self.normalize(schema)?;
        let mut walk = Walk {
            cache: &self.cache,
            definitions,
            max_depth: options.max_depth,
            active: Vec::new(),
        };

        let result = match walk.walk(value, &model, "", "", 0)? {
            None => ValidationResult {
                ok: true,
                obj: value.clone(),
                model,
                step,
                message: String::new(),
                path: String::new(),
                kind: None,
            },
            Some(failure) => {
                debug!(?step, path = %failure.path, kind = ?failure.kind, "validation failed: {}", failure.message);
                ValidationResult {
                    ok: false,
                    obj: failure.obj.unwrap_or_else(|| value.clone()),
                    model: failure.model.unwrap_or(model),
                    step,
                    message: failure.message,
                    path: failure.path,
                    kind: Some(failure.kind),
                }
            }
        };
        Ok(result)
    }
}

/// Validate through a process-wide default engine.
///
/// `options` falls back to [`ValidateOptions::default`].
pub fn validate(
    value: &Value,
    schema: &Value,
    definitions: Option<&Value>,
    options: Option<&ValidateOptions>,
) -> Result<ValidationResult> {
    let options = options.copied().unwrap_or_default();
    DEFAULT_VALIDATOR.validate_with(value, schema, definitions, &options)
}

/// Whether a present, non-null-through-nullable value satisfies `expected`
pub fn admits(expected: Kind, value: &Value) -> bool {
    match (expected, Kind::of(Some(value))) {
        (Kind::Variable, _) => true,
        (Kind::Integer, Kind::Number) => is_whole_number(value),
        (Kind::Undefined, _) => false,
        (expected, actual) => expected == actual,
    }
}

fn is_whole_number(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().map_or(false, |f| f.fract() == 0.0)
        }
        _ => false,
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

struct Walk<'a> {
    cache: &'a DecodeCache,
    definitions: Option<&'a Value>,
    max_depth: usize,
    /// References being validated, keyed by pointer and value address
    active: Vec<(String, usize)>,
}

impl<'a> Walk<'a> {
    fn walk(
        &mut self,
        value: &Value,
        model: &CanonicalModel,
        path: &str,
        parent: &str,
        depth: usize,
    ) -> Result<Option<Failure>> {
        for (selector, entry) in model.entries() {
            trace!(key = %selector.key(), path, "checking entry");
            for (label, candidate) in select(selector, value, parent) {
                let here = match selector {
                    Selector::Whole => path.to_string(),
                    _ => child_path(path, &label),
                };
                if let Some(mut failure) = self.check(&label, entry, candidate, &here, depth)? {
                    if failure.obj.is_none() {
                        failure.obj = Some(value.clone());
                        failure.model = Some(model.clone());
                    }
                    return Ok(Some(failure));
                }
            }
        }
        Ok(None)
    }

    fn descend(
        &mut self,
        value: &Value,
        schema: &Value,
        path: &str,
        label: &str,
        depth: usize,
    ) -> Result<Option<Failure>> {
        if depth > self.max_depth {
            return Ok(Some(Failure::new(
                FailureKind::DepthExceeded,
                path,
                format!("Maximum validation depth {} exceeded", self.max_depth),
            )));
        }
        let model = CanonicalModel::normalize(schema, self.cache)?;
        self.walk(value, &model, path, label, depth)
    }

    fn check(
        &mut self,
        label: &str,
        entry: &ModelEntry,
        candidate: Option<&Value>,
        path: &str,
        depth: usize,
    ) -> Result<Option<Failure>> {
        match entry {
            ModelEntry::Leaf(descriptor) => self.check_leaf(label, descriptor, candidate, path, depth),
            ModelEntry::Nested(schema) => {
                let Some(value) = candidate else {
                    return Ok(Some(missing(label, path)));
                };
                if schema.is_object() && !value.is_object() {
                    return Ok(Some(mismatch(label, Kind::Object, value, path)));
                }
                self.descend(value, schema, path, label, depth + 1)
            }
        }
    }

    fn check_leaf(
        &mut self,
        label: &str,
        descriptor: &TypeDescriptor,
        candidate: Option<&Value>,
        path: &str,
        depth: usize,
    ) -> Result<Option<Failure>> {
        let Some(value) = candidate else {
            if descriptor.optional {
                return Ok(None);
            }
            return Ok(Some(missing(label, path)));
        };

        if value.is_null() && descriptor.nullable {
            return Ok(None);
        }
        if !admits(descriptor.kind, value) {
            return Ok(Some(mismatch(label, descriptor.kind, value, path)));
        }

        let measured = match value {
            Value::String(s) => Some(("length", s.chars().count() as f64, FailureKind::LengthBound)),
            Value::Array(items) => Some(("length", items.len() as f64, FailureKind::LengthBound)),
            Value::Number(n) => n.as_f64().map(|v| ("value", v, FailureKind::ValueBound)),
            _ => None,
        };
        if let Some((what, measure, kind)) = measured {
            if let Some(bound) = outside_bounds(measure, descriptor) {
                return Ok(Some(Failure::new(
                    kind,
                    path,
                    format!("Property `{label}` {what} {measure} should be {bound}"),
                )));
            }
        }

        if !descriptor.enum_values.is_empty()
            && !descriptor.enum_values.iter().any(|m| same_value(m, value))
        {
            return Ok(Some(Failure::new(
                FailureKind::Enum,
                path,
                format!("Property `{label}` does not match any enum value"),
            )));
        }

        match &descriptor.reference {
            Some(segments) => {
                self.check_reference(label, descriptor, segments, value, path, depth)
            }
            None => Ok(None),
        }
    }

    fn check_reference(
        &mut self,
        label: &str,
        descriptor: &TypeDescriptor,
        segments: &[String],
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<Option<Failure>> {
        let pointer = descriptor.reference_pointer().unwrap_or_default();
        let Some(schema) = self.definitions.and_then(|defs| resolve(segments, defs)) else {
            return Ok(Some(Failure::new(
                FailureKind::MissingReference,
                path,
                format!("Missing reference `{pointer}`"),
            )));
        };

        let key = (pointer, value as *const Value as usize);
        if self.active.contains(&key) {
            return Ok(Some(Failure::new(
                FailureKind::ReferenceCycle,
                path,
                format!("Reference cycle detected at `{}`", key.0),
            )));
        }

        self.active.push(key);
        let verdict = self.descend(value, schema, path, label, depth + 1);
        self.active.pop();
        verdict
    }
}

/// Values picked by `selector`; the whole value keeps its parent's label
fn select<'v>(
    selector: &Selector,
    value: &'v Value,
    parent: &str,
) -> Vec<(String, Option<&'v Value>)> {
    match selector {
        Selector::Whole => vec![(parent.to_string(), Some(value))],
        Selector::Elements | Selector::AllValues => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), Some(item)))
                .collect(),
            Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), Some(v))).collect(),
            _ => Vec::new(),
        },
        Selector::Named(name) => vec![(name.clone(), value.as_object().and_then(|m| m.get(name)))],
    }
}

fn outside_bounds(measure: f64, descriptor: &TypeDescriptor) -> Option<String> {
    if let Some(min) = descriptor.min {
        if measure <= min {
            return Some(format!("greater than {min}"));
        }
    }
    if let Some(max) = descriptor.max {
        if measure >= max {
            return Some(format!("less than {max}"));
        }
    }
    None
}

fn missing(label: &str, path: &str) -> Failure {
    Failure::new(
        FailureKind::Missing,
        path,
        format!("Missing property `{label}`"),
    )
}

fn mismatch(label: &str, expected: Kind, value: &Value, path: &str) -> Failure {
    Failure::new(
        FailureKind::TypeMismatch,
        path,
        format!(
            "Property `{label}` should be type `{expected}` but it is type `{}`",
            Kind::of(Some(value))
        ),
    )
}

fn child_path(path: &str, segment: &str) -> String {
    format!("{path}/{}", segment.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: Value, schema: Value) -> ValidationResult {
        Validator::new().validate(&value, &schema, None).unwrap()
    }

    #[test]
    fn test_coercion_table() {
        assert!(admits(Kind::Integer, &json!(3)));
        assert!(admits(Kind::Integer, &json!(3.0)));
        assert!(!admits(Kind::Integer, &json!(3.5)));
        assert!(admits(Kind::Number, &json!(3)));
        assert!(admits(Kind::Variable, &json!(null)));
        assert!(!admits(Kind::Undefined, &json!(null)));
        assert!(!admits(Kind::Object, &json!([])));
        assert!(!admits(Kind::Object, &json!(null)));
    }

    #[test]
    fn test_bounds_are_exclusive() {
        assert!(!check(json!("hello"), json!("$>5")).ok);
        assert!(check(json!("hello"), json!("$>4")).ok);
        assert!(!check(json!("hello"), json!("$<5")).ok);
        assert!(check(json!(5), json!("#>4.5<5.5")).ok);
        assert!(!check(json!(5), json!("0<5")).ok);
        assert!(!check(json!([1, 2]), json!("[>2")).ok);
    }

    #[test]
    fn test_bound_failure_details() {
        let result = check(json!({"name": "ab"}), json!({"name": "$>2"}));
        assert_eq!(result.kind, Some(FailureKind::LengthBound));
        assert_eq!(result.path, "/name");
        assert_eq!(result.message, "Property `name` length 2 should be greater than 2");
    }

    #[test]
    fn test_string_length_counts_characters() {
        assert!(check(json!("héé"), json!("$<4")).ok);
    }

    #[test]
    fn test_enum_compares_numbers_by_value() {
        assert!(check(json!(2.0), json!("#=[1,2]=")).ok);
        assert!(!check(json!(3), json!("#=[1,2]=")).ok);
    }

    #[test]
    fn test_nullable_null_skips_enum() {
        assert!(check(json!(null), json!(r#"$-=["a"]="#)).ok);
    }

    #[test]
    fn test_undefined_kind() {
        assert!(check(json!({}), json!({"gone": "~?"})).ok);
        assert!(!check(json!({"gone": 1}), json!({"gone": "~?"})).ok);
        assert!(!check(json!({}), json!({"gone": "~"})).ok);
    }

    #[test]
    fn test_failure_carries_container() {
        let result = check(
            json!({"outer": {"inner": 1}}),
            json!({"outer": {"inner": "$"}}),
        );
        assert!(!result.ok);
        assert_eq!(result.obj, json!({"inner": 1}));
        assert_eq!(result.path, "/outer/inner");
        assert!(result.model.get(&Selector::Named("inner".to_string())).is_some());
    }

    #[test]
    fn test_depth_limit() {
        let validator = Validator::with_options(ValidateOptions {
            validate_model: false,
            max_depth: 1,
        });
        let schema = json!({"a": {"b": {"c": "$"}}});
        let value = json!({"a": {"b": {"c": "x"}}});
        let result = validator.validate(&value, &schema, None).unwrap();
        assert_eq!(result.kind, Some(FailureKind::DepthExceeded));
    }

    #[test]
    fn test_nested_array_mismatch_names_property() {
        let result = check(json!({"tags": "x"}), json!({"tags": ["$"]}));
        assert_eq!(result.kind, Some(FailureKind::TypeMismatch));
        assert_eq!(result.path, "/tags");
        assert_eq!(
            result.message,
            "Property `tags` should be type `array` but it is type `string`"
        );
    }

    #[test]
    fn test_root_mismatch_keeps_empty_label() {
        let result = check(json!("x"), json!(["$"]));
        assert_eq!(
            result.message,
            "Property `` should be type `array` but it is type `string`"
        );
    }

    #[test]
    fn test_pointer_escaping() {
        let result = check(json!({"a/b": 1}), json!({"a/b": "$"}));
        assert_eq!(result.path, "/a~1b");
    }
}
