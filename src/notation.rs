//! Notation decoding and encoding
//!
//! A notation string describes one schema leaf. The first character selects
//! the kind and the remaining characters are modifiers in any order:
//!
//! ```text
//! $  string      ?      optional
//! b  boolean     -      nullable
//! #  number      >N     exclusive minimum (length for strings and arrays)
//! 0  integer     <N     exclusive maximum
//! !  null        =[..]= enum literal, parsed as a JSON array
//! {  object      (#/a)  reference into the definitions table
//! [  array
//! *  variable
//! ~  undefined
//! ```
//!
//! An empty string decodes to the `null` kind.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError};

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\s*#?/?([^()]*?)\s*\)").expect("reference pattern is valid")
});

/// The kind selected by the first character of a notation string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    String,
    Boolean,
    Number,
    Integer,
    Null,
    Object,
    Array,
    /// Matches any present value
    Variable,
    /// Matches only an absent value
    Undefined,
}

impl Kind {
    /// Map a notation prefix character to its kind
    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            '$' => Some(Kind::String),
            'b' => Some(Kind::Boolean),
            '#' => Some(Kind::Number),
            '0' => Some(Kind::Integer),
            '!' => Some(Kind::Null),
            '{' => Some(Kind::Object),
            '[' => Some(Kind::Array),
            '*' => Some(Kind::Variable),
            '~' => Some(Kind::Undefined),
            _ => None,
        }
    }

    /// The canonical notation for a bare descriptor of this kind
    pub fn notation(&self) -> &'static str {
        match self {
            Kind::String => "$",
            Kind::Boolean => "b",
            Kind::Number => "#",
            Kind::Integer => "0",
            Kind::Null => "!",
            Kind::Object => "{}",
            Kind::Array => "[]",
            Kind::Variable => "*",
            Kind::Undefined => "~",
        }
    }

    /// Lowercase name used in messages and emitted schemas
    pub fn name(&self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Boolean => "boolean",
            Kind::Number => "number",
            Kind::Integer => "integer",
            Kind::Null => "null",
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::Variable => "variable",
            Kind::Undefined => "undefined",
        }
    }

    /// Classify a runtime value. Absence is `undefined`; every JSON number
    /// is a `number`.
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None => Kind::Undefined,
            Some(Value::Null) => Kind::Null,
            Some(Value::Bool(_)) => Kind::Boolean,
            Some(Value::Number(_)) => Kind::Number,
            Some(Value::String(_)) => Kind::String,
            Some(Value::Array(_)) => Kind::Array,
            Some(Value::Object(_)) => Kind::Object,
        }
    }

    /// Whether `>N` / `<N` modifiers are kept for this kind
    pub fn takes_bounds(&self) -> bool {
        matches!(
            self,
            Kind::String | Kind::Array | Kind::Number | Kind::Integer
        )
    }

    fn decimal_bounds(&self) -> bool {
        matches!(self, Kind::Number | Kind::Integer)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded form of a notation string
///
/// Descriptors are shared through the decode cache, which is keyed by the
/// notation string alone. `name` therefore records the property that first
/// decoded the string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    #[serde(rename = "type")]
    pub kind: Kind,
    pub optional: bool,
    pub nullable: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<Vec<String>>,
}

impl TypeDescriptor {
    /// The reference as written in notation, e.g. `#/defs/inner`
    pub fn reference_pointer(&self) -> Option<String> {
        self.reference
            .as_ref()
            .map(|segments| format!("#/{}", segments.join("/")))
    }
}

/// Decode one notation string without caching.
///
/// Malformed enum literals, bounds without digits and unknown prefixes are
/// authoring errors and are returned as `Err`.
pub fn decode(notation: &str, property: &str) -> Result<TypeDescriptor> {
    let mut chars = notation.chars();
    let kind = match chars.next() {
        None => Kind::Null,
        Some(prefix) => Kind::from_prefix(prefix).ok_or_else(|| SchemaError::UnknownKind {
            notation: notation.to_string(),
            prefix,
        })?,
    };

    // Literal text goes first so its characters never read as modifiers.
    let mut rest = chars.as_str().to_string();
    let enum_values = take_enum(notation, &mut rest)?;
    let reference = take_reference(&mut rest);

    let decimal = kind.decimal_bounds();
    let mut min = take_bound(notation, &mut rest, '>', decimal)?;
    let mut max = take_bound(notation, &mut rest, '<', decimal)?;
    if !kind.takes_bounds() {
        min = None;
        max = None;
    } else if kind == Kind::Integer {
        min = min.map(f64::trunc);
        max = max.map(f64::trunc);
    }

    Ok(TypeDescriptor {
        kind,
        optional: rest.contains('?'),
        nullable: rest.contains('-'),
        name: property.to_string(),
        min,
        max,
        enum_values,
        reference,
    })
}

/// Render a descriptor back into notation
pub fn encode(descriptor: &TypeDescriptor) -> String {
    let mut out = String::from(descriptor.kind.notation());
    if descriptor.optional {
        out.push('?');
    }
    if descriptor.nullable {
        out.push('-');
    }
    if let Some(min) = descriptor.min {
        out.push_str(&format!(">{min}"));
    }
    if let Some(max) = descriptor.max {
        out.push_str(&format!("<{max}"));
    }
    if !descriptor.enum_values.is_empty() {
        let members: Vec<String> = descriptor
            .enum_values
            .iter()
            .map(Value::to_string)
            .collect();
        out.push_str(&format!("=[{}]=", members.join(",")));
    }
    if let Some(pointer) = descriptor.reference_pointer() {
        out.push_str(&format!("({pointer})"));
    }
    out
}

fn take_enum(notation: &str, rest: &mut String) -> Result<Vec<Value>> {
    let Some(start) = rest.find("=[") else {
        return Ok(Vec::new());
    };
    let body_start = start + 2;
    let Some(body_len) = rest[body_start..].find("]=") else {
        return Err(SchemaError::InvalidEnum {
            notation: notation.to_string(),
            reason: "missing closing `]=`".to_string(),
        });
    };

    let body = &rest[body_start..body_start + body_len];
    let values: Vec<Value> =
        serde_json::from_str(&format!("[{body}]")).map_err(|e| SchemaError::InvalidEnum {
            notation: notation.to_string(),
            reason: e.to_string(),
        })?;

    rest.replace_range(start..body_start + body_len + 2, "");
    Ok(values)
}

fn take_reference(rest: &mut String) -> Option<Vec<String>> {
    let (range, path) = {
        let caps = REFERENCE.captures(rest.as_str())?;
        (caps.get(0)?.range(), caps.get(1)?.as_str().to_string())
    };
    rest.replace_range(range, "");
    Some(
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .map(String::from)
            .collect(),
    )
}

fn take_bound(notation: &str, rest: &mut String, op: char, decimal: bool) -> Result<Option<f64>> {
    let Some(start) = rest.find(op) else {
        return Ok(None);
    };
    let digits: String = rest[start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || (decimal && *c == '.'))
        .collect();
    if digits.is_empty() {
        return Err(SchemaError::InvalidBound {
            notation: notation.to_string(),
            reason: format!("`{op}` must be followed by digits"),
        });
    }

    let bound: f64 = digits.parse().map_err(|e| SchemaError::InvalidBound {
        notation: notation.to_string(),
        reason: format!("`{digits}`: {e}"),
    })?;
    rest.replace_range(start..start + 1 + digits.len(), "");
    Ok(Some(bound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prefix_selects_kind() {
        let cases = [
            ("$", Kind::String),
            ("b", Kind::Boolean),
            ("#", Kind::Number),
            ("0", Kind::Integer),
            ("!", Kind::Null),
            ("{}", Kind::Object),
            ("[]", Kind::Array),
            ("*", Kind::Variable),
            ("~", Kind::Undefined),
        ];
        for (notation, kind) in cases {
            assert_eq!(decode(notation, "p").unwrap().kind, kind, "{notation}");
        }
    }

    #[test]
    fn test_empty_string_is_null() {
        let d = decode("", "").unwrap();
        assert_eq!(d.kind, Kind::Null);
        assert!(!d.optional);
    }

    #[test]
    fn test_unknown_prefix_rejected() {
        let err = decode("a?", "p").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownKind { prefix: 'a', .. }));
    }

    #[test]
    fn test_flags_any_position() {
        let d = decode("$-?", "p").unwrap();
        assert!(d.optional && d.nullable);
        let d = decode("b?", "p").unwrap();
        assert!(d.optional && !d.nullable);
        assert_eq!(d.name, "p");
    }

    #[test]
    fn test_bounds() {
        let d = decode("$>4<10?", "p").unwrap();
        assert_eq!(d.min, Some(4.0));
        assert_eq!(d.max, Some(10.0));
        assert!(d.optional);

        let d = decode("#>1.5<2.25", "p").unwrap();
        assert_eq!(d.min, Some(1.5));
        assert_eq!(d.max, Some(2.25));

        let d = decode("0>1.9", "p").unwrap();
        assert_eq!(d.min, Some(1.0));
    }

    #[test]
    fn test_bounds_dropped_for_unbounded_kinds() {
        let d = decode("b>3", "p").unwrap();
        assert_eq!(d.min, None);
    }

    #[test]
    fn test_bound_without_digits_rejected() {
        assert!(matches!(
            decode("$>", "p"),
            Err(SchemaError::InvalidBound { .. })
        ));
        assert!(matches!(
            decode("#<1.2.3", "p"),
            Err(SchemaError::InvalidBound { .. })
        ));
    }

    #[test]
    fn test_enum_literal() {
        let d = decode(r#"$=["a-b","c?"]="#, "p").unwrap();
        assert_eq!(d.enum_values, vec![json!("a-b"), json!("c?")]);
        // Enum text does not set flags
        assert!(!d.nullable && !d.optional);

        let d = decode("#=[]=", "p").unwrap();
        assert!(d.enum_values.is_empty());
    }

    #[test]
    fn test_malformed_enum_is_fatal() {
        assert!(matches!(
            decode("$=[oops]=", "p"),
            Err(SchemaError::InvalidEnum { .. })
        ));
        assert!(matches!(
            decode(r#"$=["open""#, "p"),
            Err(SchemaError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn test_reference_segments() {
        let d = decode("{(#/defs/inner-most)}?", "p").unwrap();
        assert_eq!(
            d.reference,
            Some(vec!["defs".to_string(), "inner-most".to_string()])
        );
        assert_eq!(d.reference_pointer().as_deref(), Some("#/defs/inner-most"));
        assert!(d.optional);
        assert!(!d.nullable);
    }

    #[test]
    fn test_encode_reads_back() {
        let decoded = decode(r#"#?->1.5<9=[2,3]=(#/a/b)"#, "p").unwrap();
        let encoded = encode(&decoded);
        assert_eq!(encoded, r#"#?->1.5<9=[2,3]=(#/a/b)"#);
        assert_eq!(decode(&encoded, "p").unwrap(), decoded);
    }
}
