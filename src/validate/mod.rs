//! Validation Engine
//!
//! Turns one raw answer into a typed [`Value`] according to a [`Schema`]:
//!
//! 1. Empty input: `Required` error, the default, or the kind's zero value
//! 2. Parse per kind (bool tokens, native numeric grammar, text validators)
//! 3. Bounds, strictness and patterns
//! 4. Choice membership
//!
//! Everything here is pure; the retry loop lives in [`crate::ask`].

pub mod extra;
mod schema;

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;

pub use schema::{BoolTokens, Bound, Extra, Kind, Modifiers, Pattern, Scalar, Schema, Validator};

/// A typed answer
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric zero; ends a numeric slice
    pub fn is_zero(&self) -> bool {
        match *self {
            Value::Int(v) => v == 0,
            Value::Uint(v) => v == 0,
            Value::Float(v) => v == 0.0,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            },
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// Why an answer was rejected; shown to the user before the retry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("a value is required")]
    Required,

    #[error("{}", describe_range(.min, .max))]
    OutOfRange {
        min: Option<Bound>,
        max: Option<Bound>,
    },

    #[error("invalid {expected}")]
    TypeMismatch { expected: &'static str },

    #[error("invalid choice")]
    InvalidChoice,

    #[error("does not match {0}")]
    PatternMismatch(String),

    #[error("character not allowed: {0:?}")]
    DisallowedChar(char),
}

fn describe_range(min: &Option<Bound>, max: &Option<Bound>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("out of range [{}, {}]", min, max),
        (Some(min), None) => format!("must be at least {}", min),
        (None, Some(max)) => format!("must be at most {}", max),
        (None, None) => "out of range".to_string(),
    }
}

/// Validate one raw answer
///
/// For a slice kind this validates a single element; ending and collecting
/// the slice is the caller's job.
pub fn validate(schema: &Schema, input: &str) -> Result<Value, ValidationError> {
    let scalar = schema.kind().scalar();
    let Some(raw) = resolve(schema, input)? else {
        return Ok(scalar.zero());
    };

    let value = match scalar {
        Scalar::Bool => Value::Bool(parse_bool(schema, &raw)?),
        Scalar::Int64 => Value::Int(parse_i64(schema, &raw)?),
        Scalar::Uint64 => Value::Uint(parse_u64(schema, &raw)?),
        Scalar::Float64 => Value::Float(parse_f64(schema, &raw)?),
        Scalar::String => Value::Text(parse_string(schema, &raw)?),
        Scalar::Email => Value::Text(check_patterns(schema, extra::email(schema, &raw)?)?),
        Scalar::Url => Value::Text(check_patterns(schema, extra::url(schema, &raw)?)?),
        Scalar::Extra(ext) => Value::Text(check_patterns(schema, (ext.validate)(schema, &raw)?)?),
    };

    check_choice(schema, &value)?;
    Ok(value)
}

/// Apply the empty-input rules
///
/// `None` means "no answer": the caller uses the kind's zero value.
fn resolve<'a>(schema: &'a Schema, input: &'a str) -> Result<Option<Cow<'a, str>>, ValidationError> {
    if !input.is_empty() {
        return Ok(Some(Cow::Borrowed(input)));
    }
    if schema.is_required() {
        return Err(ValidationError::Required);
    }
    Ok(schema.default_value().map(Cow::Borrowed))
}

fn out_of_range(schema: &Schema) -> ValidationError {
    ValidationError::OutOfRange {
        min: schema.min(),
        max: schema.max(),
    }
}

/// Match against the schema's boolean tokens
pub fn parse_bool(schema: &Schema, input: &str) -> Result<bool, ValidationError> {
    schema
        .bool_tokens()
        .lookup(input.trim())
        .ok_or(ValidationError::TypeMismatch { expected: "boolean" })
}

pub fn parse_i64(schema: &Schema, input: &str) -> Result<i64, ValidationError> {
    let v: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::TypeMismatch { expected: "integer" })?;
    if !schema.admits_int(v as i128) {
        return Err(out_of_range(schema));
    }
    Ok(v)
}

pub fn parse_u64(schema: &Schema, input: &str) -> Result<u64, ValidationError> {
    let input = input.trim();
    // `u64::from_str` accepts a leading '+', never a '-'
    let v: u64 = input.parse().map_err(|_| ValidationError::TypeMismatch {
        expected: "unsigned integer",
    })?;
    if !schema.admits_int(v as i128) {
        return Err(out_of_range(schema));
    }
    Ok(v)
}

/// Finite numbers only
pub fn parse_f64(schema: &Schema, input: &str) -> Result<f64, ValidationError> {
    let v: f64 = input
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or(ValidationError::TypeMismatch { expected: "number" })?;
    if !schema.admits_float(v) {
        return Err(out_of_range(schema));
    }
    Ok(v)
}

/// Strictness, length bounds (in code points) and patterns
pub fn parse_string(schema: &Schema, input: &str) -> Result<String, ValidationError> {
    if schema.modifiers().contains(Modifiers::STRICT_STRING) {
        if let Some(c) = input.chars().find(|&c| extra::is_disallowed(c)) {
            return Err(ValidationError::DisallowedChar(c));
        }
    }
    if !schema.admits_int(input.chars().count() as i128) {
        return Err(out_of_range(schema));
    }
    check_patterns(schema, input.to_string())
}

fn check_patterns(schema: &Schema, text: String) -> Result<String, ValidationError> {
    match schema.patterns().iter().find(|p| !p.regex.is_match(&text)) {
        Some(p) => Err(ValidationError::PatternMismatch(p.name.clone())),
        None => Ok(text),
    }
}

/// Membership in the schema's choices, when it has any
pub fn check_choice(schema: &Schema, value: &Value) -> Result<(), ValidationError> {
    let choices = schema.choices();
    if choices.is_empty() || choices.contains(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidChoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_schema() -> Schema {
        let mut schema = Schema::new(Scalar::Int64);
        schema.set_min(0).set_max(10);
        schema
    }

    #[test]
    fn test_int_range() {
        let schema = int_schema();
        assert_eq!(validate(&schema, "5"), Ok(Value::Int(5)));
        assert_eq!(validate(&schema, "0"), Ok(Value::Int(0)));
        assert_eq!(validate(&schema, "10"), Ok(Value::Int(10)));
        assert_eq!(
            validate(&schema, "11"),
            Err(ValidationError::OutOfRange {
                min: Some(Bound::Int(0)),
                max: Some(Bound::Int(10)),
            })
        );
        assert_eq!(validate(&schema, "-1").unwrap_err().to_string(), "out of range [0, 10]");
        assert_eq!(
            validate(&schema, "abc"),
            Err(ValidationError::TypeMismatch { expected: "integer" })
        );
    }

    #[test]
    fn test_inverted_range_rejects_everything() {
        let mut schema = Schema::new(Scalar::Int64);
        schema.set_range(10, 0);
        for input in ["0", "5", "10"] {
            assert!(matches!(
                validate(&schema, input),
                Err(ValidationError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn test_uint() {
        let mut schema = Schema::new(Scalar::Uint64);
        assert_eq!(validate(&schema, "18446744073709551615"), Ok(Value::Uint(u64::MAX)));
        assert!(matches!(
            validate(&schema, "-1"),
            Err(ValidationError::TypeMismatch { .. })
        ));
        schema.set_max(100u64);
        assert!(matches!(
            validate(&schema, "101"),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_float() {
        let mut schema = Schema::new(Scalar::Float64);
        schema.set_range(-1.5, 2.5);
        assert_eq!(validate(&schema, " 2.5 "), Ok(Value::Float(2.5)));
        assert_eq!(validate(&schema, "-1.5"), Ok(Value::Float(-1.5)));
        assert!(matches!(
            validate(&schema, "2.6"),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate(&schema, "NaN"),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            validate(&schema, "inf"),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bool_with_default() {
        let mut schema = Schema::new(Scalar::Bool);
        schema.set_bool_tokens([("y", true), ("n", false)]).set_default("n");
        assert_eq!(validate(&schema, ""), Ok(Value::Bool(false)));
        assert_eq!(validate(&schema, "n"), Ok(Value::Bool(false)));
        assert_eq!(validate(&schema, "y"), Ok(Value::Bool(true)));
        assert_eq!(
            validate(&schema, "maybe"),
            Err(ValidationError::TypeMismatch { expected: "boolean" })
        );
    }

    #[test]
    fn test_required_string() {
        let mut schema = Schema::new(Scalar::String);
        schema.set_modifiers(Modifiers::REQUIRED).set_default("ignored");
        assert_eq!(validate(&schema, ""), Err(ValidationError::Required));
        assert_eq!(validate(&schema, "foo"), Ok(Value::Text("foo".into())));
    }

    #[test]
    fn test_empty_optional_takes_zero_value() {
        assert_eq!(validate(&Schema::new(Scalar::Int64), ""), Ok(Value::Int(0)));
        assert_eq!(validate(&Schema::new(Scalar::Bool), ""), Ok(Value::Bool(false)));
        assert_eq!(validate(&Schema::new(Scalar::String), ""), Ok(Value::Text(String::new())));
        assert_eq!(validate(&Schema::new(Scalar::Url), ""), Ok(Value::Text(String::new())));
    }

    #[test]
    fn test_default_is_validated() {
        let mut schema = int_schema();
        schema.set_default("42");
        assert!(matches!(
            validate(&schema, ""),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_string_length_in_code_points() {
        let mut schema = Schema::new(Scalar::String);
        schema.set_range(2, 3);
        assert!(validate(&schema, "日本").is_ok());
        assert!(validate(&schema, "héé").is_ok());
        assert!(validate(&schema, "a").is_err());
        assert!(validate(&schema, "abcd").is_err());
    }

    #[test]
    fn test_strict_string() {
        let mut schema = Schema::new(Scalar::String);
        assert!(validate(&schema, "a\u{200B}b").is_ok());

        schema.set_modifiers(Modifiers::STRICT_STRING);
        assert_eq!(
            validate(&schema, "a\u{200B}b"),
            Err(ValidationError::DisallowedChar('\u{200B}'))
        );
        assert_eq!(
            validate(&schema, "a\tb"),
            Err(ValidationError::DisallowedChar('\t'))
        );
        assert!(validate(&schema, "plain text é").is_ok());
    }

    #[test]
    fn test_patterns() {
        let mut schema = Schema::new(Scalar::String);
        schema
            .add_pattern("lowercase", "^[a-z]+$")
            .unwrap()
            .add_pattern("short", "^.{1,4}$")
            .unwrap();
        assert!(validate(&schema, "abc").is_ok());
        assert_eq!(
            validate(&schema, "ABC"),
            Err(ValidationError::PatternMismatch("lowercase".into()))
        );
        assert_eq!(
            validate(&schema, "abcdef").unwrap_err().to_string(),
            "does not match short"
        );
    }

    #[test]
    fn test_choices() {
        let mut schema = Schema::new(Scalar::Int64);
        schema.set_choices(vec![Value::Int(1), Value::Int(3), Value::Int(5)]);
        assert_eq!(validate(&schema, "2"), Err(ValidationError::InvalidChoice));
        assert_eq!(validate(&schema, "3"), Ok(Value::Int(3)));
        assert!(matches!(
            validate(&schema, "x"),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_email_and_url_kinds() {
        let schema = Schema::new(Scalar::Email);
        assert_eq!(validate(&schema, "a@b.io"), Ok(Value::Text("a@b.io".into())));
        assert_eq!(
            validate(&schema, "nope"),
            Err(ValidationError::TypeMismatch { expected: "email address" })
        );

        let schema = Schema::new(Scalar::Url);
        assert_eq!(
            validate(&schema, "https://example.com"),
            Ok(Value::Text("https://example.com/".into()))
        );
    }

    fn hex_color(_: &Schema, input: &str) -> Result<String, ValidationError> {
        let hex = input.strip_prefix('#').unwrap_or(input);
        if hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(format!("#{}", hex.to_ascii_lowercase()))
        } else {
            Err(ValidationError::TypeMismatch { expected: "color" })
        }
    }

    #[test]
    fn test_extra_kind() {
        let schema = Schema::new(Scalar::Extra(Extra {
            name: "color",
            validate: hex_color,
        }));
        assert_eq!(validate(&schema, "FF00aa"), Ok(Value::Text("#ff00aa".into())));
        assert_eq!(validate(&schema, "red").unwrap_err().to_string(), "invalid color");
    }

    #[test]
    fn test_slice_kind_validates_elements() {
        let schema = Schema::new(Kind::Slice(Scalar::Int64));
        assert_eq!(validate(&schema, "7"), Ok(Value::Int(7)));
        assert!(validate(&schema, "7.5").is_err());
    }

    #[test]
    fn test_value_display() {
        let list = Value::List(vec![Value::Int(1), Value::Text("a".into()), Value::Bool(true)]);
        assert_eq!(list.to_string(), "[1 a true]");
        assert!(Value::Float(0.0).is_zero());
        assert!(!Value::Text(String::new()).is_zero());
    }
}
