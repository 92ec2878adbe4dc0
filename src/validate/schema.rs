//! Question schema: the kind and constraints one answer is checked against

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use regex::Regex;

use super::{ValidationError, Value};

bitflags! {
    /// Flags altering how an answer is parsed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Empty input is an error instead of taking the default
        const REQUIRED = 0b0000_0001;
        /// Reject control and invisible formatting characters in strings
        const STRICT_STRING = 0b0000_0010;
        /// Email domains and URL hosts must be DNS names
        const DNS = 0b0000_0100;
    }
}

/// Checks and normalizes a raw answer for a custom scalar kind
pub type Validator = fn(&Schema, &str) -> Result<String, ValidationError>;

/// A scalar kind defined outside the engine
#[derive(Clone, Copy)]
pub struct Extra {
    /// Shown in type mismatch messages
    pub name: &'static str,
    pub validate: Validator,
}

impl fmt::Debug for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extra").field("name", &self.name).finish()
    }
}

impl PartialEq for Extra {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// Element kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool,
    Int64,
    Uint64,
    Float64,
    String,
    Email,
    Url,
    Extra(Extra),
}

impl Scalar {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Scalar::Bool => "boolean",
            Scalar::Int64 => "integer",
            Scalar::Uint64 => "unsigned integer",
            Scalar::Float64 => "number",
            Scalar::String => "string",
            Scalar::Email => "email address",
            Scalar::Url => "URL",
            Scalar::Extra(extra) => extra.name,
        }
    }

    /// Whether numeric zero ends a slice of this kind
    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int64 | Scalar::Uint64 | Scalar::Float64)
    }

    /// Value used for an empty optional answer with no default
    pub fn zero(&self) -> Value {
        match self {
            Scalar::Bool => Value::Bool(false),
            Scalar::Int64 => Value::Int(0),
            Scalar::Uint64 => Value::Uint(0),
            Scalar::Float64 => Value::Float(0.0),
            Scalar::String | Scalar::Email | Scalar::Url | Scalar::Extra(_) => {
                Value::Text(String::new())
            },
        }
    }
}

/// What an answer must be
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
    Scalar(Scalar),
    /// Several answers of one scalar kind, ended by a sentinel
    Slice(Scalar),
}

impl Kind {
    /// Element kind
    pub fn scalar(&self) -> Scalar {
        match *self {
            Kind::Scalar(s) | Kind::Slice(s) => s,
        }
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, Kind::Slice(_))
    }
}

impl From<Scalar> for Kind {
    fn from(scalar: Scalar) -> Self {
        Kind::Scalar(scalar)
    }
}

impl Default for Kind {
    fn default() -> Self {
        Kind::Scalar(Scalar::String)
    }
}

/// A numeric bound; for strings it bounds the length in code points
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i128),
    Float(f64),
}

impl Bound {
    pub(crate) fn le_int(self, v: i128) -> bool {
        match self {
            Bound::Int(b) => b <= v,
            Bound::Float(b) => b <= v as f64,
        }
    }

    pub(crate) fn ge_int(self, v: i128) -> bool {
        match self {
            Bound::Int(b) => b >= v,
            Bound::Float(b) => b >= v as f64,
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Bound::Int(b) => b as f64,
            Bound::Float(b) => b,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Int(b) => write!(f, "{}", b),
            Bound::Float(b) => write!(f, "{}", b),
        }
    }
}

macro_rules! bound_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Bound {
            fn from(v: $t) -> Self {
                Bound::Int(v as i128)
            }
        })*
    };
}

bound_from_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Bound {
    fn from(v: f64) -> Self {
        Bound::Float(v)
    }
}

impl From<f32> for Bound {
    fn from(v: f32) -> Self {
        Bound::Float(v as f64)
    }
}

/// Literal answers accepted as booleans
#[derive(Debug, Clone, PartialEq)]
pub struct BoolTokens {
    tokens: HashMap<String, bool>,
}

const BUILTIN_TRUE: &[&str] = &["1", "t", "T", "TRUE", "true", "True", "y", "Y", "yes", "YES", "Yes"];
const BUILTIN_FALSE: &[&str] = &["0", "f", "F", "FALSE", "false", "False", "n", "N", "no", "NO", "No"];

impl Default for BoolTokens {
    fn default() -> Self {
        let tokens = BUILTIN_TRUE
            .iter()
            .map(|t| (t.to_string(), true))
            .chain(BUILTIN_FALSE.iter().map(|t| (t.to_string(), false)))
            .collect();
        Self { tokens }
    }
}

impl BoolTokens {
    /// Add tokens, overriding built-in ones with the same spelling
    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.tokens
            .extend(tokens.into_iter().map(|(t, v)| (t.into(), v)));
    }

    /// Exact match first, then case-insensitive
    ///
    /// A case-insensitive match is only used when every token it hits agrees.
    pub fn lookup(&self, input: &str) -> Option<bool> {
        if let Some(&v) = self.tokens.get(input) {
            return Some(v);
        }

        let folded = input.to_lowercase();
        let mut found = None;
        for (token, &v) in &self.tokens {
            if token.to_lowercase() != folded {
                continue;
            }
            match found {
                None => found = Some(v),
                Some(prev) if prev != v => return None,
                Some(_) => {},
            }
        }
        found
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// A named regular expression a string answer must match
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: String,
    pub regex: Regex,
}

/// Kind and constraints for one question
///
/// Setters return `&mut Self` so they chain. Call [`Schema::reset`] before
/// reusing a schema for another question.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    kind: Kind,
    modifiers: Modifiers,
    min: Option<Bound>,
    max: Option<Bound>,
    default: Option<String>,
    bool_tokens: BoolTokens,
    patterns: Vec<Pattern>,
    choices: Vec<Value>,
}

impl Schema {
    /// Schema for `kind` with no constraints
    pub fn new(kind: impl Into<Kind>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Forget every setting, back to an unconstrained string
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn set_kind(&mut self, kind: impl Into<Kind>) -> &mut Self {
        self.kind = kind.into();
        self
    }

    /// Replace the modifier flags
    pub fn set_modifiers(&mut self, modifiers: Modifiers) -> &mut Self {
        self.modifiers = modifiers;
        self
    }

    /// Inclusive lower bound
    pub fn set_min(&mut self, min: impl Into<Bound>) -> &mut Self {
        self.min = Some(min.into());
        self
    }

    /// Inclusive upper bound
    pub fn set_max(&mut self, max: impl Into<Bound>) -> &mut Self {
        self.max = Some(max.into());
        self
    }

    /// Both bounds, inclusive
    pub fn set_range(&mut self, min: impl Into<Bound>, max: impl Into<Bound>) -> &mut Self {
        self.set_min(min).set_max(max)
    }

    /// Raw answer substituted for an empty line
    pub fn set_default(&mut self, default: impl Into<String>) -> &mut Self {
        self.default = Some(default.into());
        self
    }

    /// Extend the accepted boolean tokens
    pub fn set_bool_tokens<I, S>(&mut self, tokens: I) -> &mut Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.bool_tokens.extend(tokens);
        self
    }

    /// Require string answers to match `pattern`
    pub fn add_pattern(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> Result<&mut Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        self.patterns.push(Pattern {
            name: name.into(),
            regex,
        });
        Ok(self)
    }

    /// Restrict answers to these values
    pub fn set_choices(&mut self, choices: Vec<Value>) -> &mut Self {
        self.choices = choices;
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn is_required(&self) -> bool {
        self.modifiers.contains(Modifiers::REQUIRED)
    }

    pub fn min(&self) -> Option<Bound> {
        self.min
    }

    pub fn max(&self) -> Option<Bound> {
        self.max
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn bool_tokens(&self) -> &BoolTokens {
        &self.bool_tokens
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn choices(&self) -> &[Value] {
        &self.choices
    }

    /// Integer (or string length) within the bounds
    pub(crate) fn admits_int(&self, v: i128) -> bool {
        self.min.map_or(true, |m| m.le_int(v)) && self.max.map_or(true, |m| m.ge_int(v))
    }

    pub(crate) fn admits_float(&self, v: f64) -> bool {
        self.min.map_or(true, |m| m.as_f64() <= v) && self.max.map_or(true, |m| m.as_f64() >= v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_bool_tokens() {
        let tokens = BoolTokens::default();
        assert_eq!(tokens.len(), 22);
        for t in ["1", "t", "TRUE", "y", "Yes"] {
            assert_eq!(tokens.lookup(t), Some(true), "{}", t);
        }
        for t in ["0", "F", "false", "N", "no"] {
            assert_eq!(tokens.lookup(t), Some(false), "{}", t);
        }
        assert_eq!(tokens.lookup("maybe"), None);
        assert_eq!(tokens.lookup(""), None);
    }

    #[test]
    fn test_bool_tokens_case_insensitive_fallback() {
        let tokens = BoolTokens::default();
        assert_eq!(tokens.lookup("yEs"), Some(true));
        assert_eq!(tokens.lookup("fAlSe"), Some(false));
    }

    #[test]
    fn test_bool_tokens_extend() {
        let mut tokens = BoolTokens::default();
        tokens.extend([("si", true), ("nein", false)]);
        assert_eq!(tokens.lookup("si"), Some(true));
        assert_eq!(tokens.lookup("NEIN"), Some(false));

        // Override a built-in
        tokens.extend([("1", false)]);
        assert_eq!(tokens.lookup("1"), Some(false));
    }

    #[test]
    fn test_conflicting_folded_tokens() {
        let mut tokens = BoolTokens::default();
        tokens.extend([("Oui", true), ("OUI", false)]);
        assert_eq!(tokens.lookup("Oui"), Some(true));
        assert_eq!(tokens.lookup("oui"), None);
    }

    #[test]
    fn test_schema_setters_chain() {
        let mut schema = Schema::new(Scalar::Int64);
        schema
            .set_modifiers(Modifiers::REQUIRED)
            .set_range(0, 10)
            .set_default("5");

        assert_eq!(schema.kind(), Kind::Scalar(Scalar::Int64));
        assert!(schema.is_required());
        assert_eq!(schema.min(), Some(Bound::Int(0)));
        assert_eq!(schema.max(), Some(Bound::Int(10)));
        assert_eq!(schema.default_value(), Some("5"));
    }

    #[test]
    fn test_schema_reset() {
        let mut schema = Schema::new(Kind::Slice(Scalar::Float64));
        schema
            .set_modifiers(Modifiers::REQUIRED | Modifiers::STRICT_STRING)
            .set_max(3.5)
            .set_bool_tokens([("ja", true)])
            .set_choices(vec![Value::Float(1.0)])
            .add_pattern("digits", r"^\d+$")
            .unwrap();

        schema.reset();
        assert_eq!(schema.kind(), Kind::Scalar(Scalar::String));
        assert_eq!(schema.modifiers(), Modifiers::empty());
        assert_eq!(schema.max(), None);
        assert_eq!(schema.default_value(), None);
        assert!(schema.patterns().is_empty());
        assert!(schema.choices().is_empty());
        assert_eq!(schema.bool_tokens().lookup("ja"), None);
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let mut schema = Schema::default();
        assert!(schema.add_pattern("broken", "(").is_err());
        assert!(schema.patterns().is_empty());
    }

    #[test]
    fn test_bounds_mixed() {
        let mut schema = Schema::new(Scalar::Int64);
        schema.set_range(0.5, 10);
        assert!(!schema.admits_int(0));
        assert!(schema.admits_int(1));
        assert!(schema.admits_int(10));
        assert!(!schema.admits_int(11));
        assert!(schema.admits_float(0.5));
        assert!(!schema.admits_float(10.01));
    }

    #[test]
    fn test_kind_helpers() {
        assert_eq!(Kind::Slice(Scalar::Url).scalar(), Scalar::Url);
        assert!(Kind::Slice(Scalar::Bool).is_slice());
        assert!(Scalar::Uint64.is_numeric());
        assert!(!Scalar::String.is_numeric());
        assert_eq!(Scalar::Float64.zero(), Value::Float(0.0));
    }
}
