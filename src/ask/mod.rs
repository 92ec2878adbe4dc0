//! Questions and the retry loop
//!
//! A [`Prompter`] paints a question, reads a line from a [`LineSource`],
//! validates it against a [`Schema`] and asks again on failure. Validation
//! errors never leave this module: the message is printed under the prompt,
//! the cursor goes back up, and the same schema is used for the next try.
//! Only a valid answer, an interrupt, or a broken terminal ends a question.

use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::ansi;
use crate::editor::ReadError;
use crate::router::Interrupt;
use crate::term::TermError;
use crate::validate::{self, Kind, Modifiers, Scalar, Schema, ValidationError, Value};

/// Prompt shown for choice answers, and before the candidate list
pub const CHOICE_PREFIX: &str = "   >>> ";

/// Something that reads edited lines
pub trait LineSource {
    /// Paint `prompt` and read one line
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError>;

    /// Write bytes straight to the output
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        (**self).read_line(prompt)
    }

    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_raw(bytes)
    }
}

/// Why a question produced no answer
#[derive(Debug, Error)]
pub enum AskError {
    #[error("{0}")]
    Interrupted(Interrupt),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("terminal error: {0}")]
    Terminal(#[from] TermError),

    #[error("terminal input closed")]
    Closed,
}

impl From<ReadError> for AskError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Interrupted(i) => AskError::Interrupted(i),
            ReadError::Io(e) => AskError::Io(e),
            ReadError::Closed => AskError::Closed,
        }
    }
}

/// Prefixes and boolean display strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptStyle {
    /// Printed before every question
    pub prefix: String,
    /// Printed before each element of a multi-answer question
    pub multi_prefix: String,
    /// Printed before validation errors
    pub error_prefix: String,
    /// Shown for "yes" in boolean defaults, and accepted as true
    pub true_str: String,
    /// Shown for "no" in boolean defaults, and accepted as false
    pub false_str: String,
}

impl Default for PromptStyle {
    fn default() -> Self {
        Self {
            prefix: " + ".to_string(),
            multi_prefix: "   * ".to_string(),
            error_prefix: "  [!] ".to_string(),
            true_str: "y".to_string(),
            false_str: "n".to_string(),
        }
    }
}

/// Rust types an answer can be read as
pub trait Answer: Sized {
    const SCALAR: Scalar;

    fn from_value(value: Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! answer {
    ($t:ty, $scalar:expr, $variant:ident) => {
        impl Answer for $t {
            const SCALAR: Scalar = $scalar;

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

answer!(bool, Scalar::Bool, Bool);
answer!(i64, Scalar::Int64, Int);
answer!(u64, Scalar::Uint64, Uint);
answer!(f64, Scalar::Float64, Float);
answer!(String, Scalar::String, Text);

/// Asks questions over a line source
pub struct Prompter<S> {
    source: S,
    style: PromptStyle,
}

impl<S: LineSource> Prompter<S> {
    pub fn new(source: S) -> Self {
        Self::with_style(source, PromptStyle::default())
    }

    pub fn with_style(source: S, style: PromptStyle) -> Self {
        Self { source, style }
    }

    pub fn style(&self) -> &PromptStyle {
        &self.style
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    /// Ask `question` and validate the answer against `schema`
    ///
    /// Slice kinds return [`Value::List`]. A schema with choices shows them
    /// first and only accepts one of them.
    pub fn ask(&mut self, question: &str, schema: &Schema) -> Result<Value, AskError> {
        if schema.kind().is_slice() {
            return self.collect_slice(question, schema).map(Value::List);
        }

        let schema = self.with_style_tokens(schema);
        let prompt = self.open_question(question, &schema)?;
        self.retry(&prompt, |line| validate::validate(&schema, line))
    }

    /// Ask for a `T`, with the schema's kind forced to match
    pub fn ask_as<T: Answer>(&mut self, question: &str, schema: &Schema) -> Result<T, AskError> {
        let mut schema = schema.clone();
        schema.set_kind(T::SCALAR);
        let schema = self.with_style_tokens(&schema);
        let prompt = self.open_question(question, &schema)?;

        self.retry(&prompt, |line| {
            validate::validate(&schema, line).and_then(|v| {
                T::from_value(v).ok_or(ValidationError::TypeMismatch {
                    expected: T::SCALAR.name(),
                })
            })
        })
    }

    /// Yes/no question
    pub fn ask_bool(&mut self, question: &str, default: Option<bool>) -> Result<bool, AskError> {
        let mut schema = Schema::new(Scalar::Bool);
        if let Some(default) = default {
            let token = if default {
                &self.style.true_str
            } else {
                &self.style.false_str
            };
            schema.set_default(token.clone());
        }
        self.ask_as(question, &schema)
    }

    pub fn ask_i64(&mut self, question: &str, schema: &Schema) -> Result<i64, AskError> {
        self.ask_as(question, schema)
    }

    pub fn ask_u64(&mut self, question: &str, schema: &Schema) -> Result<u64, AskError> {
        self.ask_as(question, schema)
    }

    pub fn ask_f64(&mut self, question: &str, schema: &Schema) -> Result<f64, AskError> {
        self.ask_as(question, schema)
    }

    pub fn ask_string(&mut self, question: &str, schema: &Schema) -> Result<String, AskError> {
        self.ask_as(question, schema)
    }

    /// Several answers, one per line, until an empty line (or 0 for numbers)
    pub fn ask_slice<T: Answer>(
        &mut self,
        question: &str,
        schema: &Schema,
    ) -> Result<Vec<T>, AskError> {
        let mut schema = schema.clone();
        schema.set_kind(Kind::Slice(T::SCALAR));
        let values = self.collect_slice(question, &schema)?;
        Ok(values.into_iter().filter_map(T::from_value).collect())
    }

    /// Pick one of `choices`; an empty answer takes `default` when given
    pub fn choose<T>(&mut self, question: &str, choices: &[T], default: Option<T>) -> Result<T, AskError>
    where
        T: Answer + Clone,
    {
        let mut schema = Schema::new(T::SCALAR);
        schema.set_choices(choices.iter().cloned().map(Answer::into_value).collect());
        if let Some(default) = default {
            schema.set_default(default.into_value().to_string());
        }

        self.ask_as(question, &schema)
    }

    /// Print what goes above the input line; returns the input prompt
    fn open_question(&mut self, question: &str, schema: &Schema) -> Result<String, AskError> {
        if schema.choices().is_empty() {
            return Ok(self.compose(question, schema));
        }

        let header = format!(
            "{}{}\r\n{}{}\r\n",
            self.style.prefix,
            question,
            CHOICE_PREFIX,
            render_choices(schema.choices(), schema.default_value())
        );
        self.source.write_raw(header.as_bytes())?;
        Ok(CHOICE_PREFIX.to_string())
    }

    /// Read until `check` accepts a line, reporting each rejection
    fn retry<T>(
        &mut self,
        prompt: &str,
        mut check: impl FnMut(&str) -> Result<T, ValidationError>,
    ) -> Result<T, AskError> {
        let mut had_error = false;
        loop {
            let line = self.source.read_line(prompt)?;
            match check(&line) {
                Ok(value) => {
                    if had_error {
                        self.source.write_raw(ansi::ERASE_LINE_CR)?;
                    }
                    return Ok(value);
                },
                Err(e) => {
                    self.report(&e)?;
                    had_error = true;
                },
            }
        }
    }

    fn collect_slice(&mut self, question: &str, schema: &Schema) -> Result<Vec<Value>, AskError> {
        let scalar = schema.kind().scalar();
        let required = schema.is_required();

        // Each element is optional; the empty line is the terminator
        let mut element = self.with_style_tokens(schema);
        element
            .set_kind(scalar)
            .set_modifiers(schema.modifiers() - Modifiers::REQUIRED);

        let mut header = self.compose_head(question);
        header.push_str("\r\n");
        self.source.write_raw(header.as_bytes())?;

        let prompt = self.style.multi_prefix.clone();
        let mut values = Vec::new();
        let mut had_error = false;

        loop {
            let line = self.source.read_line(&prompt)?;
            let done = if line.is_empty() {
                true
            } else {
                match validate::validate(&element, &line) {
                    Ok(v) if scalar.is_numeric() && v.is_zero() => true,
                    Ok(v) => {
                        values.push(v);
                        false
                    },
                    Err(e) => {
                        self.report(&e)?;
                        had_error = true;
                        continue;
                    },
                }
            };

            if done && required && values.is_empty() {
                self.report(&ValidationError::Required)?;
                had_error = true;
                continue;
            }
            if had_error {
                self.source.write_raw(ansi::ERASE_LINE_CR)?;
                had_error = false;
            }
            if done {
                break;
            }
        }

        // Remove the terminator line
        let mut tail = Vec::with_capacity(16);
        tail.extend_from_slice(ansi::ERASE_LINE_UP);
        tail.extend_from_slice(ansi::ERASE_LINE_CR);
        self.source.write_raw(&tail)?;

        tracing::debug!(count = values.len(), "slice collected");
        Ok(values)
    }

    /// Error under the prompt, then back up to the prompt line
    fn report(&mut self, err: &ValidationError) -> io::Result<()> {
        tracing::debug!("answer rejected: {}", err);
        let mut msg = Vec::new();
        msg.extend_from_slice(ansi::ERASE_LINE_CR);
        msg.extend_from_slice(self.style.error_prefix.as_bytes());
        msg.extend_from_slice(err.to_string().as_bytes());
        msg.extend_from_slice(ansi::CURSOR_UP);
        self.source.write_raw(&msg)
    }

    /// Boolean answers also accept the configured display strings
    fn with_style_tokens(&self, schema: &Schema) -> Schema {
        let mut schema = schema.clone();
        if schema.kind().scalar() == Scalar::Bool {
            schema.set_bool_tokens([
                (self.style.true_str.clone(), true),
                (self.style.false_str.clone(), false),
            ]);
        }
        schema
    }

    fn compose_head(&self, question: &str) -> String {
        let sep = if question.ends_with('?') { " " } else { ": " };
        format!("{}{}{}", self.style.prefix, question, sep)
    }

    /// Prefix, question, separator and the default in brackets
    fn compose(&self, question: &str, schema: &Schema) -> String {
        let mut prompt = self.compose_head(question);
        let Some(default) = schema.default_value() else {
            return prompt;
        };

        let (t, f) = (&self.style.true_str, &self.style.false_str);
        let suffix = match schema.kind().scalar() {
            Scalar::Bool => match validate::parse_bool(schema, default) {
                Ok(true) => format!("[{}/{}] ", ansi::bold(t), f),
                Ok(false) => format!("[{}/{}] ", t, ansi::bold(f)),
                Err(_) => format!("[{}] ", ansi::bold(default)),
            },
            _ => format!("[{}] ", ansi::bold(default)),
        };
        prompt.push_str(&suffix);
        prompt
    }
}

/// `[a b c]` with the default candidate in bold
fn render_choices(choices: &[Value], default: Option<&str>) -> String {
    let items: Vec<String> = choices
        .iter()
        .map(|c| {
            let text = c.to_string();
            if default == Some(text.as_str()) {
                ansi::bold(&text)
            } else {
                text
            }
        })
        .collect();
    format!("[{}]", items.join(" "))
}
