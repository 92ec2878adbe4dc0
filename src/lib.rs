//! Mochi Prompt Library
//!
//! Collects typed, validated answers from an interactive terminal. The
//! terminal is put in raw mode, keystrokes are edited in place, Ctrl-C and
//! Ctrl-D are intercepted without ending the session, and every finished
//! line is checked against a schema until it is valid.
//!
//! - `term`: raw-mode session, original/working attributes, restore
//! - `core`: gap buffer and output control sequences
//! - `input`: keystroke decoding
//! - `router`: the reader thread that separates interrupts from text
//! - `editor`: single-line editor
//! - `validate`: schemas and answer parsing
//! - `ask`: questions and the retry loop
//! - `terminal`: all of the above wired to a real terminal
//! - `app`: configuration
//!
//! ```no_run
//! use mochi_prompt::ask::Prompter;
//! use mochi_prompt::terminal::Terminal;
//! use mochi_prompt::validate::{Scalar, Schema};
//!
//! let mut prompter = Prompter::new(Terminal::stdio()?);
//! let mut schema = Schema::new(Scalar::Int64);
//! schema.set_range(0, 120);
//! let age = prompter.ask_i64("Age?", &schema)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod app;
pub mod ask;
pub mod core;
pub mod editor;
pub mod input;
pub mod router;
pub mod term;
pub mod terminal;
pub mod validate;
