//! Application glue module
//!
//! Configuration loaded from `~/.config/mochi/prompt.json`.

mod config;

pub use config::{Config, ConfigError, EditorConfig, InterruptConfig};
