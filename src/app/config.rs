//! Configuration for prompts

use serde::{Deserialize, Serialize};

use crate::ask::PromptStyle;
use crate::core::DEFAULT_CAPACITY;
use crate::router::{Interrupt, InterruptAction, DEFAULT_BYTE_CAPACITY};

/// Prompt configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// How questions look
    pub prompt: PromptStyle,
    /// What Ctrl-C and Ctrl-D do
    pub interrupts: InterruptConfig,
    /// Line editor limits
    pub editor: EditorConfig,
}

/// Exit codes per interrupt; `None` only aborts the current question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptConfig {
    pub ctrl_c_exit: Option<i32>,
    pub ctrl_d_exit: Option<i32>,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self {
            // 128 + SIGINT, like a shell
            ctrl_c_exit: Some(130),
            ctrl_d_exit: None,
        }
    }
}

impl InterruptConfig {
    /// Handler to register for `interrupt`
    pub fn action(&self, interrupt: Interrupt) -> InterruptAction {
        let code = match interrupt {
            Interrupt::CtrlC => self.ctrl_c_exit,
            Interrupt::CtrlD => self.ctrl_d_exit,
        };
        code.map_or(InterruptAction::Abort, InterruptAction::Exit)
    }
}

/// Line editor limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Longest answer, in code points
    pub buffer_capacity: usize,
    /// Keystrokes queued between the reader thread and the editor
    pub channel_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            channel_capacity: DEFAULT_BYTE_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from default location or return default config
    pub fn load_or_default() -> Self {
        // Try to load from ~/.config/mochi/prompt.json
        if let Some(config_dir) = dirs_config_path() {
            let config_path = config_dir.join("prompt.json");
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }
}

/// Get the configuration directory path
fn dirs_config_path() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| std::path::PathBuf::from(home).join(".config").join("mochi"))
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
