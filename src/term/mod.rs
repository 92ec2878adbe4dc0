//! Terminal session handling for Unix
//!
//! This module owns the controlling terminal's attributes: it captures the
//! original termios snapshot, applies raw/echo/character modes to a working
//! copy, and restores the original on every exit path.

mod session;

pub use session::{RestoreHandle, Session};

use bitflags::bitflags;

/// Error type for terminal operations
#[derive(Debug, thiserror::Error)]
pub enum TermError {
    #[error("Failed to get terminal attributes: {0}")]
    GetAttr(#[source] nix::Error),

    #[error("Failed to set terminal attributes: {0}")]
    SetAttr(#[source] nix::Error),

    #[error("Failed to get window size: {0}")]
    WindowSize(#[source] nix::Error),

    #[error("Input is not a terminal")]
    NotATerminal,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for terminal operations
pub type TermResult<T> = Result<T, TermError>;

bitflags! {
    /// Modes applied to the working snapshot since the session opened
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modes: u8 {
        const RAW = 1 << 0;
        const ECHO = 1 << 1;
        const CHAR = 1 << 2;
        /// Attributes set wholesale through `Session::set_state`
        const OTHER = 1 << 3;
    }
}

/// Window size of the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl Default for WindowSize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}
