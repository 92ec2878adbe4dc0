//! Editing Core Module
//!
//! Platform-independent editing state. This module contains:
//! - The gap buffer holding one input line
//! - The ANSI control sequences written to the terminal, and visible-width
//!   math that skips styling bytes
//!
//! Nothing here touches a file descriptor; the editor and the session do.

pub mod ansi;
mod gap_buffer;

pub use gap_buffer::{GapBuffer, GapError, WriteMode, DEFAULT_CAPACITY};
