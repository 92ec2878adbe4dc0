//! Line Editor
//!
//! Reads one line from the router's input channel into a [`GapBuffer`],
//! repainting the prompt line after every change. The editor never touches
//! the input descriptor. Interrupts arrive on the same channel, in their
//! place among the bytes, and abort the read.
//!
//! State machine:
//!
//! ```text
//! Idle -> Editing -> Confirmed   (Enter)
//!                 -> Aborted     (Ctrl-C / Ctrl-D)
//!                 -> Failed      (read/write error, input closed)
//! ```

use std::io::{self, Write};

use crossbeam_channel::Receiver;
use thiserror::Error;

use crate::core::ansi;
use crate::core::{GapBuffer, WriteMode, DEFAULT_CAPACITY};
use crate::input::{Key, KeyDecoder};
use crate::router::{Interrupt, Routed};

/// Why a read produced no line
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("{0}")]
    Interrupted(Interrupt),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("terminal input closed")]
    Closed,
}

/// Where the editor is in its read cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    Editing,
    Confirmed,
    Aborted,
    Failed,
}

/// Single-line editor
#[derive(Debug)]
pub struct LineEditor {
    capacity: usize,
    buffer: GapBuffer,
    decoder: KeyDecoder,
    state: EditorState,
    prompt: String,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineEditor {
    /// Editor with the default line capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Editor whose lines hold at most `capacity` code points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: GapBuffer::with_capacity(capacity),
            decoder: KeyDecoder::new(),
            state: EditorState::Idle,
            prompt: String::new(),
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Line capacity in code points
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read one line after painting `prompt`
    pub fn read(
        &mut self,
        prompt: &str,
        input: &Receiver<Routed>,
        out: &mut dyn Write,
    ) -> Result<String, ReadError> {
        self.read_seeded(prompt, "", input, out)
    }

    /// Read one line starting from `seed`, cursor at its end
    pub fn read_seeded(
        &mut self,
        prompt: &str,
        seed: &str,
        input: &Receiver<Routed>,
        out: &mut dyn Write,
    ) -> Result<String, ReadError> {
        self.prompt.clear();
        self.prompt.push_str(prompt);
        self.buffer = GapBuffer::from_text(seed, self.capacity);
        self.decoder.reset();
        self.state = EditorState::Editing;
        tracing::debug!(capacity = self.capacity, "line read started");

        if let Err(e) = self.repaint(out) {
            return Err(self.fail(e.into()));
        }

        // Queued input outlives the router, so only an empty,
        // disconnected channel ends the read
        loop {
            match input.recv() {
                Ok(Routed::Byte(byte)) => match self.handle_byte(byte, out) {
                    Ok(Some(line)) => return Ok(line),
                    Ok(None) => {},
                    Err(e) => return Err(self.fail(e.into())),
                },
                Ok(Routed::Interrupt(interrupt)) => return Err(self.abort(interrupt, out)),
                Ok(Routed::Failed(e)) => return Err(self.fail(e.into())),
                Err(_) => return Err(self.fail(ReadError::Closed)),
            }
        }
    }

    fn handle_byte(&mut self, byte: u8, out: &mut dyn Write) -> io::Result<Option<String>> {
        let Some(key) = self.decoder.feed(byte) else {
            return Ok(None);
        };

        let changed = match key {
            Key::Enter => {
                out.write_all(ansi::CRLF)?;
                out.flush()?;
                self.state = EditorState::Confirmed;
                tracing::debug!(len = self.buffer.len(), "line confirmed");
                return Ok(Some(self.buffer.text()));
            },
            Key::Char(c) => match self.buffer.put(c) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!("keystroke ignored: {}", e);
                    false
                },
            },
            Key::Backspace => self.buffer.delete_backward(),
            Key::Delete => self.buffer.delete_forward(),
            Key::Left => self.buffer.move_backward(),
            Key::Right => self.buffer.move_forward(),
            Key::Home => {
                self.buffer.move_to_start();
                true
            },
            Key::End => {
                self.buffer.move_to_end();
                true
            },
            Key::WordLeft => {
                self.buffer.word_backward();
                true
            },
            Key::WordRight => {
                self.buffer.word_forward();
                true
            },
            Key::Insert => {
                let mode = self.buffer.mode().toggled();
                self.buffer.set_mode(mode);
                tracing::debug!(?mode, "write mode");
                false
            },
            // Single-line editor: no history
            Key::Up | Key::Down => false,
        };

        if changed {
            self.repaint(out)?;
        }
        Ok(None)
    }

    /// Erase the line and redraw prompt and text with the cursor in place
    fn repaint(&self, out: &mut dyn Write) -> io::Result<()> {
        let text = self.buffer.text();
        let col = ansi::visible_width(&self.prompt) + ansi::chars_width(self.buffer.before_cursor());

        let mut frame =
            Vec::with_capacity(ansi::ERASE_LINE_CR.len() + self.prompt.len() + text.len() + 8);
        frame.extend_from_slice(ansi::ERASE_LINE_CR);
        frame.extend_from_slice(self.prompt.as_bytes());
        frame.extend_from_slice(text.as_bytes());
        frame.extend_from_slice(ansi::CR);
        frame.extend_from_slice(&ansi::cursor_forward(col));

        out.write_all(&frame)?;
        out.flush()
    }

    fn abort(&mut self, interrupt: Interrupt, out: &mut dyn Write) -> ReadError {
        tracing::debug!(?interrupt, "line read aborted");
        self.buffer.clear();
        self.buffer.set_mode(WriteMode::Insert);
        self.decoder.reset();

        let echoed = out
            .write_all(interrupt.caret().as_bytes())
            .and_then(|()| out.write_all(ansi::CRLF))
            .and_then(|()| out.flush());
        if let Err(e) = echoed {
            tracing::warn!("failed to echo {}: {}", interrupt.caret(), e);
            return self.fail(e.into());
        }

        self.state = EditorState::Aborted;
        ReadError::Interrupted(interrupt)
    }

    fn fail(&mut self, err: ReadError) -> ReadError {
        tracing::debug!("line read failed: {}", err);
        self.state = EditorState::Failed;
        err
    }
}
