//! Gap buffer
//!
//! A fixed-capacity array of code points split into three regions:
//!
//! ```text
//!   buf: [ before-gap | gap ............ | after-gap ]
//!          0..gap_start  gap_start..=gap_end  gap_end+1..=buf_end
//! ```
//!
//! The logical text is `buf[..gap_start] ++ buf[gap_end + 1..]` and the
//! cursor sits at `gap_start`. Inserting at the cursor writes into the gap;
//! moving the cursor copies one code point across the gap per step. One gap
//! cell is always kept free, so `gap_start <= gap_end` holds at all times.

/// Default capacity, in code points
pub const DEFAULT_CAPACITY: usize = 4096;

const EMPTY: char = '\0';

/// How `put` treats the code point under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Shift the text after the cursor right
    #[default]
    Insert,
    /// Replace the code point after the cursor, if any
    Overwrite,
}

impl WriteMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            WriteMode::Insert => WriteMode::Overwrite,
            WriteMode::Overwrite => WriteMode::Insert,
        }
    }
}

/// Error type for gap buffer edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GapError {
    #[error("line is full ({capacity} characters)")]
    CapacityExceeded { capacity: usize },
}

/// An editable line of code points with the cursor at the gap
#[derive(Debug, Clone)]
pub struct GapBuffer {
    buf: Vec<char>,
    gap_start: usize,
    gap_end: usize,
    buf_end: usize,
    mode: WriteMode,
}

impl Default for GapBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GapBuffer {
    /// Create an empty buffer with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create an empty buffer holding up to `capacity` code points
    pub fn with_capacity(capacity: usize) -> Self {
        // One extra cell stays in the gap
        let len = capacity + 1;
        Self {
            buf: vec![EMPTY; len],
            gap_start: 0,
            gap_end: len - 1,
            buf_end: len - 1,
            mode: WriteMode::Insert,
        }
    }

    /// Create a buffer pre-seeded with `text`, cursor at the end
    ///
    /// Text beyond the capacity is dropped.
    pub fn from_text(text: &str, capacity: usize) -> Self {
        let mut buffer = Self::with_capacity(capacity);
        for c in text.chars() {
            if buffer.insert(c).is_err() {
                break;
            }
        }
        buffer
    }

    /// Maximum number of code points
    pub fn capacity(&self) -> usize {
        self.buf_end
    }

    /// Number of committed code points
    pub fn len(&self) -> usize {
        self.gap_start + (self.buf_end - self.gap_end)
    }

    /// Check if the buffer holds no text
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical cursor position (code points before the cursor)
    pub fn cursor(&self) -> usize {
        self.gap_start
    }

    /// First gap index
    pub fn gap_start(&self) -> usize {
        self.gap_start
    }

    /// Last gap index (inclusive)
    pub fn gap_end(&self) -> usize {
        self.gap_end
    }

    /// Current write mode
    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Set the write mode
    pub fn set_mode(&mut self, mode: WriteMode) {
        self.mode = mode;
    }

    /// Insert a code point at the cursor, advancing the cursor
    pub fn insert(&mut self, c: char) -> Result<(), GapError> {
        if self.gap_start == self.gap_end {
            return Err(GapError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }
        self.buf[self.gap_start] = c;
        self.gap_start += 1;
        Ok(())
    }

    /// Write a code point according to the current mode
    pub fn put(&mut self, c: char) -> Result<(), GapError> {
        if self.mode == WriteMode::Overwrite && self.delete_forward() {
            // Room was just freed, so this cannot fail
            return self.insert(c);
        }
        self.insert(c)
    }

    /// Move the cursor one code point right; false at the end of the text
    pub fn move_forward(&mut self) -> bool {
        if self.gap_end == self.buf_end {
            return false;
        }
        self.buf[self.gap_start] = self.buf[self.gap_end + 1];
        self.buf[self.gap_end + 1] = EMPTY;
        self.gap_start += 1;
        self.gap_end += 1;
        true
    }

    /// Move the cursor one code point left; false at the start of the text
    pub fn move_backward(&mut self) -> bool {
        if self.gap_start == 0 {
            return false;
        }
        self.buf[self.gap_end] = self.buf[self.gap_start - 1];
        self.buf[self.gap_start - 1] = EMPTY;
        self.gap_start -= 1;
        self.gap_end -= 1;
        true
    }

    /// Move the cursor just past the next space (start of the next word)
    pub fn word_forward(&mut self) {
        while self.move_forward() {
            if self.buf[self.gap_start - 1] == ' ' {
                break;
            }
        }
    }

    /// Move the cursor to the start of the current or previous word
    pub fn word_backward(&mut self) {
        while self.move_backward() {
            if self.gap_start == 0 || self.buf[self.gap_start - 1] == ' ' {
                break;
            }
        }
    }

    /// Move the cursor to the start of the text
    pub fn move_to_start(&mut self) {
        while self.move_backward() {}
    }

    /// Move the cursor to the end of the text
    pub fn move_to_end(&mut self) {
        while self.move_forward() {}
    }

    /// Delete the code point before the cursor; false if there is none
    pub fn delete_backward(&mut self) -> bool {
        if self.gap_start == 0 {
            return false;
        }
        self.gap_start -= 1;
        self.buf[self.gap_start] = EMPTY;
        true
    }

    /// Delete the code point after the cursor; false if there is none
    pub fn delete_forward(&mut self) -> bool {
        if self.gap_end == self.buf_end {
            return false;
        }
        self.gap_end += 1;
        self.buf[self.gap_end] = EMPTY;
        true
    }

    /// Remove all text
    pub fn clear(&mut self) {
        self.buf.fill(EMPTY);
        self.gap_start = 0;
        self.gap_end = self.buf_end;
    }

    /// Text before the cursor
    pub fn before_cursor(&self) -> &[char] {
        &self.buf[..self.gap_start]
    }

    /// Text after the cursor
    pub fn after_cursor(&self) -> &[char] {
        &self.buf[self.gap_end + 1..]
    }

    /// The logical text, in order
    pub fn materialize(&self) -> Vec<char> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.before_cursor());
        out.extend_from_slice(self.after_cursor());
        out
    }

    /// The logical text as a string
    pub fn text(&self) -> String {
        self.before_cursor()
            .iter()
            .chain(self.after_cursor())
            .collect()
    }
}
