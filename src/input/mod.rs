//! Input Decoding Module
//!
//! Turns the raw bytes read from a terminal in raw mode into editing keys.
//! This is the reverse of what a terminal does when it encodes key presses:
//!
//! - Printable ASCII and UTF-8 multi-byte sequences become characters
//! - CR is Enter (raw mode does no CR to NL translation)
//! - DEL and BS both erase backwards
//! - CSI (`ESC [`) and SS3 (`ESC O`) sequences become cursor/navigation keys
//!
//! Bytes that do not map to an editing key are dropped. Ctrl-C and Ctrl-D
//! never get here; the interrupt router claims them first.

/// Keys the line editor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable code point
    Char(char),
    Enter,
    Backspace,
    /// Delete the code point after the cursor
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    WordLeft,
    WordRight,
    /// Toggle insert/overwrite
    Insert,
}

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
    Ss3,
    Utf8 { remaining: u8 },
}

/// Maximum parameter bytes kept for one CSI sequence
const MAX_PARAMS: usize = 16;

/// Byte-at-a-time key decoder
#[derive(Debug)]
pub struct KeyDecoder {
    state: State,
    /// CSI parameter and intermediate bytes
    params: Vec<u8>,
    /// UTF-8 bytes collected so far
    utf8_buffer: Vec<u8>,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    /// Create a decoder in the ground state
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: Vec::with_capacity(MAX_PARAMS),
            utf8_buffer: Vec::with_capacity(4),
        }
    }

    /// Drop any partial sequence
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.params.clear();
        self.utf8_buffer.clear();
    }

    /// Decode a whole chunk, returning the keys it completes
    pub fn decode(&mut self, data: &[u8]) -> Vec<Key> {
        data.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Feed one byte; returns a key once a sequence completes
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            State::Ground => self.ground(byte),
            State::Escape => self.escape(byte),
            State::Csi => self.csi(byte),
            State::Ss3 => {
                self.state = State::Ground;
                match byte {
                    b'A' => Some(Key::Up),
                    b'B' => Some(Key::Down),
                    b'C' => Some(Key::Right),
                    b'D' => Some(Key::Left),
                    b'H' => Some(Key::Home),
                    b'F' => Some(Key::End),
                    _ => None,
                }
            },
            State::Utf8 { remaining } => self.utf8(byte, remaining),
        }
    }

    fn ground(&mut self, byte: u8) -> Option<Key> {
        match byte {
            0x1b => {
                self.state = State::Escape;
                None
            },
            b'\r' => Some(Key::Enter),
            0x7f | 0x08 => Some(Key::Backspace),
            0x01 => Some(Key::Home),
            0x05 => Some(Key::End),
            0x20..=0x7e => Some(Key::Char(byte as char)),
            0xc2..=0xdf => self.start_utf8(byte, 1),
            0xe0..=0xef => self.start_utf8(byte, 2),
            0xf0..=0xf4 => self.start_utf8(byte, 3),
            _ => {
                tracing::trace!(byte, "ignored input byte");
                None
            },
        }
    }

    fn escape(&mut self, byte: u8) -> Option<Key> {
        match byte {
            b'[' => {
                self.params.clear();
                self.state = State::Csi;
                None
            },
            b'O' => {
                self.state = State::Ss3;
                None
            },
            // ESC ESC: the second one starts a new sequence
            0x1b => None,
            b'b' => {
                self.state = State::Ground;
                Some(Key::WordLeft)
            },
            b'f' => {
                self.state = State::Ground;
                Some(Key::WordRight)
            },
            _ => {
                self.state = State::Ground;
                None
            },
        }
    }

    fn csi(&mut self, byte: u8) -> Option<Key> {
        match byte {
            0x20..=0x3f => {
                if self.params.len() < MAX_PARAMS {
                    self.params.push(byte);
                }
                None
            },
            0x40..=0x7e => {
                self.state = State::Ground;
                let key = self.dispatch_csi(byte);
                self.params.clear();
                key
            },
            _ => {
                // A control byte aborts the sequence
                self.reset();
                None
            },
        }
    }

    fn dispatch_csi(&self, final_byte: u8) -> Option<Key> {
        let params = self.params.as_slice();
        // xterm sends modifiers as a second parameter: 5 is Ctrl, 3 is Alt
        let word = matches!(params, b"1;5" | b"1;3" | b"5");

        match (final_byte, params) {
            (b'A', _) => Some(Key::Up),
            (b'B', _) => Some(Key::Down),
            (b'C', _) if word => Some(Key::WordRight),
            (b'D', _) if word => Some(Key::WordLeft),
            (b'C', _) => Some(Key::Right),
            (b'D', _) => Some(Key::Left),
            (b'H', _) => Some(Key::Home),
            (b'F', _) => Some(Key::End),
            (b'~', b"1" | b"7") => Some(Key::Home),
            (b'~', b"4" | b"8") => Some(Key::End),
            (b'~', b"2") => Some(Key::Insert),
            (b'~', b"3") => Some(Key::Delete),
            _ => {
                tracing::trace!(final_byte, "ignored CSI sequence");
                None
            },
        }
    }

    fn start_utf8(&mut self, byte: u8, remaining: u8) -> Option<Key> {
        self.utf8_buffer.clear();
        self.utf8_buffer.push(byte);
        self.state = State::Utf8 { remaining };
        None
    }

    fn utf8(&mut self, byte: u8, remaining: u8) -> Option<Key> {
        if !(0x80..=0xbf).contains(&byte) {
            // Broken sequence: drop what we had and decode this byte fresh
            self.reset();
            return self.feed(byte);
        }

        self.utf8_buffer.push(byte);
        if remaining > 1 {
            self.state = State::Utf8 {
                remaining: remaining - 1,
            };
            return None;
        }

        self.state = State::Ground;
        let key = std::str::from_utf8(&self.utf8_buffer)
            .ok()
            .and_then(|s| s.chars().next())
            .filter(|c| !c.is_control())
            .map(Key::Char);
        self.utf8_buffer.clear();
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printable_ascii() {
        let mut dec = KeyDecoder::new();
        assert_eq!(
            dec.decode(b"ab 1"),
            vec![
                Key::Char('a'),
                Key::Char('b'),
                Key::Char(' '),
                Key::Char('1')
            ]
        );
    }

    #[test]
    fn test_control_keys() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.feed(b'\r'), Some(Key::Enter));
        assert_eq!(dec.feed(0x7f), Some(Key::Backspace));
        assert_eq!(dec.feed(0x08), Some(Key::Backspace));
        assert_eq!(dec.feed(b'\n'), None);
        assert_eq!(dec.feed(b'\t'), None);
        assert_eq!(dec.feed(0x01), Some(Key::Home));
        assert_eq!(dec.feed(0x05), Some(Key::End));
    }

    #[test]
    fn test_cursor_keys() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.decode(b"\x1b[A"), vec![Key::Up]);
        assert_eq!(dec.decode(b"\x1b[B"), vec![Key::Down]);
        assert_eq!(dec.decode(b"\x1b[C"), vec![Key::Right]);
        assert_eq!(dec.decode(b"\x1b[D"), vec![Key::Left]);
        assert_eq!(dec.decode(b"\x1bOD"), vec![Key::Left]);
    }

    #[test]
    fn test_navigation_keys() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.decode(b"\x1b[H\x1b[F"), vec![Key::Home, Key::End]);
        assert_eq!(dec.decode(b"\x1b[1~\x1b[4~"), vec![Key::Home, Key::End]);
        assert_eq!(dec.decode(b"\x1b[3~"), vec![Key::Delete]);
        assert_eq!(dec.decode(b"\x1b[2~"), vec![Key::Insert]);
        assert_eq!(dec.decode(b"\x1b[6~"), vec![]);
    }

    #[test]
    fn test_word_keys() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.decode(b"\x1b[1;5C"), vec![Key::WordRight]);
        assert_eq!(dec.decode(b"\x1b[1;5D"), vec![Key::WordLeft]);
        assert_eq!(dec.decode(b"\x1bf\x1bb"), vec![Key::WordRight, Key::WordLeft]);
    }

    #[test]
    fn test_utf8() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.decode("é日🎉".as_bytes()), vec![
            Key::Char('é'),
            Key::Char('日'),
            Key::Char('🎉')
        ]);
    }

    #[test]
    fn test_broken_utf8_recovers() {
        let mut dec = KeyDecoder::new();
        // Lead byte of a 2-byte sequence followed by ASCII
        assert_eq!(dec.decode(&[0xc3, b'a']), vec![Key::Char('a')]);
        // Stray continuation byte
        assert_eq!(dec.decode(&[0x80, b'b']), vec![Key::Char('b')]);
    }

    #[test]
    fn test_split_sequences() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.feed(0x1b), None);
        assert_eq!(dec.feed(b'['), None);
        assert_eq!(dec.feed(b'D'), Some(Key::Left));
        assert_eq!(dec.feed(b'x'), Some(Key::Char('x')));
    }

    #[test]
    fn test_unknown_escape_returns_to_ground() {
        let mut dec = KeyDecoder::new();
        assert_eq!(dec.decode(b"\x1bzq"), vec![Key::Char('q')]);
    }
}
