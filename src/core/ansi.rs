//! ANSI control sequences written to the terminal
//!
//! References: <https://vt100.net/docs/vt100-ug/chapter3.html> and
//! <https://invisible-island.net/xterm/ctlseqs/ctlseqs.html>

use unicode_width::UnicodeWidthChar;

/// Carriage return
pub const CR: &[u8] = b"\r";
/// New line in raw mode (output post-processing is off)
pub const CRLF: &[u8] = b"\r\n";

/// Cursor up one line
pub const CURSOR_UP: &[u8] = b"\x1b[A";
/// Cursor down one line
pub const CURSOR_DOWN: &[u8] = b"\x1b[B";
/// Cursor forward one column
pub const CURSOR_FORWARD: &[u8] = b"\x1b[C";
/// Cursor backward one column
pub const CURSOR_BACKWARD: &[u8] = b"\x1b[D";

/// Erase the whole line, then carriage return
pub const ERASE_LINE_CR: &[u8] = b"\x1b[2K\r";
/// Erase the whole line, then cursor up
pub const ERASE_LINE_UP: &[u8] = b"\x1b[2K\x1b[A";

/// Bold on
pub const BOLD: &str = "\x1b[1m";
/// All attributes off
pub const RESET: &str = "\x1b[0m";

/// Wrap `text` in bold on/off
pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{RESET}")
}

/// Bytes that move the cursor forward `n` columns (empty for 0)
pub fn cursor_forward(n: usize) -> Vec<u8> {
    match n {
        0 => Vec::new(),
        1 => CURSOR_FORWARD.to_vec(),
        n => format!("\x1b[{n}C").into_bytes(),
    }
}

/// Columns `text` occupies on screen
///
/// Escape sequences (CSI and two-byte ESC sequences) take no columns, which
/// keeps the cursor math right for prompts carrying bold defaults.
pub fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            width += c.width().unwrap_or(0);
            continue;
        }
        match chars.next() {
            Some('[') => {
                // Parameters and intermediates until a final byte in 0x40..=0x7E
                for c in chars.by_ref() {
                    if ('\x40'..='\x7e').contains(&c) {
                        break;
                    }
                }
            },
            Some(_) | None => {},
        }
    }

    width
}

/// Columns taken by a run of code points
pub fn chars_width(chars: &[char]) -> usize {
    chars.iter().map(|c| c.width().unwrap_or(0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_width_plain() {
        assert_eq!(visible_width(" + Name: "), 9);
        assert_eq!(visible_width(""), 0);
    }

    #[test]
    fn test_visible_width_skips_sgr() {
        let prompt = format!(" + Age? [{}] ", bold("16"));
        assert_eq!(prompt.len(), 13 + BOLD.len() + RESET.len());
        assert_eq!(visible_width(&prompt), 13);
    }

    #[test]
    fn test_visible_width_wide_chars() {
        assert_eq!(visible_width("日本"), 4);
        assert_eq!(chars_width(&['a', '日']), 3);
    }

    #[test]
    fn test_cursor_forward() {
        assert!(cursor_forward(0).is_empty());
        assert_eq!(cursor_forward(1), CURSOR_FORWARD);
        assert_eq!(cursor_forward(12), b"\x1b[12C");
    }
}
