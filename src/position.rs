//! Line/column positions for the editor.
//!
//! The buffer addresses text by char index; the screen and cursor motion
//! think in lines and columns. These helpers convert between the two.

use ropey::Rope;

/// A position in the buffer, represented as line and column.
///
/// Both `line` and `column` are 0-indexed. Unlike a char index, a column may
/// briefly point past the end of a short line while moving up and down; it is
/// clamped whenever it is turned back into a char index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Create a new position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Create a position at the start of the buffer.
    pub fn zero() -> Self {
        Self { line: 0, column: 0 }
    }

    /// The position of char index `idx` (clamped to the end of the rope).
    pub fn from_char_index(rope: &Rope, idx: usize) -> Self {
        let idx = idx.min(rope.len_chars());
        let line = rope.char_to_line(idx);
        Self::new(line, idx - rope.line_to_char(line))
    }

    /// The char index of this position, clamped to existing text.
    pub fn to_char_index(&self, rope: &Rope) -> usize {
        let last_line = rope.len_lines().saturating_sub(1);
        let line = self.line.min(last_line);
        let column = self.column.min(line_length_excluding_newline(rope, line));
        rope.line_to_char(line) + column
    }
}

/// Length of a line in chars, not counting its line terminator.
pub fn line_length_excluding_newline(rope: &Rope, line: usize) -> usize {
    if line >= rope.len_lines() {
        return 0;
    }
    let slice = rope.line(line);
    let mut len = slice.len_chars();
    if len > 0 && slice.char(len - 1) == '\n' {
        len -= 1;
    }
    if len > 0 && slice.char(len - 1) == '\r' {
        len -= 1;
    }
    len
}
