//! The text buffer: a Rope with a cursor and styled spans.

use std::fmt;
use std::ops::Range;

use ropey::{Rope, RopeSlice};

use crate::position::{Position, line_length_excluding_newline};
use crate::span::{SpanSet, SpanStyle, StyledSpan};

/// An editable text buffer.
///
/// The cursor is a char index. Every change to the text bumps `revision`,
/// which lets a late prediction result tell whether the text it was computed
/// for is still there.
#[derive(Debug, Default)]
pub struct Buffer {
    rope: Rope,
    cursor: usize,
    spans: SpanSet,
    revision: u64,
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rope)
    }
}

// Constructors
impl Buffer {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            ..Self::default()
        }
    }
}

// Text changes
impl Buffer {
    /// Insert `text` at char index `at` with the given style.
    ///
    /// A cursor sitting exactly at `at` stays where it is, so text inserted
    /// at the cursor appears after it.
    pub fn insert(&mut self, at: usize, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        let at = at.min(self.rope.len_chars());
        let len = text.chars().count();
        self.rope.insert(at, text);
        self.spans.update_after_insert(at, len);
        if style != SpanStyle::Plain {
            self.spans.set(at..at + len, style);
        }
        if self.cursor > at {
            self.cursor += len;
        }
        self.revision += 1;
    }

    /// Insert plain text at the cursor and move the cursor past it.
    pub fn insert_at_cursor(&mut self, text: &str) {
        let at = self.cursor;
        self.insert(at, text, SpanStyle::Plain);
        self.cursor = at + text.chars().count();
    }

    /// Remove the chars in `range`. Returns false if there was nothing to remove.
    pub fn remove(&mut self, range: Range<usize>) -> bool {
        let end = range.end.min(self.rope.len_chars());
        let start = range.start.min(end);
        if start == end {
            return false;
        }
        self.rope.remove(start..end);
        self.spans.update_after_delete(start..end);
        if self.cursor >= end {
            self.cursor -= end - start;
        } else if self.cursor > start {
            self.cursor = start;
        }
        self.revision += 1;
        true
    }

    /// Change the style of `range` without touching the text.
    pub fn restyle(&mut self, range: Range<usize>, style: SpanStyle) {
        self.spans.set(range, style);
    }

    /// Delete the char before the cursor.
    pub fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        // Treat CRLF as one line break
        let start = if self.cursor >= 2
            && self.slice(self.cursor - 2..self.cursor).as_deref() == Some("\r\n")
        {
            self.cursor - 2
        } else {
            self.cursor - 1
        };
        self.remove(start..self.cursor)
    }

    /// Delete the char under the cursor.
    pub fn delete_forward(&mut self) -> bool {
        let end = if self.slice(self.cursor..self.cursor + 2).as_deref() == Some("\r\n") {
            self.cursor + 2
        } else {
            self.cursor + 1
        };
        self.remove(self.cursor..end)
    }

    /// Replace all text, resetting cursor and styles.
    pub fn replace_all(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = 0;
        self.spans.clear();
        self.revision += 1;
    }
}

// Cursor motion
impl Buffer {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, idx: usize) {
        self.cursor = idx.min(self.rope.len_chars());
    }

    /// The cursor as a line/column position.
    pub fn cursor_position(&self) -> Position {
        Position::from_char_index(&self.rope, self.cursor)
    }

    pub fn set_cursor_position(&mut self, pos: Position) {
        self.cursor = pos.to_char_index(&self.rope);
    }

    pub fn move_left(&mut self) {
        let pos = self.cursor_position();
        if pos.column > 0 {
            self.cursor -= 1;
        } else if pos.line > 0 {
            let line = pos.line - 1;
            self.set_cursor_position(Position::new(line, self.line_len(line)));
        }
    }

    pub fn move_right(&mut self) {
        let pos = self.cursor_position();
        if pos.column < self.line_len(pos.line) {
            self.cursor += 1;
        } else if pos.line + 1 < self.line_count() {
            self.set_cursor_position(Position::new(pos.line + 1, 0));
        }
    }

    /// Move up (negative) or down (positive) by `delta` lines, keeping the column.
    pub fn move_lines(&mut self, delta: isize) {
        let pos = self.cursor_position();
        let last = self.line_count().saturating_sub(1);
        let line = pos.line.saturating_add_signed(delta).min(last);
        self.set_cursor_position(Position::new(line, pos.column));
    }

    pub fn move_line_start(&mut self) {
        let pos = self.cursor_position();
        self.set_cursor_position(Position::new(pos.line, 0));
    }

    pub fn move_line_end(&mut self) {
        let pos = self.cursor_position();
        self.set_cursor_position(Position::new(pos.line, self.line_len(pos.line)));
    }
}

// Queries
impl Buffer {
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_blank(&self) -> bool {
        self.rope.chars().all(char::is_whitespace)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Wind the revision back after an edit that was undone exactly, so the
    /// text at `revision` is the text now.
    pub(crate) fn restore_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// The text in `range`, or `None` if it runs past the end.
    pub fn slice(&self, range: Range<usize>) -> Option<String> {
        if range.start > range.end || range.end > self.rope.len_chars() {
            return None;
        }
        Some(self.rope.slice(range).to_string())
    }

    /// Everything from the start of the buffer up to the cursor.
    pub fn text_before_cursor(&self) -> String {
        self.rope.slice(..self.cursor).to_string()
    }

    pub fn style_at(&self, idx: usize) -> SpanStyle {
        self.spans.style_at(idx)
    }

    /// True if every char in `range` is styled `style`.
    pub fn is_styled(&self, range: Range<usize>, style: SpanStyle) -> bool {
        self.spans.covers(range, style)
    }

    pub fn spans(&self) -> impl Iterator<Item = &StyledSpan> {
        self.spans.iter()
    }

    /// Number of lines, counting an empty line after a trailing newline.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    pub fn line(&self, line: usize) -> Option<RopeSlice<'_>> {
        self.rope.get_line(line)
    }

    /// Char index of the first char of `line`.
    pub fn line_start(&self, line: usize) -> usize {
        self.rope.line_to_char(line.min(self.rope.len_lines()))
    }

    pub fn line_len(&self, line: usize) -> usize {
        line_length_excluding_newline(&self.rope, line)
    }
}
