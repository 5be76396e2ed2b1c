//! Screen rendering for interactive mode.
//!
//! The Screen reads the document through public accessors and uses a Terminal
//! to render the visible portion of text, a status row and a message row. It
//! uses a double-buffered cell grid: render into `next`, diff against
//! `current`, emit only changed cells, then swap.
//!
//! ```text
//! row 0 .. h-3   text (ghost suggestions drawn in CellStyle::Ghost)
//! row h-2        status: title, modified flag, prediction indicator
//! row h-1        messages and prompts
//! ```

use std::iter;

use crate::buffer::Buffer;
use crate::cell_buffer::{Cell, CellBuffer, CellStyle};
use crate::document::Document;
use crate::overlay::Indicator;
use crate::position::Position;
use crate::span::SpanStyle;
use crate::terminal::{TermSize, Terminal};
use crate::viewport::{Scroll, Viewport, ViewportParams};

/// Rows below the text area: status and message.
const CHROME_ROWS: usize = 2;

const TAB_WIDTH: usize = 8;

/// Manages screen rendering.
pub struct Screen {
    /// The viewport tracking visible region.
    pub viewport: Viewport,
    /// What is currently on the terminal screen.
    current: CellBuffer,
    /// What we are rendering into before diffing.
    next: CellBuffer,
    /// Text of the message row.
    message: String,
    /// Last title sent to the terminal.
    title: String,
}

impl Screen {
    pub fn new(term_size: TermSize) -> Self {
        let height = term_size.height as usize;
        let width = term_size.width as usize;
        Self {
            viewport: Viewport::new(ViewportParams::new(text_rows(height), width)),
            current: CellBuffer::new(width, height),
            next: CellBuffer::new(width, height),
            message: String::new(),
            title: String::new(),
        }
    }

    /// Resize the screen (e.g. on terminal resize).
    pub fn resize(&mut self, term_size: TermSize) {
        let height = term_size.height as usize;
        let width = term_size.width as usize;
        self.viewport.resize(text_rows(height), width);
        self.current.resize(width, height);
        self.next.resize(width, height);
        self.invalidate();
    }

    /// Invalidate the screen, forcing a full redraw on next diff.
    pub fn invalidate(&mut self) {
        self.current.clear();
    }

    /// Number of usable text rows.
    pub fn text_height(&self) -> usize {
        self.viewport.params.height
    }

    /// Bring the cursor into view and bring the terminal up to date.
    pub fn fixup(&mut self, doc: &Document, indicator: Indicator, terminal: &mut dyn Terminal) {
        let buffer = doc.buffer();
        let pos = buffer.cursor_position();
        let column = display_column(buffer, pos);

        let scroll = self
            .viewport
            .scroll_for(pos.line, column, buffer.line_count());
        match scroll {
            Scroll::None => {}
            Scroll::Lines(n) => {
                self.viewport.apply(scroll);
                self.scroll_terminal(terminal, n);
            }
            Scroll::Slide(_) | Scroll::LinesAndSlide { .. } => self.viewport.apply(scroll),
            Scroll::Recentre => self.viewport.centre_on(pos.line, column),
        }

        let title = doc.title();
        if title != self.title {
            terminal.set_title(&title);
            self.title = title;
        }

        self.render_and_flush(doc, indicator, terminal);
        self.position_cursor(pos.line, column, terminal);
        terminal.flush();
    }

    /// Render every row into `next`, diff against `current`, emit changes, swap.
    fn render_and_flush(&mut self, doc: &Document, indicator: Indicator, terminal: &mut dyn Terminal) {
        self.next.clear();
        let buffer = doc.buffer();
        for row in 0..self.text_height() {
            let cells = self.line_cells(buffer, self.viewport.top_line + row);
            self.next.write_cells(row, &cells);
        }
        self.render_status(doc, indicator);
        if let Some(row) = self.message_row() {
            self.next.write_str(0, row as usize, &self.message);
        }
        CellBuffer::diff(&self.current, &self.next, terminal);
        std::mem::swap(&mut self.current, &mut self.next);
    }

    fn render_status(&mut self, doc: &Document, indicator: Indicator) {
        let Some(row) = self.current.height().checked_sub(CHROME_ROWS) else {
            return;
        };
        let modified = if doc.is_dirty() { " [+]" } else { "" };
        let (label, style) = match indicator {
            Indicator::Armed => (" PREDICT ON ", CellStyle::Armed),
            Indicator::Disarmed => (" PREDICT OFF ", CellStyle::Disarmed),
        };
        self.next.fill_row(row, CellStyle::Status);
        self.next
            .write_styled(0, row, &format!(" {}{modified}", doc.title()), CellStyle::Status);
        let col = self.next.width().saturating_sub(label.len());
        self.next.write_styled(col, row, label, style);
    }

    /// Scroll the physical terminal and shift `current` to match.
    /// After this, `current` accurately reflects what's on the terminal,
    /// so the subsequent `render_and_flush` diff only emits newly revealed rows.
    fn scroll_terminal(&mut self, terminal: &mut dyn Terminal, amount: i32) {
        let text_height = self.text_height();
        if amount.unsigned_abs() as usize >= text_height {
            return;
        }

        // Keep the status and message rows out of the scroll
        terminal.set_scroll_region(0, (text_height - 1) as u16);
        if amount > 0 {
            terminal.scroll_up(amount as u16);
        } else {
            terminal.scroll_down((-amount) as u16);
        }
        terminal.reset_scroll_region();

        self.current.shift_rows(0, text_height, amount);
    }

    /// The visible cells of a buffer line, styled by span.
    fn line_cells(&self, buffer: &Buffer, line: usize) -> Vec<Cell> {
        let Some(slice) = buffer.line(line) else {
            return Vec::new();
        };
        let start = buffer.line_start(line);
        let offset = self.viewport.offset;
        let end = offset + self.viewport.params.width;

        let mut cells = Vec::with_capacity(self.viewport.params.width);
        let mut col = 0;
        for (i, ch) in slice.chars().enumerate() {
            if ch == '\n' || ch == '\r' || col >= end {
                break;
            }
            let style = match buffer.style_at(start + i) {
                SpanStyle::Plain => CellStyle::Plain,
                SpanStyle::Suggested => CellStyle::Ghost,
            };
            for glyph in glyphs(ch, col) {
                if (offset..end).contains(&col) {
                    cells.push(Cell::styled(glyph, style));
                }
                col += 1;
            }
        }
        cells
    }

    /// Position the terminal cursor at a buffer line and display column.
    fn position_cursor(&self, line: usize, column: usize, terminal: &mut dyn Terminal) {
        let col = self.viewport.column_to_screen(column).unwrap_or(0);
        let row = self.viewport.line_to_row(line).unwrap_or(0);
        terminal.move_cursor(col as u16, row as u16);
    }

    /// Show a message on the bottom row of the screen.
    pub fn show_message(&mut self, terminal: &mut dyn Terminal, msg: &str) {
        self.message = msg.to_string();
        self.flush_message_row(terminal);
        terminal.flush();
    }

    /// Update the message row content and position cursor at a given column.
    /// Used by prompts to keep the prompt line in sync with the cell buffer.
    pub fn update_message_row(&mut self, terminal: &mut dyn Terminal, content: &str, cursor_col: usize) {
        self.message = content.to_string();
        self.flush_message_row(terminal);
        if let Some(row) = self.message_row() {
            terminal.move_cursor(cursor_col as u16, row);
        }
        terminal.flush();
    }

    /// Repaint just the message row, leaving the rest as it is on screen.
    fn flush_message_row(&mut self, terminal: &mut dyn Terminal) {
        let Some(row) = self.message_row() else {
            return;
        };
        let row = row as usize;
        for r in 0..row {
            self.next.copy_row_from(r, &self.current, r);
        }
        self.next.clear_row(row);
        self.next.write_str(0, row, &self.message);
        CellBuffer::diff(&self.current, &self.next, terminal);
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// The screen row used for messages (bottom row), if there is one.
    pub fn message_row(&self) -> Option<u16> {
        self.current.height().checked_sub(1).map(|row| row as u16)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Clear the message area. The next render overwrites it on screen.
    pub fn clear_message(&mut self) {
        self.message.clear();
    }
}

fn text_rows(height: usize) -> usize {
    height.saturating_sub(CHROME_ROWS).max(1)
}

/// Display cells for `ch` when it starts at display column `col`.
fn glyphs(ch: char, col: usize) -> impl Iterator<Item = char> {
    let (first, rest, count) = match ch {
        '\t' => (' ', ' ', TAB_WIDTH - col % TAB_WIDTH),
        // Control chars show as ^X
        c if c.is_ascii_control() => ('^', char::from(c as u8 ^ 0x40), 2),
        c => (c, c, 1),
    };
    iter::once(first).chain(iter::repeat(rest)).take(count)
}

/// Display column of a buffer position, with tabs and control chars expanded.
fn display_column(buffer: &Buffer, pos: Position) -> usize {
    buffer.line(pos.line).map_or(0, |line| {
        line.chars()
            .take(pos.column)
            .fold(0, |col, ch| col + glyphs(ch, col).count())
    })
}
