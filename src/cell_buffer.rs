//! Double-buffered cell grid for efficient screen rendering.
//!
//! The screen renders into a "next" buffer, diffs it cell-by-cell against the
//! "current" buffer, emits only the changed cells through the terminal, then
//! swaps. Each cell carries a style, so a ghost suggestion appearing or being
//! committed repaints just the affected characters.

use crate::terminal::Terminal;

/// How a cell is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellStyle {
    /// Ordinary text.
    #[default]
    Plain,
    /// A suggested word that has not been accepted.
    Ghost,
    /// The status row.
    Status,
    /// The prediction indicator while prediction is armed.
    Armed,
    /// The prediction indicator while prediction is off.
    Disarmed,
}

/// A single screen cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: CellStyle,
}

impl Cell {
    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            style: CellStyle::Plain,
        }
    }

    pub fn styled(ch: char, style: CellStyle) -> Self {
        Self { ch, style }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Cell::plain(' ')
    }
}

/// A 2D grid of cells representing the terminal screen.
pub struct CellBuffer {
    cells: Vec<Cell>,
    width: usize,
    height: usize,
}

impl CellBuffer {
    /// Cursor moves cost about 6 bytes; runs swallow matching gaps up to this
    /// many cells rather than pay for another move.
    const GAP_THRESHOLD: usize = 4;

    /// Create a new buffer filled with spaces.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![Cell::default(); width * height],
            width,
            height,
        }
    }

    /// Resize the buffer, filling with spaces.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![Cell::default(); width * height];
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the cell at (col, row).
    pub fn get(&self, col: usize, row: usize) -> Cell {
        if col < self.width && row < self.height {
            self.cells[row * self.width + col]
        } else {
            Cell::default()
        }
    }

    /// Set the cell at (col, row).
    pub fn set(&mut self, col: usize, row: usize, cell: Cell) {
        if col < self.width && row < self.height {
            self.cells[row * self.width + col] = cell;
        }
    }

    /// Write plain text starting at (col, row), clamped to width.
    pub fn write_str(&mut self, col: usize, row: usize, s: &str) {
        self.write_styled(col, row, s, CellStyle::Plain);
    }

    /// Write text in one style starting at (col, row), clamped to width.
    pub fn write_styled(&mut self, col: usize, row: usize, s: &str, style: CellStyle) {
        if row >= self.height {
            return;
        }
        for (c, ch) in (col..self.width).zip(s.chars()) {
            self.cells[row * self.width + c] = Cell::styled(ch, style);
        }
    }

    /// Copy cells into a row starting at column 0, clamped to width.
    pub fn write_cells(&mut self, row: usize, cells: &[Cell]) {
        if row >= self.height {
            return;
        }
        let start = row * self.width;
        let count = cells.len().min(self.width);
        self.cells[start..start + count].copy_from_slice(&cells[..count]);
    }

    /// Fill a row with spaces in the given style.
    pub fn fill_row(&mut self, row: usize, style: CellStyle) {
        if row >= self.height {
            return;
        }
        let start = row * self.width;
        self.cells[start..start + self.width].fill(Cell::styled(' ', style));
    }

    /// Fill a row with plain spaces.
    pub fn clear_row(&mut self, row: usize) {
        self.fill_row(row, CellStyle::Plain);
    }

    /// Fill the entire buffer with spaces.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Shift rows within a range up (positive) or down (negative) by `amount`.
    /// Newly revealed rows are cleared to spaces.
    /// Only rows in `start_row..end_row` are affected.
    pub fn shift_rows(&mut self, start_row: usize, end_row: usize, amount: i32) {
        let end_row = end_row.min(self.height);
        if start_row >= end_row {
            return;
        }
        let range_height = end_row - start_row;
        let abs = amount.unsigned_abs() as usize;
        if abs >= range_height {
            for row in start_row..end_row {
                self.clear_row(row);
            }
            return;
        }

        if amount > 0 {
            // Shift up: bottom `abs` rows of the range are cleared
            let src = (start_row + abs) * self.width..end_row * self.width;
            self.cells.copy_within(src, start_row * self.width);
            for row in end_row - abs..end_row {
                self.clear_row(row);
            }
        } else {
            // Shift down: top `abs` rows of the range are cleared
            let src = start_row * self.width..(end_row - abs) * self.width;
            self.cells.copy_within(src, (start_row + abs) * self.width);
            for row in start_row..start_row + abs {
                self.clear_row(row);
            }
        }
    }

    /// Copy a row from another buffer into this buffer.
    pub fn copy_row_from(&mut self, row: usize, src: &CellBuffer, src_row: usize) {
        if row >= self.height || src_row >= src.height {
            return;
        }
        let copy_width = self.width.min(src.width);
        let dst_start = row * self.width;
        let src_start = src_row * src.width;
        self.cells[dst_start..dst_start + copy_width]
            .copy_from_slice(&src.cells[src_start..src_start + copy_width]);
        // Clear remaining columns if dst is wider
        self.cells[dst_start + copy_width..dst_start + self.width].fill(Cell::default());
    }

    /// Diff two buffers and emit only changed cells via the terminal.
    ///
    /// Consecutive changes of the same style on a row are coalesced into one
    /// `write_str`. The terminal is assumed to be in `CellStyle::Plain` on
    /// entry and is left that way.
    pub fn diff(current: &CellBuffer, next: &CellBuffer, terminal: &mut dyn Terminal) {
        let height = current.height.min(next.height);
        let width = current.width.min(next.width);
        let mut active = CellStyle::Plain;

        for row in 0..height {
            let cur = &current.cells[row * current.width..row * current.width + width];
            let nxt = &next.cells[row * next.width..row * next.width + width];

            let mut col = 0;
            while col < width {
                if cur[col] == nxt[col] {
                    col += 1;
                    continue;
                }

                let start_col = col;
                let style = nxt[col].style;
                let mut run = String::new();
                loop {
                    while col < width && cur[col] != nxt[col] && nxt[col].style == style {
                        run.push(nxt[col].ch);
                        col += 1;
                    }

                    // Look past a short gap of unchanged cells in the same style
                    let gap_start = col;
                    while col < width
                        && col - gap_start < Self::GAP_THRESHOLD
                        && cur[col] == nxt[col]
                        && nxt[col].style == style
                    {
                        col += 1;
                    }

                    if col > gap_start
                        && col < width
                        && col - gap_start < Self::GAP_THRESHOLD
                        && cur[col] != nxt[col]
                        && nxt[col].style == style
                    {
                        run.extend(nxt[gap_start..col].iter().map(|cell| cell.ch));
                    } else {
                        col = gap_start;
                        break;
                    }
                }

                terminal.move_cursor(start_col as u16, row as u16);
                if style != active {
                    terminal.set_style(style);
                    active = style;
                }
                terminal.write_str(&run);
            }
        }

        if active != CellStyle::Plain {
            terminal.set_style(CellStyle::Plain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::{MockOp, MockTerminal};

    fn ch(c: char) -> Cell {
        Cell::plain(c)
    }

    #[test]
    fn test_new_filled_with_spaces() {
        let buf = CellBuffer::new(10, 5);
        assert_eq!(buf.width(), 10);
        assert_eq!(buf.height(), 5);
        for row in 0..5 {
            for col in 0..10 {
                assert_eq!(buf.get(col, row), ch(' '));
            }
        }
    }

    #[test]
    fn test_write_str() {
        let mut buf = CellBuffer::new(10, 3);
        buf.write_str(2, 1, "hello");
        assert_eq!(buf.get(1, 1), ch(' '));
        assert_eq!(buf.get(2, 1), ch('h'));
        assert_eq!(buf.get(6, 1), ch('o'));
        assert_eq!(buf.get(7, 1), ch(' '));
    }

    #[test]
    fn test_write_str_truncated() {
        let mut buf = CellBuffer::new(5, 1);
        buf.write_str(3, 0, "hello");
        assert_eq!(buf.get(3, 0), ch('h'));
        assert_eq!(buf.get(4, 0), ch('e'));
    }

    #[test]
    fn test_write_cells_clamped() {
        let mut buf = CellBuffer::new(3, 1);
        let cells: Vec<Cell> = "abcdef".chars().map(ch).collect();
        buf.write_cells(0, &cells);
        assert_eq!(buf.get(2, 0), ch('c'));
    }

    #[test]
    fn test_fill_row_styled() {
        let mut buf = CellBuffer::new(4, 2);
        buf.fill_row(1, CellStyle::Status);
        assert_eq!(buf.get(3, 1), Cell::styled(' ', CellStyle::Status));
        assert_eq!(buf.get(3, 0), ch(' '));
    }

    #[test]
    fn test_diff_no_changes() {
        let a = CellBuffer::new(10, 5);
        let b = CellBuffer::new(10, 5);
        let mut term = MockTerminal::new(10, 5);
        CellBuffer::diff(&a, &b, &mut term);
        assert!(term.ops.is_empty(), "Expected no ops, got: {:?}", term.ops);
    }

    #[test]
    fn test_diff_single_cell_change() {
        let current = CellBuffer::new(10, 5);
        let mut next = CellBuffer::new(10, 5);
        next.set(3, 2, ch('X'));

        let mut term = MockTerminal::new(10, 5);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![MockOp::MoveCursor(3, 2), MockOp::WriteStr("X".to_string())]
        );
    }

    #[test]
    fn test_diff_coalesces_adjacent() {
        let current = CellBuffer::new(10, 1);
        let mut next = CellBuffer::new(10, 1);
        next.write_str(2, 0, "abc");

        let mut term = MockTerminal::new(10, 1);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![MockOp::MoveCursor(2, 0), MockOp::WriteStr("abc".to_string())]
        );
    }

    #[test]
    fn test_diff_coalesces_short_gap() {
        let current = CellBuffer::new(10, 1);
        let mut next = CellBuffer::new(10, 1);
        next.write_str(1, 0, "AB");
        next.set(5, 0, ch('C'));

        let mut term = MockTerminal::new(10, 1);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![MockOp::MoveCursor(1, 0), MockOp::WriteStr("AB  C".to_string())]
        );
    }

    #[test]
    fn test_diff_separate_runs_on_same_row() {
        let current = CellBuffer::new(20, 1);
        let mut next = CellBuffer::new(20, 1);
        next.set(1, 0, ch('A'));
        next.set(10, 0, ch('B'));

        let mut term = MockTerminal::new(20, 1);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![
                MockOp::MoveCursor(1, 0),
                MockOp::WriteStr("A".to_string()),
                MockOp::MoveCursor(10, 0),
                MockOp::WriteStr("B".to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_splits_runs_on_style_and_resets() {
        let current = CellBuffer::new(20, 1);
        let mut next = CellBuffer::new(20, 1);
        next.write_str(0, 0, "the");
        next.write_styled(3, 0, " cat", CellStyle::Ghost);

        let mut term = MockTerminal::new(20, 1);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![
                MockOp::MoveCursor(0, 0),
                MockOp::WriteStr("the".to_string()),
                MockOp::MoveCursor(3, 0),
                MockOp::SetStyle(CellStyle::Ghost),
                MockOp::WriteStr(" cat".to_string()),
                MockOp::SetStyle(CellStyle::Plain),
            ]
        );
    }

    #[test]
    fn test_diff_restyle_only() {
        // Accepting a suggestion changes style but not characters
        let mut current = CellBuffer::new(10, 1);
        current.write_styled(0, 0, "cat", CellStyle::Ghost);
        let mut next = CellBuffer::new(10, 1);
        next.write_str(0, 0, "cat");

        let mut term = MockTerminal::new(10, 1);
        CellBuffer::diff(&current, &next, &mut term);

        assert_eq!(
            term.ops,
            vec![MockOp::MoveCursor(0, 0), MockOp::WriteStr("cat".to_string())]
        );
    }

    #[test]
    fn test_copy_row_from() {
        let mut src = CellBuffer::new(10, 2);
        src.write_styled(0, 0, "hello", CellStyle::Ghost);

        let mut dst = CellBuffer::new(10, 2);
        dst.copy_row_from(1, &src, 0);

        assert_eq!(dst.get(0, 1), Cell::styled('h', CellStyle::Ghost));
        assert_eq!(dst.get(4, 1), Cell::styled('o', CellStyle::Ghost));
        assert_eq!(dst.get(5, 1), ch(' '));
    }

    #[test]
    fn test_shift_rows_up() {
        let mut buf = CellBuffer::new(5, 4);
        for (row, text) in ["aaaa", "bbbb", "cccc", "dddd"].iter().enumerate() {
            buf.write_str(0, row, text);
        }

        buf.shift_rows(0, 4, 1);

        assert_eq!(buf.get(0, 0), ch('b'));
        assert_eq!(buf.get(0, 1), ch('c'));
        assert_eq!(buf.get(0, 2), ch('d'));
        assert_eq!(buf.get(0, 3), ch(' '));
    }

    #[test]
    fn test_shift_rows_down() {
        let mut buf = CellBuffer::new(5, 4);
        for (row, text) in ["aaaa", "bbbb", "cccc", "dddd"].iter().enumerate() {
            buf.write_str(0, row, text);
        }

        buf.shift_rows(0, 4, -1);

        assert_eq!(buf.get(0, 0), ch(' '));
        assert_eq!(buf.get(0, 1), ch('a'));
        assert_eq!(buf.get(0, 2), ch('b'));
        assert_eq!(buf.get(0, 3), ch('c'));
    }

    #[test]
    fn test_shift_rows_partial_range() {
        let mut buf = CellBuffer::new(5, 5);
        for (row, text) in ["aaaa", "bbbb", "cccc", "dddd", "eeee"].iter().enumerate() {
            buf.write_str(0, row, text);
        }

        buf.shift_rows(1, 4, 1);

        assert_eq!(buf.get(0, 0), ch('a'));
        assert_eq!(buf.get(0, 1), ch('c'));
        assert_eq!(buf.get(0, 2), ch('d'));
        assert_eq!(buf.get(0, 3), ch(' '));
        assert_eq!(buf.get(0, 4), ch('e'));
    }

    #[test]
    fn test_shift_rows_exceeds_range() {
        let mut buf = CellBuffer::new(5, 3);
        buf.write_str(0, 0, "aaaa");
        buf.write_str(0, 2, "cccc");

        buf.shift_rows(0, 3, 5);

        for row in 0..3 {
            assert_eq!(buf.get(0, row), ch(' '));
        }
    }
}
