//! Viewport tracking for screen mode.
//!
//! The Viewport decides which buffer lines and display columns are visible
//! and how far to scroll when the cursor leaves the visible area. Columns
//! here are display columns (tabs expanded), not char offsets.

/// Parameters that define the viewport geometry.
#[derive(Debug, Clone, Copy)]
pub struct ViewportParams {
    /// Number of text rows available on screen.
    pub height: usize,
    /// Number of columns available on screen.
    pub width: usize,
    /// Vertical scroll margin: the cursor is kept at least this many rows
    /// from the top and bottom edges when the buffer allows it.
    pub v_margin: usize,
    /// Horizontal scroll margin.
    pub h_margin: usize,
}

impl ViewportParams {
    pub fn new(height: usize, width: usize) -> Self {
        let v_margin = (height / 4).clamp(1, 5);
        let h_margin = 8usize.min(width / 4);
        Self {
            height,
            width,
            v_margin,
            h_margin,
        }
    }
}

/// Which part of the buffer is on screen.
#[derive(Debug)]
pub struct Viewport {
    /// First visible buffer line (0-based).
    pub top_line: usize,
    /// First visible display column.
    pub offset: usize,
    pub params: ViewportParams,
}

/// What must happen to bring the cursor into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scroll {
    /// The cursor is already comfortably visible.
    None,
    /// Scroll vertically by n lines (positive = content moves up).
    Lines(i32),
    /// Move the left edge to a new display column.
    Slide(usize),
    /// Both at once.
    LinesAndSlide { lines: i32, offset: usize },
    /// Too far to scroll; recentre and repaint.
    Recentre,
}

impl Viewport {
    pub fn new(params: ViewportParams) -> Self {
        Self {
            top_line: 0,
            offset: 0,
            params,
        }
    }

    /// Resize the viewport (e.g. on terminal resize).
    pub fn resize(&mut self, height: usize, width: usize) {
        self.params = ViewportParams::new(height, width);
    }

    /// One past the last visible line.
    pub fn bottom_line(&self) -> usize {
        self.top_line + self.params.height
    }

    /// Screen row of a buffer line, if visible.
    pub fn line_to_row(&self, line: usize) -> Option<usize> {
        (self.top_line..self.bottom_line())
            .contains(&line)
            .then(|| line - self.top_line)
    }

    /// Screen column of a display column, if visible.
    pub fn column_to_screen(&self, column: usize) -> Option<usize> {
        (self.offset..self.offset + self.params.width)
            .contains(&column)
            .then(|| column - self.offset)
    }

    /// Work out how to show the cursor at (`line`, display `column`) in a
    /// buffer of `line_count` lines.
    pub fn scroll_for(&self, line: usize, column: usize, line_count: usize) -> Scroll {
        if self.too_far(line) {
            return Scroll::Recentre;
        }
        match (self.vertical(line, line_count), self.horizontal(column)) {
            (None, None) => Scroll::None,
            (Some(lines), None) => Scroll::Lines(lines),
            (None, Some(offset)) => Scroll::Slide(offset),
            (Some(lines), Some(offset)) => Scroll::LinesAndSlide { lines, offset },
        }
    }

    fn too_far(&self, line: usize) -> bool {
        let height = self.params.height;
        line + height < self.top_line || line >= self.bottom_line() + height
    }

    /// Lines to scroll, if any.
    fn vertical(&self, line: usize, line_count: usize) -> Option<i32> {
        let top = self.top_line;
        let height = self.params.height;
        let margin = self.params.v_margin;
        let bottom = top + height;

        // Never scroll so far that the end of the buffer floats above the last row
        let max_up = (line_count + 1).saturating_sub(bottom);

        let lines = if line < top {
            let delta = top - line;
            -((delta + margin.min(top - delta)) as i32)
        } else if line >= bottom {
            let delta = line - (bottom - 1);
            (delta + margin).min(max_up) as i32
        } else {
            let row = line - top;
            if row < margin && top > 0 {
                -(top.min(margin - row) as i32)
            } else if row + margin >= height {
                (row + margin + 1 - height).min(max_up) as i32
            } else {
                0
            }
        };
        (lines != 0).then_some(lines)
    }

    /// New left edge, if it must move.
    fn horizontal(&self, column: usize) -> Option<usize> {
        let offset = self.offset;
        let width = self.params.width;
        let margin = self.params.h_margin;

        let new_offset = if column < offset {
            column.saturating_sub(margin)
        } else if column >= offset + width {
            column.saturating_sub(width.saturating_sub(margin + 1))
        } else {
            let col = column - offset;
            if col < margin && offset > 0 {
                offset.saturating_sub(margin - col)
            } else if col + margin >= width {
                offset + (col + margin + 1 - width)
            } else {
                offset
            }
        };
        (new_offset != offset).then_some(new_offset)
    }

    /// Apply a scroll, updating top_line and offset. `Recentre` is handled
    /// by `centre_on`.
    pub fn apply(&mut self, scroll: Scroll) {
        match scroll {
            Scroll::None | Scroll::Recentre => {}
            Scroll::Lines(n) => self.scroll_lines(n),
            Scroll::Slide(offset) => self.offset = offset,
            Scroll::LinesAndSlide { lines, offset } => {
                self.scroll_lines(lines);
                self.offset = offset;
            }
        }
    }

    fn scroll_lines(&mut self, n: i32) {
        self.top_line = self.top_line.saturating_add_signed(n as isize);
    }

    /// Put the cursor in the middle of the viewport.
    pub fn centre_on(&mut self, line: usize, column: usize) {
        self.top_line = line.saturating_sub(self.params.height / 2);
        self.offset = if column >= self.params.width {
            column.saturating_sub(self.params.width / 2)
        } else {
            0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(ViewportParams::new(24, 80))
    }

    #[test]
    fn test_cursor_visible_no_scroll() {
        assert_eq!(viewport().scroll_for(10, 20, 100), Scroll::None);
    }

    #[test]
    fn test_cursor_below_scrolls_up() {
        // Line 25 is just past the bottom (top=0, bottom=24)
        match viewport().scroll_for(25, 0, 100) {
            Scroll::Lines(n) => assert!(n > 0),
            other => panic!("Expected Lines, got {other:?}"),
        }
    }

    #[test]
    fn test_cursor_above_scrolls_down() {
        let mut vp = viewport();
        vp.top_line = 20;
        match vp.scroll_for(10, 0, 100) {
            Scroll::Lines(n) => assert!(n < 0),
            other => panic!("Expected negative Lines, got {other:?}"),
        }
    }

    #[test]
    fn test_cursor_far_below_recentres() {
        assert_eq!(viewport().scroll_for(100, 0, 200), Scroll::Recentre);
    }

    #[test]
    fn test_cursor_right_of_screen_slides() {
        match viewport().scroll_for(10, 85, 100) {
            Scroll::Slide(offset) => assert!(offset > 0),
            other => panic!("Expected Slide, got {other:?}"),
        }
    }

    #[test]
    fn test_slide_back_to_left_edge() {
        let mut vp = viewport();
        vp.offset = 40;
        assert_eq!(vp.scroll_for(0, 0, 1), Scroll::Slide(0));
    }

    #[test]
    fn test_apply_lines() {
        let mut vp = viewport();
        vp.apply(Scroll::Lines(5));
        assert_eq!(vp.top_line, 5);
        vp.apply(Scroll::Lines(-3));
        assert_eq!(vp.top_line, 2);
        vp.apply(Scroll::Lines(-10));
        assert_eq!(vp.top_line, 0);
    }

    #[test]
    fn test_centre_on() {
        let mut vp = viewport();
        vp.centre_on(50, 10);
        assert_eq!(vp.top_line, 38);
        assert_eq!(vp.offset, 0);
    }

    #[test]
    fn test_line_to_row() {
        let mut vp = viewport();
        vp.top_line = 10;
        assert_eq!(vp.line_to_row(10), Some(0));
        assert_eq!(vp.line_to_row(33), Some(23));
        assert_eq!(vp.line_to_row(34), None);
        assert_eq!(vp.line_to_row(9), None);
    }

    #[test]
    fn test_column_to_screen() {
        let mut vp = viewport();
        vp.offset = 10;
        assert_eq!(vp.column_to_screen(10), Some(0));
        assert_eq!(vp.column_to_screen(89), Some(79));
        assert_eq!(vp.column_to_screen(90), None);
        assert_eq!(vp.column_to_screen(9), None);
    }

    #[test]
    fn test_no_scroll_past_end_of_buffer() {
        // height=24, v_margin=5, 30 lines: with top_line=7 the last line is on the last row
        let mut vp = viewport();
        assert_eq!(vp.params.v_margin, 5);
        vp.top_line = 7;
        assert_eq!(vp.scroll_for(25, 0, 30), Scroll::None);
        // Inside the bottom margin, but there is nothing further to reveal
        assert_eq!(vp.scroll_for(26, 0, 30), Scroll::None);
    }

    #[test]
    fn test_limited_scroll_near_end_of_buffer() {
        let mut vp = viewport();
        vp.top_line = 7;
        assert_eq!(vp.scroll_for(26, 0, 35), Scroll::Lines(1));
    }
}
