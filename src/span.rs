//! Styled text ranges.
//!
//! A `SpanSet` records which char ranges of the buffer carry a non-plain
//! style. Ranges follow the text as it is edited, the same way marks do: an
//! insertion before a span pushes it right, a deletion pulls it left, and a
//! deletion overlapping a span trims it.

use std::ops::Range;

/// How a run of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SpanStyle {
    /// Committed text.
    #[default]
    Plain,
    /// A ghost suggestion that has not been accepted.
    Suggested,
}

/// A styled char range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub range: Range<usize>,
    pub style: SpanStyle,
}

/// Non-overlapping styled ranges, kept sorted by start.
///
/// Text not covered by any span is `Plain`.
#[derive(Debug, Default)]
pub struct SpanSet {
    spans: Vec<StyledSpan>,
}

impl SpanSet {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    /// Style `range`, replacing whatever styles it had.
    pub fn set(&mut self, range: Range<usize>, style: SpanStyle) {
        if range.is_empty() {
            return;
        }
        self.clear_range(range.clone());
        if style != SpanStyle::Plain {
            let at = self
                .spans
                .partition_point(|span| span.range.start < range.start);
            self.spans.insert(at, StyledSpan { range, style });
        }
    }

    /// The style of the char at `idx`.
    pub fn style_at(&self, idx: usize) -> SpanStyle {
        self.spans
            .iter()
            .find(|span| span.range.contains(&idx))
            .map_or(SpanStyle::Plain, |span| span.style)
    }

    /// True if every char in `range` has `style`.
    pub fn covers(&self, range: Range<usize>, style: SpanStyle) -> bool {
        range.clone().all(|idx| self.style_at(idx) == style)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StyledSpan> {
        self.spans.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn clear(&mut self) {
        self.spans.clear();
    }

    /// Update all spans after `len` chars were inserted at `at`.
    ///
    /// Text inserted at a span's start or end is not absorbed into it.
    pub fn update_after_insert(&mut self, at: usize, len: usize) {
        for span in &mut self.spans {
            if span.range.start >= at {
                span.range.start += len;
                span.range.end += len;
            } else if span.range.end > at {
                span.range.end += len;
            }
        }
    }

    /// Update all spans after `removed` was deleted.
    pub fn update_after_delete(&mut self, removed: Range<usize>) {
        let shift = |idx: usize| {
            if idx <= removed.start {
                idx
            } else if idx < removed.end {
                removed.start
            } else {
                idx - removed.len()
            }
        };
        for span in &mut self.spans {
            span.range = shift(span.range.start)..shift(span.range.end);
        }
        self.spans.retain(|span| !span.range.is_empty());
    }

    /// Drop styling from `range`, splitting spans that straddle it.
    fn clear_range(&mut self, range: Range<usize>) {
        let mut kept = Vec::with_capacity(self.spans.len() + 1);
        for span in self.spans.drain(..) {
            if span.range.end <= range.start || span.range.start >= range.end {
                kept.push(span);
                continue;
            }
            if span.range.start < range.start {
                kept.push(StyledSpan {
                    range: span.range.start..range.start,
                    style: span.style,
                });
            }
            if span.range.end > range.end {
                kept.push(StyledSpan {
                    range: range.end..span.range.end,
                    style: span.style,
                });
            }
        }
        self.spans = kept;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_at() {
        let mut spans = SpanSet::new();
        spans.set(3..6, SpanStyle::Suggested);
        assert_eq!(spans.style_at(2), SpanStyle::Plain);
        assert_eq!(spans.style_at(3), SpanStyle::Suggested);
        assert_eq!(spans.style_at(5), SpanStyle::Suggested);
        assert_eq!(spans.style_at(6), SpanStyle::Plain);
        assert!(spans.covers(3..6, SpanStyle::Suggested));
        assert!(!spans.covers(2..6, SpanStyle::Suggested));
    }

    #[test]
    fn test_restyle_plain_removes_span() {
        let mut spans = SpanSet::new();
        spans.set(3..6, SpanStyle::Suggested);
        spans.set(3..6, SpanStyle::Plain);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_restyle_middle_splits_span() {
        let mut spans = SpanSet::new();
        spans.set(0..10, SpanStyle::Suggested);
        spans.set(4..6, SpanStyle::Plain);
        let ranges: Vec<_> = spans.iter().map(|s| s.range.clone()).collect();
        assert_eq!(ranges, vec![0..4, 6..10]);
    }

    #[test]
    fn test_insert_before_shifts() {
        let mut spans = SpanSet::new();
        spans.set(5..8, SpanStyle::Suggested);
        spans.update_after_insert(2, 3);
        assert_eq!(spans.iter().next().unwrap().range, 8..11);
    }

    #[test]
    fn test_insert_at_edges_not_absorbed() {
        let mut spans = SpanSet::new();
        spans.set(5..8, SpanStyle::Suggested);
        spans.update_after_insert(8, 2);
        assert_eq!(spans.iter().next().unwrap().range, 5..8);
        spans.update_after_insert(5, 1);
        assert_eq!(spans.iter().next().unwrap().range, 6..9);
    }

    #[test]
    fn test_insert_inside_extends() {
        let mut spans = SpanSet::new();
        spans.set(5..8, SpanStyle::Suggested);
        spans.update_after_insert(6, 4);
        assert_eq!(spans.iter().next().unwrap().range, 5..12);
    }

    #[test]
    fn test_delete_updates_spans() {
        let mut spans = SpanSet::new();
        spans.set(5..10, SpanStyle::Suggested);

        // Overlapping the start trims it
        spans.update_after_delete(3..7);
        assert_eq!(spans.iter().next().unwrap().range, 3..6);

        // Entirely after: shifts left
        spans.update_after_delete(0..1);
        assert_eq!(spans.iter().next().unwrap().range, 2..5);

        // Covering it entirely: gone
        spans.update_after_delete(1..9);
        assert!(spans.is_empty());
    }
}
