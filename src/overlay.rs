//! The prediction overlay: ghost suggestions on top of the document.
//!
//! The controller owns the document and is the only code that inserts,
//! commits or removes suggestion text, and the only code that touches
//! `SpanStyle::Suggested` spans.
//!
//! ```text
//!            trigger (armed)             completion, non-empty
//!   Idle ─────────────────────▶ Requested ─────────────────────▶ Suggested
//!    ▲                              │  completion empty,             │
//!    │                              │  or any other key:             │ accept: commit
//!    │                              │  held trigger char inserted    │ other key: remove
//!    └──────────────────────────────┴────────────────────────────────┘
//! ```
//!
//! A ghost is the separator (the held trigger character) followed by the
//! predicted word, inserted at the cursor. Removing it deletes exactly those
//! chars; committing it only changes its style.

use crate::document::Document;
use crate::error::StaleSuggestion;
use crate::span::SpanStyle;
use crate::worker::{PredictionRequest, PredictionResult};

/// Separator used when the trigger key has no character of its own.
pub const DEFAULT_SEPARATOR: char = ' ';

/// Cursor movements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    LineStart,
    LineEnd,
    /// Up (negative) or down (positive) by a number of lines.
    Lines(isize),
}

/// An ordinary editing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    Newline,
    Backspace,
    Delete,
    Move(Motion),
}

/// A classified key, as far as prediction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    TogglePrediction,
    Accept,
    /// The trigger key, with the character it types when not predicting.
    Trigger(Option<char>),
    Edit(Edit),
}

/// What the prediction indicator should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Armed,
    Disarmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    /// No suggestion shown or wanted.
    Idle,
    /// A lookup is in flight. The trigger character is held back until the
    /// answer tells us whether it becomes a separator or plain text.
    Requested {
        id: u64,
        at: usize,
        revision: u64,
        held: Option<char>,
    },
    /// `separator + word` is in the buffer at `at`, styled as a suggestion.
    /// `revision` is the buffer revision from before the ghost went in.
    Suggested {
        word: String,
        at: usize,
        separator: char,
        revision: u64,
    },
}

/// A suggestion taken out of the buffer by `withdraw`, ready to be shown
/// again by `reinstate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawn {
    word: String,
    at: usize,
    separator: char,
}

/// Transient prediction state for one editing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionState {
    phase: Phase,
    enabled: bool,
}

impl PredictionState {
    pub fn new(enabled: bool) -> Self {
        Self {
            phase: Phase::Idle,
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// The suggested word currently shown, if any.
    pub fn pending_word(&self) -> Option<&str> {
        match &self.phase {
            Phase::Suggested { word, .. } => Some(word),
            _ => None,
        }
    }

    /// Where the shown suggestion (its separator) starts.
    pub fn pending_position(&self) -> Option<usize> {
        match &self.phase {
            Phase::Suggested { at, .. } => Some(*at),
            _ => None,
        }
    }

    /// True while a lookup is in flight.
    pub fn is_waiting(&self) -> bool {
        matches!(self.phase, Phase::Requested { .. })
    }

    pub fn indicator(&self) -> Indicator {
        if self.enabled {
            Indicator::Armed
        } else {
            Indicator::Disarmed
        }
    }
}

/// Owns the document and runs the suggestion state machine.
pub struct OverlayController {
    document: Document,
    state: PredictionState,
    next_id: u64,
}

impl OverlayController {
    pub fn new(document: Document, enabled: bool) -> Self {
        Self {
            document,
            state: PredictionState::new(enabled),
            next_id: 1,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> &PredictionState {
        &self.state
    }

    /// Handle one key. Returns a lookup to dispatch if the key asked for one.
    pub fn handle(&mut self, input: Input) -> Option<PredictionRequest> {
        if input == Input::TogglePrediction {
            self.state.enabled = !self.state.enabled;
            tracing::debug!(enabled = self.state.enabled, "prediction toggled");
            return None;
        }

        // Any other key settles a lookup still in flight
        self.release_held();

        match input {
            Input::TogglePrediction => None,
            Input::Accept => {
                if matches!(self.state.phase, Phase::Suggested { .. }) {
                    self.accept();
                }
                None
            }
            Input::Trigger(ch) => {
                if matches!(self.state.phase, Phase::Suggested { .. }) {
                    // A second trigger rejects the ghost and types normally
                    self.discard();
                    self.type_char(ch);
                    None
                } else if self.state.enabled {
                    Some(self.request(ch))
                } else {
                    self.type_char(ch);
                    None
                }
            }
            Input::Edit(edit) => {
                self.discard();
                self.apply(edit);
                None
            }
        }
    }

    /// Take in a finished lookup. Results that no longer apply are dropped.
    pub fn complete(&mut self, result: PredictionResult) {
        let Phase::Requested {
            id,
            at,
            revision,
            held,
        } = self.state.phase
        else {
            tracing::debug!(id = result.id, "dropping prediction: nothing waiting");
            return;
        };
        if result.id != id {
            tracing::debug!(id = result.id, waiting = id, "dropping superseded prediction");
            return;
        }

        let buffer = self.document.buffer();
        if buffer.revision() != revision || buffer.cursor() != at {
            tracing::debug!(id, "dropping prediction: buffer changed");
            self.state.phase = Phase::Idle;
            return;
        }

        match result.words.into_iter().next() {
            Some(word) if self.state.enabled => {
                let separator = held.unwrap_or(DEFAULT_SEPARATOR);
                let ghost = format!("{separator}{word}");
                self.document
                    .buffer_mut()
                    .insert(at, &ghost, SpanStyle::Suggested);
                tracing::debug!(%word, at, "showing suggestion");
                self.state.phase = Phase::Suggested {
                    word,
                    at,
                    separator,
                    revision,
                };
            }
            _ => {
                self.state.phase = Phase::Idle;
                self.type_char(held);
            }
        }
    }

    /// Remove any ghost and settle any lookup, leaving only committed text.
    ///
    /// Called before the document is saved, replaced or closed.
    pub fn settle(&mut self) {
        self.release_held();
        self.discard();
    }

    /// `settle`, handing back the ghost if one was showing.
    pub fn withdraw(&mut self) -> Option<Withdrawn> {
        let shown = match &self.state.phase {
            Phase::Suggested {
                word,
                at,
                separator,
                ..
            } if self.validate().is_ok() => Some(Withdrawn {
                word: word.clone(),
                at: *at,
                separator: *separator,
            }),
            _ => None,
        };
        self.settle();
        shown
    }

    /// Show a withdrawn ghost again. Nothing happens if the cursor has moved
    /// off its position or another lookup has started.
    pub fn reinstate(&mut self, ghost: Withdrawn) {
        let buffer = self.document.buffer();
        if self.state.phase != Phase::Idle || buffer.cursor() != ghost.at {
            return;
        }
        let revision = buffer.revision();
        let text = format!("{}{}", ghost.separator, ghost.word);
        self.document
            .buffer_mut()
            .insert(ghost.at, &text, SpanStyle::Suggested);
        self.state.phase = Phase::Suggested {
            word: ghost.word,
            at: ghost.at,
            separator: ghost.separator,
            revision,
        };
    }

    /// Replace the document wholesale. Prediction state is reset, but
    /// whether prediction is armed is kept.
    pub fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.state.phase = Phase::Idle;
    }

    /// Mutable access for load and save bookkeeping. Call `settle` first.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn request(&mut self, held: Option<char>) -> PredictionRequest {
        let buffer = self.document.buffer();
        let id = self.next_id;
        self.next_id += 1;
        self.state.phase = Phase::Requested {
            id,
            at: buffer.cursor(),
            revision: buffer.revision(),
            held,
        };
        let context = trailing_context(&buffer.text_before_cursor());
        tracing::debug!(id, %context, "requesting prediction");
        PredictionRequest { id, context }
    }

    /// Give up on a lookup in flight, typing the held trigger character.
    fn release_held(&mut self) {
        let Phase::Requested {
            id,
            at,
            revision,
            held,
        } = self.state.phase
        else {
            return;
        };
        self.state.phase = Phase::Idle;
        let buffer = self.document.buffer();
        if buffer.revision() == revision && buffer.cursor() == at {
            self.type_char(held);
        } else {
            tracing::debug!(id, "buffer changed under pending request");
        }
    }

    /// Commit the shown suggestion as plain text.
    fn accept(&mut self) {
        match self.validate() {
            Ok(range) => {
                let buffer = self.document.buffer_mut();
                buffer.restyle(range.clone(), SpanStyle::Plain);
                buffer.set_cursor(range.end);
                tracing::debug!(word = ?self.state.pending_word(), "suggestion accepted");
            }
            Err(err) => self.forget_stale(err),
        }
        self.state.phase = Phase::Idle;
    }

    /// Take the shown suggestion back out of the buffer.
    fn discard(&mut self) {
        let Phase::Suggested { revision, .. } = self.state.phase else {
            return;
        };
        match self.validate() {
            Ok(range) => {
                let buffer = self.document.buffer_mut();
                let untouched = buffer.revision() == revision + 1;
                buffer.remove(range);
                // Nothing but the ghost changed, so the text is as it was
                if untouched {
                    buffer.restore_revision(revision);
                }
            }
            Err(err) => self.forget_stale(err),
        }
        self.state.phase = Phase::Idle;
    }

    /// The ghost was edited behind our back. Leave the text alone but stop
    /// drawing any of it as a suggestion.
    fn forget_stale(&mut self, err: StaleSuggestion) {
        tracing::debug!(%err, "forgetting suggestion");
        let buffer = self.document.buffer_mut();
        let len = buffer.len_chars();
        buffer.restyle(0..len, SpanStyle::Plain);
    }

    /// Check the ghost is still where we left it, returning its char range.
    fn validate(&self) -> Result<std::ops::Range<usize>, StaleSuggestion> {
        let Phase::Suggested {
            word,
            at,
            separator,
            ..
        } = &self.state.phase
        else {
            return Err(StaleSuggestion);
        };
        let range = *at..*at + word.chars().count() + 1;
        let buffer = self.document.buffer();
        let text_matches = buffer
            .slice(range.clone())
            .is_some_and(|text| text.strip_prefix(*separator) == Some(word.as_str()));
        if text_matches && buffer.is_styled(range.clone(), SpanStyle::Suggested) {
            Ok(range)
        } else {
            Err(StaleSuggestion)
        }
    }

    fn type_char(&mut self, ch: Option<char>) {
        if let Some(ch) = ch {
            self.document
                .buffer_mut()
                .insert_at_cursor(ch.encode_utf8(&mut [0; 4]));
        }
    }

    fn apply(&mut self, edit: Edit) {
        let buffer = self.document.buffer_mut();
        match edit {
            Edit::Insert(ch) => buffer.insert_at_cursor(ch.encode_utf8(&mut [0; 4])),
            Edit::Newline => buffer.insert_at_cursor("\n"),
            Edit::Backspace => {
                buffer.delete_backward();
            }
            Edit::Delete => {
                buffer.delete_forward();
            }
            Edit::Move(Motion::Left) => buffer.move_left(),
            Edit::Move(Motion::Right) => buffer.move_right(),
            Edit::Move(Motion::Up) => buffer.move_lines(-1),
            Edit::Move(Motion::Down) => buffer.move_lines(1),
            Edit::Move(Motion::LineStart) => buffer.move_line_start(),
            Edit::Move(Motion::LineEnd) => buffer.move_line_end(),
            Edit::Move(Motion::Lines(n)) => buffer.move_lines(n),
        }
    }
}

/// The last two words of `text`; all a lookup ever looks at.
fn trailing_context(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().rev().take(2).collect();
    words.reverse();
    words.join(" ")
}
