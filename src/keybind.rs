//! Key bindings for interactive mode.
//!
//! Maps crossterm KeyEvents to editor actions. The three prediction keys
//! come from the configuration and are checked before anything else; the
//! rest of the layout is fixed.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::KeyConfig;
use crate::overlay::{Edit, Input, Motion};

/// Lines moved by PageUp/PageDown until the screen height is known.
pub const DEFAULT_PAGE_LINES: usize = 20;

/// An action resulting from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// A key the prediction overlay handles (typing, motion, prediction keys).
    Input(Input),
    /// Start a new, empty document.
    New,
    /// Open a file.
    Open,
    /// Save to the current path (asks for one if there is none).
    Save,
    /// Save under a new path.
    SaveAs,
    /// Quit the editor.
    Quit,
    /// Terminal was resized.
    Resize,
    /// No action (ignore the key).
    Ignore,
}

/// Resolves keys using the configured prediction keys.
#[derive(Debug, Clone)]
pub struct KeyMap {
    keys: KeyConfig,
    page_lines: isize,
}

impl KeyMap {
    pub fn new(keys: KeyConfig) -> Self {
        Self {
            keys,
            page_lines: DEFAULT_PAGE_LINES as isize,
        }
    }

    /// Set how far PageUp/PageDown move, normally the text height.
    pub fn set_page_lines(&mut self, lines: usize) {
        self.page_lines = lines.max(1) as isize;
    }

    pub fn keys(&self) -> &KeyConfig {
        &self.keys
    }

    /// Resolve a KeyEvent to a KeyAction.
    pub fn resolve(&self, key: KeyEvent) -> KeyAction {
        // Only presses and repeats count; releases arrive with some protocols
        if key.kind == KeyEventKind::Release {
            return KeyAction::Ignore;
        }

        // F63 is our resize sentinel from CrosstermTerminal
        if key.code == KeyCode::F(63) && key.modifiers == KeyModifiers::NONE {
            return KeyAction::Resize;
        }

        if self.keys.toggle.matches(&key) {
            return KeyAction::Input(Input::TogglePrediction);
        }
        if self.keys.accept.matches(&key) {
            return KeyAction::Input(Input::Accept);
        }
        if self.keys.trigger.matches(&key) {
            return KeyAction::Input(Input::Trigger(self.keys.trigger.typed_char()));
        }

        // Ctrl combinations
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('n') => KeyAction::New,
                KeyCode::Char('o') => KeyAction::Open,
                KeyCode::Char('s') => KeyAction::Save,
                KeyCode::Char('w') => KeyAction::SaveAs,
                KeyCode::Char('q') => KeyAction::Quit,
                _ => KeyAction::Ignore,
            };
        }

        let edit = match key.code {
            // Arrow keys -> cursor movement
            KeyCode::Up => Edit::Move(Motion::Up),
            KeyCode::Down => Edit::Move(Motion::Down),
            KeyCode::Left => Edit::Move(Motion::Left),
            KeyCode::Right => Edit::Move(Motion::Right),
            KeyCode::Home => Edit::Move(Motion::LineStart),
            KeyCode::End => Edit::Move(Motion::LineEnd),
            KeyCode::PageUp => Edit::Move(Motion::Lines(-self.page_lines)),
            KeyCode::PageDown => Edit::Move(Motion::Lines(self.page_lines)),

            // Editing keys
            KeyCode::Backspace => Edit::Backspace,
            KeyCode::Delete => Edit::Delete,
            KeyCode::Enter => Edit::Newline,
            KeyCode::Tab => Edit::Insert('\t'),

            // Printable characters
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::ALT) => {
                Edit::Insert(shifted(ch, key.modifiers))
            }

            _ => return KeyAction::Ignore,
        };
        KeyAction::Input(Input::Edit(edit))
    }
}

/// Kitty terminals without alternate-key reporting send the base key plus SHIFT.
fn shifted(ch: char, modifiers: KeyModifiers) -> char {
    if !modifiers.contains(KeyModifiers::SHIFT) || !ch.is_lowercase() {
        return ch;
    }
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => ch,
    }
}
