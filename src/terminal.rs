//! Terminal abstraction layer.
//!
//! Provides a `Terminal` trait for screen-mode I/O and two implementations:
//! - `CrosstermTerminal` for real terminal interaction
//! - `MockTerminal` for testing

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor};

use crate::cell_buffer::CellStyle;

/// Terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub width: u16,
    pub height: u16,
}

/// The key reported in place of a terminal resize.
pub fn resize_key() -> KeyEvent {
    KeyEvent::new(KeyCode::F(63), KeyModifiers::NONE)
}

/// Abstraction over terminal operations.
pub trait Terminal {
    /// Enter raw mode and prepare the terminal.
    fn init(&mut self) -> Result<()>;

    /// Restore the terminal to its original state.
    fn cleanup(&mut self) -> Result<()>;

    /// Get the current terminal dimensions.
    fn size(&self) -> TermSize;

    /// True if presses of bare modifier keys (e.g. left shift) are reported.
    fn reports_modifier_keys(&self) -> bool;

    /// Move the cursor to (col, row), both 0-based.
    fn move_cursor(&mut self, col: u16, row: u16);

    /// Write a string at the current cursor position.
    fn write_str(&mut self, s: &str);

    /// Use `style` for subsequent writes.
    fn set_style(&mut self, style: CellStyle);

    /// Set the window title.
    fn set_title(&mut self, title: &str);

    /// Clear the entire screen.
    fn clear_screen(&mut self);

    /// Scroll the screen up by n lines (content moves up, new blank lines at bottom).
    fn scroll_up(&mut self, n: u16);

    /// Scroll the screen down by n lines (content moves down, new blank lines at top).
    fn scroll_down(&mut self, n: u16);

    /// Sound the terminal bell.
    fn beep(&mut self);

    /// Flush output to the terminal.
    fn flush(&mut self);

    /// Block until a key event is received.
    fn read_key(&mut self) -> Result<KeyEvent>;

    /// Wait up to `timeout` for a key event.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>>;

    /// Set the scroll region (top_row..=bottom_row inclusive, 0-based).
    fn set_scroll_region(&mut self, top: u16, bottom: u16);

    /// Reset the scroll region to the full terminal height.
    fn reset_scroll_region(&mut self);
}

/// Real terminal using crossterm.
pub struct CrosstermTerminal {
    size: TermSize,
    cursor_visible: bool,
    enhanced_keys: bool,
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermTerminal {
    pub fn new() -> Self {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        Self {
            size: TermSize {
                width: w,
                height: h,
            },
            cursor_visible: true,
            enhanced_keys: false,
        }
    }

    fn cursor(&mut self, show: bool) {
        if show && !self.cursor_visible {
            crossterm::execute!(std::io::stdout(), crossterm::cursor::Show).ok();
            self.cursor_visible = true;
        } else if !show && self.cursor_visible {
            crossterm::execute!(std::io::stdout(), crossterm::cursor::Hide).ok();
            self.cursor_visible = false;
        }
    }

    /// Turn a crossterm event into a key, if it is one we care about.
    fn translate(&mut self, event: Event) -> Option<KeyEvent> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Some(key),
            Event::Resize(w, h) => {
                self.size = TermSize {
                    width: w,
                    height: h,
                };
                Some(resize_key())
            }
            _ => None, // Ignore mouse events, focus changes, key releases etc.
        }
    }
}

impl Terminal for CrosstermTerminal {
    fn init(&mut self) -> Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        // Bare modifier presses are only reported with the kitty keyboard protocol
        self.enhanced_keys = crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.enhanced_keys {
            crossterm::execute!(
                std::io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                )
            )?;
        } else {
            tracing::warn!("terminal does not report modifier keys; shift bindings will not work");
        }

        self.cursor(false);
        let (w, h) = crossterm::terminal::size()?;
        self.size = TermSize {
            width: w,
            height: h,
        };
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.enhanced_keys {
            crossterm::execute!(std::io::stdout(), PopKeyboardEnhancementFlags)?;
        }
        crossterm::execute!(
            std::io::stdout(),
            ResetColor,
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;
        crossterm::terminal::disable_raw_mode()?;
        Ok(())
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn reports_modifier_keys(&self) -> bool {
        self.enhanced_keys
    }

    fn move_cursor(&mut self, col: u16, row: u16) {
        crossterm::execute!(std::io::stdout(), crossterm::cursor::MoveTo(col, row)).ok();
    }

    fn write_str(&mut self, s: &str) {
        // Hide the cursor while text goes out so it doesn't flicker across the screen
        self.cursor(false);
        crossterm::execute!(std::io::stdout(), crossterm::style::Print(s)).ok();
    }

    fn set_style(&mut self, style: CellStyle) {
        let mut out = std::io::stdout();
        crossterm::queue!(out, SetAttribute(Attribute::Reset), ResetColor).ok();
        let result = match style {
            CellStyle::Plain => Ok(()),
            CellStyle::Ghost => crossterm::queue!(
                out,
                SetForegroundColor(Color::DarkGrey),
                SetAttribute(Attribute::Italic)
            ),
            CellStyle::Status => crossterm::queue!(out, SetAttribute(Attribute::Reverse)),
            CellStyle::Armed => crossterm::queue!(
                out,
                SetBackgroundColor(Color::DarkRed),
                SetForegroundColor(Color::White)
            ),
            CellStyle::Disarmed => crossterm::queue!(
                out,
                SetBackgroundColor(Color::DarkGreen),
                SetForegroundColor(Color::White)
            ),
        };
        result.ok();
    }

    fn set_title(&mut self, title: &str) {
        crossterm::execute!(std::io::stdout(), crossterm::terminal::SetTitle(title)).ok();
    }

    fn clear_screen(&mut self) {
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::Clear(crossterm::terminal::ClearType::All)
        )
        .ok();
    }

    fn scroll_up(&mut self, n: u16) {
        crossterm::execute!(std::io::stdout(), crossterm::terminal::ScrollUp(n)).ok();
    }

    fn scroll_down(&mut self, n: u16) {
        crossterm::execute!(std::io::stdout(), crossterm::terminal::ScrollDown(n)).ok();
    }

    fn beep(&mut self) {
        crossterm::execute!(std::io::stdout(), crossterm::style::Print('\x07')).ok();
    }

    fn flush(&mut self) {
        std::io::stdout().flush().ok();
    }

    fn read_key(&mut self) -> Result<KeyEvent> {
        self.cursor(true);
        loop {
            let event = crossterm::event::read()?;
            if let Some(key) = self.translate(event) {
                return Ok(key);
            }
        }
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>> {
        self.cursor(true);
        if !crossterm::event::poll(timeout)? {
            return Ok(None);
        }
        let event = crossterm::event::read()?;
        Ok(self.translate(event))
    }

    fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        // Use CSI directly: ESC[top;bottomr (1-based)
        crossterm::execute!(
            std::io::stdout(),
            crossterm::style::Print(format!("\x1b[{};{}r", top + 1, bottom + 1))
        )
        .ok();
    }

    fn reset_scroll_region(&mut self) {
        crossterm::execute!(
            std::io::stdout(),
            crossterm::style::Print(format!("\x1b[1;{}r", self.size.height))
        )
        .ok();
    }
}

/// Mock terminal for testing. Records all operations.
#[cfg(test)]
pub struct MockTerminal {
    pub size: TermSize,
    pub cursor_col: u16,
    pub cursor_row: u16,
    pub ops: Vec<MockOp>,
    pub key_queue: std::collections::VecDeque<Option<KeyEvent>>,
    pub modifier_keys: bool,
    pub title: Option<String>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum MockOp {
    Init,
    Cleanup,
    MoveCursor(u16, u16),
    WriteStr(String),
    SetStyle(CellStyle),
    ClearScreen,
    ScrollUp(u16),
    ScrollDown(u16),
    Beep,
    Flush,
    SetScrollRegion(u16, u16),
    ResetScrollRegion,
}

#[cfg(test)]
impl MockTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            size: TermSize { width, height },
            cursor_col: 0,
            cursor_row: 0,
            ops: Vec::new(),
            key_queue: std::collections::VecDeque::new(),
            modifier_keys: true,
            title: None,
        }
    }

    pub fn push_key(&mut self, key: KeyEvent) {
        self.key_queue.push_back(Some(key));
    }

    /// Queue a poll that times out without a key.
    pub fn push_idle(&mut self) {
        self.key_queue.push_back(None);
    }

    /// All text written so far, concatenated.
    pub fn written(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                MockOp::WriteStr(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
impl Terminal for MockTerminal {
    fn init(&mut self) -> Result<()> {
        self.ops.push(MockOp::Init);
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        self.ops.push(MockOp::Cleanup);
        Ok(())
    }

    fn size(&self) -> TermSize {
        self.size
    }

    fn reports_modifier_keys(&self) -> bool {
        self.modifier_keys
    }

    fn move_cursor(&mut self, col: u16, row: u16) {
        self.cursor_col = col;
        self.cursor_row = row;
        self.ops.push(MockOp::MoveCursor(col, row));
    }

    fn write_str(&mut self, s: &str) {
        self.ops.push(MockOp::WriteStr(s.to_string()));
    }

    fn set_style(&mut self, style: CellStyle) {
        self.ops.push(MockOp::SetStyle(style));
    }

    fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    fn clear_screen(&mut self) {
        self.ops.push(MockOp::ClearScreen);
    }

    fn scroll_up(&mut self, n: u16) {
        self.ops.push(MockOp::ScrollUp(n));
    }

    fn scroll_down(&mut self, n: u16) {
        self.ops.push(MockOp::ScrollDown(n));
    }

    fn beep(&mut self) {
        self.ops.push(MockOp::Beep);
    }

    fn flush(&mut self) {
        self.ops.push(MockOp::Flush);
    }

    fn read_key(&mut self) -> Result<KeyEvent> {
        // Idle polls mean nothing to a blocking read
        while let Some(next) = self.key_queue.pop_front() {
            if let Some(key) = next {
                return Ok(key);
            }
        }
        anyhow::bail!("No more keys in mock queue")
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<KeyEvent>> {
        match self.key_queue.pop_front() {
            Some(next) => Ok(next),
            None => anyhow::bail!("No more keys in mock queue"),
        }
    }

    fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        self.ops.push(MockOp::SetScrollRegion(top, bottom));
    }

    fn reset_scroll_region(&mut self) {
        self.ops.push(MockOp::ResetScrollRegion);
    }
}
