//! Application event loop for interactive mode.
//!
//! The `App` struct ties together the overlay controller, Screen, Terminal,
//! key bindings and the prediction worker into a main event loop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::document::{Document, DocumentIo, SaveChoice};
use crate::keybind::{KeyAction, KeyMap};
use crate::overlay::{Input, OverlayController};
use crate::screen::Screen;
use crate::terminal::Terminal;
use crate::worker::{PredictionResult, PredictionWorker};

/// How long to wait for a key before checking for finished predictions.
const TICK: Duration = Duration::from_millis(25);

const SAVE_PROMPT: &str = "Save changes? (y/n, Esc to cancel) ";

/// The interactive application state.
pub struct App<D: DocumentIo> {
    pub overlay: OverlayController,
    pub screen: Screen,
    keymap: KeyMap,
    io: D,
    worker: PredictionWorker,
    /// Shown once the terminal is up, e.g. a model load failure.
    notice: Option<String>,
    pub running: bool,
}

impl<D: DocumentIo> App<D> {
    pub fn new(
        overlay: OverlayController,
        screen: Screen,
        keymap: KeyMap,
        io: D,
        worker: PredictionWorker,
    ) -> Self {
        Self {
            overlay,
            screen,
            keymap,
            io,
            worker,
            notice: None,
            running: true,
        }
    }

    /// Show `notice` on the message row when the editor starts.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Run the main event loop.
    pub fn run(&mut self, terminal: &mut dyn Terminal) -> Result<()> {
        terminal.init()?;
        let result = self.event_loop(terminal);
        terminal.cleanup()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut dyn Terminal) -> Result<()> {
        self.resize(terminal);

        let keys = self.keymap.keys();
        if !terminal.reports_modifier_keys()
            && [&keys.toggle, &keys.accept, &keys.trigger]
                .iter()
                .any(|key| key.is_modifier())
        {
            self.screen
                .show_message(terminal, "Terminal does not report shift keys; prediction keys unavailable.");
        }
        if let Some(notice) = self.notice.take() {
            self.screen.show_message(terminal, &notice);
        }
        self.refresh(terminal);

        while self.running {
            if self.drain_predictions() {
                self.refresh(terminal);
            }
            if let Some(key) = terminal.poll_key(TICK)? {
                self.handle_key(key, terminal);
                self.refresh(terminal);
            }
        }
        Ok(())
    }

    /// Hand every finished lookup to the overlay. Returns true if any arrived.
    pub fn drain_predictions(&mut self) -> bool {
        let mut any = false;
        while let Some(result) = self.worker.try_recv() {
            self.overlay.complete(result);
            any = true;
        }
        any
    }

    /// Redraw whatever changed.
    fn refresh(&mut self, terminal: &mut dyn Terminal) {
        let indicator = self.overlay.state().indicator();
        self.screen.fixup(self.overlay.document(), indicator, terminal);
    }

    /// Handle one key press.
    pub fn handle_key(&mut self, key: KeyEvent, terminal: &mut dyn Terminal) {
        let action = self.keymap.resolve(key);
        if action != KeyAction::Ignore {
            self.screen.clear_message();
        }

        match action {
            KeyAction::Input(input) => self.handle_input(input, terminal),
            KeyAction::New => self.new_document(terminal),
            KeyAction::Open => self.open_prompt(terminal),
            KeyAction::Save => {
                self.save(terminal);
            }
            KeyAction::SaveAs => {
                self.save_as_prompt(terminal);
            }
            KeyAction::Quit => self.quit(terminal),
            KeyAction::Resize => self.resize(terminal),
            KeyAction::Ignore => {}
        }
    }

    fn handle_input(&mut self, input: Input, terminal: &mut dyn Terminal) {
        let Some(request) = self.overlay.handle(input) else {
            return;
        };
        let id = request.id;
        if !self.worker.submit(request) {
            // No worker to answer; settle as if nothing was found
            tracing::error!(id, "prediction worker unavailable");
            self.overlay.complete(PredictionResult {
                id,
                words: Vec::new(),
            });
            self.screen.show_message(terminal, "Prediction unavailable.");
        }
    }

    fn resize(&mut self, terminal: &mut dyn Terminal) {
        self.screen.resize(terminal.size());
        self.keymap.set_page_lines(self.screen.text_height());
    }
}

// Document commands
impl<D: DocumentIo> App<D> {
    /// Start an empty, untitled document.
    pub fn new_document(&mut self, terminal: &mut dyn Terminal) {
        if self.prompt_save_if_dirty(terminal) == SaveChoice::Cancelled {
            return;
        }
        self.replace_document(Document::new());
        self.screen.show_message(terminal, "New document.");
    }

    fn open_prompt(&mut self, terminal: &mut dyn Terminal) {
        if self.prompt_save_if_dirty(terminal) == SaveChoice::Cancelled {
            return;
        }
        if let Some(path) = self.prompt_line(terminal, "Open: ", "") {
            self.open(PathBuf::from(path), terminal);
        }
    }

    /// Replace the document with the contents of `path`. On failure the
    /// current document is left as it was.
    pub fn open(&mut self, path: PathBuf, terminal: &mut dyn Terminal) -> bool {
        match self.io.open(&path) {
            Ok(text) => {
                let msg = format!("{} opened ({}).", path.display(), line_summary(&text));
                tracing::info!(path = %path.display(), "opened document");
                self.replace_document(Document::with_text(&text, Some(path)));
                self.screen.show_message(terminal, &msg);
                true
            }
            Err(err) => {
                tracing::warn!(%err, "open failed");
                self.report_error(terminal, &err.to_string());
                false
            }
        }
    }

    /// Save to the document's path, asking for one if it has none.
    pub fn save(&mut self, terminal: &mut dyn Terminal) -> bool {
        match self.overlay.document().path().map(Path::to_path_buf) {
            Some(path) => self.save_as(path, terminal),
            None => self.save_as_prompt(terminal),
        }
    }

    fn save_as_prompt(&mut self, terminal: &mut dyn Terminal) -> bool {
        let current = self
            .overlay
            .document()
            .path()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        match self.prompt_line(terminal, "Save as: ", &current) {
            Some(path) => self.save_as(PathBuf::from(path), terminal),
            None => false,
        }
    }

    /// Write the committed text to `path`, which becomes the document's path.
    /// A ghost suggestion is never written.
    pub fn save_as(&mut self, path: PathBuf, terminal: &mut dyn Terminal) -> bool {
        self.overlay.settle();
        let contents = self.overlay.document().contents_for_save();
        match self.io.save(&path, &contents) {
            Ok(()) => {
                let msg = format!("{} saved ({}).", path.display(), line_summary(&contents));
                tracing::info!(path = %path.display(), "saved document");
                let doc = self.overlay.document_mut();
                doc.set_path(path);
                doc.mark_saved();
                self.screen.show_message(terminal, &msg);
                true
            }
            Err(err) => {
                tracing::warn!(%err, "save failed");
                self.report_error(terminal, &err.to_string());
                false
            }
        }
    }

    /// Ask whether to save unsaved changes. Blank documents are never asked about.
    /// A ghost on screen comes back if the prompt is cancelled.
    pub fn prompt_save_if_dirty(&mut self, terminal: &mut dyn Terminal) -> SaveChoice {
        let ghost = self.overlay.withdraw();
        if !self.overlay.document().needs_save_prompt() {
            return SaveChoice::Saved;
        }
        self.refresh(terminal);

        let choice = loop {
            self.screen
                .update_message_row(terminal, SAVE_PROMPT, SAVE_PROMPT.len());
            let Ok(key) = terminal.read_key() else {
                break SaveChoice::Cancelled;
            };
            match key.code {
                KeyCode::Char('y' | 'Y') => {
                    self.screen.clear_message();
                    break if self.save(terminal) {
                        SaveChoice::Saved
                    } else {
                        SaveChoice::Cancelled
                    };
                }
                KeyCode::Char('n' | 'N') => break SaveChoice::Discarded,
                KeyCode::Esc => break SaveChoice::Cancelled,
                KeyCode::Modifier(_) => {}
                _ => terminal.beep(),
            }
        };
        if choice != SaveChoice::Saved {
            self.screen.clear_message();
        }
        if choice == SaveChoice::Cancelled
            && let Some(ghost) = ghost
        {
            self.overlay.reinstate(ghost);
        }
        tracing::debug!(?choice, "save prompt answered");
        choice
    }

    fn quit(&mut self, terminal: &mut dyn Terminal) {
        if self.prompt_save_if_dirty(terminal) != SaveChoice::Cancelled {
            self.running = false;
        }
    }

    fn replace_document(&mut self, document: Document) {
        self.overlay.replace_document(document);
        self.screen.viewport.top_line = 0;
        self.screen.viewport.offset = 0;
    }

    fn report_error(&mut self, terminal: &mut dyn Terminal, msg: &str) {
        self.screen.show_message(terminal, msg);
        terminal.beep();
    }

    /// Read a line of input on the message row. Returns None if cancelled
    /// with Esc or left empty.
    fn prompt_line(&mut self, terminal: &mut dyn Terminal, prompt: &str, initial: &str) -> Option<String> {
        let prompt_len = prompt.chars().count();
        let mut input = initial.to_string();

        loop {
            let line = format!("{prompt}{input}");
            self.screen
                .update_message_row(terminal, &line, prompt_len + input.chars().count());

            let Ok(key) = terminal.read_key() else {
                break None;
            };
            match key.code {
                KeyCode::Enter => {
                    self.screen.clear_message();
                    let input = input.trim();
                    break (!input.is_empty()).then(|| input.to_string());
                }
                KeyCode::Esc => {
                    self.screen.clear_message();
                    break None;
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    input.push(ch);
                }
                _ => {}
            }
        }
    }
}

fn line_summary(text: &str) -> String {
    let lines = text.lines().count();
    format!("{} line{}", lines, if lines == 1 { "" } else { "s" })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crossterm::event::ModifierKeyCode;

    use super::*;
    use crate::config::KeyConfig;
    use crate::error::DocumentError;
    use crate::predictor::scenario_predictor;
    use crate::terminal::{MockOp, MockTerminal, TermSize};

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct MemoryIo {
        files: HashMap<PathBuf, String>,
        fail_saves: bool,
    }

    impl DocumentIo for MemoryIo {
        fn open(&mut self, path: &Path) -> Result<String, DocumentError> {
            self.files.get(path).cloned().ok_or_else(|| DocumentError::Open {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })
        }

        fn save(&mut self, path: &Path, contents: &str) -> Result<(), DocumentError> {
            if self.fail_saves {
                return Err(DocumentError::Save {
                    path: path.to_path_buf(),
                    source: std::io::ErrorKind::PermissionDenied.into(),
                });
            }
            self.files.insert(path.to_path_buf(), contents.to_string());
            Ok(())
        }
    }

    fn app_with(text: &str, path: Option<&str>, io: MemoryIo) -> App<MemoryIo> {
        let mut doc = Document::with_text(text, path.map(PathBuf::from));
        let end = doc.buffer().len_chars();
        doc.buffer_mut().set_cursor(end);
        let worker = PredictionWorker::spawn(Arc::new(scenario_predictor()), 1).unwrap();
        App::new(
            OverlayController::new(doc, true),
            Screen::new(TermSize {
                width: 60,
                height: 10,
            }),
            KeyMap::new(KeyConfig::default()),
            io,
            worker,
        )
    }

    fn app(text: &str, path: Option<&str>) -> App<MemoryIo> {
        app_with(text, path, MemoryIo::default())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    fn type_keys(app: &mut App<MemoryIo>, term: &mut MockTerminal, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)), term);
        }
    }

    fn queue_line(term: &mut MockTerminal, text: &str) {
        for ch in text.chars() {
            term.push_key(key(KeyCode::Char(ch)));
        }
        term.push_key(key(KeyCode::Enter));
    }

    fn wait_for_prediction(app: &mut App<MemoryIo>) {
        let result = app.worker.results().recv_timeout(WAIT).unwrap();
        app.overlay.complete(result);
    }

    fn text(app: &App<MemoryIo>) -> String {
        app.overlay.document().buffer().to_string()
    }

    #[test]
    fn test_trigger_suggest_accept() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);

        type_keys(&mut app, &mut term, "the cat");
        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        assert!(app.overlay.state().is_waiting());
        wait_for_prediction(&mut app);

        assert_eq!(text(&app), "the cat sat");
        assert_eq!(app.overlay.state().pending_word(), Some("sat"));

        app.handle_key(key(KeyCode::Modifier(ModifierKeyCode::LeftShift)), &mut term);
        assert_eq!(text(&app), "the cat sat");
        assert_eq!(app.overlay.state().pending_word(), None);
        assert_eq!(app.overlay.document().buffer().cursor(), 11);
    }

    #[test]
    fn test_letter_after_ghost_reverts_it() {
        let mut app = app("the cat", None);
        let mut term = MockTerminal::new(60, 10);

        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        wait_for_prediction(&mut app);
        app.handle_key(key(KeyCode::Char('x')), &mut term);

        assert_eq!(text(&app), "the catx");
    }

    #[test]
    fn test_drain_predictions_from_worker() {
        let mut app = app("the", None);
        let mut term = MockTerminal::new(60, 10);

        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        let deadline = std::time::Instant::now() + WAIT;
        while !app.drain_predictions() {
            assert!(std::time::Instant::now() < deadline, "no prediction arrived");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(text(&app), "the cat");
    }

    #[test]
    fn test_toggle_disarms_trigger() {
        let mut app = app("the", None);
        let mut term = MockTerminal::new(60, 10);

        app.handle_key(key(KeyCode::Modifier(ModifierKeyCode::RightShift)), &mut term);
        assert!(!app.overlay.state().enabled());
        app.handle_key(key(KeyCode::Char(' ')), &mut term);

        assert_eq!(text(&app), "the ");
        assert!(!app.overlay.state().is_waiting());
    }

    #[test]
    fn test_save_without_path_prompts() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "hello");

        queue_line(&mut term, "out.txt");
        app.handle_key(ctrl('s'), &mut term);

        assert_eq!(app.io.files[Path::new("out.txt")], "hello\n");
        assert!(!app.overlay.document().is_dirty());
        assert_eq!(app.overlay.document().title(), "nextword - out.txt");
        assert!(app.screen.message().contains("saved (1 line)"));
    }

    #[test]
    fn test_save_discards_ghost_first() {
        let mut app = app("the cat", Some("doc.txt"));
        let mut term = MockTerminal::new(60, 10);

        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        wait_for_prediction(&mut app);
        app.handle_key(ctrl('s'), &mut term);

        // The held space was the ghost's separator, so it goes too
        assert_eq!(app.io.files[Path::new("doc.txt")], "the cat\n");
        assert_eq!(text(&app), "the cat");
    }

    #[test]
    fn test_save_failure_reports_and_keeps_dirty() {
        let io = MemoryIo {
            fail_saves: true,
            ..MemoryIo::default()
        };
        let mut app = app_with("text", Some("doc.txt"), io);
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "!");

        app.handle_key(ctrl('s'), &mut term);

        assert!(app.overlay.document().is_dirty());
        assert!(term.ops.contains(&MockOp::Beep));
        assert!(app.screen.message().contains("cannot save"));
    }

    #[test]
    fn test_quit_when_clean() {
        let mut app = app("text", Some("doc.txt"));
        let mut term = MockTerminal::new(60, 10);
        app.handle_key(ctrl('q'), &mut term);
        assert!(!app.running);
    }

    #[test]
    fn test_quit_dirty_cancel_then_discard() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "draft");

        term.push_key(key(KeyCode::Esc));
        app.handle_key(ctrl('q'), &mut term);
        assert!(app.running);
        assert_eq!(text(&app), "draft");

        term.push_key(key(KeyCode::Char('n')));
        app.handle_key(ctrl('q'), &mut term);
        assert!(!app.running);
    }

    #[test]
    fn test_quit_clean_with_ghost_needs_no_prompt() {
        let mut app = app("the cat", Some("doc.txt"));
        let mut term = MockTerminal::new(60, 10);

        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        wait_for_prediction(&mut app);
        app.handle_key(ctrl('q'), &mut term);

        assert!(!app.running);
        assert!(!app.overlay.document().is_dirty());
    }

    #[test]
    fn test_cancelled_prompt_keeps_ghost() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "the cat");
        app.handle_key(key(KeyCode::Char(' ')), &mut term);
        wait_for_prediction(&mut app);

        term.push_key(key(KeyCode::Esc));
        app.handle_key(ctrl('q'), &mut term);

        assert!(app.running);
        assert_eq!(text(&app), "the cat sat");
        assert_eq!(app.overlay.state().pending_word(), Some("sat"));

        term.push_key(key(KeyCode::Char('n')));
        app.handle_key(ctrl('q'), &mut term);
        assert!(!app.running);
        assert_eq!(text(&app), "the cat");
    }

    #[test]
    fn test_quit_dirty_save() {
        let mut app = app("a", Some("doc.txt"));
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "b");

        term.push_key(key(KeyCode::Char('?')));
        term.push_key(key(KeyCode::Char('y')));
        app.handle_key(ctrl('q'), &mut term);

        assert!(!app.running);
        assert_eq!(app.io.files[Path::new("doc.txt")], "ab\n");
        // The unrecognised answer beeped
        assert!(term.ops.contains(&MockOp::Beep));
    }

    #[test]
    fn test_blank_document_quits_without_prompt() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "  ");
        app.handle_key(ctrl('q'), &mut term);
        assert!(!app.running);
    }

    #[test]
    fn test_open_replaces_document() {
        let mut io = MemoryIo::default();
        io.files.insert(PathBuf::from("b.txt"), "one\ntwo\n".to_string());
        let mut app = app_with("old", Some("a.txt"), io);
        let mut term = MockTerminal::new(60, 10);

        queue_line(&mut term, "b.txt");
        app.handle_key(ctrl('o'), &mut term);

        assert_eq!(text(&app), "one\ntwo\n");
        assert_eq!(app.overlay.document().path(), Some(Path::new("b.txt")));
        assert!(!app.overlay.document().is_dirty());
        assert!(app.screen.message().contains("opened (2 lines)"));
    }

    #[test]
    fn test_open_failure_leaves_document() {
        let mut app = app("keep", Some("a.txt"));
        let mut term = MockTerminal::new(60, 10);

        queue_line(&mut term, "missing.txt");
        app.handle_key(ctrl('o'), &mut term);

        assert_eq!(text(&app), "keep");
        assert_eq!(app.overlay.document().path(), Some(Path::new("a.txt")));
        assert!(term.ops.contains(&MockOp::Beep));
    }

    #[test]
    fn test_open_prompt_cancelled() {
        let mut app = app("keep", Some("a.txt"));
        let mut term = MockTerminal::new(60, 10);

        term.push_key(key(KeyCode::Char('x')));
        term.push_key(key(KeyCode::Esc));
        app.handle_key(ctrl('o'), &mut term);

        assert_eq!(text(&app), "keep");
        assert_eq!(app.screen.message(), "");
    }

    #[test]
    fn test_new_document_after_discard() {
        let mut app = app("", Some("a.txt"));
        let mut term = MockTerminal::new(60, 10);
        type_keys(&mut app, &mut term, "words");

        term.push_key(key(KeyCode::Char('n')));
        app.handle_key(ctrl('n'), &mut term);

        assert_eq!(text(&app), "");
        assert_eq!(app.overlay.document().title(), "nextword - New");
        assert!(app.io.files.is_empty());
    }

    #[test]
    fn test_save_as_prompt_edits_current_path() {
        let mut app = app("x", Some("a.txt"));
        let mut term = MockTerminal::new(60, 10);

        // "a.txt" -> "a.md"
        for _ in 0..3 {
            term.push_key(key(KeyCode::Backspace));
        }
        queue_line(&mut term, "md");
        app.handle_key(ctrl('w'), &mut term);

        assert_eq!(app.io.files[Path::new("a.md")], "x\n");
        assert_eq!(app.overlay.document().path(), Some(Path::new("a.md")));
    }

    #[test]
    fn test_run_loop_types_and_quits() {
        let mut app = app("", None);
        app.set_notice("models not loaded");
        let mut term = MockTerminal::new(60, 10);
        term.push_key(key(KeyCode::Char('h')));
        term.push_idle();
        term.push_key(key(KeyCode::Char('i')));
        term.push_key(ctrl('q'));
        term.push_key(key(KeyCode::Char('n')));

        app.run(&mut term).unwrap();

        assert_eq!(term.ops.first(), Some(&MockOp::Init));
        assert_eq!(term.ops.last(), Some(&MockOp::Cleanup));
        assert!(term.written().contains("models not loaded"));
        assert_eq!(text(&app), "hi");
        assert!(!app.running);
    }

    #[test]
    fn test_run_warns_without_modifier_keys() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);
        term.modifier_keys = false;
        term.push_key(ctrl('q'));

        app.run(&mut term).unwrap();

        assert!(term.written().contains("does not report shift keys"));
    }

    #[test]
    fn test_run_propagates_terminal_errors_after_cleanup() {
        let mut app = app("", None);
        let mut term = MockTerminal::new(60, 10);

        assert!(app.run(&mut term).is_err());
        assert_eq!(term.ops.last(), Some(&MockOp::Cleanup));
    }
}
