//! The document being edited and the file I/O behind it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::buffer::Buffer;
use crate::error::DocumentError;

/// Answer to "save changes before continuing?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveChoice {
    /// The document was saved (or had nothing worth saving).
    Saved,
    /// The user chose to throw the changes away.
    Discarded,
    /// The user backed out; the calling action must be abandoned.
    Cancelled,
}

/// Reads and writes document contents.
pub trait DocumentIo {
    fn open(&mut self, path: &Path) -> Result<String, DocumentError>;

    fn save(&mut self, path: &Path, contents: &str) -> Result<(), DocumentError>;
}

/// `DocumentIo` on the local filesystem.
#[derive(Debug, Default)]
pub struct FsDocumentIo;

impl DocumentIo for FsDocumentIo {
    fn open(&mut self, path: &Path) -> Result<String, DocumentError> {
        fs::read_to_string(path).map_err(|source| DocumentError::Open {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save(&mut self, path: &Path, contents: &str) -> Result<(), DocumentError> {
        fs::write(path, contents).map_err(|source| DocumentError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A buffer, the file it came from, and whether it has unsaved changes.
#[derive(Debug, Default)]
pub struct Document {
    buffer: Buffer,
    path: Option<PathBuf>,
    saved_revision: u64,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding `text`, considered unmodified.
    pub fn with_text(text: &str, path: Option<PathBuf>) -> Self {
        let buffer = Buffer::from_str(text);
        let saved_revision = buffer.revision();
        Self {
            buffer,
            path,
            saved_revision,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut Buffer {
        &mut self.buffer
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// True if the text changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.buffer.revision() != self.saved_revision
    }

    /// True if closing the document would lose something worth asking about.
    pub fn needs_save_prompt(&self) -> bool {
        self.is_dirty() && !self.buffer.is_blank()
    }

    pub fn mark_saved(&mut self) {
        self.saved_revision = self.buffer.revision();
    }

    /// Replace the contents with a freshly opened file.
    pub fn load(&mut self, text: &str, path: Option<PathBuf>) {
        self.buffer.replace_all(text);
        self.path = path;
        self.mark_saved();
    }

    /// The text to write to disk, always newline terminated unless empty.
    pub fn contents_for_save(&self) -> String {
        let mut contents = self.buffer.to_string();
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents
    }

    /// Window title, e.g. `nextword - notes.txt`.
    pub fn title(&self) -> String {
        match &self.path {
            Some(path) => format!("nextword - {}", path.display()),
            None => "nextword - New".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document_is_clean() {
        let doc = Document::new();
        assert!(!doc.is_dirty());
        assert!(doc.path().is_none());
        assert_eq!(doc.title(), "nextword - New");
    }

    #[test]
    fn test_edit_marks_dirty_and_save_clears() {
        let mut doc = Document::with_text("hello", Some(PathBuf::from("a.txt")));
        assert!(!doc.is_dirty());
        doc.buffer_mut().insert_at_cursor("x");
        assert!(doc.is_dirty());
        assert!(doc.needs_save_prompt());
        doc.mark_saved();
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_blank_document_needs_no_prompt() {
        let mut doc = Document::new();
        doc.buffer_mut().insert_at_cursor("  \n");
        assert!(doc.is_dirty());
        assert!(!doc.needs_save_prompt());
    }

    #[test]
    fn test_contents_for_save_adds_newline() {
        assert_eq!(Document::with_text("a", None).contents_for_save(), "a\n");
        assert_eq!(Document::with_text("a\n", None).contents_for_save(), "a\n");
        assert_eq!(Document::with_text("", None).contents_for_save(), "");
    }

    #[test]
    fn test_load_replaces_contents() {
        let mut doc = Document::with_text("old", None);
        doc.buffer_mut().insert_at_cursor("x");
        doc.load("new", Some(PathBuf::from("b.txt")));
        assert_eq!(doc.buffer().to_string(), "new");
        assert!(!doc.is_dirty());
        assert_eq!(doc.title(), "nextword - b.txt");
    }

    #[test]
    fn test_fs_io_round_trip_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let mut io = FsDocumentIo;
        io.save(&path, "some text\n").unwrap();
        assert_eq!(io.open(&path).unwrap(), "some text\n");

        let missing = dir.path().join("missing.txt");
        assert!(matches!(io.open(&missing), Err(DocumentError::Open { .. })));
        let bad = dir.path().join("no-such-dir").join("x.txt");
        assert!(matches!(io.save(&bad, "x"), Err(DocumentError::Save { .. })));
    }
}
