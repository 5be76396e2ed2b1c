//! Error types for the editor.
//!
//! None of these are fatal once the editor is running: a bad model store
//! degrades prediction, a bad config falls back to defaults, and file I/O
//! failures are reported on the message row.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load the n-gram frequency tables.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// A model file does not exist.
    #[error("model file not found: {}", path.display())]
    Missing { path: PathBuf },

    /// A model file exists but could not be read.
    #[error("failed to read model file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A model file is not valid JSON of the expected shape.
    #[error("malformed model file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A trigram context key is not exactly two words.
    #[error("bad trigram context {key:?} in {}", path.display())]
    BadContext { path: PathBuf, key: String },
}

/// Failure to read or write the document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to load the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A key binding names a key we do not know.
    #[error("unknown key name {name:?}")]
    UnknownKey { name: String },

    /// Two prediction actions are bound to the same key.
    #[error("key {name:?} is bound to more than one prediction action")]
    DuplicateKey { name: String },
}

/// A pending suggestion no longer matches the buffer.
///
/// Raised by re-validation before the overlay touches the buffer; the
/// overlay recovers by forgetting the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pending suggestion no longer matches the buffer")]
pub struct StaleSuggestion;
