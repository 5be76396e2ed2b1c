//! On-disk model store: two JSON frequency tables.
//!
//! `bigram_model.json` maps a word to its successor counts:
//!
//! ```json
//! { "the": { "cat": 5, "dog": 2 } }
//! ```
//!
//! `trigram_model.json` maps a two-word context, joined by a single space, to
//! its successor counts:
//!
//! ```json
//! { "the cat": { "sat": 3 } }
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ModelLoadError;
use crate::predictor::{BigramTable, Predictor, TrigramTable};

pub const BIGRAM_FILE: &str = "bigram_model.json";
pub const TRIGRAM_FILE: &str = "trigram_model.json";

type RawTable = HashMap<String, HashMap<String, u64>>;

/// Locations of the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub bigram: PathBuf,
    pub trigram: PathBuf,
}

impl ModelPaths {
    /// The default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            bigram: dir.join(BIGRAM_FILE),
            trigram: dir.join(TRIGRAM_FILE),
        }
    }
}

/// Load both tables. Either file missing or malformed is an error.
pub fn load_predictor(paths: &ModelPaths) -> Result<Predictor, ModelLoadError> {
    let bigram = load_bigram(&paths.bigram)?;
    let trigram = load_trigram(&paths.trigram)?;
    tracing::info!(
        bigram_contexts = bigram.len(),
        trigram_contexts = trigram.len(),
        "loaded n-gram model"
    );
    Ok(Predictor::from_tables(bigram, trigram))
}

/// Load both tables, falling back to an empty predictor on failure.
///
/// The failure is logged here and handed back so the caller can show it to
/// the user once.
pub fn load_or_degraded(paths: &ModelPaths) -> (Predictor, Option<ModelLoadError>) {
    match load_predictor(paths) {
        Ok(predictor) => (predictor, None),
        Err(err) => {
            tracing::warn!(error = %err, "prediction disabled: no usable n-gram model");
            (Predictor::empty(), Some(err))
        }
    }
}

pub fn load_bigram(path: &Path) -> Result<BigramTable, ModelLoadError> {
    let raw = read_raw(path)?;
    Ok(BigramTable::from_counts(
        raw.into_iter().map(|(word, next)| (word.to_lowercase(), fold_words(next))),
    ))
}

pub fn load_trigram(path: &Path) -> Result<TrigramTable, ModelLoadError> {
    let raw = read_raw(path)?;
    let mut contexts = Vec::with_capacity(raw.len());
    for (key, next) in raw {
        let folded = key.to_lowercase();
        let mut words = folded.split_whitespace();
        let pair = match (words.next(), words.next(), words.next()) {
            (Some(first), Some(second), None) => (first.to_string(), second.to_string()),
            _ => {
                return Err(ModelLoadError::BadContext {
                    path: path.to_path_buf(),
                    key,
                });
            }
        };
        contexts.push((pair, fold_words(next)));
    }
    Ok(TrigramTable::from_counts(contexts))
}

fn read_raw(path: &Path) -> Result<RawTable, ModelLoadError> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ModelLoadError::Missing {
            path: path.to_path_buf(),
        },
        _ => ModelLoadError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    serde_json::from_str(&text).map_err(|source| ModelLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn fold_words(next: HashMap<String, u64>) -> Vec<(String, u64)> {
    next.into_iter()
        .map(|(word, count)| (word.to_lowercase(), count))
        .collect()
}
