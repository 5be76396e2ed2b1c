//! A plain-text terminal editor with inline next-word prediction.
//!
//! Pressing the trigger key looks up the last one or two words in bigram and
//! trigram frequency tables and shows the best continuation as a ghost
//! suggestion, which the accept key commits and any other key removes.
//!
//! # Example
//!
//! ```rust
//! use nextword::{
//!     BigramTable, Document, Input, OverlayController, PredictionResult, Predictor,
//!     TrigramTable,
//! };
//!
//! let bigram = BigramTable::from_counts([("the".to_string(), [("cat".to_string(), 5)])]);
//! let predictor = Predictor::from_tables(bigram, TrigramTable::default());
//!
//! let mut doc = Document::with_text("the", None);
//! doc.buffer_mut().set_cursor(3);
//! let mut overlay = OverlayController::new(doc, true);
//!
//! // The trigger key asks for a lookup; the answer arrives later
//! let request = overlay.handle(Input::Trigger(Some(' '))).unwrap();
//! let words = predictor.suggest(&request.context, 1);
//! overlay.complete(PredictionResult { id: request.id, words });
//! assert_eq!(overlay.document().buffer().to_string(), "the cat");
//!
//! // Accepting commits the ghost as ordinary text
//! overlay.handle(Input::Accept);
//! assert_eq!(overlay.state().pending_word(), None);
//! assert_eq!(overlay.document().buffer().cursor(), 7);
//! ```

pub mod app;
pub mod buffer;
pub mod cell_buffer;
pub mod config;
pub mod document;
pub mod error;
pub mod keybind;
pub mod logging;
pub mod overlay;
mod position;
pub mod predictor;
pub mod screen;
mod span;
pub mod terminal;
pub mod viewport;
pub mod worker;

pub use buffer::Buffer;
pub use config::Config;
pub use document::{Document, DocumentIo, FsDocumentIo, SaveChoice};
pub use error::{ConfigError, DocumentError, ModelLoadError, StaleSuggestion};
pub use overlay::{Edit, Indicator, Input, Motion, OverlayController, PredictionState};
pub use position::{Position, line_length_excluding_newline};
pub use predictor::{BigramTable, Candidate, FrequencyTable, Predictor, TrigramTable};
pub use span::{SpanSet, SpanStyle, StyledSpan};
pub use worker::{PredictionRequest, PredictionResult, PredictionWorker};
