use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use nextword::app::App;
use nextword::keybind::KeyMap;
use nextword::predictor::store;
use nextword::screen::Screen;
use nextword::terminal::{CrosstermTerminal, Terminal};
use nextword::{Config, Document, DocumentIo, FsDocumentIo, OverlayController, PredictionWorker, logging};

/// Suggestions computed per lookup; only the best one is shown.
const SUGGESTIONS: usize = 1;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File to edit (created on first save if it does not exist)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Directory holding bigram_model.json and trigram_model.json
    #[arg(short = 'm', long, value_name = "DIR")]
    model_dir: Option<PathBuf>,

    /// Bigram model file
    #[arg(long, value_name = "FILE")]
    bigram: Option<PathBuf>,

    /// Trigram model file
    #[arg(long, value_name = "FILE")]
    trigram: Option<PathBuf>,

    /// Configuration file (default: nextword.toml, if present)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log file (default: nextword.log in the temp directory)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// More logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Start with prediction armed
    #[arg(short, long)]
    predict: bool,
}

impl Args {
    /// Command-line flags win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.model_dir {
            config.model.dir = dir.clone();
        }
        if let Some(bigram) = &self.bigram {
            config.model.bigram = Some(bigram.clone());
        }
        if let Some(trigram) = &self.trigram {
            config.model.trigram = Some(trigram.clone());
        }
        if self.predict {
            config.prediction.enabled = true;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_file = args.log_file.clone().unwrap_or_else(logging::default_log_file);
    logging::init_logging(args.verbose, &log_file)?;

    let mut notices = Vec::new();
    let mut config = Config::load(args.config.as_deref()).unwrap_or_else(|err| {
        tracing::warn!(%err, "using default configuration");
        notices.push(format!("{err}; using defaults."));
        Config::default()
    });
    args.apply(&mut config);

    let (predictor, load_error) = store::load_or_degraded(&config.model.paths());
    if let Some(err) = load_error {
        notices.push(format!("Prediction unavailable: {err}."));
    } else {
        tracing::info!(
            bigram_contexts = predictor.bigram_contexts(),
            trigram_contexts = predictor.trigram_contexts(),
            "models ready"
        );
    }
    let worker = PredictionWorker::spawn(Arc::new(predictor), SUGGESTIONS)
        .context("failed to start prediction worker")?;

    let document = match args.file {
        Some(path) => open_initial(path)?,
        None => Document::new(),
    };

    let mut terminal = CrosstermTerminal::new();
    let screen = Screen::new(terminal.size());
    let overlay = OverlayController::new(document, config.prediction.enabled);
    let mut app = App::new(overlay, screen, KeyMap::new(config.keys), FsDocumentIo, worker);
    if !notices.is_empty() {
        app.set_notice(notices.join(" "));
    }
    app.run(&mut terminal)
}

/// The document named on the command line. A file that does not exist yet
/// starts empty and is created on save.
fn open_initial(path: PathBuf) -> Result<Document> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "new file");
        return Ok(Document::with_text("", Some(path)));
    }
    let text = FsDocumentIo.open(&path)?;
    Ok(Document::with_text(&text, Some(path)))
}
