//! Editor configuration.
//!
//! Read from a TOML file (by default `nextword.toml` in the working
//! directory, if present). Every field has a default, so an empty file or no
//! file at all is a valid configuration.
//!
//! ```toml
//! [keys]
//! toggle = "right-shift"
//! accept = "left-shift"
//! trigger = "space"
//!
//! [model]
//! dir = "models"
//!
//! [prediction]
//! enabled = true
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, ModifierKeyCode};
use phf::{Map, phf_map};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::predictor::store::ModelPaths;

pub const DEFAULT_CONFIG_FILE: &str = "nextword.toml";

/// Key names understood in the config file, besides single characters,
/// `f1`..`f24` and `ctrl-`/`alt-` prefixes.
const NAMED_KEYS: Map<&'static str, KeyCode> = phf_map! {
    "space" => KeyCode::Char(' '),
    "tab" => KeyCode::Tab,
    "enter" => KeyCode::Enter,
    "insert" => KeyCode::Insert,
    "left-shift" => KeyCode::Modifier(ModifierKeyCode::LeftShift),
    "right-shift" => KeyCode::Modifier(ModifierKeyCode::RightShift),
    "left-ctrl" => KeyCode::Modifier(ModifierKeyCode::LeftControl),
    "right-ctrl" => KeyCode::Modifier(ModifierKeyCode::RightControl),
    "left-alt" => KeyCode::Modifier(ModifierKeyCode::LeftAlt),
    "right-alt" => KeyCode::Modifier(ModifierKeyCode::RightAlt),
};

/// A single configurable key, e.g. `right-shift`, `space`, `ctrl-p`, `f2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// True if `key` is a press of this key.
    ///
    /// Shift is not significant, except that a bare modifier key matches
    /// whatever modifier state the terminal reports alongside it.
    pub fn matches(&self, key: &KeyEvent) -> bool {
        if key.code != self.code {
            return false;
        }
        match self.code {
            KeyCode::Modifier(_) => true,
            _ => key.modifiers.difference(KeyModifiers::SHIFT) == self.modifiers,
        }
    }

    /// The character this key types, if it is a plain character key.
    pub fn typed_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(ch) if self.modifiers.is_empty() => Some(ch),
            KeyCode::Tab if self.modifiers.is_empty() => Some('\t'),
            _ => None,
        }
    }

    /// True if this key needs the terminal to report bare modifier presses.
    pub fn is_modifier(&self) -> bool {
        matches!(self.code, KeyCode::Modifier(_))
    }
}

impl FromStr for KeySpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownKey {
            name: s.to_string(),
        };
        let lower = s.trim().to_lowercase();
        let (modifiers, name) = if let Some(rest) = lower.strip_prefix("ctrl-") {
            (KeyModifiers::CONTROL, rest)
        } else if let Some(rest) = lower.strip_prefix("alt-") {
            (KeyModifiers::ALT, rest)
        } else {
            (KeyModifiers::NONE, lower.as_str())
        };

        let code = if let Some(code) = NAMED_KEYS.get(name) {
            *code
        } else if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
            if !(1..=24).contains(&n) {
                return Err(unknown());
            }
            KeyCode::F(n)
        } else {
            let mut chars = s.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if modifiers.is_empty() => KeyCode::Char(ch),
                _ => {
                    // Only the suffix after ctrl-/alt- is a single char here
                    let mut chars = name.chars();
                    match (chars.next(), chars.next()) {
                        (Some(ch), None) => KeyCode::Char(ch),
                        _ => return Err(unknown()),
                    }
                }
            }
        };

        if matches!(code, KeyCode::Modifier(_)) && !modifiers.is_empty() {
            return Err(unknown());
        }
        Ok(Self::new(code, modifiers))
    }
}

impl TryFrom<String> for KeySpec {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            write!(f, "ctrl-")?;
        } else if self.modifiers.contains(KeyModifiers::ALT) {
            write!(f, "alt-")?;
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "space"),
            KeyCode::Char(ch) => write!(f, "{ch}"),
            KeyCode::F(n) => write!(f, "f{n}"),
            code => match NAMED_KEYS.entries().find(|(_, c)| **c == code) {
                Some((name, _)) => write!(f, "{name}"),
                None => write!(f, "{code:?}"),
            },
        }
    }
}

/// The three prediction keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    /// Arms or disarms prediction.
    pub toggle: KeySpec,
    /// Commits the shown suggestion.
    pub accept: KeySpec,
    /// Asks for a suggestion when armed.
    pub trigger: KeySpec,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            toggle: KeySpec::new(
                KeyCode::Modifier(ModifierKeyCode::RightShift),
                KeyModifiers::NONE,
            ),
            accept: KeySpec::new(
                KeyCode::Modifier(ModifierKeyCode::LeftShift),
                KeyModifiers::NONE,
            ),
            trigger: KeySpec::new(KeyCode::Char(' '), KeyModifiers::NONE),
        }
    }
}

/// Where the frequency tables live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub dir: PathBuf,
    /// Overrides `dir/bigram_model.json`.
    pub bigram: Option<PathBuf>,
    /// Overrides `dir/trigram_model.json`.
    pub trigram: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            bigram: None,
            trigram: None,
        }
    }
}

impl ModelConfig {
    pub fn paths(&self) -> ModelPaths {
        let defaults = ModelPaths::in_dir(&self.dir);
        ModelPaths {
            bigram: self.bigram.clone().unwrap_or(defaults.bigram),
            trigram: self.trigram.clone().unwrap_or(defaults.trigram),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PredictionConfig {
    /// Start with prediction armed.
    pub enabled: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub keys: KeyConfig,
    pub model: ModelConfig,
    pub prediction: PredictionConfig,
}

impl Config {
    /// Load from `path`, or from `nextword.toml` if no path is given and it
    /// exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    /// Parse a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The prediction keys must be distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let keys = [self.keys.toggle, self.keys.accept, self.keys.trigger];
        for (i, key) in keys.iter().enumerate() {
            if keys[i + 1..].contains(key) {
                return Err(ConfigError::DuplicateKey {
                    name: key.to_string(),
                });
            }
        }
        Ok(())
    }
}
