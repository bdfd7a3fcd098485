//! Chat templates keyed by name, loaded from `<module-dir>/lang/<locale>.json`.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::host::TeamCounts;

pub const BUILTIN_LOCALE: &str = include_str!("data/lang/en.json");

pub const LANG_SUBDIR: &str = "lang";
pub const START_MESSAGE_KEY: &str = "StartMessage";
pub const RELOAD_DENIED_KEY: &str = "ReloadDenied";

#[derive(Debug, Clone, Default)]
pub struct Localizer {
    entries: HashMap<String, String>,
}

impl Localizer {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_LOCALE).expect("builtin locale should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entries: serde_json::from_str(json)?,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, LocalizationError> {
        let contents = fs::read_to_string(path).map_err(|source| LocalizationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_json_str(&contents)?)
    }

    /// Template for `key`, or the key itself when it has no entry.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fill the round-start template. `{message}` is substituted last so a
    /// configured message is never itself expanded.
    pub fn render_start_message(&self, counts: TeamCounts, message: &str) -> String {
        self.get(START_MESSAGE_KEY)
            .replace("{tPlayers}", &counts.terrorists.to_string())
            .replace("{ctPlayers}", &counts.counter_terrorists.to_string())
            .replace("{message}", message)
    }
}

#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("failed to parse locale file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read locale file from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load `<module_dir>/lang/<locale>.json`, falling back to the builtin table.
pub fn load_localizer(module_dir: &Path, locale: &str) -> Localizer {
    let path = module_dir.join(LANG_SUBDIR).join(format!("{locale}.json"));
    if path.exists() {
        match Localizer::from_file(&path) {
            Ok(localizer) => {
                tracing::info!(
                    target: "map_restrictions::locale",
                    path = %path.display(),
                    "locale.loaded=file"
                );
                return localizer;
            }
            Err(err) => {
                tracing::warn!(
                    target: "map_restrictions::locale",
                    path = %path.display(),
                    error = %err,
                    "locale.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "map_restrictions::locale", locale, "locale.loaded=builtin");
    Localizer::builtin()
}
