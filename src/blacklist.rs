//! Blacklist management module
//!
//! Holds the forbidden words and loads them from a word-list file at start-up.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming the word-list file.
pub const DICT_PATH_ENV: &str = "PWD_CHECK_DICT_PATH";

const DEFAULT_DICT_PATH: &str = "/etc/pwd-check/blacklist.txt";

#[derive(Error, Debug)]
pub enum BlacklistError {
    #[error("Blacklist file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to read blacklist file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Blacklist file is empty")]
    EmptyFile,
}

/// Lower-cased words that may not appear anywhere in a password.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    words: HashSet<String>,
}

impl Blacklist {
    /// Builds a blacklist, trimming and lower-casing every entry and
    /// dropping blanks.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns `true` if any entry occurs in `password`, ignoring case.
    pub fn matches(&self, password: &str) -> bool {
        if self.words.is_empty() {
            return false;
        }
        let folded = password.to_lowercase();
        self.words.iter().any(|w| folded.contains(w.as_str()))
    }
}

/// Returns the word-list path.
///
/// Priority:
/// 1. Environment variable `PWD_CHECK_DICT_PATH`
/// 2. Default path `/etc/pwd-check/blacklist.txt`
pub fn get_blacklist_path() -> PathBuf {
    std::env::var(DICT_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DICT_PATH))
}

/// Loads the blacklist from the path given by [`get_blacklist_path`].
///
/// Meant for the start-up code that assembles a `PolicyConfig`; the
/// evaluator itself never touches the filesystem.
///
/// # Errors
///
/// Returns error if:
/// - File does not exist
/// - File cannot be read
/// - File is empty
pub fn load_blacklist() -> Result<Blacklist, BlacklistError> {
    load_blacklist_from_path(get_blacklist_path())
}

/// Loads the blacklist from a specific file, one word per line.
///
/// # Errors
///
/// Same as [`load_blacklist`].
pub fn load_blacklist_from_path<P: AsRef<Path>>(path: P) -> Result<Blacklist, BlacklistError> {
    let path = path.as_ref();

    if !path.exists() {
        #[cfg(feature = "tracing")]
        tracing::error!("Blacklist loading FAILED: FileNotFound {}", path.display());
        return Err(BlacklistError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;

    if content.trim().is_empty() {
        #[cfg(feature = "tracing")]
        tracing::error!("Blacklist loading FAILED: Empty file {}", path.display());
        return Err(BlacklistError::EmptyFile);
    }

    let blacklist = Blacklist::new(content.lines());

    #[cfg(feature = "tracing")]
    tracing::info!("Blacklist loaded: {} words from {:?}", blacklist.len(), path);

    Ok(blacklist)
}
