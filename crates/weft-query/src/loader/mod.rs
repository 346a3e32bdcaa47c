//! Rule files on disk and built into the crate.
//!
//! Rule files live at `<dir>/<language>/<feature>.scm`. A [`QueryLoader`]
//! searches its directories in order and falls back to the built-in files.
//! A rule file whose first line reads `; inherits: a,b` gets the text of the
//! named languages' files for the same feature prepended, so inherited rules
//! take the lower ranks.

mod builtin;
mod registry;

use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use registry::{LanguageRegistry, RuleSetStatus};

use crate::error::LoadError;

/// The concern a rule file serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// `highlights.scm`: one tag per node.
    Highlights,
    /// `indents.scm`: indent open/close markers.
    Indents,
    /// `injections.scm`: regions in other languages.
    Injections,
    /// `brackets.scm`: delimiter pairs.
    Brackets,
    /// `textobjects.scm`: selectable constructs.
    TextObjects,
}

impl Feature {
    /// Returns the rule file name.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Highlights => "highlights.scm",
            Self::Indents => "indents.scm",
            Self::Injections => "injections.scm",
            Self::Brackets => "brackets.scm",
            Self::TextObjects => "textobjects.scm",
        }
    }

    /// Returns the feature label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Highlights => "highlights",
            Self::Indents => "indents",
            Self::Injections => "injections",
            Self::Brackets => "brackets",
            Self::TextObjects => "textobjects",
        }
    }

    /// Returns every feature.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Highlights,
            Self::Indents,
            Self::Injections,
            Self::Brackets,
            Self::TextObjects,
        ]
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised when parsing a feature label fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown feature: '{0}'")]
pub struct FeatureParseError(String);

impl FromStr for Feature {
    type Err = FeatureParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase();
        let label = normalised.strip_suffix(".scm").unwrap_or(&normalised);
        Self::all()
            .iter()
            .copied()
            .find(|feature| feature.as_str() == label)
            .ok_or_else(|| FeatureParseError(input.trim().to_owned()))
    }
}

/// Rule text ready to compile, with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySource {
    /// Full text, inherited rules first.
    pub text: String,
    /// The file read from disk; `None` for built-in rules.
    pub path: Option<Utf8PathBuf>,
}

/// Finds rule files for a language and feature.
#[derive(Debug, Clone)]
pub struct QueryLoader {
    search_dirs: Vec<Utf8PathBuf>,
    builtin: bool,
}

impl Default for QueryLoader {
    fn default() -> Self {
        Self {
            search_dirs: Vec::new(),
            builtin: true,
        }
    }
}

impl QueryLoader {
    /// Creates a loader that only knows the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory searched before every directory added so far.
    #[must_use]
    pub fn with_search_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.search_dirs.insert(0, dir.into());
        self
    }

    /// Disables the built-in fallback.
    #[must_use]
    pub const fn without_builtin(mut self) -> Self {
        self.builtin = false;
        self
    }

    /// Returns the search directories, highest priority first.
    #[must_use]
    pub fn search_dirs(&self) -> &[Utf8PathBuf] {
        &self.search_dirs
    }

    /// Returns the languages with rule files in any search directory or
    /// among the built-in rules, sorted and without duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when a search directory exists but cannot
    /// be listed.
    pub fn languages(&self) -> Result<Vec<String>, LoadError> {
        let mut languages: BTreeSet<String> = BTreeSet::new();
        if self.builtin {
            languages.extend(builtin::languages().iter().map(|language| (*language).to_owned()));
        }
        for dir in &self.search_dirs {
            let entries = match dir.read_dir_utf8() {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(LoadError::Io {
                        path: dir.clone(),
                        source,
                    });
                }
            };
            for entry in entries.flatten() {
                if entry.file_type().is_ok_and(|kind| kind.is_dir()) {
                    languages.insert(entry.file_name().to_owned());
                }
            }
        }
        Ok(languages.into_iter().collect())
    }

    /// Reads the rule text for `language` and `feature`.
    ///
    /// Returns `Ok(None)` when no search directory and no built-in rule file
    /// provides it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when a rule file exists but cannot be read.
    pub fn read(&self, language: &str, feature: Feature) -> Result<Option<QuerySource>, LoadError> {
        let mut visited = BTreeSet::new();
        self.read_inherited(language, feature, &mut visited)
    }

    fn read_inherited(
        &self,
        language: &str,
        feature: Feature,
        visited: &mut BTreeSet<String>,
    ) -> Result<Option<QuerySource>, LoadError> {
        if !visited.insert(language.to_owned()) {
            tracing::debug!(language, %feature, "skipping inheritance cycle");
            return Ok(None);
        }
        let Some(own) = self.read_one(language, feature)? else {
            return Ok(None);
        };
        let mut text = String::new();
        for parent in inherited_languages(&own.text) {
            match self.read_inherited(&parent, feature, visited)? {
                Some(inherited) => {
                    text.push_str(&inherited.text);
                    text.push('\n');
                }
                None => tracing::debug!(language, parent = %parent, %feature, "inherited rules not found"),
            }
        }
        text.push_str(&own.text);
        Ok(Some(QuerySource {
            text,
            path: own.path,
        }))
    }

    fn read_one(&self, language: &str, feature: Feature) -> Result<Option<QuerySource>, LoadError> {
        for dir in &self.search_dirs {
            let path = dir.join(language).join(feature.file_name());
            if let Some(text) = read_if_present(&path)? {
                tracing::debug!(%path, "loaded rule file");
                return Ok(Some(QuerySource {
                    text,
                    path: Some(path),
                }));
            }
        }
        if !self.builtin {
            return Ok(None);
        }
        Ok(builtin::rules(language, feature).map(|text| QuerySource {
            text: text.to_owned(),
            path: None,
        }))
    }
}

fn read_if_present(path: &Utf8Path) -> Result<Option<String>, LoadError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parses a leading `; inherits: a,b` line.
fn inherited_languages(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.trim_start_matches(';').trim().strip_prefix("inherits:"))
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|language| !language.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests;
