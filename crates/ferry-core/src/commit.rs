//! Commit records parsed from git's structured display output.

use chrono::{DateTime, FixedOffset};
use ferry_git::GitOps;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Field separator in [`PRETTY_FORMAT`] output (ASCII unit separator).
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// `--pretty=format:` string producing one [`Commit`] record per line:
/// hash, strict ISO committer date, author name, subject.
pub const PRETTY_FORMAT: &str = "%H%x1f%cI%x1f%an%x1f%s";

/// A commit captured from a repository.
///
/// Immutable once parsed; [`Commit::in_repo`] returns a tagged copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Committer date, comparable across repositories.
    pub date: DateTime<FixedOffset>,

    /// Full 40-character hash.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,

    /// Author name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Subject line.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Logical name of the repository the commit came from.
    #[serde(default, rename = "repo", skip_serializing_if = "String::is_empty")]
    pub repository: String,
}

impl Commit {
    /// Parse one record produced with [`PRETTY_FORMAT`].
    ///
    /// # Errors
    /// Returns `MalformedCommitRecord` if the field count is not exactly four,
    /// the hash is not 40 hex characters, or the date is not RFC 3339.
    pub fn parse(record: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedCommitRecord {
            record: record.to_string(),
            reason,
        };

        let parts: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        let [hash, date, author, message] = parts.as_slice() else {
            return Err(malformed(format!("expected 4 fields, found {}", parts.len())));
        };

        if hash.len() != 40 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed(format!("invalid hash {hash:?}")));
        }

        let date = DateTime::parse_from_rfc3339(date)
            .map_err(|e| malformed(format!("invalid time {date:?}: {e}")))?;

        Ok(Self {
            date,
            hash: hash.to_ascii_lowercase(),
            author: (*author).to_string(),
            message: (*message).to_string(),
            repository: String::new(),
        })
    }

    /// Parse every non-blank line of `output`.
    ///
    /// # Errors
    /// Returns the first `MalformedCommitRecord`.
    pub fn parse_many(output: &str) -> Result<Vec<Self>> {
        output
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Look up a single commit in `repo`.
    ///
    /// # Errors
    /// Returns error if the revision is unknown or the output is malformed.
    pub fn lookup<G: GitOps>(repo: &G, rev: &str) -> Result<Self> {
        let output = repo.show(rev, PRETTY_FORMAT)?;
        Self::parse(output.trim_end())
    }

    /// A copy of this commit tagged with its originating repository.
    #[must_use]
    pub fn in_repo(mut self, repository: impl Into<String>) -> Self {
        self.repository = repository.into();
        self
    }

    /// First seven characters of the hash.
    #[must_use]
    pub fn short_hash(&self) -> &str {
        &self.hash[..7.min(self.hash.len())]
    }
}
