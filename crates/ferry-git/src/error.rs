//! Error types for ferry-git.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during git operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not inside a git repository.
    #[error("not a git repository")]
    NotARepository,

    /// HEAD is detached (not on a branch).
    #[error("HEAD is detached - checkout a branch first")]
    DetachedHead,

    /// A revision could not be resolved to a commit.
    #[error("cannot resolve revision '{0}'")]
    UnknownRevision(String),

    /// A `git` subprocess exited unsuccessfully.
    #[error("`{command}` failed: {output}")]
    CommandFailed {
        /// The command line, with secrets redacted.
        command: String,
        /// Combined stdout and stderr, with secrets redacted.
        output: String,
    },

    /// The `git` binary could not be spawned.
    #[error("failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    /// The run was cancelled before the next command started.
    #[error("cancelled")]
    Cancelled,

    /// Underlying git2 error.
    #[error("git error: {0}")]
    Git2(#[from] git2::Error),
}
