//! Error types for ferry-core.

use std::path::PathBuf;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while detecting, classifying or replaying commits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A commit display record did not have the expected shape.
    #[error("malformed commit record {record:?}: {reason}")]
    MalformedCommitRecord { record: String, reason: String },

    /// A module version could not be mapped to a commit.
    #[error("cannot determine commit for {module} from version {version}: {reason}")]
    UnresolvableVersion {
        module: String,
        version: String,
        reason: String,
    },

    /// No `Upstream-repository`/`Upstream-commit` marker exists for a component.
    #[error("no synchronization marker found for {repo} in {reference}")]
    MissingSyncBoundary { repo: String, reference: String },

    /// A carried commit does not declare its intent with `UPSTREAM: ...`.
    #[error("unexpected commit message for {hash}: {message}")]
    UnexpectedCommitDirective { hash: String, message: String },

    /// A cherry-pick stopped in a way that is not safe to resolve automatically.
    #[error("cannot replay {commit} in {repo}: {detail}")]
    UnrecoverableReplayConflict {
        repo: String,
        commit: String,
        detail: String,
    },

    /// A dependency-manager or manifest-generation command failed.
    #[error("`{command}` failed in {}: {output}", dir.display())]
    DependencyRegenerationFailure {
        command: String,
        dir: PathBuf,
        output: String,
    },

    /// Pushing or opening the pull request failed.
    #[error("failed to publish {repo}: {reason}")]
    PublishFailure { repo: String, reason: String },

    /// A repository name is not in the registry.
    #[error("repository {0} is not registered")]
    UnknownRepository(String),

    /// The run was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// State file parsing error.
    #[error("failed to parse {file}: {message}")]
    ParseError { file: PathBuf, message: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parsing error.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Git operation error.
    #[error("git error: {0}")]
    Git(ferry_git::Error),
}

impl From<ferry_git::Error> for Error {
    fn from(err: ferry_git::Error) -> Self {
        match err {
            ferry_git::Error::Cancelled => Self::Cancelled,
            other => Self::Git(other),
        }
    }
}
