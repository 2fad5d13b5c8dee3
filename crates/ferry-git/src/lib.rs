//! # ferry-git
//!
//! Git primitives for Ferry. Read-only inspection (ancestry, merge bases,
//! repository state, index conflicts) goes through git2-rs; history-rewriting
//! porcelain (cherry-pick, merge, commit with trailers, fetch, push) is run
//! through the `git` binary so its exact behavior and messages are preserved.

mod cancel;
mod command;
mod error;
mod repository;
mod traits;
mod types;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use repository::Repository;
pub use traits::GitOps;
pub use types::{CherryPick, CommitOutcome, CommitRequest, LogQuery, PickOutcome};

// Re-export SecretString so callers can build push URLs without a direct dependency
pub use secrecy::SecretString;
