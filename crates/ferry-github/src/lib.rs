//! # ferry-github
//!
//! GitHub API integration for Ferry: making sure the bot account has a fork
//! to push to, and opening or refreshing the synchronization pull request.
//!
//! # Security
//!
//! Authentication tokens are stored using `SecretString` which automatically
//! zeroizes memory when dropped, reducing credential exposure in memory dumps.

mod auth;
mod client;
mod dry_run;
mod error;
pub mod traits;
mod types;

pub use auth::Auth;
pub use client::GitHubClient;
pub use dry_run::DryRun;
pub use error::{Error, Result};
// Re-export SecretString for constructing Auth::Token
pub use secrecy::SecretString;
pub use traits::{GitHubApi, ensure_fork, upsert_pull_request};
pub use types::{
    CreatePullRequest, Label, PullRequest, PullRequestState, Repository, UpdatePullRequest,
};
