//! Trait abstractions for git operations.
//!
//! This module defines the `GitOps` trait which abstracts the git primitives
//! the synchronization engine needs, enabling dependency injection and
//! scripted mocks in tests.

use std::path::Path;

use secrecy::SecretString;

use crate::{CherryPick, CommitOutcome, CommitRequest, LogQuery, PickOutcome, Result};

/// Trait for git repository operations on one working directory.
///
/// Revisions are passed and returned as strings (full hex hashes once
/// resolved) since most of them come straight from command output.
#[allow(clippy::missing_errors_doc)]
pub trait GitOps {
    // === Repository Info ===

    /// Get the working directory path.
    fn workdir(&self) -> Option<&Path>;

    /// Get the current branch name.
    fn current_branch(&self) -> Result<String>;

    /// Check if a cherry-pick is in progress.
    fn is_cherry_picking(&self) -> bool;

    // === Inspection ===

    /// Resolve a revision to a full commit hash.
    fn rev_parse(&self, rev: &str) -> Result<String>;

    /// Find the merge base of two revisions.
    fn merge_base(&self, one: &str, two: &str) -> Result<String>;

    /// Check whether `ancestor` is reachable from `descendant`.
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Show a single commit with a pretty format.
    fn show(&self, rev: &str, format: &str) -> Result<String>;

    /// Run a log query and return its output.
    fn log(&self, query: &LogQuery) -> Result<String>;

    /// Files with unresolved conflicts in the index.
    fn conflicted_files(&self) -> Result<Vec<String>>;

    /// Conflicted files the incoming commit deleted (no "theirs" stage).
    fn deleted_by_them(&self) -> Result<Vec<String>>;

    /// Contents of `path` in the tree of `rev`, `None` if absent.
    fn file_at(&self, rev: &str, path: &str) -> Result<Option<String>>;

    /// Read a config value, `None` if unset.
    fn config_get(&self, key: &str) -> Result<Option<String>>;

    // === Remote Operations ===

    /// Fetch refspecs from a remote URL (optionally with tags).
    fn fetch(&self, remote: &str, refspecs: &[&str], tags: bool) -> Result<()>;

    /// Force-push a refspec to a URL that may embed a token.
    fn push(&self, url: &SecretString, refspec: &str) -> Result<()>;

    // === Branch Operations ===

    /// Check out a branch or detach at a revision.
    fn checkout(&self, rev: &str) -> Result<()>;

    /// Create or reset a branch to point at `target`.
    fn force_branch(&self, name: &str, target: &str) -> Result<()>;

    /// Merge `branch` into HEAD with an explicit strategy.
    fn merge(&self, branch: &str, strategy: &str, signoff: bool) -> Result<()>;

    // === Replay ===

    /// Cherry-pick a commit onto HEAD.
    fn cherry_pick(&self, commit: &str, options: &CherryPick) -> Result<PickOutcome>;

    /// Continue a cherry-pick after conflicts were resolved.
    fn cherry_pick_continue(&self) -> Result<()>;

    /// Take the incoming side of the given conflicted paths.
    fn checkout_theirs(&self, paths: &[String]) -> Result<()>;

    // === Working Tree ===

    /// Stage paths, optionally including ignored ones.
    fn add(&self, paths: &[&str], force: bool) -> Result<()>;

    /// Remove paths from the index only.
    fn rm_cached(&self, paths: &[&str]) -> Result<()>;

    /// Remove paths from the index and working tree.
    fn rm(&self, paths: &[&str]) -> Result<()>;

    /// Create or amend a commit.
    fn commit(&self, request: &CommitRequest) -> Result<CommitOutcome>;

    /// Set a config value in the repository's local config.
    fn config_set(&self, key: &str, value: &str) -> Result<()>;
}
