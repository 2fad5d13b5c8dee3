//! Replaying detected commits onto downstream branches.
//!
//! Each repository moves through [`ReplayState`] in order. A failure leaves the
//! repository wherever it stopped: nothing after the failing step runs, so no
//! bookkeeping is ever written for a half-finished replay.

pub mod mirror;
pub mod monorepo;

use std::fmt;
use std::path::Path;

use ferry_git::{CherryPick, CommitOutcome, CommitRequest, GitOps, PickOutcome};
use serde::Serialize;

use crate::commit::Commit;
use crate::config::FetchMode;
use crate::conflict::{ConflictHandler, StoppedPick, recover};
use crate::error::Result;

/// Knobs shared by both strategies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Add `Signed-off-by` to every commit created.
    pub signoff: bool,
    /// Generate manifests once after all carries instead of per carry.
    pub delay_manifest_generation: bool,
    /// Regenerate dependencies once after all commits instead of per commit.
    pub delay_dependency_regeneration: bool,
    /// How to reach upstream remotes for commits missing locally.
    pub fetch_mode: FetchMode,
}

/// Where a repository's replay currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayState {
    NotStarted,
    TargetAdopted,
    CarriesApplied,
    ArtifactsRegenerated,
    BookkeepingWritten,
    Done,
    /// Waiting on the conflict handler.
    ConflictPaused,
}

impl fmt::Display for ReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::TargetAdopted => "target_adopted",
            Self::CarriesApplied => "carries_applied",
            Self::ArtifactsRegenerated => "artifacts_regenerated",
            Self::BookkeepingWritten => "bookkeeping_written",
            Self::Done => "done",
            Self::ConflictPaused => "conflict_paused",
        };
        f.write_str(name)
    }
}

/// What replaying one repository did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayOutcome {
    pub repository: String,
    pub state: ReplayState,
    /// Commits cherry-picked.
    pub replayed: usize,
    /// The target was already contained; only bookkeeping was refreshed.
    pub short_circuited: bool,
    /// States passed through, in order.
    pub phases: Vec<ReplayState>,
}

/// Tracks and logs state transitions of one repository.
#[derive(Debug)]
pub(crate) struct Progress<'a> {
    repository: &'a str,
    state: ReplayState,
    phases: Vec<ReplayState>,
}

impl<'a> Progress<'a> {
    pub(crate) const fn new(repository: &'a str) -> Self {
        Self {
            repository,
            state: ReplayState::NotStarted,
            phases: Vec::new(),
        }
    }

    pub(crate) fn advance(&mut self, state: ReplayState) {
        tracing::info!(repo = self.repository, phase = %state, "replay advanced");
        self.state = state;
        self.phases.push(state);
    }

    pub(crate) const fn state(&self) -> ReplayState {
        self.state
    }

    pub(crate) fn finish(mut self, replayed: usize, short_circuited: bool) -> ReplayOutcome {
        self.advance(ReplayState::Done);
        ReplayOutcome {
            repository: self.repository.to_string(),
            state: self.state,
            replayed,
            short_circuited,
            phases: self.phases,
        }
    }
}

/// Working directory of `repo`.
///
/// # Errors
/// Returns `NotARepository` for bare repositories.
pub fn workdir<G: GitOps>(repo: &G) -> Result<&Path> {
    repo.workdir()
        .ok_or_else(|| ferry_git::Error::NotARepository.into())
}

/// Set the committer identity for whichever of name and email is unset.
///
/// # Errors
/// Returns a git error if the config cannot be read or written.
pub fn set_committer<G: GitOps>(repo: &G, identity: Option<(&str, &str)>) -> Result<()> {
    let Some((name, email)) = identity else {
        return Ok(());
    };
    for (key, value) in [("user.name", name), ("user.email", email)] {
        if repo.config_get(key)?.is_none_or(|current| current.trim().is_empty()) {
            tracing::info!(key, value, "setting committer identity");
            repo.config_set(key, value)?;
        }
    }
    Ok(())
}

/// Stage whichever of `paths` exist and commit the index with `request`.
///
/// Returns whether a commit was written; an unchanged index is not an error.
pub(crate) fn commit_paths<G: GitOps>(
    repo: &G,
    paths: &[&str],
    force: bool,
    request: &CommitRequest,
) -> Result<bool> {
    let root = workdir(repo)?;
    let existing: Vec<&str> = paths
        .iter()
        .copied()
        .filter(|path| root.join(path).exists())
        .collect();
    if !existing.is_empty() {
        repo.add(&existing, force)?;
    }

    match repo.commit(request)? {
        CommitOutcome::Created => Ok(true),
        CommitOutcome::NothingToCommit => {
            tracing::debug!(message = ?request.message, "nothing to commit");
            Ok(false)
        }
    }
}

/// Cherry-pick `commit`, recovering from a stop through the conflict rules.
pub(crate) fn pick<G: GitOps, H: ConflictHandler + ?Sized>(
    repo: &G,
    handler: &H,
    progress: &mut Progress<'_>,
    commit: &Commit,
    subtree: Option<&str>,
    generated_dirs: &[String],
) -> Result<()> {
    let options = CherryPick {
        subtree: subtree.map(str::to_string),
        allow_empty: true,
    };
    tracing::info!(repo = progress.repository, commit = %commit.hash, message = %commit.message, "cherry-picking");

    let PickOutcome::Stopped { output } = repo.cherry_pick(&commit.hash, &options)? else {
        return Ok(());
    };

    let resumed = progress.state();
    progress.advance(ReplayState::ConflictPaused);
    recover(
        repo,
        handler,
        &StoppedPick {
            repository: progress.repository,
            commit,
            subtree,
            output: &output,
        },
        generated_dirs,
    )?;
    progress.advance(resumed);
    Ok(())
}
