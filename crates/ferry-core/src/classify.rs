//! Deciding which downstream commits must be carried onto a new target.

use ferry_git::{GitOps, LogQuery};
use serde::{Deserialize, Serialize};

use crate::commit::Commit;
use crate::directive::Directive;
use crate::error::Result;

/// Outcome of classifying a repository's downstream-only commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Commits to reapply, in downstream order.
    pub carries: Vec<Commit>,
    /// Commits excluded by directive or by the operator drop-list.
    pub dropped: Vec<Commit>,
    /// Pull request cherry-picks whose upstream merge is already in the target.
    pub superseded: Vec<Commit>,
    /// Revert commits; also present in one of the lists above.
    pub reverts: Vec<Commit>,
}

/// Classify `candidates` (downstream order) against upstream `target`.
///
/// `drop_list` holds hash prefixes the operator wants excluded regardless of
/// their directive.
///
/// # Errors
/// Returns `UnexpectedCommitDirective` for a commit without a directive, or a
/// git error if the upstream history cannot be searched.
pub fn classify<G: GitOps>(
    repo: &G,
    target: &str,
    candidates: Vec<Commit>,
    drop_list: &[String],
) -> Result<Classification> {
    let mut classification = Classification::default();

    for commit in candidates {
        if let Some(prefix) = drop_list
            .iter()
            .find(|prefix| !prefix.is_empty() && commit.hash.starts_with(prefix.as_str()))
        {
            tracing::info!(commit = %commit.hash, drop = %prefix, "dropping commit on operator request");
            classification.dropped.push(commit);
            continue;
        }

        let directive = Directive::of(&commit)?;
        if directive.is_revert() {
            tracing::warn!(commit = %commit.hash, message = %commit.message, "carrying a revert");
            classification.reverts.push(commit.clone());
        }

        match directive.base() {
            Directive::Drop => {
                tracing::info!(commit = %commit.hash, "dropping commit");
                classification.dropped.push(commit);
            }
            Directive::PullRequest(number) => {
                if is_merged_upstream(repo, target, *number)? {
                    tracing::info!(commit = %commit.hash, pr = number, "pull request already upstream");
                    classification.superseded.push(commit);
                } else {
                    tracing::info!(commit = %commit.hash, pr = number, "cherry-picked pull request needs to be carried");
                    classification.carries.push(commit);
                }
            }
            Directive::Carry | Directive::Revert(_) => {
                tracing::info!(commit = %commit.hash, "carrying commit");
                classification.carries.push(commit);
            }
        }
    }

    Ok(classification)
}

/// Whether a commit reachable from `target` has a subject ending in `(#number)`.
///
/// Upstream squash-merges suffix the subject with the pull request number;
/// mentions in a body or mid-subject do not count.
///
/// # Errors
/// Returns a git error if the log query fails.
pub fn is_merged_upstream<G: GitOps>(repo: &G, target: &str, number: u64) -> Result<bool> {
    let needle = format!("(#{number})");
    let query = LogQuery::new(target, "%s").grep(&needle).fixed_strings();
    let output = repo.log(&query)?;
    Ok(output.lines().any(|subject| subject.trim_end().ends_with(&needle)))
}
