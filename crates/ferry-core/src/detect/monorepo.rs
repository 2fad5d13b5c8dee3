//! Detection for a downstream monorepo with one staging subtree per upstream.
//!
//! Every replayed commit carries `Upstream-repository: <name>` and
//! `Upstream-commit: <hash>` trailers. The newest such pair for a component is
//! its sync boundary; everything upstream after it is missing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use ferry_git::{GitOps, LogQuery};
use regex::Regex;

use super::DetectOptions;
use crate::commit::{Commit, PRETTY_FORMAT};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::interleave::interleave;
use crate::registry::RepositoryRegistry;

/// Trailer naming the upstream repository of a replayed commit.
pub const REPOSITORY_TRAILER: &str = "Upstream-repository";

/// Trailer naming the upstream commit of a replayed commit.
pub const COMMIT_TRAILER: &str = "Upstream-commit";

static COMMIT_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"(?m)^Upstream-commit: ([a-f0-9]{7,40})\s*$").unwrap()
});

/// Most recent upstream commit recorded for component `name`.
///
/// # Errors
/// Returns `MissingSyncBoundary` if no commit under the component's subtree
/// carries both trailers.
pub fn find_boundary<G: GitOps>(repo: &G, config: &Config, name: &str) -> Result<String> {
    let monorepo = &config.monorepo;
    let repository_line = format!("{REPOSITORY_TRAILER}: {name}");
    let query = LogQuery::new(&monorepo.central_ref, "%B%x00")
        .max_count(monorepo.history.max(1))
        .grep(&repository_line)
        .grep(COMMIT_TRAILER)
        .all_match()
        .fixed_strings()
        .reverse()
        .path(monorepo.subtree(name));

    let output = repo.log(&query)?;
    // grep matches substrings, so `api` also finds `api-server` markers.
    // Oldest first, so walk back from the newest.
    output
        .split('\0')
        .rev()
        .filter(|message| message.lines().any(|line| line.trim_end() == repository_line))
        .find_map(|message| COMMIT_MARKER.captures(message).map(|caps| caps[1].to_string()))
        .ok_or_else(|| Error::MissingSyncBoundary {
            repo: name.to_string(),
            reference: monorepo.central_ref.clone(),
        })
}

/// Whether upstream `commit` of its component already landed downstream.
///
/// # Errors
/// Returns a git error if the history can't be searched.
pub fn is_landed<G: GitOps>(repo: &G, config: &Config, commit: &Commit) -> Result<bool> {
    let query = LogQuery::new("HEAD", "%H")
        .max_count(1)
        .grep(format!("{REPOSITORY_TRAILER}: {}", commit.repository))
        .grep(format!("{COMMIT_TRAILER}: {}", commit.hash))
        .all_match()
        .fixed_strings()
        .path(config.monorepo.subtree(&commit.repository));
    Ok(!repo.log(&query)?.trim().is_empty())
}

/// Drop commits that already landed downstream, keeping order.
///
/// # Errors
/// Returns a git error if the history can't be searched.
pub fn filter_landed<G: GitOps>(repo: &G, config: &Config, commits: Vec<Commit>) -> Result<Vec<Commit>> {
    let mut missing = Vec::with_capacity(commits.len());
    for commit in commits {
        if is_landed(repo, config, &commit)? {
            tracing::debug!(repo = %commit.repository, commit = %commit.hash, "already synchronized");
        } else {
            missing.push(commit);
        }
    }
    Ok(missing)
}

/// Upstream commits of component `name` missing downstream, oldest first.
///
/// An upstream branch that no longer contains the boundary (force-pushed or
/// rewritten) yields an empty range with a warning.
///
/// # Errors
/// Returns `MissingSyncBoundary`, or git and parse errors.
pub fn detect_component<G: GitOps>(
    repo: &G,
    config: &Config,
    options: &DetectOptions,
    name: &str,
) -> Result<Vec<Commit>> {
    let boundary = find_boundary(repo, config, name)?;
    tracing::debug!(repo = name, commit = %boundary, "found last synchronized commit");

    let remote = config.upstream_url(options.fetch_mode, name);
    repo.fetch(&remote, &[config.monorepo.upstream_branch.as_str()], false)?;
    let head = repo.rev_parse("FETCH_HEAD")?;

    let reachable = match repo.is_ancestor(&boundary, &head) {
        Ok(reachable) => reachable,
        Err(ferry_git::Error::UnknownRevision(_)) => false,
        Err(e) => return Err(e.into()),
    };
    if !reachable {
        tracing::warn!(
            repo = name,
            boundary = %boundary,
            head = %head,
            "sync boundary is not an ancestor of the upstream branch, skipping"
        );
        return Ok(Vec::new());
    }

    let query = LogQuery::new(format!("{boundary}..{head}"), PRETTY_FORMAT)
        .no_merges()
        .reverse();
    let commits = Commit::parse_many(&repo.log(&query)?)?
        .into_iter()
        .map(|c| c.in_repo(name))
        .collect();

    filter_landed(repo, config, commits)
}

/// Detect every component and merge the results into one replay order.
///
/// # Errors
/// Returns the first component's error.
pub fn detect<G: GitOps>(
    repo: &G,
    config: &Config,
    options: &DetectOptions,
    registry: &RepositoryRegistry,
) -> Result<Vec<Commit>> {
    let ranges = registry
        .names()
        .map(|name| {
            let _span = tracing::info_span!("detect", repo = name).entered();
            detect_component(repo, config, options, name).map(|commits| (name.to_string(), commits))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok(interleave(&ranges))
}
