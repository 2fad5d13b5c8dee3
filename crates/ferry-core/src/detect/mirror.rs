//! Detection for downstream repositories that each mirror one upstream.
//!
//! The primary repository follows its upstream branch head. Dependents follow
//! whatever version the primary's module file pins at that head, so they are
//! moved in lockstep with it.

use std::collections::BTreeMap;

use ferry_git::{GitOps, LogQuery};
use serde::Serialize;

use super::DetectOptions;
use crate::bookkeeping::SyncBookkeepingRecord;
use crate::classify::{Classification, classify};
use crate::commit::{Commit, PRETTY_FORMAT};
use crate::config::{Config, RepositoryConfig};
use crate::error::Result;
use crate::modules::ModuleTool;
use crate::plan::{SyncPlan, SynchronizationTarget};
use crate::registry::RepositorySet;
use crate::replay::workdir;
use crate::version::resolve_version;

/// Detection result for one mirrored repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorDetection {
    pub name: String,
    /// Upstream commit the repository should be moved to.
    pub target: Commit,
    /// The downstream branch already contains `target`.
    pub up_to_date: bool,
    /// Downstream-only commits, classified. Empty when skipped as up to date.
    pub classification: Classification,
}

impl MirrorDetection {
    /// Whether replay has work to do for this repository.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.up_to_date || !self.classification.carries.is_empty()
    }

    /// Plan entry for this repository.
    #[must_use]
    pub fn into_target(self) -> SynchronizationTarget {
        SynchronizationTarget {
            target: self.target,
            additional: self.classification.carries,
        }
    }
}

/// Whether the downstream branch already holds `target`.
///
/// The committed bookkeeping record is consulted first; otherwise ancestry
/// decides.
///
/// # Errors
/// Returns a git error if the branch cannot be inspected.
pub fn is_up_to_date<G: GitOps>(repo: &G, config: &Config, name: &str, target: &str) -> Result<bool> {
    let branch = &config.downstream.branch;

    let recorded = SyncBookkeepingRecord::read_at(repo, branch, &config.mirror.bookkeeping_file)?
        .is_some_and(|record| record.upstream_repo == name && record.expected_merge_base == target);
    if recorded {
        tracing::info!(repo = name, commit = target, "bookkeeping record names target, nothing to do");
        return Ok(true);
    }

    let contained = match repo.is_ancestor(target, branch) {
        Ok(contained) => contained,
        Err(ferry_git::Error::UnknownRevision(_)) => false,
        Err(e) => return Err(e.into()),
    };
    if contained {
        tracing::info!(repo = name, commit = target, "branch already contains target commit, nothing to do");
    }
    Ok(contained)
}

/// Downstream-only commits on `branch` since it diverged from `target`, oldest first.
///
/// # Errors
/// Returns a git error, or `MalformedCommitRecord` for unparseable output.
pub fn find_carries<G: GitOps>(repo: &G, branch: &str, target: &str) -> Result<Vec<Commit>> {
    let base = repo.merge_base(branch, target)?;
    let query = LogQuery::new(format!("{base}..{branch}"), PRETTY_FORMAT)
        .ancestry_path()
        .no_merges()
        .reverse();
    Commit::parse_many(&repo.log(&query)?)
}

/// Detect repository `name` against upstream commit `target`.
///
/// # Errors
/// Returns git, parse or classification errors.
pub fn detect_repository<G: GitOps>(
    repo: &G,
    config: &Config,
    options: &DetectOptions,
    name: &str,
    target: &str,
) -> Result<MirrorDetection> {
    let target = Commit::lookup(repo, target)?.in_repo(name);
    tracing::info!(repo = name, commit = %target.hash, "resolved latest commit");

    let up_to_date = is_up_to_date(repo, config, name, &target.hash)?;
    if up_to_date && !options.force_remerge {
        return Ok(MirrorDetection {
            name: name.to_string(),
            target,
            up_to_date,
            classification: Classification::default(),
        });
    }

    // Carries are computed against the target, which must be present locally.
    repo.fetch(&config.upstream_url(options.fetch_mode, name), &[target.hash.as_str()], false)?;
    let candidates = find_carries(repo, &config.downstream.branch, &target.hash)?
        .into_iter()
        .map(|c| c.in_repo(name))
        .collect();
    let classification = classify(repo, &target.hash, candidates, &options.drop_list)?;

    Ok(MirrorDetection {
        name: name.to_string(),
        target,
        up_to_date,
        classification,
    })
}

/// Detect the primary repository against its upstream branch head.
///
/// # Errors
/// Returns git, parse or classification errors.
pub fn detect_primary<G: GitOps>(
    repo: &G,
    config: &Config,
    options: &DetectOptions,
) -> Result<MirrorDetection> {
    let name = &config.mirror.primary.name;
    repo.fetch(
        &config.upstream_url(options.fetch_mode, name),
        &[config.upstream.branch.as_str()],
        true,
    )?;
    let head = repo.rev_parse("FETCH_HEAD")?;
    detect_repository(repo, config, options, name, &head)
}

/// Version of `module` pinned by the primary repository at `target`.
///
/// The primary's checkout is restored afterwards, also on failure.
///
/// # Errors
/// Returns git or module tool errors.
pub fn dependent_version<G: GitOps, M: ModuleTool>(
    primary: &G,
    modules: &M,
    target: &str,
    module: &str,
) -> Result<String> {
    let original = match primary.current_branch() {
        Ok(branch) => branch,
        Err(ferry_git::Error::DetachedHead) => primary.rev_parse("HEAD")?,
        Err(e) => return Err(e.into()),
    };

    primary.checkout(target)?;
    let info = workdir(primary).and_then(|dir| modules.module_info(dir, module));
    primary.checkout(&original)?;

    let version = info?.version;
    tracing::info!(module, version = %version, "resolved pinned version");
    Ok(version)
}

/// Detect dependent repository `dependent` against the version `primary_target` pins.
///
/// # Errors
/// Returns `UnresolvableVersion`, git, parse or classification errors.
pub fn detect_dependent<G: GitOps, M: ModuleTool>(
    primary: &G,
    repo: &G,
    modules: &M,
    config: &Config,
    options: &DetectOptions,
    dependent: &RepositoryConfig,
    primary_target: &str,
) -> Result<MirrorDetection> {
    let version = dependent_version(primary, modules, primary_target, &dependent.module)?;
    repo.fetch(&config.upstream_url(options.fetch_mode, &dependent.name), &[], true)?;
    let target = resolve_version(repo, &dependent.module, &version)?;
    detect_repository(repo, config, options, &dependent.name, &target)
}

/// Detect the primary and every dependent.
///
/// # Errors
/// Returns the first repository's error.
pub fn detect<G: GitOps, M: ModuleTool>(
    repos: &RepositorySet<G>,
    modules: &M,
    config: &Config,
    options: &DetectOptions,
) -> Result<BTreeMap<String, MirrorDetection>> {
    let primary_config = &config.mirror.primary;
    let primary = repos.get(&primary_config.name)?;

    let primary_detection = {
        let _span = tracing::info_span!("detect", repo = %primary_config.name).entered();
        detect_primary(primary, config, options)?
    };
    let primary_target = primary_detection.target.hash.clone();

    let mut detections = BTreeMap::new();
    detections.insert(primary_config.name.clone(), primary_detection);

    for dependent in &config.mirror.dependents {
        let _span = tracing::info_span!("detect", repo = %dependent.name).entered();
        let repo = repos.get(&dependent.name)?;
        let detection =
            detect_dependent(primary, repo, modules, config, options, dependent, &primary_target)?;
        detections.insert(dependent.name.clone(), detection);
    }

    Ok(detections)
}

/// Plan covering the repositories with pending work.
#[must_use]
pub fn plan(detections: BTreeMap<String, MirrorDetection>) -> SyncPlan {
    let targets = detections
        .into_iter()
        .filter(|(_, detection)| detection.is_pending())
        .map(|(name, detection)| (name, detection.into_target()))
        .collect();
    SyncPlan::Mirror { targets }
}
