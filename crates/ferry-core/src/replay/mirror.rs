//! Replay for mirrored repositories.
//!
//! The sync branch is reset to the upstream target and merged with the
//! downstream branch using the `ours` strategy, so the result is a descendant of
//! both while holding exactly the upstream tree. Carries are cherry-picked on
//! top, then generated content is refreshed in separate `<drop>` commits.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use ferry_git::{CommitRequest, GitOps};

use super::{Progress, ReplayOptions, ReplayOutcome, ReplayState, commit_paths, pick, workdir};
use crate::bookkeeping::SyncBookkeepingRecord;
use crate::config::{Config, RepositoryConfig};
use crate::conflict::ConflictHandler;
use crate::error::{Error, Result};
use crate::modules::ModuleTool;
use crate::plan::SynchronizationTarget;
use crate::registry::RepositorySet;

const VENDOR_MESSAGE: &str = "UPSTREAM: <drop>: go mod vendor";
const STRIP_MESSAGE: &str = "UPSTREAM: <drop>: remove upstream GitHub configuration";
const MANIFESTS_MESSAGE: &str = "UPSTREAM: <drop>: Generate manifests";
const BOOKKEEPING_MESSAGE: &str = "UPSTREAM: <drop>: configure the commit-checker";

const MODULE_FILES: [&str; 3] = ["vendor", "go.mod", "go.sum"];

/// Replays [`SynchronizationTarget`]s into mirrored repositories.
pub struct MirrorReplay<'a, M, H: ?Sized> {
    config: &'a Config,
    modules: &'a M,
    handler: &'a H,
    options: ReplayOptions,
}

impl<'a, M: ModuleTool, H: ConflictHandler + ?Sized> MirrorReplay<'a, M, H> {
    #[must_use]
    pub const fn new(config: &'a Config, modules: &'a M, handler: &'a H, options: ReplayOptions) -> Self {
        Self {
            config,
            modules,
            handler,
            options,
        }
    }

    /// Install the tools the downstream build needs, retrying with backoff.
    ///
    /// # Errors
    /// Returns the last failure of the setup command.
    pub fn setup<G: GitOps>(&self, repo: &G) -> Result<()> {
        let command = &self.config.mirror.setup_command;
        if command.is_empty() {
            return Ok(());
        }
        let backoff: Vec<Duration> = self
            .config
            .mirror
            .setup_backoff
            .iter()
            .map(|secs| Duration::from_secs(*secs))
            .collect();
        let _span = tracing::info_span!("setup").entered();
        self.modules.run_with_backoff(workdir(repo)?, command, &backoff)
    }

    /// Replay every target, stopping at the first failure.
    ///
    /// # Errors
    /// Returns the failing repository's error.
    pub fn replay_all<G: GitOps>(
        &self,
        repos: &RepositorySet<G>,
        targets: &BTreeMap<String, SynchronizationTarget>,
    ) -> Result<Vec<ReplayOutcome>> {
        targets
            .iter()
            .map(|(name, sync)| {
                let _span = tracing::info_span!("replay", repo = %name).entered();
                self.replay(repos.get(name)?, name, sync)
            })
            .collect()
    }

    /// Replay `sync` into repository `name`.
    ///
    /// # Errors
    /// Returns `UnknownRepository`, `UnrecoverableReplayConflict`,
    /// `DependencyRegenerationFailure` or git errors.
    pub fn replay<G: GitOps>(&self, repo: &G, name: &str, sync: &SynchronizationTarget) -> Result<ReplayOutcome> {
        let repository = self
            .config
            .mirror
            .repository(name)
            .ok_or_else(|| Error::UnknownRepository(name.to_string()))?;
        let root = workdir(repo)?;
        let branch = &self.config.downstream.branch;
        let target = &sync.target.hash;
        let mut progress = Progress::new(name);

        let record = SyncBookkeepingRecord::new(
            &self.config.upstream.org,
            name,
            &self.config.upstream.branch,
            target,
        );

        if sync.additional.is_empty() && contains(repo, target, branch)? {
            tracing::info!(repo = name, commit = %target, "target already merged, refreshing bookkeeping only");
            repo.checkout(branch)?;
            record.write(root, &self.config.mirror.bookkeeping_file)?;
            progress.advance(ReplayState::BookkeepingWritten);
            return Ok(progress.finish(0, true));
        }

        let sync_branch = &self.config.mirror.sync_branch;
        repo.checkout(branch)?;
        repo.force_branch(sync_branch, target)?;
        repo.checkout(sync_branch)?;
        repo.merge(branch, "ours", self.options.signoff)?;
        progress.advance(ReplayState::TargetAdopted);

        let generated = vec![self.config.mirror.manifest_dir.clone()];
        for (i, carry) in sync.additional.iter().enumerate() {
            tracing::info!(repo = name, "carrying commit {}/{}", i + 1, sync.additional.len());
            pick(repo, self.handler, &mut progress, carry, None, &generated)?;
            self.regenerate_carry(repo, root)?;
        }
        progress.advance(ReplayState::CarriesApplied);

        self.regenerate(repo, root, repository)?;
        progress.advance(ReplayState::ArtifactsRegenerated);

        self.write_bookkeeping(repo, root, &record, &mut progress)?;
        Ok(progress.finish(sync.additional.len(), false))
    }

    /// Refresh the tooling module and manifests, folding them into the carry.
    fn regenerate_carry<G: GitOps>(&self, repo: &G, root: &Path) -> Result<()> {
        let mirror = &self.config.mirror;
        let tooling = root.join(&mirror.tooling_dir);
        if tooling.is_dir() {
            self.modules.regenerate(&tooling)?;
        }

        if self.options.delay_manifest_generation {
            repo.rm(&[mirror.manifest_dir.as_str()])?;
        } else {
            self.modules.run(root, &mirror.manifest_command)?;
        }

        let amend = CommitRequest::amend().allow_empty().signoff(self.options.signoff);
        commit_paths(repo, &[mirror.tooling_dir.as_str()], true, &amend)?;
        Ok(())
    }

    fn regenerate<G: GitOps>(&self, repo: &G, root: &Path, repository: &RepositoryConfig) -> Result<()> {
        let mirror = &self.config.mirror;
        let signoff = self.options.signoff;

        let mut paths: Vec<String> = MODULE_FILES.iter().map(|f| (*f).to_string()).collect();
        self.modules.regenerate(root)?;
        for dir in &repository.extra_module_dirs {
            self.modules.regenerate(&root.join(dir))?;
            paths.extend(MODULE_FILES.iter().map(|f| format!("{dir}/{f}")));
        }
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        commit_paths(repo, &paths, true, &CommitRequest::new(VENDOR_MESSAGE).signoff(signoff))?;

        if !mirror.strip_paths.is_empty() {
            let strip: Vec<&str> = mirror.strip_paths.iter().map(String::as_str).collect();
            repo.rm(&strip)?;
            commit_paths(repo, &[], true, &CommitRequest::new(STRIP_MESSAGE).signoff(signoff))?;
        }

        if self.options.delay_manifest_generation {
            self.modules.run(root, &mirror.manifest_command)?;
            commit_paths(
                repo,
                &[mirror.manifest_dir.as_str()],
                true,
                &CommitRequest::new(MANIFESTS_MESSAGE).signoff(signoff),
            )?;
        }
        Ok(())
    }

    fn write_bookkeeping<G: GitOps>(
        &self,
        repo: &G,
        root: &Path,
        record: &SyncBookkeepingRecord,
        progress: &mut Progress<'_>,
    ) -> Result<()> {
        let file = &self.config.mirror.bookkeeping_file;
        record.write(root, file)?;
        commit_paths(
            repo,
            &[file.as_str()],
            true,
            &CommitRequest::new(BOOKKEEPING_MESSAGE).signoff(self.options.signoff),
        )?;
        progress.advance(ReplayState::BookkeepingWritten);
        Ok(())
    }
}

fn contains<G: GitOps>(repo: &G, target: &str, branch: &str) -> Result<bool> {
    match repo.is_ancestor(target, branch) {
        Ok(contained) => Ok(contained),
        Err(ferry_git::Error::UnknownRevision(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
