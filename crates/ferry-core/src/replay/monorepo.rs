//! Replay for the monorepo strategy.
//!
//! Upstream commits are applied below their component's staging subtree on top
//! of the current checkout, in the interleaved order detection produced. Each
//! replayed commit is amended with regenerated dependencies and the
//! provenance trailers that later runs use as their sync boundary.

use std::collections::BTreeSet;
use std::path::Path;

use ferry_git::{CommitRequest, GitOps};

use super::{Progress, ReplayOptions, ReplayOutcome, ReplayState, commit_paths, pick, workdir};
use crate::commit::Commit;
use crate::config::Config;
use crate::conflict::ConflictHandler;
use crate::detect::monorepo::{COMMIT_TRAILER, REPOSITORY_TRAILER};
use crate::error::Result;
use crate::modules::ModuleTool;

const DEPENDENCIES_MESSAGE: &str = "UPSTREAM: <drop>: regenerate dependencies";
const MANIFESTS_MESSAGE: &str = "UPSTREAM: <drop>: Generate manifests";

/// Replays an interleaved commit list into the monorepo.
pub struct MonorepoReplay<'a, M, H: ?Sized> {
    config: &'a Config,
    modules: &'a M,
    handler: &'a H,
    options: ReplayOptions,
}

impl<'a, M: ModuleTool, H: ConflictHandler + ?Sized> MonorepoReplay<'a, M, H> {
    #[must_use]
    pub const fn new(config: &'a Config, modules: &'a M, handler: &'a H, options: ReplayOptions) -> Self {
        Self {
            config,
            modules,
            handler,
            options,
        }
    }

    /// Replay `commits` in order onto the current checkout.
    ///
    /// # Errors
    /// Returns `UnrecoverableReplayConflict`, `DependencyRegenerationFailure`
    /// or git errors; commits replayed before the failure stay in place.
    pub fn replay<G: GitOps>(&self, repo: &G, commits: &[Commit]) -> Result<ReplayOutcome> {
        let monorepo = &self.config.monorepo;
        let root = workdir(repo)?;
        let mut progress = Progress::new(&monorepo.repo);

        for commit in commits {
            self.ensure_present(repo, commit)?;
        }
        progress.advance(ReplayState::TargetAdopted);

        let mut touched = BTreeSet::new();
        for (i, commit) in commits.iter().enumerate() {
            let _span = tracing::info_span!("replay", repo = %commit.repository, commit = %commit.hash).entered();
            tracing::info!("cherry-picking commit {}/{}", i + 1, commits.len());

            let subtree = monorepo.subtree(&commit.repository);
            pick(repo, self.handler, &mut progress, commit, Some(&subtree), &monorepo.commit_paths)?;
            self.amend(repo, root, commit, &subtree)?;
            touched.insert(subtree);
        }
        progress.advance(ReplayState::CarriesApplied);

        self.regenerate_deferred(repo, root, &touched)?;
        progress.advance(ReplayState::ArtifactsRegenerated);
        // Provenance trailers were amended into each pick above.
        progress.advance(ReplayState::BookkeepingWritten);

        Ok(progress.finish(commits.len(), false))
    }

    /// Fetch the component's upstream branch if `commit` is not in the object store.
    fn ensure_present<G: GitOps>(&self, repo: &G, commit: &Commit) -> Result<()> {
        if repo.rev_parse(&commit.hash).is_ok() {
            return Ok(());
        }
        let remote = self.config.upstream_url(self.options.fetch_mode, &commit.repository);
        repo.fetch(&remote, &[self.config.monorepo.upstream_branch.as_str()], false)?;
        Ok(())
    }

    /// Regenerate what isn't deferred and fold it, with provenance, into the pick.
    fn amend<G: GitOps>(&self, repo: &G, root: &Path, commit: &Commit, subtree: &str) -> Result<()> {
        let monorepo = &self.config.monorepo;
        if !self.options.delay_dependency_regeneration {
            self.modules.regenerate(root)?;
            self.modules.regenerate(&root.join(subtree))?;
        }
        if !self.options.delay_manifest_generation {
            self.modules.run(root, &monorepo.manifest_command)?;
        }

        let request = CommitRequest::amend()
            .allow_empty()
            .trailer(REPOSITORY_TRAILER, &commit.repository)
            .trailer(COMMIT_TRAILER, &commit.hash)
            .signoff(self.options.signoff);
        let mut paths = vec![subtree];
        paths.extend(monorepo.commit_paths.iter().map(String::as_str));
        commit_paths(repo, &paths, false, &request)?;
        Ok(())
    }

    fn regenerate_deferred<G: GitOps>(&self, repo: &G, root: &Path, touched: &BTreeSet<String>) -> Result<()> {
        let monorepo = &self.config.monorepo;
        let signoff = self.options.signoff;

        if self.options.delay_dependency_regeneration && !touched.is_empty() {
            self.modules.regenerate(root)?;
            for subtree in touched {
                self.modules.regenerate(&root.join(subtree))?;
            }
            let mut paths: Vec<&str> = touched.iter().map(String::as_str).collect();
            paths.extend(monorepo.commit_paths.iter().map(String::as_str));
            commit_paths(repo, &paths, false, &CommitRequest::new(DEPENDENCIES_MESSAGE).signoff(signoff))?;
        }

        if self.options.delay_manifest_generation && !touched.is_empty() {
            self.modules.run(root, &monorepo.manifest_command)?;
            let paths: Vec<&str> = monorepo.commit_paths.iter().map(String::as_str).collect();
            commit_paths(repo, &paths, false, &CommitRequest::new(MANIFESTS_MESSAGE).signoff(signoff))?;
        }
        Ok(())
    }
}
