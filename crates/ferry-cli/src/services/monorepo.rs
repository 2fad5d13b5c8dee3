//! Monorepo service: detect, load and replay upstream commits below the
//! staging directory.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ferry_core::detect::monorepo;
use ferry_core::replay::monorepo::MonorepoReplay;
use ferry_core::replay::workdir;
use ferry_core::{
    Commit, Config, ConflictHandler, DetectOptions, ModuleTool, ReplayOptions, ReplayOutcome,
    RepositoryRegistry, SyncPlan,
};
use ferry_git::GitOps;

/// Service for monorepo synchronization with trait-based dependencies.
pub struct MonorepoService<'a, G: GitOps, M: ModuleTool> {
    repo: &'a G,
    modules: &'a M,
    config: &'a Config,
}

impl<'a, G: GitOps, M: ModuleTool> MonorepoService<'a, G, M> {
    #[must_use]
    pub const fn new(repo: &'a G, modules: &'a M, config: &'a Config) -> Self {
        Self {
            repo,
            modules,
            config,
        }
    }

    /// Components vendored below the staging directory.
    ///
    /// # Errors
    /// Returns error if the repository is bare or the staging directory is unreadable.
    pub fn components(&self) -> Result<RepositoryRegistry> {
        let root = workdir(self.repo)?;
        let staging = &self.config.monorepo.staging_dir;
        RepositoryRegistry::discover_staging(root, staging)
            .with_context(|| format!("cannot list components in {}", root.join(staging).display()))
    }

    /// Upstream commits missing downstream, in replay order.
    ///
    /// # Errors
    /// Returns error if a component has no sync boundary or git fails.
    pub fn detect(&self, options: &DetectOptions) -> Result<Vec<Commit>> {
        let registry = self.components()?;
        tracing::info!(components = registry.len(), "detecting upstream commits");
        Ok(monorepo::detect(self.repo, self.config, options, &registry)?)
    }

    /// Commits from a saved plan that have not landed yet.
    ///
    /// Commits replayed by an earlier, interrupted run are skipped.
    ///
    /// # Errors
    /// Returns error if the file is unreadable or holds a mirror plan.
    pub fn load(&self, path: &Path) -> Result<Vec<Commit>> {
        let plan = SyncPlan::load(path).with_context(|| format!("cannot load plan {}", path.display()))?;
        let SyncPlan::Monorepo { commits } = plan else {
            bail!("{} holds a mirror plan, not a monorepo plan", path.display());
        };
        let total = commits.len();
        let missing = monorepo::filter_landed(self.repo, self.config, commits)?;
        if missing.len() < total {
            tracing::info!(skipped = total - missing.len(), "skipping commits that already landed");
        }
        Ok(missing)
    }

    /// Replay `commits` onto the current checkout.
    ///
    /// # Errors
    /// Returns the replay error; commits replayed before it stay in place.
    pub fn replay<H: ConflictHandler + ?Sized>(
        &self,
        commits: &[Commit],
        handler: &H,
        options: ReplayOptions,
    ) -> Result<ReplayOutcome> {
        MonorepoReplay::new(self.config, self.modules, handler, options)
            .replay(self.repo, commits)
            .context("replay failed")
    }
}
