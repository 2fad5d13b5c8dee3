//! Mirror service: detect, load and replay targets across the mirrored
//! repositories, then point the primary at its dependents' forks.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use ferry_core::detect::mirror::{self, MirrorDetection};
use ferry_core::reconcile::reconcile;
use ferry_core::replay::mirror::MirrorReplay;
use ferry_core::replay::set_committer;
use ferry_core::{
    Config, ConflictHandler, DetectOptions, ModuleTool, ReplayOptions, ReplayOutcome,
    RepositorySet, SyncPlan, SynchronizationTarget,
};
use ferry_git::GitOps;

/// What a mirror replay did.
#[derive(Debug, Clone)]
pub struct MirrorRun {
    pub outcomes: Vec<ReplayOutcome>,
    /// Whether the primary's module replacements were rewritten.
    pub reconciled: bool,
}

/// Service for mirror synchronization with trait-based dependencies.
pub struct MirrorService<'a, G: GitOps, M: ModuleTool> {
    repos: &'a RepositorySet<G>,
    modules: &'a M,
    config: &'a Config,
}

impl<'a, G: GitOps, M: ModuleTool> MirrorService<'a, G, M> {
    #[must_use]
    pub const fn new(repos: &'a RepositorySet<G>, modules: &'a M, config: &'a Config) -> Self {
        Self {
            repos,
            modules,
            config,
        }
    }

    /// Detect every mirrored repository.
    ///
    /// # Errors
    /// Returns the first repository's detection error.
    pub fn detect(&self, options: &DetectOptions) -> Result<BTreeMap<String, MirrorDetection>> {
        Ok(mirror::detect(self.repos, self.modules, self.config, options)?)
    }

    /// Targets from a saved plan.
    ///
    /// # Errors
    /// Returns error if the file is unreadable or holds a monorepo plan.
    pub fn load(&self, path: &Path) -> Result<BTreeMap<String, SynchronizationTarget>> {
        let plan = SyncPlan::load(path).with_context(|| format!("cannot load plan {}", path.display()))?;
        let SyncPlan::Mirror { targets } = plan else {
            bail!("{} holds a monorepo plan, not a mirror plan", path.display());
        };
        for name in targets.keys() {
            if self.config.mirror.repository(name).is_none() {
                bail!("plan names {name}, which is not a configured repository");
            }
        }
        Ok(targets)
    }

    /// Replay `targets`, then reconcile the primary's module file.
    ///
    /// # Errors
    /// Returns the first setup, replay or reconcile error.
    pub fn replay<H: ConflictHandler + ?Sized>(
        &self,
        targets: &BTreeMap<String, SynchronizationTarget>,
        handler: &H,
        options: ReplayOptions,
        identity: Option<(&str, &str)>,
    ) -> Result<MirrorRun> {
        let replay = MirrorReplay::new(self.config, self.modules, handler, options);
        for name in targets.keys() {
            let repo = self.repos.get(name)?;
            set_committer(repo, identity)?;
            replay
                .setup(repo)
                .with_context(|| format!("tool setup failed in {name}"))?;
        }

        let outcomes = replay.replay_all(self.repos, targets).context("replay failed")?;
        let reconciled = reconcile(
            self.repos,
            self.modules,
            self.config,
            targets,
            options.fetch_mode,
            options.signoff,
        )
        .context("failed to point the primary at downstream forks")?;

        Ok(MirrorRun { outcomes, reconciled })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::test_mocks::MockGitOps;
    use chrono::DateTime;
    use ferry_core::{Commit, GoModules};
    use ferry_git::CancelToken;
    use tempfile::TempDir;

    fn target(name: &str) -> SynchronizationTarget {
        SynchronizationTarget {
            target: Commit {
                date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
                hash: "c".repeat(40),
                author: "Dev".into(),
                message: "Release".into(),
                repository: name.into(),
            },
            additional: Vec::new(),
        }
    }

    fn save(plan: &SyncPlan) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.json");
        plan.save(&path).unwrap();
        (temp, path)
    }

    #[test]
    fn test_load_returns_targets() {
        let mut targets = BTreeMap::new();
        targets.insert("catalogd".to_string(), target("catalogd"));
        let (_temp, path) = save(&SyncPlan::Mirror { targets: targets.clone() });

        let repos: RepositorySet<MockGitOps> = RepositorySet::new();
        let modules = GoModules::new(CancelToken::new());
        let config = Config::default();

        let loaded = MirrorService::new(&repos, &modules, &config).load(&path).unwrap();
        assert_eq!(loaded, targets);
    }

    #[test]
    fn test_load_rejects_unknown_repository() {
        let mut targets = BTreeMap::new();
        targets.insert("kubernetes".to_string(), target("kubernetes"));
        let (_temp, path) = save(&SyncPlan::Mirror { targets });

        let repos: RepositorySet<MockGitOps> = RepositorySet::new();
        let modules = GoModules::new(CancelToken::new());
        let config = Config::default();

        let err = MirrorService::new(&repos, &modules, &config).load(&path).unwrap_err();
        assert!(err.to_string().contains("kubernetes"));
    }

    #[test]
    fn test_load_rejects_monorepo_plan() {
        let (_temp, path) = save(&SyncPlan::Monorepo { commits: Vec::new() });

        let repos: RepositorySet<MockGitOps> = RepositorySet::new();
        let modules = GoModules::new(CancelToken::new());
        let config = Config::default();

        let err = MirrorService::new(&repos, &modules, &config).load(&path).unwrap_err();
        assert!(err.to_string().contains("monorepo plan"));
    }

    #[test]
    fn test_replay_of_nothing_does_nothing() {
        let mut repos = RepositorySet::new();
        repos.insert("operator-controller", MockGitOps::new());
        let modules = GoModules::new(CancelToken::new());
        let config = Config::default();

        let run = MirrorService::new(&repos, &modules, &config)
            .replay(&BTreeMap::new(), &ferry_core::AbortOnConflict, ReplayOptions::default(), None)
            .unwrap();
        assert!(run.outcomes.is_empty());
        assert!(!run.reconciled);
    }
}
