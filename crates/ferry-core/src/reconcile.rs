//! Pointing the primary repository at downstream forks of its dependents.
//!
//! A replace directive may only name a fork commit that is already published.
//! Dependents replayed in the current run have no such commit yet, so only
//! dependents that were already up to date are rewritten; the rest catch up on
//! a later run.

use std::collections::BTreeMap;

use ferry_git::{CommitRequest, GitOps};

use crate::config::{Config, FetchMode};
use crate::error::{Error, Result};
use crate::modules::ModuleTool;
use crate::plan::SynchronizationTarget;
use crate::registry::RepositorySet;
use crate::replay::{commit_paths, workdir};

const REWRITE_MESSAGE: &str = "UPSTREAM: <drop>: rewrite go mod";

/// Published head of the downstream fork of `name`.
///
/// # Errors
/// Returns a git error if the fork cannot be fetched.
pub fn downstream_head<G: GitOps>(repo: &G, config: &Config, mode: FetchMode, name: &str) -> Result<String> {
    repo.fetch(&config.downstream_url(mode, name), &[], true)?;
    Ok(repo.rev_parse("FETCH_HEAD")?)
}

/// Module path and version of the downstream fork of `name` at `head`.
#[must_use]
pub fn fork_module(config: &Config, name: &str, head: &str) -> String {
    format!(
        "{}/{}/{}@{head}",
        config.github.push_host,
        config.downstream.org,
        config.downstream_repo(name)
    )
}

/// Replace each dependent in `heads` with its fork and commit the result in `primary`.
///
/// Returns whether a commit was written.
///
/// # Errors
/// Returns `UnknownRepository`, `DependencyRegenerationFailure` or git errors.
pub fn rewrite_module_replacements<G: GitOps, M: ModuleTool>(
    primary: &G,
    modules: &M,
    config: &Config,
    heads: &BTreeMap<String, String>,
    signoff: bool,
) -> Result<bool> {
    if heads.is_empty() {
        return Ok(false);
    }
    let root = workdir(primary)?;

    for (name, head) in heads {
        let dependent = config
            .mirror
            .repository(name)
            .ok_or_else(|| Error::UnknownRepository(name.clone()))?;
        let replacement = fork_module(config, name, head);
        tracing::info!(module = %dependent.module, replacement = %replacement, "replacing module with downstream fork");
        modules.replace(root, &dependent.module, &replacement)?;
    }
    modules.regenerate(root)?;

    commit_paths(
        primary,
        &["vendor", "go.mod", "go.sum"],
        true,
        &CommitRequest::new(REWRITE_MESSAGE).signoff(signoff),
    )
}

/// Rewrite the primary's module file after a replay of `targets`.
///
/// Nothing happens unless the primary itself was replayed.
///
/// # Errors
/// Returns the first fetch, module tool or git error.
pub fn reconcile<G: GitOps, M: ModuleTool>(
    repos: &RepositorySet<G>,
    modules: &M,
    config: &Config,
    targets: &BTreeMap<String, SynchronizationTarget>,
    mode: FetchMode,
    signoff: bool,
) -> Result<bool> {
    let primary_name = &config.mirror.primary.name;
    if !targets.contains_key(primary_name) {
        tracing::debug!(repo = %primary_name, "primary not replayed, leaving module replacements alone");
        return Ok(false);
    }

    let mut heads = BTreeMap::new();
    for dependent in &config.mirror.dependents {
        if targets.contains_key(&dependent.name) {
            tracing::info!(repo = %dependent.name, "replayed this run, fork head not published yet");
            continue;
        }
        let head = downstream_head(repos.get(&dependent.name)?, config, mode, &dependent.name)?;
        tracing::info!(repo = %dependent.name, commit = %head, "resolved downstream head");
        heads.insert(dependent.name.clone(), head);
    }

    let _span = tracing::info_span!("reconcile", repo = %primary_name).entered();
    rewrite_module_replacements(repos.get(primary_name)?, modules, config, &heads, signoff)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_mocks::{MockGit, MockModules, commit};
    use tempfile::TempDir;

    const FORK_HEAD: &str = "7777777777777777777777777777777777777777";

    fn targets(names: &[&str]) -> BTreeMap<String, SynchronizationTarget> {
        names
            .iter()
            .map(|name| {
                let target = SynchronizationTarget {
                    target: commit('a', name, "Release", "2024-01-01T00:00:00Z"),
                    additional: Vec::new(),
                };
                ((*name).to_string(), target)
            })
            .collect()
    }

    #[test]
    fn test_fork_module() {
        let config = Config::default();
        assert_eq!(
            fork_module(&config, "catalogd", "abc"),
            "github.com/openshift/operator-framework-catalogd@abc"
        );
    }

    #[test]
    fn test_up_to_date_dependent_is_replaced() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("go.mod"), "module x\n").unwrap();
        let mut repos = RepositorySet::new();
        repos.insert("operator-controller", MockGit::new().with_workdir(temp.path()));
        repos.insert(
            "catalogd",
            MockGit::new().with_fetch_head("git@github.com:openshift/operator-framework-catalogd.git", FORK_HEAD),
        );
        let modules = MockModules::new().rooted(temp.path());
        let config = Config::default();

        let committed = reconcile(
            &repos,
            &modules,
            &config,
            &targets(&["operator-controller"]),
            FetchMode::Ssh,
            false,
        )
        .unwrap();

        assert!(committed);
        assert_eq!(
            modules.calls(),
            vec![
                format!(
                    "replace github.com/operator-framework/catalogd=github.com/openshift/operator-framework-catalogd@{FORK_HEAD} in ."
                ),
                "tidy .".to_string(),
                "vendor .".to_string(),
                "verify .".to_string(),
            ]
        );
        assert_eq!(
            repos.get("operator-controller").unwrap().calls(),
            vec!["add --force go.mod", "commit --message UPSTREAM: <drop>: rewrite go mod"]
        );
    }

    #[test]
    fn test_dependent_replayed_this_run_is_gated() {
        let temp = TempDir::new().unwrap();
        let mut repos = RepositorySet::new();
        repos.insert("operator-controller", MockGit::new().with_workdir(temp.path()));
        repos.insert("catalogd", MockGit::new());
        let modules = MockModules::new().rooted(temp.path());
        let config = Config::default();

        let committed = reconcile(
            &repos,
            &modules,
            &config,
            &targets(&["operator-controller", "catalogd"]),
            FetchMode::Ssh,
            false,
        )
        .unwrap();

        assert!(!committed);
        assert!(modules.calls().is_empty());
        assert!(repos.get("catalogd").unwrap().calls().is_empty());
    }

    #[test]
    fn test_primary_not_replayed_is_left_alone() {
        let mut repos = RepositorySet::new();
        repos.insert("operator-controller", MockGit::new());
        repos.insert("catalogd", MockGit::new());
        let modules = MockModules::new();

        let committed = reconcile(
            &repos,
            &modules,
            &Config::default(),
            &targets(&["catalogd"]),
            FetchMode::Https,
            false,
        )
        .unwrap();
        assert!(!committed);
        assert!(repos.get("catalogd").unwrap().calls().is_empty());
    }
}
