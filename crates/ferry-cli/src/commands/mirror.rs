//! `ferry mirror` command - move mirrored repositories to their upstream
//! targets and carry downstream commits on top.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use ferry_core::detect::mirror::{self, MirrorDetection};
use ferry_core::{Config, GoModules, RepositoryRegistry, RepositorySet, SyncPlan, SynchronizationTarget, report};
use ferry_git::{CancelToken, Repository};

use super::{Publication, SyncArgs};
use crate::output;
use crate::prompt;
use crate::services::MirrorService;

#[derive(Debug, Clone, Args)]
pub struct MirrorArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Checkout of a mirrored repository, overriding the configured path.
    #[arg(long = "repo-dir", value_name = "NAME=PATH", value_parser = parse_repo_dir)]
    pub repo_dirs: Vec<(String, PathBuf)>,

    /// Replay even when a repository already contains its target.
    #[arg(long)]
    pub force_remerge: bool,

    /// Comma-separated hash prefixes of downstream commits to drop.
    #[arg(long, value_delimiter = ',')]
    pub drop_commits: Vec<String>,
}

fn parse_repo_dir(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got {value:?}")),
    }
}

impl MirrorArgs {
    /// Checkouts of the configured repositories.
    ///
    /// # Errors
    /// Returns error if `--repo-dir` names a repository that isn't configured.
    pub fn registry(&self, config: &Config) -> Result<RepositoryRegistry> {
        for (name, _) in &self.repo_dirs {
            if config.mirror.repository(name).is_none() {
                bail!("--repo-dir {name}: not a configured repository");
            }
        }
        let mut registry = RepositoryRegistry::new();
        for repository in config.mirror.repositories() {
            let path = self
                .repo_dirs
                .iter()
                .rev()
                .find(|(name, _)| *name == repository.name)
                .map_or_else(|| repository.dir(), |(_, path)| path.clone());
            registry.insert(repository.name.clone(), path);
        }
        Ok(registry)
    }

    /// Pull request base: the flag, else the downstream branch.
    #[must_use]
    pub fn base_branch(&self, config: &Config) -> String {
        self.sync
            .pr_base_branch
            .clone()
            .unwrap_or_else(|| config.downstream.branch.clone())
    }
}

/// Per-repository summary of targets and carries.
#[must_use]
pub fn summary(config: &Config, targets: &BTreeMap<String, SynchronizationTarget>) -> String {
    let upstream = format!("{}/", config.upstream.org);
    let downstream = format!("{}/{}", config.downstream.org, config.downstream.repo_prefix);
    let mut text = String::new();
    for (name, sync) in targets {
        let _ = writeln!(text, "{downstream}{name}: updating to:");
        text.push_str(&output::commit_table(std::slice::from_ref(&sync.target), &upstream));
        if !sync.additional.is_empty() {
            text.push_str(" + additional commits to cherry-pick on top:\n");
            text.push_str(&output::commit_table(&sync.additional, &downstream));
        }
    }
    text
}

/// Surface what detection decided about one repository.
fn report_detection(detection: &MirrorDetection) {
    let name = &detection.name;
    if !detection.is_pending() {
        output::detail(&format!("{name}: up to date"));
        return;
    }
    let classification = &detection.classification;
    for commit in &classification.dropped {
        output::detail(&format!("{name}: dropping {} {}", commit.short_hash(), commit.message));
    }
    for commit in &classification.superseded {
        output::detail(&format!(
            "{name}: {} {} already merged upstream",
            commit.short_hash(),
            commit.message
        ));
    }
    for commit in &classification.reverts {
        output::warn(&format!("{name}: carrying a revert: {} {}", commit.short_hash(), commit.message));
    }
}

/// Run the mirror command.
pub fn run(args: &MirrorArgs, config: &Config, cancel: CancelToken) -> Result<()> {
    let sync = &args.sync;
    sync.validate()?;
    let mode = sync.mode();
    tracing::info!(mode = %mode, "synchronizing mirrors");

    let registry = args.registry(config)?;
    let repos = RepositorySet::open_all(&registry, |path| {
        Ok(Repository::open_with_cancel(path, cancel.clone())?)
    })
    .context("cannot open mirrored repositories")?;
    let modules = GoModules::new(cancel);
    let service = MirrorService::new(&repos, &modules, config);

    let targets = match &sync.commits_input {
        Some(path) => service.load(path)?,
        None => {
            let options = sync.detect_options(args.force_remerge, args.drop_commits.clone());
            let detections = service.detect(&options)?;
            detections.values().for_each(report_detection);
            let SyncPlan::Mirror { targets } = mirror::plan(detections) else {
                bail!("mirror detection produced a monorepo plan");
            };
            targets
        }
    };

    if let Some(path) = &sync.commits_output {
        SyncPlan::Mirror {
            targets: targets.clone(),
        }
        .save(path)
        .with_context(|| format!("cannot write plan {}", path.display()))?;
        output::detail(&format!("wrote plan to {}", path.display()));
    }

    if targets.is_empty() {
        output::success("up to date");
        return Ok(());
    }

    if !mode.replays() {
        output::essential(summary(config, &targets).trim_end());
        return Ok(());
    }

    let handler = prompt::handler(sync.pause_on_cherry_pick_error);
    let run = service.replay(&targets, handler.as_ref(), sync.replay_options(), sync.identity())?;
    for outcome in &run.outcomes {
        if outcome.short_circuited {
            output::success(&format!("{}: bookkeeping refreshed", outcome.repository));
        } else {
            output::success(&format!("{}: carried {} commits", outcome.repository, outcome.replayed));
        }
    }
    if run.reconciled {
        output::success(&format!(
            "{}: pointed at downstream forks",
            config.mirror.primary.name
        ));
    }

    let assignees = sync.assignees();
    let labels = sync.labels(config);
    let mut publications = Vec::with_capacity(targets.len());
    for (name, target) in &targets {
        let repository = config.downstream_repo(name);
        let body = report::mirror_body(config, target, &assignees);
        if sync.print_pull_request_comment {
            super::print_pull_request_comment(&repository, &body, &labels);
        }
        publications.push(Publication {
            repository,
            git: repos.get(name)?,
            body,
        });
    }

    if mode.publishes() {
        super::publish(sync, config, args.base_branch(config), &publications)?;
    }
    Ok(())
}
