//! `ferry monorepo` command - replay upstream commits below the staging
//! directory of a monorepo.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use ferry_core::replay::set_committer;
use ferry_core::{Commit, Config, GoModules, SyncPlan, report};
use ferry_git::{CancelToken, Repository};

use super::{Publication, SyncArgs};
use crate::output;
use crate::prompt;
use crate::services::MonorepoService;

#[derive(Debug, Clone, Args)]
pub struct MonorepoArgs {
    #[command(flatten)]
    pub sync: SyncArgs,

    /// Monorepo checkout.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Directory holding one subtree per upstream component.
    #[arg(long)]
    pub staging_dir: Option<String>,

    /// Ref scanned for provenance trailers.
    #[arg(long)]
    pub central_ref: Option<String>,

    /// Number of marker commits considered per component.
    #[arg(long)]
    pub history: Option<usize>,

    /// Downstream monorepo name.
    #[arg(long)]
    pub repo: Option<String>,
}

impl MonorepoArgs {
    /// Fold command-line overrides into `config`.
    pub fn apply(&self, config: &mut Config) {
        let monorepo = &mut config.monorepo;
        if let Some(dir) = &self.staging_dir {
            monorepo.staging_dir.clone_from(dir);
        }
        if let Some(reference) = &self.central_ref {
            monorepo.central_ref.clone_from(reference);
        }
        if let Some(history) = self.history {
            monorepo.history = history;
        }
        if let Some(repo) = &self.repo {
            monorepo.repo.clone_from(repo);
        }
    }

    /// Pull request base: the flag, else the branch part of the central ref.
    #[must_use]
    pub fn base_branch(&self, config: &Config) -> String {
        self.sync.pr_base_branch.clone().unwrap_or_else(|| {
            let central = &config.monorepo.central_ref;
            central.rsplit('/').next().unwrap_or(central).to_string()
        })
    }
}

/// Summary of the commits to replay, oldest first.
#[must_use]
pub fn summary(config: &Config, commits: &[Commit]) -> String {
    output::commit_table(commits, &format!("{}/", config.upstream.org))
}

/// Run the monorepo command.
pub fn run(args: &MonorepoArgs, mut config: Config, cancel: CancelToken) -> Result<()> {
    let sync = &args.sync;
    sync.validate()?;
    args.apply(&mut config);
    let mode = sync.mode();
    tracing::info!(mode = %mode, dir = %args.dir.display(), "synchronizing monorepo");

    let repo = Repository::open_with_cancel(&args.dir, cancel.clone())
        .with_context(|| format!("{} is not a git repository", args.dir.display()))?;
    let modules = GoModules::new(cancel);
    let service = MonorepoService::new(&repo, &modules, &config);

    let commits = match &sync.commits_input {
        Some(path) => service.load(path)?,
        None => service.detect(&sync.detect_options(false, Vec::new()))?,
    };

    if let Some(path) = &sync.commits_output {
        SyncPlan::Monorepo {
            commits: commits.clone(),
        }
        .save(path)
        .with_context(|| format!("cannot write plan {}", path.display()))?;
        output::detail(&format!("wrote plan to {}", path.display()));
    }

    if commits.is_empty() {
        output::success("up to date");
        return Ok(());
    }

    if !mode.replays() {
        output::info(&format!("{} upstream commits to replay:", commits.len()));
        output::essential(summary(&config, &commits).trim_end());
        return Ok(());
    }

    set_committer(&repo, sync.identity())?;
    let handler = prompt::handler(sync.pause_on_cherry_pick_error);
    let outcome = service.replay(&commits, handler.as_ref(), sync.replay_options())?;
    output::success(&format!(
        "replayed {} commits into {}",
        outcome.replayed, outcome.repository
    ));

    let body = report::monorepo_body(&config, &commits, &sync.assignees());
    if sync.print_pull_request_comment {
        super::print_pull_request_comment(&config.monorepo.repo, &body, &sync.labels(&config));
    }

    if mode.publishes() {
        let publication = Publication {
            repository: config.monorepo.repo.clone(),
            git: &repo,
            body,
        };
        super::publish(sync, &config, args.base_branch(&config), &[publication])?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use chrono::DateTime;
    use clap::Parser;

    fn parse(args: &[&str]) -> MonorepoArgs {
        let cli = Cli::try_parse_from(["ferry", "monorepo"].into_iter().chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Monorepo(args) => args,
            _ => panic!("expected monorepo"),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = parse(&["--staging-dir", "vendored", "--central-ref", "origin/main", "--history", "5"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.monorepo.staging_dir, "vendored");
        assert_eq!(config.monorepo.central_ref, "origin/main");
        assert_eq!(config.monorepo.history, 5);
        assert_eq!(config.monorepo.repo, "operator-framework-olm");
    }

    #[test]
    fn test_base_branch_follows_central_ref() {
        let config = Config::default();
        assert_eq!(parse(&[]).base_branch(&config), "master");
        assert_eq!(parse(&["--pr-base-branch", "release-4.18"]).base_branch(&config), "release-4.18");
    }

    #[test]
    fn test_summary_prefixes_upstream_org() {
        let commits = vec![Commit {
            date: DateTime::parse_from_rfc3339("2024-03-01T12:30:00Z").unwrap(),
            hash: "a".repeat(40),
            author: "Dev".into(),
            message: "Add field".into(),
            repository: "api".into(),
        }];
        let text = summary(&Config::default(), &commits);
        assert!(text.starts_with("2024-03-01 12:30:00  operator-framework/api  "));
        assert!(text.ends_with("Add field\n"));
    }
}
