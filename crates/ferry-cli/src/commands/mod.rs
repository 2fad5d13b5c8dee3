//! Command-line surface.

pub mod completions;
pub mod mirror;
pub mod monorepo;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use ferry_core::{Config, DetectOptions, FetchMode, Mode, ReplayOptions};
use ferry_git::{GitOps, SecretString};
use ferry_github::{Auth, DryRun, GitHubApi, GitHubClient};

use crate::logging::{LogFormat, LogLevel};
use crate::output;
use crate::services::{PublishResult, PublishService, PublishSettings};

/// Bot account pushing synchronization branches.
pub const DEFAULT_GITHUB_LOGIN: &str = "openshift-bot";

/// Teams asked to look at synchronization pull requests.
pub const DEFAULT_ASSIGNEES: &str =
    "openshift/openshift-team-operator-runtime,openshift/openshift-team-operator-ecosystem";

const SELF_APPROVE_LABELS: [&str; 2] = ["approved", "lgtm"];

/// Ferry - keep downstream forks synchronized with their upstreams.
#[derive(Parser)]
#[command(name = "ferry", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file [default: ferry.toml when present]
    #[arg(long, global = true, env = "FERRY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level; `RUST_LOG` takes precedence when set.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub log_level: LogLevel,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t)]
    pub log_format: LogFormat,

    /// Suppress informational output.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay upstream commits into the staging directory of a monorepo.
    Monorepo(monorepo::MonorepoArgs),

    /// Move mirrored repositories to their upstream targets and carry
    /// downstream commits on top.
    Mirror(mirror::MirrorArgs),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// `--mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    #[default]
    Summarize,
    Synchronize,
    Publish,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Summarize => Self::Summarize,
            ModeArg::Synchronize => Self::Synchronize,
            ModeArg::Publish => Self::Publish,
        }
    }
}

/// `--fetch-mode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FetchModeArg {
    #[default]
    Ssh,
    Https,
}

impl From<FetchModeArg> for FetchMode {
    fn from(mode: FetchModeArg) -> Self {
        match mode {
            FetchModeArg::Ssh => Self::Ssh,
            FetchModeArg::Https => Self::Https,
        }
    }
}

/// Options shared by both strategies.
#[derive(Debug, Clone, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncArgs {
    /// What to do with the detected work.
    #[arg(long, value_enum, default_value_t)]
    pub mode: ModeArg,

    /// Protocol used to reach git remotes.
    #[arg(long, value_enum, default_value_t)]
    pub fetch_mode: FetchModeArg,

    /// Read the plan from this file instead of detecting.
    #[arg(long, value_name = "FILE")]
    pub commits_input: Option<PathBuf>,

    /// Write the detected plan to this file.
    #[arg(long, value_name = "FILE")]
    pub commits_output: Option<PathBuf>,

    /// Log GitHub mutations and the push instead of performing them.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub dry_run: bool,

    /// GitHub account owning the fork that is pushed to.
    #[arg(long, default_value = DEFAULT_GITHUB_LOGIN)]
    pub github_login: String,

    /// File holding the GitHub token; falls back to `GITHUB_TOKEN`, then `gh`.
    #[arg(long, env = "GITHUB_TOKEN_PATH", value_name = "FILE")]
    pub github_token_path: Option<PathBuf>,

    /// Committer name. Requires --git-email.
    #[arg(long)]
    pub git_name: Option<String>,

    /// Committer email. Requires --git-name.
    #[arg(long)]
    pub git_email: Option<String>,

    /// Add `Signed-off-by` to created commits.
    #[arg(long)]
    pub git_signoff: bool,

    /// Comma-separated users or teams to cc on the pull request.
    #[arg(long, default_value = DEFAULT_ASSIGNEES)]
    pub assign: String,

    /// Also add the `approved` and `lgtm` labels.
    #[arg(long)]
    pub self_approve: bool,

    /// Base branch of the pull request.
    #[arg(long)]
    pub pr_base_branch: Option<String>,

    /// Generate manifests once after all commits.
    #[arg(long)]
    pub delay_manifest_generation: bool,

    /// Regenerate dependencies once after all commits.
    #[arg(long)]
    pub delay_go_mod: bool,

    /// In synchronize mode, print the pull request body and label commands.
    #[arg(long)]
    pub print_pull_request_comment: bool,

    /// Wait for an operator when a cherry-pick conflict can't be resolved.
    #[arg(long)]
    pub pause_on_cherry_pick_error: bool,
}

impl SyncArgs {
    /// Reject option combinations that can't work.
    ///
    /// # Errors
    /// Returns a message naming the offending option.
    pub fn validate(&self) -> Result<()> {
        if self.git_name.is_some() != self.git_email.is_some() {
            bail!("--git-name and --git-email must be specified together");
        }
        if self.mode() == Mode::Publish {
            if self.github_login.trim().is_empty() {
                bail!("--github-login is mandatory");
            }
            if self.assignees().is_empty() {
                bail!("--assign is mandatory");
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode.into()
    }

    #[must_use]
    pub fn fetch_mode(&self) -> FetchMode {
        self.fetch_mode.into()
    }

    /// Committer identity, when both halves were given.
    #[must_use]
    pub fn identity(&self) -> Option<(&str, &str)> {
        self.git_name.as_deref().zip(self.git_email.as_deref())
    }

    #[must_use]
    pub fn assignees(&self) -> Vec<String> {
        self.assign
            .split(',')
            .map(str::trim)
            .filter(|who| !who.is_empty())
            .map(String::from)
            .collect()
    }

    #[must_use]
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            signoff: self.git_signoff,
            delay_manifest_generation: self.delay_manifest_generation,
            delay_dependency_regeneration: self.delay_go_mod,
            fetch_mode: self.fetch_mode(),
        }
    }

    #[must_use]
    pub fn detect_options(&self, force_remerge: bool, drop_list: Vec<String>) -> DetectOptions {
        DetectOptions {
            fetch_mode: self.fetch_mode(),
            force_remerge,
            drop_list,
        }
    }

    /// Labels for the pull request: the configured ones, plus approval when
    /// self-approving.
    #[must_use]
    pub fn labels(&self, config: &Config) -> Vec<String> {
        let mut labels = config.github.labels.clone();
        if self.self_approve {
            tracing::info!(labels = ?SELF_APPROVE_LABELS, "self-approving pull request");
            labels.extend(SELF_APPROVE_LABELS.iter().map(|l| (*l).to_string()));
        }
        labels
    }
}

/// Print the pull request body and `/label` lines for pasting by hand.
pub fn print_pull_request_comment(repository: &str, body: &str, labels: &[String]) {
    output::essential(&output::banner(&format!("For repo {repository}")));
    output::essential(body);
    for label in labels {
        output::essential(&format!("/label {label}"));
    }
}

/// A synchronized checkout waiting to be published.
pub struct Publication<'a, G> {
    /// Downstream repository name.
    pub repository: String,
    pub git: &'a G,
    pub body: String,
}

/// Push every publication and open or refresh its pull request.
///
/// # Errors
/// Returns error if no token is available or any publication fails.
pub fn publish<G: GitOps>(
    args: &SyncArgs,
    config: &Config,
    base_branch: String,
    publications: &[Publication<'_, G>],
) -> Result<()> {
    let auth = Auth::auto(args.github_token_path.clone());
    let token = auth.resolve().context("a GitHub token is required to publish")?;
    let api_url = config
        .github
        .api_url
        .clone()
        .unwrap_or_else(|| GitHubClient::DEFAULT_API_URL.to_string());
    let client = GitHubClient::with_base_url(&auth, api_url)?;

    let settings = PublishSettings {
        login: args.github_login.clone(),
        org: config.downstream.org.clone(),
        title: config.github.title.clone(),
        base_branch,
        remote_branch: config.github.remote_branch.clone(),
        push_host: config.github.push_host.clone(),
        labels: args.labels(config),
        dry_run: args.dry_run,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let results = if args.dry_run {
        output::info("dry run: GitHub will not be modified");
        rt.block_on(publish_with(&DryRun::new(client), &settings, &token, publications))?
    } else {
        rt.block_on(publish_with(&client, &settings, &token, publications))?
    };

    for result in results {
        output::success(&format!(
            "{}: pull request #{} {}",
            result.repository, result.pr_number, result.pr_url
        ));
    }
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn publish_with<H: GitHubApi, G: GitOps>(
    github: &H,
    settings: &PublishSettings,
    token: &SecretString,
    publications: &[Publication<'_, G>],
) -> Result<Vec<PublishResult>> {
    let service = PublishService::new(github, settings, token);
    let mut results = Vec::with_capacity(publications.len());
    for publication in publications {
        let result = service
            .publish(publication.git, &publication.repository, publication.body.clone())
            .await?;
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ferry").chain(args.iter().copied())).unwrap()
    }

    fn sync_args(cli: Cli) -> SyncArgs {
        match cli.command {
            Commands::Monorepo(args) => args.sync,
            Commands::Mirror(args) => args.sync,
            Commands::Completions { .. } => panic!("no sync args"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = sync_args(parse(&["monorepo"]));
        assert_eq!(args.mode(), Mode::Summarize);
        assert_eq!(args.fetch_mode(), FetchMode::Ssh);
        assert!(args.dry_run);
        assert_eq!(args.github_login, "openshift-bot");
        assert_eq!(args.assignees().len(), 2);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_dry_run_can_be_disabled() {
        let args = sync_args(parse(&["mirror", "--dry-run=false"]));
        assert!(!args.dry_run);
    }

    #[test]
    fn test_invalid_mode_is_rejected() {
        assert!(Cli::try_parse_from(["ferry", "monorepo", "--mode", "yolo"]).is_err());
        assert!(Cli::try_parse_from(["ferry", "monorepo", "--fetch-mode", "ftp"]).is_err());
    }

    #[test]
    fn test_git_identity_must_be_complete() {
        let args = sync_args(parse(&["monorepo", "--git-name", "Bot"]));
        let err = args.validate().unwrap_err();
        assert!(err.to_string().contains("--git-name and --git-email"));

        let args = sync_args(parse(&["monorepo", "--git-name", "Bot", "--git-email", "bot@example.com"]));
        assert_eq!(args.identity(), Some(("Bot", "bot@example.com")));
    }

    #[test]
    fn test_publish_requires_login_and_assignees() {
        let args = sync_args(parse(&["mirror", "--mode", "publish", "--github-login", ""]));
        assert!(args.validate().unwrap_err().to_string().contains("--github-login"));

        let args = sync_args(parse(&["mirror", "--mode", "publish", "--assign", " , "]));
        assert!(args.validate().unwrap_err().to_string().contains("--assign"));

        // Summarize doesn't care.
        let args = sync_args(parse(&["mirror", "--assign", ""]));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_self_approve_labels() {
        let config = Config::default();
        let args = sync_args(parse(&["mirror", "--self-approve"]));
        assert_eq!(
            args.labels(&config),
            vec!["tide/merge-method-merge", "kind/sync", "approved", "lgtm"]
        );
        let args = sync_args(parse(&["mirror"]));
        assert_eq!(args.labels(&config).len(), 2);
    }

    #[test]
    fn test_replay_options() {
        let args = sync_args(parse(&[
            "monorepo",
            "--git-signoff",
            "--delay-go-mod",
            "--fetch-mode",
            "https",
        ]));
        let options = args.replay_options();
        assert!(options.signoff);
        assert!(options.delay_dependency_regeneration);
        assert!(!options.delay_manifest_generation);
        assert_eq!(options.fetch_mode, FetchMode::Https);
    }
}
