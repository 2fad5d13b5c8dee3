//! Configuration management for Ferry.
//!
//! Everything here describes the repositories being synchronized and how to
//! reach them. Run-specific switches (mode, dry-run, identity) are CLI flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "ferry.toml";

/// Ferry configuration loaded from `ferry.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where upstream repositories live.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Where downstream repositories live.
    #[serde(default)]
    pub downstream: DownstreamConfig,

    /// Remote URL templates.
    #[serde(default)]
    pub remotes: RemotesConfig,

    /// Monorepo (staging directory) strategy settings.
    #[serde(default)]
    pub monorepo: MonorepoConfig,

    /// Direct-mirror strategy settings.
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// GitHub-specific settings.
    #[serde(default)]
    pub github: GitHubConfig,
}

impl Config {
    /// Load config from a TOML file, falling back to defaults if it is missing.
    ///
    /// # Errors
    /// Returns error if file can't be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to a TOML file.
    ///
    /// # Errors
    /// Returns error if serialization or write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::other(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// URL of the upstream repository `name`.
    #[must_use]
    pub fn upstream_url(&self, mode: FetchMode, name: &str) -> String {
        self.remotes.url(mode, &self.upstream.org, name)
    }

    /// Name of the downstream repository that mirrors upstream `name`.
    #[must_use]
    pub fn downstream_repo(&self, name: &str) -> String {
        format!("{}{name}", self.downstream.repo_prefix)
    }

    /// URL of the downstream repository mirroring upstream `name`.
    #[must_use]
    pub fn downstream_url(&self, mode: FetchMode, name: &str) -> String {
        self.remotes
            .url(mode, &self.downstream.org, &self.downstream_repo(name))
    }
}

/// Protocol used to reach remotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Ssh,
    Https,
}

/// Upstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Organization owning the upstream repositories.
    #[serde(default = "default_upstream_org")]
    pub org: String,

    /// Branch tracked in direct mirrors.
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            org: default_upstream_org(),
            branch: default_branch(),
        }
    }
}

/// Downstream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownstreamConfig {
    /// Organization owning the downstream repositories.
    #[serde(default = "default_downstream_org")]
    pub org: String,

    /// Prefix prepended to an upstream name to get its downstream repository.
    #[serde(default = "default_repo_prefix")]
    pub repo_prefix: String,

    /// Branch the synchronization is merged into.
    #[serde(default = "default_branch")]
    pub branch: String,
}

impl Default for DownstreamConfig {
    fn default() -> Self {
        Self {
            org: default_downstream_org(),
            repo_prefix: default_repo_prefix(),
            branch: default_branch(),
        }
    }
}

/// Remote URL templates with `{org}` and `{repo}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotesConfig {
    #[serde(default = "default_ssh_template")]
    pub ssh: String,

    #[serde(default = "default_https_template")]
    pub https: String,
}

impl RemotesConfig {
    /// Render the template for `mode`.
    #[must_use]
    pub fn url(&self, mode: FetchMode, org: &str, repo: &str) -> String {
        let template = match mode {
            FetchMode::Ssh => &self.ssh,
            FetchMode::Https => &self.https,
        };
        template.replace("{org}", org).replace("{repo}", repo)
    }
}

impl Default for RemotesConfig {
    fn default() -> Self {
        Self {
            ssh: default_ssh_template(),
            https: default_https_template(),
        }
    }
}

/// Settings for a downstream monorepo that vendors upstreams below a staging
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonorepoConfig {
    /// Downstream repository name.
    #[serde(default = "default_monorepo_repo")]
    pub repo: String,

    /// Directory holding one subtree per tracked upstream.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,

    /// Ref scanned for provenance trailers.
    #[serde(default = "default_central_ref")]
    pub central_ref: String,

    /// Number of marker commits considered when looking for the boundary.
    #[serde(default = "default_history")]
    pub history: usize,

    /// Upstream branch fetched for every component.
    #[serde(default = "default_monorepo_upstream_branch")]
    pub upstream_branch: String,

    /// Command regenerating manifests after dependencies change.
    #[serde(default = "default_monorepo_manifest_command")]
    pub manifest_command: Vec<String>,

    /// Paths, besides the component subtree, amended into each replayed commit.
    #[serde(default = "default_monorepo_commit_paths")]
    pub commit_paths: Vec<String>,
}

impl MonorepoConfig {
    /// Subtree of component `name`.
    #[must_use]
    pub fn subtree(&self, name: &str) -> String {
        format!("{}/{name}", self.staging_dir.trim_end_matches('/'))
    }
}

impl Default for MonorepoConfig {
    fn default() -> Self {
        Self {
            repo: default_monorepo_repo(),
            staging_dir: default_staging_dir(),
            central_ref: default_central_ref(),
            history: default_history(),
            upstream_branch: default_monorepo_upstream_branch(),
            manifest_command: default_monorepo_manifest_command(),
            commit_paths: default_monorepo_commit_paths(),
        }
    }
}

/// A repository tracked by the direct-mirror strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Upstream repository name.
    pub name: String,

    /// Module path of the repository.
    pub module: String,

    /// Local working directory; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Nested module directories that vendor their own dependencies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_module_dirs: Vec<String>,
}

impl RepositoryConfig {
    /// Local working directory.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from(&self.name))
    }
}

/// Settings for downstream repositories that mirror one upstream each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Repository whose module file pins the dependents.
    #[serde(default = "default_primary")]
    pub primary: RepositoryConfig,

    /// Repositories whose target is pinned by the primary.
    #[serde(default = "default_dependents")]
    pub dependents: Vec<RepositoryConfig>,

    /// Local branch built by the synchronization.
    #[serde(default = "default_sync_branch")]
    pub sync_branch: String,

    /// Downstream-only directory holding its own module and Makefile.
    #[serde(default = "default_tooling_dir")]
    pub tooling_dir: String,

    /// Command regenerating manifests.
    #[serde(default = "default_mirror_manifest_command")]
    pub manifest_command: Vec<String>,

    /// Output directory of the manifest command.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: String,

    /// Upstream-only paths removed after replay.
    #[serde(default = "default_strip_paths")]
    pub strip_paths: Vec<String>,

    /// Bookkeeping file written at the repository root.
    #[serde(default = "default_bookkeeping_file")]
    pub bookkeeping_file: String,

    /// Tool installation run in the tooling directory before replaying.
    #[serde(default = "default_setup_command")]
    pub setup_command: Vec<String>,

    /// Seconds to wait before each retry of the setup command.
    #[serde(default = "default_setup_backoff")]
    pub setup_backoff: Vec<u64>,
}

impl MirrorConfig {
    /// Primary followed by the dependents.
    pub fn repositories(&self) -> impl Iterator<Item = &RepositoryConfig> {
        std::iter::once(&self.primary).chain(&self.dependents)
    }

    /// Look up a repository by name.
    #[must_use]
    pub fn repository(&self, name: &str) -> Option<&RepositoryConfig> {
        self.repositories().find(|r| r.name == name)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            dependents: default_dependents(),
            sync_branch: default_sync_branch(),
            tooling_dir: default_tooling_dir(),
            manifest_command: default_mirror_manifest_command(),
            manifest_dir: default_manifest_dir(),
            strip_paths: default_strip_paths(),
            bookkeeping_file: default_bookkeeping_file(),
            setup_command: default_setup_command(),
            setup_backoff: default_setup_backoff(),
        }
    }
}

/// GitHub-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Custom API URL for GitHub Enterprise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Host used in push URLs.
    #[serde(default = "default_push_host")]
    pub push_host: String,

    /// Branch pushed to the bot's fork.
    #[serde(default = "default_remote_branch")]
    pub remote_branch: String,

    /// Pull request title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Labels always applied to the pull request.
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            push_host: default_push_host(),
            remote_branch: default_remote_branch(),
            title: default_title(),
            labels: default_labels(),
        }
    }
}

fn default_upstream_org() -> String {
    "operator-framework".into()
}

fn default_downstream_org() -> String {
    "openshift".into()
}

fn default_repo_prefix() -> String {
    "operator-framework-".into()
}

fn default_branch() -> String {
    "main".into()
}

fn default_ssh_template() -> String {
    "git@github.com:{org}/{repo}.git".into()
}

fn default_https_template() -> String {
    "https://github.com/{org}/{repo}.git".into()
}

fn default_monorepo_repo() -> String {
    "operator-framework-olm".into()
}

fn default_staging_dir() -> String {
    "staging".into()
}

fn default_central_ref() -> String {
    "origin/master".into()
}

const fn default_history() -> usize {
    1
}

fn default_monorepo_upstream_branch() -> String {
    "master".into()
}

fn default_monorepo_manifest_command() -> Vec<String> {
    vec!["make".into(), "generate-manifests".into()]
}

fn default_monorepo_commit_paths() -> Vec<String> {
    ["vendor", "go.mod", "go.sum", "manifests", "pkg/manifests"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_primary() -> RepositoryConfig {
    RepositoryConfig {
        name: "operator-controller".into(),
        module: "github.com/operator-framework/operator-controller".into(),
        path: None,
        extra_module_dirs: vec!["testdata/push".into(), "testdata/registry".into()],
    }
}

fn default_dependents() -> Vec<RepositoryConfig> {
    vec![RepositoryConfig {
        name: "catalogd".into(),
        module: "github.com/operator-framework/catalogd".into(),
        path: None,
        extra_module_dirs: Vec::new(),
    }]
}

fn default_sync_branch() -> String {
    "synchronize".into()
}

fn default_tooling_dir() -> String {
    "openshift".into()
}

fn default_mirror_manifest_command() -> Vec<String> {
    ["make", "-f", "openshift/Makefile", "manifests"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_manifest_dir() -> String {
    "openshift/manifests".into()
}

fn default_strip_paths() -> Vec<String> {
    vec![".github".into()]
}

fn default_bookkeeping_file() -> String {
    "commitchecker.yaml".into()
}

fn default_setup_command() -> Vec<String> {
    vec!["bingo".into(), "get".into()]
}

fn default_setup_backoff() -> Vec<u64> {
    vec![10, 30, 60, 120, 240]
}

fn default_push_host() -> String {
    "github.com".into()
}

fn default_remote_branch() -> String {
    "synchronize-upstream".into()
}

fn default_title() -> String {
    "NO-ISSUE: Synchronize From Upstream Repositories".into()
}

fn default_labels() -> Vec<String> {
    vec!["tide/merge-method-merge".into(), "kind/sync".into()]
}
