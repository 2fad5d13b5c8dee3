//! Publish service: push the synchronized branch and open or refresh its
//! pull request.

use anyhow::Result;
use ferry_git::{GitOps, SecretString};
use ferry_github::{CreatePullRequest, GitHubApi, ensure_fork, upsert_pull_request};
use secrecy::ExposeSecret;

/// Where and how a synchronization is published.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// Account owning the fork.
    pub login: String,
    /// Org owning the downstream repositories.
    pub org: String,
    pub title: String,
    pub base_branch: String,
    /// Branch pushed to the fork.
    pub remote_branch: String,
    /// Host used in push URLs.
    pub push_host: String,
    pub labels: Vec<String>,
    pub dry_run: bool,
}

/// What publishing one repository did.
#[derive(Debug, Clone)]
pub struct PublishResult {
    pub repository: String,
    pub fork: String,
    pub pr_number: u64,
    pub pr_url: String,
}

/// Service for publish operations with injected dependencies.
pub struct PublishService<'a, H: GitHubApi> {
    github: &'a H,
    settings: &'a PublishSettings,
    token: &'a SecretString,
}

#[allow(clippy::future_not_send)] // Git operations are sync; futures don't need to be Send
impl<'a, H: GitHubApi> PublishService<'a, H> {
    pub const fn new(github: &'a H, settings: &'a PublishSettings, token: &'a SecretString) -> Self {
        Self {
            github,
            settings,
            token,
        }
    }

    /// Authenticated HTTPS URL of `fork`.
    fn push_url(&self, fork: &str) -> SecretString {
        let PublishSettings {
            login, push_host, ..
        } = self.settings;
        SecretString::from(format!(
            "https://{login}:{}@{push_host}/{login}/{fork}.git",
            self.token.expose_secret()
        ))
    }

    /// Publish `HEAD` of `git` as the synchronization PR of downstream `repository`.
    ///
    /// # Errors
    /// Returns `PublishFailure` if the fork, push, PR or label step fails.
    pub async fn publish<G: GitOps>(&self, git: &G, repository: &str, body: String) -> Result<PublishResult> {
        let settings = self.settings;
        tracing::info!(repo = %repository, phase = "publish", "publishing synchronization");
        let failed = |reason: String| ferry_core::Error::PublishFailure {
            repo: repository.to_string(),
            reason,
        };

        let fork = ensure_fork(self.github, &settings.login, &settings.org, repository)
            .await
            .map_err(|e| failed(format!("could not ensure fork of {}/{repository}: {e}", settings.org)))?;

        let refspec = format!("HEAD:refs/heads/{}", settings.remote_branch);
        if settings.dry_run {
            tracing::info!(fork = %fork, refspec = %refspec, "[dry-run] would push");
        } else {
            git.push(&self.push_url(&fork), &refspec)
                .map_err(|e| failed(format!("failed to push changes: {e}")))?;
        }

        let request = CreatePullRequest {
            title: settings.title.clone(),
            body,
            head: format!("{}:{}", settings.login, settings.remote_branch),
            base: settings.base_branch.clone(),
            maintainer_can_modify: true,
        };
        let pr = upsert_pull_request(self.github, &settings.org, repository, request)
            .await
            .map_err(|e| failed(format!("PR creation failed: {e}")))?;

        self.github
            .add_labels(&settings.org, repository, pr.number, &settings.labels)
            .await
            .map_err(|e| failed(format!("failed to label pull request: {e}")))?;

        Ok(PublishResult {
            repository: repository.to_string(),
            fork,
            pr_number: pr.number,
            pr_url: pr.html_url,
        })
    }
}
