//! A [`GitHubApi`] that reads for real and only logs writes.

use crate::traits::GitHubApi;
use crate::types::{
    CreatePullRequest, Label, PullRequest, PullRequestState, Repository, UpdatePullRequest,
};
use crate::Result;

/// Wraps an API so that nothing on GitHub changes.
///
/// Lookups go through to `inner`; mutations are logged at info and answered
/// with what GitHub would most plausibly have returned.
#[derive(Debug)]
pub struct DryRun<A> {
    inner: A,
}

impl<A> DryRun<A> {
    #[must_use]
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: GitHubApi> GitHubApi for DryRun<A> {
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<Repository>> {
        self.inner.get_repository(owner, repo).await
    }

    async fn create_fork(&self, org: &str, repo: &str) -> Result<Repository> {
        tracing::info!(upstream = %format!("{org}/{repo}"), "[dry-run] would create fork");
        Ok(Repository {
            name: repo.to_string(),
            full_name: format!("{org}/{repo}"),
            fork: true,
        })
    }

    async fn find_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Option<PullRequest>> {
        self.inner.find_pr(owner, repo, head, base).await
    }

    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> Result<PullRequest> {
        tracing::info!(
            repo = %format!("{owner}/{repo}"),
            head = %pr.head,
            base = %pr.base,
            title = %pr.title,
            "[dry-run] would create pull request"
        );
        Ok(PullRequest {
            number: 0,
            title: pr.title,
            body: Some(pr.body),
            state: PullRequestState::Open,
            head_branch: pr.head,
            base_branch: pr.base,
            html_url: String::new(),
        })
    }

    async fn update_pr(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: UpdatePullRequest,
    ) -> Result<PullRequest> {
        tracing::info!(repo = %format!("{owner}/{repo}"), number, "[dry-run] would update pull request");
        Ok(PullRequest {
            number,
            title: update.title.unwrap_or_default(),
            body: update.body,
            state: PullRequestState::Open,
            head_branch: String::new(),
            base_branch: String::new(),
            html_url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
        })
    }

    async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<Vec<Label>> {
        tracing::info!(repo = %format!("{owner}/{repo}"), number, labels = ?labels, "[dry-run] would add labels");
        Ok(labels
            .iter()
            .map(|name| Label { name: name.clone() })
            .collect())
    }
}
