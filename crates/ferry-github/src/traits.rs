//! Trait abstractions for GitHub API operations.
//!
//! This module defines the `GitHubApi` trait which abstracts GitHub API operations,
//! enabling dependency injection and testability, plus the two workflows
//! publishing is built from.

use crate::{
    CreatePullRequest, Error, Label, PullRequest, Repository, Result, UpdatePullRequest,
};

/// Trait for GitHub API operations.
///
/// All methods take `owner` and `repo` as parameters to support
/// operations across different repositories.
pub trait GitHubApi: Send + Sync {
    // === Repository Operations ===

    /// Get a repository; `None` if it does not exist or is not visible.
    fn get_repository(
        &self,
        owner: &str,
        repo: &str,
    ) -> impl std::future::Future<Output = Result<Option<Repository>>> + Send;

    /// Fork `org/repo` into the authenticated account and wait until it is reachable.
    fn create_fork(
        &self,
        org: &str,
        repo: &str,
    ) -> impl std::future::Future<Output = Result<Repository>> + Send;

    // === PR Operations ===

    /// Find the open PR from `head` (`login:branch`) into `base`.
    fn find_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
    ) -> impl std::future::Future<Output = Result<Option<PullRequest>>> + Send;

    /// Create a pull request.
    fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> impl std::future::Future<Output = Result<PullRequest>> + Send;

    /// Update a pull request.
    fn update_pr(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: UpdatePullRequest,
    ) -> impl std::future::Future<Output = Result<PullRequest>> + Send;

    // === Label Operations ===

    /// Add labels to an issue or pull request.
    fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Label>>> + Send;
}

/// Name of `login`'s fork of `org/repo`, creating it when missing.
///
/// # Errors
/// Returns `NotAFork` if `login/repo` exists but is not a fork, or any API error.
pub async fn ensure_fork<A: GitHubApi + ?Sized>(
    api: &A,
    login: &str,
    org: &str,
    repo: &str,
) -> Result<String> {
    match api.get_repository(login, repo).await? {
        Some(existing) if existing.fork => {
            tracing::debug!(fork = %existing.full_name, "fork already exists");
            Ok(existing.name)
        }
        Some(existing) => Err(Error::NotAFork(existing.full_name)),
        None => {
            tracing::info!(upstream = %format!("{org}/{repo}"), login, "creating fork");
            Ok(api.create_fork(org, repo).await?.name)
        }
    }
}

/// Refresh the open PR from `pr.head` into `pr.base`, or open one.
///
/// # Errors
/// Returns any API error.
pub async fn upsert_pull_request<A: GitHubApi + ?Sized>(
    api: &A,
    owner: &str,
    repo: &str,
    pr: CreatePullRequest,
) -> Result<PullRequest> {
    if let Some(existing) = api.find_pr(owner, repo, &pr.head, &pr.base).await? {
        tracing::info!(number = existing.number, "updating existing pull request");
        return api
            .update_pr(owner, repo, existing.number, UpdatePullRequest::from(&pr))
            .await;
    }
    tracing::info!(head = %pr.head, base = %pr.base, "creating pull request");
    api.create_pr(owner, repo, pr).await
}
