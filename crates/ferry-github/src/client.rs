//! GitHub API client.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::auth::Auth;
use crate::error::{Error, Result};
use crate::traits::GitHubApi;
use crate::types::{
    AddLabels, CreatePullRequest, Label, PullRequest, PullRequestState, Repository,
    UpdatePullRequest,
};

/// Internal representation of a PR from the GitHub API.
#[derive(serde::Deserialize)]
struct ApiPullRequest {
    number: u64,
    title: String,
    body: Option<String>,
    state: String,
    /// GitHub returns state="closed" + merged=true for merged PRs.
    #[serde(default)]
    merged: bool,
    html_url: String,
    head: ApiBranch,
    base: ApiBranch,
}

#[derive(serde::Deserialize)]
struct ApiBranch {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl ApiPullRequest {
    fn into_pull_request(self) -> PullRequest {
        let state = if self.merged {
            PullRequestState::Merged
        } else {
            match self.state.as_str() {
                "open" => PullRequestState::Open,
                _ => PullRequestState::Closed,
            }
        };

        PullRequest {
            number: self.number,
            title: self.title,
            body: self.body,
            state,
            head_branch: self.head.ref_name,
            base_branch: self.base.ref_name,
            html_url: self.html_url,
        }
    }
}

/// GitHub API client.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    /// Token stored as `SecretString` for automatic zeroization on drop.
    token: SecretString,
    fork_attempts: u32,
    fork_interval: Duration,
}

impl GitHubClient {
    /// Default GitHub API URL.
    pub const DEFAULT_API_URL: &'static str = "https://api.github.com";

    /// Create a new GitHub client.
    ///
    /// # Errors
    /// Returns error if authentication fails.
    pub fn new(auth: &Auth) -> Result<Self> {
        Self::with_base_url(auth, Self::DEFAULT_API_URL)
    }

    /// Create a new GitHub client with a custom API URL (for GitHub Enterprise).
    ///
    /// # Errors
    /// Returns error if authentication fails.
    pub fn with_base_url(auth: &Auth, base_url: impl Into<String>) -> Result<Self> {
        let token = auth.resolve()?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ferry"));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            fork_attempts: 10,
            fork_interval: Duration::from_secs(2),
        })
    }

    /// How long [`GitHubClient::create_fork`] polls for a new fork.
    #[must_use]
    pub fn with_fork_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.fork_attempts = attempts;
        self.fork_interval = interval;
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.token.expose_secret()),
            )
    }

    /// Make a GET request.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        self.handle_response(response).await
    }

    /// Make a GET request where 404 means absent.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let response = self.request(reqwest::Method::GET, path).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    /// Make a request with a JSON body.
    async fn send_json<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.request(method, path).json(body).send().await?;
        self.handle_response(response).await
    }

    /// Handle API response.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.json().await?;
            return Ok(body);
        }

        let status_code = status.as_u16();

        match status_code {
            401 => Err(Error::AuthenticationFailed),
            403 if response
                .headers()
                .get("x-ratelimit-remaining")
                .is_some_and(|v| v == "0") =>
            {
                Err(Error::RateLimited)
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(Error::ApiError {
                    status: status_code,
                    message: text,
                })
            }
        }
    }

    // === Repository Operations ===

    /// Get a repository, `None` on 404.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<Repository>> {
        self.get_optional(&format!("/repos/{owner}/{repo}")).await
    }

    /// Fork `org/repo` and poll until the fork answers.
    ///
    /// GitHub creates forks asynchronously; the POST returns before the
    /// repository can be pushed to.
    ///
    /// # Errors
    /// Returns `RepoNotFound` if the upstream is missing, `ForkNotReady` if
    /// polling gives up, or any other API error.
    pub async fn create_fork(&self, org: &str, repo: &str) -> Result<Repository> {
        let fork: Repository = self
            .send_json(
                reqwest::Method::POST,
                &format!("/repos/{org}/{repo}/forks"),
                &serde_json::json!({}),
            )
            .await
            .map_err(|err| match err {
                Error::ApiError { status: 404, .. } => Error::RepoNotFound(format!("{org}/{repo}")),
                other => other,
            })?;

        for attempt in 0..self.fork_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.fork_interval).await;
            }
            let ready: Option<Repository> = self
                .get_optional(&format!("/repos/{}", fork.full_name))
                .await?;
            if ready.is_some() {
                return Ok(fork);
            }
            tracing::debug!(fork = %fork.full_name, attempt, "fork not reachable yet");
        }
        Err(Error::ForkNotReady(fork.full_name))
    }

    // === PR Operations ===

    /// Find the open PR from `head` into `base`.
    ///
    /// # Errors
    /// Returns error if API call fails.
    pub async fn find_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Option<PullRequest>> {
        let prs: Vec<ApiPullRequest> = self
            .get(&format!(
                "/repos/{owner}/{repo}/pulls?head={head}&base={base}&state=open"
            ))
            .await?;

        Ok(prs
            .into_iter()
            .next()
            .map(ApiPullRequest::into_pull_request))
    }

    /// Create a pull request.
    ///
    /// # Errors
    /// Returns error if PR creation fails.
    pub async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> Result<PullRequest> {
        let api_pr: ApiPullRequest = self
            .send_json(
                reqwest::Method::POST,
                &format!("/repos/{owner}/{repo}/pulls"),
                &pr,
            )
            .await?;

        Ok(api_pr.into_pull_request())
    }

    /// Update a pull request.
    ///
    /// # Errors
    /// Returns error if PR update fails.
    pub async fn update_pr(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: UpdatePullRequest,
    ) -> Result<PullRequest> {
        let api_pr: ApiPullRequest = self
            .send_json(
                reqwest::Method::PATCH,
                &format!("/repos/{owner}/{repo}/pulls/{number}"),
                &update,
            )
            .await?;

        Ok(api_pr.into_pull_request())
    }

    // === Label Operations ===

    /// Add labels to an issue or pull request.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<Vec<Label>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        self.send_json(
            reqwest::Method::POST,
            &format!("/repos/{owner}/{repo}/issues/{number}/labels"),
            &AddLabels { labels },
        )
        .await
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

// === Trait Implementation ===

impl GitHubApi for GitHubClient {
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Option<Repository>> {
        self.get_repository(owner, repo).await
    }

    async fn create_fork(&self, org: &str, repo: &str) -> Result<Repository> {
        self.create_fork(org, repo).await
    }

    async fn find_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
    ) -> Result<Option<PullRequest>> {
        self.find_pr(owner, repo, head, base).await
    }

    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> Result<PullRequest> {
        self.create_pr(owner, repo, pr).await
    }

    async fn update_pr(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: UpdatePullRequest,
    ) -> Result<PullRequest> {
        self.update_pr(owner, repo, number, update).await
    }

    async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<Vec<Label>> {
        self.add_labels(owner, repo, number, labels).await
    }
}
