//! Mock implementations for testing services.
//!
//! These mocks implement the traits from ferry-git and ferry-github
//! to enable unit testing of service logic without real repositories or
//! network access.

#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ferry_git::{
    CherryPick, CommitOutcome, CommitRequest, Error as GitError, GitOps, LogQuery, PickOutcome,
    Result as GitResult, SecretString,
};
use ferry_github::{
    CreatePullRequest, Error as GitHubError, GitHubApi, Label, PullRequest, PullRequestState, Repository,
    Result as GitHubResult, UpdatePullRequest,
};
use secrecy::ExposeSecret;

/// Mock implementation of `GitOps` for testing.
pub struct MockGitOps {
    pub workdir: Option<PathBuf>,
    pub landed: RefCell<HashSet<String>>,
    pub pushes: RefCell<Vec<(String, String)>>,
    pub push_should_fail: bool,
}

impl Default for MockGitOps {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitOps {
    pub fn new() -> Self {
        Self {
            workdir: None,
            landed: RefCell::new(HashSet::new()),
            pushes: RefCell::new(Vec::new()),
            push_should_fail: false,
        }
    }

    pub fn with_workdir(mut self, dir: &Path) -> Self {
        self.workdir = Some(dir.to_path_buf());
        self
    }

    /// Make `hash` look already synchronized.
    pub fn with_landed(self, hash: &str) -> Self {
        self.landed.borrow_mut().insert(hash.to_string());
        self
    }

    pub const fn with_push_failure(mut self) -> Self {
        self.push_should_fail = true;
        self
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.borrow().clone()
    }
}

impl GitOps for MockGitOps {
    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn current_branch(&self) -> GitResult<String> {
        Ok("main".to_string())
    }

    fn is_cherry_picking(&self) -> bool {
        false
    }

    fn rev_parse(&self, rev: &str) -> GitResult<String> {
        Ok(rev.to_string())
    }

    fn merge_base(&self, one: &str, _two: &str) -> GitResult<String> {
        Ok(one.to_string())
    }

    fn is_ancestor(&self, _ancestor: &str, _descendant: &str) -> GitResult<bool> {
        Ok(true)
    }

    fn show(&self, rev: &str, _format: &str) -> GitResult<String> {
        Err(GitError::UnknownRevision(rev.to_string()))
    }

    fn log(&self, query: &LogQuery) -> GitResult<String> {
        let args = query.args().join(" ");
        let landed = self.landed.borrow().iter().any(|hash| args.contains(hash.as_str()));
        Ok(if landed { "landed\n".to_string() } else { String::new() })
    }

    fn conflicted_files(&self) -> GitResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn deleted_by_them(&self) -> GitResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn file_at(&self, _rev: &str, _path: &str) -> GitResult<Option<String>> {
        Ok(None)
    }

    fn config_get(&self, _key: &str) -> GitResult<Option<String>> {
        Ok(None)
    }

    fn fetch(&self, _remote: &str, _refspecs: &[&str], _tags: bool) -> GitResult<()> {
        Ok(())
    }

    fn push(&self, url: &SecretString, refspec: &str) -> GitResult<()> {
        if self.push_should_fail {
            return Err(GitError::CommandFailed {
                command: "git push".into(),
                output: "rejected".into(),
            });
        }
        self.pushes
            .borrow_mut()
            .push((url.expose_secret().to_string(), refspec.to_string()));
        Ok(())
    }

    fn checkout(&self, _rev: &str) -> GitResult<()> {
        Ok(())
    }

    fn force_branch(&self, _name: &str, _target: &str) -> GitResult<()> {
        Ok(())
    }

    fn merge(&self, _branch: &str, _strategy: &str, _signoff: bool) -> GitResult<()> {
        Ok(())
    }

    fn cherry_pick(&self, _commit: &str, _options: &CherryPick) -> GitResult<PickOutcome> {
        Ok(PickOutcome::Applied)
    }

    fn cherry_pick_continue(&self) -> GitResult<()> {
        Ok(())
    }

    fn checkout_theirs(&self, _paths: &[String]) -> GitResult<()> {
        Ok(())
    }

    fn add(&self, _paths: &[&str], _force: bool) -> GitResult<()> {
        Ok(())
    }

    fn rm_cached(&self, _paths: &[&str]) -> GitResult<()> {
        Ok(())
    }

    fn rm(&self, _paths: &[&str]) -> GitResult<()> {
        Ok(())
    }

    fn commit(&self, _request: &CommitRequest) -> GitResult<CommitOutcome> {
        Ok(CommitOutcome::Created)
    }

    fn config_set(&self, _key: &str, _value: &str) -> GitResult<()> {
        Ok(())
    }
}

/// Mock implementation of `GitHubApi` for testing.
///
/// Interior state sits behind mutexes because the trait requires `Sync`.
pub struct MockGitHub {
    forks: Mutex<HashSet<String>>,
    open_pr: Option<u64>,
    pr_should_fail: bool,
    calls: Mutex<Vec<String>>,
}

impl Default for MockGitHub {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGitHub {
    pub fn new() -> Self {
        Self {
            forks: Mutex::new(HashSet::new()),
            open_pr: None,
            pr_should_fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fork(self, login: &str, repo: &str) -> Self {
        self.forks.lock().unwrap().insert(format!("{login}/{repo}"));
        self
    }

    pub const fn with_open_pr(mut self, number: u64) -> Self {
        self.open_pr = Some(number);
        self
    }

    /// Reject pull request creation with a validation error.
    pub const fn with_pr_failure(mut self) -> Self {
        self.pr_should_fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pull_request(owner: &str, repo: &str, number: u64, title: String) -> PullRequest {
        PullRequest {
            number,
            title,
            body: None,
            state: PullRequestState::Open,
            head_branch: "synchronize-upstream".into(),
            base_branch: "main".into(),
            html_url: format!("https://github.com/{owner}/{repo}/pull/{number}"),
        }
    }
}

impl GitHubApi for MockGitHub {
    async fn get_repository(&self, owner: &str, repo: &str) -> GitHubResult<Option<Repository>> {
        self.record(format!("get_repository {owner}/{repo}"));
        let full_name = format!("{owner}/{repo}");
        let exists = self.forks.lock().unwrap().contains(&full_name);
        Ok(exists.then(|| Repository {
            name: repo.to_string(),
            full_name,
            fork: true,
        }))
    }

    async fn create_fork(&self, org: &str, repo: &str) -> GitHubResult<Repository> {
        self.record(format!("create_fork {org}/{repo}"));
        Ok(Repository {
            name: repo.to_string(),
            full_name: format!("bot/{repo}"),
            fork: true,
        })
    }

    async fn find_pr(
        &self,
        owner: &str,
        repo: &str,
        head: &str,
        base: &str,
    ) -> GitHubResult<Option<PullRequest>> {
        self.record(format!("find_pr {owner}/{repo} {head} {base}"));
        Ok(self
            .open_pr
            .map(|number| Self::pull_request(owner, repo, number, "old".into())))
    }

    async fn create_pr(
        &self,
        owner: &str,
        repo: &str,
        pr: CreatePullRequest,
    ) -> GitHubResult<PullRequest> {
        self.record(format!("create_pr {owner}/{repo}"));
        if self.pr_should_fail {
            return Err(GitHubError::ApiError {
                status: 422,
                message: "Validation Failed".into(),
            });
        }
        Ok(Self::pull_request(owner, repo, 1, pr.title))
    }

    async fn update_pr(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        update: UpdatePullRequest,
    ) -> GitHubResult<PullRequest> {
        self.record(format!("update_pr {owner}/{repo} #{number}"));
        Ok(Self::pull_request(owner, repo, number, update.title.unwrap_or_default()))
    }

    async fn add_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> GitHubResult<Vec<Label>> {
        self.record(format!("add_labels {owner}/{repo} #{number} {}", labels.join(",")));
        Ok(labels
            .iter()
            .map(|name| Label { name: name.clone() })
            .collect())
    }
}
