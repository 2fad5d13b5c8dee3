//! GitHub API types.

use serde::{Deserialize, Serialize};

/// A GitHub Pull Request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// PR number.
    pub number: u64,

    /// PR title.
    pub title: String,

    /// PR body/description.
    pub body: Option<String>,

    /// PR state.
    pub state: PullRequestState,

    /// Head branch name.
    pub head_branch: String,

    /// Base branch name.
    pub base_branch: String,

    /// PR URL.
    pub html_url: String,
}

/// State of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// PR is open.
    Open,
    /// PR was closed without merging.
    Closed,
    /// PR was merged.
    Merged,
}

/// A repository as far as forking cares.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// Repository name without the owner.
    pub name: String,

    /// `owner/name`.
    pub full_name: String,

    /// Whether this repository is a fork.
    #[serde(default)]
    pub fork: bool,
}

/// A label attached to an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Request to create a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct CreatePullRequest {
    /// PR title.
    pub title: String,

    /// PR body.
    pub body: String,

    /// Head, as `login:branch` for cross-repository pull requests.
    pub head: String,

    /// Base branch.
    pub base: String,

    /// Let maintainers push to the head branch.
    pub maintainer_can_modify: bool,
}

/// Request to update a pull request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePullRequest {
    /// New title (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// New body (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl From<&CreatePullRequest> for UpdatePullRequest {
    fn from(pr: &CreatePullRequest) -> Self {
        Self {
            title: Some(pr.title.clone()),
            body: Some(pr.body.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AddLabels<'a> {
    pub labels: &'a [String],
}
