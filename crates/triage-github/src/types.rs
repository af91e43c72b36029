//! Wire types for the subset of the GitHub REST API the bridge touches.

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use serde_json::Value;

/// An `owner/name` repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: owner.trim().to_string(),
            name: name.trim().to_string(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| anyhow!("invalid repository '{raw}', expected owner/repo"))?;
        let owner = owner.trim();
        let name = name.trim();
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("invalid repository '{raw}', expected owner/repo");
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn as_slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubUser {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GithubIssueLabel {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<GithubIssueLabel>,
    #[serde(default)]
    pub user: Option<GithubUser>,
    #[serde(default)]
    pub closed_by: Option<GithubUser>,
    /// Present when the row in an issue listing is actually a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl GithubIssue {
    pub fn is_closed(&self) -> bool {
        self.state == "closed"
    }
}

/// One timeline entry from the issue events API. Only `referenced` events
/// with a commit id matter to reconciliation; everything else is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubIssueEvent {
    pub event: String,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub actor: Option<GithubUser>,
}

impl GithubIssueEvent {
    pub fn referenced_commit(&self) -> Option<&str> {
        if self.event != "referenced" {
            return None;
        }
        self.commit_id.as_deref().filter(|sha| !sha.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitInfo {
    pub message: String,
    #[serde(default)]
    pub author: Option<GithubCommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommitDetail {
    pub sha: String,
    pub html_url: String,
    pub commit: GithubCommitInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubCommentCreated {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_repo_ref_parse_accepts_owner_repo_shape() {
        let repo = RepoRef::parse("acme/backend").expect("parse repo");
        assert_eq!(repo.owner, "acme");
        assert_eq!(repo.name, "backend");
        assert_eq!(repo.as_slug(), "acme/backend");

        let error = RepoRef::parse("missing").expect_err("invalid repo should fail");
        assert!(error.to_string().contains("expected owner/repo"));
        assert!(RepoRef::parse("a/b/c").is_err());
        assert!(RepoRef::parse("/name").is_err());
    }

    #[test]
    fn unit_referenced_commit_requires_event_kind_and_sha() {
        let event = GithubIssueEvent {
            event: "referenced".to_string(),
            commit_id: Some("abcdef1234567890".to_string()),
            actor: None,
        };
        assert_eq!(event.referenced_commit(), Some("abcdef1234567890"));

        let labeled = GithubIssueEvent {
            event: "labeled".to_string(),
            commit_id: Some("abcdef1234567890".to_string()),
            actor: None,
        };
        assert_eq!(labeled.referenced_commit(), None);

        let missing_sha = GithubIssueEvent {
            event: "referenced".to_string(),
            commit_id: None,
            actor: None,
        };
        assert_eq!(missing_sha.referenced_commit(), None);
    }
}
