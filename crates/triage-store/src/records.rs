use serde::{Deserialize, Serialize};

/// Which kind of report a card was filed as. Drives the tracker label and
/// the derived issue-title prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Bug,
    Feature,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "feature",
        }
    }

    /// Human prefix used in derived issue titles.
    pub fn title_prefix(&self) -> &'static str {
        match self {
            Self::Bug => "Bug",
            Self::Feature => "Feature",
        }
    }

    /// Tracker-side label applied on issue creation.
    pub fn issue_label(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Feature => "enhancement",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "bug" => Some(Self::Bug),
            "feature" => Some(Self::Feature),
            _ => None,
        }
    }
}

/// Snapshot of the chat message that initiated a report. Created only once
/// an issue is actually confirmed, so abandoned cards leave no record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMessage {
    pub message_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub content: String,
    pub kind: ReportKind,
}

/// The tracker issue created for (or linked to) a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Monotonic: flips open→closed exactly once, never back.
    #[serde(default)]
    pub closed: bool,
}

/// One commit referenced against an issue. Deduplicated by SHA per issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCommit {
    pub sha: String,
    pub message_line: String,
    pub html_url: String,
    #[serde(default)]
    pub author: String,
}

/// The discussion thread spawned for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionThread {
    pub thread_id: String,
    pub name: String,
}

/// Full correlation record for one report card: the report snapshot, its
/// tracker issue, the optional discussion thread, and every commit seen so
/// far. A card has at most one of these, which is what enforces the
/// one-issue-per-report invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLink {
    pub report: ReportMessage,
    pub issue: TrackerIssue,
    #[serde(default)]
    pub thread: Option<DiscussionThread>,
    #[serde(default)]
    pub commits: Vec<TrackerCommit>,
}

impl ReportLink {
    pub fn has_commit(&self, sha: &str) -> bool {
        self.commits.iter().any(|commit| commit.sha == sha)
    }

    /// Key used by the issue index: `owner/repo#number`.
    pub fn issue_key(&self) -> String {
        issue_key(&self.issue.owner, &self.issue.repo, self.issue.number)
    }
}

pub(crate) fn issue_key(owner: &str, repo: &str, number: u64) -> String {
    format!("{owner}/{repo}#{number}")
}
