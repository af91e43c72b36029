//! Tracker client crate: the GitHub REST v3 operations used by the
//! correlation engine (issue create/get, issue event listing, commit
//! lookup, comment creation, open-issue listing) with bounded retry over
//! reqwest.

pub mod client;
pub mod transport;
pub mod types;

pub use client::GithubApiClient;
pub use types::{
    GithubCommentCreated, GithubCommitDetail, GithubIssue, GithubIssueEvent, GithubIssueLabel,
    GithubUser, RepoRef,
};
