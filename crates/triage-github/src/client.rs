//! GitHub REST client used by the issue workflow and reconcile poller.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::transport::{
    is_retryable_github_status, is_retryable_transport_error, parse_retry_after, retry_delay,
};
use crate::types::{
    GithubCommentCreated, GithubCommitDetail, GithubIssue, GithubIssueEvent, RepoRef,
};
use triage_core::truncate_for_error;

const EVENTS_PAGE_SIZE: usize = 100;

#[derive(Clone)]
pub struct GithubApiClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl GithubApiClient {
    pub fn new(
        api_base: String,
        token: String,
        request_timeout_ms: u64,
        retry_max_attempts: usize,
        retry_base_delay_ms: u64,
    ) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("triage-report-bridge"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            reqwest::header::HeaderValue::from_static("2022-11-28"),
        );
        let auth_header = format!("Bearer {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid github authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create github api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    pub async fn create_issue(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<GithubIssue> {
        let payload = json!({
            "title": title,
            "body": body,
            "labels": labels,
        });
        self.request_json("create issue", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues",
                    self.api_base, repo.owner, repo.name
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn get_issue(&self, repo: &RepoRef, issue_number: u64) -> Result<GithubIssue> {
        self.request_json("get issue", || {
            self.http.get(format!(
                "{}/repos/{}/{}/issues/{}",
                self.api_base, repo.owner, repo.name, issue_number
            ))
        })
        .await
    }

    /// Lists the full event timeline for an issue, paging until exhausted.
    pub async fn list_issue_events(
        &self,
        repo: &RepoRef,
        issue_number: u64,
    ) -> Result<Vec<GithubIssueEvent>> {
        let mut page = 1_u32;
        let mut rows = Vec::new();
        loop {
            let page_value = page.to_string();
            let chunk: Vec<GithubIssueEvent> = self
                .request_json("list issue events", || {
                    self.http
                        .get(format!(
                            "{}/repos/{}/{}/issues/{}/events",
                            self.api_base, repo.owner, repo.name, issue_number
                        ))
                        .query(&[
                            ("per_page", EVENTS_PAGE_SIZE.to_string().as_str()),
                            ("page", page_value.as_str()),
                        ])
                })
                .await?;
            let chunk_len = chunk.len();
            rows.extend(chunk);
            if chunk_len < EVENTS_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        Ok(rows)
    }

    pub async fn get_commit(&self, repo: &RepoRef, sha: &str) -> Result<GithubCommitDetail> {
        self.request_json("get commit", || {
            self.http.get(format!(
                "{}/repos/{}/{}/commits/{}",
                self.api_base, repo.owner, repo.name, sha
            ))
        })
        .await
    }

    pub async fn create_comment(
        &self,
        repo: &RepoRef,
        issue_number: u64,
        body: &str,
    ) -> Result<GithubCommentCreated> {
        let payload = json!({ "body": body });
        self.request_json("create issue comment", || {
            self.http
                .post(format!(
                    "{}/repos/{}/{}/issues/{}/comments",
                    self.api_base, repo.owner, repo.name, issue_number
                ))
                .json(&payload)
        })
        .await
    }

    /// Lists up to `page_size` open issues, excluding pull requests (the
    /// issues endpoint interleaves them).
    pub async fn list_open_issues(
        &self,
        repo: &RepoRef,
        page_size: usize,
    ) -> Result<Vec<GithubIssue>> {
        let per_page = page_size.clamp(1, EVENTS_PAGE_SIZE).to_string();
        let rows: Vec<GithubIssue> = self
            .request_json("list open issues", || {
                self.http
                    .get(format!(
                        "{}/repos/{}/{}/issues",
                        self.api_base, repo.owner, repo.name
                    ))
                    .query(&[
                        ("state", "open"),
                        ("sort", "created"),
                        ("direction", "desc"),
                        ("per_page", per_page.as_str()),
                    ])
            })
            .await?;
        Ok(rows
            .into_iter()
            .filter(|issue| issue.pull_request.is_none())
            .collect())
    }

    async fn request_json<T, F>(&self, operation: &str, mut request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = request_builder()
                .header(
                    "x-triage-retry-attempt",
                    attempt.saturating_sub(1).to_string(),
                )
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed = response
                            .json::<T>()
                            .await
                            .with_context(|| format!("failed to decode github {operation}"))?;
                        return Ok(parsed);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_github_status(status.as_u16())
                    {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }

                    bail!(
                        "github api {operation} failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 800)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("github api {operation} request failed"));
                }
            }
        }
    }
}
