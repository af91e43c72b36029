//! Reconciliation poller: brings chat-side state into eventual agreement
//! with the tracker. One pass walks every stored open issue; commit
//! references are detected and announced before closure handling so a
//! same-pass closure can summarize them.

use anyhow::{Context, Result};
use serde_json::json;

use triage_core::{current_unix_timestamp_ms, first_line};
use triage_discord::wire::MessageCreatePayload;
use triage_github::{GithubIssueEvent, RepoRef};
use triage_store::{ReportLink, TrackerCommit};

use super::{render, CorrelationRuntime};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcilePassReport {
    pub issues_checked: usize,
    pub commits_recorded: usize,
    pub issues_closed: usize,
    pub failed_issues: usize,
}

impl ReconcilePassReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl CorrelationRuntime {
    /// One reconcile pass. Failures are isolated per issue: a tracker error
    /// on one issue logs and counts, and the rest of the pass proceeds.
    pub async fn run_reconcile_pass(&mut self) -> Result<ReconcilePassReport> {
        let mut report = ReconcilePassReport::default();
        for (card_id, link) in self.store.open_links() {
            report.issues_checked = report.issues_checked.saturating_add(1);
            if let Err(error) = self.reconcile_issue(&card_id, &link, &mut report).await {
                report.failed_issues = report.failed_issues.saturating_add(1);
                eprintln!(
                    "triage bridge reconcile error: issue={}/{}#{} {error:#}",
                    link.issue.owner, link.issue.repo, link.issue.number
                );
            }
        }
        Ok(report)
    }

    async fn reconcile_issue(
        &mut self,
        card_id: &str,
        link: &ReportLink,
        report: &mut ReconcilePassReport,
    ) -> Result<()> {
        let repo = RepoRef::new(&link.issue.owner, &link.issue.repo);
        let current = self
            .github
            .get_issue(&repo, link.issue.number)
            .await
            .context("failed to fetch tracker issue state")?;
        let events = self
            .github
            .list_issue_events(&repo, link.issue.number)
            .await
            .context("failed to fetch tracker issue events")?;

        for sha in events.iter().filter_map(GithubIssueEvent::referenced_commit) {
            self.record_referenced_commit(card_id, link, &repo, sha, report)
                .await?;
        }

        if current.is_closed() && self.store.mark_issue_closed(card_id) {
            self.store.save()?;
            report.issues_closed = report.issues_closed.saturating_add(1);
            let closed_by = current
                .closed_by
                .as_ref()
                .map(|user| user.login.clone())
                .unwrap_or_else(|| "unknown".to_string());

            // Re-read the link so the closure summary includes commits
            // recorded earlier in this same pass.
            let closed_link = self
                .store
                .link(card_id)
                .cloned()
                .unwrap_or_else(|| link.clone());
            if let Some(thread) = closed_link.thread.as_ref() {
                let notification =
                    MessageCreatePayload::text(&render::closure_notification(&closed_link, &closed_by));
                self.discord
                    .create_message(&thread.thread_id, &notification)
                    .await
                    .context("failed to post closure notification")?;

                let channel = self
                    .discord
                    .fetch_channel(&thread.thread_id)
                    .await
                    .context("failed to fetch discussion thread state")?;
                if !channel.is_archived_or_locked() {
                    self.discord
                        .archive_thread(&thread.thread_id)
                        .await
                        .context("failed to archive discussion thread")?;
                }
            }
            self.outbound_log.append(&json!({
                "timestamp_unix_ms": current_unix_timestamp_ms(),
                "kind": "issue_closed",
                "repository": repo.as_slug(),
                "issue_number": link.issue.number,
                "closed_by": closed_by,
                "linked_commits": closed_link.commits.len(),
            }))?;
        }
        Ok(())
    }

    async fn record_referenced_commit(
        &mut self,
        card_id: &str,
        link: &ReportLink,
        repo: &RepoRef,
        sha: &str,
        report: &mut ReconcilePassReport,
    ) -> Result<()> {
        let already_recorded = self
            .store
            .link(card_id)
            .map(|current| current.has_commit(sha))
            .unwrap_or(false);
        if already_recorded {
            return Ok(());
        }

        let detail = self
            .github
            .get_commit(repo, sha)
            .await
            .context("failed to fetch referenced commit")?;
        let commit = TrackerCommit {
            sha: detail.sha.clone(),
            message_line: first_line(&detail.commit.message).to_string(),
            html_url: detail.html_url.clone(),
            author: detail
                .commit
                .author
                .as_ref()
                .map(|author| author.name.clone())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        if !self.store.record_commit(card_id, commit.clone()) {
            return Ok(());
        }
        self.store.save()?;
        report.commits_recorded = report.commits_recorded.saturating_add(1);

        self.outbound_log.append(&json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "kind": "commit_recorded",
            "repository": repo.as_slug(),
            "issue_number": link.issue.number,
            "sha": commit.sha,
        }))?;

        if let Some(thread) = link.thread.as_ref() {
            let notification =
                MessageCreatePayload::text(&render::commit_notification(&commit, link.issue.number));
            self.discord
                .create_message(&thread.thread_id, &notification)
                .await
                .context("failed to post commit notification")?;

            // Thread name projection picks up the new commit count.
            let commit_count = self
                .store
                .link(card_id)
                .map(|current| current.commits.len())
                .unwrap_or(0);
            let name = render::thread_name(link.issue.number, &link.report.content, commit_count);
            if self.store.rename_thread(card_id, &name) {
                self.store.save()?;
                if let Err(error) = self.discord.rename_thread(&thread.thread_id, &name).await {
                    eprintln!("triage bridge thread rename failed: {error:#}");
                }
            }
        }
        Ok(())
    }
}
