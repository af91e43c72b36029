//! File-backed persistence for report↔issue correlation records.

use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use triage_core::write_text_atomic;

use crate::records::{issue_key, DiscussionThread, ReportLink, ReportMessage, TrackerCommit, TrackerIssue};

const CORRELATION_STATE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CorrelationState {
    schema_version: u32,
    /// Keyed by the report card's message id, the identity round-tripped
    /// through action tokens.
    #[serde(default)]
    links: BTreeMap<String, ReportLink>,
}

impl Default for CorrelationState {
    fn default() -> Self {
        Self {
            schema_version: CORRELATION_STATE_SCHEMA_VERSION,
            links: BTreeMap::new(),
        }
    }
}

/// Durable mapping between report cards, tracker issues, commits, and
/// discussion threads. All writes happen through compare-and-set shaped
/// mutators that return whether anything changed; callers persist with
/// [`CorrelationStore::save`] after a `true` return.
pub struct CorrelationStore {
    path: PathBuf,
    state: CorrelationState,
    thread_index: HashMap<String, String>,
    issue_index: HashMap<String, String>,
}

impl CorrelationStore {
    /// Loads persisted state and rebuilds the thread/issue lookup indexes.
    /// A corrupt or schema-incompatible file logs and starts fresh rather
    /// than refusing to boot.
    pub fn load(path: PathBuf) -> Result<Self> {
        let mut state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read state file {}", path.display()))?;
            match serde_json::from_str::<CorrelationState>(&raw) {
                Ok(state) => state,
                Err(error) => {
                    eprintln!(
                        "failed to parse correlation state file {}: {} (starting fresh)",
                        path.display(),
                        error
                    );
                    CorrelationState::default()
                }
            }
        } else {
            CorrelationState::default()
        };

        if state.schema_version != CORRELATION_STATE_SCHEMA_VERSION {
            eprintln!(
                "unsupported correlation state schema: expected {}, found {} (starting fresh)",
                CORRELATION_STATE_SCHEMA_VERSION, state.schema_version
            );
            state = CorrelationState::default();
        }

        let mut store = Self {
            path,
            state,
            thread_index: HashMap::new(),
            issue_index: HashMap::new(),
        };
        store.rebuild_indexes();
        Ok(store)
    }

    fn rebuild_indexes(&mut self) {
        self.thread_index.clear();
        self.issue_index.clear();
        for (card_id, link) in &self.state.links {
            if let Some(thread) = &link.thread {
                self.thread_index
                    .insert(thread.thread_id.clone(), card_id.clone());
            }
            self.issue_index.insert(link.issue_key(), card_id.clone());
        }
    }

    pub fn is_linked(&self, card_message_id: &str) -> bool {
        self.state.links.contains_key(card_message_id)
    }

    /// Creates the correlation record for a card. Returns `false` without
    /// touching anything when the card is already linked, so a second
    /// tracker issue can never be recorded for the same report.
    pub fn link_report(
        &mut self,
        card_message_id: &str,
        report: ReportMessage,
        issue: TrackerIssue,
        thread: Option<DiscussionThread>,
    ) -> bool {
        if self.state.links.contains_key(card_message_id) {
            return false;
        }
        let link = ReportLink {
            report,
            issue,
            thread,
            commits: Vec::new(),
        };
        if let Some(thread) = &link.thread {
            self.thread_index
                .insert(thread.thread_id.clone(), card_message_id.to_string());
        }
        self.issue_index
            .insert(link.issue_key(), card_message_id.to_string());
        self.state.links.insert(card_message_id.to_string(), link);
        true
    }

    pub fn link(&self, card_message_id: &str) -> Option<&ReportLink> {
        self.state.links.get(card_message_id)
    }

    /// Store-keyed thread resolution: the comment workflow uses this instead
    /// of parsing issue numbers back out of thread display names.
    pub fn link_for_thread(&self, thread_id: &str) -> Option<(&String, &ReportLink)> {
        let card_id = self.thread_index.get(thread_id)?;
        let link = self.state.links.get(card_id)?;
        Some((card_id, link))
    }

    pub fn link_for_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Option<(&String, &ReportLink)> {
        let card_id = self.issue_index.get(&issue_key(owner, repo, number))?;
        let link = self.state.links.get(card_id)?;
        Some((card_id, link))
    }

    /// Attaches (or replaces) the discussion thread for a linked card.
    pub fn attach_thread(&mut self, card_message_id: &str, thread: DiscussionThread) -> bool {
        let Some(link) = self.state.links.get_mut(card_message_id) else {
            return false;
        };
        if link.thread.as_ref() == Some(&thread) {
            return false;
        }
        if let Some(previous) = &link.thread {
            self.thread_index.remove(&previous.thread_id);
        }
        self.thread_index
            .insert(thread.thread_id.clone(), card_message_id.to_string());
        link.thread = Some(thread);
        true
    }

    /// Updates the stored thread display name; the chat-side rename is a
    /// projection of this value.
    pub fn rename_thread(&mut self, card_message_id: &str, name: &str) -> bool {
        let Some(link) = self.state.links.get_mut(card_message_id) else {
            return false;
        };
        let Some(thread) = link.thread.as_mut() else {
            return false;
        };
        if thread.name == name {
            return false;
        }
        thread.name = name.to_string();
        true
    }

    /// Records a commit reference, deduplicated by SHA. Returns `false` for
    /// a SHA already present so a commit is never re-announced.
    pub fn record_commit(&mut self, card_message_id: &str, commit: TrackerCommit) -> bool {
        let Some(link) = self.state.links.get_mut(card_message_id) else {
            return false;
        };
        if link.has_commit(&commit.sha) {
            return false;
        }
        link.commits.push(commit);
        true
    }

    /// One-way closed flip. Returns `false` when the issue was already
    /// closed, which is what makes a repeated reconcile pass a no-op.
    pub fn mark_issue_closed(&mut self, card_message_id: &str) -> bool {
        let Some(link) = self.state.links.get_mut(card_message_id) else {
            return false;
        };
        if link.issue.closed {
            return false;
        }
        link.issue.closed = true;
        true
    }

    /// Snapshot of every link whose issue is still open, in card-id order.
    /// The reconcile pass iterates this so closed issues cost nothing.
    pub fn open_links(&self) -> Vec<(String, ReportLink)> {
        self.state
            .links
            .iter()
            .filter(|(_, link)| !link.issue.closed)
            .map(|(card_id, link)| (card_id.clone(), link.clone()))
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.state.links.len()
    }

    pub fn save(&self) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(&self.state)
            .context("failed to serialize correlation state")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write state file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ReportKind;

    fn test_report(card_id: &str) -> ReportMessage {
        ReportMessage {
            message_id: format!("orig-{card_id}"),
            channel_id: "chan-1".to_string(),
            author_id: "user-1".to_string(),
            content: "App crashes on save".to_string(),
            kind: ReportKind::Bug,
        }
    }

    fn test_issue(number: u64) -> TrackerIssue {
        TrackerIssue {
            owner: "acme".to_string(),
            repo: "backend".to_string(),
            number,
            title: "Bug: App crashes on save".to_string(),
            html_url: format!("https://github.test/acme/backend/issues/{number}"),
            labels: vec!["bug".to_string()],
            closed: false,
        }
    }

    fn test_thread(thread_id: &str) -> DiscussionThread {
        DiscussionThread {
            thread_id: thread_id.to_string(),
            name: "Issue #7 — App crashes on save".to_string(),
        }
    }

    fn test_commit(sha: &str) -> TrackerCommit {
        TrackerCommit {
            sha: sha.to_string(),
            message_line: "fix save-path crash".to_string(),
            html_url: format!("https://github.test/acme/backend/commit/{sha}"),
            author: "carol".to_string(),
        }
    }

    #[test]
    fn unit_link_report_refuses_second_issue_for_same_card() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");

        assert!(store.link_report("card-1", test_report("card-1"), test_issue(7), None));
        assert!(!store.link_report("card-1", test_report("card-1"), test_issue(8), None));

        let link = store.link("card-1").expect("linked");
        assert_eq!(link.issue.number, 7);
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn unit_mark_issue_closed_is_one_way() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report("card-1", test_report("card-1"), test_issue(7), None);

        assert!(store.mark_issue_closed("card-1"));
        assert!(!store.mark_issue_closed("card-1"));
        assert!(store.link("card-1").expect("linked").issue.closed);
        assert!(store.open_links().is_empty());
    }

    #[test]
    fn unit_record_commit_dedups_by_sha() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report("card-1", test_report("card-1"), test_issue(7), None);

        assert!(store.record_commit("card-1", test_commit("abcdef1234567890")));
        assert!(!store.record_commit("card-1", test_commit("abcdef1234567890")));
        assert!(store.record_commit("card-1", test_commit("1234567abcdef890")));
        assert_eq!(store.link("card-1").expect("linked").commits.len(), 2);
    }

    #[test]
    fn functional_thread_index_resolves_cards_by_thread_id() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report(
            "card-1",
            test_report("card-1"),
            test_issue(7),
            Some(test_thread("thread-9")),
        );

        let (card_id, link) = store.link_for_thread("thread-9").expect("thread lookup");
        assert_eq!(card_id, "card-1");
        assert_eq!(link.issue.number, 7);
        assert!(store.link_for_thread("thread-unknown").is_none());
    }

    #[test]
    fn functional_attach_thread_after_link_updates_index() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report("card-1", test_report("card-1"), test_issue(7), None);
        assert!(store.link_for_thread("thread-9").is_none());

        assert!(store.attach_thread("card-1", test_thread("thread-9")));
        assert!(!store.attach_thread("card-1", test_thread("thread-9")));
        assert!(store.link_for_thread("thread-9").is_some());
    }

    #[test]
    fn functional_issue_index_resolves_cards_by_issue_number() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report("card-1", test_report("card-1"), test_issue(7), None);

        let (card_id, _) = store.link_for_issue("acme", "backend", 7).expect("lookup");
        assert_eq!(card_id, "card-1");
        assert!(store.link_for_issue("acme", "backend", 8).is_none());
        assert!(store.link_for_issue("acme", "frontend", 7).is_none());
    }

    #[test]
    fn integration_save_and_reload_round_trips_records_and_indexes() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state.json");
        {
            let mut store = CorrelationStore::load(path.clone()).expect("load");
            store.link_report(
                "card-1",
                test_report("card-1"),
                test_issue(7),
                Some(test_thread("thread-9")),
            );
            store.record_commit("card-1", test_commit("abcdef1234567890"));
            store.save().expect("save");
        }

        let store = CorrelationStore::load(path).expect("reload");
        assert_eq!(store.link_count(), 1);
        let (_, link) = store.link_for_thread("thread-9").expect("thread survives");
        assert_eq!(link.commits.len(), 1);
        assert!(link.has_commit("abcdef1234567890"));
    }

    #[test]
    fn regression_corrupt_state_file_starts_fresh_instead_of_failing() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("state.json");
        std::fs::write(&path, "not json at all").expect("write garbage");

        let store = CorrelationStore::load(path).expect("load tolerates garbage");
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn regression_rename_thread_requires_existing_thread() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut store = CorrelationStore::load(tempdir.path().join("state.json")).expect("load");
        store.link_report("card-1", test_report("card-1"), test_issue(7), None);

        assert!(!store.rename_thread("card-1", "Issue #7 — renamed"));
        store.attach_thread("card-1", test_thread("thread-9"));
        assert!(store.rename_thread("card-1", "Issue #7 — renamed"));
        assert!(!store.rename_thread("card-1", "Issue #7 — renamed"));
    }
}
