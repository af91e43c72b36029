//! Versioned action-token codec.
//!
//! Workflow state is never held in process memory between interaction
//! steps: every rendered control carries a token encoding the next step and
//! its parameters, so a half-finished card survives restarts. Tokens are
//! colon-delimited with a schema-version prefix; decoding is total and a
//! string that does not match the current schema exactly maps to `None`.

use triage_store::ReportKind;

const TOKEN_SCHEMA_PREFIX: &str = "tri1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionToken {
    /// "Create bug/feature issue" button on a report card.
    CreateIssue {
        kind: ReportKind,
        card_message_id: String,
    },
    /// Repository selection menu shown after the create press.
    PickRepository {
        kind: ReportKind,
        card_message_id: String,
    },
    /// Final confirmation button carrying the chosen repository.
    ConfirmIssue {
        kind: ReportKind,
        repository: String,
        card_message_id: String,
    },
    /// Open-issue selection menu in the comment workflow.
    PickExistingIssue { message_id: String },
    /// Comment confirmation button bound to one tracker issue.
    CommentExisting {
        repository: String,
        issue_number: u64,
        message_id: String,
    },
}

impl ActionToken {
    pub fn encode(&self) -> String {
        match self {
            Self::CreateIssue {
                kind,
                card_message_id,
            } => format!("{TOKEN_SCHEMA_PREFIX}:create:{}:{card_message_id}", kind.as_str()),
            Self::PickRepository {
                kind,
                card_message_id,
            } => format!("{TOKEN_SCHEMA_PREFIX}:repo:{}:{card_message_id}", kind.as_str()),
            Self::ConfirmIssue {
                kind,
                repository,
                card_message_id,
            } => format!(
                "{TOKEN_SCHEMA_PREFIX}:confirm:{}:{repository}:{card_message_id}",
                kind.as_str()
            ),
            Self::PickExistingIssue { message_id } => {
                format!("{TOKEN_SCHEMA_PREFIX}:pick:{message_id}")
            }
            Self::CommentExisting {
                repository,
                issue_number,
                message_id,
            } => format!(
                "{TOKEN_SCHEMA_PREFIX}:comment:{repository}:{issue_number}:{message_id}"
            ),
        }
    }

    /// Total decoder: anything that is not exactly a current-schema token
    /// returns `None`. Field counts are exact; trailing or missing fields
    /// disqualify a candidate rather than being ignored.
    pub fn decode(raw: &str) -> Option<Self> {
        let mut fields = raw.split(':');
        if fields.next() != Some(TOKEN_SCHEMA_PREFIX) {
            return None;
        }
        let tag = fields.next()?;
        let rest = fields.collect::<Vec<_>>();
        match (tag, rest.as_slice()) {
            ("create", [kind, card_message_id]) => Some(Self::CreateIssue {
                kind: ReportKind::parse(kind)?,
                card_message_id: non_empty(card_message_id)?,
            }),
            ("repo", [kind, card_message_id]) => Some(Self::PickRepository {
                kind: ReportKind::parse(kind)?,
                card_message_id: non_empty(card_message_id)?,
            }),
            ("confirm", [kind, repository, card_message_id]) => Some(Self::ConfirmIssue {
                kind: ReportKind::parse(kind)?,
                repository: non_empty(repository)?,
                card_message_id: non_empty(card_message_id)?,
            }),
            ("pick", [message_id]) => Some(Self::PickExistingIssue {
                message_id: non_empty(message_id)?,
            }),
            ("comment", [repository, issue_number, message_id]) => Some(Self::CommentExisting {
                repository: non_empty(repository)?,
                issue_number: issue_number.parse().ok()?,
                message_id: non_empty(message_id)?,
            }),
            _ => None,
        }
    }

    /// Stable step label used in inbound event logs.
    pub fn step_name(&self) -> &'static str {
        match self {
            Self::CreateIssue { .. } => "create_issue",
            Self::PickRepository { .. } => "pick_repository",
            Self::ConfirmIssue { .. } => "confirm_issue",
            Self::PickExistingIssue { .. } => "pick_existing_issue",
            Self::CommentExisting { .. } => "comment_existing",
        }
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}
