//! Card, thread-name, and notification text builders. All pure so the
//! interesting formatting rules stay unit-testable without a chat double.

use triage_core::{first_line, leading_words, short_sha, truncate_for_error};
use triage_discord::wire::{
    DiscordActionRow, DiscordComponent, DiscordEmbed, DiscordEmbedAuthor, DiscordEmbedField,
    DiscordMessage, BUTTON_STYLE_DANGER, BUTTON_STYLE_PRIMARY,
};
use triage_store::{ReportKind, ReportLink, TrackerCommit};

use super::action_token::ActionToken;

pub(super) const CARD_TITLE: &str = "New bug report / feature request";
const CARD_COLOR_PENDING: u32 = 0x5865F2;
const CARD_COLOR_LINKED: u32 = 0x57F287;

const TITLE_WORD_LIMIT: usize = 10;
const THREAD_NAME_WORD_LIMIT: usize = 6;
/// Discord caps channel and thread names at 100 characters.
const THREAD_NAME_MAX_CHARS: usize = 100;

pub(super) fn report_card_embed(message: &DiscordMessage) -> DiscordEmbed {
    let description = if message.content.trim().is_empty() {
        "*No content provided*".to_string()
    } else {
        message.content.clone()
    };
    let author = message.author.as_ref().map(|author| DiscordEmbedAuthor {
        name: author.display_name().to_string(),
        icon_url: None,
    });
    DiscordEmbed {
        title: Some(CARD_TITLE.to_string()),
        description: Some(description),
        color: Some(CARD_COLOR_PENDING),
        timestamp: message.timestamp.clone(),
        author,
        fields: Vec::new(),
    }
}

/// The two intake controls, bound to the card's own message id so every
/// later step can re-fetch the card as its source of truth.
pub(super) fn card_action_rows(card_message_id: &str) -> Vec<DiscordActionRow> {
    vec![DiscordActionRow::of(vec![
        DiscordComponent::button(
            BUTTON_STYLE_DANGER,
            "Create bug issue",
            &ActionToken::CreateIssue {
                kind: ReportKind::Bug,
                card_message_id: card_message_id.to_string(),
            }
            .encode(),
        ),
        DiscordComponent::button(
            BUTTON_STYLE_PRIMARY,
            "Create feature issue",
            &ActionToken::CreateIssue {
                kind: ReportKind::Feature,
                card_message_id: card_message_id.to_string(),
            }
            .encode(),
        ),
    ])]
}

pub(super) fn linked_card_embed(card_embed: &DiscordEmbed, issue_number: u64, issue_url: &str) -> DiscordEmbed {
    let mut embed = card_embed.clone();
    embed.color = Some(CARD_COLOR_LINKED);
    embed.fields.push(DiscordEmbedField {
        name: "Linked tracker issue".to_string(),
        value: format!("[#{issue_number}]({issue_url})"),
        inline: false,
    });
    embed
}

pub(super) fn derive_issue_title(kind: ReportKind, report_body: &str) -> String {
    let words = leading_words(report_body, TITLE_WORD_LIMIT);
    if words.is_empty() {
        format!("{}: Untitled report", kind.title_prefix())
    } else {
        format!("{}: {}", kind.title_prefix(), words)
    }
}

pub(super) fn issue_body(author_name: &str, report_body: &str, jump_link: &str) -> String {
    format!(
        "**Reported by:** {author_name}\n\n{report_body}\n\n---\n[View original report]({jump_link})"
    )
}

pub(super) fn intake_thread_name(author_name: &str) -> String {
    clamp_thread_name(&format!("Discussion: {author_name}'s report"))
}

pub(super) fn intake_thread_greeting(author_id: &str) -> String {
    format!("Hey <@{author_id}>, further discussion about this report can continue here.")
}

/// Canonical thread name: embeds the issue number, a few leading words of
/// the report, and a commit-count suffix once commits are referenced.
pub(super) fn thread_name(issue_number: u64, report_body: &str, commit_count: usize) -> String {
    let words = leading_words(report_body, THREAD_NAME_WORD_LIMIT);
    let base = if words.is_empty() {
        format!("Issue #{issue_number}")
    } else {
        format!("Issue #{issue_number} — {words}")
    };
    let named = match commit_count {
        0 => base,
        1 => format!("{base} · 1 commit"),
        n => format!("{base} · {n} commits"),
    };
    clamp_thread_name(&named)
}

pub(super) fn thread_announcement(author_id: &str, issue_number: u64, issue_url: &str) -> String {
    format!("Filed tracker issue #{issue_number} for this report: {issue_url} <@{author_id}>")
}

pub(super) fn commit_notification(commit: &TrackerCommit, issue_number: u64) -> String {
    format!(
        "New commit referenced issue #{issue_number}: [{}]({}) {} — {}",
        short_sha(&commit.sha),
        commit.html_url,
        commit.message_line,
        commit.author,
    )
}

pub(super) fn closure_notification(link: &ReportLink, closed_by: &str) -> String {
    let mut text = format!(
        "Tracker issue #{} has been closed by @{closed_by}. <@{}>",
        link.issue.number, link.report.author_id,
    );
    if !link.commits.is_empty() {
        text.push_str("\n\nLinked commits:");
        for commit in &link.commits {
            text.push_str(&format!(
                "\n- [{}]({}): {}",
                short_sha(&commit.sha),
                commit.html_url,
                commit.message_line,
            ));
        }
    }
    text
}

/// Label for an open-issue select option, bounded for the select menu.
pub(super) fn open_issue_option_label(issue_number: u64, title: &str) -> String {
    truncate_for_error(&format!("#{issue_number} {}", first_line(title)), 90)
}

pub(super) fn relayed_comment_body(author_name: &str, message_text: &str) -> String {
    let quoted = message_text
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("**Reported in chat by:** {author_name}\n\n{quoted}")
}

fn clamp_thread_name(raw: &str) -> String {
    if raw.chars().count() <= THREAD_NAME_MAX_CHARS {
        return raw.to_string();
    }
    raw.chars().take(THREAD_NAME_MAX_CHARS).collect()
}
