//! Tests for correlation bridge behavior and regressions.

use std::path::Path;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::tempdir;

use super::*;
use triage_discord::wire::{DiscordMessage, DiscordUser};
use triage_discord::{ChatEvent, ChatInteraction, InteractionKind};
use triage_store::{DiscussionThread, ReportKind, ReportMessage, TrackerIssue};

mod issue_workflows;

fn test_config(
    discord_base: &str,
    github_base: &str,
    state_dir: &Path,
) -> CorrelationRuntimeConfig {
    CorrelationRuntimeConfig {
        state_dir: state_dir.to_path_buf(),
        discord_api_base: discord_base.to_string(),
        discord_token: "bot-token".to_string(),
        github_api_base: github_base.to_string(),
        github_token: "gh-token".to_string(),
        tracker_owner: "acme".to_string(),
        allowed_repos: vec!["backend".to_string(), "frontend".to_string()],
        report_channel_ids: vec!["chan-report".to_string()],
        bot_user_id: Some("bot-1".to_string()),
        context_command_name: "Link to Tracker Issue".to_string(),
        open_issue_page_size: 20,
        poll_interval: Duration::from_millis(50),
        poll_once: false,
        request_timeout_ms: 2_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
        thread_auto_archive_minutes: 1440,
    }
}

async fn test_runtime(
    discord: &MockServer,
    github: &MockServer,
    state_dir: &Path,
) -> CorrelationRuntime {
    CorrelationRuntime::new(test_config(&discord.base_url(), &github.base_url(), state_dir))
        .await
        .expect("runtime")
}

fn message_from_json(value: Value) -> DiscordMessage {
    serde_json::from_value(value).expect("discord message")
}

fn test_user(id: &str) -> DiscordUser {
    DiscordUser {
        id: id.to_string(),
        username: "reporter".to_string(),
        global_name: Some("Reporter Prime".to_string()),
        bot: false,
    }
}

fn button_interaction(custom_id: &str, channel_id: &str) -> ChatInteraction {
    ChatInteraction {
        id: "i1".to_string(),
        token: "tok".to_string(),
        kind: InteractionKind::Button,
        guild_id: Some("g1".to_string()),
        channel_id: channel_id.to_string(),
        custom_id: Some(custom_id.to_string()),
        values: Vec::new(),
        command_name: None,
        target_message: None,
        message: None,
        user: Some(test_user("u1")),
    }
}

fn select_interaction(custom_id: &str, value: &str, channel_id: &str) -> ChatInteraction {
    ChatInteraction {
        values: vec![value.to_string()],
        kind: InteractionKind::SelectMenu,
        ..button_interaction(custom_id, channel_id)
    }
}

fn context_interaction(
    command_name: &str,
    channel_id: &str,
    target: DiscordMessage,
) -> ChatInteraction {
    ChatInteraction {
        id: "i1".to_string(),
        token: "tok".to_string(),
        kind: InteractionKind::MessageContext,
        guild_id: Some("g1".to_string()),
        channel_id: channel_id.to_string(),
        custom_id: None,
        values: Vec::new(),
        command_name: Some(command_name.to_string()),
        target_message: Some(target),
        message: None,
        user: Some(test_user("u2")),
    }
}

/// Seeds a linked report the way a completed confirm step would have.
fn seed_link(runtime: &mut CorrelationRuntime, card_id: &str, issue_number: u64, thread_id: Option<&str>) {
    let report = ReportMessage {
        message_id: format!("orig-{card_id}"),
        channel_id: "chan-report".to_string(),
        author_id: "u1".to_string(),
        content: "App crashes on save".to_string(),
        kind: ReportKind::Bug,
    };
    let issue = TrackerIssue {
        owner: "acme".to_string(),
        repo: "backend".to_string(),
        number: issue_number,
        title: "Bug: App crashes on save".to_string(),
        html_url: format!("https://github.test/acme/backend/issues/{issue_number}"),
        labels: vec!["bug".to_string()],
        closed: false,
    };
    let thread = thread_id.map(|thread_id| DiscussionThread {
        thread_id: thread_id.to_string(),
        name: format!("Issue #{issue_number} — App crashes on save"),
    });
    assert!(runtime.store.link_report(card_id, report, issue, thread));
    runtime.store.save().expect("save seeded store");
}
