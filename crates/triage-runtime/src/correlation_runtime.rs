//! Correlation bridge runtime: report intake, workflow dispatch, and the
//! reconciliation poller, multiplexed on one cooperative loop.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use serde_json::json;
use tokio::sync::mpsc;

use triage_core::{current_unix_timestamp_ms, JsonlEventLog};
use triage_discord::{ChatEvent, ChatInteraction, DiscordApiClient, InteractionKind};
use triage_github::GithubApiClient;
use triage_store::CorrelationStore;

mod action_token;
mod comment_workflow;
mod issue_workflow;
mod reconcile;
mod render;
mod report_intake;

pub use action_token::ActionToken;
pub use reconcile::ReconcilePassReport;

/// Runtime configuration for the correlation bridge. Built once by the CLI
/// and handed to [`CorrelationRuntime::new`]; nothing here is global.
#[derive(Clone)]
pub struct CorrelationRuntimeConfig {
    pub state_dir: PathBuf,
    pub discord_api_base: String,
    pub discord_token: String,
    pub github_api_base: String,
    pub github_token: String,
    /// Tracker organization every allow-listed repository lives under.
    pub tracker_owner: String,
    /// Repositories a report may be filed against.
    pub allowed_repos: Vec<String>,
    /// Channels watched for new reports.
    pub report_channel_ids: Vec<String>,
    /// Skips the `users/@me` lookup when provided.
    pub bot_user_id: Option<String>,
    /// Display name of the message context command.
    pub context_command_name: String,
    pub open_issue_page_size: usize,
    pub poll_interval: Duration,
    /// Run exactly one reconcile pass and return (operational tooling).
    pub poll_once: bool,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
    pub thread_auto_archive_minutes: u32,
}

/// Runs the correlation bridge until ctrl-c or the event source closes.
pub async fn run_correlation_bridge(
    config: CorrelationRuntimeConfig,
    events: mpsc::Receiver<ChatEvent>,
) -> Result<()> {
    let mut runtime = CorrelationRuntime::new(config).await?;
    runtime.run(events).await
}

pub struct CorrelationRuntime {
    config: CorrelationRuntimeConfig,
    discord: DiscordApiClient,
    github: GithubApiClient,
    store: CorrelationStore,
    inbound_log: JsonlEventLog,
    outbound_log: JsonlEventLog,
    bot_user_id: String,
}

impl CorrelationRuntime {
    pub async fn new(config: CorrelationRuntimeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.state_dir)
            .with_context(|| format!("failed to create {}", config.state_dir.display()))?;

        let discord = DiscordApiClient::new(
            config.discord_api_base.clone(),
            config.discord_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;
        let github = GithubApiClient::new(
            config.github_api_base.clone(),
            config.github_token.clone(),
            config.request_timeout_ms,
            config.retry_max_attempts,
            config.retry_base_delay_ms,
        )?;

        let bot_user_id = match config.bot_user_id.clone() {
            Some(user_id) if !user_id.trim().is_empty() => user_id.trim().to_string(),
            _ => discord.current_user().await?.id,
        };

        let store = CorrelationStore::load(config.state_dir.join("state.json"))?;
        let inbound_log = JsonlEventLog::open(config.state_dir.join("inbound-events.jsonl"))?;
        let outbound_log = JsonlEventLog::open(config.state_dir.join("outbound-events.jsonl"))?;

        Ok(Self {
            config,
            discord,
            github,
            store,
            inbound_log,
            outbound_log,
            bot_user_id,
        })
    }

    /// Event loop: chat events, the reconcile ticker, and shutdown are
    /// multiplexed on this single task, so store writes never race. A
    /// reconcile pass is awaited inline and the ticker skips missed ticks,
    /// which is what keeps slow passes from overlapping the next one.
    pub async fn run(&mut self, mut events: mpsc::Receiver<ChatEvent>) -> Result<()> {
        if self.config.poll_once {
            let report = self.run_reconcile_pass().await?;
            println!(
                "triage bridge one-shot reconcile: checked={} commits={} closed={} failed={}",
                report.issues_checked,
                report.commits_recorded,
                report.issues_closed,
                report.failed_issues,
            );
            return Ok(());
        }

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("triage bridge shutdown requested");
                    return Ok(());
                }
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        println!("triage bridge event source closed");
                        return Ok(());
                    };
                    if let Err(error) = self.handle_chat_event(event).await {
                        eprintln!("triage bridge event error: {error:#}");
                    }
                }
                _ = ticker.tick() => {
                    match self.run_reconcile_pass().await {
                        Ok(report) => {
                            if !report.is_empty() {
                                println!(
                                    "triage bridge reconcile: checked={} commits={} closed={} failed={}",
                                    report.issues_checked,
                                    report.commits_recorded,
                                    report.issues_closed,
                                    report.failed_issues,
                                );
                            }
                        }
                        Err(error) => eprintln!("triage bridge reconcile pass error: {error:#}"),
                    }
                }
            }
        }
    }

    pub async fn handle_chat_event(&mut self, event: ChatEvent) -> Result<()> {
        match event {
            ChatEvent::MessageCreated(message) => self.handle_message_created(message).await,
            ChatEvent::InteractionCreated(interaction) => {
                self.handle_interaction(interaction).await
            }
        }
    }

    /// The interaction router: context commands go to the comment workflow;
    /// everything else decodes an action token. A token that fails to
    /// decode is a no-op, never an error surface.
    pub async fn handle_interaction(&mut self, interaction: ChatInteraction) -> Result<()> {
        if interaction.kind == InteractionKind::MessageContext {
            if interaction.command_name.as_deref() == Some(self.config.context_command_name.as_str())
            {
                self.log_inbound(&interaction, "context_command")?;
                return self.handle_context_command(&interaction).await;
            }
            return Ok(());
        }

        let Some(custom_id) = interaction.custom_id.clone() else {
            return Ok(());
        };
        let Some(token) = ActionToken::decode(&custom_id) else {
            return Ok(());
        };
        self.log_inbound(&interaction, token.step_name())?;

        match token {
            ActionToken::CreateIssue {
                kind,
                card_message_id,
            } => {
                self.offer_repository_picker(&interaction, kind, &card_message_id)
                    .await
            }
            ActionToken::PickRepository {
                kind,
                card_message_id,
            } => {
                self.offer_confirmation(&interaction, kind, &card_message_id)
                    .await
            }
            ActionToken::ConfirmIssue {
                kind,
                repository,
                card_message_id,
            } => {
                self.confirm_issue(&interaction, kind, &repository, &card_message_id)
                    .await
            }
            ActionToken::PickExistingIssue { message_id } => {
                self.offer_comment_confirmation(&interaction, &message_id)
                    .await
            }
            ActionToken::CommentExisting {
                repository,
                issue_number,
                message_id,
            } => {
                self.confirm_existing_comment(&interaction, &repository, issue_number, &message_id)
                    .await
            }
        }
    }

    fn log_inbound(&self, interaction: &ChatInteraction, step: &str) -> Result<()> {
        self.inbound_log.append(&json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "kind": "interaction",
            "step": step,
            "interaction_id": interaction.id,
            "channel_id": interaction.channel_id,
            "actor_id": interaction.user.as_ref().map(|user| user.id.clone()),
        }))
    }
}

#[cfg(test)]
mod tests;
