//! Existing-issue workflow: relays a chat message into a comment on an open
//! tracker issue, triggered from a message context command.

use anyhow::{Context, Result};
use serde_json::json;

use triage_core::current_unix_timestamp_ms;
use triage_discord::wire::{
    DiscordActionRow, DiscordComponent, DiscordSelectOption, InteractionResponsePayload,
    BUTTON_STYLE_SUCCESS,
};
use triage_discord::ChatInteraction;
use triage_github::RepoRef;

use super::{render, ActionToken, CorrelationRuntime};

impl CorrelationRuntime {
    /// Entry point for the context command. A message inside an
    /// already-linked thread resolves directly through the store; anywhere
    /// else the user picks from up to the configured page size of open
    /// issues across the allow-listed repositories.
    pub(super) async fn handle_context_command(
        &mut self,
        interaction: &ChatInteraction,
    ) -> Result<()> {
        let Some(target) = interaction.target_message.as_ref() else {
            return Ok(());
        };

        if let Some((_, link)) = self.store.link_for_thread(&interaction.channel_id) {
            let confirm = DiscordComponent::button(
                BUTTON_STYLE_SUCCESS,
                "Add comment",
                &ActionToken::CommentExisting {
                    repository: link.issue.repo.clone(),
                    issue_number: link.issue.number,
                    message_id: target.id.clone(),
                }
                .encode(),
            );
            let payload = InteractionResponsePayload::ephemeral_message(
                &format!(
                    "This thread is linked to tracker issue #{}. Add the message as a comment?",
                    link.issue.number
                ),
                Some(vec![DiscordActionRow::of(vec![confirm])]),
            );
            return self
                .discord
                .respond_to_interaction(&interaction.id, &interaction.token, &payload)
                .await;
        }

        let page_size = self.config.open_issue_page_size.max(1);
        let mut options = Vec::new();
        for repo_name in self.config.allowed_repos.clone() {
            if options.len() >= page_size {
                break;
            }
            let repo = RepoRef::new(&self.config.tracker_owner, &repo_name);
            let issues = self
                .github
                .list_open_issues(&repo, page_size - options.len())
                .await
                .with_context(|| format!("failed to list open issues for {}", repo.as_slug()))?;
            for issue in issues {
                if options.len() >= page_size {
                    break;
                }
                options.push(DiscordSelectOption {
                    label: render::open_issue_option_label(issue.number, &issue.title),
                    value: format!("{repo_name}#{}", issue.number),
                });
            }
        }

        if options.is_empty() {
            let payload = InteractionResponsePayload::ephemeral_message(
                "No open tracker issues are available to comment on.",
                None,
            );
            return self
                .discord
                .respond_to_interaction(&interaction.id, &interaction.token, &payload)
                .await;
        }

        let menu = DiscordComponent::select_menu(
            &ActionToken::PickExistingIssue {
                message_id: target.id.clone(),
            }
            .encode(),
            "Select an open issue",
            options,
        );
        let payload = InteractionResponsePayload::ephemeral_message(
            "Select the tracker issue to comment on:",
            Some(vec![DiscordActionRow::of(vec![menu])]),
        );
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &payload)
            .await
    }

    /// Selection step: swaps the issue picker for a confirm button bound to
    /// the chosen `repo#number`.
    pub(super) async fn offer_comment_confirmation(
        &mut self,
        interaction: &ChatInteraction,
        message_id: &str,
    ) -> Result<()> {
        let Some(selected) = interaction.first_value() else {
            return Ok(());
        };
        let Some((repository, issue_number)) = parse_issue_choice(selected) else {
            return Ok(());
        };
        if !self
            .config
            .allowed_repos
            .iter()
            .any(|allowed| allowed == &repository)
        {
            return Ok(());
        }

        let confirm = DiscordComponent::button(
            BUTTON_STYLE_SUCCESS,
            "Add comment",
            &ActionToken::CommentExisting {
                repository: repository.clone(),
                issue_number,
                message_id: message_id.to_string(),
            }
            .encode(),
        );
        let payload = InteractionResponsePayload::update_message(
            &format!("Confirm adding the message as a comment on {repository}#{issue_number}."),
            vec![DiscordActionRow::of(vec![confirm])],
        );
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &payload)
            .await
    }

    /// Terminal step: posts the original message text (falling back to its
    /// embed description) as a tracker comment. The acknowledgment is a
    /// link-free confirmation string; a tracker failure acknowledges too
    /// instead of leaving the user guessing.
    pub(super) async fn confirm_existing_comment(
        &mut self,
        interaction: &ChatInteraction,
        repository: &str,
        issue_number: u64,
        message_id: &str,
    ) -> Result<()> {
        let message = self
            .discord
            .fetch_message(&interaction.channel_id, message_id)
            .await
            .context("failed to fetch message for comment relay")?;
        let text = if !message.content.trim().is_empty() {
            message.content.clone()
        } else {
            message
                .embeds
                .first()
                .and_then(|embed| embed.description.clone())
                .unwrap_or_default()
        };
        if text.trim().is_empty() {
            let payload = InteractionResponsePayload::update_message(
                "That message has no text to relay.",
                Vec::new(),
            );
            return self
                .discord
                .respond_to_interaction(&interaction.id, &interaction.token, &payload)
                .await;
        }

        let author_name = message
            .author
            .as_ref()
            .map(|author| author.display_name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let body = render::relayed_comment_body(&author_name, &text);
        let repo = RepoRef::new(&self.config.tracker_owner, repository);

        let ack = match self.github.create_comment(&repo, issue_number, &body).await {
            Ok(_) => {
                self.outbound_log.append(&json!({
                    "timestamp_unix_ms": current_unix_timestamp_ms(),
                    "kind": "comment_relayed",
                    "repository": repo.as_slug(),
                    "issue_number": issue_number,
                    "message_id": message_id,
                }))?;
                format!("Comment added to issue #{issue_number}.")
            }
            Err(error) => {
                eprintln!("triage bridge comment relay failed: {error:#}");
                "Could not add the comment; the tracker call failed.".to_string()
            }
        };
        let payload = InteractionResponsePayload::update_message(&ack, Vec::new());
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &payload)
            .await
    }
}

fn parse_issue_choice(raw: &str) -> Option<(String, u64)> {
    let (repository, number) = raw.split_once('#')?;
    if repository.is_empty() {
        return None;
    }
    Some((repository.to_string(), number.parse().ok()?))
}
