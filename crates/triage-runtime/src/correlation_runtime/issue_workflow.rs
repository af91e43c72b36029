//! New-issue workflow: the client-driven state machine from create press to
//! linked issue. Each step re-enters through the interaction router with a
//! token; the card itself is the source of truth for report content.

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use triage_core::current_unix_timestamp_ms;
use triage_discord::wire::{
    disable_buttons, DiscordActionRow, DiscordComponent, DiscordSelectOption,
    InteractionResponsePayload, MessageCreatePayload, MessageEditPayload, BUTTON_STYLE_SUCCESS,
};
use triage_discord::ChatInteraction;
use triage_github::RepoRef;
use triage_store::{DiscussionThread, ReportKind, ReportMessage, TrackerIssue};

use super::{render, ActionToken, CorrelationRuntime};

impl CorrelationRuntime {
    /// `Initiated → RepositorySelectionPending`: replaces the card controls
    /// with an ephemeral repository picker scoped to the allow-list.
    pub(super) async fn offer_repository_picker(
        &mut self,
        interaction: &ChatInteraction,
        kind: ReportKind,
        card_message_id: &str,
    ) -> Result<()> {
        let options = self
            .config
            .allowed_repos
            .iter()
            .map(|repo| DiscordSelectOption {
                label: repo.clone(),
                value: repo.clone(),
            })
            .collect::<Vec<_>>();
        let menu = DiscordComponent::select_menu(
            &ActionToken::PickRepository {
                kind,
                card_message_id: card_message_id.to_string(),
            }
            .encode(),
            "Select a repository",
            options,
        );
        let payload = InteractionResponsePayload::ephemeral_message(
            &format!("Select a repository for this {} issue:", kind.as_str()),
            Some(vec![DiscordActionRow::of(vec![menu])]),
        );
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &payload)
            .await
    }

    /// `RepositorySelectionPending → ConfirmationPending`: swaps the picker
    /// for a confirm button carrying the chosen repository.
    pub(super) async fn offer_confirmation(
        &mut self,
        interaction: &ChatInteraction,
        kind: ReportKind,
        card_message_id: &str,
    ) -> Result<()> {
        let Some(repository) = interaction.first_value() else {
            return Ok(());
        };
        if !self.is_allowed_repo(repository) {
            let payload = InteractionResponsePayload::update_message(
                &format!("Repository **{repository}** is not on the allow-list."),
                Vec::new(),
            );
            return self
                .discord
                .respond_to_interaction(&interaction.id, &interaction.token, &payload)
                .await;
        }

        let confirm = DiscordComponent::button(
            BUTTON_STYLE_SUCCESS,
            "Confirm issue creation",
            &ActionToken::ConfirmIssue {
                kind,
                repository: repository.to_string(),
                card_message_id: card_message_id.to_string(),
            }
            .encode(),
        );
        let payload = InteractionResponsePayload::update_message(
            &format!(
                "You selected **{repository}**. Confirm to create the {} issue.",
                kind.as_str()
            ),
            vec![DiscordActionRow::of(vec![confirm])],
        );
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &payload)
            .await
    }

    /// `ConfirmationPending → IssueLinked`: the terminal transition. The
    /// store is consulted first so a re-confirm can never file twice; after
    /// the tracker call the correlation record and chat-side state are
    /// brought in line. Failures past issue creation leave the documented
    /// inconsistency window; the tracker side has no compensating delete.
    pub(super) async fn confirm_issue(
        &mut self,
        interaction: &ChatInteraction,
        kind: ReportKind,
        repository: &str,
        card_message_id: &str,
    ) -> Result<()> {
        if let Some(link) = self.store.link(card_message_id) {
            let payload = InteractionResponsePayload::update_message(
                &format!(
                    "This report is already linked to tracker issue #{} ({}).",
                    link.issue.number, link.issue.html_url
                ),
                Vec::new(),
            );
            return self
                .discord
                .respond_to_interaction(&interaction.id, &interaction.token, &payload)
                .await;
        }
        if !self.is_allowed_repo(repository) {
            return Ok(());
        }

        // The rendered card is the source of truth for report content.
        let card = self
            .discord
            .fetch_message(&interaction.channel_id, card_message_id)
            .await
            .context("failed to re-fetch report card")?;
        let embed = card
            .embeds
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("report card {card_message_id} has no embed"))?;
        let report_body = embed
            .description
            .clone()
            .filter(|description| !description.trim().is_empty())
            .unwrap_or_else(|| "No description provided".to_string());
        let author_name = embed
            .author
            .as_ref()
            .map(|author| author.name.clone())
            .unwrap_or_else(|| "Unknown user".to_string());

        // The true author id comes from the message the card replied to;
        // degraded to "unknown" when the original is gone.
        let original = match card
            .message_reference
            .as_ref()
            .and_then(|reference| reference.message_id.clone())
        {
            Some(original_id) => self
                .discord
                .fetch_message(&interaction.channel_id, &original_id)
                .await
                .ok(),
            None => None,
        };
        let author_id = match original
            .as_ref()
            .and_then(|message| message.author.as_ref())
        {
            Some(author) => author.id.clone(),
            None => {
                eprintln!("triage bridge could not resolve report author for card {card_message_id}");
                "unknown".to_string()
            }
        };
        let original_message_id = original
            .as_ref()
            .map(|message| message.id.clone())
            .unwrap_or_else(|| card.id.clone());

        let guild = interaction.guild_id.as_deref().unwrap_or("@me");
        let jump_link = format!(
            "https://discord.com/channels/{}/{}/{}",
            guild, interaction.channel_id, original_message_id
        );

        let title = render::derive_issue_title(kind, &report_body);
        let body = render::issue_body(&author_name, &report_body, &jump_link);
        let repo = RepoRef::new(&self.config.tracker_owner, repository);
        let issue = self
            .github
            .create_issue(&repo, &title, &body, &[kind.issue_label()])
            .await
            .context("tracker issue creation failed")?;

        let report = ReportMessage {
            message_id: original_message_id,
            channel_id: interaction.channel_id.clone(),
            author_id: author_id.clone(),
            content: report_body.clone(),
            kind,
        };
        let tracker_issue = TrackerIssue {
            owner: repo.owner.clone(),
            repo: repo.name.clone(),
            number: issue.number,
            title: title.clone(),
            html_url: issue.html_url.clone(),
            labels: vec![kind.issue_label().to_string()],
            closed: false,
        };
        if self.store.link_report(card_message_id, report, tracker_issue, None) {
            self.store.save()?;
        } else {
            eprintln!(
                "triage bridge confirm raced for card {card_message_id}: tracker issue #{} left unlinked",
                issue.number
            );
        }

        let ack = InteractionResponsePayload::update_message(
            &format!(
                "{} issue created for **{repository}**: [#{}]({})",
                kind.title_prefix(),
                issue.number,
                issue.html_url
            ),
            Vec::new(),
        );
        self.discord
            .respond_to_interaction(&interaction.id, &interaction.token, &ack)
            .await?;

        // Terminal card state: recolored embed, issue link field, controls
        // disabled.
        let linked_embed = render::linked_card_embed(&embed, issue.number, &issue.html_url);
        let disabled = disable_buttons(&card.components);
        self.discord
            .edit_message(
                &interaction.channel_id,
                &card.id,
                &MessageEditPayload {
                    content: None,
                    embeds: Some(vec![linked_embed]),
                    components: Some(disabled),
                },
            )
            .await
            .context("failed to disable report card controls")?;

        let thread_name = render::thread_name(issue.number, &report_body, 0);
        let thread = match card.thread.as_ref() {
            Some(thread) => self
                .discord
                .rename_thread(&thread.id, &thread_name)
                .await
                .context("failed to rename discussion thread")?,
            None => self
                .discord
                .start_thread_from_message(
                    &interaction.channel_id,
                    &card.id,
                    &thread_name,
                    self.config.thread_auto_archive_minutes,
                )
                .await
                .context("failed to start discussion thread")?,
        };
        if self.store.attach_thread(
            card_message_id,
            DiscussionThread {
                thread_id: thread.id.clone(),
                name: thread_name,
            },
        ) {
            self.store.save()?;
        }

        let announcement =
            MessageCreatePayload::text(&render::thread_announcement(&author_id, issue.number, &issue.html_url));
        self.discord
            .create_message(&thread.id, &announcement)
            .await
            .context("failed to announce issue in discussion thread")?;

        self.outbound_log.append(&json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "kind": "issue_linked",
            "card_message_id": card_message_id,
            "repository": repo.as_slug(),
            "issue_number": issue.number,
            "issue_url": issue.html_url,
            "thread_id": thread.id,
        }))?;
        Ok(())
    }

    fn is_allowed_repo(&self, repository: &str) -> bool {
        self.config
            .allowed_repos
            .iter()
            .any(|allowed| allowed == repository)
    }
}
