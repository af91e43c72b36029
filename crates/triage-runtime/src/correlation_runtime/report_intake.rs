//! Report intake: watches the configured report channels and replies to new
//! reports with an interactive card. Nothing is persisted here; a card the
//! user never acts on leaves no correlation record behind.

use anyhow::{Context, Result};
use serde_json::json;

use triage_core::current_unix_timestamp_ms;
use triage_discord::wire::{DiscordMessage, MessageCreatePayload, MessageEditPayload};

use super::{render, CorrelationRuntime};

impl CorrelationRuntime {
    pub(super) async fn handle_message_created(&mut self, message: DiscordMessage) -> Result<()> {
        if message.author_is_bot() {
            return Ok(());
        }
        if message
            .author
            .as_ref()
            .map(|author| author.id == self.bot_user_id)
            .unwrap_or(true)
        {
            return Ok(());
        }
        if !self.config.report_channel_ids.contains(&message.channel_id) {
            return Ok(());
        }

        self.inbound_log.append(&json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "kind": "report_message",
            "channel_id": message.channel_id,
            "message_id": message.id,
            "author_id": message.author.as_ref().map(|author| author.id.clone()),
        }))?;

        let embed = render::report_card_embed(&message);

        // The buttons carry the card's own message id, so the card is posted
        // first and the controls attached in a second edit.
        let reply = MessageCreatePayload {
            embeds: vec![embed.clone()],
            ..MessageCreatePayload::default()
        }
        .reply_to(&message.channel_id, &message.id);
        let card = self
            .discord
            .create_message(&message.channel_id, &reply)
            .await
            .context("failed to post report card")?;

        let rows = render::card_action_rows(&card.id);
        self.discord
            .edit_message(
                &message.channel_id,
                &card.id,
                &MessageEditPayload {
                    content: None,
                    embeds: Some(vec![embed]),
                    components: Some(rows),
                },
            )
            .await
            .context("failed to attach report card controls")?;

        // The discussion thread starts right away; confirm renames it once
        // an issue number exists. Failing to start one is not fatal to the
        // card.
        if let Some(author) = message.author.as_ref() {
            let thread_name = render::intake_thread_name(author.display_name());
            match self
                .discord
                .start_thread_from_message(
                    &message.channel_id,
                    &card.id,
                    &thread_name,
                    self.config.thread_auto_archive_minutes,
                )
                .await
            {
                Ok(thread) => {
                    let greeting =
                        MessageCreatePayload::text(&render::intake_thread_greeting(&author.id));
                    if let Err(error) = self.discord.create_message(&thread.id, &greeting).await {
                        eprintln!("triage bridge thread greeting failed: {error:#}");
                    }
                }
                Err(error) => {
                    eprintln!("triage bridge thread create failed: {error:#}");
                }
            }
        }

        self.outbound_log.append(&json!({
            "timestamp_unix_ms": current_unix_timestamp_ms(),
            "kind": "report_card",
            "channel_id": message.channel_id,
            "report_message_id": message.id,
            "card_message_id": card.id,
        }))?;
        Ok(())
    }
}
