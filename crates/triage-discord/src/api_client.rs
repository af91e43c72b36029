//! Discord REST client used by intake, workflows, and the reconcile poller.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::transport::{
    is_retryable_discord_status, is_retryable_transport_error, parse_retry_after, retry_delay,
};
use crate::wire::{
    DiscordChannel, DiscordMessage, DiscordUser, InteractionResponsePayload, MessageCreatePayload,
    MessageEditPayload,
};
use triage_core::truncate_for_error;

#[derive(Debug, Clone, serde::Deserialize)]
struct GatewayUrlResponse {
    url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GuildMember {
    #[serde(default)]
    pub user: Option<DiscordUser>,
}

#[derive(Clone)]
pub struct DiscordApiClient {
    http: reqwest::Client,
    api_base: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl DiscordApiClient {
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
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let auth_header = format!("Bot {}", token.trim());
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&auth_header)
                .context("invalid discord authorization header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord api client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            retry_max_attempts: retry_max_attempts.max(1),
            retry_base_delay_ms: retry_base_delay_ms.max(1),
        })
    }

    pub async fn gateway_url(&self) -> Result<String> {
        let response: GatewayUrlResponse = self
            .request_json("get gateway", || {
                self.http.get(format!("{}/gateway", self.api_base))
            })
            .await?;
        Ok(response.url)
    }

    pub async fn current_user(&self) -> Result<DiscordUser> {
        self.request_json("get current user", || {
            self.http.get(format!("{}/users/@me", self.api_base))
        })
        .await
    }

    pub async fn create_message(
        &self,
        channel_id: &str,
        payload: &MessageCreatePayload,
    ) -> Result<DiscordMessage> {
        self.request_json("create message", || {
            self.http
                .post(format!("{}/channels/{}/messages", self.api_base, channel_id))
                .json(payload)
        })
        .await
    }

    pub async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        payload: &MessageEditPayload,
    ) -> Result<DiscordMessage> {
        self.request_json("edit message", || {
            self.http
                .patch(format!(
                    "{}/channels/{}/messages/{}",
                    self.api_base, channel_id, message_id
                ))
                .json(payload)
        })
        .await
    }

    pub async fn fetch_message(&self, channel_id: &str, message_id: &str) -> Result<DiscordMessage> {
        self.request_json("fetch message", || {
            self.http.get(format!(
                "{}/channels/{}/messages/{}",
                self.api_base, channel_id, message_id
            ))
        })
        .await
    }

    pub async fn fetch_channel(&self, channel_id: &str) -> Result<DiscordChannel> {
        self.request_json("fetch channel", || {
            self.http
                .get(format!("{}/channels/{}", self.api_base, channel_id))
        })
        .await
    }

    pub async fn start_thread_from_message(
        &self,
        channel_id: &str,
        message_id: &str,
        name: &str,
        auto_archive_minutes: u32,
    ) -> Result<DiscordChannel> {
        let payload = json!({
            "name": name,
            "auto_archive_duration": auto_archive_minutes,
        });
        self.request_json("start thread", || {
            self.http
                .post(format!(
                    "{}/channels/{}/messages/{}/threads",
                    self.api_base, channel_id, message_id
                ))
                .json(&payload)
        })
        .await
    }

    pub async fn rename_thread(&self, thread_id: &str, name: &str) -> Result<DiscordChannel> {
        let payload = json!({ "name": name });
        self.request_json("rename thread", || {
            self.http
                .patch(format!("{}/channels/{}", self.api_base, thread_id))
                .json(&payload)
        })
        .await
    }

    pub async fn archive_thread(&self, thread_id: &str) -> Result<DiscordChannel> {
        let payload = json!({ "archived": true });
        self.request_json("archive thread", || {
            self.http
                .patch(format!("{}/channels/{}", self.api_base, thread_id))
                .json(&payload)
        })
        .await
    }

    /// Acknowledges an interaction. Discord answers 204 with no body.
    pub async fn respond_to_interaction(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        payload: &InteractionResponsePayload,
    ) -> Result<()> {
        self.request_empty("interaction callback", || {
            self.http
                .post(format!(
                    "{}/interactions/{}/{}/callback",
                    self.api_base, interaction_id, interaction_token
                ))
                .json(payload)
        })
        .await
    }

    pub async fn list_guild_members(&self, guild_id: &str, limit: usize) -> Result<Vec<GuildMember>> {
        let limit_value = limit.clamp(1, 1000).to_string();
        self.request_json("list guild members", || {
            self.http
                .get(format!("{}/guilds/{}/members", self.api_base, guild_id))
                .query(&[("limit", limit_value.as_str())])
        })
        .await
    }

    /// Overwrites the guild-scoped application commands (used at startup to
    /// register the message context command).
    pub async fn register_guild_commands(
        &self,
        application_id: &str,
        guild_id: &str,
        commands: &Value,
    ) -> Result<Vec<Value>> {
        self.request_json("register guild commands", || {
            self.http
                .put(format!(
                    "{}/applications/{}/guilds/{}/commands",
                    self.api_base, application_id, guild_id
                ))
                .json(commands)
        })
        .await
    }

    async fn request_json<T, F>(&self, operation: &str, request_builder: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let response = self.request_raw(operation, request_builder).await?;
        response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode discord {operation}"))
    }

    async fn request_empty<F>(&self, operation: &str, request_builder: F) -> Result<()>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        self.request_raw(operation, request_builder).await?;
        Ok(())
    }

    async fn request_raw<F>(&self, operation: &str, mut request_builder: F) -> Result<reqwest::Response>
    where
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
                        return Ok(response);
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts
                        && is_retryable_discord_status(status.as_u16())
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
                        "discord api {operation} failed with status {}: {}",
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
                        .with_context(|| format!("discord api {operation} request failed"));
                }
            }
        }
    }
}
