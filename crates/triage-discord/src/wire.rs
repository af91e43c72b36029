//! Wire types for the subset of the Discord REST/gateway API the bridge
//! touches. Components round-trip (fetched messages are edited back with
//! their controls disabled), so they serialize and deserialize.

use serde::{Deserialize, Serialize};

pub const COMPONENT_ACTION_ROW: u8 = 1;
pub const COMPONENT_BUTTON: u8 = 2;
pub const COMPONENT_SELECT_MENU: u8 = 3;

pub const BUTTON_STYLE_PRIMARY: u8 = 1;
pub const BUTTON_STYLE_SUCCESS: u8 = 3;
pub const BUTTON_STYLE_DANGER: u8 = 4;

/// Interaction callback types.
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_UPDATE_MESSAGE: u8 = 7;

/// Message flag marking a response visible only to the invoking user.
pub const FLAG_EPHEMERAL: u64 = 1 << 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl DiscordUser {
    /// Preferred display name: global name when set, else the username.
    pub fn display_name(&self) -> &str {
        self.global_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordEmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordEmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordEmbed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<DiscordEmbedAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<DiscordEmbedField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordSelectOption {
    pub label: String,
    pub value: String,
}

/// One interactive control inside an action row. Discord discriminates by
/// the numeric `type` field; unused fields stay `None` per control kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordComponent {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<DiscordSelectOption>>,
}

impl DiscordComponent {
    pub fn button(style: u8, label: &str, custom_id: &str) -> Self {
        Self {
            kind: COMPONENT_BUTTON,
            style: Some(style),
            label: Some(label.to_string()),
            custom_id: Some(custom_id.to_string()),
            disabled: None,
            placeholder: None,
            options: None,
        }
    }

    pub fn select_menu(custom_id: &str, placeholder: &str, options: Vec<DiscordSelectOption>) -> Self {
        Self {
            kind: COMPONENT_SELECT_MENU,
            style: None,
            label: None,
            custom_id: Some(custom_id.to_string()),
            disabled: None,
            placeholder: Some(placeholder.to_string()),
            options: Some(options),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordActionRow {
    #[serde(rename = "type")]
    pub kind: u8,
    pub components: Vec<DiscordComponent>,
}

impl DiscordActionRow {
    pub fn of(components: Vec<DiscordComponent>) -> Self {
        Self {
            kind: COMPONENT_ACTION_ROW,
            components,
        }
    }
}

/// Rebuilds action rows with every button disabled, preserving labels and
/// custom ids so a terminal card still shows what was offered.
pub fn disable_buttons(rows: &[DiscordActionRow]) -> Vec<DiscordActionRow> {
    rows.iter()
        .map(|row| DiscordActionRow {
            kind: row.kind,
            components: row
                .components
                .iter()
                .map(|component| {
                    let mut component = component.clone();
                    if component.kind == COMPONENT_BUTTON {
                        component.disabled = Some(true);
                    }
                    component
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordMessageReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordThreadMetadata {
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub thread_metadata: Option<DiscordThreadMetadata>,
}

impl DiscordChannel {
    pub fn is_archived_or_locked(&self) -> bool {
        self.thread_metadata
            .as_ref()
            .map(|meta| meta.archived || meta.locked)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub author: Option<DiscordUser>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<DiscordEmbed>,
    #[serde(default)]
    pub components: Vec<DiscordActionRow>,
    #[serde(default)]
    pub message_reference: Option<DiscordMessageReference>,
    /// Thread started from this message, when the API includes it.
    #[serde(default)]
    pub thread: Option<DiscordChannel>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl DiscordMessage {
    pub fn author_is_bot(&self) -> bool {
        self.author.as_ref().map(|author| author.bot).unwrap_or(false)
    }

    /// Jump link back to this message, used in tracker issue bodies.
    pub fn jump_link(&self) -> String {
        let guild = self.guild_id.as_deref().unwrap_or("@me");
        format!(
            "https://discord.com/channels/{}/{}/{}",
            guild, self.channel_id, self.id
        )
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageCreatePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<DiscordEmbed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<DiscordActionRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<DiscordMessageReference>,
}

impl MessageCreatePayload {
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            ..Self::default()
        }
    }

    pub fn reply_to(mut self, channel_id: &str, message_id: &str) -> Self {
        self.message_reference = Some(DiscordMessageReference {
            message_id: Some(message_id.to_string()),
            channel_id: Some(channel_id.to_string()),
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageEditPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeds: Option<Vec<DiscordEmbed>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<DiscordActionRow>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InteractionResponseData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<DiscordActionRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InteractionResponsePayload {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionResponseData>,
}

impl InteractionResponsePayload {
    /// Ephemeral channel message visible only to the invoking user.
    pub fn ephemeral_message(content: &str, components: Option<Vec<DiscordActionRow>>) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(InteractionResponseData {
                content: Some(content.to_string()),
                components,
                flags: Some(FLAG_EPHEMERAL),
            }),
        }
    }

    /// In-place update of the message the component lives on.
    pub fn update_message(content: &str, components: Vec<DiscordActionRow>) -> Self {
        Self {
            kind: RESPONSE_UPDATE_MESSAGE,
            data: Some(InteractionResponseData {
                content: Some(content.to_string()),
                components: Some(components),
                flags: None,
            }),
        }
    }
}
