//! Normalized inbound chat events.
//!
//! Gateway dispatches arrive as loosely-typed JSON; this module narrows the
//! two dispatch kinds the correlation engine consumes into [`ChatEvent`].
//! Anything else maps to `None` and is dropped by the gateway loop.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::wire::{DiscordMessage, DiscordUser};

const INTERACTION_APPLICATION_COMMAND: u8 = 2;
const INTERACTION_MESSAGE_COMPONENT: u8 = 3;

const COMMAND_KIND_MESSAGE_CONTEXT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Button,
    SelectMenu,
    MessageContext,
}

/// One decoded interaction: a button press, a selection-menu choice, or a
/// message context-menu invocation.
#[derive(Debug, Clone)]
pub struct ChatInteraction {
    pub id: String,
    pub token: String,
    pub kind: InteractionKind,
    pub guild_id: Option<String>,
    pub channel_id: String,
    /// Action token carried by the pressed control, absent for commands.
    pub custom_id: Option<String>,
    /// Selected values for selection menus.
    pub values: Vec<String>,
    /// Command name for context-menu invocations.
    pub command_name: Option<String>,
    /// The message a context command was invoked on.
    pub target_message: Option<DiscordMessage>,
    /// The message the pressed component lives on.
    pub message: Option<DiscordMessage>,
    pub user: Option<DiscordUser>,
}

impl ChatInteraction {
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    MessageCreated(DiscordMessage),
    InteractionCreated(ChatInteraction),
}

#[derive(Debug, Deserialize)]
struct InteractionData {
    #[serde(default)]
    custom_id: Option<String>,
    #[serde(default)]
    component_type: Option<u8>,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type", default)]
    command_kind: Option<u8>,
    #[serde(default)]
    target_id: Option<String>,
    #[serde(default)]
    resolved: Option<ResolvedData>,
}

#[derive(Debug, Deserialize)]
struct ResolvedData {
    #[serde(default)]
    messages: HashMap<String, DiscordMessage>,
}

#[derive(Debug, Deserialize)]
struct InteractionMember {
    #[serde(default)]
    user: Option<DiscordUser>,
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    id: String,
    token: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    data: Option<InteractionData>,
    #[serde(default)]
    message: Option<DiscordMessage>,
    #[serde(default)]
    member: Option<InteractionMember>,
    #[serde(default)]
    user: Option<DiscordUser>,
}

/// Maps a gateway dispatch to a [`ChatEvent`]. Unknown dispatch kinds and
/// undecodable payloads produce `None`, never an error.
pub fn normalize_dispatch(dispatch_kind: &str, payload: &Value) -> Option<ChatEvent> {
    match dispatch_kind {
        "MESSAGE_CREATE" => {
            let message = serde_json::from_value::<DiscordMessage>(payload.clone()).ok()?;
            Some(ChatEvent::MessageCreated(message))
        }
        "INTERACTION_CREATE" => {
            let payload = serde_json::from_value::<InteractionPayload>(payload.clone()).ok()?;
            normalize_interaction(payload).map(ChatEvent::InteractionCreated)
        }
        _ => None,
    }
}

fn normalize_interaction(payload: InteractionPayload) -> Option<ChatInteraction> {
    let channel_id = payload.channel_id.filter(|id| !id.is_empty())?;
    let user = payload
        .member
        .and_then(|member| member.user)
        .or(payload.user);
    let data = payload.data?;

    let (kind, target_message) = match payload.kind {
        INTERACTION_MESSAGE_COMPONENT => {
            let kind = match data.component_type {
                Some(crate::wire::COMPONENT_SELECT_MENU) => InteractionKind::SelectMenu,
                _ => InteractionKind::Button,
            };
            (kind, None)
        }
        INTERACTION_APPLICATION_COMMAND => {
            if data.command_kind != Some(COMMAND_KIND_MESSAGE_CONTEXT) {
                return None;
            }
            let target = data.target_id.as_ref().and_then(|target_id| {
                data.resolved
                    .as_ref()
                    .and_then(|resolved| resolved.messages.get(target_id).cloned())
            });
            (InteractionKind::MessageContext, target)
        }
        _ => return None,
    };

    Some(ChatInteraction {
        id: payload.id,
        token: payload.token,
        kind,
        guild_id: payload.guild_id,
        channel_id,
        custom_id: data.custom_id,
        values: data.values,
        command_name: data.name,
        target_message,
        message: payload.message,
        user,
    })
}
