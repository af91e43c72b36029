//! Gateway event source: connects, identifies, heartbeats, and forwards
//! normalized dispatches to the runtime over an mpsc channel.
//!
//! Connection management stays deliberately thin: no session resume, no
//! sharding. A dropped or invalidated session is re-identified after a
//! fixed reconnect delay.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::api_client::DiscordApiClient;
use crate::events::{normalize_dispatch, ChatEvent};

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;

pub const INTENT_GUILDS: u64 = 1 << 0;
pub const INTENT_GUILD_MESSAGES: u64 = 1 << 9;
pub const INTENT_MESSAGE_CONTENT: u64 = 1 << 15;

/// Intents the correlation engine needs: guild metadata, channel messages,
/// and message text for report bodies.
pub fn default_intents() -> u64 {
    INTENT_GUILDS | INTENT_GUILD_MESSAGES | INTENT_MESSAGE_CONTENT
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub token: String,
    pub intents: u64,
    pub reconnect_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct GatewayEnvelope {
    op: u8,
    #[serde(default)]
    d: Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

/// Runs the gateway loop until the event receiver is dropped. Each failed
/// session logs and reconnects after the configured delay.
pub async fn run_gateway(
    client: DiscordApiClient,
    config: GatewayConfig,
    events: mpsc::Sender<ChatEvent>,
) -> Result<()> {
    loop {
        let socket_url = match client.gateway_url().await {
            Ok(url) => url,
            Err(error) => {
                eprintln!("discord gateway url lookup failed: {error}");
                tokio::time::sleep(config.reconnect_delay).await;
                continue;
            }
        };

        println!("discord gateway connected");
        if let Err(error) = run_gateway_session(&socket_url, &config, &events).await {
            eprintln!("discord gateway session error: {error}");
        }
        if events.is_closed() {
            return Ok(());
        }
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn run_gateway_session(
    socket_url: &str,
    config: &GatewayConfig,
    events: &mpsc::Sender<ChatEvent>,
) -> Result<()> {
    let url = format!("{}/?v=10&encoding=json", socket_url.trim_end_matches('/'));
    let (stream, _response) = connect_async(&url)
        .await
        .with_context(|| "failed to connect discord gateway websocket")?;
    let (mut sink, mut source) = stream.split();

    // The first frame must be hello; it sets the heartbeat cadence.
    let hello = loop {
        let message = source
            .next()
            .await
            .ok_or_else(|| anyhow!("discord gateway closed before hello"))?
            .context("failed reading discord gateway message")?;
        if let Some(envelope) = parse_gateway_envelope(message)? {
            break envelope;
        }
    };
    if hello.op != OP_HELLO {
        bail!("discord gateway sent op {} before hello", hello.op);
    }
    let heartbeat_interval_ms = hello
        .d
        .get("heartbeat_interval")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("discord gateway hello missing heartbeat_interval"))?;

    send_envelope(&mut sink, &identify_payload(&config.token, config.intents)).await?;

    let mut last_sequence: Option<u64> = None;
    let mut heartbeat = tokio::time::interval(Duration::from_millis(heartbeat_interval_ms.max(1_000)));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                send_envelope(&mut sink, &heartbeat_payload(last_sequence)).await?;
            }
            maybe_message = source.next() => {
                let Some(message_result) = maybe_message else {
                    return Ok(());
                };
                let message = message_result.context("failed reading discord gateway message")?;
                let Some(envelope) = parse_gateway_envelope(message)? else {
                    continue;
                };
                match envelope.op {
                    OP_DISPATCH => {
                        if let Some(sequence) = envelope.s {
                            last_sequence = Some(sequence);
                        }
                        let Some(kind) = envelope.t.as_deref() else {
                            continue;
                        };
                        if let Some(event) = normalize_dispatch(kind, &envelope.d) {
                            if events.send(event).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                    OP_HEARTBEAT => {
                        send_envelope(&mut sink, &heartbeat_payload(last_sequence)).await?;
                    }
                    OP_RECONNECT | OP_INVALID_SESSION => {
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn send_envelope<S>(sink: &mut S, payload: &Value) -> Result<()>
where
    S: futures_util::Sink<WsMessage> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    sink.send(WsMessage::Text(payload.to_string().into()))
        .await
        .context("failed to send discord gateway frame")
}

fn identify_payload(token: &str, intents: u64) -> Value {
    json!({
        "op": 2,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "triage-report-bridge",
                "device": "triage-report-bridge",
            },
        },
    })
}

fn heartbeat_payload(last_sequence: Option<u64>) -> Value {
    json!({ "op": 1, "d": last_sequence })
}

fn parse_gateway_envelope(message: WsMessage) -> Result<Option<GatewayEnvelope>> {
    match message {
        WsMessage::Text(text) => {
            let envelope = serde_json::from_str::<GatewayEnvelope>(&text)
                .context("failed to parse discord gateway envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Binary(bytes) => {
            let text = String::from_utf8(bytes.to_vec())
                .context("invalid utf-8 discord gateway payload")?;
            let envelope = serde_json::from_str::<GatewayEnvelope>(&text)
                .context("failed to parse discord gateway envelope")?;
            Ok(Some(envelope))
        }
        WsMessage::Ping(_) | WsMessage::Pong(_) => Ok(None),
        WsMessage::Close(_) => Ok(None),
        WsMessage::Frame(_) => Ok(None),
    }
}
