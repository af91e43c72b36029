//! Process bootstrap for the triage bridge: parse configuration, construct
//! each component exactly once, wire the gateway event channel into the
//! correlation runtime, and run until ctrl-c.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tokio::sync::mpsc;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use triage_discord::gateway::default_intents;
use triage_discord::{run_gateway, DiscordApiClient, GatewayConfig};
use triage_runtime::run_correlation_bridge;

mod cli_args;

use cli_args::Cli;

/// Message context commands are application command type 3.
const COMMAND_KIND_MESSAGE_CONTEXT: u8 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.runtime_config();
    let discord = DiscordApiClient::new(
        cli.discord_api_base.clone(),
        cli.discord_token.clone(),
        cli.request_timeout_ms,
        cli.retry_max_attempts,
        cli.retry_base_delay_ms,
    )?;

    register_context_command(&cli, &discord).await;

    let (event_tx, event_rx) = mpsc::channel(256);
    let gateway_task = if cli.reconcile_once {
        drop(event_tx);
        None
    } else {
        let gateway_config = GatewayConfig {
            token: cli.discord_token.clone(),
            intents: default_intents(),
            reconnect_delay: Duration::from_millis(cli.reconnect_delay_ms),
        };
        let gateway_client = discord.clone();
        Some(tokio::spawn(async move {
            if let Err(error) = run_gateway(gateway_client, gateway_config, event_tx).await {
                eprintln!("triage bridge gateway terminated: {error:#}");
            }
        }))
    };

    println!(
        "triage bridge starting: owner={} repos={} channels={} poll_interval_ms={}",
        cli.tracker_owner,
        cli.allowed_repos.join(","),
        cli.report_channels.join(","),
        cli.poll_interval_ms,
    );

    let result = run_correlation_bridge(config, event_rx).await;
    if let Some(gateway_task) = gateway_task {
        gateway_task.abort();
    }
    result
}

async fn register_context_command(cli: &Cli, discord: &DiscordApiClient) {
    let (Some(application_id), Some(guild_id)) =
        (cli.discord_application_id.as_ref(), cli.discord_guild_id.as_ref())
    else {
        return;
    };
    let commands = json!([{
        "name": cli.context_command_name,
        "type": COMMAND_KIND_MESSAGE_CONTEXT,
    }]);
    match discord
        .register_guild_commands(application_id, guild_id, &commands)
        .await
    {
        Ok(_) => println!(
            "triage bridge registered context command '{}'",
            cli.context_command_name
        ),
        Err(error) => eprintln!("triage bridge command registration failed: {error:#}"),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
