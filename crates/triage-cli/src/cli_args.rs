use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use triage_runtime::CorrelationRuntimeConfig;

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "triage-bridge",
    about = "Correlates chat problem reports with tracker issues and keeps both in sync",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "TRIAGE_STATE_DIR",
        default_value = ".triage",
        help = "Directory for correlation state and event logs"
    )]
    pub state_dir: PathBuf,

    #[arg(long, env = "DISCORD_TOKEN", help = "Discord bot token")]
    pub discord_token: String,

    #[arg(
        long,
        env = "TRIAGE_DISCORD_API_BASE",
        default_value = "https://discord.com/api/v10",
        help = "Discord REST base URL"
    )]
    pub discord_api_base: String,

    #[arg(
        long,
        env = "DISCORD_APPLICATION_ID",
        help = "Application id used for context command registration"
    )]
    pub discord_application_id: Option<String>,

    #[arg(
        long,
        env = "DISCORD_GUILD_ID",
        help = "Guild the context command is registered in"
    )]
    pub discord_guild_id: Option<String>,

    #[arg(long, env = "GITHUB_TOKEN", help = "Tracker API token")]
    pub github_token: String,

    #[arg(
        long,
        env = "TRIAGE_GITHUB_API_BASE",
        default_value = "https://api.github.com",
        help = "Tracker REST base URL"
    )]
    pub github_api_base: String,

    #[arg(
        long,
        env = "TRIAGE_TRACKER_OWNER",
        help = "Tracker organization owning the allow-listed repositories"
    )]
    pub tracker_owner: String,

    #[arg(
        long = "allowed-repo",
        env = "TRIAGE_ALLOWED_REPOS",
        value_delimiter = ',',
        required = true,
        help = "Repository a report may be filed against (repeatable)"
    )]
    pub allowed_repos: Vec<String>,

    #[arg(
        long = "report-channel",
        env = "TRIAGE_REPORT_CHANNELS",
        value_delimiter = ',',
        required = true,
        help = "Channel id watched for new reports (repeatable)"
    )]
    pub report_channels: Vec<String>,

    #[arg(
        long,
        env = "TRIAGE_BOT_USER_ID",
        help = "Bot user id; skips the startup users/@me lookup when set"
    )]
    pub bot_user_id: Option<String>,

    #[arg(
        long,
        env = "TRIAGE_CONTEXT_COMMAND_NAME",
        default_value = "Link to Tracker Issue",
        help = "Display name of the message context command"
    )]
    pub context_command_name: String,

    #[arg(
        long,
        env = "TRIAGE_OPEN_ISSUE_PAGE_SIZE",
        default_value_t = 20,
        value_parser = parse_positive_usize,
        help = "Maximum open issues offered in the comment workflow picker"
    )]
    pub open_issue_page_size: usize,

    #[arg(
        long,
        env = "TRIAGE_POLL_INTERVAL_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Reconcile poll interval in milliseconds"
    )]
    pub poll_interval_ms: u64,

    #[arg(
        long,
        env = "TRIAGE_RECONCILE_ONCE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Run a single reconcile pass and exit"
    )]
    pub reconcile_once: bool,

    #[arg(
        long,
        env = "TRIAGE_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for chat and tracker calls"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "TRIAGE_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Maximum attempts per chat/tracker request"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long,
        env = "TRIAGE_RETRY_BASE_DELAY_MS",
        default_value_t = 250,
        value_parser = parse_positive_u64,
        help = "Base retry backoff in milliseconds"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long,
        env = "TRIAGE_RECONNECT_DELAY_MS",
        default_value_t = 5_000,
        value_parser = parse_positive_u64,
        help = "Delay before the gateway reconnects after a dropped session"
    )]
    pub reconnect_delay_ms: u64,

    #[arg(
        long,
        env = "TRIAGE_THREAD_AUTO_ARCHIVE_MINUTES",
        default_value_t = 1440,
        help = "Auto-archive window for discussion threads"
    )]
    pub thread_auto_archive_minutes: u32,
}

impl Cli {
    pub fn runtime_config(&self) -> CorrelationRuntimeConfig {
        CorrelationRuntimeConfig {
            state_dir: self.state_dir.clone(),
            discord_api_base: self.discord_api_base.clone(),
            discord_token: self.discord_token.clone(),
            github_api_base: self.github_api_base.clone(),
            github_token: self.github_token.clone(),
            tracker_owner: self.tracker_owner.clone(),
            allowed_repos: self.allowed_repos.clone(),
            report_channel_ids: self.report_channels.clone(),
            bot_user_id: self.bot_user_id.clone(),
            context_command_name: self.context_command_name.clone(),
            open_issue_page_size: self.open_issue_page_size,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_once: self.reconcile_once,
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
            thread_auto_archive_minutes: self.thread_auto_archive_minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    fn base_args() -> Vec<&'static str> {
        vec![
            "triage-bridge",
            "--discord-token",
            "bot-token",
            "--github-token",
            "gh-token",
            "--tracker-owner",
            "acme",
            "--allowed-repo",
            "backend,frontend",
            "--report-channel",
            "chan-report",
        ]
    }

    #[test]
    fn unit_cli_parses_required_and_defaulted_values() {
        let cli = Cli::try_parse_from(base_args()).expect("parse");
        assert_eq!(cli.tracker_owner, "acme");
        assert_eq!(cli.allowed_repos, vec!["backend", "frontend"]);
        assert_eq!(cli.report_channels, vec!["chan-report"]);
        assert_eq!(cli.poll_interval_ms, 30_000);
        assert_eq!(cli.open_issue_page_size, 20);
        assert!(!cli.reconcile_once);

        let config = cli.runtime_config();
        assert_eq!(config.tracker_owner, "acme");
        assert_eq!(config.poll_interval.as_millis(), 30_000);
    }

    #[test]
    fn unit_cli_rejects_zero_poll_interval() {
        let mut args = base_args();
        args.extend(["--poll-interval-ms", "0"]);
        assert!(Cli::try_parse_from(args).is_err());
    }
}
