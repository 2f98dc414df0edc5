//! Argument parsing, dispatch, and process-level error reporting.

use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mmadmin_api_models::StatusKind;
use mmadmin_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
use reqwest::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliDependencies, CliResult, parse_auth_token, parse_url};
use crate::commands::post::{handle_post_create, handle_post_list};
use crate::commands::status::{handle_status_get, handle_status_set};

const DEFAULT_SERVER_URL: &str = "http://localhost:8065";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and handles
/// user-facing telemetry emission. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format,
        build_sha: option_env!("MMADMIN_BUILD_SHA").unwrap_or_else(build_sha),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    tracing::debug!(
        command = command_name,
        %trace_id,
        build_sha = build_sha(),
        "starting command"
    );

    let deps = match CliDependencies::from_env(&cli, &trace_id) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };
    let telemetry = deps.telemetry.clone();

    let result = dispatch(cli, &deps).await;

    let (exit_code, message, outcome) = match result {
        Ok(()) => (0, None, "success"),
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            eprintln!("error: {message}");
            (exit_code, Some(message), "error")
        }
    };

    if let Some(emitter) = &telemetry {
        emitter
            .emit(
                &trace_id,
                command_name,
                outcome,
                exit_code,
                message.as_deref(),
            )
            .await;
    }

    exit_code
}

async fn dispatch(cli: Cli, deps: &CliDependencies) -> CliResult<()> {
    let ctx = AppContext {
        client: deps.client.clone(),
        base_url: cli.url,
        auth_token: parse_auth_token(cli.auth_token)?,
    };

    match cli.command {
        Command::Post(post) => match post {
            PostCommand::Create(args) => handle_post_create(&ctx, args, cli.output).await,
            PostCommand::List(args) => handle_post_list(&ctx, args, cli.output).await,
        },
        Command::Status(status) => match status {
            StatusCommand::Get(args) => handle_status_get(&ctx, args, cli.output).await,
            StatusCommand::Set(args) => handle_status_set(&ctx, args, cli.output).await,
        },
    }
}

#[derive(Parser)]
#[command(
    name = "mmadmin",
    version,
    about = "Administrative CLI for a Mattermost-compatible server"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "MMADMIN_URL",
        value_parser = parse_url,
        default_value = DEFAULT_SERVER_URL
    )]
    url: Url,
    #[arg(long, global = true, env = "MMADMIN_AUTH_TOKEN", hide_env_values = true)]
    auth_token: Option<String>,
    #[arg(
        long,
        global = true,
        env = "MMADMIN_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, env = "MMADMIN_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(
        long,
        global = true,
        env = "MMADMIN_LOG_FORMAT",
        value_parser = parse_log_format,
        default_value = "pretty"
    )]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Management of posts
    #[command(subcommand)]
    Post(PostCommand),
    /// Management of user statuses
    #[command(subcommand)]
    Status(StatusCommand),
}

#[derive(Subcommand)]
enum PostCommand {
    /// Create a post
    Create(PostCreateArgs),
    /// List posts for a channel
    List(PostListArgs),
}

#[derive(Subcommand)]
enum StatusCommand {
    /// Show the status of one or more users
    Get(StatusGetArgs),
    /// Set a user's status
    Set(StatusSetArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct PostCreateArgs {
    #[arg(help = "Channel as team:channel or channel id")]
    pub(crate) channel: String,
    #[arg(short, long, help = "Message for the post")]
    pub(crate) message: String,
    #[arg(short, long, help = "Post id to reply to")]
    pub(crate) reply_to: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct PostListArgs {
    #[arg(help = "Channel as team:channel or channel id")]
    pub(crate) channel: String,
    #[arg(
        short,
        long,
        default_value_t = 20,
        value_parser = clap::value_parser!(u32).range(1..=200),
        help = "Number of messages to list"
    )]
    pub(crate) number: u32,
    #[arg(short = 'i', long, help = "Show post ids")]
    pub(crate) show_ids: bool,
    #[arg(
        short,
        long,
        help = "Output appended data as new messages are posted to the channel"
    )]
    pub(crate) follow: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct StatusGetArgs {
    #[arg(required = true, help = "Users by username, e-mail, or id")]
    pub(crate) users: Vec<String>,
    #[arg(long, help = "Omit users who are offline")]
    pub(crate) hide_offline: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct StatusSetArgs {
    #[arg(help = "User by username, e-mail, or id")]
    pub(crate) user: String,
    #[arg(value_parser = parse_status, help = "online, away, dnd, offline, or ooo")]
    pub(crate) status: StatusKind,
    #[arg(
        long,
        value_parser = clap::value_parser!(i64).range(1..),
        help = "Unix time (seconds) when do-not-disturb ends"
    )]
    pub(crate) dnd_end_time: Option<i64>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Post(PostCommand::Create(_)) => "post_create",
        Command::Post(PostCommand::List(args)) if args.follow => "post_follow",
        Command::Post(PostCommand::List(_)) => "post_list",
        Command::Status(StatusCommand::Get(_)) => "status_get",
        Command::Status(StatusCommand::Set(_)) => "status_set",
    }
}

fn parse_status(input: &str) -> Result<StatusKind, String> {
    StatusKind::from_str(input).map_err(|err| err.to_string())
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    LogFormat::from_str(input).map_err(|err| err.to_string())
}
