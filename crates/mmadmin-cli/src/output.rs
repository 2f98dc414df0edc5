//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat};
use mmadmin_api_models::{Post, Status};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const RED: &str = "\x1b[31m";
const BOLD_BLUE: &str = "\x1b[34;1m";
const RESET: &str = "\x1b[0m";

#[derive(Serialize)]
struct PostLine<'a> {
    #[serde(flatten)]
    post: &'a Post,
    username: &'a str,
}

#[derive(Serialize)]
struct StatusRow<'a> {
    #[serde(flatten)]
    status: &'a Status,
    username: &'a str,
}

/// `[username] message`, optionally prefixed by the post id.
#[must_use]
pub(crate) fn format_post_line(post: &Post, username: &str, show_ids: bool) -> String {
    if show_ids {
        format!(
            "{RED}{}{RESET} {BOLD_BLUE}[{username}]{RESET} {}",
            post.id, post.message
        )
    } else {
        format!("{BOLD_BLUE}[{username}]{RESET} {}", post.message)
    }
}

/// Print one post; JSON output is a single compact object per line.
pub(crate) fn render_post(
    post: &Post,
    username: &str,
    show_ids: bool,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string(&PostLine { post, username })
                .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
            println!("{text}");
        }
        OutputFormat::Table => println!("{}", format_post_line(post, username, show_ids)),
    }
    Ok(())
}

pub(crate) fn render_created_post(post: &Post, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_pretty(post)?,
        OutputFormat::Table => {
            if post.is_reply() {
                println!("created post {} in thread {}", post.id, post.root_id);
            } else {
                println!("created post {}", post.id);
            }
        }
    }
    Ok(())
}

/// Print statuses paired with the usernames they were requested for.
pub(crate) fn render_statuses(rows: &[(String, Status)], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = rows
                .iter()
                .map(|(username, status)| StatusRow { status, username })
                .collect();
            print_pretty(&rows)?;
        }
        OutputFormat::Table => {
            println!("{:<24} {:<8} {:<6} LAST ACTIVITY", "USERNAME", "STATUS", "MANUAL");
            for (username, status) in rows {
                println!(
                    "{:<24} {:<8} {:<6} {}",
                    username,
                    status.status,
                    status.manual,
                    format_millis(status.last_activity_at)
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_status_update(
    username: &str,
    status: &Status,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_pretty(&StatusRow { status, username })?,
        OutputFormat::Table => {
            if status.dnd_end_time > 0 {
                println!(
                    "{username} is now {} until {}",
                    status.status,
                    format_millis(status.dnd_end_time.saturating_mul(1000))
                );
            } else {
                println!("{username} is now {}", status.status);
            }
        }
    }
    Ok(())
}

/// Millisecond epoch as RFC 3339; `-` when unset.
#[must_use]
pub(crate) fn format_millis(millis: i64) -> String {
    if millis <= 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |at| at.to_rfc3339_opts(SecondsFormat::Secs, true),
    )
}

fn print_pretty<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
