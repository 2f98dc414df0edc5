use anyhow::anyhow;
use mmadmin_api_models::CreatePostRequest;

use crate::api;
use crate::cli::{OutputFormat, PostCreateArgs, PostListArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::events::EventStream;
use crate::output::{render_created_post, render_post};
use crate::resolve::{UsernameCache, resolve_channel};

pub(crate) async fn handle_post_create(
    ctx: &AppContext,
    args: PostCreateArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.message.trim().is_empty() {
        return Err(CliError::validation("message cannot be empty"));
    }

    let root_id = match args.reply_to.as_deref().map(str::trim) {
        Some(reply_to) if !reply_to.is_empty() => thread_root(ctx, reply_to).await?,
        _ => String::new(),
    };

    let channel = resolve_channel(ctx, &args.channel).await?;
    let request = CreatePostRequest {
        channel_id: channel.id,
        message: args.message,
        root_id,
    };
    let post = api::create_post(ctx, &request)
        .await
        .map_err(|err| match err {
            CliError::Failure(source) => {
                CliError::failure(anyhow!("could not create post: {source}"))
            }
            validation @ CliError::Validation(_) => validation,
        })?;
    render_created_post(&post, format)
}

/// Post id new replies should attach to: the thread root when `post_id` is itself a reply.
async fn thread_root(ctx: &AppContext, post_id: &str) -> CliResult<String> {
    let post = api::get_post(ctx, post_id).await?;
    if post.is_reply() {
        tracing::debug!(post_id, root_id = %post.root_id, "replying to thread root");
        Ok(post.root_id)
    } else {
        Ok(post.id)
    }
}

pub(crate) async fn handle_post_list(
    ctx: &AppContext,
    args: PostListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let channel = resolve_channel(ctx, &args.channel).await?;
    let list = api::get_posts_for_channel(ctx, &channel.id, 0, args.number).await?;

    let mut names = UsernameCache::default();
    for post in list.chronological() {
        let username = names.username(ctx, &post.user_id).await;
        render_post(post, &username, args.show_ids, format)?;
    }

    if !args.follow {
        return Ok(());
    }

    let mut stream = EventStream::connect(ctx).await?;
    tracing::info!(channel_id = %channel.id, "following channel");
    follow_channel(ctx, &mut stream, &channel.id, &mut names, args.show_ids, format).await
}

/// Print new posts in `channel_id` until Ctrl-C or the server drops the stream.
async fn follow_channel(
    ctx: &AppContext,
    stream: &mut EventStream,
    channel_id: &str,
    names: &mut UsernameCache,
    show_ids: bool,
    format: OutputFormat,
) -> CliResult<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            next = stream.next_channel_post(channel_id) => {
                let Some(post) = next? else {
                    return Err(CliError::failure(anyhow!("event stream closed by server")));
                };
                let username = names.username(ctx, &post.user_id).await;
                render_post(&post, &username, show_ids, format)?;
            }
            _ = &mut ctrl_c => {
                tracing::info!(channel_id, "follow interrupted");
                return Ok(());
            }
        }
    }
}
