//! Typed wrappers over the REST endpoints the commands use.
//!
//! Every call authenticates with the bearer token from the context. Lookups
//! that drive reference resolution return `Ok(None)` when the server answers
//! 400 or 404, so callers can fall back to another lookup strategy.

use anyhow::anyhow;
use mmadmin_api_models::{
    Channel, CreatePostRequest, Post, PostList, Status, Team, UpdateStatusRequest, User,
};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::{AppContext, CliError, CliResult, classify_problem};

pub(crate) async fn get_post(ctx: &AppContext, post_id: &str) -> CliResult<Post> {
    get_json(ctx, ctx.endpoint(&format!("/posts/{post_id}")), "/posts/{id}").await
}

pub(crate) async fn create_post(ctx: &AppContext, request: &CreatePostRequest) -> CliResult<Post> {
    let mut url = ctx.endpoint("/posts");
    url.query_pairs_mut().append_pair("set_online", "false");
    send_json(ctx, Method::POST, url, request, "/posts").await
}

pub(crate) async fn get_posts_for_channel(
    ctx: &AppContext,
    channel_id: &str,
    page: u32,
    per_page: u32,
) -> CliResult<PostList> {
    let mut url = ctx.endpoint(&format!("/channels/{channel_id}/posts"));
    url.query_pairs_mut()
        .append_pair("page", &page.to_string())
        .append_pair("per_page", &per_page.to_string());
    get_json(ctx, url, "/channels/{id}/posts").await
}

pub(crate) async fn get_user(ctx: &AppContext, user_id: &str) -> CliResult<User> {
    get_json(ctx, ctx.endpoint(&format!("/users/{user_id}")), "/users/{id}").await
}

pub(crate) async fn find_user(ctx: &AppContext, user_id: &str) -> CliResult<Option<User>> {
    lookup(ctx, ctx.endpoint(&format!("/users/{user_id}")), "/users/{id}").await
}

pub(crate) async fn find_user_by_username(
    ctx: &AppContext,
    username: &str,
) -> CliResult<Option<User>> {
    let url = ctx.endpoint(&format!("/users/username/{username}"));
    lookup(ctx, url, "/users/username/{username}").await
}

pub(crate) async fn find_user_by_email(ctx: &AppContext, email: &str) -> CliResult<Option<User>> {
    let url = ctx.endpoint(&format!("/users/email/{email}"));
    lookup(ctx, url, "/users/email/{email}").await
}

pub(crate) async fn find_team(ctx: &AppContext, team_id: &str) -> CliResult<Option<Team>> {
    lookup(ctx, ctx.endpoint(&format!("/teams/{team_id}")), "/teams/{id}").await
}

pub(crate) async fn find_team_by_name(ctx: &AppContext, name: &str) -> CliResult<Option<Team>> {
    let url = ctx.endpoint(&format!("/teams/name/{name}"));
    lookup(ctx, url, "/teams/name/{name}").await
}

pub(crate) async fn find_channel(ctx: &AppContext, channel_id: &str) -> CliResult<Option<Channel>> {
    let url = ctx.endpoint(&format!("/channels/{channel_id}"));
    lookup(ctx, url, "/channels/{id}").await
}

pub(crate) async fn find_channel_by_name(
    ctx: &AppContext,
    team_id: &str,
    name: &str,
) -> CliResult<Option<Channel>> {
    let mut url = ctx.endpoint(&format!("/teams/{team_id}/channels/name/{name}"));
    url.query_pairs_mut().append_pair("include_deleted", "true");
    lookup(ctx, url, "/teams/{id}/channels/name/{name}").await
}

pub(crate) async fn get_statuses_by_ids(
    ctx: &AppContext,
    user_ids: &[String],
) -> CliResult<Vec<Status>> {
    let url = ctx.endpoint("/users/status/ids");
    send_json(ctx, Method::POST, url, user_ids, "/users/status/ids").await
}

pub(crate) async fn update_user_status(
    ctx: &AppContext,
    request: &UpdateStatusRequest,
) -> CliResult<Status> {
    let url = ctx.endpoint(&format!("/users/{}/status", request.user_id));
    send_json(ctx, Method::PUT, url, request, "/users/{id}/status").await
}

async fn get_json<T: DeserializeOwned>(ctx: &AppContext, url: Url, label: &str) -> CliResult<T> {
    let response = execute(ctx, ctx.client.get(url), label).await?;
    decode(response, label).await
}

async fn send_json<B, T>(
    ctx: &AppContext,
    method: Method,
    url: Url,
    body: &B,
    label: &str,
) -> CliResult<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = execute(ctx, ctx.client.request(method, url).json(body), label).await?;
    decode(response, label).await
}

async fn lookup<T: DeserializeOwned>(
    ctx: &AppContext,
    url: Url,
    label: &str,
) -> CliResult<Option<T>> {
    let response = execute(ctx, ctx.client.get(url), label).await?;
    if matches!(
        response.status(),
        StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST
    ) {
        tracing::debug!(endpoint = label, status = %response.status(), "lookup found nothing");
        return Ok(None);
    }
    decode(response, label).await.map(Some)
}

async fn execute(
    ctx: &AppContext,
    request: reqwest::RequestBuilder,
    label: &str,
) -> CliResult<reqwest::Response> {
    let token = ctx.require_token()?;
    tracing::debug!(endpoint = label, "sending request");
    request
        .bearer_auth(token.secret())
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to {label} failed: {err}")))
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response, label: &str) -> CliResult<T> {
    if response.status().is_success() {
        response
            .json::<T>()
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to parse {label} response: {err}")))
    } else {
        Err(classify_problem(response).await)
    }
}
