use std::collections::HashMap;

use mmadmin_api_models::{Status, StatusKind, UpdateStatusRequest, User, online_status_map};

use crate::api;
use crate::cli::{OutputFormat, StatusGetArgs, StatusSetArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_status_update, render_statuses};
use crate::resolve::resolve_user;

pub(crate) async fn handle_status_get(
    ctx: &AppContext,
    args: StatusGetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut users = Vec::with_capacity(args.users.len());
    for arg in &args.users {
        users.push(resolve_user(ctx, arg).await?);
    }

    let ids: Vec<String> = users.iter().map(|user| user.id.clone()).collect();
    let statuses = api::get_statuses_by_ids(ctx, &ids).await?;
    let rows = status_rows(users, &statuses, args.hide_offline);
    render_statuses(&rows, format)
}

/// Pair each user with a client-facing status, in request order.
fn status_rows(
    users: Vec<User>,
    statuses: &[Status],
    hide_offline: bool,
) -> Vec<(String, Status)> {
    let online = hide_offline.then(|| online_status_map(statuses));
    let by_user: HashMap<&str, &Status> = statuses
        .iter()
        .map(|status| (status.user_id.as_str(), status))
        .collect();

    let mut rows = Vec::with_capacity(users.len());
    for user in users {
        if online
            .as_ref()
            .is_some_and(|online| !online.contains_key(&user.id))
        {
            continue;
        }
        // Users the server has no record for have never been online.
        let status = by_user.get(user.id.as_str()).map_or_else(
            || Status {
                user_id: user.id.clone(),
                status: StatusKind::Offline.to_string(),
                ..Status::default()
            },
            |status| status.for_client(),
        );
        rows.push((user.username, status));
    }
    rows
}

pub(crate) async fn handle_status_set(
    ctx: &AppContext,
    args: StatusSetArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.dnd_end_time.is_some() && args.status != StatusKind::Dnd {
        return Err(CliError::validation(format!(
            "--dnd-end-time only applies to the dnd status, not '{}'",
            args.status
        )));
    }

    let user = resolve_user(ctx, &args.user).await?;
    let request = UpdateStatusRequest::new(user.id.as_str(), args.status, args.dnd_end_time);
    let status = api::update_user_status(ctx, &request).await?;
    render_status_update(&user.username, &status.for_client(), format)
}
