//! Resolution of human-readable channel and user references.

use std::collections::HashMap;

use mmadmin_api_models::{Channel, Team, User};

use crate::api;
use crate::client::{AppContext, CliError, CliResult};

/// A channel argument split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChannelRef<'a> {
    /// `team:channel`, each side a name or an id.
    Qualified { team: &'a str, channel: &'a str },
    /// A bare channel id.
    Id(&'a str),
}

impl<'a> ChannelRef<'a> {
    /// Split a `team:channel` or bare id argument; `None` if a side is empty.
    pub(crate) fn parse(arg: &'a str) -> Option<Self> {
        let arg = arg.trim();
        match arg.split_once(':') {
            Some((team, channel)) => {
                let (team, channel) = (team.trim(), channel.trim());
                (!team.is_empty() && !channel.is_empty())
                    .then_some(Self::Qualified { team, channel })
            }
            None => (!arg.is_empty()).then_some(Self::Id(arg)),
        }
    }
}

/// Resolve a `team:channel` reference (names or ids) or a bare channel id.
pub(crate) async fn resolve_channel(ctx: &AppContext, arg: &str) -> CliResult<Channel> {
    let not_found = || CliError::validation(format!("Unable to find channel '{arg}'"));
    let reference = ChannelRef::parse(arg).ok_or_else(not_found)?;

    let channel = match reference {
        ChannelRef::Id(id) => api::find_channel(ctx, id).await?,
        ChannelRef::Qualified { team, channel } => {
            let Some(team) = resolve_team(ctx, team).await? else {
                return Err(not_found());
            };
            match api::find_channel_by_name(ctx, &team.id, channel).await? {
                Some(found) => Some(found),
                None => api::find_channel(ctx, channel)
                    .await?
                    .filter(|found| found.team_id == team.id),
            }
        }
    };

    let channel = channel.ok_or_else(not_found)?;
    tracing::debug!(arg, channel_id = %channel.id, "resolved channel");
    Ok(channel)
}

async fn resolve_team(ctx: &AppContext, arg: &str) -> CliResult<Option<Team>> {
    if let Some(team) = api::find_team_by_name(ctx, arg).await? {
        return Ok(Some(team));
    }
    api::find_team(ctx, arg).await
}

/// Resolve a user by e-mail (when the argument contains `@`), username, or id.
pub(crate) async fn resolve_user(ctx: &AppContext, arg: &str) -> CliResult<User> {
    let arg = arg.trim();
    let not_found = || CliError::validation(format!("Unable to find user '{arg}'"));
    if arg.is_empty() {
        return Err(not_found());
    }

    let user = if arg.contains('@') {
        api::find_user_by_email(ctx, arg).await?
    } else if let Some(user) = api::find_user_by_username(ctx, arg).await? {
        Some(user)
    } else {
        api::find_user(ctx, arg).await?
    };

    user.ok_or_else(not_found)
}

/// User id to username map, scoped to a single invocation.
#[derive(Debug, Default)]
pub(crate) struct UsernameCache {
    names: HashMap<String, String>,
}

impl UsernameCache {
    /// Username for `user_id`, falling back to the id itself if the lookup fails.
    ///
    /// Failed lookups are not cached, so a later call retries.
    pub(crate) async fn username(&mut self, ctx: &AppContext, user_id: &str) -> String {
        if let Some(name) = self.names.get(user_id) {
            return name.clone();
        }
        match api::get_user(ctx, user_id).await {
            Ok(user) => {
                self.names.insert(user_id.to_string(), user.username.clone());
                user.username
            }
            Err(err) => {
                tracing::debug!(user_id, error = %err.display_message(), "username lookup failed");
                user_id.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::parse_auth_token;
    use httpmock::prelude::*;
    use reqwest::Client;
    use serde_json::json;

    fn context_with_token(server: &MockServer) -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: server.base_url().parse().expect("valid URL"),
            auth_token: parse_auth_token(Some("token-1".into())).expect("valid token"),
        }
    }

    #[test]
    fn channel_ref_parses_qualified_and_bare_forms() {
        assert_eq!(
            ChannelRef::parse("myteam:town-square"),
            Some(ChannelRef::Qualified {
                team: "myteam",
                channel: "town-square"
            })
        );
        assert_eq!(ChannelRef::parse(" abc123 "), Some(ChannelRef::Id("abc123")));
        assert_eq!(ChannelRef::parse(":town-square"), None);
        assert_eq!(ChannelRef::parse("myteam:"), None);
        assert_eq!(ChannelRef::parse("  "), None);
    }

    #[tokio::test]
    async fn resolve_channel_by_team_and_channel_name() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/name/myteam");
            then.status(200)
                .json_body(json!({"id": "t1", "name": "myteam"}));
        });
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v4/teams/t1/channels/name/town-square")
                .query_param("include_deleted", "true");
            then.status(200)
                .json_body(json!({"id": "c1", "team_id": "t1", "name": "town-square"}));
        });

        let ctx = context_with_token(&server);
        let channel = resolve_channel(&ctx, "myteam:town-square")
            .await
            .expect("channel should resolve");
        mock.assert();
        assert_eq!(channel.id, "c1");
    }

    #[tokio::test]
    async fn resolve_channel_falls_back_to_ids() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/name/t1");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/t1");
            then.status(200).json_body(json!({"id": "t1", "name": "myteam"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/t1/channels/name/c1");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/channels/c1");
            then.status(200)
                .json_body(json!({"id": "c1", "team_id": "t1", "name": "town-square"}));
        });

        let ctx = context_with_token(&server);
        let channel = resolve_channel(&ctx, "t1:c1")
            .await
            .expect("channel should resolve by ids");
        assert_eq!(channel.name, "town-square");
    }

    #[tokio::test]
    async fn resolve_channel_rejects_channel_from_other_team() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/name/myteam");
            then.status(200).json_body(json!({"id": "t1", "name": "myteam"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/t1/channels/name/c9");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/channels/c9");
            then.status(200)
                .json_body(json!({"id": "c9", "team_id": "t2", "name": "elsewhere"}));
        });

        let ctx = context_with_token(&server);
        let err = resolve_channel(&ctx, "myteam:c9")
            .await
            .expect_err("channel belongs to another team");
        assert!(
            matches!(err, CliError::Validation(message) if message == "Unable to find channel 'myteam:c9'")
        );
    }

    #[tokio::test]
    async fn resolve_channel_reports_unknown_team() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/name/ghost");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/teams/ghost");
            then.status(400).json_body(json!({"message": "invalid id", "status_code": 400}));
        });

        let ctx = context_with_token(&server);
        let err = resolve_channel(&ctx, "ghost:town-square")
            .await
            .expect_err("unknown team");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("ghost:town-square"));
    }

    #[tokio::test]
    async fn resolve_user_by_email_username_and_id() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/email/alice@example.com");
            then.status(200)
                .json_body(json!({"id": "u1", "username": "alice"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/username/bob");
            then.status(200).json_body(json!({"id": "u2", "username": "bob"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/username/u3");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/u3");
            then.status(200).json_body(json!({"id": "u3", "username": "carol"}));
        });

        let ctx = context_with_token(&server);
        let alice = resolve_user(&ctx, "alice@example.com").await.expect("alice");
        assert_eq!(alice.id, "u1");
        let bob = resolve_user(&ctx, "bob").await.expect("bob");
        assert_eq!(bob.id, "u2");
        let carol = resolve_user(&ctx, "u3").await.expect("carol");
        assert_eq!(carol.username, "carol");
    }

    #[tokio::test]
    async fn username_cache_reuses_successful_lookups() {
        let server = MockServer::start_async().await;
        let mut mock = server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/u1");
            then.status(200).json_body(json!({"id": "u1", "username": "alice"}));
        });

        let ctx = context_with_token(&server);
        let mut cache = UsernameCache::default();
        assert_eq!(cache.username(&ctx, "u1").await, "alice");
        mock.assert();
        mock.delete();
        assert_eq!(cache.username(&ctx, "u1").await, "alice");
    }

    #[tokio::test]
    async fn username_cache_falls_back_to_user_id() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v4/users/u404");
            then.status(404).json_body(json!({"message": "not found", "status_code": 404}));
        });

        let ctx = context_with_token(&server);
        let mut cache = UsernameCache::default();
        assert_eq!(cache.username(&ctx, "u404").await, "u404");
        assert!(cache.names.is_empty());
    }
}
