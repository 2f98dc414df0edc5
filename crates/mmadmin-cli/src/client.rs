//! Shared client utilities, error types, and telemetry wiring for the CLI.

use std::fmt::{self, Debug, Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::anyhow;
use mmadmin_api_models::AppError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::cli::Cli;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const API_PREFIX: &str = "/api/v4";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Dependencies constructed from environment flags and CLI options.
#[derive(Clone)]
pub(crate) struct CliDependencies {
    pub(crate) client: Client,
    pub(crate) telemetry: Option<TelemetryEmitter>,
}

impl CliDependencies {
    /// Construct a configured HTTP client and optional telemetry emitter.
    pub(crate) fn from_env(cli: &Cli, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(Duration::from_secs(cli.timeout))
            .user_agent(concat!("mmadmin/", env!("CARGO_PKG_VERSION")))
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            telemetry: TelemetryEmitter::from_env(),
        })
    }
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) auth_token: Option<AuthToken>,
}

impl AppContext {
    pub(crate) fn require_token(&self) -> CliResult<&AuthToken> {
        self.auth_token.as_ref().ok_or_else(|| {
            CliError::validation(
                "authentication token is required (pass --auth-token or set MMADMIN_AUTH_TOKEN)",
            )
        })
    }

    /// REST endpoint below `/api/v4`, keeping any sub-path of the base URL.
    #[must_use]
    pub(crate) fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let base_path = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{base_path}{API_PREFIX}{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Event stream endpoint, with the scheme switched to `ws`/`wss`.
    pub(crate) fn websocket_url(&self) -> CliResult<Url> {
        let mut url = self.endpoint("/websocket");
        let scheme = match url.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(CliError::validation(format!(
                    "cannot open an event stream over '{other}' (expected http or https)"
                )));
            }
        };
        url.set_scheme(scheme).map_err(|()| {
            CliError::failure(anyhow!("failed to derive websocket URL from {}", self.base_url))
        })?;
        Ok(url)
    }
}

/// Personal access token sent as a bearer credential.
#[derive(Clone)]
pub(crate) struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub(crate) fn secret(&self) -> &str {
        &self.0
    }
}

impl Debug for AuthToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("AuthToken(***)")
    }
}

/// Telemetry emitter used to forward CLI outcomes.
#[derive(Clone)]
pub(crate) struct TelemetryEmitter {
    pub(crate) client: Client,
    pub(crate) endpoint: Url,
}

impl TelemetryEmitter {
    #[must_use]
    pub(crate) fn from_env() -> Option<Self> {
        let endpoint = std::env::var("MMADMIN_TELEMETRY_ENDPOINT").ok()?;
        let endpoint = endpoint.parse().ok()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .ok()?;
        Some(Self { client, endpoint })
    }

    pub(crate) async fn emit(
        &self,
        trace_id: &str,
        command: &str,
        outcome: &str,
        exit_code: i32,
        message: Option<&str>,
    ) {
        let event = TelemetryEvent {
            command,
            outcome,
            trace_id,
            exit_code,
            message,
            timestamp_ms: timestamp_now_ms(),
        };

        if let Err(err) = self
            .client
            .post(self.endpoint.clone())
            .json(&event)
            .send()
            .await
        {
            tracing::debug!(error = %err, "telemetry emit failed");
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    command: &'a str,
    outcome: &'a str,
    trace_id: &'a str,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    timestamp_ms: u64,
}

/// Parse the server URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Parse the access token provided to the CLI.
pub(crate) fn parse_auth_token(input: Option<String>) -> CliResult<Option<AuthToken>> {
    let Some(raw) = input else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::validation(
            "authentication token cannot be an empty string",
        ));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(CliError::validation(
            "authentication token cannot contain whitespace",
        ));
    }

    Ok(Some(AuthToken(trimmed.to_string())))
}

/// Millisecond timestamp helper for telemetry.
#[must_use]
pub(crate) fn timestamp_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Classify an HTTP response into a CLI error.
pub(crate) async fn classify_problem(response: reqwest::Response) -> CliError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();

    let body_text = String::from_utf8_lossy(&bytes).to_string();
    let app_error = serde_json::from_slice::<AppError>(&bytes)
        .ok()
        .filter(|err| !err.message.is_empty());

    let message = app_error
        .as_ref()
        .map_or_else(|| body_text.trim().to_string(), AppError::summary);

    if matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY
    ) {
        if message.is_empty() {
            CliError::validation(format!("request failed with status {status}"))
        } else {
            CliError::validation(message)
        }
    } else {
        let detail = if let Some(app_error) = app_error {
            format!("{} (status {})", message, app_error.status_code)
        } else if !body_text.trim().is_empty() {
            format!("{message} (status {status})")
        } else {
            format!("request failed with status {status}")
        };
        CliError::failure(anyhow!(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    fn context(base: &str) -> AppContext {
        AppContext {
            client: Client::new(),
            base_url: base.parse().expect("valid URL"),
            auth_token: None,
        }
    }

    async fn response_from(server: &MockServer, path: &str) -> reqwest::Response {
        Client::new()
            .get(format!("{}{path}", server.base_url()))
            .send()
            .await
            .expect("send request")
    }

    #[test]
    fn endpoint_preserves_base_sub_path() {
        assert_eq!(
            context("http://chat.example").endpoint("/posts").as_str(),
            "http://chat.example/api/v4/posts"
        );
        assert_eq!(
            context("https://example.com/chat/?x=1")
                .endpoint("/users/abc")
                .as_str(),
            "https://example.com/chat/api/v4/users/abc"
        );
    }

    #[test]
    fn websocket_url_switches_scheme() -> CliResult<()> {
        assert_eq!(
            context("http://localhost:8065").websocket_url()?.as_str(),
            "ws://localhost:8065/api/v4/websocket"
        );
        assert_eq!(
            context("https://chat.example/team").websocket_url()?.as_str(),
            "wss://chat.example/team/api/v4/websocket"
        );
        let err = context("ftp://chat.example")
            .websocket_url()
            .expect_err("ftp has no event stream");
        assert!(matches!(err, CliError::Validation(message) if message.contains("ftp")));
        Ok(())
    }

    #[test]
    fn require_token_reports_missing_credentials() {
        let err = context("http://localhost")
            .require_token()
            .expect_err("missing token");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("MMADMIN_AUTH_TOKEN"));
    }

    #[test]
    fn parse_auth_token_validates_input() -> CliResult<()> {
        assert!(parse_auth_token(None)?.is_none());
        let token = parse_auth_token(Some("  abc123  ".into()))?.expect("token");
        assert_eq!(token.secret(), "abc123");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert!(parse_auth_token(Some("   ".into())).is_err());
        assert!(parse_auth_token(Some("abc 123".into())).is_err());
        Ok(())
    }

    #[test]
    fn parse_url_rejects_invalid_input() {
        let err = parse_url("not-a-url").expect_err("invalid URL should fail");
        assert!(err.contains("invalid URL"));
    }

    #[test]
    fn timestamp_now_ms_returns_positive_value() {
        assert!(timestamp_now_ms() > 0);
    }

    #[tokio::test]
    async fn classify_problem_maps_bad_request_to_validation() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/bad");
            then.status(400).json_body(json!({
                "id": "api.post.create_post.channel_id.app_error",
                "message": "Invalid channel id.",
                "detailed_error": "",
                "status_code": 400
            }));
        });

        server.mock(|when, then| {
            when.method(GET).path("/bad-empty");
            then.status(400);
        });

        let err = classify_problem(response_from(&server, "/bad").await).await;
        assert!(matches!(err, CliError::Validation(message) if message == "Invalid channel id."));

        let err = classify_problem(response_from(&server, "/bad-empty").await).await;
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "request failed with status 400 Bad Request"
        );
    }

    #[tokio::test]
    async fn classify_problem_reports_server_failures_with_status() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/forbidden");
            then.status(403).json_body(json!({
                "id": "api.context.permissions.app_error",
                "message": "You do not have the appropriate permissions.",
                "detailed_error": "",
                "status_code": 403
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/plain");
            then.status(502).body("upstream unavailable");
        });
        server.mock(|when, then| {
            when.method(GET).path("/empty");
            then.status(500);
        });

        let err = classify_problem(response_from(&server, "/forbidden").await).await;
        assert_eq!(err.exit_code(), 3);
        assert_eq!(
            err.display_message(),
            "You do not have the appropriate permissions. (status 403)"
        );

        let err = classify_problem(response_from(&server, "/plain").await).await;
        assert!(err.display_message().contains("upstream unavailable"));
        assert!(err.display_message().contains("502"));

        let err = classify_problem(response_from(&server, "/empty").await).await;
        assert!(
            err.display_message()
                .starts_with("request failed with status 500")
        );
    }

    #[tokio::test]
    async fn telemetry_emitter_emits_event() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/telemetry")
                .header("content-type", "application/json");
            then.status(200);
        });

        let emitter = TelemetryEmitter {
            client: Client::new(),
            endpoint: format!("{}/telemetry", server.base_url())
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid URL"))?,
        };

        emitter
            .emit("trace", "post_list", "success", 0, None)
            .await;

        mock.assert();
        Ok(())
    }
}
