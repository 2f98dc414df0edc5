//! WebSocket event stream used by follow mode.

use anyhow::anyhow;
use futures_util::{SinkExt, StreamExt};
use mmadmin_api_models::{
    EVENT_HELLO, Post, WebSocketEvent, WebSocketMessage, WebSocketRequest,
};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::client::{AppContext, CliError, CliResult};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Authenticated connection to the server's event stream.
pub(crate) struct EventStream {
    socket: Socket,
    seq: i64,
    auth_seq: i64,
}

impl EventStream {
    /// Connect and send the authentication challenge.
    pub(crate) async fn connect(ctx: &AppContext) -> CliResult<Self> {
        let token = ctx.require_token()?;
        let url = ctx.websocket_url()?;

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|err| CliError::failure(anyhow!("invalid websocket URL {url}: {err}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token.secret())).map_err(|_| {
            CliError::validation("authentication token contains invalid header characters")
        })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (socket, response) = connect_async(request)
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to connect to {url}: {err}")))?;
        tracing::debug!(%url, status = %response.status(), "event stream connected");

        let mut stream = Self {
            socket,
            seq: 0,
            auth_seq: 0,
        };
        stream.auth_seq = stream.next_seq();
        let challenge = WebSocketRequest::authentication_challenge(stream.auth_seq, token.secret());
        stream.send(&challenge).await?;
        Ok(stream)
    }

    const fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    async fn send(&mut self, request: &WebSocketRequest) -> CliResult<()> {
        let text = serde_json::to_string(request)
            .map_err(|err| CliError::failure(anyhow!("failed to encode websocket action: {err}")))?;
        self.socket
            .send(Message::Text(text))
            .await
            .map_err(|err| CliError::failure(anyhow!("failed to send websocket action: {err}")))
    }

    /// Next pushed event; `None` once the server closes the stream.
    ///
    /// Action replies, control frames, and undecodable frames are skipped. A
    /// rejected authentication challenge ends the stream with an error.
    pub(crate) async fn next_event(&mut self) -> CliResult<Option<WebSocketEvent>> {
        while let Some(frame) = self.socket.next().await {
            let frame = frame
                .map_err(|err| CliError::failure(anyhow!("failed to read event stream: {err}")))?;
            let text = match frame {
                Message::Text(text) => text,
                Message::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => continue,
                },
                Message::Close(_) => return Ok(None),
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            match serde_json::from_str::<WebSocketMessage>(&text) {
                Ok(WebSocketMessage::Event(event)) => return Ok(Some(event)),
                Ok(WebSocketMessage::Response(reply)) => {
                    if reply.is_ok() {
                        tracing::debug!(seq_reply = reply.seq_reply, "websocket action accepted");
                    } else if reply.seq_reply == self.auth_seq {
                        return Err(CliError::failure(anyhow!(
                            "event stream authentication failed: {}",
                            reply.error.map_or_else(|| "no detail".to_string(), |e| e.to_string())
                        )));
                    } else {
                        tracing::warn!(
                            seq_reply = reply.seq_reply,
                            error = ?reply.error,
                            "websocket action rejected"
                        );
                    }
                }
                Err(err) => {
                    tracing::debug!(error = %err, "discarding malformed websocket frame");
                }
            }
        }
        Ok(None)
    }

    /// Next post created in `channel_id`; `None` once the stream ends.
    ///
    /// Posted events whose payload cannot be decoded are reported on stderr
    /// and skipped.
    pub(crate) async fn next_channel_post(&mut self, channel_id: &str) -> CliResult<Option<Post>> {
        while let Some(event) = self.next_event().await? {
            if event.event == EVENT_HELLO {
                tracing::info!("event stream ready");
                continue;
            }
            if !event.is_posted() {
                continue;
            }
            match event.posted_post() {
                Ok(post) if post.channel_id == channel_id => return Ok(Some(post)),
                Ok(_) => {}
                Err(err) => eprintln!("Error parsing incoming post: {err}"),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process event stream server for follow-mode tests.

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message;

    /// Accept one connection, expect an authentication challenge, reply with
    /// `auth_status`, then push `frames` and close.
    ///
    /// The join handle yields the challenge text the client sent.
    pub(crate) async fn serve_frames(
        auth_status: &'static str,
        frames: Vec<String>,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.expect("accept");
            let mut socket = accept_async(tcp).await.expect("handshake");
            let challenge = match socket.next().await {
                Some(Ok(Message::Text(text))) => text,
                other => panic!("expected authentication challenge, got {other:?}"),
            };
            let reply = format!(r#"{{"status":"{auth_status}","seq_reply":1}}"#);
            socket.send(Message::Text(reply)).await.expect("send reply");
            for frame in frames {
                socket.send(Message::Text(frame)).await.expect("send frame");
            }
            let _ = socket.close(None).await;
            challenge
        });
        (format!("http://{addr}"), handle)
    }

    /// A `posted` event frame for a post in `channel_id`.
    pub(crate) fn posted_frame(id: &str, channel_id: &str, user_id: &str, message: &str) -> String {
        let post = serde_json::json!({
            "id": id,
            "channel_id": channel_id,
            "user_id": user_id,
            "message": message,
        });
        serde_json::json!({
            "event": "posted",
            "data": {"post": post.to_string(), "channel_type": "O"},
            "broadcast": {"channel_id": channel_id, "team_id": "", "user_id": ""},
            "seq": 1
        })
        .to_string()
    }
}
