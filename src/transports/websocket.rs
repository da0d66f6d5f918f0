//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! This module provides [`WebSocketTransport`], a [`Transport`] implementation
//! that communicates over a WebSocket connection, and [`WebSocketConnector`],
//! the [`Connector`] the session client uses to (re)open it. Both `ws://` and
//! `wss://` URLs are supported; TLS is handled transparently via
//! [`MaybeTlsStream`](tokio_tungstenite::MaybeTlsStream).
//!
//! # Feature gate
//!
//! This module is only available when the `transport-websocket` feature is enabled
//! (it is enabled by default).

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::SessionError;
use crate::transport::{Connector, Transport};

/// Close code the game server uses when it refuses an unauthenticated channel.
pub const AUTH_REJECTED_CLOSE_CODE: u16 = 4001;

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Strip the query string (which carries the auth token) before logging a URL.
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// HTTP statuses that mean the server refused the token during the upgrade.
const AUTH_REJECTED_STATUSES: [u16; 2] = [401, 403];

fn handshake_error(e: tokio_tungstenite::tungstenite::Error) -> SessionError {
    use tokio_tungstenite::tungstenite::Error;

    match &e {
        Error::Http(response) if AUTH_REJECTED_STATUSES.contains(&response.status().as_u16()) => {
            tracing::warn!(status = %response.status(), "game server refused the handshake");
            SessionError::ChannelRejected(response.status().to_string())
        }
        Error::Io(io) => {
            let kind = io.kind();
            SessionError::Io(std::io::Error::new(kind, e))
        }
        _ => SessionError::Io(std::io::Error::other(e)),
    }
}

/// A [`Transport`] implementation backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method is cancel-safe. Dropping the future
/// returned by `recv` before it completes will not consume or lose any messages,
/// making it safe to use inside `tokio::select!`.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Establish a new WebSocket connection to the given URL.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ChannelRejected`] if the server refuses the
    /// handshake with `401` or `403` (a bad token), and [`SessionError::Io`]
    /// if the URL is invalid or the connection cannot be established. When the
    /// underlying error is an I/O error its [`ErrorKind`](std::io::ErrorKind)
    /// is preserved; all other errors are mapped to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        tracing::debug!(url = %redact(url), "connecting to game server");

        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(handshake_error)?;

        tracing::info!(url = %redact(url), "game channel established");

        Ok(Self::from_stream(stream))
    }

    /// Create a [`WebSocketTransport`] from an already-established WebSocket stream.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(SessionError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(Some(frame)) if u16::from(frame.code) == AUTH_REJECTED_CLOSE_CODE => {
                    tracing::warn!(reason = %frame.reason, "game server rejected the channel");
                    return Some(Err(SessionError::ChannelRejected(frame.reason.to_string())));
                }
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Ping(_) => {
                    // tungstenite queues the pong itself.
                    tracing::debug!("received WebSocket ping");
                }
                Message::Pong(_) => {
                    tracing::debug!("received WebSocket pong (ignored)");
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Frame(_) => {
                    tracing::debug!("received raw WebSocket frame, skipping");
                }
            }
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }
}

/// [`Connector`] that opens a fresh [`WebSocketTransport`] per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, url: &str) -> Result<WebSocketTransport, SessionError> {
        WebSocketTransport::connect(url).await
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn redact_strips_token_query() {
        assert_eq!(
            redact("ws://localhost:8000/ws/game/?token=secret"),
            "ws://localhost:8000/ws/game/"
        );
        assert_eq!(redact("ws://localhost:8000/ws"), "ws://localhost:8000/ws");
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let result = WebSocketTransport::connect("not-a-valid-url").await;
        let err = result.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }

    #[tokio::test]
    async fn connector_fails_with_unreachable_host() {
        let result = WebSocketConnector.connect("ws://127.0.0.1:1").await;
        assert!(matches!(result.unwrap_err(), SessionError::Io(_)));
    }

    // ── Mock-stream helpers ──────────────────────────────────────────────

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns the address to connect to.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    /// Start a local server that answers the upgrade request with `status`.
    async fn start_refusing_server(status: u16) -> String {
        use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
        use tokio_tungstenite::tungstenite::http;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let refuse = move |_: &Request, _: Response| -> Result<Response, ErrorResponse> {
                Err(http::Response::builder()
                    .status(status)
                    .body(Some("refused".to_string()))
                    .unwrap())
            };
            let _ = tokio_tungstenite::accept_hdr_async(tcp, refuse).await;
        });

        format!("ws://{addr}/game/?token=stale")
    }

    // ── Mock-stream tests ────────────────────────────────────────────────

    #[tokio::test]
    async fn forbidden_handshake_is_a_rejection() {
        let url = start_refusing_server(403).await;
        let err = WebSocketConnector.connect(&url).await.unwrap_err();
        assert!(
            matches!(&err, SessionError::ChannelRejected(reason) if reason.contains("403")),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn unauthorized_handshake_is_a_rejection() {
        let url = start_refusing_server(401).await;
        let err = WebSocketConnector.connect(&url).await.unwrap_err();
        assert!(matches!(err, SessionError::ChannelRejected(_)));
    }

    #[tokio::test]
    async fn other_handshake_failures_stay_io_errors() {
        let url = start_refusing_server(500).await;
        let err = WebSocketConnector.connect(&url).await.unwrap_err();
        assert!(matches!(err, SessionError::Io(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn recv_receives_game_events_in_order() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Text(r#"{"type":"connected","message":"hi"}"#.into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"cast_result","distance":20,"depth":4}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketConnector.connect(&url).await.unwrap();

        let first = transport.recv().await.unwrap().unwrap();
        assert!(first.contains("connected"));
        let second = transport.recv().await.unwrap().unwrap();
        assert!(second.contains("cast_result"));
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_maps_auth_close_code_to_rejection() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(CloseFrame {
                code: CloseCode::from(AUTH_REJECTED_CLOSE_CODE),
                reason: "unauthorized".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let err = transport.recv().await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::ChannelRejected(reason) if reason == "unauthorized"));
    }

    #[tokio::test]
    async fn recv_returns_none_on_normal_close() {
        let url = start_mock_server(|mut ws| async move {
            ws.close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            }))
            .await
            .unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"hook"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();

        let msg = transport.recv().await.unwrap().unwrap();
        assert_eq!(msg, r#"{"type":"hook"}"#);
    }

    #[tokio::test]
    async fn send_reaches_server() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text.to_string());
            }
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"reel","speed":0.5}"#.to_string())
            .await
            .unwrap();

        assert_eq!(seen_rx.await.unwrap(), r#"{"type":"reel","speed":0.5}"#);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url = start_mock_server(|mut ws| async move {
            while let Some(Ok(_)) = ws.next().await {}
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();

        let err = transport.send("oops".to_string()).await.unwrap_err();
        assert!(matches!(err, SessionError::TransportClosed));

        // Second close is a no-op.
        transport.close().await.unwrap();
    }
}
