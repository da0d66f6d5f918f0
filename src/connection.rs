//! Game channel ownership and reconnect scheduling.
//!
//! [`Connection`] holds at most one open [`Transport`] and at most one pending
//! reconnect deadline. It never decides *when* to connect on its own: the
//! driver asks it to [`open`](Connection::open), to
//! [`schedule_reconnect`](Connection::schedule_reconnect) after a loss, and to
//! [`teardown`](Connection::teardown) on an explicit disconnect. Everything it
//! observes comes back through [`next_signal`](Connection::next_signal).

use std::future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ReconnectPolicy;
use crate::error::{Result, SessionError};
use crate::transport::{Connector, Transport};

/// Why the channel went away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseCause {
    /// The server closed the channel cleanly.
    Normal,
    /// The server refused the channel (authentication failure).
    Rejected(String),
    /// The channel failed: transport error, send failure or failed open.
    Failed(String),
}

/// Something the driver has to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// One inbound text frame.
    Message(String),
    /// The open channel is gone. The transport has already been dropped.
    Closed(CloseCause),
    /// The pending reconnect deadline passed.
    ReconnectDue,
}

/// Owner of the game channel.
pub struct Connection<C: Connector> {
    connector: C,
    transport: Option<C::Transport>,
    reconnect_at: Option<Instant>,
    attempts: u32,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
}

impl<C: Connector> Connection<C> {
    pub fn new(connector: C, policy: ReconnectPolicy, connect_timeout: Duration) -> Self {
        Self {
            connector,
            transport: None,
            reconnect_at: None,
            attempts: 0,
            policy,
            connect_timeout,
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_at.is_some()
    }

    /// Open a channel to `url`, bounded by the connect timeout.
    ///
    /// Any pending reconnect is consumed. On success the failed-attempt
    /// counter is reset.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] if the connector did not finish in
    /// time, or the connector's own error.
    pub async fn open(&mut self, url: &str) -> Result<()> {
        self.reconnect_at = None;
        let transport = tokio::time::timeout(self.connect_timeout, self.connector.connect(url))
            .await
            .map_err(|_| SessionError::Timeout)??;
        self.transport = Some(transport);
        self.attempts = 0;
        Ok(())
    }

    /// Transmit one text frame on the open channel.
    ///
    /// A failed send drops the channel; the caller must treat it as lost.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] when no channel is open, or the
    /// transport's send error.
    pub async fn send(&mut self, text: String) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(SessionError::NotConnected)?;
        let result = transport.send(text).await;
        if result.is_err() {
            self.transport = None;
        }
        result
    }

    /// Wait for the next inbound frame, channel loss, or reconnect deadline.
    ///
    /// Pending forever when there is neither a channel nor a deadline.
    /// Cancel-safe.
    pub async fn next_signal(&mut self) -> ChannelSignal {
        if let Some(transport) = self.transport.as_mut() {
            let cause = match transport.recv().await {
                Some(Ok(text)) => return ChannelSignal::Message(text),
                Some(Err(SessionError::ChannelRejected(reason))) => CloseCause::Rejected(reason),
                Some(Err(e)) => CloseCause::Failed(e.to_string()),
                None => CloseCause::Normal,
            };
            self.transport = None;
            return ChannelSignal::Closed(cause);
        }

        match self.reconnect_at {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.reconnect_at = None;
                ChannelSignal::ReconnectDue
            }
            None => future::pending().await,
        }
    }

    /// Arm the reconnect timer after a loss.
    ///
    /// At most one deadline is ever pending and none is armed while a channel
    /// is open. Returns `false` when the attempt cap is exhausted.
    pub fn schedule_reconnect(&mut self) -> bool {
        if self.is_open() {
            return false;
        }
        if self.reconnect_at.is_some() {
            return true;
        }
        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                warn!(attempts = self.attempts, "reconnect attempts exhausted");
                return false;
            }
        }
        self.attempts += 1;
        self.reconnect_at = Some(Instant::now() + self.policy.delay);
        debug!(attempt = self.attempts, delay = ?self.policy.delay, "reconnect scheduled");
        true
    }

    pub fn cancel_reconnect(&mut self) {
        if self.reconnect_at.take().is_some() {
            debug!("pending reconnect cancelled");
        }
    }

    /// Explicit teardown: cancel any reconnect, then close the channel.
    pub async fn teardown(&mut self) {
        self.cancel_reconnect();
        self.attempts = 0;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!(error = %e, "error while closing game channel");
            }
        }
    }
}

impl<C: Connector> std::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("open", &self.is_open())
            .field("reconnect_pending", &self.reconnect_pending())
            .field("attempts", &self.attempts)
            .finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    struct ChannelTransport {
        incoming: mpsc::UnboundedReceiver<Option<String>>,
        closed: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Transport for ChannelTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), SessionError> {
            Err(SessionError::TransportSend("broken pipe".into()))
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            self.incoming.recv().await.flatten().map(Ok)
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }
    }

    struct OneShotConnector {
        transport: std::sync::Mutex<Option<ChannelTransport>>,
    }

    #[async_trait]
    impl Connector for OneShotConnector {
        type Transport = ChannelTransport;

        async fn connect(&self, _url: &str) -> std::result::Result<ChannelTransport, SessionError> {
            self.transport
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| SessionError::TransportReceive("refused".into()))
        }
    }

    fn connection() -> (
        Connection<OneShotConnector>,
        mpsc::UnboundedSender<Option<String>>,
        Arc<AtomicBool>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = ChannelTransport {
            incoming: rx,
            closed: Arc::clone(&closed),
        };
        let connector = OneShotConnector {
            transport: std::sync::Mutex::new(Some(transport)),
        };
        let policy = ReconnectPolicy {
            delay: Duration::from_secs(3),
            max_attempts: Some(2),
        };
        (
            Connection::new(connector, policy, Duration::from_secs(10)),
            tx,
            closed,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_channel_is_not_connected() {
        let (mut conn, _tx, _closed) = connection();
        assert!(matches!(
            conn.send("{}".into()).await,
            Err(SessionError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn messages_then_clean_close() {
        let (mut conn, tx, _closed) = connection();
        conn.open("ws://test/game/?token=t").await.unwrap();
        assert!(conn.is_open());

        tx.send(Some("hello".into())).unwrap();
        assert_eq!(conn.next_signal().await, ChannelSignal::Message("hello".into()));

        tx.send(None).unwrap();
        assert_eq!(
            conn.next_signal().await,
            ChannelSignal::Closed(CloseCause::Normal)
        );
        assert!(!conn.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_drops_channel() {
        let (mut conn, _tx, _closed) = connection();
        conn.open("ws://test").await.unwrap();
        assert!(conn.send("{}".into()).await.is_err());
        assert!(!conn.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_reconnect_is_pending() {
        let (mut conn, _tx, _closed) = connection();
        assert!(conn.schedule_reconnect());
        assert!(conn.schedule_reconnect());

        let start = Instant::now();
        assert_eq!(conn.next_signal().await, ChannelSignal::ReconnectDue);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(!conn.reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_cap_stops_scheduling() {
        let (mut conn, _tx, _closed) = connection();
        assert!(conn.schedule_reconnect());
        conn.cancel_reconnect();
        assert!(conn.schedule_reconnect());
        conn.cancel_reconnect();
        assert!(!conn.schedule_reconnect());
    }

    #[tokio::test(start_paused = true)]
    async fn no_reconnect_while_open() {
        let (mut conn, _tx, _closed) = connection();
        conn.open("ws://test").await.unwrap();
        assert!(!conn.schedule_reconnect());
        assert!(!conn.reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_closes_and_cancels() {
        let (mut conn, _tx, closed) = connection();
        conn.open("ws://test").await.unwrap();
        conn.teardown().await;
        assert!(closed.load(Ordering::Acquire));
        assert!(!conn.is_open());

        assert!(conn.schedule_reconnect());
        conn.teardown().await;
        assert!(!conn.reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_open_reports_connector_error() {
        let (mut conn, _tx, _closed) = connection();
        conn.open("ws://test").await.unwrap();
        conn.teardown().await;
        assert!(conn.open("ws://test").await.is_err());
        assert!(!conn.is_open());
    }
}
