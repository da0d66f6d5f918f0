//! Async session client for the fishing game channel.
//!
//! [`SessionClient`] is a thin handle that talks to one background driver task
//! over an unbounded MPSC channel. The driver owns the [`Session`], the
//! [`Account`], the game [`Connection`] and the [`ReelLoop`]; every inbound
//! frame, user action, reconnect deadline and reel tick is handled to
//! completion before the next one is looked at, so state is never shared
//! behind a lock. Readers observe state through [`tokio::sync::watch`]
//! receivers.
//!
//! # Example
//!
//! ```rust,ignore
//! let tokens = Arc::new(FileTokenStore::new("token"));
//! let config = ClientConfig::new("ws://localhost:8000/ws");
//! let client = SessionClient::start(WebSocketConnector, tokens, config);
//!
//! client.join_location(1)?;
//! let mut session = client.session();
//! session.wait_for(|s| s.location().is_some()).await?;
//! client.cast(0.8, 45.0)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::account::{Account, Profile};
use crate::codec::{self, Inbound};
use crate::command::Command;
use crate::config::ClientConfig;
use crate::connection::{ChannelSignal, CloseCause, Connection};
use crate::error::{Result, SessionError};
use crate::reel::ReelLoop;
use crate::session::{Connectivity, Effect, Phase, Session};
use crate::token::TokenStore;
use crate::transport::Connector;

// ── Actions ─────────────────────────────────────────────────────────

/// Requests from the handle to the driver.
#[derive(Debug)]
enum Action {
    Connect,
    Disconnect,
    SignIn(String),
    SignOut,
    Send(Command),
    LeaveLocation,
    BeginReeling,
    StopReeling,
    DismissCatchResult,
    SetProfile(Box<Profile>),
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a running fishing session.
///
/// Created via [`SessionClient::start`]. All action methods return as soon as
/// the request is queued for the driver; the outcome shows up in the published
/// [`Session`]. They only fail with [`SessionError::Stopped`] once the driver
/// is gone.
pub struct SessionClient {
    actions: mpsc::UnboundedSender<Action>,
    session: watch::Receiver<Session>,
    account: watch::Receiver<Account>,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl SessionClient {
    /// Spawn the session driver and return its handle.
    ///
    /// The driver immediately tries to connect with the token in `tokens`;
    /// with no stored token it stays disconnected until
    /// [`sign_in`](Self::sign_in). Must be called inside a tokio runtime.
    pub fn start<C: Connector>(
        connector: C,
        tokens: Arc<dyn TokenStore>,
        config: ClientConfig,
    ) -> Self {
        let (actions, action_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (session_tx, session) = watch::channel(Session::new());
        let (account_tx, account) = watch::channel(Account::new());

        // Cannot fail: the receiver is alive until the driver is spawned.
        let _ = actions.send(Action::Connect);

        let shutdown_timeout = config.shutdown_timeout;

        let driver = Driver {
            connection: Connection::new(connector, config.reconnect, config.connect_timeout),
            reel: ReelLoop::new(config.reel_cadence, config.reel_speed),
            session: Session::new(),
            account: Account::new(),
            session_tx,
            account_tx,
            tokens,
            actions: action_rx,
            shutdown_rx,
            config,
        };
        let task = tokio::spawn(driver.run());

        Self {
            actions,
            session,
            account,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        }
    }

    // ── Connection lifecycle ────────────────────────────────────────

    /// Open the game channel with the stored token.
    ///
    /// No-op when already connected. Without a stored token this only cancels
    /// a pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn connect(&self) -> Result<()> {
        self.request(Action::Connect)
    }

    /// Close the game channel and cancel any pending reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn disconnect(&self) -> Result<()> {
        self.request(Action::Disconnect)
    }

    /// Store `token` and (re)connect with it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn sign_in(&self, token: impl Into<String>) -> Result<()> {
        self.request(Action::SignIn(token.into()))
    }

    /// Forget the token, close the channel and reset session and account.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn sign_out(&self) -> Result<()> {
        self.request(Action::SignOut)
    }

    // ── Game actions ────────────────────────────────────────────────

    /// Enter a fishing location.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn join_location(&self, location_id: u64) -> Result<()> {
        self.request(Action::Send(Command::Join { location_id }))
    }

    /// Leave the current location. Purely local; the server is not told.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn leave_location(&self) -> Result<()> {
        self.request(Action::LeaveLocation)
    }

    /// Cast with `power` (0–1) and `angle` (0–90 degrees). Only sent while idle.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn cast(&self, power: f64, angle: f64) -> Result<()> {
        self.request(Action::Send(Command::cast(power, angle)))
    }

    /// Set the hook. Only sent during a bite.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn hook(&self) -> Result<()> {
        self.request(Action::Send(Command::Hook))
    }

    /// Send a single `reel` at `speed`. Only sent while fighting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn reel(&self, speed: f64) -> Result<()> {
        self.request(Action::Send(Command::reel(speed)))
    }

    /// Give the fish line. Only sent while fighting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn release(&self) -> Result<()> {
        self.request(Action::Send(Command::Release))
    }

    /// Adjust the drag (0.1–1.0). Only sent while fighting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn set_drag(&self, level: f64) -> Result<()> {
        self.request(Action::Send(Command::set_drag(level)))
    }

    /// Hold the line. Only sent while fighting.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn hold(&self) -> Result<()> {
        self.request(Action::Send(Command::Hold))
    }

    /// Start holding the reel: one `reel` now, then one per reel cadence until
    /// [`stop_reeling`](Self::stop_reeling) or the fight ends. Ignored outside
    /// a fight.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn begin_reeling(&self) -> Result<()> {
        self.request(Action::BeginReeling)
    }

    /// Stop holding the reel.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn stop_reeling(&self) -> Result<()> {
        self.request(Action::StopReeling)
    }

    /// Clear the last catch result.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn dismiss_catch_result(&self) -> Result<()> {
        self.request(Action::DismissCatchResult)
    }

    /// Replace the account with a profile fetched from the server.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Stopped`] if the driver is gone.
    pub fn set_profile(&self, profile: Profile) -> Result<()> {
        self.request(Action::SetProfile(Box::new(profile)))
    }

    // ── State ───────────────────────────────────────────────────────

    /// A receiver for published session snapshots.
    pub fn session(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// The latest published session.
    pub fn snapshot(&self) -> Session {
        self.session.borrow().clone()
    }

    /// A receiver for published account snapshots.
    pub fn account(&self) -> watch::Receiver<Account> {
        self.account.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.session.borrow().is_connected()
    }

    /// Stop the driver, closing the game channel.
    pub async fn shutdown(&mut self) {
        debug!("SessionClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session driver terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session driver did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session driver aborted: {join_err}");
                    }
                }
            }
        }
    }

    fn request(&self, action: Action) -> Result<()> {
        self.actions.send(action).map_err(|_| SessionError::Stopped)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.borrow();
        f.debug_struct("SessionClient")
            .field("connectivity", &session.connectivity())
            .field("phase", &session.phase())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        // No executor to drive a graceful close from here.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Driver ──────────────────────────────────────────────────────────

/// What woke the driver.
enum Step {
    Action(Option<Action>),
    Shutdown,
    Channel(ChannelSignal),
    ReelTick,
}

struct Driver<C: Connector> {
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    connection: Connection<C>,
    reel: ReelLoop,
    session: Session,
    account: Account,
    session_tx: watch::Sender<Session>,
    account_tx: watch::Sender<Account>,
    actions: mpsc::UnboundedReceiver<Action>,
    shutdown_rx: oneshot::Receiver<()>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        debug!("session driver started");

        loop {
            let step = tokio::select! {
                action = self.actions.recv() => Step::Action(action),
                _ = &mut self.shutdown_rx => Step::Shutdown,
                signal = self.connection.next_signal() => Step::Channel(signal),
                () = self.reel.tick() => Step::ReelTick,
            };

            match step {
                Step::Action(Some(action)) => self.handle_action(action).await,
                Step::Action(None) => {
                    debug!("action channel closed, stopping session driver");
                    break;
                }
                Step::Shutdown => {
                    debug!("shutdown signal received");
                    break;
                }
                Step::Channel(signal) => self.handle_signal(signal).await,
                Step::ReelTick => self.dispatch(Command::reel(self.reel.speed())).await,
            }

            self.reel.sync(self.session.phase());
            self.publish();
        }

        self.reel.stop();
        self.connection.teardown().await;
        self.session.set_connectivity(Connectivity::Disconnected);
        self.publish();
        debug!("session driver exited");
    }

    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Connect => self.connect().await,
            Action::Disconnect => {
                self.connection.teardown().await;
                self.reel.stop();
                self.session.set_connectivity(Connectivity::Disconnected);
                info!("disconnected from game server");
            }
            Action::SignIn(token) => {
                if let Err(e) = self.tokens.store(&token) {
                    error!(error = %e, "failed to store token");
                    self.session.set_error(format!("failed to store token: {e}"));
                    return;
                }
                self.connection.teardown().await;
                self.reel.stop();
                self.session = Session::new();
                self.account.clear();
                info!("signed in");
                self.connect().await;
            }
            Action::SignOut => {
                if let Err(e) = self.tokens.clear() {
                    error!(error = %e, "failed to clear token");
                }
                self.connection.teardown().await;
                self.reel.stop();
                self.session = Session::new();
                self.account.clear();
                info!("signed out");
            }
            Action::Send(command) => self.dispatch(command).await,
            Action::LeaveLocation => {
                self.reel.stop();
                self.session.leave();
            }
            Action::BeginReeling => {
                if self.session.phase() == Phase::Fighting {
                    self.reel.begin();
                } else {
                    debug!(phase = ?self.session.phase(), "reel hold ignored outside a fight");
                }
            }
            Action::StopReeling => {
                self.reel.stop();
            }
            Action::DismissCatchResult => self.session.dismiss_catch_result(),
            Action::SetProfile(profile) => self.account.set_profile(*profile),
        }
    }

    async fn handle_signal(&mut self, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Message(text) => self.handle_message(&text),
            ChannelSignal::Closed(cause) => self.channel_lost(cause),
            ChannelSignal::ReconnectDue => {
                info!("reconnecting to game server");
                self.connect().await;
            }
        }
    }

    fn handle_message(&mut self, text: &str) {
        match codec::decode(text) {
            Ok(Inbound::Event(event)) => {
                debug!(event = event.kind(), "received server event");
                if let Effect::CreditCatch(reward) = self.session.apply(event) {
                    self.account.credit_catch(&reward);
                }
            }
            Ok(Inbound::Unrecognized(kind)) => {
                debug!(%kind, "ignoring unrecognized server message");
            }
            Err(e) => {
                warn!(error = %e, raw = %text, "malformed server message ignored");
            }
        }
    }

    async fn connect(&mut self) {
        if self.connection.is_open() {
            debug!("already connected");
            return;
        }
        self.connection.cancel_reconnect();
        let Some(token) = self.tokens.load() else {
            debug!("no token stored, not connecting");
            return;
        };

        let url = self.config.channel_url(&token);
        match self.connection.open(&url).await {
            Ok(()) => {
                info!(server = %self.config.server_url, "connected to game server");
                self.session.set_connectivity(Connectivity::Connected);
                self.session.clear_error();
            }
            Err(SessionError::ChannelRejected(reason)) => {
                self.channel_lost(CloseCause::Rejected(reason));
            }
            Err(e) => {
                error!(error = %e, "connection to game server failed");
                self.channel_lost(CloseCause::Failed(e.to_string()));
            }
        }
    }

    /// The channel is gone: update state and arm a single reconnect.
    fn channel_lost(&mut self, cause: CloseCause) {
        self.session.set_connectivity(Connectivity::Disconnected);
        self.reel.stop();
        match cause {
            CloseCause::Normal => info!("game channel closed by server"),
            CloseCause::Rejected(reason) => {
                warn!(%reason, "game server rejected the session");
                self.session.reset();
            }
            CloseCause::Failed(reason) => {
                error!(%reason, "game channel failed");
                self.session
                    .set_error(format!("connection to game server failed: {reason}"));
            }
        }

        if self.connection.schedule_reconnect() {
            info!(delay = ?self.config.reconnect.delay, "reconnect scheduled");
        }
    }

    /// Guard, encode and transmit one command.
    async fn dispatch(&mut self, command: Command) {
        if !self.session.permits(&command) {
            warn!(
                command = command.kind(),
                phase = ?self.session.phase(),
                "command not allowed in current phase, dropped"
            );
            return;
        }

        let text = match codec::encode(&command) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to serialize command: {e}");
                return;
            }
        };

        match self.connection.send(text).await {
            Ok(()) => {
                debug!(command = command.kind(), "sent command");
                self.session.record_action(&command);
            }
            Err(SessionError::NotConnected) => {
                warn!(command = command.kind(), "not connected, command dropped");
            }
            Err(e) => {
                error!("transport send error: {e}");
                self.channel_lost(CloseCause::Failed(e.to_string()));
            }
        }
    }

    /// Publish snapshots that changed since the last step.
    fn publish(&self) {
        self.session_tx.send_if_modified(|published| {
            if *published == self.session {
                return false;
            }
            published.clone_from(&self.session);
            true
        });
        self.account_tx.send_if_modified(|published| {
            if *published == self.account {
                return false;
            }
            published.clone_from(&self.account);
            true
        });
    }
}

// ── Tests ───────────────────────────────────────────────────────────

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
    use crate::token::MemoryTokenStore;
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A transport that never delivers anything.
    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), SessionError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            Ok(())
        }
    }

    #[derive(Default, Clone)]
    struct CountingConnector {
        attempts: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        type Transport = SilentTransport;

        async fn connect(&self, _url: &str) -> std::result::Result<SilentTransport, SessionError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(SilentTransport)
        }
    }

    fn start(token: Option<&str>) -> (SessionClient, CountingConnector) {
        let tokens: Arc<dyn TokenStore> = match token {
            Some(token) => Arc::new(MemoryTokenStore::with_token(token)),
            None => Arc::new(MemoryTokenStore::new()),
        };
        let connector = CountingConnector::default();
        let client = SessionClient::start(connector.clone(), tokens, ClientConfig::default());
        (client, connector)
    }

    #[tokio::test(start_paused = true)]
    async fn start_connects_with_stored_token() {
        let (client, connector) = start(Some("tok"));
        let mut session = client.session();
        session.wait_for(Session::is_connected).await.unwrap();
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn start_without_token_stays_disconnected() {
        let (client, connector) = start(None);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn actions_fail_after_shutdown() {
        let (mut client, _connector) = start(None);
        client.shutdown().await;
        assert!(matches!(client.hook(), Err(SessionError::Stopped)));
        assert!(matches!(client.connect(), Err(SessionError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_publishes_disconnected() {
        let (mut client, _connector) = start(Some("tok"));
        let mut session = client.session();
        session.wait_for(Session::is_connected).await.unwrap();
        client.shutdown().await;
        assert!(!client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn debug_output_names_state() {
        let (client, _connector) = start(None);
        let debug = format!("{client:?}");
        assert!(debug.contains("SessionClient"));
        assert!(debug.contains("phase"));
    }
}
