//! Client configuration.

use std::time::Duration;

/// Default game server base URL.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000/ws";

/// Delay before a reconnect attempt after the channel is lost.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Reconnect forever.
pub const UNLIMITED_RECONNECT_ATTEMPTS: Option<u32> = None;

/// Upper bound on one channel opening attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between `reel` messages while the reel is held.
pub const DEFAULT_REEL_CADENCE: Duration = Duration::from_millis(100);

/// Speed sent with every continuous `reel` message.
pub const DEFAULT_REEL_SPEED: f64 = 0.5;

/// Default timeout for the graceful shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

const MIN_REEL_CADENCE: Duration = Duration::from_millis(1);

/// When and how often to reopen a lost channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Fixed delay before each attempt.
    pub delay: Duration,
    /// Consecutive failed attempts after which reconnecting stops.
    /// `None` retries indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
            max_attempts: UNLIMITED_RECONNECT_ATTEMPTS,
        }
    }
}

/// Configuration for a [`SessionClient`](crate::client::SessionClient).
///
/// # Example
///
/// ```
/// use fishing_session_client::config::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("wss://fish.example.com/ws")
///     .with_reconnect_delay(Duration::from_secs(5))
///     .with_max_reconnect_attempts(10)
///     .with_reel_cadence(Duration::from_millis(50));
///
/// assert_eq!(
///     config.channel_url("abc"),
///     "wss://fish.example.com/ws/game/?token=abc"
/// );
/// assert_eq!(config.reconnect.max_attempts, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the game server, without the `/game/` path.
    pub server_url: String,
    pub reconnect: ReconnectPolicy,
    /// Defaults to **10 seconds**.
    pub connect_timeout: Duration,
    /// Defaults to **100 ms**. Values below 1 ms are clamped to 1 ms.
    pub reel_cadence: Duration,
    /// Defaults to **0.5**. Negative values are clamped to 0.
    pub reel_speed: f64,
    /// Time the driver gets to close the channel on
    /// [`shutdown`](crate::client::SessionClient::shutdown) before it is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}

impl ClientConfig {
    /// Configuration for `server_url` with default values.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reel_cadence: DEFAULT_REEL_CADENCE,
            reel_speed: DEFAULT_REEL_SPEED,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.delay = delay;
        self
    }

    /// Stop reconnecting after `attempts` consecutive failures.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.reconnect.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Values below 1 ms are clamped to 1 ms.
    #[must_use]
    pub fn with_reel_cadence(mut self, cadence: Duration) -> Self {
        self.reel_cadence = cadence.max(MIN_REEL_CADENCE);
        self
    }

    /// Negative values are clamped to 0.
    #[must_use]
    pub fn with_reel_speed(mut self, speed: f64) -> Self {
        self.reel_speed = speed.max(0.0);
        self
    }

    /// A zero timeout aborts the driver immediately on shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Full channel URL for `token`.
    pub fn channel_url(&self, token: &str) -> String {
        format!(
            "{}/game/?token={token}",
            self.server_url.trim_end_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.reconnect.delay, Duration::from_secs(3));
        assert_eq!(config.reconnect.max_attempts, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.reel_cadence, Duration::from_millis(100));
        assert_eq!(config.reel_speed, 0.5);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }

    #[test]
    fn builders_clamp() {
        let config = ClientConfig::new("ws://h")
            .with_reel_cadence(Duration::ZERO)
            .with_reel_speed(-2.0);
        assert_eq!(config.reel_cadence, Duration::from_millis(1));
        assert_eq!(config.reel_speed, 0.0);
    }

    #[test]
    fn channel_url_tolerates_trailing_slash() {
        let config = ClientConfig::new("ws://localhost:8000/ws/");
        assert_eq!(
            config.channel_url("t0k"),
            "ws://localhost:8000/ws/game/?token=t0k"
        );
    }
}
