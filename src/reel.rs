//! Fixed-cadence reel input while the player holds the reel.
//!
//! [`ReelLoop`] is a ticker that exists only between
//! [`begin`](ReelLoop::begin) and [`stop`](ReelLoop::stop). The first tick
//! fires immediately, later ticks every `cadence`. The driver sends one `reel`
//! command per tick and calls [`sync`](ReelLoop::sync) after every step so the
//! ticker never outlives the fight.

use std::future;
use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

use crate::session::Phase;

#[derive(Debug)]
pub struct ReelLoop {
    cadence: Duration,
    speed: f64,
    ticker: Option<Interval>,
}

impl ReelLoop {
    pub fn new(cadence: Duration, speed: f64) -> Self {
        Self {
            cadence,
            speed,
            ticker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Speed sent with every tick.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Start holding. Does nothing if already running.
    pub fn begin(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        let mut ticker = tokio::time::interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        debug!(cadence = ?self.cadence, "reel held");
    }

    /// Stop holding. Returns whether the loop was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.ticker.take().is_some();
        if was_running {
            debug!("reel released");
        }
        was_running
    }

    /// Tear the loop down once the fight is over.
    pub fn sync(&mut self, phase: Phase) {
        if phase != Phase::Fighting {
            self.stop();
        }
    }

    /// Wait for the next tick. Pending forever while stopped. Cancel-safe.
    pub async fn tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate_then_cadence() {
        let mut reel = ReelLoop::new(Duration::from_millis(100), 0.5);
        reel.begin();

        let start = Instant::now();
        reel.tick().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        reel.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        reel.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_loop_never_ticks() {
        let mut reel = ReelLoop::new(Duration::from_millis(100), 0.5);
        let ticked = tokio::time::timeout(Duration::from_secs(1), reel.tick()).await;
        assert!(ticked.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn sync_stops_outside_fighting() {
        let mut reel = ReelLoop::new(Duration::from_millis(100), 0.5);
        reel.begin();
        reel.sync(Phase::Fighting);
        assert!(reel.is_running());
        reel.sync(Phase::Idle);
        assert!(!reel.is_running());
        assert!(!reel.stop());
    }
}
