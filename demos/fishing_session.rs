//! # Fishing Session Example
//!
//! Demonstrates a complete fishing session lifecycle with a simple auto-angler:
//!
//! 1. Connect to the game server via WebSocket with a stored token
//! 2. Join a location
//! 3. Cast, hook on a bite, and hold the reel during the fight
//! 4. Ease off when the line is critical, report each catch, cast again
//! 5. Shut down gracefully on Ctrl+C
//!
//! ## Running
//!
//! ```sh
//! # Start the game server on localhost:8000, then:
//! FISHING_TOKEN=<jwt> cargo run --example fishing_session
//!
//! # Override the server URL, token file, and location:
//! FISHING_WS_URL=ws://my-server:8000/ws \
//! FISHING_TOKEN_FILE=/tmp/fishing-token \
//! FISHING_LOCATION=2 \
//!     cargo run --example fishing_session
//! ```

use std::sync::Arc;
use std::time::Duration;

use fishing_session_client::config::DEFAULT_SERVER_URL;
use fishing_session_client::transports::WebSocketConnector;
use fishing_session_client::{
    CatchOutcome, ClientConfig, FileTokenStore, Phase, SessionClient, TokenStore,
};

/// Token file used when `FISHING_TOKEN_FILE` is not set.
const DEFAULT_TOKEN_FILE: &str = ".fishing-token";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("FISHING_WS_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
    let token_file =
        std::env::var("FISHING_TOKEN_FILE").unwrap_or_else(|_| DEFAULT_TOKEN_FILE.to_string());
    let location: u64 = std::env::var("FISHING_LOCATION")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    let tokens = Arc::new(FileTokenStore::new(token_file));
    if let Ok(token) = std::env::var("FISHING_TOKEN") {
        tokens.store(&token)?;
    }
    if tokens.load().is_none() {
        tracing::error!(
            "No token: set FISHING_TOKEN or write one to {}",
            tokens.path().display()
        );
        return Ok(());
    }

    let config = ClientConfig::new(url).with_reconnect_delay(Duration::from_secs(3));
    let mut client = SessionClient::start(WebSocketConnector, tokens, config);
    let mut session = client.session();

    // ── Session loop ────────────────────────────────────────────────
    // React to every published snapshot; the driver does the rest.
    let mut joined_requested = false;
    let mut reeling = false;
    let mut last_phase = None;
    loop {
        tokio::select! {
            changed = session.changed() => {
                if changed.is_err() {
                    tracing::info!("Session driver stopped, exiting");
                    break;
                }
                let snapshot = session.borrow_and_update().clone();

                if let Some(error) = snapshot.last_error() {
                    tracing::warn!("Server says: {error}");
                }

                if !snapshot.is_connected() {
                    joined_requested = false;
                    reeling = false;
                    last_phase = None;
                    continue;
                }

                if snapshot.location().is_none() {
                    if !joined_requested {
                        client.join_location(location)?;
                        joined_requested = true;
                    }
                    continue;
                }

                if let Some(outcome) = snapshot.last_catch_result() {
                    match outcome {
                        CatchOutcome::Landed(reward) => tracing::info!(
                            "Landed {} ({:.2} kg): +{} coins, +{} xp",
                            reward.fish_name, reward.weight, reward.price, reward.experience
                        ),
                        CatchOutcome::Lost { reason } => tracing::info!("Lost the fish: {reason}"),
                    }
                    client.dismiss_catch_result()?;
                    continue;
                }

                // Act once per phase change; during a fight, on every update.
                let phase = snapshot.phase();
                if last_phase == Some(phase) && phase != Phase::Fighting {
                    continue;
                }
                last_phase = Some(phase);

                match phase {
                    Phase::Idle => {
                        reeling = false;
                        client.cast(0.8, 45.0)?;
                    }
                    Phase::Waiting => {}
                    Phase::Bite => client.hook()?,
                    Phase::Fighting => {
                        let critical = snapshot
                            .fight_telemetry()
                            .is_some_and(|t| t.critical);
                        if critical && reeling {
                            client.stop_reeling()?;
                            client.release()?;
                            reeling = false;
                        } else if !critical && !reeling {
                            client.begin_reeling()?;
                            reeling = true;
                        }
                    }
                }
            }

            // Ctrl+C: shut down gracefully.
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.shutdown().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
