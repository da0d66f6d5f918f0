//! Inbound server events, in the client's own vocabulary.
//!
//! [`SessionEvent`] is what the [`codec`](crate::codec) produces from a wire
//! [`ServerMessage`](crate::protocol::ServerMessage) and what the
//! [`Session`](crate::session::Session) state machine consumes.

use crate::session::{CastTelemetry, CatchOutcome, FightTelemetry, HookedFish, Location};

/// A decoded server event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Greeting after the channel opened. Informational only.
    Greeting { message: String },
    /// The player entered a location.
    Joined { location: Location },
    /// The cast landed at this distance and depth.
    CastResult(CastTelemetry),
    /// A fish is biting.
    Bite { fish: String, intensity: f64 },
    /// The bite went unanswered and the fish left.
    BiteTimeout { message: String },
    /// The fight began with this fish.
    FightStarted(HookedFish),
    /// A full fight snapshot.
    FightUpdate(FightTelemetry),
    /// The fight ended.
    Catch(CatchOutcome),
    /// The server reported an error.
    Error { message: String },
}

impl SessionEvent {
    /// The wire `type` this event was decoded from, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Greeting { .. } => "connected",
            Self::Joined { .. } => "joined",
            Self::CastResult(_) => "cast_result",
            Self::Bite { .. } => "bite",
            Self::BiteTimeout { .. } => "bite_timeout",
            Self::FightStarted(_) => "fight_started",
            Self::FightUpdate(_) => "fight_update",
            Self::Catch(_) => "catch",
            Self::Error { .. } => "error",
        }
    }
}
