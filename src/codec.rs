//! Mapping between the client's vocabulary and the wire protocol.
//!
//! [`encode`] turns a [`Command`] into one JSON text frame. [`decode`] turns a
//! text frame into an [`Inbound`]: either a [`SessionEvent`] or a note that the
//! `type` was not recognized. Malformed frames (not JSON, not an object, no
//! string `type`, or a known `type` whose fields have the wrong shape) are
//! reported as [`SessionError::Serialization`] and must not affect state.

use crate::command::Command;
use crate::error::{Result, SessionError};
use crate::event::SessionEvent;
use crate::protocol::{CatchPayload, ClientMessage, FightStatePayload, FishState, ServerMessage};
use crate::session::{
    CastTelemetry, CatchOutcome, CatchReward, FightTelemetry, FishBehavior, HookedFish, Location,
};

/// Result of decoding one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// A known event.
    Event(SessionEvent),
    /// A well-formed message whose `type` this client does not know.
    Unrecognized(String),
}

/// Serialize a command into one text frame.
pub fn encode(command: &Command) -> Result<String> {
    Ok(serde_json::to_string(&ClientMessage::from(command))?)
}

/// Parse one inbound text frame.
pub fn decode(text: &str) -> Result<Inbound> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let kind = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(missing_type)?
        .to_owned();
    let message: ServerMessage = serde_json::from_value(value)?;
    Ok(match into_event(message) {
        Some(event) => Inbound::Event(event),
        None => Inbound::Unrecognized(kind),
    })
}

fn missing_type() -> SessionError {
    SessionError::Serialization(serde::de::Error::missing_field("type"))
}

// ── Outbound ────────────────────────────────────────────────────────

impl From<&Command> for ClientMessage {
    fn from(command: &Command) -> Self {
        match *command {
            Command::Join { location_id } => Self::Join { location_id },
            Command::Cast { power, angle } => Self::Cast { power, angle },
            Command::Hook => Self::Hook,
            Command::Reel { speed } => Self::Reel { speed },
            Command::Release => Self::Release,
            Command::SetDrag { level } => Self::SetDrag { level },
            Command::Hold => Self::Hold,
        }
    }
}

// ── Inbound ─────────────────────────────────────────────────────────

fn into_event(message: ServerMessage) -> Option<SessionEvent> {
    use SessionEvent as E;

    Some(match message {
        ServerMessage::Connected { message } => E::Greeting { message },
        ServerMessage::Joined { session } => E::Joined {
            location: Location {
                id: session.location_id,
                name: session.location_name,
            },
        },
        ServerMessage::CastResult { distance, depth } => {
            E::CastResult(CastTelemetry { distance, depth })
        }
        ServerMessage::Bite { fish, intensity } => E::Bite { fish, intensity },
        ServerMessage::BiteTimeout { message } => E::BiteTimeout { message },
        ServerMessage::FightStarted { fish, weight } => {
            E::FightStarted(HookedFish { name: fish, weight })
        }
        ServerMessage::FightUpdate { state } => E::FightUpdate(state.into()),
        ServerMessage::Catch { result } => E::Catch(result.into()),
        ServerMessage::Error { message } => E::Error { message },
        ServerMessage::Unknown => return None,
    })
}

impl From<FishState> for FishBehavior {
    fn from(state: FishState) -> Self {
        match state {
            FishState::Active => Self::Active,
            FishState::Rush => Self::Rush,
            FishState::Exhausted => Self::Exhausted,
            FishState::Passive | FishState::Unknown => Self::Passive,
        }
    }
}

impl From<FightStatePayload> for FightTelemetry {
    fn from(state: FightStatePayload) -> Self {
        Self {
            behavior: state.fish_state.into(),
            fish_stamina: state.fish_stamina,
            fish_distance: state.fish_distance,
            fish_direction: state.fish_direction,
            line_tension: state.line_tension,
            line_health: state.line_health,
            drag_level: state.drag_level,
            critical: state.is_critical,
        }
    }
}

impl From<CatchPayload> for CatchOutcome {
    fn from(result: CatchPayload) -> Self {
        if result.success {
            Self::Landed(CatchReward {
                fish_name: result.fish_name,
                weight: result.weight,
                price: result.price,
                experience: result.experience,
                leveled_up: result.leveled_up,
                new_level: result.new_level.filter(|&level| level > 0),
                achievements: result.achievements,
            })
        } else {
            Self::Lost {
                reason: result.reason,
            }
        }
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

    #[test]
    fn encode_is_flat() {
        let text = encode(&Command::cast(0.8, 45.0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"type": "cast", "power": 0.8, "angle": 45.0})
        );
    }

    #[test]
    fn encode_unit_commands() {
        assert_eq!(encode(&Command::Hook).unwrap(), r#"{"type":"hook"}"#);
        assert_eq!(encode(&Command::Hold).unwrap(), r#"{"type":"hold"}"#);
        assert_eq!(encode(&Command::Release).unwrap(), r#"{"type":"release"}"#);
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        let inbound = decode(r#"{"type":"weather_changed","rain":true}"#).unwrap();
        assert_eq!(inbound, Inbound::Unrecognized("weather_changed".into()));
    }

    #[test]
    fn missing_type_is_malformed() {
        assert!(matches!(
            decode(r#"{"message":"hi"}"#),
            Err(SessionError::Serialization(_))
        ));
        assert!(matches!(
            decode(r#"{"type":7}"#),
            Err(SessionError::Serialization(_))
        ));
        assert!(decode("not json").is_err());
        assert!(decode("[1,2]").is_err());
    }

    #[test]
    fn wrong_field_shape_is_malformed() {
        assert!(decode(r#"{"type":"bite","fish":42}"#).is_err());
    }

    #[test]
    fn unknown_fish_state_reads_as_passive() {
        let inbound =
            decode(r#"{"type":"fight_update","state":{"fish_state":"sleepy"}}"#).unwrap();
        let Inbound::Event(SessionEvent::FightUpdate(telemetry)) = inbound else {
            panic!("expected fight_update, got {inbound:?}");
        };
        assert_eq!(telemetry.behavior, FishBehavior::Passive);
    }
}
