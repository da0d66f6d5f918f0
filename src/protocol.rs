//! Wire-compatible protocol types for the game channel.
//!
//! Every message is a flat JSON object discriminated by a snake_case `type`
//! field, e.g. `{"type":"cast","power":0.8,"angle":45}`. Field names here are
//! the server's and must not change; the internal vocabulary lives in
//! [`command`](crate::command) and [`event`](crate::event), and the mapping
//! between the two is [`codec`](crate::codec).
//!
//! Inbound fields are lenient: a missing or `null` field decodes to its natural
//! zero (0, `false`, empty string) instead of failing the whole message.

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Enums ───────────────────────────────────────────────────────────

/// Behavior of the hooked fish as reported in `fight_update`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FishState {
    #[default]
    Passive,
    Active,
    Rush,
    Exhausted,
    /// Any behavior this client version does not know about.
    #[serde(other)]
    Unknown,
}

// ── Payload structs ─────────────────────────────────────────────────

/// Session descriptor carried by `joined`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JoinedPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub location_id: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub location_name: String,
    /// Server-side session state label (informational only).
    #[serde(default, deserialize_with = "nullable")]
    pub state: String,
}

/// Fight snapshot carried by `fight_update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FightStatePayload {
    #[serde(default, deserialize_with = "nullable")]
    pub fish_state: FishState,
    #[serde(default, deserialize_with = "nullable")]
    pub fish_stamina: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub fish_distance: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub fish_direction: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub line_tension: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub line_health: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub drag_level: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub is_critical: bool,
}

/// Outcome record carried by `catch`.
///
/// Successful catches fill the reward fields; failed ones only carry `reason`
/// (e.g. `"line_break"`, `"escaped"`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CatchPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub fish_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub weight: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub price: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub experience: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub leveled_up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_level: Option<u32>,
    #[serde(default, deserialize_with = "nullable")]
    pub achievements: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub reason: String,
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter a fishing location; the server answers with `joined`.
    Join { location_id: u64 },
    /// Cast the line. `power` is 0–1, `angle` is 0–90 degrees.
    Cast { power: f64, angle: f64 },
    /// Set the hook after a bite.
    Hook,
    /// Reel in at the given speed (sent continuously while the reel is held).
    Reel { speed: f64 },
    /// Give the fish line.
    Release,
    /// Adjust the drag, 0.1–1.0.
    SetDrag { level: f64 },
    /// Hold the line without reeling.
    Hold,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting sent right after the channel is accepted.
    Connected {
        #[serde(default, deserialize_with = "nullable")]
        message: String,
    },
    /// The player entered a location.
    Joined {
        #[serde(default, deserialize_with = "nullable")]
        session: JoinedPayload,
    },
    /// The cast landed.
    CastResult {
        #[serde(default, deserialize_with = "nullable")]
        distance: f64,
        #[serde(default, deserialize_with = "nullable")]
        depth: f64,
    },
    /// A fish is biting.
    Bite {
        #[serde(default, deserialize_with = "nullable")]
        fish: String,
        #[serde(default, deserialize_with = "nullable")]
        intensity: f64,
    },
    /// The player did not hook in time; the server is waiting for a bite again.
    BiteTimeout {
        #[serde(default, deserialize_with = "nullable")]
        message: String,
    },
    /// The hook was set and the fight begins.
    FightStarted {
        #[serde(default, deserialize_with = "nullable")]
        fish: String,
        #[serde(default, deserialize_with = "nullable")]
        weight: f64,
    },
    /// Periodic fight snapshot.
    FightUpdate {
        #[serde(default, deserialize_with = "nullable")]
        state: FightStatePayload,
    },
    /// The fight ended, landed or lost.
    Catch {
        #[serde(default, deserialize_with = "nullable")]
        result: CatchPayload,
    },
    /// Server-side error message.
    Error {
        #[serde(default, deserialize_with = "nullable")]
        message: String,
    },
    /// Any `type` this client version does not recognize.
    #[serde(other)]
    Unknown,
}
