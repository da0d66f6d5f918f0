//! Session state store and the phase state machine that drives it.
//!
//! A [`Session`] is the single source of truth for one authenticated player's
//! fishing attempt: connectivity, phase, location, cast and fight telemetry,
//! the last catch outcome and the last error. It is mutated only by
//! [`Session::apply`] (inbound events), [`Session::record_action`] (outbound
//! actions that passed [`Session::permits`]) and the explicit lifecycle calls.
//!
//! Phase-scoped data lives inside the private stage enum, so the hooked fish
//! exists only from `bite` through `fighting` and fight telemetry only during
//! `fighting`. Connectivity is a separate axis and never touches the phase.

use tracing::{debug, info, warn};

use crate::command::Command;
use crate::event::SessionEvent;

/// Liveness of the game channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Disconnected,
    Connected,
}

/// Stage of the current fishing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Waiting,
    Bite,
    Fighting,
}

/// The location the player joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub id: u64,
    pub name: String,
}

/// Where the cast landed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CastTelemetry {
    pub distance: f64,
    pub depth: f64,
}

/// The fish on the line. `weight` is 0 until the fight starts.
#[derive(Debug, Clone, PartialEq)]
pub struct HookedFish {
    pub name: String,
    pub weight: f64,
}

/// How the hooked fish is behaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FishBehavior {
    #[default]
    Passive,
    Active,
    Rush,
    Exhausted,
}

/// One server snapshot of the fight. Always replaced as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FightTelemetry {
    pub behavior: FishBehavior,
    /// 0–100.
    pub fish_stamina: f64,
    pub fish_distance: f64,
    /// Degrees.
    pub fish_direction: f64,
    /// 0–100.
    pub line_tension: f64,
    /// 0–100.
    pub line_health: f64,
    /// 0.1–1.0.
    pub drag_level: f64,
    pub critical: bool,
}

/// Rewards of a landed fish.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatchReward {
    pub fish_name: String,
    pub weight: f64,
    pub price: u64,
    pub experience: u64,
    pub leveled_up: bool,
    /// Level after the catch as computed by the server, if reported.
    pub new_level: Option<u32>,
    pub achievements: Vec<String>,
}

/// How a fight ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CatchOutcome {
    Landed(CatchReward),
    Lost { reason: String },
}

impl CatchOutcome {
    /// Whether the fish was landed.
    pub fn success(&self) -> bool {
        matches!(self, Self::Landed(_))
    }

    /// Why the fish was lost, for failed outcomes.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Landed(_) => None,
            Self::Lost { reason } => Some(reason),
        }
    }
}

/// Side effect the caller must carry out after [`Session::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// A fish was landed; credit the account.
    CreditCatch(CatchReward),
}

#[derive(Debug, Clone, PartialEq, Default)]
enum Stage {
    #[default]
    Idle,
    Waiting,
    Bite {
        fish: HookedFish,
    },
    Fighting {
        fish: HookedFish,
        telemetry: Option<FightTelemetry>,
    },
}

/// The session state store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Session {
    connectivity: Connectivity,
    stage: Stage,
    location: Option<Location>,
    cast: Option<CastTelemetry>,
    last_catch: Option<CatchOutcome>,
    last_error: Option<String>,
}

impl Session {
    /// An empty session: disconnected, idle, no location.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Readers ─────────────────────────────────────────────────────

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity == Connectivity::Connected
    }

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Idle => Phase::Idle,
            Stage::Waiting => Phase::Waiting,
            Stage::Bite { .. } => Phase::Bite,
            Stage::Fighting { .. } => Phase::Fighting,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Present once the cast landed, until the attempt returns to idle.
    pub fn cast_telemetry(&self) -> Option<CastTelemetry> {
        self.cast
    }

    pub fn hooked_fish(&self) -> Option<&HookedFish> {
        match &self.stage {
            Stage::Bite { fish } | Stage::Fighting { fish, .. } => Some(fish),
            Stage::Idle | Stage::Waiting => None,
        }
    }

    /// Latest fight snapshot; `None` outside `fighting` and before the first update.
    ///
    /// Telemetry implies [`Phase::Fighting`], not the reverse: a fight that has
    /// started but not yet reported reads as fighting with no telemetry.
    pub fn fight_telemetry(&self) -> Option<&FightTelemetry> {
        match &self.stage {
            Stage::Fighting { telemetry, .. } => telemetry.as_ref(),
            _ => None,
        }
    }

    pub fn last_catch_result(&self) -> Option<&CatchOutcome> {
        self.last_catch.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // ── Channel-driven updates ──────────────────────────────────────

    pub fn set_connectivity(&mut self, connectivity: Connectivity) {
        self.connectivity = connectivity;
    }

    /// Record a user-visible error without touching the phase.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    // ── State machine ───────────────────────────────────────────────

    /// Apply one inbound event.
    ///
    /// The server is authoritative: events that arrive in an unexpected phase
    /// are still applied (and logged), except `fight_update`, which is dropped
    /// outside `fighting` since telemetry only exists during a fight.
    pub fn apply(&mut self, event: SessionEvent) -> Effect {
        let phase = self.phase();
        match event {
            SessionEvent::Greeting { message } => {
                info!(%message, "game server greeting");
            }
            SessionEvent::Joined { location } => {
                info!(location_id = location.id, location = %location.name, "joined location");
                self.location = Some(location);
                self.stage = Stage::Idle;
                self.cast = None;
                self.last_error = None;
            }
            SessionEvent::CastResult(cast) => {
                if phase != Phase::Idle {
                    warn!(?phase, "cast_result outside idle phase, applying");
                }
                debug!(distance = cast.distance, depth = cast.depth, "cast landed");
                self.cast = Some(cast);
                self.stage = Stage::Waiting;
            }
            SessionEvent::Bite { fish, intensity } => {
                if phase != Phase::Waiting {
                    warn!(?phase, "bite outside waiting phase, applying");
                }
                debug!(%fish, intensity, "bite");
                self.stage = Stage::Bite {
                    fish: HookedFish {
                        name: fish,
                        weight: 0.0,
                    },
                };
            }
            SessionEvent::BiteTimeout { message } => {
                if phase != Phase::Bite {
                    warn!(?phase, "bite_timeout outside bite phase, applying");
                }
                self.stage = Stage::Waiting;
                self.last_error = Some(message);
            }
            SessionEvent::FightStarted(started) => {
                if phase != Phase::Bite {
                    warn!(?phase, "fight_started outside bite phase, applying");
                }
                let name = match (&self.stage, started.name.is_empty()) {
                    (Stage::Bite { fish }, true) => fish.name.clone(),
                    _ => started.name,
                };
                debug!(fish = %name, weight = started.weight, "fight started");
                self.stage = Stage::Fighting {
                    fish: HookedFish {
                        name,
                        weight: started.weight,
                    },
                    telemetry: None,
                };
            }
            SessionEvent::FightUpdate(update) => match &mut self.stage {
                Stage::Fighting { telemetry, .. } => *telemetry = Some(update),
                _ => debug!(?phase, "fight_update outside fighting phase, dropped"),
            },
            SessionEvent::Catch(outcome) => {
                if phase != Phase::Fighting {
                    warn!(?phase, "catch outside fighting phase, applying");
                }
                self.stage = Stage::Idle;
                self.cast = None;
                let effect = match &outcome {
                    CatchOutcome::Landed(reward) => {
                        info!(fish = %reward.fish_name, weight = reward.weight, "fish landed");
                        Effect::CreditCatch(reward.clone())
                    }
                    CatchOutcome::Lost { reason } => {
                        info!(%reason, "fish lost");
                        Effect::None
                    }
                };
                self.last_catch = Some(outcome);
                return effect;
            }
            SessionEvent::Error { message } => {
                warn!(%message, "game server error");
                self.last_error = Some(message);
            }
        }
        Effect::None
    }

    /// Client-side guard: whether `command` makes sense in the current phase.
    pub fn permits(&self, command: &Command) -> bool {
        command
            .required_phase()
            .is_none_or(|required| required == self.phase())
    }

    /// Local bookkeeping for an action that passed the guard.
    ///
    /// Any new action clears the last error; a cast also clears the previous
    /// catch result. The phase itself only moves on the server's answer.
    pub fn record_action(&mut self, command: &Command) {
        self.last_error = None;
        if matches!(command, Command::Cast { .. }) {
            self.last_catch = None;
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub fn dismiss_catch_result(&mut self) {
        self.last_catch = None;
    }

    /// Leave the location: back to an empty session on the same channel.
    pub fn leave(&mut self) {
        if let Some(location) = &self.location {
            info!(location_id = location.id, "left location");
        }
        self.reset();
    }

    /// Drop everything except connectivity.
    pub fn reset(&mut self) {
        *self = Self {
            connectivity: self.connectivity,
            ..Self::default()
        };
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

    fn joined(id: u64) -> SessionEvent {
        SessionEvent::Joined {
            location: Location {
                id,
                name: "Silver Lake".into(),
            },
        }
    }

    fn cast_result() -> SessionEvent {
        SessionEvent::CastResult(CastTelemetry {
            distance: 24.5,
            depth: 3.0,
        })
    }

    fn bite() -> SessionEvent {
        SessionEvent::Bite {
            fish: "Carp".into(),
            intensity: 0.6,
        }
    }

    fn fight_started() -> SessionEvent {
        SessionEvent::FightStarted(HookedFish {
            name: "Carp".into(),
            weight: 2.5,
        })
    }

    fn telemetry(tension: f64) -> FightTelemetry {
        FightTelemetry {
            behavior: FishBehavior::Active,
            fish_stamina: 80.0,
            fish_distance: 12.0,
            fish_direction: 45.0,
            line_tension: tension,
            line_health: 100.0,
            drag_level: 0.5,
            critical: false,
        }
    }

    fn landed() -> SessionEvent {
        SessionEvent::Catch(CatchOutcome::Landed(CatchReward {
            fish_name: "Carp".into(),
            weight: 2.5,
            price: 40,
            experience: 25,
            leveled_up: false,
            new_level: Some(1),
            achievements: vec![],
        }))
    }

    fn lost(reason: &str) -> SessionEvent {
        SessionEvent::Catch(CatchOutcome::Lost {
            reason: reason.into(),
        })
    }

    fn fighting_session() -> Session {
        let mut session = Session::new();
        for event in [joined(1), cast_result(), bite(), fight_started()] {
            session.apply(event);
        }
        session
    }

    #[test]
    fn full_cycle_follows_transition_table() {
        for connectivity in [Connectivity::Disconnected, Connectivity::Connected] {
            let mut session = Session::new();
            session.set_connectivity(connectivity);

            session.apply(joined(3));
            assert_eq!(session.phase(), Phase::Idle);
            assert_eq!(session.location().unwrap().id, 3);

            session.apply(cast_result());
            assert_eq!(session.phase(), Phase::Waiting);
            assert_eq!(session.cast_telemetry().unwrap().distance, 24.5);

            session.apply(bite());
            assert_eq!(session.phase(), Phase::Bite);
            assert_eq!(session.hooked_fish().unwrap().name, "Carp");
            assert_eq!(session.hooked_fish().unwrap().weight, 0.0);

            session.apply(fight_started());
            assert_eq!(session.phase(), Phase::Fighting);
            assert_eq!(session.hooked_fish().unwrap().weight, 2.5);

            session.apply(SessionEvent::FightUpdate(telemetry(30.0)));
            assert_eq!(session.phase(), Phase::Fighting);

            let effect = session.apply(landed());
            assert_eq!(session.phase(), Phase::Idle);
            assert!(matches!(effect, Effect::CreditCatch(ref r) if r.price == 40));

            // Connectivity is never touched by events.
            assert_eq!(session.connectivity(), connectivity);
        }
    }

    #[test]
    fn fight_telemetry_is_replaced_wholesale() {
        let mut session = fighting_session();
        assert_eq!(session.phase(), Phase::Fighting);
        assert!(session.fight_telemetry().is_none());

        session.apply(SessionEvent::FightUpdate(telemetry(30.0)));
        let second = FightTelemetry {
            behavior: FishBehavior::Rush,
            critical: true,
            ..FightTelemetry::default()
        };
        session.apply(SessionEvent::FightUpdate(second));

        assert_eq!(session.fight_telemetry(), Some(&second));
    }

    #[test]
    fn telemetry_absent_outside_fighting() {
        let mut session = Session::new();
        session.apply(joined(1));
        session.apply(SessionEvent::FightUpdate(telemetry(10.0)));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.fight_telemetry().is_none());

        let mut session = fighting_session();
        session.apply(SessionEvent::FightUpdate(telemetry(10.0)));
        session.apply(landed());
        assert!(session.fight_telemetry().is_none());
        assert!(session.hooked_fish().is_none());
    }

    #[test]
    fn failed_catch_clears_fight_state_without_reward() {
        let mut session = fighting_session();
        session.apply(SessionEvent::FightUpdate(telemetry(99.0)));

        let effect = session.apply(lost("line_break"));

        assert_eq!(effect, Effect::None);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.hooked_fish().is_none());
        assert!(session.fight_telemetry().is_none());
        let outcome = session.last_catch_result().unwrap();
        assert!(!outcome.success());
        assert_eq!(outcome.reason(), Some("line_break"));
    }

    #[test]
    fn bite_outside_waiting_is_applied() {
        let mut session = Session::new();
        session.apply(joined(1));
        session.apply(bite());
        assert_eq!(session.phase(), Phase::Bite);
        assert_eq!(session.hooked_fish().unwrap().name, "Carp");
    }

    #[test]
    fn bite_timeout_returns_to_waiting() {
        let mut session = Session::new();
        for event in [joined(1), cast_result(), bite()] {
            session.apply(event);
        }
        session.apply(SessionEvent::BiteTimeout {
            message: "The fish got away".into(),
        });
        assert_eq!(session.phase(), Phase::Waiting);
        assert!(session.hooked_fish().is_none());
        assert_eq!(session.last_error(), Some("The fish got away"));
    }

    #[test]
    fn fight_started_keeps_bite_name_when_missing() {
        let mut session = Session::new();
        for event in [joined(1), cast_result(), bite()] {
            session.apply(event);
        }
        session.apply(SessionEvent::FightStarted(HookedFish {
            name: String::new(),
            weight: 1.2,
        }));
        let fish = session.hooked_fish().unwrap();
        assert_eq!(fish.name, "Carp");
        assert_eq!(fish.weight, 1.2);
    }

    #[test]
    fn error_event_keeps_phase() {
        let mut session = Session::new();
        for event in [joined(1), cast_result()] {
            session.apply(event);
        }
        session.apply(SessionEvent::Error {
            message: "No bait equipped".into(),
        });
        assert_eq!(session.phase(), Phase::Waiting);
        assert_eq!(session.last_error(), Some("No bait equipped"));
    }

    #[test]
    fn joined_clears_error_and_resets_attempt() {
        let mut session = fighting_session();
        session.set_error("boom");
        session.apply(joined(2));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.last_error().is_none());
        assert!(session.hooked_fish().is_none());
        assert!(session.cast_telemetry().is_none());
        assert_eq!(session.location().unwrap().id, 2);
    }

    #[test]
    fn guards_follow_phase() {
        let mut session = Session::new();
        session.apply(joined(1));
        assert!(session.permits(&Command::cast(0.5, 45.0)));
        assert!(!session.permits(&Command::Hook));
        assert!(!session.permits(&Command::reel(0.5)));

        let session = fighting_session();
        assert!(!session.permits(&Command::cast(0.5, 45.0)));
        assert!(session.permits(&Command::reel(0.5)));
        assert!(session.permits(&Command::Release));
        assert!(session.permits(&Command::set_drag(0.4)));
        assert!(session.permits(&Command::Hold));
        assert!(session.permits(&Command::Join { location_id: 9 }));
    }

    #[test]
    fn cast_action_clears_previous_outcome_and_error() {
        let mut session = fighting_session();
        session.apply(lost("escaped"));
        session.set_error("old");

        session.record_action(&Command::Hook);
        assert!(session.last_error().is_none());
        assert!(session.last_catch_result().is_some());

        session.record_action(&Command::cast(0.5, 45.0));
        assert!(session.last_catch_result().is_none());
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn reset_keeps_connectivity_only() {
        let mut session = fighting_session();
        session.set_connectivity(Connectivity::Connected);
        session.set_error("x");
        session.reset();
        assert_eq!(session.connectivity(), Connectivity::Connected);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.location().is_none());
        assert!(session.last_error().is_none());
    }
}
