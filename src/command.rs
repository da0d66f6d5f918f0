//! Outbound user intents, in the client's own vocabulary.
//!
//! A [`Command`] is what the player asked for; the [`codec`](crate::codec)
//! turns it into a wire [`ClientMessage`](crate::protocol::ClientMessage).
//! Constructors clamp their parameters to the ranges the server accepts.

use crate::session::Phase;

/// Valid cast power range.
pub const CAST_POWER_RANGE: (f64, f64) = (0.0, 1.0);
/// Valid cast angle range, in degrees.
pub const CAST_ANGLE_RANGE: (f64, f64) = (0.0, 90.0);
/// Valid drag level range.
pub const DRAG_LEVEL_RANGE: (f64, f64) = (0.1, 1.0);

/// A player action that results in one outbound message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Enter a location.
    Join { location_id: u64 },
    /// Cast the line.
    Cast { power: f64, angle: f64 },
    /// Set the hook.
    Hook,
    /// Reel in.
    Reel { speed: f64 },
    /// Give line.
    Release,
    /// Adjust the drag.
    SetDrag { level: f64 },
    /// Hold the line.
    Hold,
}

impl Command {
    /// Cast with `power` clamped to 0–1 and `angle` to 0–90.
    pub fn cast(power: f64, angle: f64) -> Self {
        Self::Cast {
            power: power.clamp(CAST_POWER_RANGE.0, CAST_POWER_RANGE.1),
            angle: angle.clamp(CAST_ANGLE_RANGE.0, CAST_ANGLE_RANGE.1),
        }
    }

    /// Reel at `speed`; negative speeds become 0.
    pub fn reel(speed: f64) -> Self {
        Self::Reel {
            speed: speed.max(0.0),
        }
    }

    /// Set the drag with `level` clamped to 0.1–1.0.
    pub fn set_drag(level: f64) -> Self {
        Self::SetDrag {
            level: level.clamp(DRAG_LEVEL_RANGE.0, DRAG_LEVEL_RANGE.1),
        }
    }

    /// The wire `type` of this command, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Cast { .. } => "cast",
            Self::Hook => "hook",
            Self::Reel { .. } => "reel",
            Self::Release => "release",
            Self::SetDrag { .. } => "set_drag",
            Self::Hold => "hold",
        }
    }

    /// The phase this command is allowed in, or `None` if it is always allowed.
    pub fn required_phase(&self) -> Option<Phase> {
        match self {
            Self::Join { .. } => None,
            Self::Cast { .. } => Some(Phase::Idle),
            Self::Hook => Some(Phase::Bite),
            Self::Reel { .. } | Self::Release | Self::SetDrag { .. } | Self::Hold => {
                Some(Phase::Fighting)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_is_clamped_to_server_ranges() {
        assert_eq!(
            Command::cast(1.7, 120.0),
            Command::Cast {
                power: 1.0,
                angle: 90.0
            }
        );
        assert_eq!(
            Command::cast(-0.2, -5.0),
            Command::Cast {
                power: 0.0,
                angle: 0.0
            }
        );
    }

    #[test]
    fn drag_is_clamped() {
        assert_eq!(Command::set_drag(0.01), Command::SetDrag { level: 0.1 });
        assert_eq!(Command::set_drag(3.0), Command::SetDrag { level: 1.0 });
        assert_eq!(Command::set_drag(0.7), Command::SetDrag { level: 0.7 });
    }

    #[test]
    fn negative_reel_speed_is_zeroed() {
        assert_eq!(Command::reel(-1.0), Command::Reel { speed: 0.0 });
    }

    #[test]
    fn guard_table() {
        assert_eq!(Command::Join { location_id: 1 }.required_phase(), None);
        assert_eq!(Command::cast(0.5, 45.0).required_phase(), Some(Phase::Idle));
        assert_eq!(Command::Hook.required_phase(), Some(Phase::Bite));
        for command in [
            Command::reel(0.5),
            Command::Release,
            Command::set_drag(0.5),
            Command::Hold,
        ] {
            assert_eq!(command.required_phase(), Some(Phase::Fighting));
        }
    }
}
