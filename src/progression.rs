//! Experience curve and local level-up resolution.
//!
//! The curve must match the server's exactly: the experience needed to leave
//! level `n` is `floor(100 * n^1.5)`. Values computed here are optimistic; the
//! server's profile always wins on the next refresh.

/// Experience required to advance from `level` to `level + 1`.
pub fn experience_for_level(level: u32) -> u64 {
    // f64 is exact for every u32 level and the result stays well within u64.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cost = (100.0 * f64::from(level).powf(1.5)).floor() as u64;
    cost
}

/// Level, experience into that level, and the cost of the next level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progression {
    pub level: u32,
    pub experience: u64,
    pub experience_for_next_level: u64,
}

impl Default for Progression {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Progression {
    /// Start of `level` with no experience. Levels below 1 are raised to 1.
    pub fn new(level: u32) -> Self {
        let level = level.max(1);
        Self {
            level,
            experience: 0,
            experience_for_next_level: experience_for_level(level),
        }
    }

    /// Rebuild from stored values. A zero threshold is recomputed from the curve.
    pub fn from_parts(level: u32, experience: u64, experience_for_next_level: u64) -> Self {
        let level = level.max(1);
        let experience_for_next_level = if experience_for_next_level == 0 {
            experience_for_level(level)
        } else {
            experience_for_next_level
        };
        Self {
            level,
            experience,
            experience_for_next_level,
        }
    }

    /// Add `delta` experience and resolve every level-up it pays for.
    ///
    /// Returns the number of levels gained. Afterwards `experience` is always
    /// below `experience_for_next_level`.
    pub fn credit(&mut self, delta: u64) -> u32 {
        let mut gained = 0;
        self.experience = self.experience.saturating_add(delta);
        while self.experience >= self.experience_for_next_level {
            self.experience -= self.experience_for_next_level;
            self.level = self.level.saturating_add(1);
            self.experience_for_next_level = experience_for_level(self.level).max(1);
            gained += 1;
        }
        gained
    }
}
