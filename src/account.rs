//! The player's account as known to this client.
//!
//! The [`Profile`] comes from the REST `/users/me` endpoint and is loaded by the
//! application via [`SessionClient::set_profile`](crate::client::SessionClient::set_profile).
//! Landed catches are credited locally right away. Those local values are
//! provisional: the next profile refresh replaces them wholesale.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::progression::Progression;
use crate::session::CatchReward;

/// Player profile in the server's JSON shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub level: u32,
    pub experience: u64,
    pub money: u64,
    pub total_fish_caught: u64,
    pub biggest_fish_weight: f64,
    pub experience_for_next_level: u64,
}

impl Profile {
    fn progression(&self) -> Progression {
        Progression::from_parts(self.level, self.experience, self.experience_for_next_level)
    }

    fn set_progression(&mut self, progression: Progression) {
        self.level = progression.level;
        self.experience = progression.experience;
        self.experience_for_next_level = progression.experience_for_next_level;
    }
}

/// Account store: the last known profile plus local credits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    profile: Option<Profile>,
    provisional: bool,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Whether local values are known to disagree with the server.
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Replace everything with a fresh server profile.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
        self.provisional = false;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Apply the rewards of a landed fish. Does nothing before a profile is loaded.
    pub fn credit_catch(&mut self, reward: &CatchReward) {
        let Some(profile) = self.profile.as_mut() else {
            return;
        };

        profile.money = profile.money.saturating_add(reward.price);
        profile.total_fish_caught = profile.total_fish_caught.saturating_add(1);
        if reward.weight > profile.biggest_fish_weight {
            profile.biggest_fish_weight = reward.weight;
        }

        let mut progression = profile.progression();
        let gained = progression.credit(reward.experience);
        profile.set_progression(progression);
        if gained > 0 {
            info!(level = progression.level, gained, "level up");
        }

        if let Some(server_level) = reward.new_level {
            if server_level != progression.level {
                warn!(
                    local = progression.level,
                    server = server_level,
                    "local level disagrees with server, awaiting profile refresh"
                );
                self.provisional = true;
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

    fn profile() -> Profile {
        Profile {
            id: 7,
            username: "angler".into(),
            email: "angler@example.com".into(),
            level: 1,
            experience: 90,
            money: 100,
            total_fish_caught: 3,
            biggest_fish_weight: 1.5,
            experience_for_next_level: 100,
        }
    }

    fn reward(experience: u64, weight: f64, new_level: Option<u32>) -> CatchReward {
        CatchReward {
            fish_name: "Pike".into(),
            weight,
            price: 40,
            experience,
            leveled_up: false,
            new_level,
            achievements: vec![],
        }
    }

    #[test]
    fn profile_deserializes_from_users_me() {
        let json = r#"{
            "id": 7, "username": "angler", "email": "angler@example.com",
            "level": 1, "experience": 90, "money": 100,
            "total_fish_caught": 3, "biggest_fish_weight": 1.5,
            "experience_for_next_level": 100
        }"#;
        let parsed: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, profile());
    }

    #[test]
    fn credit_applies_money_experience_and_stats() {
        let mut account = Account::new();
        account.set_profile(profile());

        account.credit_catch(&reward(50, 3.2, Some(2)));

        let p = account.profile().unwrap();
        assert_eq!(p.money, 140);
        assert_eq!(p.level, 2);
        assert_eq!(p.experience, 40);
        assert_eq!(p.experience_for_next_level, 282);
        assert_eq!(p.total_fish_caught, 4);
        assert_eq!(p.biggest_fish_weight, 3.2);
        assert!(!account.is_provisional());
    }

    #[test]
    fn smaller_fish_keeps_record() {
        let mut account = Account::new();
        account.set_profile(profile());
        account.credit_catch(&reward(1, 0.4, None));
        assert_eq!(account.profile().unwrap().biggest_fish_weight, 1.5);
    }

    #[test]
    fn level_mismatch_marks_provisional_until_refresh() {
        let mut account = Account::new();
        account.set_profile(profile());

        account.credit_catch(&reward(5, 1.0, Some(3)));
        assert!(account.is_provisional());

        account.set_profile(Profile {
            level: 3,
            ..profile()
        });
        assert!(!account.is_provisional());
        assert_eq!(account.profile().unwrap().level, 3);
    }

    #[test]
    fn credit_without_profile_is_ignored() {
        let mut account = Account::new();
        account.credit_catch(&reward(500, 9.0, Some(3)));
        assert_eq!(account, Account::new());
    }
}
