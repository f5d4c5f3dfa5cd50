//! Game service configuration.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Tunables for [`GameService`](crate::GameService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// How many random room codes to try before giving up.
    pub code_attempts: u32,

    /// How far into the future `empty_at` is pushed when a room is
    /// created or marked active.
    pub active_hold: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            code_attempts: 10,
            active_hold: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl GameConfig {
    /// The `empty_at` for a room that became active at `now`.
    ///
    /// Saturates at the latest representable instant instead of
    /// overflowing.
    pub fn hold_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.active_hold)
            .ok()
            .and_then(|hold| now.checked_add_signed(hold))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default() {
        let config = GameConfig::default();
        assert_eq!(config.code_attempts, 10);
        assert_eq!(config.active_hold, Duration::from_secs(86_400));
    }

    #[test]
    fn test_hold_until_adds_active_hold() {
        let now = Utc::now();
        let config = GameConfig::default();
        assert_eq!(config.hold_until(now), now + TimeDelta::hours(24));
    }

    #[test]
    fn test_hold_until_saturates() {
        let config = GameConfig {
            active_hold: Duration::MAX,
            ..GameConfig::default()
        };
        assert_eq!(config.hold_until(Utc::now()), DateTime::<Utc>::MAX_UTC);
    }
}
