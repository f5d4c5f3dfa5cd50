//! Server configuration.
//!
//! Defaults match the documented game constants. [`MooConfig::from_env`]
//! overrides them from these variables:
//!
//! | variable                    | field                 | unit    |
//! |-----------------------------|-----------------------|---------|
//! | `MOO_DB_PATH`               | `db_path`             | path    |
//! | `MOO_CLEANUP_INTERVAL_SECS` | `cleanup.interval`    | seconds |
//! | `MOO_STALE_AFTER_SECS`      | `cleanup.stale_after` | seconds |
//! | `MOO_ACTIVE_HOLD_SECS`      | `game.active_hold`    | seconds |
//! | `MOO_CODE_ATTEMPTS`         | `game.code_attempts`  | count   |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use moo_cleanup::CleanupConfig;
use moo_room::GameConfig;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MooConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    pub game: GameConfig,
    pub cleanup: CleanupConfig,
}

impl Default for MooConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("moo.db"),
            game: GameConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl MooConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = lookup("MOO_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "MOO_CLEANUP_INTERVAL_SECS")? {
            config.cleanup.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "MOO_STALE_AFTER_SECS")? {
            config.cleanup.stale_after = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "MOO_ACTIVE_HOLD_SECS")? {
            config.game.active_hold = Duration::from_secs(secs);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "MOO_CODE_ATTEMPTS")? {
            config.game.code_attempts = n;
        }
        Ok(config)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}
