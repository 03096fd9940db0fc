//! Application-level configuration loading, including the gameplay tuning knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TAG_BACK_CONFIG_PATH";

/// Length of a veto cooldown when none is configured.
const DEFAULT_VETO_COOLDOWN_SECS: i64 = 600;
/// Coins granted to a freshly created team when the form value is unusable.
const DEFAULT_TEAM_COINS: f64 = 20.0;

/// How local turn transitions relate to their persistence writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Apply the local transition immediately and issue the write in the
    /// background; a failed write is logged and otherwise ignored. Local
    /// state can run ahead of durable state.
    #[default]
    Optimistic,
    /// Await the write before applying; a failed write aborts the transition.
    Strict,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Cooldown served after vetoing a challenge.
    pub veto_cooldown: time::Duration,
    /// Starting balance for teams created with an unusable coins field.
    pub default_team_coins: f64,
    /// Relationship between local transitions and persistence writes.
    pub persistence: PersistenceMode,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in
    /// defaults when the file is missing or malformed.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        cooldown_secs = config.veto_cooldown.whole_seconds(),
                        persistence = ?config.persistence,
                        "loaded gameplay configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            veto_cooldown: time::Duration::seconds(DEFAULT_VETO_COOLDOWN_SECS),
            default_team_coins: DEFAULT_TEAM_COINS,
            persistence: PersistenceMode::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    veto_cooldown_secs: Option<i64>,
    default_team_coins: Option<f64>,
    persistence: Option<PersistenceMode>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            veto_cooldown: value
                .veto_cooldown_secs
                .map(time::Duration::seconds)
                .unwrap_or(defaults.veto_cooldown),
            default_team_coins: value
                .default_team_coins
                .unwrap_or(defaults.default_team_coins),
            persistence: value.persistence.unwrap_or(defaults.persistence),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
