//! Application-level configuration loading: game defaults, content sources
//! and session tuning.

use std::{env, fs, io::ErrorKind, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::state::game::AllocationPolicy;

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PHRASE_RUSH_CONFIG_PATH";
/// Default content file used when no database is configured.
const DEFAULT_CONTENT_PATH: &str = "config/content.json";

/// Turn lengths offered by the setup menu, in seconds.
pub const ROUND_DURATION_CHOICES: [u32; 5] = [30, 45, 60, 90, 120];
/// Phrase counts per team offered by the setup menu.
pub const PHRASES_PER_TEAM_CHOICES: [u32; 5] = [10, 15, 20, 25, 30];
/// Turn length preselected in the setup menu.
pub const DEFAULT_ROUND_DURATION_SECS: u32 = 45;
/// Phrase count preselected in the setup menu.
pub const DEFAULT_PHRASES_PER_TEAM: u32 = 15;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_COMMAND_BUFFER: usize = 32;
const DEFAULT_NOTICE_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Turn length preselected for new games.
    pub round_duration_secs: u32,
    /// Phrases per team preselected for new games.
    pub phrases_per_team: u32,
    /// Phrase ownership rule for new games.
    pub policy: AllocationPolicy,
    /// Period of the turn countdown. One period counts as one second of play.
    pub tick_interval: Duration,
    /// JSON content file used by the in-memory store.
    pub content_path: PathBuf,
    /// SQLite database; when set it takes precedence over `content_path`.
    pub database_path: Option<PathBuf>,
    /// Capacity of the session command queue.
    pub command_buffer: usize,
    /// Capacity of the notice broadcast channel.
    pub notice_buffer: usize,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`, falling back to built-in defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        round_duration_secs = app_config.round_duration_secs,
                        phrases_per_team = app_config.phrases_per_team,
                        policy = ?app_config.policy,
                        "loaded config"
                    );
                    app_config
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
            round_duration_secs: DEFAULT_ROUND_DURATION_SECS,
            phrases_per_team: DEFAULT_PHRASES_PER_TEAM,
            policy: AllocationPolicy::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            content_path: PathBuf::from(DEFAULT_CONTENT_PATH),
            database_path: None,
            command_buffer: DEFAULT_COMMAND_BUFFER,
            notice_buffer: DEFAULT_NOTICE_BUFFER,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    round_duration_secs: Option<u32>,
    #[serde(default)]
    phrases_per_team: Option<u32>,
    #[serde(default)]
    policy: Option<AllocationPolicy>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default)]
    tick_interval_ms: Option<Duration>,
    #[serde(default)]
    content_path: Option<PathBuf>,
    #[serde(default)]
    database_path: Option<PathBuf>,
    #[serde(default)]
    command_buffer: Option<usize>,
    #[serde(default)]
    notice_buffer: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            round_duration_secs: offered(
                "round_duration_secs",
                value.round_duration_secs,
                &ROUND_DURATION_CHOICES,
                defaults.round_duration_secs,
            ),
            phrases_per_team: offered(
                "phrases_per_team",
                value.phrases_per_team,
                &PHRASES_PER_TEAM_CHOICES,
                defaults.phrases_per_team,
            ),
            policy: value.policy.unwrap_or(defaults.policy),
            tick_interval: match value.tick_interval_ms {
                Some(interval) if interval.is_zero() => {
                    warn!("tick_interval_ms must be positive; using default");
                    defaults.tick_interval
                }
                Some(interval) => {
                    if interval != DEFAULT_TICK_INTERVAL {
                        warn!(
                            tick_interval_ms = interval.as_millis() as u64,
                            "tick period is not one second; each tick still counts as one second of play"
                        );
                    }
                    interval
                }
                None => defaults.tick_interval,
            },
            content_path: value.content_path.unwrap_or(defaults.content_path),
            database_path: value
                .database_path
                .filter(|path| !path.as_os_str().is_empty()),
            command_buffer: bounded(
                "command_buffer",
                value.command_buffer,
                1..=usize::MAX,
                defaults.command_buffer,
            ),
            notice_buffer: bounded(
                "notice_buffer",
                value.notice_buffer,
                1..=usize::MAX,
                defaults.notice_buffer,
            ),
        }
    }
}

/// Keep `value` when the setup menu offers it, otherwise log and use `default`.
fn offered(field: &'static str, value: Option<u32>, choices: &[u32], default: u32) -> u32 {
    match value {
        Some(value) if choices.contains(&value) => value,
        Some(value) => {
            warn!(field, value, ?choices, "config value is not a menu choice; using default");
            default
        }
        None => default,
    }
}

/// Keep `value` when it falls inside `range`, otherwise log and use `default`.
fn bounded<T>(
    field: &'static str,
    value: Option<T>,
    range: std::ops::RangeInclusive<T>,
    default: T,
) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    match value {
        Some(value) if range.contains(&value) => value,
        Some(value) => {
            warn!(
                field,
                %value,
                min = %range.start(),
                max = %range.end(),
                "config value out of range; using default"
            );
            default
        }
        None => default,
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
