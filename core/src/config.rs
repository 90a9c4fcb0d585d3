use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::error::SedErr;
use crate::executor::DEFAULT_EXEC_TIMEOUT;
use crate::protocol::UserId;
use crate::statement::FieldRules;
use crate::tracker::DEFAULT_CORRELATION_CAPACITY;
use crate::tracker::DEFAULT_HISTORY_CAPACITY;
use crate::trigger::Triggers;

pub const CONFIG_TOML_FILE: &str = "config.toml";

const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(5 * 60);
const DEFAULT_TIMEOUT_NOTICE: &str = "Failed to apply the substitution: it took too long.";

/// Resolved configuration, after merging `config.toml` with overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Messages kept per room for fallback target search.
    pub history_capacity: usize,

    /// How old a sender's own last message may be and still be the target
    /// once it has left the room history.
    pub recency_window: Duration,

    /// Wall-clock budget for a single substitution.
    pub exec_timeout: Duration,

    pub correlation_capacity: usize,

    /// Our own account. Its messages are never recorded nor processed.
    pub own_user_id: Option<UserId>,

    pub triggers: Triggers,

    /// Reply sent when a substitution exceeds `exec_timeout`.
    pub timeout_notice: String,

    /// Directory holding `config.toml`, `~/.sedbot` unless `SEDBOT_HOME`
    /// says otherwise.
    pub sedbot_home: PathBuf,
}

/// Base config deserialized from `$SEDBOT_HOME/config.toml`.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigToml {
    pub history_capacity: Option<usize>,
    pub recency_window_secs: Option<u64>,
    pub exec_timeout_ms: Option<u64>,
    pub correlation_capacity: Option<usize>,
    pub own_user_id: Option<UserId>,
    pub bare_trigger: Option<FieldRules>,
    pub explicit_trigger: Option<FieldRules>,
    pub timeout_notice: Option<String>,
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub history_capacity: Option<usize>,
    pub exec_timeout_ms: Option<u64>,
    pub own_user_id: Option<UserId>,
    /// Read this file instead of `$SEDBOT_HOME/config.toml`.
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load `config.toml` from the sedbot home (or `overrides.config_file`)
    /// and apply `overrides` on top.
    pub fn load_with_overrides(overrides: ConfigOverrides) -> Result<Self> {
        let sedbot_home = find_sedbot_home()?;
        let config_path = overrides
            .config_file
            .clone()
            .unwrap_or_else(|| sedbot_home.join(CONFIG_TOML_FILE));
        let cfg = load_config_as_toml(&config_path)?;
        Self::load_from_base_config_with_overrides(cfg, overrides, sedbot_home)
    }

    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        sedbot_home: PathBuf,
    ) -> Result<Self> {
        let ConfigOverrides {
            history_capacity,
            exec_timeout_ms,
            own_user_id,
            config_file: _,
        } = overrides;

        let exec_timeout = exec_timeout_ms
            .or(cfg.exec_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_EXEC_TIMEOUT);
        let recency_window = cfg
            .recency_window_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RECENCY_WINDOW);

        Ok(Self {
            history_capacity: history_capacity
                .or(cfg.history_capacity)
                .unwrap_or(DEFAULT_HISTORY_CAPACITY),
            recency_window,
            exec_timeout,
            correlation_capacity: cfg
                .correlation_capacity
                .unwrap_or(DEFAULT_CORRELATION_CAPACITY),
            own_user_id: own_user_id.or(cfg.own_user_id),
            triggers: Triggers {
                bare: cfg.bare_trigger.unwrap_or_else(FieldRules::bare),
                explicit: cfg.explicit_trigger.unwrap_or_else(FieldRules::explicit),
            },
            timeout_notice: cfg
                .timeout_notice
                .unwrap_or_else(|| DEFAULT_TIMEOUT_NOTICE.to_string()),
            sedbot_home,
        })
    }
}

/// Read and deserialize `path`. A missing file yields the defaults.
pub fn load_config_as_toml(path: &Path) -> Result<ConfigToml> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(toml::from_str::<ConfigToml>(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("{} not found, using defaults", path.display());
            Ok(ConfigToml::default())
        }
        Err(e) => Err(SedErr::Io(e)),
    }
}

/// Returns the path to the sedbot configuration directory, which can be
/// specified by the `SEDBOT_HOME` environment variable. If not set, defaults
/// to `~/.sedbot`.
///
/// Does not verify that the directory exists.
pub fn find_sedbot_home() -> std::io::Result<PathBuf> {
    if let Ok(val) = std::env::var("SEDBOT_HOME")
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }

    let mut p = home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    p.push(".sedbot");
    Ok(p)
}
