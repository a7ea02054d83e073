use std::time::Duration;

use storage::scorm::ScormVersion;
use url::Url;

use crate::error::ConfigError;

/// Runtime configuration of the player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    /// `None` runs against the local cache only.
    pub scorm_version: Option<ScormVersion>,
    /// Base IRI for event verb, activity and extension ids.
    pub event_base: String,
    /// Home page used for LMS account actors. Validated as a URL.
    pub home_page: String,
    /// Sampling period while a segment replays.
    pub replay_poll: Duration,
    /// Session timer resolution.
    pub session_tick: Duration,
    pub debug: bool,
}

const DEFAULT_EVENT_BASE: &str = "https://xapi.course-player.local";
const DEFAULT_HOME_PAGE: &str = "http://localhost";

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scorm_version: None,
            event_base: DEFAULT_EVENT_BASE.to_owned(),
            home_page: DEFAULT_HOME_PAGE.to_owned(),
            replay_poll: Duration::from_millis(100),
            session_tick: Duration::from_secs(1),
            debug: false,
        }
    }
}

impl PlayerConfig {
    /// Read `PLAYER_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// See [`PlayerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source. Unset or blank variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown SCORM version, a non-positive interval, or an
    /// unparseable home page.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("PLAYER_SCORM_VERSION") {
            config.scorm_version = Some(raw.parse()?);
        }
        if let Some(raw) = get("PLAYER_EVENT_BASE") {
            config.event_base = raw.trim_end_matches('/').to_owned();
        }
        if let Some(raw) = get("PLAYER_HOME_PAGE") {
            Url::parse(&raw).map_err(|source| ConfigError::Url {
                name: "PLAYER_HOME_PAGE",
                source,
            })?;
            config.home_page = raw;
        }
        if let Some(raw) = get("PLAYER_REPLAY_POLL_MS") {
            config.replay_poll = millis("PLAYER_REPLAY_POLL_MS", &raw)?;
        }
        if let Some(raw) = get("PLAYER_TICK_MS") {
            config.session_tick = millis("PLAYER_TICK_MS", &raw)?;
        }
        if let Some(raw) = get("PLAYER_DEBUG") {
            config.debug = raw == "1" || raw.eq_ignore_ascii_case("true");
        }
        Ok(config)
    }
}

fn millis(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ConfigError::Millis {
            name,
            raw: raw.to_owned(),
        }),
    }
}
