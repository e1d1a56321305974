//! Runtime configuration
//!
//! Settings come from the environment, optionally seeded from a `.env` file,
//! with defaults for everything except API credentials.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, FixedOffset, Utc, Weekday};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::data::sports_api::DEFAULT_TIMEOUT_SECS;
use crate::data::{ApiEndpoint, SportsClient, WindowPolicy};

pub const CACHE_DIR_VAR: &str = "DRAMABALL_CACHE_DIR";
pub const MATCH_CACHE_DIR_VAR: &str = "DRAMABALL_MATCH_CACHE_DIR";
pub const EXPIRATION_HOURS_VAR: &str = "DRAMABALL_CACHE_EXPIRATION_HOURS";
pub const ANCHOR_WEEKDAY_VAR: &str = "DRAMABALL_ANCHOR_WEEKDAY";
pub const WINDOW_LENGTH_VAR: &str = "DRAMABALL_WINDOW_LENGTH_DAYS";
pub const UTC_OFFSET_VAR: &str = "DRAMABALL_UTC_OFFSET_HOURS";
pub const DATA_DIR_VAR: &str = "DRAMABALL_DATA_DIR";
pub const REQUEST_TIMEOUT_VAR: &str = "DRAMABALL_REQUEST_TIMEOUT_SECS";
pub const SEASON_VAR: &str = "CURRENT_YEAR";
pub const SCHEDULE_HOST_VAR: &str = "NFL_NCAA_HIGHLIGHT_API_HOST";
pub const SCHEDULE_KEY_VAR: &str = "NFL_NCAA_HIGHLIGHT_API_KEY";
pub const INJURIES_HOST_VAR: &str = "NFL_API_HOST";
pub const INJURIES_KEY_VAR: &str = "NFL_API_KEY";

pub const DEFAULT_CACHE_DIR: &str = "./cache";
pub const DEFAULT_MATCH_CACHE_DIR: &str = "./match_cache";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_EXPIRATION_HOURS: u64 = 24;

/// Longest gameweek that does not overlap the next one
const MAX_WINDOW_LENGTH_DAYS: u32 = 6;

/// Ten years
const MAX_EXPIRATION_HOURS: u64 = 87_600;

/// Error for a setting that is present but unusable
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Host and key of a RapidAPI service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    pub host: String,
    pub key: String,
}

/// Everything the binary needs to build its cache, client and roster
#[derive(Debug, Clone)]
pub struct Config {
    /// Response cache directory
    pub cache_dir: PathBuf,
    /// Archive of finished matches
    pub match_cache_dir: PathBuf,
    /// Validity window of cached responses
    pub expiration_hours: u64,
    /// Gameweek layout
    pub window: WindowPolicy,
    /// Directory holding teams, characters, assignments and storyline files
    pub data_dir: PathBuf,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Season sent to the schedule API
    pub season: String,
    /// Matches and standings service
    pub schedule_api: Option<ApiCredentials>,
    /// Injuries service
    pub injuries_api: Option<ApiCredentials>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            match_cache_dir: PathBuf::from(DEFAULT_MATCH_CACHE_DIR),
            expiration_hours: DEFAULT_EXPIRATION_HOURS,
            window: WindowPolicy::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            season: Utc::now().year().to_string(),
            schedule_api: None,
            injuries_api: None,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from a variable lookup
    ///
    /// Unset and blank variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Config::default();

        if let Some(dir) = get(CACHE_DIR_VAR) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(MATCH_CACHE_DIR_VAR) {
            config.match_cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(EXPIRATION_HOURS_VAR) {
            config.expiration_hours = parse_expiration_hours(&raw)?;
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_VAR) {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::invalid(REQUEST_TIMEOUT_VAR, &raw, "expected whole seconds"))?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = get(ANCHOR_WEEKDAY_VAR) {
            config.window.anchor = parse_weekday(&raw)?;
        }
        if let Some(raw) = get(WINDOW_LENGTH_VAR) {
            config.window.length_days = parse_window_length(&raw)?;
        }
        if let Some(raw) = get(UTC_OFFSET_VAR) {
            config.window.timezone = parse_utc_offset(&raw)?;
        }
        if let Some(season) = get(SEASON_VAR) {
            config.season = season;
        }

        config.schedule_api = credentials(get(SCHEDULE_HOST_VAR), get(SCHEDULE_KEY_VAR));
        config.injuries_api = credentials(get(INJURIES_HOST_VAR), get(INJURIES_KEY_VAR));

        Ok(config)
    }

    /// Response cache with the configured directory and expiration
    pub fn response_cache(&self) -> ResponseCache {
        ResponseCache::new(self.cache_dir.clone(), self.expiration_hours)
    }

    /// Never-expiring archive of finished matches
    pub fn match_archive(&self) -> ResponseCache {
        ResponseCache::without_expiry(self.match_cache_dir.clone())
    }

    /// API client wired to the caches and whichever services are configured
    pub fn sports_client(&self) -> SportsClient {
        let mut client =
            SportsClient::with_timeout(self.response_cache(), self.season.clone(), self.request_timeout)
                .with_archive(self.match_archive());
        if let Some(api) = &self.schedule_api {
            client = client.with_schedule_api(ApiEndpoint::rapidapi(&api.host, &api.key));
        }
        if let Some(api) = &self.injuries_api {
            client = client.with_injuries_api(ApiEndpoint::rapidapi(&api.host, &api.key));
        }
        client
    }
}

fn credentials(host: Option<String>, key: Option<String>) -> Option<ApiCredentials> {
    match (host, key) {
        (Some(host), Some(key)) => Some(ApiCredentials { host, key }),
        (Some(host), None) => {
            warn!("API host {} configured without a key; it will not be used", host);
            None
        }
        _ => None,
    }
}

fn parse_expiration_hours(raw: &str) -> Result<u64, ConfigError> {
    match raw.parse::<u64>() {
        Ok(hours) if hours <= MAX_EXPIRATION_HOURS => Ok(hours),
        _ => Err(ConfigError::invalid(
            EXPIRATION_HOURS_VAR,
            raw,
            format!("expected whole hours from 0 to {}", MAX_EXPIRATION_HOURS),
        )),
    }
}

fn parse_weekday(raw: &str) -> Result<Weekday, ConfigError> {
    raw.parse::<Weekday>()
        .map_err(|_| ConfigError::invalid(ANCHOR_WEEKDAY_VAR, raw, "expected a weekday such as thu"))
}

fn parse_window_length(raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(days) if days <= MAX_WINDOW_LENGTH_DAYS => Ok(days),
        _ => Err(ConfigError::invalid(
            WINDOW_LENGTH_VAR,
            raw,
            format!("expected 0 to {} days", MAX_WINDOW_LENGTH_DAYS),
        )),
    }
}

fn parse_utc_offset(raw: &str) -> Result<FixedOffset, ConfigError> {
    raw.parse::<i32>()
        .ok()
        .and_then(|hours| hours.checked_mul(3600))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ConfigError::invalid(UTC_OFFSET_VAR, raw, "expected hours between -23 and 23"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
        assert_eq!(config.match_cache_dir, PathBuf::from("./match_cache"));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.expiration_hours, 24);
        assert_eq!(config.window, WindowPolicy::default());
        assert_eq!(config.window.anchor, Weekday::Thu);
        assert_eq!(config.window.length_days, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.season, Utc::now().year().to_string());
        assert!(config.schedule_api.is_none());
        assert!(config.injuries_api.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            (CACHE_DIR_VAR, "/tmp/c"),
            (EXPIRATION_HOURS_VAR, "6"),
            (ANCHOR_WEEKDAY_VAR, "Tuesday"),
            (WINDOW_LENGTH_VAR, "5"),
            (UTC_OFFSET_VAR, "-5"),
            (SEASON_VAR, "2024"),
            (REQUEST_TIMEOUT_VAR, "10"),
            (SCHEDULE_HOST_VAR, "nfl.example.com"),
            (SCHEDULE_KEY_VAR, "abc"),
        ]))
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/c"));
        assert_eq!(config.expiration_hours, 6);
        assert_eq!(config.window.anchor, Weekday::Tue);
        assert_eq!(config.window.length_days, 5);
        assert_eq!(config.window.timezone.local_minus_utc(), -5 * 3600);
        assert_eq!(config.season, "2024");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(
            config.schedule_api,
            Some(ApiCredentials {
                host: "nfl.example.com".to_string(),
                key: "abc".to_string()
            })
        );
        assert!(config.injuries_api.is_none());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = Config::from_lookup(lookup(&[(EXPIRATION_HOURS_VAR, "  "), (CACHE_DIR_VAR, "")])).unwrap();
        assert_eq!(config.expiration_hours, 24);
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
    }

    #[test]
    fn test_longest_expiration_is_accepted() {
        let config = Config::from_lookup(lookup(&[(EXPIRATION_HOURS_VAR, "87600")])).unwrap();

        assert_eq!(config.expiration_hours, 87_600);
        assert_eq!(config.response_cache().expiration(), Some(chrono::Duration::hours(87_600)));
    }

    #[test]
    fn test_host_without_key_is_ignored() {
        let config = Config::from_lookup(lookup(&[(INJURIES_HOST_VAR, "injuries.example.com")])).unwrap();
        assert!(config.injuries_api.is_none());
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let cases = [
            (EXPIRATION_HOURS_VAR, "soon"),
            (EXPIRATION_HOURS_VAR, "87601"),
            (EXPIRATION_HOURS_VAR, "3000000000000000"),
            (EXPIRATION_HOURS_VAR, "18446744073709551615"),
            (ANCHOR_WEEKDAY_VAR, "someday"),
            (WINDOW_LENGTH_VAR, "9"),
            (WINDOW_LENGTH_VAR, "-1"),
            (UTC_OFFSET_VAR, "30"),
            (REQUEST_TIMEOUT_VAR, "1.5"),
        ];

        for (var, value) in cases {
            let err = Config::from_lookup(lookup(&[(var, value)])).unwrap_err();
            let message = err.to_string();
            assert!(message.contains(var), "{}", message);
            assert!(message.contains(value), "{}", message);
        }
    }

    #[test]
    fn test_caches_use_configured_directories() {
        let config = Config::from_lookup(lookup(&[
            (CACHE_DIR_VAR, "/tmp/responses"),
            (MATCH_CACHE_DIR_VAR, "/tmp/finished"),
            (EXPIRATION_HOURS_VAR, "2"),
        ]))
        .unwrap();

        let cache = config.response_cache();
        assert_eq!(cache.cache_dir(), std::path::Path::new("/tmp/responses"));
        assert_eq!(cache.expiration(), Some(chrono::Duration::hours(2)));

        let archive = config.match_archive();
        assert_eq!(archive.cache_dir(), std::path::Path::new("/tmp/finished"));
        assert!(archive.expiration().is_none());
    }
}
