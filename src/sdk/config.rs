use crate::sdk::location::WatchOptions;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
pub const DEFAULT_REQUESTS_PER_MINUTE: u32 = 50;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Credentials and transport settings for the maps web services.
#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub api_key: String,
    pub base_url: String,
    pub requests_per_minute: u32,
    pub timeout: Duration,
}

impl MapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `GOOGLE_MAPS_API_KEY` plus optional overrides, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let api_key = lookup("GOOGLE_MAPS_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("GOOGLE_MAPS_API_KEY"))?;
        let mut config = Self::new(api_key);

        if let Some(url) = lookup("MAPS_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(rate) = parse_var::<u32, _>(&lookup, "MAPS_REQUESTS_PER_MINUTE")? {
            config.requests_per_minute = rate;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "MAPS_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

/// Feature toggles for one navigation session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Re-center the map on every fix while navigating.
    pub enable_follow: bool,
    /// Expose turn-by-turn instructions in snapshots.
    pub enable_steps: bool,
    pub search_bias_radius_m: u32,
    pub marker_radius_miles: f64,
    pub feed_poll_interval: Duration,
    pub notice_duration: Duration,
    pub request_timeout: Duration,
    pub watch: WatchOptions,
    pub autocomplete_min_chars: usize,
    pub offer_current_location: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            enable_follow: false,
            enable_steps: true,
            search_bias_radius_m: 50_000,
            marker_radius_miles: 7.5,
            feed_poll_interval: Duration::from_secs(15),
            notice_duration: Duration::from_millis(2500),
            request_timeout: DEFAULT_TIMEOUT,
            watch: WatchOptions::default(),
            autocomplete_min_chars: 2,
            offer_current_location: true,
        }
    }
}
