use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Runtime settings, read from the environment (after loading `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub holdings_url: Url,
    pub cache_path: PathBuf,
    pub bind_addr: String,
    pub request_timeout: Duration,
    pub probe_target: String,
    pub probe_interval: Duration,
    pub frontend_url: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_url = lookup("HOLDINGS_API_URL").ok_or(ConfigError::Missing("HOLDINGS_API_URL"))?;
        let holdings_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            key: "HOLDINGS_API_URL",
            source,
        })?;

        let probe_target = match lookup("CONNECTIVITY_PROBE_ADDR") {
            Some(target) => target,
            None => probe_target_for(&holdings_url)?,
        };

        Ok(Settings {
            cache_path: lookup("CACHE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("holdings.sqlite")),
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            request_timeout: seconds(&lookup, "REQUEST_TIMEOUT_SECS", 15)?,
            probe_interval: seconds(&lookup, "CONNECTIVITY_PROBE_INTERVAL_SECS", 10)?,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            holdings_url,
            probe_target,
        })
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(key) {
        None => Ok(Duration::from_secs(default)),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

fn probe_target_for(url: &Url) -> Result<String, ConfigError> {
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::NoProbeTarget(url.to_string()))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| ConfigError::NoProbeTarget(url.to_string()))?;
    Ok(format!("{}:{}", host, port))
}
