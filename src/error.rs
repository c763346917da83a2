use thiserror::Error;

/// Failure reported by the local holdings cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

/// Failure reported by the remote holdings source.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Terminal fault of one sync run. Cache read faults never reach this type.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("No data received")]
    EmptyPayload,

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("failed to update holdings cache: {0}")]
    CacheWrite(#[from] CacheError),
}

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("aggregation produced a non-finite {0}")]
    Aggregation(&'static str),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is not a valid URL: {source}")]
    InvalidUrl {
        key: &'static str,
        source: url::ParseError,
    },

    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("cannot derive a probe address from {0}")]
    NoProbeTarget(String),
}
