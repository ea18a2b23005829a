use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A single hop failed before a status code was observed.
///
/// Always record-local: the cycle logs it and moves on to the next record.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot request '{url}': {reason}")]
    BadUrl { url: String, reason: String },

    #[error("cannot resolve redirect location '{location}' against {base}")]
    BadLocation { base: String, location: String },
}

pub type Result<T> = std::result::Result<T, WatchError>;
