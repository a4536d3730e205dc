use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors returned by the upstream event API.
///
/// The taxonomy matters to the ingestion loop: fatal variants mean the
/// request itself is wrong (bad credentials, malformed parameters) and
/// retrying cannot succeed, so the loop must halt. Everything else is
/// transient and retried on the next tick with the cursor unchanged.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("upstream rejected credentials: {0}")]
    Unauthorized(String),

    #[error("upstream denied access: {0}")]
    Forbidden(String),

    #[error("upstream rejected request as malformed: {0}")]
    MalformedRequest(String),

    #[error("upstream rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("upstream server error: HTTP {status}")]
    Server { status: u16 },

    #[error("upstream transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to decode upstream response: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// Whether this error is fatal to the ingestion loop.
    ///
    /// Fatal errors stop polling entirely; operator intervention (fixed
    /// credentials, corrected configuration) and a restart are required.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            UpstreamError::Unauthorized(_)
                | UpstreamError::Forbidden(_)
                | UpstreamError::MalformedRequest(_)
        )
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the underlying cause is fatal to the ingestion loop.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Upstream(e) if e.is_fatal())
    }
}
