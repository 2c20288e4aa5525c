//! Errors returned by the backend adapters.

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// A configuration value is missing or malformed.
    #[error("remote config: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The backend answered 2xx but sent no image.
    #[error("backend returned an empty body")]
    EmptyBody,
}

impl RemoteError {
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(err.to_string())
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Request(_) | Self::Status { status: 429 | 500..=599, .. }
        )
    }
}
