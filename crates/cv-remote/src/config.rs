//! Remote configuration parsed from environment variables.

use crate::error::RemoteError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for RemoteTimeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    /// API root without a trailing slash, e.g. `https://api.example.com/v1`.
    pub base_url: String,
    pub token: Option<String>,
    pub timeouts: RemoteTimeouts,
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeouts: RemoteTimeouts::default(),
        }
    }

    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `CANVAS_API_BASE_URL`
    ///
    /// Optional:
    /// - `CANVAS_API_TOKEN`: sent as a bearer token
    /// - `CANVAS_REQUEST_TIMEOUT_SECS`: default 60
    /// - `CANVAS_CONNECT_TIMEOUT_SECS`: default 10
    pub fn from_env() -> Result<Self, RemoteError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RemoteConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RemoteError> {
        let base_url = lookup("CANVAS_API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RemoteError::Config("CANVAS_API_BASE_URL is not set".into()))?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::Config(format!(
                "CANVAS_API_BASE_URL must be an http(s) URL, got '{base_url}'"
            )));
        }

        let token = lookup("CANVAS_API_TOKEN").filter(|v| !v.is_empty());
        let timeouts = RemoteTimeouts {
            request_secs: parse_u64(&lookup, "CANVAS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(&lookup, "CANVAS_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeouts,
        })
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn parse_u64(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
            log::warn!("{key}='{raw}' is not a number; using {default}");
            default
        }),
        None => default,
    }
}
