//! Image effects run by the backend.
//!
//! The editor rasterizes an object to PNG, hands it to an
//! [`EffectService`], and swaps the returned PNG into the scene. The
//! trait keeps the editor testable without a network.

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::http;

/// A backend image-processing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    RemoveBackground,
    RemoveText,
}

impl Effect {
    /// Endpoint path relative to the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Effect::RemoveBackground => "image/remove-background",
            Effect::RemoveText => "image/remove-text",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Effect::RemoveBackground => "remove background",
            Effect::RemoveText => "remove text",
        }
    }
}

/// Anything that can turn a PNG into another PNG.
#[async_trait::async_trait]
pub trait EffectService: Send + Sync {
    /// Apply `effect` to the PNG-encoded `png` and return the result as PNG.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteError`] if the request fails, the backend answers
    /// with a non-success status, or the response carries no image.
    async fn apply(&self, effect: Effect, png: Vec<u8>) -> Result<Vec<u8>, RemoteError>;
}

/// [`EffectService`] backed by the HTTP API: `POST {base}/{effect path}`
/// with an `image/png` body, answered with an `image/png` body.
pub struct HttpEffectsClient {
    http: reqwest::Client,
    config: RemoteConfig,
}

impl HttpEffectsClient {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = http::build_client(config.timeouts)?;
        Ok(Self { http, config })
    }

    /// Build a client from `CANVAS_*` environment variables.
    pub fn from_env() -> Result<Self, RemoteError> {
        Self::new(RemoteConfig::from_env()?)
    }

    pub fn endpoint(&self, effect: Effect) -> String {
        self.config.url(effect.path())
    }
}

#[async_trait::async_trait]
impl EffectService for HttpEffectsClient {
    async fn apply(&self, effect: Effect, png: Vec<u8>) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint(effect);
        log::debug!("{} -> POST {url} ({} bytes)", effect.label(), png.len());
        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "image/png")
            .header(reqwest::header::ACCEPT, "image/png")
            .body(png);
        let body = http::send(http::authorize(request, &self.config))
            .await
            .inspect_err(|e| log::error!("{} failed: {e}", effect.label()))?;
        if body.is_empty() {
            log::error!("{} returned an empty body", effect.label());
            return Err(RemoteError::EmptyBody);
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hang_off_base_url() {
        let client = HttpEffectsClient::new(RemoteConfig::new("https://api.test/v1")).unwrap();
        assert_eq!(
            client.endpoint(Effect::RemoveBackground),
            "https://api.test/v1/image/remove-background"
        );
        assert_eq!(client.endpoint(Effect::RemoveText), "https://api.test/v1/image/remove-text");
    }
}
