//! Slide and section persistence.

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::http;
use serde::{Deserialize, Serialize};

/// What gets stored for a slide: the editable scene and a flattened preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCanvas {
    /// Canvas JSON document.
    pub canvas_json: String,
    /// `data:image/png;base64,...` rendering of the whole canvas.
    pub rendered_image: String,
}

pub struct SlideClient {
    http: reqwest::Client,
    config: RemoteConfig,
}

impl SlideClient {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let http = http::build_client(config.timeouts)?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> Result<Self, RemoteError> {
        Self::new(RemoteConfig::from_env()?)
    }

    /// `PATCH {base}/{path}` with `{canvas_json, rendered_image}`.
    ///
    /// `path` names the resource, e.g. `slides/42` or `sections/7`.
    pub async fn save(&self, path: &str, canvas: &SavedCanvas) -> Result<(), RemoteError> {
        let url = self.config.url(path);
        log::debug!("PATCH {url} ({} bytes of canvas JSON)", canvas.canvas_json.len());
        let request = self.http.patch(&url).json(canvas);
        http::send(http::authorize(request, &self.config))
            .await
            .inspect_err(|e| log::error!("saving {path} failed: {e}"))?;
        Ok(())
    }
}
