//! Raster payloads carried by image objects, plus PNG / data-URL helpers.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Errors from encoding or decoding raster payloads.
#[derive(Debug, thiserror::Error)]
pub enum ImageDataError {
    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("not a base64 data URL")]
    NotDataUrl,
}

/// Shared, immutable RGBA pixels. Cloning is cheap.
#[derive(Clone, PartialEq)]
pub struct ImageData(Arc<RgbaImage>);

impl ImageData {
    pub fn new(pixels: RgbaImage) -> Self {
        Self(Arc::new(pixels))
    }

    /// Decode any format the `image` crate was built with (PNG here).
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageDataError> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageDataError> {
        encode_png(&self.0)
    }

    pub fn to_data_url(&self) -> Result<String, ImageDataError> {
        Ok(png_data_url(&self.to_png()?))
    }

    pub fn from_data_url(url: &str) -> Result<Self, ImageDataError> {
        let (_, payload) = url.split_once(";base64,").ok_or(ImageDataError::NotDataUrl)?;
        let bytes = STANDARD.decode(payload.trim())?;
        Self::decode(&bytes)
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageData({}x{})", self.width(), self.height())
    }
}

impl Serialize for ImageData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let url = self.to_data_url().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&url)
    }
}

impl<'de> Deserialize<'de> for ImageData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        Self::from_data_url(&url).map_err(serde::de::Error::custom)
    }
}

/// Encode RGBA pixels as PNG bytes.
pub fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, ImageDataError> {
    let mut buf = Cursor::new(Vec::new());
    pixels.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// Wrap PNG bytes as a `data:` URL (the `rendered_image` / `src` format).
pub fn png_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png))
}
