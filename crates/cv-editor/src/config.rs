//! Editor configuration.
//!
//! Every field has a default, so hosts only spell out what they change:
//!
//! ```json
//! { "canvas_width": 1280, "canvas_height": 720, "brush_width": 8 }
//! ```

use cv_core::Color;
use cv_core::kurbo::{Rect, Size};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ops::RangeInclusive;

pub const BRUSH_WIDTH_RANGE: RangeInclusive<f64> = 1.0..=100.0;
pub const ERASER_WIDTH_RANGE: RangeInclusive<f64> = 5.0..=100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub brush_width: f64,
    pub eraser_width: f64,
    #[serde(with = "hex")]
    pub foreground: Color,
    #[serde(with = "hex")]
    pub background: Color,
    /// Crop rectangle shown when entering crop mode.
    pub crop: CropDefaults,
    /// Text layers are labelled with their content, cut to this many chars.
    pub label_max_chars: usize,
    pub undo_depth: usize,
    pub arrow_stroke_width: f64,
    /// Width and height of the arrowhead triangle.
    pub arrow_head_size: f64,
    pub font_family: String,
    pub font_size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropDefaults {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for CropDefaults {
    fn default() -> Self {
        Self {
            left: 50.0,
            top: 50.0,
            width: 200.0,
            height: 200.0,
        }
    }
}

impl CropDefaults {
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.left + self.width, self.top + self.height)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            brush_width: 5.0,
            eraser_width: 20.0,
            foreground: Color::BLACK,
            background: Color::WHITE,
            crop: CropDefaults::default(),
            label_max_chars: 20,
            undo_depth: 100,
            arrow_stroke_width: 3.0,
            arrow_head_size: 15.0,
            font_family: "Inter".into(),
            font_size: 24.0,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON config and clamp it.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let cfg: Self = serde_json::from_str(json)?;
        Ok(cfg.clamped())
    }

    /// Bring out-of-range values back into their valid ranges.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.brush_width = clamp_brush(self.brush_width);
        self.eraser_width = clamp_eraser(self.eraser_width);
        self.canvas_width = self.canvas_width.max(1.0);
        self.canvas_height = self.canvas_height.max(1.0);
        self.label_max_chars = self.label_max_chars.max(1);
        self
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }
}

pub fn clamp_brush(width: f64) -> f64 {
    clamp_to(width, &BRUSH_WIDTH_RANGE)
}

pub fn clamp_eraser(width: f64) -> f64 {
    clamp_to(width, &ERASER_WIDTH_RANGE)
}

fn clamp_to(value: f64, range: &RangeInclusive<f64>) -> f64 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}

/// `#RRGGBB` / `#RRGGBBAA` colour strings.
mod hex {
    use super::*;

    pub fn serialize<S: Serializer>(color: &Color, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&color.to_hex())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Color, D::Error> {
        let raw = String::deserialize(d)?;
        Color::from_hex(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid colour '{raw}'")))
    }
}
