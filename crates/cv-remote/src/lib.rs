//! Backend adapters for the canvas editor.
//!
//! Two concerns live here, both thin HTTP wrappers:
//!
//! - [`EffectService`]: send a rendered PNG to an image-processing
//!   endpoint (background removal, text removal) and get a PNG back.
//! - [`SlideClient`]: persist `{canvas_json, rendered_image}` for a slide
//!   or section with a `PATCH`.
//!
//! Configuration comes from the environment via [`RemoteConfig::from_env`].

pub mod config;
pub mod effects;
pub mod error;
pub mod persist;

mod http;

pub use config::{RemoteConfig, RemoteTimeouts};
pub use effects::{Effect, EffectService, HttpEffectsClient};
pub use error::RemoteError;
pub use persist::{SavedCanvas, SlideClient};
