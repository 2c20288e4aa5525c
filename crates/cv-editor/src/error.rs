//! User-facing editor errors.
//!
//! None of these are fatal: the host decides whether to surface them
//! (e.g. as an alert) or ignore them. The editor state is unchanged
//! whenever an operation returns one.

use cv_core::FormatError;
use cv_core::ImageDataError;
use cv_remote::RemoteError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("select at least two objects to group (got {0})")]
    NotEnoughObjects(usize),

    #[error("the selection is not a group")]
    NotAGroup,

    #[error("nothing is selected")]
    NoSelection,

    #[error("select exactly one object")]
    NotSingleSelection,

    #[error("no crop region is active")]
    NoCropRegion,

    #[error("the crop rectangle lies outside the canvas")]
    CropOutsideCanvas,

    #[error("finish renaming the layer first")]
    RenameInProgress,

    #[error("layer index {index} out of range ({len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    #[error("the background layer cannot be moved")]
    BackgroundLocked,

    #[error("another effect is already running")]
    EffectPending,

    #[error("the object changed while the effect was running; result discarded")]
    StaleEffect,

    #[error("effect failed: {0}")]
    Effect(#[from] RemoteError),

    #[error("image could not be decoded: {0}")]
    Image(#[from] ImageDataError),

    #[error(transparent)]
    Format(#[from] FormatError),
}
