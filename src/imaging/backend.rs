//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: decode, trim, resize, fit, canvas pad and encode. All of them
//! work on an in-memory image handle ([`ImageBackend::Image`]), so the
//! pipeline decodes once and encodes once no matter how many steps run.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust and built on
//! the `image` crate. Backends are chosen by the `driver` config key and
//! injected into the resizer at construction.

use super::params::{CanvasParams, FitParams, OutputFormat, ResizeParams, TrimParams};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    /// The input is not a raster image this backend can read (SVG, PDF,
    /// truncated or corrupt data). Callers may choose to ignore these.
    #[error("Image is not decodable: {0}")]
    NotDecodable(String),
    #[error("Format {0} cannot be encoded by this backend")]
    UnsupportedFormat(OutputFormat),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// Every operation consumes the handle and returns the transformed one, so a
/// backend never has to clone pixel buffers between steps.
pub trait ImageBackend: Sync {
    /// In-memory image representation.
    type Image;

    /// Decode raw file bytes. Unreadable input must map to
    /// [`BackendError::NotDecodable`].
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, BackendError>;

    /// Current dimensions of a handle.
    fn dimensions(&self, image: &Self::Image) -> Dimensions;

    /// Strip uniform borders.
    fn trim(&self, image: Self::Image, params: &TrimParams) -> Result<Self::Image, BackendError>;

    /// Resize to a box, optionally keeping the aspect ratio.
    fn resize(
        &self,
        image: Self::Image,
        params: &ResizeParams,
    ) -> Result<Self::Image, BackendError>;

    /// Crop-and-fill to exactly the given box.
    fn fit(&self, image: Self::Image, params: &FitParams) -> Result<Self::Image, BackendError>;

    /// Centre on a transparent canvas of fixed size, without scaling.
    fn canvas_pad(
        &self,
        image: Self::Image,
        params: &CanvasParams,
    ) -> Result<Self::Image, BackendError>;

    /// Serialize to the given format.
    fn encode(&self, image: &Self::Image, format: OutputFormat) -> Result<Vec<u8>, BackendError>;
}
