//! The transform pipeline.
//!
//! Runs a resolved profile against an image handle in a fixed order:
//!
//! 1. **Trim** when the profile carries trim arguments
//! 2. **Fit** or **resize** (fit wins when both are set)
//! 3. **Canvas pad** when `inCanvas` is set
//! 4. **Encode** to the target format
//!
//! A profile with none of the first three steps only re-encodes. Every
//! backend failure is tagged with the step that produced it.

use super::backend::{BackendError, ImageBackend};
use super::params::{CanvasParams, FitParams, OutputFormat, ResizeParams};
use crate::profile::TransformProfile;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Pipeline step, used to tag failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Decode,
    Trim,
    Resize,
    Fit,
    Canvas,
    Encode,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Decode => "decode",
            Operation::Trim => "trim",
            Operation::Resize => "resize",
            Operation::Fit => "fit",
            Operation::Canvas => "canvas",
            Operation::Encode => "encode",
        })
    }
}

/// A backend failure during one pipeline step.
#[derive(Error, Debug)]
#[error("{operation} failed: {source}")]
pub struct TransformError {
    pub operation: Operation,
    #[source]
    pub source: BackendError,
}

impl TransformError {
    /// Whether the input could not be read as an image at all.
    pub fn is_not_decodable(&self) -> bool {
        matches!(self.source, BackendError::NotDecodable(_))
    }
}

trait Tag<T> {
    fn tag(self, operation: Operation) -> Result<T, TransformError>;
}

impl<T> Tag<T> for Result<T, BackendError> {
    fn tag(self, operation: Operation) -> Result<T, TransformError> {
        self.map_err(|source| TransformError { operation, source })
    }
}

/// Decode `bytes` and run the full pipeline, returning the encoded output.
pub fn transform<B: ImageBackend>(
    backend: &B,
    bytes: &[u8],
    profile: &TransformProfile,
    format: OutputFormat,
) -> Result<Vec<u8>, TransformError> {
    let image = backend.decode(bytes).tag(Operation::Decode)?;
    apply(backend, image, profile, format)
}

/// Run the pipeline on an already decoded image.
pub fn apply<B: ImageBackend>(
    backend: &B,
    mut image: B::Image,
    profile: &TransformProfile,
    format: OutputFormat,
) -> Result<Vec<u8>, TransformError> {
    if let Some(trim) = profile.trim() {
        image = backend.trim(image, trim).tag(Operation::Trim)?;
    }

    if profile.fit() {
        if profile.resize() {
            warn!(
                "Template '{}' sets both fit and resize; applying fit only",
                profile.name()
            );
        }
        let params = FitParams {
            width: profile.width(),
            height: profile.height(),
            keep_ratio: profile.keep_ratio(),
        };
        image = backend.fit(image, &params).tag(Operation::Fit)?;
    } else if profile.resize() {
        let params = ResizeParams {
            width: profile.width(),
            height: profile.height(),
            keep_ratio: profile.keep_ratio(),
        };
        image = backend.resize(image, &params).tag(Operation::Resize)?;
    }

    if profile.in_canvas() {
        let params = CanvasParams {
            width: profile.width(),
            height: profile.height(),
        };
        image = backend.canvas_pad(image, &params).tag(Operation::Canvas)?;
    }

    let size = backend.dimensions(&image);
    debug!(
        "Template '{}': encoding {}x{} as {format}",
        profile.name(),
        size.width,
        size.height
    );
    backend.encode(&image, format).tag(Operation::Encode)
}
