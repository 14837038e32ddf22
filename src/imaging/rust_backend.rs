//! Pure Rust image processing backend on top of the `image` crate.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, TIFF, BMP, ICO, WebP) | `image::load_from_memory` |
//! | Trim | border scan over `to_rgba8` + `DynamicImage::crop_imm` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Fit | cover `resize_exact` + centre `crop_imm` (keep ratio), or `resize_exact` |
//! | Canvas pad | transparent `RgbaImage` + `imageops::overlay` |
//! | Encode | `DynamicImage::write_to` (PSD has no encoder) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    calculate_fill_dimensions, center_offset, fit_within, is_transparent, matches_border,
    trim_region,
};
use super::params::{CanvasParams, FitParams, OutputFormat, ResizeParams, TrimBase, TrimParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    filter: FilterType,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_target(width: u32, height: u32) -> Result<(), BackendError> {
    if width == 0 || height == 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "target dimensions must be non-zero, got {width}x{height}"
        )));
    }
    Ok(())
}

fn image_format(format: OutputFormat) -> Option<ImageFormat> {
    match format {
        OutputFormat::Jpg => Some(ImageFormat::Jpeg),
        OutputFormat::Png => Some(ImageFormat::Png),
        OutputFormat::Gif => Some(ImageFormat::Gif),
        OutputFormat::Tif => Some(ImageFormat::Tiff),
        OutputFormat::Bmp => Some(ImageFormat::Bmp),
        OutputFormat::Ico => Some(ImageFormat::Ico),
        OutputFormat::Webp => Some(ImageFormat::WebP),
        OutputFormat::Psd => None,
    }
}

impl ImageBackend for RustBackend {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, BackendError> {
        // Decoding reads from memory, so an I/O error here means truncated data.
        image::load_from_memory(bytes).map_err(|e| match e {
            err @ (ImageError::IoError(_) | ImageError::Decoding(_) | ImageError::Unsupported(_)) => {
                BackendError::NotDecodable(err.to_string())
            }
            other => BackendError::ProcessingFailed(format!("Failed to decode: {other}")),
        })
    }

    fn dimensions(&self, image: &DynamicImage) -> Dimensions {
        Dimensions {
            width: image.width(),
            height: image.height(),
        }
    }

    fn trim(&self, image: DynamicImage, params: &TrimParams) -> Result<DynamicImage, BackendError> {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Ok(image);
        }

        let region = match params.base {
            TrimBase::Transparent => trim_region(
                width,
                height,
                |x, y| is_transparent(rgba.get_pixel(x, y).0, params.tolerance),
                params.away,
                params.feather,
            ),
            TrimBase::TopLeft | TrimBase::BottomRight => {
                let base = if params.base == TrimBase::TopLeft {
                    rgba.get_pixel(0, 0).0
                } else {
                    rgba.get_pixel(width - 1, height - 1).0
                };
                trim_region(
                    width,
                    height,
                    |x, y| matches_border(rgba.get_pixel(x, y).0, base, params.tolerance),
                    params.away,
                    params.feather,
                )
            }
        };

        // A fully uniform image has no content to keep: leave it as is.
        match region {
            Some(r) if (r.width, r.height) != (width, height) => {
                Ok(image.crop_imm(r.x, r.y, r.width, r.height))
            }
            _ => Ok(image),
        }
    }

    fn resize(
        &self,
        image: DynamicImage,
        params: &ResizeParams,
    ) -> Result<DynamicImage, BackendError> {
        ensure_target(params.width, params.height)?;
        let (width, height) = if params.keep_ratio {
            fit_within((image.width(), image.height()), (params.width, params.height))
        } else {
            (params.width, params.height)
        };
        Ok(image.resize_exact(width, height, self.filter))
    }

    fn fit(&self, image: DynamicImage, params: &FitParams) -> Result<DynamicImage, BackendError> {
        ensure_target(params.width, params.height)?;
        if params.keep_ratio {
            // Cover the box, then centre-crop the overflow
            let (fill_w, fill_h) = calculate_fill_dimensions(
                (image.width(), image.height()),
                (params.width, params.height),
            );
            let filled = image.resize_exact(fill_w, fill_h, self.filter);
            let x = (fill_w - params.width) / 2;
            let y = (fill_h - params.height) / 2;
            Ok(filled.crop_imm(x, y, params.width, params.height))
        } else {
            Ok(image.resize_exact(params.width, params.height, self.filter))
        }
    }

    fn canvas_pad(
        &self,
        image: DynamicImage,
        params: &CanvasParams,
    ) -> Result<DynamicImage, BackendError> {
        ensure_target(params.width, params.height)?;
        let mut canvas = RgbaImage::new(params.width, params.height);
        let (x, y) = center_offset(
            (params.width, params.height),
            (image.width(), image.height()),
        );
        image::imageops::overlay(&mut canvas, &image.to_rgba8(), x, y);
        Ok(DynamicImage::ImageRgba8(canvas))
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, BackendError> {
        let target = image_format(format).ok_or(BackendError::UnsupportedFormat(format))?;

        // JPEG has no alpha channel; every other encoder here takes RGBA8.
        let normalized = match format {
            OutputFormat::Jpg => DynamicImage::ImageRgb8(image.to_rgb8()),
            _ => DynamicImage::ImageRgba8(image.to_rgba8()),
        };

        let mut buffer = Cursor::new(Vec::new());
        normalized.write_to(&mut buffer, target).map_err(|e| {
            BackendError::ProcessingFailed(format!("{format} encode failed: {e}"))
        })?;
        Ok(buffer.into_inner())
    }
}
