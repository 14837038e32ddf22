//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the [`operations`](super::operations) pipeline (which
//! decides what to apply from a resolved profile) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing pipeline logic.
//!
//! ## Types
//!
//! - [`OutputFormat`]: the fixed set of encodings a profile may ask for.
//! - [`ResizeParams`]: target box plus the keep-ratio constraint.
//! - [`FitParams`]: target box for a crop-and-fill.
//! - [`CanvasParams`]: fixed canvas size for centre padding.
//! - [`TrimParams`]: border colour source, trimmed sides, tolerance, feather.

use std::fmt;
use std::str::FromStr;

/// Encodings a profile may name. The list is closed: anything else is
/// rejected while the profile is resolved, before any pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpg,
    Png,
    Gif,
    Tif,
    Bmp,
    Ico,
    Psd,
    Webp,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Jpg,
        OutputFormat::Png,
        OutputFormat::Gif,
        OutputFormat::Tif,
        OutputFormat::Bmp,
        OutputFormat::Ico,
        OutputFormat::Psd,
        OutputFormat::Webp,
    ];

    /// File extension written on artifacts, also the token used in profiles.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Gif => "gif",
            OutputFormat::Tif => "tif",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Ico => "ico",
            OutputFormat::Psd => "psd",
            OutputFormat::Webp => "webp",
        }
    }

    /// Map a source file extension onto an output format.
    ///
    /// Case-insensitive, and accepts the long spellings `jpeg` and `tiff`.
    /// Returns `None` for anything outside the accepted set.
    pub fn from_source_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpeg" => Some(OutputFormat::Jpg),
            "tiff" => Some(OutputFormat::Tif),
            other => other.parse().ok(),
        }
    }

    /// Comma-separated list of accepted tokens, for error messages.
    pub fn accepted_list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when a string is not one of the accepted format tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Exact, lowercase match only. Profile values are taken literally.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == s)
            .ok_or_else(|| UnknownFormat(s.to_string()))
    }
}

/// Parameters for a resize.
///
/// Without `keep_ratio` the image is stretched to exactly `width × height`.
/// With it, the image is scaled to the largest size that fits inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: u32,
    pub height: u32,
    pub keep_ratio: bool,
}

/// Parameters for a crop-and-fill to exactly `width × height`.
///
/// `keep_ratio` governs the scale step before the centre crop: cover the box
/// preserving aspect ratio, or stretch straight to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitParams {
    pub width: u32,
    pub height: u32,
    pub keep_ratio: bool,
}

/// Fixed canvas the image is centred on, transparent background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasParams {
    pub width: u32,
    pub height: u32,
}

/// Where the border colour is sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimBase {
    #[default]
    TopLeft,
    BottomRight,
    /// Trim fully transparent pixels regardless of colour.
    Transparent,
}

impl TrimBase {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top-left" => Some(TrimBase::TopLeft),
            "bottom-right" => Some(TrimBase::BottomRight),
            "transparent" => Some(TrimBase::Transparent),
            _ => None,
        }
    }
}

/// Sides a trim is allowed to cut away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimSides {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl TrimSides {
    pub fn all() -> Self {
        Self {
            top: true,
            bottom: true,
            left: true,
            right: true,
        }
    }

    pub fn none() -> Self {
        Self {
            top: false,
            bottom: false,
            left: false,
            right: false,
        }
    }
}

impl Default for TrimSides {
    fn default() -> Self {
        Self::all()
    }
}

/// Parameters for a border trim.
///
/// - `tolerance`: 0–100, percentage of the full channel range a pixel may
///   differ from the border colour and still count as border.
/// - `feather`: pixels of border kept around the trimmed box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrimParams {
    pub base: TrimBase,
    pub away: TrimSides,
    pub tolerance: u8,
    pub feather: u32,
}
