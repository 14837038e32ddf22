//! Shared test utilities for the image-resizer test suite.
//!
//! Provides synthetic image fixtures, template tables parsed from TOML
//! snippets, and a resizer wired to the recording mock backend.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let source = write_source(tmp.path(), "photo.png");
//! set_mtime(&source, 1_700_000_000);
//!
//! let resizer = mock_resizer(tmp.path(), "[thumb]\nformat = \"webp\"\n");
//! let path = resizer.resize_image(&source, None).unwrap().unwrap();
//! assert_eq!(resizer.backend().encode_count(), 1);
//! ```

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::cache::MemoryStore;
use crate::config::{ResizerConfig, Templates};
use crate::imaging::backend::tests::MockBackend;
use crate::resizer::ImageResizer;

// =========================================================================
// Templates and resizers
// =========================================================================

/// Parse a TOML snippet of `[name]` tables into a template mapping.
pub fn templates(toml_src: &str) -> Templates {
    toml::from_str(toml_src).unwrap_or_else(|e| panic!("bad template TOML: {e}\n{toml_src}"))
}

/// Resizer over the mock backend and an in-memory store.
///
/// Artifacts are written under `root/out`.
pub fn mock_resizer(root: &Path, templates_toml: &str) -> ImageResizer<MockBackend> {
    let config = ResizerConfig {
        root: root.join("out"),
        templates: templates(templates_toml),
        ..ResizerConfig::default()
    };
    ImageResizer::new(config, MockBackend::new(), Box::new(MemoryStore::new()))
}

// =========================================================================
// Files
// =========================================================================

/// Write a small placeholder source file (the mock backend ignores content).
pub fn write_source(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, b"not really an image").unwrap();
    path
}

/// Set a file's modification time to `secs` after the Unix epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// =========================================================================
// Synthetic images
// =========================================================================

fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// PNG bytes of a `width x height` gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128, 255])
    });
    encode_png(image)
}

/// PNG bytes of a white canvas with one opaque red block at
/// `(x, y, block_width, block_height)`.
pub fn bordered_png_bytes(width: u32, height: u32, block: (u32, u32, u32, u32)) -> Vec<u8> {
    let (bx, by, bw, bh) = block;
    let image = RgbaImage::from_fn(width, height, |x, y| {
        if (bx..bx + bw).contains(&x) && (by..by + bh).contains(&y) {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    encode_png(image)
}
