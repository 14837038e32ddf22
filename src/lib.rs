//! # Image Resizer
//!
//! On-demand image transformation with a fingerprinted disk cache. Given a
//! source image and a named template, produce a resized and/or reformatted
//! derivative, store it under a content-derived name, and serve repeats of
//! the same request without touching a single pixel.
//!
//! ```rust,no_run
//! use image_resizer::{ImageResizer, config};
//! use std::path::Path;
//!
//! let config = config::load_config(Path::new("image-resizer.toml"))?;
//! let resizer = ImageResizer::from_config(config);
//! if let Some(path) = resizer.resize_image(Path::new("public/photo.png"), Some("thumb"))? {
//!     println!("served from {}", path.display());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture: Resolve, Fingerprint, Transform
//!
//! ```text
//! template  →  TransformProfile   (defaults applied, types checked)
//! profile + source mtime  →  fingerprint   (SHA-256, 128 bits, hex)
//! fingerprint  →  cache/images/{fingerprint}_{slug}.{format}
//! ```
//!
//! A request is a cache hit when the store holds a live marker for the
//! fingerprint and the artifact file exists. Otherwise the source is decoded,
//! run through trim → fit/resize → canvas pad → encode, written atomically,
//! and a marker is recorded for `lifetime` minutes.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resizer`] | The orchestrator: source check, cache lookup, transform, persist |
//! | [`profile`] | Resolves raw template tables into immutable `TransformProfile`s |
//! | [`fingerprint`] | Deterministic cache key over profile fields and source mtime |
//! | [`cache`] | `CacheStore` trait with in-memory and JSON-file stores |
//! | [`imaging`] | `ImageBackend` trait, the `image`-crate backend, and the pipeline |
//! | [`naming`] | Artifact file names and slugs |
//! | [`sweep`] | Deletes artifacts older than the configured lifetime |
//! | [`config`] | `image-resizer.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fingerprints Over Timestamps
//!
//! The artifact name embeds a digest of every template setting plus the
//! source modification time. Editing a template or touching a source produces
//! a new name, so stale artifacts are never served and never overwritten;
//! they simply age out through [`sweep`].
//!
//! ## Explicit Configuration
//!
//! [`ImageResizer`] takes a [`config::ResizerConfig`] at construction and never
//! reads global state. The backend is a generic parameter and the cache store
//! a trait object, so tests swap both without touching the filesystem layout.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling (Lanczos3), and encoding all go through the `image`
//! crate. No ImageMagick or system libraries are needed.

pub mod cache;
pub mod config;
pub mod fingerprint;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod profile;
pub mod resizer;
pub mod sweep;

pub use resizer::{ImageResizer, InputError, ResizeError};

#[cfg(test)]
pub(crate) mod test_helpers;
