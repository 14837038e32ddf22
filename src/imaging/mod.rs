//! Image processing in pure Rust, built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Trim** | border scan + `crop_imm` |
//! | **Resize** | Lanczos3 `resize_exact` |
//! | **Fit** | cover resize + centre `crop_imm` |
//! | **Canvas pad** | `imageops::overlay` on a transparent canvas |
//! | **Encode** | `DynamicImage::write_to` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: The transform pipeline driving a backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use operations::{Operation, TransformError, apply, transform};
pub use params::{
    CanvasParams, FitParams, OutputFormat, ResizeParams, TrimBase, TrimParams, TrimSides,
    UnknownFormat,
};
pub use rust_backend::RustBackend;
