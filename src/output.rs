//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Resize
//!
//! ```text
//! 001 photo.PNG → cache/images/6f1c…_photo.webp
//! 002 missing.png: skipped
//! 003 broken.jpg: error: decode failed: Image is not decodable: …
//!
//! Resized 1, skipped 1, failed 1
//! ```
//!
//! ## Clean cache
//!
//! ```text
//! Deleted storage/public/cache/images/6f1c…_photo.webp
//!
//! Deleted 1 expired file, kept 4
//! ```
//!
//! ## Profiles
//!
//! ```text
//! 001 small
//!     trim: transparent, all sides, tolerance 10, feather 0
//!     canvas: 250x500
//!     format: inherit
//! 002 smallWebp
//!     resize: 250x500, keep ratio
//!     format: webp
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::Templates;
use crate::imaging::{TrimBase, TrimParams, TrimSides};
use crate::profile::{TransformProfile, resolve};
use crate::resizer::BatchItem;
use crate::sweep::SweepReport;
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Resize
// ============================================================================

/// Format the results of a batch resize, one line per source plus a summary.
pub fn format_batch_output(items: &[BatchItem]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut resized, mut skipped, mut failed) = (0, 0, 0);

    for (i, item) in items.iter().enumerate() {
        let label = file_label(&item.source);
        let line = match &item.result {
            Ok(Some(path)) => {
                resized += 1;
                format!("{} {} → {}", format_index(i + 1), label, path.display())
            }
            Ok(None) => {
                skipped += 1;
                format!("{} {}: skipped", format_index(i + 1), label)
            }
            Err(e) => {
                failed += 1;
                format!("{} {}: error: {}", format_index(i + 1), label, e)
            }
        };
        lines.push(line);
    }

    lines.push(String::new());
    lines.push(format!(
        "Resized {resized}, skipped {skipped}, failed {failed}"
    ));
    lines
}

pub fn print_batch_output(items: &[BatchItem]) {
    for line in format_batch_output(items) {
        println!("{}", line);
    }
}

// ============================================================================
// Clean cache
// ============================================================================

/// Format a sweep report.
pub fn format_sweep_report(report: &SweepReport) -> Vec<String> {
    let verb = if report.dry_run { "Would delete" } else { "Deleted" };
    let mut lines: Vec<String> = report
        .removed
        .iter()
        .map(|path| format!("{verb} {}", path.display()))
        .collect();

    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{verb} {}, kept {}",
        plural(report.removed.len(), "expired file"),
        report.kept
    ));
    lines
}

pub fn print_sweep_report(report: &SweepReport) {
    for line in format_sweep_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Profiles
// ============================================================================

fn trim_summary(trim: &TrimParams) -> String {
    let base = match trim.base {
        TrimBase::TopLeft => "top-left",
        TrimBase::BottomRight => "bottom-right",
        TrimBase::Transparent => "transparent",
    };
    let sides = if trim.away == TrimSides::all() {
        "all sides".to_string()
    } else {
        [
            (trim.away.top, "top"),
            (trim.away.bottom, "bottom"),
            (trim.away.left, "left"),
            (trim.away.right, "right"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("+")
    };
    format!(
        "{base}, {sides}, tolerance {}, feather {}",
        trim.tolerance, trim.feather
    )
}

fn profile_lines(profile: &TransformProfile) -> Vec<String> {
    let detail = indent(1);
    let size = format!("{}x{}", profile.width(), profile.height());
    let ratio = if profile.keep_ratio() { ", keep ratio" } else { "" };
    let mut lines = Vec::new();

    if let Some(trim) = profile.trim() {
        lines.push(format!("{detail}trim: {}", trim_summary(trim)));
    }
    if profile.fit() {
        lines.push(format!("{detail}fit: {size}{ratio}"));
        if profile.resize() {
            lines.push(format!("{detail}resize: ignored, fit takes precedence"));
        }
    } else if profile.resize() {
        lines.push(format!("{detail}resize: {size}{ratio}"));
    }
    if profile.in_canvas() {
        lines.push(format!("{detail}canvas: {size}"));
    }
    match profile.format() {
        Some(format) => lines.push(format!("{detail}format: {format}")),
        None => lines.push(format!("{detail}format: inherit")),
    }
    lines
}

/// Resolve every template and describe it. Templates that fail to resolve
/// show their error instead.
pub fn format_profiles(templates: &Templates) -> Vec<String> {
    if templates.is_empty() {
        return vec!["No templates configured".to_string()];
    }

    let mut lines = Vec::new();
    for (i, name) in templates.keys().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), name));
        match resolve(templates, Some(name)) {
            Ok(profile) => lines.extend(profile_lines(&profile)),
            Err(e) => lines.push(format!("{}error: {}", indent(1), e)),
        }
    }
    lines
}

pub fn print_profiles(templates: &Templates) {
    for line in format_profiles(templates) {
        println!("{}", line);
    }
}
