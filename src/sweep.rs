//! Expired artifact cleanup.
//!
//! Artifacts are never updated in place, so every fingerprint change leaves
//! the previous file behind. [`clean_expired`] deletes files directly under
//! `root/cache_path` whose modification time is at least `lifetime` minutes
//! old. Subdirectories are left alone. A file that cannot be deleted aborts
//! the sweep; files removed before it stay removed.

use crate::config::ResizerConfig;
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Failed to list cache directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to read metadata of {path}: {source}")]
    Metadata { path: PathBuf, source: io::Error },
    #[error("Failed to delete {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// What a sweep did (or would do, for a dry run).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired files, in name order. Deleted unless `dry_run`.
    pub removed: Vec<PathBuf>,
    /// Number of files still within their lifetime.
    pub kept: usize,
    pub dry_run: bool,
}

/// Sweep the configured artifact directory against the wall clock.
pub fn clean_expired(config: &ResizerConfig, dry_run: bool) -> Result<SweepReport, SweepError> {
    clean_expired_at(&config.output_dir(), config.lifetime, Utc::now(), dry_run)
}

/// Sweep `dir`, treating a file as expired when `mtime + lifetime <= now`.
///
/// A missing directory is an empty sweep.
pub fn clean_expired_at(
    dir: &Path,
    lifetime_minutes: u32,
    now: DateTime<Utc>,
    dry_run: bool,
) -> Result<SweepReport, SweepError> {
    let mut report = SweepReport {
        dry_run,
        ..SweepReport::default()
    };
    if !dir.is_dir() {
        debug!("Cache directory {} does not exist, nothing to sweep", dir.display());
        return Ok(report);
    }

    let lifetime = Duration::minutes(i64::from(lifetime_minutes));
    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let modified = entry
            .metadata()
            .map_err(io::Error::from)
            .and_then(|m| m.modified())
            .map_err(|source| SweepError::Metadata {
                path: path.to_path_buf(),
                source,
            })?;

        if DateTime::<Utc>::from(modified) + lifetime > now {
            report.kept += 1;
            continue;
        }

        if dry_run {
            info!("Would delete {}", path.display());
        } else {
            fs::remove_file(path).map_err(|source| SweepError::Remove {
                path: path.to_path_buf(),
                source,
            })?;
            info!("Deleted {}", path.display());
        }
        report.removed.push(path.to_path_buf());
    }

    Ok(report)
}
