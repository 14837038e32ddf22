//! Resizer configuration module.
//!
//! Handles loading, validating, and merging `image-resizer.toml`. Stock
//! defaults are serialized to a TOML table and the user file is merged on
//! top, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root = "storage/public"   # Output root; artifacts land under root/cache_path
//! public_dir = "public"     # Base directory for `resize_public` sources
//! public_url = "/"          # URL prefix the output root is served under
//! driver = "image"          # Image backend
//! cache = "file"            # Cache store: "file" or "memory"
//! cache_path = "cache/images"
//! lifetime = 10             # Minutes a cached artifact stays valid
//!
//! [processing]
//! max_processes = 4         # Max parallel workers for batch resizes
//!
//! [templates.small]
//! width = 250
//! height = 500
//! inCanvas = true
//! trim = ["transparent", "all", 10]
//!
//! [templates.smallWebp]
//! width = 250
//! height = 500
//! resize = true
//! keepRatio = true
//! format = "webp"
//! ```
//!
//! Templates keep the order they appear in: the first one is used when a
//! caller asks for no profile or an unknown one. Template contents are kept
//! as raw TOML tables here and only interpreted by [`crate::profile`].
//!
//! Unknown top-level keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Ordered mapping of template name to raw profile table.
pub type Templates = toml::Table;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("No templates configured")]
    NoTemplates,
    #[error("Invalid config {field} in template '{template}': {reason}")]
    InvalidField {
        template: String,
        field: String,
        reason: String,
    },
    #[error("format {format} is not accepted, choose within {accepted}")]
    FormatNotAccepted { format: String, accepted: String },
    #[error("Invalid config {field}, unsupported type {kind}")]
    UnsupportedType { field: String, kind: &'static str },
}

impl ConfigError {
    pub(crate) fn invalid_field(template: &str, field: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidField {
            template: template.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn format_not_accepted(format: &str) -> Self {
        ConfigError::FormatNotAccepted {
            format: format.to_string(),
            accepted: crate::imaging::OutputFormat::accepted_list(),
        }
    }
}

/// Image backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Pure-Rust backend built on the `image` crate.
    #[default]
    Image,
}

/// Cache store selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// JSON manifest under the output root, shared across processes.
    #[default]
    File,
    /// Process-local map; nothing survives a restart.
    Memory,
}

/// Resizer configuration loaded from `image-resizer.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizerConfig {
    /// Output root directory. Artifacts are written under `root/cache_path`
    /// and the file cache store keeps its manifest here.
    pub root: PathBuf,
    /// Base directory sources are resolved against by `resize_public`.
    pub public_dir: PathBuf,
    /// URL prefix the output root is served under. Artifact URLs are this
    /// prefix followed by the root-relative artifact path.
    pub public_url: String,
    /// Image backend.
    pub driver: Driver,
    /// Cache store.
    pub cache: CacheDriver,
    /// Output directory for artifacts, relative to `root`.
    #[serde(alias = "cachePath")]
    pub cache_path: PathBuf,
    /// Minutes an artifact and its cache marker stay valid.
    pub lifetime: u32,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Named transformation profiles, in file order.
    #[serde(alias = "profiles")]
    pub templates: Templates,
}

impl Default for ResizerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage/public"),
            public_dir: PathBuf::from("public"),
            public_url: "/".to_string(),
            driver: Driver::default(),
            cache: CacheDriver::default(),
            cache_path: PathBuf::from("cache/images"),
            lifetime: 10,
            processing: ProcessingConfig::default(),
            templates: Templates::new(),
        }
    }
}

impl ResizerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lifetime == 0 {
            return Err(ConfigError::Validation(
                "lifetime must be at least 1 minute".into(),
            ));
        }
        if self.cache_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "cache_path must not be empty".into(),
            ));
        }
        if self
            .cache_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ConfigError::Validation(format!(
                "cache_path must be a relative path inside root, got {}",
                self.cache_path.display()
            )));
        }
        if let Some((name, _)) = self.templates.iter().find(|(_, v)| !v.is_table()) {
            return Err(ConfigError::Validation(format!(
                "templates.{name} must be a table"
            )));
        }
        Ok(())
    }

    /// Absolute (or root-relative) directory artifacts are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.cache_path)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel resize workers for batch runs.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ResizerConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ResizerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, normalize_aliases(ov)),
        None => base,
    };
    let config: ResizerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Rename accepted aliases to their canonical key before merging, so an
/// aliased user key replaces the stock value instead of sitting next to it.
fn normalize_aliases(value: toml::Value) -> toml::Value {
    const ALIASES: &[(&str, &str)] = &[("cachePath", "cache_path"), ("profiles", "templates")];
    match value {
        toml::Value::Table(mut table) => {
            for (alias, canonical) in ALIASES {
                if let Some(v) = table.remove(*alias) {
                    table.insert((*canonical).to_string(), v);
                }
            }
            toml::Value::Table(table)
        }
        other => other,
    }
}

/// Load config from the given file.
///
/// A missing file yields the stock defaults. User values are merged on top
/// of stock defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<ResizerConfig, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Parse config from a TOML string (same merge and validation as [`load_config`]).
pub fn parse_config(content: &str) -> Result<ResizerConfig, ConfigError> {
    let value: toml::Value = toml::from_str(content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock `image-resizer.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Resizer Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.

# Output root. Artifacts are written to <root>/<cache_path>/ and the file
# cache store keeps its manifest (.image-resizer-cache.json) in <root>.
root = "storage/public"

# Base directory for sources passed to the public-path helper.
public_dir = "public"

# URL prefix the output root is served under. `resize --url` prints
# <public_url>/<cache_path>/<file> instead of the disk path.
public_url = "/"

# Image backend. "image" is the pure-Rust backend.
driver = "image"

# Cache store: "file" (shared on disk) or "memory" (per process).
cache = "file"

# Artifact directory, relative to root.
cache_path = "cache/images"

# Minutes an artifact stays valid. `clean-cache` deletes older files.
lifetime = 10

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers when resizing several files at once.
# Omit to use all CPU cores. Values above the core count are clamped.
# max_processes = 4

# ---------------------------------------------------------------------------
# Templates
# ---------------------------------------------------------------------------
# Each [templates.<name>] table is a transformation profile. The first one
# is the fallback when no (or an unknown) profile name is requested.
#
#   resize    = true   resize to width x height
#   keepRatio = true   keep the aspect ratio while resizing / fitting
#   fit       = true   crop-and-fill to exactly width x height
#                      (takes precedence over resize when both are set)
#   inCanvas  = true   centre on a transparent width x height canvas
#   trim      = [base, away, tolerance, feather]
#               base:      "top-left" | "bottom-right" | "transparent"
#               away:      "all" or a list of "top", "bottom", "left", "right"
#               tolerance: 0-100
#               feather:   pixels of border to keep
#   format    = one of jpg, png, gif, tif, bmp, ico, psd, webp
#               (omit to keep the source extension)
#
# width and height are required integers when resize or inCanvas is set.
#
# [templates.small]
# height = 500
# width = 250
# inCanvas = true
# trim = ["transparent", "all", 10]
#
# [templates.smallWebp]
# height = 500
# width = 250
# inCanvas = true
# format = "webp"
#
# [templates.justConvert]
# format = "webp"
"##
}
