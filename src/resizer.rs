//! The orchestrator: source check, cache lookup, transform, persist.
//!
//! ```text
//! SourceCheck → ConfigResolve → FingerprintCompute → CacheCheck
//!     ├─ hit  → return existing path
//!     └─ miss → Transform → Persist → CacheRecord → return new path
//! ```
//!
//! A missing source is a soft miss (`Ok(None)`): callers rendering pages
//! should not fail because one referenced image went away. Everything else
//! that goes wrong is an error, except that [`ImageResizer::resize_image_or_ignore`]
//! additionally swallows inputs the backend cannot decode (SVG, PDF, broken
//! files).
//!
//! A cache hit needs both a live marker in the [`CacheStore`] and the
//! artifact on disk. The check and the write are not atomic: two callers
//! racing on the same fingerprint both transform, and the second rename
//! wins with identical content.
//!
//! Returned paths are relative to the output root (`config.root`), e.g.
//! `cache/images/3f2a…_photo.webp`.

use crate::cache::{CacheStore, open_store, write_atomic};
use crate::config::{ConfigError, Driver, ResizerConfig};
use crate::fingerprint::{epoch_seconds, fingerprint};
use crate::imaging::{ImageBackend, OutputFormat, RustBackend, TransformError, transform};
use crate::naming::{artifact_path, public_url};
use crate::profile::{TransformProfile, resolve};
use rayon::prelude::*;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// The source path cannot be used as an image input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Source {0} is a directory")]
    Directory(PathBuf),
    #[error("Source {path} is not readable: {source}")]
    Unreadable { path: PathBuf, source: io::Error },
}

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("Failed to write {path}: {source}")]
    Persist { path: PathBuf, source: io::Error },
    #[error("Failed to record cache entry: {0}")]
    CacheRecord(#[source] io::Error),
}

/// Outcome of one source in a batch run.
#[derive(Debug)]
pub struct BatchItem {
    pub source: PathBuf,
    pub result: Result<Option<PathBuf>, ResizeError>,
}

/// Resizes images on demand and serves repeats from the cache.
///
/// Holds an explicit config, one backend and one cache store. All methods
/// take `&self`, so one resizer can be shared by concurrent callers.
pub struct ImageResizer<B: ImageBackend = RustBackend> {
    config: ResizerConfig,
    backend: B,
    store: Box<dyn CacheStore>,
}

impl ImageResizer<RustBackend> {
    /// Build a resizer with the backend named by `driver` and the store
    /// named by `cache`.
    pub fn from_config(config: ResizerConfig) -> Self {
        let backend = match config.driver {
            Driver::Image => RustBackend::new(),
        };
        let store = open_store(&config);
        Self::new(config, backend, store)
    }
}

impl<B: ImageBackend> ImageResizer<B> {
    pub fn new(config: ResizerConfig, backend: B, store: Box<dyn CacheStore>) -> Self {
        Self {
            config,
            backend,
            store,
        }
    }

    pub fn config(&self) -> &ResizerConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resize `source` with the named profile (or the first one).
    ///
    /// Returns the artifact path relative to the output root, or `None` when
    /// the source does not exist.
    pub fn resize_image(
        &self,
        source: &Path,
        profile: Option<&str>,
    ) -> Result<Option<PathBuf>, ResizeError> {
        let metadata = match fs::metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Source {} does not exist, skipping", source.display());
                return Ok(None);
            }
            Err(e) => return Err(unreadable(source, e).into()),
        };
        if metadata.is_dir() {
            return Err(InputError::Directory(source.to_path_buf()).into());
        }
        let modified = metadata.modified().map_err(|e| unreadable(source, e))?;
        let mut file = fs::File::open(source).map_err(|e| unreadable(source, e))?;

        let resolved = resolve(&self.config.templates, profile)?;
        let format = target_format(&resolved, source)?;
        let resolved = resolved.with_format(format);
        let fp = fingerprint(&resolved, epoch_seconds(modified))?;

        let relative = artifact_path(&self.config.cache_path, &fp, source, format);
        let absolute = self.config.root.join(&relative);

        if self.store.has(&fp) && absolute.is_file() {
            debug!("{} already cached as {}", source.display(), relative.display());
            return Ok(Some(relative));
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| unreadable(source, e))?;
        let encoded = transform(&self.backend, &bytes, &resolved, format)?;

        write_atomic(&absolute, &encoded).map_err(|e| ResizeError::Persist {
            path: absolute.clone(),
            source: e,
        })?;
        self.store
            .put(&fp, self.config.lifetime)
            .map_err(ResizeError::CacheRecord)?;

        info!(
            "{} → {} (template '{}')",
            source.display(),
            relative.display(),
            resolved.name()
        );
        Ok(Some(relative))
    }

    /// Like [`resize_image`](Self::resize_image), but an input the backend
    /// cannot decode yields `Ok(None)` instead of an error.
    pub fn resize_image_or_ignore(
        &self,
        source: &Path,
        profile: Option<&str>,
    ) -> Result<Option<PathBuf>, ResizeError> {
        match self.resize_image(source, profile) {
            Err(ResizeError::Transform(e)) if e.is_not_decodable() => {
                debug!("Ignoring {}: {}", source.display(), e.source);
                Ok(None)
            }
            other => other,
        }
    }

    /// Resize a source given relative to the configured `public_dir`.
    pub fn resize_public(
        &self,
        relative: &Path,
        profile: Option<&str>,
    ) -> Result<Option<PathBuf>, ResizeError> {
        self.resize_image(&self.config.public_dir.join(relative), profile)
    }

    /// URL of an artifact path returned by the resize methods, under the
    /// configured `public_url`.
    pub fn public_url(&self, artifact: &Path) -> String {
        public_url(&self.config.public_url, artifact)
    }

    /// Resize several sources in parallel on the current rayon pool.
    ///
    /// Results keep the order of `sources`.
    pub fn resize_batch(
        &self,
        sources: &[PathBuf],
        profile: Option<&str>,
        ignore_undecodable: bool,
    ) -> Vec<BatchItem> {
        sources
            .par_iter()
            .map(|source| {
                let result = if ignore_undecodable {
                    self.resize_image_or_ignore(source, profile)
                } else {
                    self.resize_image(source, profile)
                };
                BatchItem {
                    source: source.clone(),
                    result,
                }
            })
            .collect()
    }
}

fn unreadable(path: &Path, source: io::Error) -> InputError {
    InputError::Unreadable {
        path: path.to_path_buf(),
        source,
    }
}

/// The profile's format, or the source extension when the profile has none.
fn target_format(profile: &TransformProfile, source: &Path) -> Result<OutputFormat, ConfigError> {
    if let Some(format) = profile.format() {
        return Ok(format);
    }
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    OutputFormat::from_source_extension(&ext).ok_or_else(|| ConfigError::format_not_accepted(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{FileStore, MemoryStore, manifest_path};
    use crate::imaging::BackendError;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::Operation;
    use crate::test_helpers::{mock_resizer, set_mtime, templates, write_source};
    use tempfile::TempDir;

    const WEBP_THUMB: &str = "[thumb]\nresize = true\nkeepRatio = true\nwidth = 250\nheight = 500\nformat = \"webp\"\n";

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    // =========================================================================
    // Cache hit / miss
    // =========================================================================

    #[test]
    fn photo_png_to_webp_thumbnail() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.PNG");
        set_mtime(&source, 1_700_000_000);
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);

        let path = resizer.resize_image(&source, Some("thumb")).unwrap().unwrap();

        assert!(path.starts_with("cache/images"));
        let name = file_name(&path);
        let (fp, rest) = name.split_once('_').unwrap();
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "photo.webp");
        assert!(tmp.path().join("out").join(&path).is_file());

        let again = resizer.resize_image(&source, Some("thumb")).unwrap().unwrap();
        assert_eq!(again, path);
        assert_eq!(resizer.backend().encode_count(), 1);
    }

    #[test]
    fn written_artifact_holds_encoded_bytes() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);

        let path = resizer.resize_image(&source, None).unwrap().unwrap();
        let written = fs::read(tmp.path().join("out").join(path)).unwrap();
        assert_eq!(written, b"webp:250x188");
    }

    #[test]
    fn deleted_artifact_is_recomputed() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);

        let path = resizer.resize_image(&source, None).unwrap().unwrap();
        fs::remove_file(tmp.path().join("out").join(&path)).unwrap();

        let again = resizer.resize_image(&source, None).unwrap().unwrap();
        assert_eq!(again, path);
        assert_eq!(resizer.backend().encode_count(), 2);
    }

    #[test]
    fn changed_mtime_gives_new_artifact() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        set_mtime(&source, 1_700_000_000);
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);

        let first = resizer.resize_image(&source, None).unwrap().unwrap();
        set_mtime(&source, 1_700_000_100);
        let second = resizer.resize_image(&source, None).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(resizer.backend().encode_count(), 2);
    }

    #[test]
    fn same_stem_and_mtime_share_artifact() {
        // The fingerprint covers template and mtime only, not the source path
        let tmp = TempDir::new().unwrap();
        let a = write_source(&tmp.path().join("a"), "photo.png");
        let b = write_source(&tmp.path().join("b"), "photo.png");
        set_mtime(&a, 1_700_000_000);
        set_mtime(&b, 1_700_000_000);
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);

        let first = resizer.resize_image(&a, None).unwrap().unwrap();
        let second = resizer.resize_image(&b, None).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(resizer.backend().encode_count(), 1);
    }

    #[test]
    fn different_templates_give_different_artifacts() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(
            tmp.path(),
            &format!("{WEBP_THUMB}[big]\nresize = true\nwidth = 1000\nheight = 1000\n"),
        );

        let thumb = resizer.resize_image(&source, Some("thumb")).unwrap().unwrap();
        let big = resizer.resize_image(&source, Some("big")).unwrap().unwrap();
        assert_ne!(thumb, big);
        assert!(file_name(&big).ends_with("_photo.png"));
    }

    #[test]
    fn file_store_serves_second_resizer() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let config = ResizerConfig {
            root: tmp.path().join("out"),
            templates: templates(WEBP_THUMB),
            ..ResizerConfig::default()
        };
        let first = ImageResizer::new(
            config.clone(),
            MockBackend::new(),
            Box::new(FileStore::new(&config.root)),
        );
        let second = ImageResizer::new(
            config.clone(),
            MockBackend::new(),
            Box::new(FileStore::new(&config.root)),
        );

        let a = first.resize_image(&source, None).unwrap().unwrap();
        let b = second.resize_image(&source, None).unwrap().unwrap();
        assert_eq!(a, b);
        assert_eq!(second.backend().encode_count(), 0);
    }

    // =========================================================================
    // Source check
    // =========================================================================

    #[test]
    fn missing_source_is_soft_miss_without_cache_write() {
        let tmp = TempDir::new().unwrap();
        let config = ResizerConfig {
            root: tmp.path().join("out"),
            templates: templates(WEBP_THUMB),
            ..ResizerConfig::default()
        };
        let resizer = ImageResizer::new(
            config.clone(),
            MockBackend::new(),
            Box::new(FileStore::new(&config.root)),
        );

        let result = resizer.resize_image(&tmp.path().join("nope.png"), None).unwrap();
        assert_eq!(result, None);
        assert!(resizer.backend().get_operations().is_empty());
        assert!(!manifest_path(&config.root).exists());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_fails_even_when_cached() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);
        resizer.resize_image(&source, None).unwrap().unwrap();

        fs::set_permissions(&source, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::File::open(&source).is_ok() {
            // Running as root: permission bits do not block reads
            return;
        }

        let err = resizer.resize_image(&source, None).unwrap_err();
        assert!(matches!(err, ResizeError::Input(InputError::Unreadable { .. })));
        assert_eq!(resizer.backend().encode_count(), 1);
    }

    #[test]
    fn directory_source_is_input_error() {
        let tmp = TempDir::new().unwrap();
        let resizer = mock_resizer(tmp.path(), WEBP_THUMB);
        let err = resizer.resize_image(tmp.path(), None).unwrap_err();
        assert!(matches!(err, ResizeError::Input(InputError::Directory(_))));
    }

    // =========================================================================
    // Config errors
    // =========================================================================

    #[test]
    fn bad_format_fails_before_decode() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), "[p]\nformat = \"svg\"\n");

        let err = resizer.resize_image(&source, None).unwrap_err();
        assert!(matches!(
            err,
            ResizeError::Config(ConfigError::FormatNotAccepted { .. })
        ));
        assert!(resizer.backend().get_operations().is_empty());
    }

    #[test]
    fn missing_width_names_field() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), "[p]\nresize = true\nheight = 10\n");

        let err = resizer.resize_image(&source, None).unwrap_err();
        assert!(err.to_string().contains("width"), "{err}");
        assert!(resizer.backend().get_operations().is_empty());
    }

    #[test]
    fn no_templates_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = mock_resizer(tmp.path(), "");
        assert!(matches!(
            resizer.resize_image(&source, None),
            Err(ResizeError::Config(ConfigError::NoTemplates))
        ));
    }

    // =========================================================================
    // Format inheritance
    // =========================================================================

    #[test]
    fn unset_format_inherits_source_extension() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "Holiday Snap.JPEG");
        let resizer = mock_resizer(tmp.path(), "[p]\nresize = true\nwidth = 10\nheight = 10\n");

        let path = resizer.resize_image(&source, None).unwrap().unwrap();
        assert!(file_name(&path).ends_with("_holiday-snap.jpg"));
        assert_eq!(
            resizer.backend().get_operations().last(),
            Some(&RecordedOp::Encode(OutputFormat::Jpg))
        );
    }

    #[test]
    fn unset_format_with_unknown_extension_fails_before_decode() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "drawing.svg");
        let resizer = mock_resizer(tmp.path(), "[p]\n");

        let err = resizer.resize_image(&source, None).unwrap_err();
        assert!(err.to_string().contains("svg"), "{err}");
        assert!(resizer.backend().get_operations().is_empty());
    }

    // =========================================================================
    // Backend failures
    // =========================================================================

    fn failing_resizer(root: &Path, backend: MockBackend) -> ImageResizer<MockBackend> {
        let config = ResizerConfig {
            root: root.join("out"),
            templates: templates(WEBP_THUMB),
            ..ResizerConfig::default()
        };
        ImageResizer::new(config, backend, Box::new(MemoryStore::new()))
    }

    #[test]
    fn undecodable_source_is_error_when_strict() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "logo.png");
        let resizer = failing_resizer(
            tmp.path(),
            MockBackend::failing_decode(BackendError::NotDecodable("svg".into())),
        );

        match resizer.resize_image(&source, None) {
            Err(ResizeError::Transform(e)) => assert_eq!(e.operation, Operation::Decode),
            other => panic!("expected decode failure, got {other:?}"),
        }
    }

    #[test]
    fn undecodable_source_is_ignored_by_or_ignore() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "logo.png");
        let resizer = failing_resizer(
            tmp.path(),
            MockBackend::failing_decode(BackendError::NotDecodable("svg".into())),
        );

        assert_eq!(resizer.resize_image_or_ignore(&source, None).unwrap(), None);
        assert!(!tmp.path().join("out/cache/images").exists());
    }

    #[test]
    fn or_ignore_still_reports_other_failures() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let resizer = failing_resizer(
            tmp.path(),
            MockBackend::failing_encode(BackendError::ProcessingFailed("boom".into())),
        );

        let err = resizer.resize_image_or_ignore(&source, None).unwrap_err();
        assert!(matches!(err, ResizeError::Transform(ref e) if e.operation == Operation::Encode));
    }

    // =========================================================================
    // Public-path helper and batch
    // =========================================================================

    #[test]
    fn resize_public_resolves_against_public_dir() {
        let tmp = TempDir::new().unwrap();
        let public = tmp.path().join("public");
        write_source(&public.join("img"), "hero.png");
        let config = ResizerConfig {
            root: tmp.path().join("out"),
            public_dir: public,
            templates: templates(WEBP_THUMB),
            ..ResizerConfig::default()
        };
        let resizer = ImageResizer::new(config, MockBackend::new(), Box::new(MemoryStore::new()));

        let path = resizer
            .resize_public(Path::new("img/hero.png"), None)
            .unwrap()
            .unwrap();
        assert!(file_name(&path).ends_with("_hero.webp"));
    }

    #[test]
    fn public_url_prefixes_returned_path() {
        let tmp = TempDir::new().unwrap();
        let source = write_source(tmp.path(), "photo.png");
        let config = ResizerConfig {
            root: tmp.path().join("out"),
            public_url: "/storage".to_string(),
            templates: templates(WEBP_THUMB),
            ..ResizerConfig::default()
        };
        let resizer = ImageResizer::new(config, MockBackend::new(), Box::new(MemoryStore::new()));

        let path = resizer.resize_image(&source, None).unwrap().unwrap();
        let url = resizer.public_url(&path);
        assert!(url.starts_with("/storage/cache/images/"), "{url}");
        assert!(url.ends_with("_photo.webp"), "{url}");
    }

    #[test]
    fn batch_keeps_order_and_reports_each_source() {
        let tmp = TempDir::new().unwrap();
        let a = write_source(tmp.path(), "a.png");
        let b = tmp.path().join("missing.png");
        let c = write_source(tmp.path(), "c.gif");
        let resizer = mock_resizer(tmp.path(), "[p]\nformat = \"png\"\n");

        let results = resizer.resize_batch(&[a.clone(), b.clone(), c.clone()], None, false);

        let sources: Vec<&Path> = results.iter().map(|r| r.source.as_path()).collect();
        assert_eq!(sources, vec![a.as_path(), b.as_path(), c.as_path()]);
        assert!(matches!(results[0].result, Ok(Some(_))));
        assert!(matches!(results[1].result, Ok(None)));
        assert!(matches!(results[2].result, Ok(Some(_))));
        assert_eq!(resizer.backend().encode_count(), 2);
    }
}
