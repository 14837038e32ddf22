//! Artifact file naming.
//!
//! Every artifact is named `{fingerprint}_{slug}.{ext}` where `slug` is the
//! source file stem reduced to lowercase ASCII words joined by dashes:
//!
//! - `photo.PNG` → `photo`
//! - `Été à Paris.jpg` → `ete-a-paris`
//! - `IMG_0042 (copy).jpeg` → `img-0042-copy`
//!
//! The fingerprint already identifies the exact (profile, source version)
//! pair; the slug only keeps the cache directory readable.

use crate::imaging::OutputFormat;
use std::path::{Component, Path, PathBuf};

/// Reduce arbitrary text to a URL-safe slug.
///
/// Unicode is transliterated to ASCII, everything that is not an ASCII
/// letter or digit becomes a separator, and runs of separators collapse into
/// a single dash. Leading and trailing dashes are dropped.
pub fn slugify(text: &str) -> String {
    let ascii = deunicode::deunicode(text);
    let mut slug = String::with_capacity(ascii.len());
    let mut pending_dash = false;

    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// File name of the artifact for a source, without any directory.
pub fn artifact_file_name(fingerprint: &str, source: &Path, format: OutputFormat) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{fingerprint}_{}.{}", slugify(&stem), format.extension())
}

/// Artifact path relative to the output root: `{cache_path}/{file name}`.
pub fn artifact_path(
    cache_path: &Path,
    fingerprint: &str,
    source: &Path,
    format: OutputFormat,
) -> PathBuf {
    cache_path.join(artifact_file_name(fingerprint, source, format))
}

/// URL of an artifact served under `prefix`.
///
/// `relative` is the root-relative artifact path; its components are joined
/// with `/` regardless of platform, and exactly one `/` separates it from the
/// prefix.
pub fn public_url(prefix: &str, relative: &Path) -> String {
    let path = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{path}", prefix.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_plain_word() {
        assert_eq!(slugify("photo"), "photo");
    }

    #[test]
    fn slug_lowercases() {
        assert_eq!(slugify("Sunset"), "sunset");
    }

    #[test]
    fn slug_transliterates_unicode() {
        assert_eq!(slugify("Été à Paris"), "ete-a-paris");
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slugify("IMG_0042 (copy)"), "img-0042-copy");
        assert_eq!(slugify("a -- b__c"), "a-b-c");
    }

    #[test]
    fn slug_trims_dashes() {
        assert_eq!(slugify("--edge--"), "edge");
        assert_eq!(slugify("___"), "");
    }

    #[test]
    fn artifact_name_uses_stem_and_format() {
        let name = artifact_file_name("abc123", Path::new("/srv/in/photo.PNG"), OutputFormat::Webp);
        assert_eq!(name, "abc123_photo.webp");
    }

    #[test]
    fn artifact_name_replaces_extension() {
        let name = artifact_file_name("f", Path::new("My Holiday.jpeg"), OutputFormat::Jpg);
        assert_eq!(name, "f_my-holiday.jpg");
    }

    #[test]
    fn artifact_name_keeps_inner_dots_as_separators() {
        let name = artifact_file_name("f", Path::new("archive.2024.tif"), OutputFormat::Png);
        assert_eq!(name, "f_archive-2024.png");
    }

    #[test]
    fn artifact_path_is_under_cache_path() {
        let path = artifact_path(
            Path::new("cache/images"),
            "f00d",
            Path::new("photo.png"),
            OutputFormat::Png,
        );
        assert_eq!(path, PathBuf::from("cache/images/f00d_photo.png"));
    }

    #[test]
    fn public_url_with_root_prefix() {
        assert_eq!(
            public_url("/", Path::new("cache/images/abc_photo.webp")),
            "/cache/images/abc_photo.webp"
        );
    }

    #[test]
    fn public_url_with_absolute_prefix() {
        assert_eq!(
            public_url("https://cdn.example.com/media/", Path::new("cache/images/abc_photo.webp")),
            "https://cdn.example.com/media/cache/images/abc_photo.webp"
        );
    }

    #[test]
    fn public_url_with_empty_prefix() {
        assert_eq!(public_url("", Path::new("cache/a.png")), "/cache/a.png");
    }
}
