//! Conversion between `file://` URLs and filesystem paths.
//!
//! Artifact identity is URL-based throughout the registry; filesystem
//! projects translate at this boundary, handling percent-encoding and
//! platform path differences.

use camino::Utf8Path;
use camino::Utf8PathBuf;
use url::Url;

/// Convert a `file://` URL to a UTF-8 path. Returns `None` for other
/// schemes or undecodable paths.
#[must_use]
pub fn url_to_path(url: &Url) -> Option<Utf8PathBuf> {
    if url.scheme() != "file" {
        return None;
    }

    let decoded = percent_encoding::percent_decode_str(url.path())
        .decode_utf8()
        .ok()?;

    #[cfg(windows)]
    let decoded = decoded.strip_prefix('/').unwrap_or(&decoded);

    Some(Utf8PathBuf::from(decoded.as_ref()))
}

/// Convert a path to a `file://` URL. Relative paths are resolved to
/// absolute ones first; unresolvable relative paths yield `None`.
#[must_use]
pub fn path_to_url(path: &Utf8Path) -> Option<Url> {
    if path.is_absolute() {
        return Url::from_file_path(path.as_std_path()).ok();
    }

    if let Ok(absolute) = path.as_std_path().canonicalize() {
        return Url::from_file_path(absolute).ok();
    }

    Url::from_file_path(path.as_std_path()).ok()
}
