//! URL helpers for artifact naming and renaming.

use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;
use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use url::Url;

/// Characters escaped when a bare name becomes a URL path.
const NAME_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Decoded display name of an artifact: the last path segment of its
/// URL, or the whole path when there are no segments.
#[must_use]
pub fn display_name(url: &Url) -> String {
    let path = url.path();
    let segment = match path.rsplit('/').next() {
        Some(last) if !last.is_empty() => last,
        _ => path,
    };
    percent_decode_str(segment)
        .decode_utf8()
        .map_or_else(|_| segment.to_owned(), |decoded| decoded.into_owned())
}

/// Compute the URL an artifact gets when renamed to `new_name`.
///
/// The new name replaces the last path segment, keeping the parent
/// scope. URLs without path segments (cannot-be-a-base schemes) get
/// the escaped bare name as their path.
#[must_use]
pub fn rename_url(url: &Url, new_name: &str) -> Url {
    let mut renamed = url.clone();
    let replaced = {
        if let Ok(mut segments) = renamed.path_segments_mut() {
            segments.pop();
            segments.push(new_name);
            true
        } else {
            false
        }
    };
    if !replaced {
        let escaped = utf8_percent_encode(new_name, NAME_ESCAPE).to_string();
        renamed.set_path(&escaped);
    }
    renamed
}
