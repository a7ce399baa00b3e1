//! Conversions between `file://` URIs and filesystem paths.
//!
//! Paths handed to external commands always use forward slashes. On
//! case-insensitive platforms URIs are compared case-insensitively.

use std::path::{Path, PathBuf};

use tower_lsp::lsp_types::Url;

/// Resolve the filesystem path behind a `file://` URI.
///
/// Returns `None` for any other scheme or an unparsable path.
pub fn to_file_path(uri: &Url) -> Option<PathBuf> {
    if uri.scheme() != "file" {
        return None;
    }
    uri.to_file_path().ok()
}

/// Build a `file://` URI for an absolute path.
pub fn from_file_path(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

/// Path rendered with forward slashes.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) { s.replace('\\', "/") } else { s.into_owned() }
}

/// Whether two URIs name the same document on this platform.
pub fn same_document(a: &Url, b: &Url) -> bool {
    if cfg!(windows) {
        a.as_str().eq_ignore_ascii_case(b.as_str())
    } else {
        a == b
    }
}

/// Canonical form used as the document store key.
pub fn normalize(uri: &Url) -> Url {
    if cfg!(windows) && uri.scheme() == "file" {
        Url::parse(&uri.as_str().to_lowercase()).unwrap_or_else(|_| uri.clone())
    } else {
        uri.clone()
    }
}
