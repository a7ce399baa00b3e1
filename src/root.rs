//! Project root discovery through marker files.
//!
//! A marker is a glob matched against directory entry names. A trailing `/`
//! restricts the marker to directories (`.git/`), otherwise only files match
//! (`Cargo.toml`, `*.cabal`).

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

struct Marker {
    matcher: GlobMatcher,
    dir_only: bool,
}

fn compile_markers(markers: &[String]) -> Vec<Marker> {
    markers
        .iter()
        .filter_map(|marker| {
            let (pattern, dir_only) = match marker.strip_suffix('/') {
                Some(stripped) => (stripped.trim_end_matches('/'), true),
                None => (marker.as_str(), false),
            };
            match Glob::new(pattern) {
                Ok(glob) => Some(Marker {
                    matcher: glob.compile_matcher(),
                    dir_only,
                }),
                Err(e) => {
                    log::warn!("Ignoring invalid root marker {marker:?}: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Walk from the directory containing `file` up to the filesystem root and
/// return the first directory holding an entry that matches any marker.
pub fn find_root(file: &Path, markers: &[String]) -> Option<PathBuf> {
    if markers.is_empty() {
        return None;
    }
    let markers = compile_markers(markers);
    if markers.is_empty() {
        return None;
    }

    let mut dir = file.parent();
    while let Some(current) = dir {
        if dir_matches(current, &markers) {
            return Some(current.to_path_buf());
        }
        dir = current.parent();
    }
    None
}

fn dir_matches(dir: &Path, markers: &[Marker]) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
        let name = entry.file_name();
        if markers
            .iter()
            .any(|m| m.dir_only == is_dir && m.matcher.is_match(Path::new(&name)))
        {
            return true;
        }
    }
    false
}

/// Effective working directory for a tool: its own markers, then the global
/// markers, then the session root.
pub fn resolve_root(file: &Path, tool_markers: &[String], global_markers: &[String], session_root: &Path) -> PathBuf {
    find_root(file, tool_markers)
        .or_else(|| find_root(file, global_markers))
        .unwrap_or_else(|| session_root.to_path_buf())
}
