// src/watch/path_utils.rs

//! Path helpers shared by watch matching and change messages.

use std::path::Path;

/// `path` relative to `root`, with forward slashes.
///
/// Tries a plain `strip_prefix` first. If that fails (symlinks, or macOS
/// reporting `/private/var/...` for `/var/...`) both sides are canonicalized
/// and compared again. Returns `None` if `path` is not under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(rel.to_string_lossy().replace('\\', "/"));
    }

    let (root_canon, path_canon) = (root.canonicalize().ok()?, path.canonicalize().ok()?);
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
}

/// Short form of `path` for messages: relative to `root` when possible,
/// otherwise as given.
pub fn display_path(root: &Path, path: &Path) -> String {
    match relative_str(root, path) {
        Some(rel) if !rel.is_empty() => rel,
        _ => path.display().to_string(),
    }
}
