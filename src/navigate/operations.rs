//! Navigation operations implementation

use crate::error::NavigateError;
use std::path::{Path, PathBuf};

/// Resolves `target` against the current directory for CWD.
///
/// Arguments starting with `./` or `..` are refused outright. Anything else is
/// joined onto `current`, canonicalised and must still lie under `root`.
/// Absolute arguments are therefore only accepted when they point inside
/// the root.
pub fn change_directory(
    root: &Path,
    current: &Path,
    target: impl AsRef<Path>,
) -> Result<PathBuf, NavigateError> {
    let target = target.as_ref();
    let shown = || target.display().to_string();

    let raw = target.as_os_str().as_encoded_bytes();
    if raw.starts_with(b"./") || raw.starts_with(b"..") {
        return Err(NavigateError::NoAccess(shown()));
    }

    let candidate = current.join(target);
    let resolved = candidate
        .canonicalize()
        .map_err(|_| NavigateError::DirectoryNotFound(shown()))?;

    if !resolved.starts_with(root) {
        return Err(NavigateError::NoAccess(shown()));
    }

    if !resolved.is_dir() {
        return Err(NavigateError::NotADirectory(shown()));
    }

    Ok(resolved)
}

/// Computes the CDUP destination. Refused when already at `root`.
pub fn parent_directory(root: &Path, current: &Path) -> Result<PathBuf, NavigateError> {
    if current == root {
        return Err(NavigateError::NoAccess(current.display().to_string()));
    }

    let parent = current
        .parent()
        .ok_or_else(|| NavigateError::DirectoryNotFound(current.display().to_string()))?;

    // A directory removed underneath the session can leave `current` dangling.
    if !parent.starts_with(root) {
        return Err(NavigateError::NoAccess(parent.display().to_string()));
    }
    if !parent.is_dir() {
        return Err(NavigateError::DirectoryNotFound(parent.display().to_string()));
    }

    Ok(parent.to_path_buf())
}
