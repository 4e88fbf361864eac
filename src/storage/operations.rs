//! Storage operations
//!
//! Filesystem work behind RETR and NLST: resolving a requested file inside
//! the server root and writing a directory listing to a data stream.

use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::StorageError;

/// Writes the names in `path` to `dest`, one per `\r\n`-terminated line.
///
/// Entries are sorted by name and `.`/`..` are never emitted. Names are sent
/// as their raw bytes so a listed name can be fed straight back to RETR.
/// Returns the number of entries written.
pub async fn list_entries<W>(dest: &mut W, path: &Path) -> Result<usize, StorageError>
where
    W: AsyncWrite + Unpin,
{
    let mut reader = fs::read_dir(path).await?;
    let mut names: Vec<OsString> = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        names.push(entry.file_name());
    }
    names.sort();

    let mut listing = Vec::new();
    for name in &names {
        listing.extend_from_slice(&name_bytes(name));
        listing.extend_from_slice(b"\r\n");
    }

    dest.write_all(&listing).await?;
    dest.flush().await?;

    info!("Listed directory {} - {} entries", path.display(), names.len());
    Ok(names.len())
}

#[cfg(unix)]
fn name_bytes(name: &OsString) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;

    name.as_bytes().to_vec()
}

#[cfg(not(unix))]
fn name_bytes(name: &OsString) -> Vec<u8> {
    name.to_string_lossy().into_owned().into_bytes()
}

/// Resolves `filename` relative to `current` and checks it is a regular file
/// under `root`.
pub async fn prepare_file_retrieval(
    root: &Path,
    current: &Path,
    filename: impl AsRef<Path>,
) -> Result<(PathBuf, u64), StorageError> {
    let filename = filename.as_ref();
    let shown = || filename.display().to_string();
    let candidate = current.join(filename);

    let resolved = match fs::canonicalize(&candidate).await {
        Ok(p) => p,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::FileNotFound(shown()));
        }
        Err(e) => return Err(StorageError::from(e)),
    };

    if !resolved.starts_with(root) {
        return Err(StorageError::OutsideRoot(shown()));
    }

    let metadata = fs::metadata(&resolved).await?;
    if !metadata.is_file() {
        return Err(StorageError::NotAFile(shown()));
    }

    debug!(
        "Resolved {} to {} ({} bytes)",
        filename.display(),
        resolved.display(),
        metadata.len()
    );
    Ok((resolved, metadata.len()))
}
