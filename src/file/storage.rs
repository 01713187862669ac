//! Content store for uploaded blobs.
//!
//! Blobs live flat in the upload directory under a collision-resistant name:
//! ```text
//! {upload_path}/
//! ├── report_0f8c2d4e-3b1a-4c7e-9d2f-1a2b3c4d5e6f.pdf
//! ├── photo_7a9b8c6d-5e4f-4a3b-8c2d-1e0f9a8b7c6d.png
//! └── ...
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use crate::{FilebayError, Result};

/// Filesystem-backed blob store rooted at the upload directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `base_path`.
    ///
    /// The directory is not touched until [`FileStorage::ensure_dir`] runs.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the upload directory if it does not exist.
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            FilebayError::Directory(format!(
                "cannot create upload directory {}: {e}",
                self.base_path.display()
            ))
        })
    }

    /// Build the stored name `{base}_{uuid}{ext}` for an original filename.
    pub fn stored_name(original_name: &str) -> String {
        let (base, ext) = split_extension(original_name);
        format!("{base}_{}{ext}", Uuid::new_v4())
    }

    /// Full path for a stored name.
    pub fn path_for(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    /// Stream `reader` into a new file at `path`, copying at most `limit` bytes.
    ///
    /// Fails if the file already exists. Returns the number of bytes written.
    pub async fn write_stream<R>(&self, path: &Path, reader: R, limit: u64) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let mut limited = reader.take(limit);
        let written = tokio::io::copy(&mut limited, &mut file).await?;
        file.flush().await?;

        Ok(written)
    }

    /// Read a whole blob.
    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();

        match fs::read(path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FilebayError::NotFound(format!(
                "blob {}",
                path.display()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a blob.
    ///
    /// Returns `true` if the file was removed, `false` if it was already absent.
    pub async fn remove(&self, path: impl AsRef<Path>) -> Result<bool> {
        match fs::remove_file(path.as_ref()).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a blob exists.
    pub async fn exists(&self, path: impl AsRef<Path>) -> bool {
        fs::try_exists(path.as_ref()).await.unwrap_or(false)
    }
}

/// Strip any directory part a client put into a filename.
pub fn client_file_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or("").trim()
}

/// Split a filename into base name and extension (extension keeps its dot).
///
/// The extension is everything from the last `.`; a name without a dot has
/// an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    }
}
