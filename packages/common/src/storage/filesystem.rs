use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tracing::debug;

use super::error::StorageError;
use super::naming::{date_path, is_thumbnail, next_candidate};

/// Filesystem-backed store for editor uploads.
///
/// Files live under `{root}/{user?}/{YYYY}/{MM}/{DD}/{name}`. Names are
/// allocated with create-exclusive opens, so two concurrent uploads of the
/// same name always end up in different files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create a store, making sure the root directory exists.
    pub async fn new(root: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that receives uploads made on `date`, optionally per user.
    pub fn dated_dir(&self, user_dir: Option<&str>, date: NaiveDate) -> PathBuf {
        let base = match user_dir {
            Some(user) => self.root.join(user),
            None => self.root.clone(),
        };
        base.join(date_path(date))
    }

    /// Create a new, empty file named after `file_name` inside `dir`.
    ///
    /// On collision an underscore is appended to the stem and the open is
    /// retried, so `x.png` becomes `x_.png`, then `x__.png`. Names shaped
    /// like generated thumbnails start one step along (`x_thumb_.png`) so
    /// an upload never occupies a thumbnail slot. The loop ends with an I/O
    /// error once the name grows past the filesystem limit.
    pub async fn create_unique(
        &self,
        dir: &Path,
        file_name: &str,
    ) -> Result<(PathBuf, fs::File), StorageError> {
        if file_name.is_empty() || file_name.contains(['/', '\\', '\0']) {
            return Err(StorageError::InvalidName(file_name.to_string()));
        }

        fs::create_dir_all(dir).await?;

        let mut candidate = dir.join(file_name);
        if is_thumbnail(&candidate) {
            candidate = next_candidate(&candidate);
        }
        loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), "Upload name taken, retrying");
                    candidate = next_candidate(&candidate);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// List regular files under `dir`, skipping generated thumbnails.
    ///
    /// A missing directory yields an empty list. Paths are sorted so the
    /// picker shows a stable order.
    pub async fn list_images(
        &self,
        dir: &Path,
        recursive: bool,
    ) -> Result<Vec<PathBuf>, StorageError> {
        let mut found = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    if recursive {
                        pending.push(path);
                    }
                } else if file_type.is_file() && !is_thumbnail(&path) {
                    found.push(path);
                }
            }
        }

        found.sort();
        Ok(found)
    }

    /// Remove a file, ignoring the case where it is already gone.
    pub async fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
