//! Library backend that writes PNG files into a directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::ImageFormat;
use tracing::{debug, info};

use super::PhotoLibrary;
use crate::error::LibraryError;
use crate::types::Photo;

/// Stores each photo as `<timestamp>-<uuid>.png` under a root directory
///
/// The identifier returned for a stored photo is its file stem. The root
/// directory is created on first use. Encoding runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `id`
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.png", id))
    }

    fn new_identifier() -> String {
        format!(
            "{}-{}",
            chrono::Utc::now().format("%Y%m%dT%H%M%S"),
            uuid::Uuid::new_v4()
        )
    }
}

#[async_trait]
impl PhotoLibrary for DirectoryLibrary {
    async fn store_image(&self, photo: &Photo) -> Result<Option<String>, LibraryError> {
        // Nothing to encode, so no asset is created
        if photo.size().is_empty() {
            debug!("Refusing to store empty image");
            return Ok(None);
        }

        let photo = photo.clone();
        let root = self.root.clone();
        let id = Self::new_identifier();
        let path = self.path_for(&id);

        tokio::task::spawn_blocking(move || -> Result<(), LibraryError> {
            std::fs::create_dir_all(&root)?;
            photo.pixels().save_with_format(&path, ImageFormat::Png)?;
            Ok(())
        })
        .await
        .map_err(|e| LibraryError::Unavailable(format!("storage task failed: {}", e)))??;

        info!(id = %id, root = %self.root.display(), "Stored image");
        Ok(Some(id))
    }

    fn name(&self) -> &str {
        "directory"
    }
}
