//! Staged image files
//!
//! A submission's decoded image is written to the staging directory before
//! the recognition upload and removed as soon as the provider has taken it.
//! The file is owned by exactly one submission (unique name) and the removal
//! is tied to `Drop`, so early returns, recognition failures, and cancelled
//! request tasks all clean up the same way.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Staging directory handle, shared via application state
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write image bytes to a uniquely named staged file
    pub async fn stage(&self, bytes: &[u8], extension: &str) -> std::io::Result<StagedImage> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "image staged");
        Ok(StagedImage { path, file_name })
    }
}

/// A staged image file, removed on drop
#[derive(Debug)]
pub struct StagedImage {
    path: PathBuf,
    file_name: String,
}

impl StagedImage {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

impl Drop for StagedImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            // Nothing actionable for the submitter; the staging dir is
            // scratch space and stale files are harmless.
            tracing::debug!(path = %self.path.display(), error = %e, "staged image cleanup failed");
        } else {
            tracing::debug!(path = %self.path.display(), "staged image removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stage_writes_unique_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let area = StagingArea::new(temp.path().join("staging")).unwrap();

        let a = area.stage(b"first", "png").await.unwrap();
        let b = area.stage(b"second", "png").await.unwrap();

        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"first");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"second");
        assert!(a.file_name().ends_with(".png"));
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let area = StagingArea::new(temp.path().join("staging")).unwrap();

        let staged = area.stage(b"bytes", "jpg").await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("a").join("b");
        let area = StagingArea::new(dir.clone()).unwrap();
        assert!(area.dir().is_dir());
        assert_eq!(area.dir(), dir);
    }
}
