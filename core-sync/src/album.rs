//! Local Album Scanning
//!
//! Enumerates the JPEG photos of one `<root>/<year>/<album>` directory.
//! The scan is non-recursive and the result is sorted by file name so a
//! run always processes photos in a stable order.

use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One photo inside a local album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// A scanned local album.
#[derive(Debug, Clone)]
pub struct LocalAlbum {
    pub year: String,
    pub name: String,
    pub dir: PathBuf,
    pub photos: Vec<PhotoFile>,
}

impl LocalAlbum {
    /// Scan `<root>/<year>/<album>` for JPEG photos.
    ///
    /// Only direct children with a `.jpg` extension (case-insensitive)
    /// are included. Subdirectories and other file types are ignored.
    pub async fn scan(root: &Path, year: &str, album: &str) -> Result<Self> {
        let dir = root.join(year).join(album);

        if !dir.is_dir() {
            return Err(SyncError::AlbumNotFound { path: dir });
        }

        let mut photos = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if !is_jpeg(&path) {
                debug!(path = %path.display(), "Skipping non-JPEG entry");
                continue;
            }

            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            photos.push(PhotoFile { path, file_name });
        }

        photos.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        info!(
            album = album,
            year = year,
            photo_count = photos.len(),
            "Scanned local album"
        );

        Ok(Self {
            year: year.to_string(),
            name: album.to_string(),
            dir,
            photos,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("jpg"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn make_album(root: &Path, year: &str, album: &str, files: &[&str]) {
        let dir = root.join(year).join(album);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), b"data").unwrap();
        }
    }

    #[tokio::test]
    async fn test_scan_filters_and_sorts_jpegs() {
        let tmp = tempfile::tempdir().unwrap();
        make_album(
            tmp.path(),
            "2023",
            "rome",
            &["b.jpg", "a.JPG", "notes.txt", "c.png"],
        );

        let album = LocalAlbum::scan(tmp.path(), "2023", "rome").await.unwrap();

        let names: Vec<&str> = album.photos.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.JPG", "b.jpg"]);
    }

    #[tokio::test]
    async fn test_scan_ignores_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        make_album(tmp.path(), "2023", "rome", &["a.jpg"]);
        fs::create_dir_all(tmp.path().join("2023/rome/nested.jpg")).unwrap();

        let album = LocalAlbum::scan(tmp.path(), "2023", "rome").await.unwrap();
        assert_eq!(album.photos.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_missing_album_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let result = LocalAlbum::scan(tmp.path(), "2023", "missing").await;
        assert!(matches!(result, Err(SyncError::AlbumNotFound { .. })));
    }

    #[tokio::test]
    async fn test_scan_empty_album() {
        let tmp = tempfile::tempdir().unwrap();
        make_album(tmp.path(), "2023", "empty", &[]);

        let album = LocalAlbum::scan(tmp.path(), "2023", "empty").await.unwrap();
        assert!(album.is_empty());
    }
}
