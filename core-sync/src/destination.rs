//! Sync Destinations
//!
//! The `Destination` trait unifies the two upload targets behind one
//! resolve/upload/finalize lifecycle so the orchestrator can treat them
//! uniformly and isolate their failures.

use crate::album::PhotoFile;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use core_metadata::CaptureDateExtractor;
use provider_contentful::types::AssetResource;
use provider_contentful::{AssetRef, ContentfulConnector};
use provider_google_drive::types::FolderHandle;
use provider_google_drive::DriveConnector;
use tracing::{info, warn};

/// Receives per-file upload progress.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, file_name: &str, percent: u8);
}

/// A progress observer that discards all events.
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_progress(&self, _file_name: &str, _percent: u8) {}
}

/// Result of a destination's finalize step.
///
/// Publish failures after the collection entry exists roll nothing back;
/// they are carried here so the orchestrator can record them per asset.
#[derive(Debug, Default)]
pub struct FinalizeOutcome {
    /// Identifier of a composed artifact, when the destination creates
    /// one (the collection entry id)
    pub collection_id: Option<String>,
    /// Per-asset [`SyncError::AssetPublish`] failures
    pub publish_failures: Vec<SyncError>,
}

/// One upload target in a sync run.
///
/// Lifecycle: `resolve` once, `upload` per photo, `finalize` once. A
/// failed `resolve` deactivates the destination; `upload` errors are
/// per-file unless typed as [`SyncError::MetadataExtraction`], which
/// deactivates the content destination because composition requires a
/// capture date.
#[async_trait]
pub trait Destination: Send {
    /// Short human-readable destination name for logs and reports.
    fn name(&self) -> &'static str;

    /// Prepare the destination for uploads.
    async fn resolve(&mut self) -> Result<()>;

    /// Upload one photo.
    async fn upload(&mut self, photo: &PhotoFile, progress: &dyn ProgressObserver) -> Result<()>;

    /// Complete the run.
    async fn finalize(&mut self) -> Result<FinalizeOutcome>;
}

/// Google Drive destination: mirrors the album into the
/// root/year/album folder hierarchy.
pub struct DriveDestination {
    connector: DriveConnector,
    root_folder_name: String,
    year: String,
    album: String,
    folder: Option<FolderHandle>,
}

impl DriveDestination {
    pub fn new(
        connector: DriveConnector,
        root_folder_name: impl Into<String>,
        year: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            root_folder_name: root_folder_name.into(),
            year: year.into(),
            album: album.into(),
            folder: None,
        }
    }
}

#[async_trait]
impl Destination for DriveDestination {
    fn name(&self) -> &'static str {
        "Google Drive"
    }

    async fn resolve(&mut self) -> Result<()> {
        let folder = self
            .connector
            .resolve_album_folders(&self.root_folder_name, &self.year, &self.album)
            .await
            .map_err(|e| SyncError::FolderResolution {
                destination: self.name().to_string(),
                reason: e.to_string(),
            })?;

        self.folder = Some(folder);
        Ok(())
    }

    async fn upload(&mut self, photo: &PhotoFile, progress: &dyn ProgressObserver) -> Result<()> {
        let folder = self.folder.as_ref().ok_or_else(|| SyncError::Upload {
            file: photo.file_name.clone(),
            destination: self.name().to_string(),
            reason: "destination not resolved".to_string(),
        })?;

        self.connector
            .upload_photo(&photo.path, &photo.file_name, &folder.id, &|percent| {
                progress.on_progress(&photo.file_name, percent)
            })
            .await
            .map_err(|e| SyncError::Upload {
                file: photo.file_name.clone(),
                destination: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(())
    }

    async fn finalize(&mut self) -> Result<FinalizeOutcome> {
        Ok(FinalizeOutcome::default())
    }
}

/// Contentful destination: publishes photos as assets and composes a
/// photo collection entry.
pub struct ContentfulDestination {
    connector: ContentfulConnector,
    collection_title: String,
    extractor: CaptureDateExtractor,
    /// Collection date, taken from the first uploaded photo's EXIF data
    collection_date: Option<NaiveDateTime>,
    processed: Vec<AssetResource>,
    assets: Vec<AssetRef>,
}

impl ContentfulDestination {
    pub fn new(connector: ContentfulConnector, collection_title: impl Into<String>) -> Self {
        Self {
            connector,
            collection_title: collection_title.into(),
            extractor: CaptureDateExtractor::new(),
            collection_date: None,
            processed: Vec::new(),
            assets: Vec::new(),
        }
    }
}

#[async_trait]
impl Destination for ContentfulDestination {
    fn name(&self) -> &'static str {
        "Contentful"
    }

    async fn resolve(&mut self) -> Result<()> {
        self.connector
            .validate_token()
            .await
            .map_err(|e| SyncError::Authentication {
                destination: self.name().to_string(),
                reason: e.to_string(),
            })
    }

    async fn upload(&mut self, photo: &PhotoFile, progress: &dyn ProgressObserver) -> Result<()> {
        // The collection date comes from the first photo this
        // destination sees; a missing capture date fails the whole
        // content path because composition requires a date.
        if self.collection_date.is_none() {
            let captured = self
                .extractor
                .extract_capture_date(&photo.path)
                .map_err(|e| SyncError::MetadataExtraction {
                    file: photo.file_name.clone(),
                    reason: e.to_string(),
                })?;
            self.collection_date = Some(captured);
        }

        let asset = self
            .connector
            .prepare_photo(&photo.path, &photo.file_name)
            .await
            .map_err(|e| SyncError::Upload {
                file: photo.file_name.clone(),
                destination: self.name().to_string(),
                reason: e.to_string(),
            })?;

        progress.on_progress(&photo.file_name, 100);

        self.assets.push(AssetRef {
            id: asset.sys.id.clone(),
            file_name: photo.file_name.clone(),
        });
        self.processed.push(asset);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<FinalizeOutcome> {
        if self.assets.is_empty() {
            info!("No assets uploaded, skipping collection creation");
            return Ok(FinalizeOutcome::default());
        }

        let date = self.collection_date.ok_or_else(|| {
            SyncError::CollectionCreation("no capture date available".to_string())
        })?;

        let entry = self
            .connector
            .create_collection(&self.collection_title, date, &self.assets)
            .await
            .map_err(|e| SyncError::CollectionCreation(e.to_string()))?;

        // Publish failures after the entry exists roll nothing back,
        // but each one is surfaced in the run report
        let mut publish_failures = Vec::new();
        for (asset, asset_ref) in self.processed.iter().zip(&self.assets) {
            if let Err(e) = self.connector.publish_asset(asset).await {
                warn!(asset_id = %asset.sys.id, error = %e, "Asset publish failed");
                publish_failures.push(SyncError::AssetPublish {
                    asset: asset_ref.file_name.clone(),
                    reason: e.to_string(),
                });
            }
        }

        info!(entry_id = %entry.id, "Collection composed");
        Ok(FinalizeOutcome {
            collection_id: Some(entry.id),
            publish_failures,
        })
    }
}
