use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Album directory not found: {path}")]
    AlbumNotFound { path: PathBuf },

    #[error("Authentication failed for {destination}: {reason}")]
    Authentication { destination: String, reason: String },

    #[error("Folder resolution failed for {destination}: {reason}")]
    FolderResolution { destination: String, reason: String },

    #[error("Upload of {file} to {destination} failed: {reason}")]
    Upload {
        file: String,
        destination: String,
        reason: String,
    },

    #[error("Metadata extraction failed for {file}: {reason}")]
    MetadataExtraction { file: String, reason: String },

    #[error("Collection creation failed: {0}")]
    CollectionCreation(String),

    #[error("Publishing asset {asset} failed: {reason}")]
    AssetPublish { asset: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
