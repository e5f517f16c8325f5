use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Failed to read EXIF data: {0}")]
    ExtractionFailed(String),

    #[error("No capture date recorded in {path}")]
    NoCaptureDate { path: PathBuf },

    #[error("Invalid EXIF date format: {value}")]
    InvalidDateFormat { value: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
