//! Error types for the Google Drive provider

use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum DriveError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Resumable upload session did not return a session URI
    #[error("Upload session for '{file_name}' returned no session URI")]
    MissingSessionUri { file_name: String },

    /// Upload was interrupted mid-session
    #[error("Upload of '{file_name}' failed at byte {offset}: {message}")]
    UploadInterrupted {
        file_name: String,
        offset: u64,
        message: String,
    },

    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, DriveError>;
