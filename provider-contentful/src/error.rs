//! Error types for the Contentful provider

use thiserror::Error;

/// Contentful provider errors
#[derive(Error, Debug)]
pub enum ContentfulError {
    /// Management token is invalid or lacks access to the space
    #[error("Contentful token validation failed: {0}")]
    TokenInvalid(String),

    /// API request returned an error
    #[error("Contentful API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Asset processing did not finish within the polling window
    #[error("Asset {asset_id} was not processed in time")]
    ProcessingTimeout { asset_id: String },

    /// Collection creation was requested with no successful assets
    #[error("Cannot create a collection without any published assets")]
    EmptyCollection,

    /// Local file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge error
    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Contentful operations
pub type Result<T> = std::result::Result<T, ContentfulError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ContentfulError::ProcessingTimeout {
            asset_id: "asset1".to_string(),
        };
        assert_eq!(error.to_string(), "Asset asset1 was not processed in time");
    }
}
