//! Google Drive API response types
//!
//! Data structures for serializing requests to and deserializing
//! responses from the Google Drive API v3.

use serde::{Deserialize, Serialize};

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,

    /// File name
    pub name: String,

    /// MIME type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Parent folder IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    /// List of matching files
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    pub next_page_token: Option<String>,
}

/// Request body for folder and upload session creation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// A resolved Drive folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    pub id: String,
    pub name: String,
}

/// Reference to an uploaded photo in Drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveAssetRef {
    pub id: String,
    pub file_name: String,
}
