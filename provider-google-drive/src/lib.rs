//! # Google Drive Provider
//!
//! Google Drive API v3 connector for the storage destination.
//!
//! ## Overview
//!
//! This module provides:
//! - Find-or-create folder resolution for the root/year/album hierarchy
//! - Resumable chunked photo uploads with progress reporting
//! - Rate limiting and exponential backoff
//! - OAuth 2.0 authentication via the `HttpClient` bridge

pub mod connector;
pub mod error;
pub mod types;

pub use connector::DriveConnector;
pub use error::{DriveError, Result};
pub use types::{DriveAssetRef, DriveFile, FolderHandle};
