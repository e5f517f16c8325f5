//! # Sync Module
//!
//! Orchestrates one sync run of a local photo album against the
//! configured destinations.
//!
//! ## Overview
//!
//! This module manages the lifecycle of a sync run, including:
//! - Scanning the local album directory for JPEG photos
//! - Resolving each destination (folder hierarchy, token validation)
//! - Uploading every photo to every active destination
//! - Composing the photo collection entry when the content destination
//!   finished with at least one asset
//!
//! ## Components
//!
//! - **Album Scanner** (`album`): Enumerates the local photos in stable order
//! - **Destinations** (`destination`): The `Destination` trait and its Drive
//!   and Contentful implementations
//! - **Orchestrator** (`orchestrator`): Drives the run and isolates failures

pub mod album;
pub mod destination;
pub mod error;
pub mod orchestrator;

pub use album::{LocalAlbum, PhotoFile};
pub use destination::{
    ContentfulDestination, Destination, DriveDestination, FinalizeOutcome, ProgressObserver,
};
pub use error::{Result, SyncError};
pub use orchestrator::{RunReport, SyncOrchestrator, SyncRunId, UploadOutcome};
