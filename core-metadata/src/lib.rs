//! # Photo Metadata Module
//!
//! EXIF metadata extraction for photo files.
//!
//! ## Overview
//!
//! - Reads the capture timestamp from JPEG EXIF headers
//! - Falls back from `DateTimeOriginal` to `DateTime` when the camera
//!   did not record an original timestamp
//! - Handles files without EXIF data gracefully with typed errors

pub mod capture;
pub mod error;

pub use capture::CaptureDateExtractor;
pub use error::{MetadataError, Result};
