//! EXIF Capture Date Extraction
//!
//! Reads the capture timestamp out of a photo's EXIF header using the
//! `kamadak-exif` crate. The `DateTimeOriginal` tag is preferred; cameras
//! that only write `DateTime` are still accepted.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::CaptureDateExtractor;
//! use std::path::Path;
//!
//! let extractor = CaptureDateExtractor::new();
//! let captured = extractor.extract_capture_date(Path::new("IMG_0001.jpg"))?;
//! println!("Captured at {}", captured);
//! ```

use crate::error::{MetadataError, Result};
use chrono::NaiveDateTime;
use exif::{In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// EXIF timestamps are recorded as "YYYY:MM:DD HH:MM:SS".
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Extracts capture timestamps from photo files.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureDateExtractor;

impl CaptureDateExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Read the capture date from a photo's EXIF header.
    ///
    /// Prefers `DateTimeOriginal` and falls back to `DateTime`.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::ExtractionFailed`] if the file has no parseable
    ///   EXIF segment
    /// - [`MetadataError::NoCaptureDate`] if neither timestamp tag exists
    /// - [`MetadataError::InvalidDateFormat`] if the recorded value does
    ///   not follow the EXIF datetime format
    pub fn extract_capture_date(&self, path: &Path) -> Result<NaiveDateTime> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let exif = exif::Reader::new()
            .read_from_container(&mut reader)
            .map_err(|e| MetadataError::ExtractionFailed(e.to_string()))?;

        let field = exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .or_else(|| exif.get_field(Tag::DateTime, In::PRIMARY))
            .ok_or_else(|| MetadataError::NoCaptureDate {
                path: path.to_path_buf(),
            })?;

        // Read the raw ASCII bytes; display_value() prettifies timestamps
        // into a form the EXIF datetime pattern no longer matches.
        let raw = match field.value {
            Value::Ascii(ref lines) if !lines.is_empty() => {
                String::from_utf8_lossy(&lines[0]).into_owned()
            }
            _ => {
                return Err(MetadataError::InvalidDateFormat {
                    value: field.display_value().to_string(),
                })
            }
        };
        let captured = parse_exif_datetime(&raw)?;

        debug!(path = %path.display(), captured = %captured, "Extracted capture date");
        Ok(captured)
    }
}

/// Parse an EXIF "YYYY:MM:DD HH:MM:SS" timestamp.
fn parse_exif_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), EXIF_DATETIME_FORMAT).map_err(|_| {
        MetadataError::InvalidDateFormat {
            value: value.to_string(),
        }
    })
}
