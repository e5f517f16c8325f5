//! # Contentful Provider
//!
//! Contentful Management API connector for the content destination.
//!
//! ## Overview
//!
//! This module provides:
//! - Binary uploads through the Contentful upload host
//! - Asset creation, processing, and publishing
//! - Photo collection entry creation with asset links
//! - Versioned writes with the `X-Contentful-Version` header

pub mod connector;
pub mod error;
pub mod types;

pub use connector::ContentfulConnector;
pub use error::{ContentfulError, Result};
pub use types::{AssetRef, CollectionEntry};
