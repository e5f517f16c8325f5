//! # Bridge Traits
//!
//! Platform abstraction traits for the photo manager core.
//!
//! ## Overview
//!
//! Remote calls and credential persistence go through the traits defined
//! here, and the host wires in concrete implementations (see
//! `bridge-desktop`):
//!
//! - [`http::HttpClient`] - async HTTP with retry policies
//! - [`storage::SecureStore`] - credential persistence

pub mod error;
pub mod http;
pub mod storage;

pub use error::{BridgeError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::SecureStore;
