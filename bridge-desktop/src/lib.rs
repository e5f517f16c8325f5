//! # Desktop Bridge Implementations
//!
//! Concrete implementations of the `bridge-traits` abstractions for
//! desktop platforms (Windows, macOS, Linux):
//!
//! - [`ReqwestHttpClient`] - HTTP via reqwest with retry/backoff
//! - [`FileSecureStore`] - credential storage in a JSON file under the
//!   application data directory

pub mod http;
pub mod secure_store;

pub use http::ReqwestHttpClient;
pub use secure_store::FileSecureStore;
