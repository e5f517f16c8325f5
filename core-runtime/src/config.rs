//! # Application Configuration
//!
//! Configuration management for the photo sync runtime.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an [`AppConfig`]
//! instance that holds all dependencies and settings for a sync run. It enforces
//! fail-fast validation so missing bridges or malformed settings surface before
//! any network call is made.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - All Google Drive and Contentful API traffic
//! - `SecureStore` - OAuth token persistence between runs
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AppConfig;
//! use std::sync::Arc;
//!
//! let config = AppConfig::builder()
//!     .photo_root("/home/me/Pictures")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .drive(DriveSettings::new("client-id", "client-secret"))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SecureStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Default name of the top-level Drive folder that holds every synced album.
pub const DEFAULT_DRIVE_ROOT_FOLDER: &str = "managed_photos";

/// Default upload chunk size in bytes. Google requires a multiple of 256 KiB.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 8 * 1024 * 1024;

/// Settings for the Google Drive destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveSettings {
    /// OAuth client id from the Google Cloud console
    pub client_id: String,

    /// OAuth client secret paired with `client_id`
    pub client_secret: String,

    /// Name of the root folder in Drive under which year folders are created
    pub root_folder_name: String,

    /// Resumable upload chunk size in bytes (must be a multiple of 256 KiB)
    pub chunk_size_bytes: usize,
}

impl DriveSettings {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            root_folder_name: DEFAULT_DRIVE_ROOT_FOLDER.to_string(),
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
        }
    }

    /// Sets the root folder name in Drive
    pub fn with_root_folder_name(mut self, name: impl Into<String>) -> Self {
        self.root_folder_name = name.into();
        self
    }

    /// Sets the resumable upload chunk size
    pub fn with_chunk_size_bytes(mut self, bytes: usize) -> Self {
        self.chunk_size_bytes = bytes;
        self
    }

    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Config(
                "Drive OAuth client id cannot be empty".to_string(),
            ));
        }
        if self.client_secret.is_empty() {
            return Err(Error::Config(
                "Drive OAuth client secret cannot be empty".to_string(),
            ));
        }
        if self.root_folder_name.is_empty() {
            return Err(Error::Config(
                "Drive root folder name cannot be empty".to_string(),
            ));
        }
        if self.chunk_size_bytes == 0 || self.chunk_size_bytes % (256 * 1024) != 0 {
            return Err(Error::Config(
                "Drive chunk size must be a non-zero multiple of 256 KiB".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the Contentful destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentfulSettings {
    /// Contentful space id
    pub space_id: String,

    /// Environment within the space
    pub environment: String,

    /// Locale used for all localized asset and entry fields
    pub locale: String,

    /// Content type id of the photo collection entries
    pub collection_content_type: String,

    /// Content Management API token
    pub management_token: String,
}

impl ContentfulSettings {
    pub fn new(space_id: impl Into<String>, management_token: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            environment: "master".to_string(),
            locale: "en-US".to_string(),
            collection_content_type: "photoCollection".to_string(),
            management_token: management_token.into(),
        }
    }

    /// Sets the environment id
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Sets the locale for localized fields
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Sets the collection content type id
    pub fn with_collection_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.collection_content_type = content_type.into();
        self
    }

    /// Validates the settings
    pub fn validate(&self) -> Result<()> {
        if self.space_id.is_empty() {
            return Err(Error::Config(
                "Contentful space id cannot be empty".to_string(),
            ));
        }
        if self.management_token.is_empty() {
            return Err(Error::Config(
                "Contentful management token cannot be empty".to_string(),
            ));
        }
        if self.environment.is_empty() {
            return Err(Error::Config(
                "Contentful environment cannot be empty".to_string(),
            ));
        }
        if self.locale.is_empty() {
            return Err(Error::Config("Contentful locale cannot be empty".to_string()));
        }
        if self.collection_content_type.is_empty() {
            return Err(Error::Config(
                "Contentful collection content type cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application configuration for the photo sync runtime.
///
/// This struct holds all dependencies and settings required to run a sync.
/// Use [`AppConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct AppConfig {
    /// Root of the local photo library, organized as `<root>/<year>/<album>`
    pub photo_root: PathBuf,

    /// HTTP client for all API requests (required)
    pub http_client: Arc<dyn HttpClient>,

    /// Secure credential storage for OAuth tokens (required)
    pub secure_store: Arc<dyn SecureStore>,

    /// Google Drive destination settings, absent when the storage
    /// destination is not configured
    pub drive: Option<DriveSettings>,

    /// Contentful destination settings, absent when the content
    /// destination is not configured
    pub contentful: Option<ContentfulSettings>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("photo_root", &self.photo_root)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("drive", &self.drive.as_ref().map(|d| &d.root_folder_name))
            .field("contentful", &self.contentful.as_ref().map(|c| &c.space_id))
            .finish()
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Photo root path is not empty
    /// - At least one destination is configured
    /// - Each configured destination's own settings are valid
    pub fn validate(&self) -> Result<()> {
        if self.photo_root.as_os_str().is_empty() {
            return Err(Error::Config("Photo root path cannot be empty".to_string()));
        }

        if self.drive.is_none() && self.contentful.is_none() {
            return Err(Error::Config(
                "At least one destination (Drive or Contentful) must be configured".to_string(),
            ));
        }

        if let Some(drive) = &self.drive {
            drive.validate()?;
        }

        if let Some(contentful) = &self.contentful {
            contentful.validate()?;
        }

        Ok(())
    }
}

/// Builder for constructing [`AppConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](AppConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct AppConfigBuilder {
    photo_root: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    drive: Option<DriveSettings>,
    contentful: Option<ContentfulSettings>,
}

impl AppConfigBuilder {
    /// Sets the local photo library root.
    pub fn photo_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.photo_root = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Configures the Google Drive destination.
    pub fn drive(mut self, settings: DriveSettings) -> Self {
        self.drive = Some(settings);
        self
    }

    /// Configures the Contentful destination.
    pub fn contentful(mut self, settings: ContentfulSettings) -> Self {
        self.contentful = Some(settings);
        self
    }

    /// Builds and validates the final configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when a required bridge was not
    /// injected, and [`Error::Config`] when settings fail validation.
    pub fn build(self) -> Result<AppConfig> {
        let photo_root = self
            .photo_root
            .ok_or_else(|| Error::Config("Photo root path is required".to_string()))?;

        let http_client = self.http_client.ok_or_else(|| Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: "HttpClient implementation is required for API requests. \
                      Inject bridge_desktop::ReqwestHttpClient or a custom client."
                .to_string(),
        })?;

        let secure_store = self.secure_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "SecureStore".to_string(),
            message: "SecureStore implementation is required for credential persistence. \
                      Inject bridge_desktop::FileSecureStore or a custom store."
                .to_string(),
        })?;

        let config = AppConfig {
            photo_root,
            http_client,
            secure_store,
            drive: self.drive,
            contentful: self.contentful,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{HttpRequest, HttpResponse};

    struct NullHttpClient;

    #[async_trait]
    impl HttpClient for NullHttpClient {
        async fn execute(&self, _request: HttpRequest) -> bridge_traits::Result<HttpResponse> {
            Err(bridge_traits::BridgeError::NotAvailable(
                "null client".to_string(),
            ))
        }
    }

    struct NullSecureStore;

    #[async_trait]
    impl SecureStore for NullSecureStore {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> bridge_traits::Result<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> bridge_traits::Result<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> bridge_traits::Result<()> {
            Ok(())
        }
    }

    fn base_builder() -> AppConfigBuilder {
        AppConfig::builder()
            .photo_root("/photos")
            .http_client(Arc::new(NullHttpClient))
            .secure_store(Arc::new(NullSecureStore))
    }

    #[test]
    fn build_fails_without_http_client() {
        let result = AppConfig::builder()
            .photo_root("/photos")
            .secure_store(Arc::new(NullSecureStore))
            .drive(DriveSettings::new("id", "secret"))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "HttpClient"
        ));
    }

    #[test]
    fn build_fails_without_any_destination() {
        let result = base_builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn build_succeeds_with_drive_only() {
        let config = base_builder()
            .drive(DriveSettings::new("id", "secret"))
            .build()
            .unwrap();

        assert!(config.drive.is_some());
        assert!(config.contentful.is_none());
    }

    #[test]
    fn drive_settings_reject_unaligned_chunk_size() {
        let settings = DriveSettings::new("id", "secret").with_chunk_size_bytes(1000);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn contentful_settings_defaults() {
        let settings = ContentfulSettings::new("space", "token");
        assert_eq!(settings.environment, "master");
        assert_eq!(settings.locale, "en-US");
        assert_eq!(settings.collection_content_type, "photoCollection");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn contentful_settings_reject_empty_token() {
        let settings = ContentfulSettings::new("space", "");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn debug_output_hides_bridge_internals() {
        let config = base_builder()
            .drive(DriveSettings::new("id", "secret"))
            .build()
            .unwrap();

        let debug = format!("{:?}", config);
        assert!(debug.contains("HttpClient { ... }"));
        assert!(!debug.contains("secret"));
    }
}
