use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported sync destinations that hold credentials.
///
/// # Examples
///
/// ```
/// use core_auth::ProviderKind;
///
/// let provider = ProviderKind::GoogleDrive;
/// assert_eq!(provider.display_name(), "Google Drive");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Google Drive photo storage
    GoogleDrive,
    /// Contentful content management
    Contentful,
}

impl ProviderKind {
    /// Get the human-readable display name for this provider
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "Google Drive",
            ProviderKind::Contentful => "Contentful",
        }
    }

    /// Get the provider identifier string
    ///
    /// Used for logging and storage key purposes.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::GoogleDrive => "google_drive",
            ProviderKind::Contentful => "contentful",
        }
    }

    /// Parse a provider kind from a string identifier
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google_drive" | "googledrive" => Some(ProviderKind::GoogleDrive),
            "contentful" => Some(ProviderKind::Contentful),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// OAuth 2.0 token set.
///
/// Contains the access token, refresh token, and expiration time for an
/// authenticated session.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts sensitive information.
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens, absent when
    /// the provider did not grant offline access
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl OAuthTokens {
    /// Create a new token set
    ///
    /// # Arguments
    ///
    /// * `access_token` - The OAuth access token
    /// * `refresh_token` - The OAuth refresh token, if granted
    /// * `expires_in` - Number of seconds until token expiration
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(expires_in),
        }
    }

    /// Reconstruct a token set from stored parts
    pub fn from_parts(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Check if the access token is expired or will expire soon
    ///
    /// Uses a 300 second buffer so tokens are refreshed before they
    /// actually expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// Check if the access token is expired with a custom buffer
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        let now = chrono::Utc::now();
        let buffer = chrono::Duration::seconds(buffer_seconds);
        now >= self.expires_at - buffer
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
