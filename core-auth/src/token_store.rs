//! Secure Token Storage
//!
//! Persists OAuth tokens between runs through the `SecureStore` bridge.
//!
//! ## Security
//!
//! - Token values are never logged or exposed in error messages
//! - Corrupted entries are deleted on read so the next run falls back
//!   to a fresh interactive authorization

use crate::error::{AuthError, Result};
use crate::types::{OAuthTokens, ProviderKind};
use bridge_traits::storage::SecureStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure storage for OAuth tokens, keyed by provider.
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

/// Serializable wrapper for OAuth tokens.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self { secure_store }
    }

    /// Store OAuth tokens for a provider.
    ///
    /// Any previously stored tokens for the same provider are overwritten.
    pub async fn store_tokens(&self, provider: ProviderKind, tokens: &OAuthTokens) -> Result<()> {
        let key = self.storage_key(provider);

        let stored = StoredTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at,
        };

        let json = serde_json::to_vec(&stored).map_err(|e| {
            warn!(provider = %provider, error = %e, "Failed to serialize tokens");
            AuthError::SerializationFailed {
                context: "token serialization".to_string(),
                source: e.into(),
            }
        })?;

        self.secure_store
            .set_secret(&key, &json)
            .await
            .map_err(|e| {
                warn!(
                    provider = %provider,
                    error = %e,
                    "Failed to store tokens in secure storage"
                );
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            provider = %provider,
            has_refresh_token = stored.refresh_token.is_some(),
            "Tokens stored securely"
        );

        Ok(())
    }

    /// Retrieve OAuth tokens for a provider.
    ///
    /// Returns `Ok(None)` when no tokens exist. Corrupted entries are
    /// deleted and reported as [`AuthError::TokenCorrupted`].
    pub async fn retrieve_tokens(&self, provider: ProviderKind) -> Result<Option<OAuthTokens>> {
        let key = self.storage_key(provider);

        let data = self.secure_store.get_secret(&key).await.map_err(|e| {
            warn!(
                provider = %provider,
                error = %e,
                "Failed to retrieve tokens from secure storage"
            );
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(provider = %provider, "No tokens found in storage");
            return Ok(None);
        };

        let stored: StoredTokens = match serde_json::from_slice(&data) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(
                    provider = %provider,
                    error = %e,
                    "Failed to deserialize tokens, they may be corrupted"
                );

                if let Err(delete_err) = self.secure_store.delete_secret(&key).await {
                    warn!(
                        provider = %provider,
                        error = %delete_err,
                        "Failed to delete corrupted token data"
                    );
                }

                return Err(AuthError::TokenCorrupted {
                    provider,
                    reason: e.to_string(),
                });
            }
        };

        let tokens = OAuthTokens::from_parts(
            stored.access_token,
            stored.refresh_token,
            stored.expires_at,
        );

        debug!(
            provider = %provider,
            has_refresh_token = tokens.refresh_token.is_some(),
            "Tokens retrieved successfully"
        );

        Ok(Some(tokens))
    }

    /// Delete OAuth tokens for a provider.
    ///
    /// Idempotent: succeeds even if no tokens exist.
    pub async fn delete_tokens(&self, provider: ProviderKind) -> Result<()> {
        let key = self.storage_key(provider);

        self.secure_store.delete_secret(&key).await.map_err(|e| {
            warn!(
                provider = %provider,
                error = %e,
                "Failed to delete tokens from secure storage"
            );
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        info!(provider = %provider, "Tokens deleted");

        Ok(())
    }

    fn storage_key(&self, provider: ProviderKind) -> String {
        format!("oauth_tokens:{}", provider.as_str())
    }
}
