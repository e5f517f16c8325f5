//! # Authentication Manager
//!
//! High-level token acquisition for the Google Drive destination.
//!
//! ## Overview
//!
//! The `AuthManager` orchestrates OAuth 2.0 flows and token management.
//! It serves cached tokens while they are valid, refreshes them silently
//! when a refresh token is available, and falls back to the interactive
//! browser flow with a loopback callback listener when no usable
//! credentials exist.

use crate::callback::CallbackListener;
use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, OAuthFlowManager};
use crate::token_store::TokenStore;
use crate::types::{OAuthTokens, ProviderKind};
use bridge_traits::{http::HttpClient, SecureStore};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default timeout for the interactive authorization flow (2 minutes)
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Client credentials for a provider's OAuth application.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Unified authentication manager for the Drive OAuth flow.
///
/// Token acquisition order:
/// 1. Valid stored access token
/// 2. Silent refresh using a stored refresh token
/// 3. Interactive browser authorization
pub struct AuthManager {
    token_store: TokenStore,
    http_client: Arc<dyn HttpClient>,
    credentials: ClientCredentials,
    auth_timeout: Duration,
}

impl AuthManager {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        http_client: Arc<dyn HttpClient>,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            token_store: TokenStore::new(secure_store),
            http_client,
            credentials,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Override the interactive authorization timeout.
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Obtain a valid access token for the provider.
    ///
    /// Stored tokens are used while valid. Expired tokens are refreshed
    /// when possible and the refreshed set is persisted. When neither
    /// works, the interactive flow runs and its result is persisted.
    #[instrument(skip(self))]
    pub async fn access_token(&self, provider: ProviderKind) -> Result<String> {
        match self.token_store.retrieve_tokens(provider).await {
            Ok(Some(tokens)) if !tokens.is_expired() => {
                debug!(provider = %provider, "Using stored access token");
                return Ok(tokens.access_token);
            }
            Ok(Some(tokens)) => {
                if let Some(refresh_token) = tokens.refresh_token.clone() {
                    match self.refresh(provider, &refresh_token).await {
                        Ok(refreshed) => return Ok(refreshed.access_token),
                        Err(e) => {
                            warn!(
                                provider = %provider,
                                error = %e,
                                "Token refresh failed, falling back to interactive flow"
                            );
                        }
                    }
                } else {
                    debug!(provider = %provider, "Stored token expired without refresh token");
                }
            }
            Ok(None) => {
                debug!(provider = %provider, "No stored tokens");
            }
            Err(AuthError::TokenCorrupted { .. }) => {
                // Corrupted entry was already deleted by the store
                warn!(provider = %provider, "Stored tokens were corrupted, re-authorizing");
            }
            Err(e) => return Err(e),
        }

        let tokens = self.interactive_sign_in(provider).await?;
        Ok(tokens.access_token)
    }

    /// Remove stored credentials for the provider.
    pub async fn sign_out(&self, provider: ProviderKind) -> Result<()> {
        self.token_store.delete_tokens(provider).await
    }

    async fn refresh(&self, provider: ProviderKind, refresh_token: &str) -> Result<OAuthTokens> {
        // The redirect URI is not used on the refresh grant
        let config = self.oauth_config(provider, "http://127.0.0.1/")?;
        let flow = OAuthFlowManager::new(config, self.http_client.clone());

        let refreshed = flow.refresh_access_token(refresh_token).await?;
        self.token_store.store_tokens(provider, &refreshed).await?;

        info!(provider = %provider, "Access token refreshed");
        Ok(refreshed)
    }

    /// Run the full interactive authorization flow.
    ///
    /// Binds the loopback listener, prints the authorization URL for the
    /// user to open, waits for the redirect, exchanges the code, and
    /// persists the resulting tokens.
    #[instrument(skip(self))]
    async fn interactive_sign_in(&self, provider: ProviderKind) -> Result<OAuthTokens> {
        let listener = CallbackListener::bind().await?;
        let config = self.oauth_config(provider, listener.redirect_uri())?;
        let flow = OAuthFlowManager::new(config, self.http_client.clone());

        let (auth_url, verifier) = flow.build_auth_url()?;

        println!("Open this URL in your browser to authorize {}:", provider);
        println!("\n  {}\n", auth_url);
        info!(provider = %provider, "Waiting for OAuth callback");

        let params = listener.wait_for_code(self.auth_timeout).await?;
        let tokens = flow
            .exchange_code(&params.code, &params.state, &verifier)
            .await?;

        self.token_store.store_tokens(provider, &tokens).await?;
        info!(provider = %provider, "Authorization complete");

        Ok(tokens)
    }

    fn oauth_config(&self, provider: ProviderKind, redirect_uri: &str) -> Result<OAuthConfig> {
        match provider {
            ProviderKind::GoogleDrive => Ok(OAuthConfig::google_drive(
                self.credentials.client_id.clone(),
                self.credentials.client_secret.clone(),
                redirect_uri,
            )),
            // Contentful uses a static management token, there is no
            // OAuth flow to configure
            ProviderKind::Contentful => Err(AuthError::AuthenticationFailed {
                provider: provider.display_name().to_string(),
                reason: "provider does not use OAuth".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpRequest, HttpResponse};
    use bytes::Bytes;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemorySecureStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.entries
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.entries.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.entries.lock().await.remove(key);
            Ok(())
        }
    }

    struct RefreshHttpClient;

    #[async_trait]
    impl HttpClient for RefreshHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            assert_eq!(request.url, crate::oauth::GOOGLE_TOKEN_URL);
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from(
                    r#"{"access_token":"refreshed-at","expires_in":3600}"#,
                ),
            })
        }
    }

    struct PanicHttpClient;

    #[async_trait]
    impl HttpClient for PanicHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            panic!("no network call expected");
        }
    }

    fn credentials() -> ClientCredentials {
        ClientCredentials {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_stored_token_is_served_without_network() {
        let secure_store = Arc::new(MemorySecureStore::default());
        let token_store = TokenStore::new(secure_store.clone());
        token_store
            .store_tokens(
                ProviderKind::GoogleDrive,
                &OAuthTokens::new("stored-at".to_string(), Some("rt".to_string()), 3600),
            )
            .await
            .unwrap();

        let manager = AuthManager::new(secure_store, Arc::new(PanicHttpClient), credentials());
        let token = manager.access_token(ProviderKind::GoogleDrive).await.unwrap();
        assert_eq!(token, "stored-at");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let secure_store = Arc::new(MemorySecureStore::default());
        let token_store = TokenStore::new(secure_store.clone());
        token_store
            .store_tokens(
                ProviderKind::GoogleDrive,
                &OAuthTokens::new("old-at".to_string(), Some("rt".to_string()), 0),
            )
            .await
            .unwrap();

        let manager = AuthManager::new(secure_store.clone(), Arc::new(RefreshHttpClient), credentials());
        let token = manager.access_token(ProviderKind::GoogleDrive).await.unwrap();
        assert_eq!(token, "refreshed-at");

        // The refreshed token replaced the stored one
        let stored = TokenStore::new(secure_store)
            .retrieve_tokens(ProviderKind::GoogleDrive)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.access_token, "refreshed-at");
        assert_eq!(stored.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn test_contentful_never_enters_the_oauth_flow() {
        let secure_store = Arc::new(MemorySecureStore::default());
        let manager = AuthManager::new(secure_store, Arc::new(PanicHttpClient), credentials());

        let result = manager.access_token(ProviderKind::Contentful).await;
        assert!(matches!(
            result,
            Err(AuthError::AuthenticationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_sign_out_removes_tokens() {
        let secure_store = Arc::new(MemorySecureStore::default());
        let token_store = TokenStore::new(secure_store.clone());
        token_store
            .store_tokens(
                ProviderKind::GoogleDrive,
                &OAuthTokens::new("at".to_string(), None, 3600),
            )
            .await
            .unwrap();

        let manager = AuthManager::new(secure_store.clone(), Arc::new(PanicHttpClient), credentials());
        manager.sign_out(ProviderKind::GoogleDrive).await.unwrap();

        let stored = TokenStore::new(secure_store)
            .retrieve_tokens(ProviderKind::GoogleDrive)
            .await
            .unwrap();
        assert!(stored.is_none());
    }
}
