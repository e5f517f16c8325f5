//! OAuth 2.0 Authorization Flow Manager with PKCE Support
//!
//! This module implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the
//! authorization flow against Google's OAuth endpoints.
//!
//! # Overview
//!
//! The OAuth flow manager handles:
//! - Building authorization URLs with PKCE challenge
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens
//! - State verification for CSRF protection
//!
//! # Security
//!
//! - Uses PKCE (Proof Key for Code Exchange) for additional security
//! - Generates cryptographically secure random state and code verifier
//! - Validates state parameter to prevent CSRF attacks
//! - Never logs sensitive values (tokens, codes, verifiers)

use crate::error::{AuthError, Result};
use crate::types::{OAuthTokens, ProviderKind};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{instrument, warn};
use url::Url;

/// Google OAuth authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Drive scope limited to files created by this application.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// OAuth 2.0 provider configuration.
///
/// Contains all necessary information to perform OAuth flows with a
/// specific provider.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// The provider kind
    pub provider: ProviderKind,
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (optional for public clients)
    pub client_secret: Option<String>,
    /// Redirect URI for OAuth callback
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Build the standard Google Drive configuration with the
    /// file-restricted scope.
    pub fn google_drive(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            provider: ProviderKind::GoogleDrive,
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            redirect_uri: redirect_uri.into(),
            scopes: vec![DRIVE_FILE_SCOPE.to_string()],
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// Contains the code verifier that must be stored securely during the
/// authorization flow and used when exchanging the authorization code.
///
/// # Security
///
/// The verifier must be kept secret and never transmitted to the
/// authorization server. Only the challenge (derived from the verifier)
/// is sent during authorization.
#[derive(Debug, Clone)]
pub struct PkceVerifier {
    /// The code verifier (base64-url-encoded random string)
    verifier: String,
    /// The state parameter for CSRF protection
    state: String,
}

impl PkceVerifier {
    /// Create a new PKCE verifier with cryptographically secure random values.
    ///
    /// Generates:
    /// - A 32-byte random code verifier (base64-url-encoded)
    /// - A 16-byte random state parameter (base64-url-encoded)
    ///
    /// Both values use URL-safe base64 encoding without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        // Generate code verifier (43-128 characters per RFC 7636)
        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        // Generate state for CSRF protection
        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    /// Get the code verifier string.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// Get the state parameter.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        let hash = hasher.finalize();
        URL_SAFE_NO_PAD.encode(hash)
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth 2.0 flow manager.
///
/// Handles the complete OAuth 2.0 authorization code flow with PKCE support.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    /// Create a new OAuth flow manager with the given configuration.
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Creates a URL that the user should visit to authorize the
    /// application. Returns both the URL and the PKCE verifier, which must
    /// be kept for the code exchange.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorization URL cannot be parsed.
    #[instrument(skip(self), fields(provider = %self.config.provider))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("access_type", "offline"); // Request refresh token
        }

        tracing::debug!(
            "Built authorization URL for provider {}",
            self.config.provider
        );

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for OAuth tokens.
    ///
    /// This should be called after the user completes authorization and
    /// the callback receives the authorization code and state.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The state doesn't match (CSRF protection)
    /// - The authorization code is invalid
    /// - Network errors occur
    /// - The token endpoint returns an error
    #[instrument(skip(self, code, verifier), fields(provider = %self.config.provider))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: &str,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        // Verify state to prevent CSRF attacks
        if state != verifier.state() {
            warn!(
                "OAuth state mismatch for provider {}",
                self.config.provider
            );
            return Err(AuthError::StateMismatch {
                expected: verifier.state().to_string(),
                actual: state.to_string(),
            });
        }

        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", &self.config.redirect_uri);
        params.insert("client_id", &self.config.client_id);
        params.insert("code_verifier", verifier.verifier());

        if let Some(ref client_secret) = self.config.client_secret {
            params.insert("client_secret", client_secret);
        }

        tracing::debug!("Exchanging authorization code for tokens");

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(
                status = status,
                error = %error_body,
                "Token exchange failed while exchanging authorization code"
            );

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        tracing::info!(
            "Successfully exchanged code for tokens (expires in {}s)",
            token_response.expires_in
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
        ))
    }

    /// Refresh an access token using a refresh token.
    ///
    /// The refresh token is long-lived and can be used multiple times.
    /// Transient server errors are retried with exponential backoff;
    /// 4xx responses fail immediately because the refresh token is
    /// likely revoked.
    #[instrument(skip(self, refresh_token), fields(provider = %self.config.provider))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = HashMap::new();
        params.insert("grant_type", "refresh_token");
        params.insert("refresh_token", refresh_token);
        params.insert("client_id", &self.config.client_id);

        if let Some(ref client_secret) = self.config.client_secret {
            params.insert("client_secret", client_secret);
        }

        tracing::debug!("Refreshing access token");

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;
        let body = Bytes::from(encoded_body);

        let mut attempts = 0;
        const MAX_RETRIES: u32 = 3;

        loop {
            attempts += 1;

            let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body.clone());

            let response = self
                .http_client
                .execute(request)
                .await
                .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

            if response.is_success() {
                let token_response: TokenResponse = response.json().map_err(|e| {
                    AuthError::Other(format!("Failed to parse token response: {}", e))
                })?;

                tracing::info!(
                    "Successfully refreshed token (expires in {}s)",
                    token_response.expires_in
                );

                // Google omits the refresh token on refresh, keep the old one
                return Ok(OAuthTokens::new(
                    token_response.access_token,
                    token_response
                        .refresh_token
                        .or_else(|| Some(refresh_token.to_string())),
                    token_response.expires_in,
                ));
            }

            let status = response.status;

            if (400..500).contains(&status) {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                warn!(
                    status = status,
                    error = %error_body,
                    "Token refresh failed without retry"
                );

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token endpoint returned {}: {}",
                    status, error_body
                )));
            }

            if attempts >= MAX_RETRIES {
                let error_body = response
                    .text()
                    .unwrap_or_else(|_| "Unable to read error response".to_string());

                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {} - {}",
                    attempts, status, error_body
                )));
            }

            let delay = Duration::from_millis(100 * 2u64.pow(attempts - 1));
            warn!(
                status = status,
                attempts = attempts,
                delay_ms = delay.as_millis(),
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use mockall::predicate::function;
    use std::collections::HashMap as StdHashMap;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn test_config() -> OAuthConfig {
        OAuthConfig::google_drive("client-id", "client-secret", "http://127.0.0.1:9999/")
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: StdHashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_pkce_verifier_lengths() {
        let verifier = PkceVerifier::new();
        // 32 bytes base64-url without padding
        assert_eq!(verifier.verifier().len(), 43);
        assert!(!verifier.state().is_empty());
    }

    #[test]
    fn test_pkce_challenge_is_deterministic() {
        let verifier = PkceVerifier::new();
        assert_eq!(verifier.challenge(), verifier.challenge());
    }

    #[test]
    fn test_auth_url_contains_pkce_params() {
        let manager = OAuthFlowManager::new(test_config(), Arc::new(MockHttp::new()));
        let (url, verifier) = manager.build_auth_url().unwrap();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains(&format!("state={}", verifier.state())));
        assert!(url.contains("response_type=code"));
    }

    #[tokio::test]
    async fn test_exchange_code_rejects_state_mismatch() {
        let manager = OAuthFlowManager::new(test_config(), Arc::new(MockHttp::new()));
        let (_, verifier) = manager.build_auth_url().unwrap();

        let result = manager.exchange_code("code", "tampered-state", &verifier).await;
        assert!(matches!(result, Err(AuthError::StateMismatch { .. })));
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .with(function(|req: &HttpRequest| {
                req.url == GOOGLE_TOKEN_URL
            }))
            .times(1)
            .returning(|_| {
                Ok(json_response(
                    200,
                    r#"{"access_token":"at","refresh_token":"rt","expires_in":3599}"#,
                ))
            });

        let manager = OAuthFlowManager::new(test_config(), Arc::new(http));
        let (_, verifier) = manager.build_auth_url().unwrap();
        let state = verifier.state().to_string();

        let tokens = manager.exchange_code("auth-code", &state, &verifier).await.unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        assert!(!tokens.is_expired());
    }

    #[tokio::test]
    async fn test_refresh_preserves_old_refresh_token() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|_| {
            Ok(json_response(
                200,
                r#"{"access_token":"new-at","expires_in":3600}"#,
            ))
        });

        let manager = OAuthFlowManager::new(test_config(), Arc::new(http));
        let tokens = manager.refresh_access_token("old-rt").await.unwrap();

        assert_eq!(tokens.access_token, "new-at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-rt"));
    }

    #[tokio::test]
    async fn test_refresh_does_not_retry_client_errors() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(400, r#"{"error":"invalid_grant"}"#)));

        let manager = OAuthFlowManager::new(test_config(), Arc::new(http));
        let result = manager.refresh_access_token("revoked").await;

        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }

    #[tokio::test]
    async fn test_refresh_retries_server_errors() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(3)
            .returning(|_| Ok(json_response(500, "server error")));

        let manager = OAuthFlowManager::new(test_config(), Arc::new(http));
        let result = manager.refresh_access_token("rt").await;

        assert!(matches!(result, Err(AuthError::TokenRefreshFailed(_))));
    }
}
