//! # Authentication Module
//!
//! Credential management for the photo sync destinations.
//!
//! ## Overview
//!
//! This module handles the OAuth 2.0 authorization code flow for Google
//! Drive, including the local loopback callback listener, automatic token
//! refresh, and secure token persistence between runs.
//!
//! ## Features
//!
//! - OAuth 2.0 authorization flows with PKCE support
//! - Loopback redirect listener on an ephemeral port
//! - Automatic token refresh before expiration
//! - Secure token storage via the `SecureStore` bridge

pub mod callback;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use callback::{CallbackListener, CallbackParams};
pub use error::{AuthError, Result};
pub use manager::{AuthManager, ClientCredentials};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use token_store::TokenStore;
pub use types::{OAuthTokens, ProviderKind};
