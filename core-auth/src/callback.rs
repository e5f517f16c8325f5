//! Loopback OAuth Callback Listener
//!
//! Receives the OAuth redirect on a local ephemeral port. The listener
//! binds `127.0.0.1:0`, hands its redirect URI to the authorization URL
//! builder, then waits for the browser to deliver the authorization code.

use crate::error::{AuthError, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

const RESPONSE_BODY: &str = "<html><body>\
<h1>Authorization complete</h1>\
<p>You can close this window and return to the terminal.</p>\
</body></html>";

/// Authorization code and state delivered by the OAuth redirect.
#[derive(Debug, Clone)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// Local HTTP listener for the OAuth loopback redirect.
pub struct CallbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl CallbackListener {
    /// Bind to an ephemeral port on the loopback interface.
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::CallbackFailed(format!("Failed to bind listener: {}", e)))?;

        let addr = listener
            .local_addr()
            .map_err(|e| AuthError::CallbackFailed(format!("Failed to read local addr: {}", e)))?;

        let redirect_uri = format!("http://{}/", addr);
        debug!(redirect_uri = %redirect_uri, "OAuth callback listener bound");

        Ok(Self {
            listener,
            redirect_uri,
        })
    }

    /// The redirect URI to register in the authorization request.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Wait for the browser redirect and extract the authorization code.
    ///
    /// Accepts a single connection, parses the request line, answers with
    /// a small confirmation page, and returns the `code` and `state`
    /// query parameters. Fails if the provider reported an error or the
    /// timeout elapses.
    pub async fn wait_for_code(self, timeout: Duration) -> Result<CallbackParams> {
        let accept = tokio::time::timeout(timeout, self.listener.accept());

        let (mut stream, _) = accept
            .await
            .map_err(|_| {
                AuthError::CallbackFailed(format!(
                    "No OAuth callback received within {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| AuthError::CallbackFailed(format!("Failed to accept connection: {}", e)))?;

        let mut buffer = vec![0u8; 8192];
        let read = stream
            .read(&mut buffer)
            .await
            .map_err(|e| AuthError::CallbackFailed(format!("Failed to read request: {}", e)))?;

        let request = String::from_utf8_lossy(&buffer[..read]);
        let params = parse_request_line(&request)?;

        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            RESPONSE_BODY.len(),
            RESPONSE_BODY
        );
        // Best effort, the code is already captured
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;

        info!("OAuth callback received");
        Ok(params)
    }
}

/// Parse the query parameters out of the first request line
/// (`GET /?code=...&state=... HTTP/1.1`).
fn parse_request_line(request: &str) -> Result<CallbackParams> {
    let line = request
        .lines()
        .next()
        .ok_or_else(|| AuthError::CallbackFailed("Empty request".to_string()))?;

    let path = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| AuthError::CallbackFailed("Malformed request line".to_string()))?;

    let query = path.split_once('?').map(|(_, q)| q).unwrap_or("");
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if let Some(error) = params.get("error") {
        return Err(AuthError::CallbackFailed(format!(
            "Authorization server returned error: {}",
            error
        )));
    }

    let code = params
        .get("code")
        .cloned()
        .ok_or_else(|| AuthError::CallbackFailed("Callback missing 'code' parameter".to_string()))?;
    let state = params
        .get("state")
        .cloned()
        .ok_or_else(|| AuthError::CallbackFailed("Callback missing 'state' parameter".to_string()))?;

    Ok(CallbackParams { code, state })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_callback() {
        let request = "GET /?state=xyz&code=4%2F0Abc HTTP/1.1\r\nHost: 127.0.0.1\r\n\r\n";
        let params = parse_request_line(request).unwrap();
        assert_eq!(params.code, "4/0Abc");
        assert_eq!(params.state, "xyz");
    }

    #[test]
    fn test_parse_rejects_provider_error() {
        let request = "GET /?error=access_denied HTTP/1.1\r\n\r\n";
        let result = parse_request_line(request);
        assert!(matches!(result, Err(AuthError::CallbackFailed(_))));
    }

    #[test]
    fn test_parse_rejects_missing_code() {
        let request = "GET /?state=xyz HTTP/1.1\r\n\r\n";
        assert!(parse_request_line(request).is_err());
    }

    #[tokio::test]
    async fn test_listener_round_trip() {
        let listener = CallbackListener::bind().await.unwrap();
        let uri = listener.redirect_uri().to_string();

        let client = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(
                uri.trim_start_matches("http://").trim_end_matches('/'),
            )
            .await
            .unwrap();
            stream
                .write_all(b"GET /?code=abc&state=def HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let params = listener
            .wait_for_code(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(params.code, "abc");
        assert_eq!(params.state, "def");

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_listener_times_out() {
        let listener = CallbackListener::bind().await.unwrap();
        let result = listener.wait_for_code(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(AuthError::CallbackFailed(_))));
    }
}
