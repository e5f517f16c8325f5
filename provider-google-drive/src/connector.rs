//! Google Drive API connector implementation
//!
//! Folder resolution and resumable uploads against Google Drive API v3.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{DriveError, Result};
use crate::types::{DriveAssetRef, DriveFile, FileCreateRequest, FilesListResponse, FolderHandle};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Google Drive upload API base URL
const UPLOAD_API_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// MIME type of Drive folders
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type sent for uploaded photos
const JPEG_MIME_TYPE: &str = "image/jpeg";

/// Default resumable upload chunk size (multiple of 256 KiB)
const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Progress callback invoked with the percentage of bytes committed.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Google Drive API connector
///
/// # Features
///
/// - Find-or-create folder resolution with name escaping
/// - Resumable chunked uploads with per-chunk progress
/// - Exponential backoff for rate limiting and server errors
/// - OAuth 2.0 authentication via `HttpClient`
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::DriveConnector;
///
/// let connector = DriveConnector::new(http_client, access_token);
/// let album = connector.resolve_album_folders("managed_photos", "2023", "rome").await?;
/// ```
pub struct DriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token with `drive.file` scope
    access_token: String,

    /// Resumable upload chunk size in bytes
    chunk_size: usize,
}

impl DriveConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the upload chunk size. Must be a multiple of 256 KiB.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Find a folder by name, optionally restricted to a parent folder.
    ///
    /// Trashed folders are excluded. When multiple folders share the
    /// name, the first match is returned.
    #[instrument(skip(self))]
    pub async fn find_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<FolderHandle>> {
        let mut query = format!(
            "mimeType='{}' and name='{}' and trashed=false",
            FOLDER_MIME_TYPE,
            escape_query_value(name)
        );
        if let Some(parent) = parent_id {
            query.push_str(&format!(" and '{}' in parents", escape_query_value(parent)));
        }

        let url = format!(
            "{}/files?q={}&fields=files(id,name)&pageSize=10",
            DRIVE_API_BASE,
            urlencoding::encode(&query)
        );

        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(&self.access_token)
            .header("Accept", "application/json");

        let response = self.execute_with_retry(request, 3).await?;

        let list: FilesListResponse = serde_json::from_slice(&response.body).map_err(|e| {
            DriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })?;

        let found = list.files.into_iter().next().map(|f| FolderHandle {
            id: f.id,
            name: f.name,
        });

        debug!(name = name, found = found.is_some(), "Folder lookup");
        Ok(found)
    }

    /// Create a folder, optionally under a parent folder.
    #[instrument(skip(self))]
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderHandle> {
        let body = FileCreateRequest {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
        };

        let url = format!("{}/files?fields=id,name", DRIVE_API_BASE);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.access_token)
            .json(&body)?;

        let response = self.execute_with_retry(request, 3).await?;

        let file: DriveFile = serde_json::from_slice(&response.body).map_err(|e| {
            DriveError::ParseError(format!("Failed to parse folder creation response: {}", e))
        })?;

        info!(name = name, folder_id = %file.id, "Created folder");
        Ok(FolderHandle {
            id: file.id,
            name: file.name,
        })
    }

    /// Find a folder by name or create it if absent.
    pub async fn ensure_folder(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<FolderHandle> {
        if let Some(folder) = self.find_folder(name, parent_id).await? {
            return Ok(folder);
        }
        self.create_folder(name, parent_id).await
    }

    /// Resolve the root/year/album folder chain, creating missing levels.
    ///
    /// Returns the handle of the album folder, the direct parent of the
    /// uploaded photos.
    #[instrument(skip(self))]
    pub async fn resolve_album_folders(
        &self,
        root_name: &str,
        year: &str,
        album: &str,
    ) -> Result<FolderHandle> {
        let root = self.ensure_folder(root_name, None).await?;
        let year_folder = self.ensure_folder(year, Some(&root.id)).await?;
        let album_folder = self.ensure_folder(album, Some(&year_folder.id)).await?;

        info!(
            root = root_name,
            year = year,
            album = album,
            album_folder_id = %album_folder.id,
            "Resolved album folder hierarchy"
        );
        Ok(album_folder)
    }

    /// Upload a photo into a folder using a resumable session.
    ///
    /// Opens a resumable upload session, then sends the file in chunks
    /// with `Content-Range` headers. The progress callback receives the
    /// percentage of bytes the server has committed after each chunk.
    #[instrument(skip(self, on_progress), fields(file_name = %file_name))]
    pub async fn upload_photo(
        &self,
        path: &Path,
        file_name: &str,
        folder_id: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<DriveAssetRef> {
        let data = tokio::fs::read(path).await?;
        let total = data.len() as u64;

        let session_uri = self.open_upload_session(file_name, folder_id, total).await?;
        debug!(file_name = file_name, total_bytes = total, "Opened upload session");

        let file = self
            .upload_chunks(&session_uri, file_name, Bytes::from(data), on_progress)
            .await?;

        info!(file_name = file_name, file_id = %file.id, "Upload complete");
        Ok(DriveAssetRef {
            id: file.id,
            file_name: file.name,
        })
    }

    /// Open a resumable upload session and return its session URI.
    async fn open_upload_session(
        &self,
        file_name: &str,
        folder_id: &str,
        total_bytes: u64,
    ) -> Result<String> {
        let body = FileCreateRequest {
            name: file_name.to_string(),
            mime_type: None,
            parents: vec![folder_id.to_string()],
        };

        let url = format!("{}/files?uploadType=resumable", UPLOAD_API_BASE);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.access_token)
            .header("X-Upload-Content-Type", JPEG_MIME_TYPE)
            .header("X-Upload-Content-Length", total_bytes.to_string())
            .json(&body)?;

        let response = self.execute_with_retry(request, 3).await?;

        response
            .header("Location")
            .map(|uri| uri.to_string())
            .ok_or_else(|| DriveError::MissingSessionUri {
                file_name: file_name.to_string(),
            })
    }

    /// Send the file content to the session URI in `Content-Range` chunks.
    async fn upload_chunks(
        &self,
        session_uri: &str,
        file_name: &str,
        data: Bytes,
        on_progress: ProgressFn<'_>,
    ) -> Result<DriveFile> {
        let total = data.len() as u64;

        // Zero-byte files complete in a single empty PUT
        if total == 0 {
            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .bearer_token(&self.access_token)
                .header("Content-Range", "bytes */0");
            let response = self.execute_with_retry(request, 3).await?;
            on_progress(100);
            return parse_completed_upload(&response, file_name, 0);
        }

        let mut offset: u64 = 0;
        loop {
            let end = (offset + self.chunk_size as u64).min(total);
            let chunk = data.slice(offset as usize..end as usize);

            let request = HttpRequest::new(HttpMethod::Put, session_uri)
                .bearer_token(&self.access_token)
                .header(
                    "Content-Range",
                    format!("bytes {}-{}/{}", offset, end - 1, total),
                )
                .body(chunk);

            let response = self.execute_upload_with_retry(request, 3, file_name, offset).await?;

            let percent = (end * 100 / total) as u8;
            on_progress(percent);
            debug!(
                file_name = file_name,
                committed = end,
                total = total,
                percent = percent,
                "Chunk accepted"
            );

            if response.status == 308 {
                offset = end;
                continue;
            }

            return parse_completed_upload(&response, file_name, offset);
        }
    }

    /// Execute a chunk upload with backoff, treating 308 as success.
    async fn execute_upload_with_retry(
        &self,
        request: HttpRequest,
        max_retries: u32,
        file_name: &str,
        offset: u64,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let response = self
                .http_client
                .execute(request.clone())
                .await
                .map_err(DriveError::Bridge)?;

            let status = response.status;
            if response.is_success() || status == 308 {
                return Ok(response);
            }

            if status == 429 || (500..600).contains(&status) {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(DriveError::UploadInterrupted {
                        file_name: file_name.to_string(),
                        offset,
                        message: format!("status {} after {} retries", status, max_retries),
                    });
                }

                let backoff_ms = 100u64 * 2u64.pow(attempt);
                warn!(
                    file_name = file_name,
                    status = status,
                    attempt = attempt,
                    backoff_ms = backoff_ms,
                    "Chunk upload failed, retrying"
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                continue;
            }

            return Err(DriveError::UploadInterrupted {
                file_name: file_name.to_string(),
                offset,
                message: String::from_utf8_lossy(&response.body).to_string(),
            });
        }
    }

    /// Execute an API request with exponential backoff on rate limits
    /// and server errors.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        max_retries: u32,
    ) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            match self.http_client.execute(request.clone()).await {
                Ok(response) => {
                    let status = response.status;

                    if response.is_success() {
                        return Ok(response);
                    } else if status == 429 || (500..600).contains(&status) {
                        attempt += 1;
                        if attempt >= max_retries {
                            warn!(
                                "API request failed after {} attempts: status={}",
                                max_retries, status
                            );
                            return Err(DriveError::ApiError {
                                status_code: status,
                                message: format!("Request failed after {} retries", max_retries),
                            });
                        }

                        let backoff_ms = 100u64 * 2u64.pow(attempt);
                        warn!(
                            "API request failed (attempt {}/{}): status={}, retrying in {}ms",
                            attempt, max_retries, status, backoff_ms
                        );
                        tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                    } else {
                        // Client error, don't retry
                        warn!("API request failed: status={}", status);
                        return Err(DriveError::ApiError {
                            status_code: status,
                            message: String::from_utf8_lossy(&response.body).to_string(),
                        });
                    }
                }
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        warn!("API request failed after {} attempts: {}", max_retries, e);
                        return Err(DriveError::Bridge(e));
                    }

                    let backoff_ms = 100u64 * 2u64.pow(attempt);
                    warn!(
                        "API request failed (attempt {}/{}): {}, retrying in {}ms",
                        attempt, max_retries, e, backoff_ms
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }
}

fn parse_completed_upload(
    response: &HttpResponse,
    file_name: &str,
    offset: u64,
) -> Result<DriveFile> {
    if !response.is_success() {
        return Err(DriveError::UploadInterrupted {
            file_name: file_name.to_string(),
            offset,
            message: format!("final chunk returned status {}", response.status),
        });
    }

    serde_json::from_slice(&response.body)
        .map_err(|e| DriveError::ParseError(format!("Failed to parse upload response: {}", e)))
}

/// Escape single quotes and backslashes in Drive query string literals.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    mock! {
        HttpClientImpl {}

        #[async_trait::async_trait]
        impl HttpClient for HttpClientImpl {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn response_with_location(location: &str) -> HttpResponse {
        let mut headers = HashMap::new();
        headers.insert("Location".to_string(), location.to_string());
        HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("rome trip"), "rome trip");
        assert_eq!(escape_query_value("mom's album"), "mom\\'s album");
        assert_eq!(escape_query_value("a\\b"), "a\\\\b");
    }

    #[tokio::test]
    async fn test_find_folder_builds_escaped_query() {
        let mut mock_http = MockHttpClientImpl::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|req| {
                let query = urlencoding::decode(req.url.split("q=").nth(1).unwrap().split('&').next().unwrap())
                    .unwrap()
                    .into_owned();
                assert!(query.contains("mimeType='application/vnd.google-apps.folder'"));
                assert!(query.contains("name='mom\\'s album'"));
                assert!(query.contains("trashed=false"));
                Ok(json_response(200, r#"{"files": []}"#))
            });

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let found = connector.find_folder("mom's album", None).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_ensure_folder_skips_create_when_found() {
        let mut mock_http = MockHttpClientImpl::new();
        // Single list call, no create
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(matches!(req.method, HttpMethod::Get));
            Ok(json_response(
                200,
                r#"{"files": [{"id": "f1", "name": "2023"}]}"#,
            ))
        });

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let folder = connector.ensure_folder("2023", Some("root1")).await.unwrap();
        assert_eq!(folder.id, "f1");
        assert_eq!(folder.name, "2023");
    }

    #[tokio::test]
    async fn test_ensure_folder_creates_when_absent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut mock_http = MockHttpClientImpl::new();
        mock_http.expect_execute().times(2).returning(move |req| {
            match calls_clone.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    assert!(matches!(req.method, HttpMethod::Get));
                    Ok(json_response(200, r#"{"files": []}"#))
                }
                _ => {
                    assert!(matches!(req.method, HttpMethod::Post));
                    let body = req.body.unwrap();
                    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
                    assert_eq!(parsed["name"], "rome");
                    assert_eq!(parsed["mimeType"], FOLDER_MIME_TYPE);
                    assert_eq!(parsed["parents"][0], "year1");
                    Ok(json_response(200, r#"{"id": "new1", "name": "rome"}"#))
                }
            }
        });

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let folder = connector.ensure_folder("rome", Some("year1")).await.unwrap();
        assert_eq!(folder.id, "new1");
    }

    #[tokio::test]
    async fn test_resolve_album_folders_chains_three_levels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut mock_http = MockHttpClientImpl::new();
        // Each level found on first lookup: three list calls total
        mock_http.expect_execute().times(3).returning(move |_| {
            let n = calls_clone.fetch_add(1, Ordering::SeqCst);
            let body = match n {
                0 => r#"{"files": [{"id": "root1", "name": "managed_photos"}]}"#,
                1 => r#"{"files": [{"id": "year1", "name": "2023"}]}"#,
                _ => r#"{"files": [{"id": "album1", "name": "rome"}]}"#,
            };
            Ok(json_response(200, body))
        });

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let album = connector
            .resolve_album_folders("managed_photos", "2023", "rome")
            .await
            .unwrap();
        assert_eq!(album.id, "album1");
    }

    #[tokio::test]
    async fn test_upload_photo_chunks_and_reports_progress() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[7u8; 1024]).unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut mock_http = MockHttpClientImpl::new();
        // Session open + two 512-byte chunks
        mock_http.expect_execute().times(3).returning(move |req| {
            match calls_clone.fetch_add(1, Ordering::SeqCst) {
                0 => {
                    assert!(req.url.contains("uploadType=resumable"));
                    assert_eq!(
                        req.headers.get("X-Upload-Content-Type").map(String::as_str),
                        Some("image/jpeg")
                    );
                    Ok(response_with_location("https://upload.example/session1"))
                }
                1 => {
                    assert_eq!(req.url, "https://upload.example/session1");
                    assert_eq!(
                        req.headers.get("Content-Range").map(String::as_str),
                        Some("bytes 0-511/1024")
                    );
                    Ok(json_response(308, ""))
                }
                _ => {
                    assert_eq!(
                        req.headers.get("Content-Range").map(String::as_str),
                        Some("bytes 512-1023/1024")
                    );
                    Ok(json_response(200, r#"{"id": "photo1", "name": "IMG.jpg"}"#))
                }
            }
        });

        let connector =
            DriveConnector::new(Arc::new(mock_http), "token".to_string()).with_chunk_size(512);

        let progress: Mutex<Vec<u8>> = Mutex::new(Vec::new());
        let asset = connector
            .upload_photo(file.path(), "IMG.jpg", "album1", &|p| {
                progress.lock().unwrap().push(p)
            })
            .await
            .unwrap();

        assert_eq!(asset.id, "photo1");
        assert_eq!(*progress.lock().unwrap(), vec![50, 100]);
    }

    #[tokio::test]
    async fn test_upload_fails_without_session_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"data").unwrap();

        let mut mock_http = MockHttpClientImpl::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, "")));

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let result = connector
            .upload_photo(file.path(), "IMG.jpg", "album1", &|_| {})
            .await;

        assert!(matches!(result, Err(DriveError::MissingSessionUri { .. })));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut mock_http = MockHttpClientImpl::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(403, "insufficient permissions")));

        let connector = DriveConnector::new(Arc::new(mock_http), "token".to_string());
        let result = connector.find_folder("x", None).await;

        assert!(matches!(
            result,
            Err(DriveError::ApiError { status_code: 403, .. })
        ));
    }
}
