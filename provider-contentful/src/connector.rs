//! Contentful Management API connector implementation
//!
//! Drives the upload → create → process → publish asset pipeline and
//! composes photo collection entries.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ContentfulError, Result};
use crate::types::{
    AssetCreateRequest, AssetRef, AssetResource, CollectionEntry, Resource,
};

/// Content Management API base URL
const MANAGEMENT_API_BASE: &str = "https://api.contentful.com";

/// Binary upload host
const UPLOAD_API_BASE: &str = "https://upload.contentful.com";

/// Maximum processing poll attempts before giving up
const PROCESSING_POLL_ATTEMPTS: u32 = 20;

/// Delay between processing polls
const PROCESSING_POLL_DELAY: Duration = Duration::from_millis(500);

/// Contentful Management API connector
///
/// # Features
///
/// - Binary uploads to the dedicated upload host
/// - Asset creation with `uploadFrom` links
/// - Processing with bounded polling for completion
/// - Versioned publish operations
/// - Collection entry creation with ordered asset links
///
/// # Example
///
/// ```ignore
/// use provider_contentful::ContentfulConnector;
///
/// let connector = ContentfulConnector::new(http_client, token, space, env, locale, content_type);
/// connector.validate_token().await?;
/// let asset = connector.publish_photo(path, "IMG_0001.jpg").await?;
/// ```
pub struct ContentfulConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Content Management API token
    management_token: String,

    space_id: String,
    environment: String,
    locale: String,

    /// Content type id of collection entries
    collection_content_type: String,
}

impl ContentfulConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        management_token: impl Into<String>,
        space_id: impl Into<String>,
        environment: impl Into<String>,
        locale: impl Into<String>,
        collection_content_type: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            management_token: management_token.into(),
            space_id: space_id.into(),
            environment: environment.into(),
            locale: locale.into(),
            collection_content_type: collection_content_type.into(),
        }
    }

    fn environment_url(&self, suffix: &str) -> String {
        format!(
            "{}/spaces/{}/environments/{}{}",
            MANAGEMENT_API_BASE, self.space_id, self.environment, suffix
        )
    }

    /// Validate the management token against the configured space.
    #[instrument(skip(self))]
    pub async fn validate_token(&self) -> Result<()> {
        let url = format!("{}/spaces/{}", MANAGEMENT_API_BASE, self.space_id);
        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(&self.management_token);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| ContentfulError::TokenInvalid(e.to_string()))?;

        if !response.is_success() {
            return Err(ContentfulError::TokenInvalid(format!(
                "space lookup returned status {}",
                response.status
            )));
        }

        debug!(space_id = %self.space_id, "Contentful token validated");
        Ok(())
    }

    /// Upload a local file as a binary to the upload host.
    ///
    /// Returns the upload id used for the asset's `uploadFrom` link.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload_binary(&self, path: &Path) -> Result<String> {
        let data = tokio::fs::read(path).await?;

        let url = format!("{}/spaces/{}/uploads", UPLOAD_API_BASE, self.space_id);
        let request = HttpRequest::new(HttpMethod::Post, url)
            .bearer_token(&self.management_token)
            .header("Content-Type", "application/octet-stream")
            .body(Bytes::from(data));

        let response = self.execute(request).await?;
        let resource: Resource = parse_json(&response)?;

        debug!(upload_id = %resource.sys.id, "Binary uploaded");
        Ok(resource.sys.id)
    }

    /// Create an asset referencing an uploaded binary.
    #[instrument(skip(self))]
    pub async fn create_asset(
        &self,
        upload_id: &str,
        title: &str,
        file_name: &str,
    ) -> Result<AssetResource> {
        let body = AssetCreateRequest::from_upload(title, file_name, upload_id, &self.locale);

        let request = HttpRequest::new(HttpMethod::Post, self.environment_url("/assets"))
            .bearer_token(&self.management_token)
            .json(&body)?;

        let response = self.execute(request).await?;
        let asset: AssetResource = parse_json(&response)?;

        debug!(asset_id = %asset.sys.id, "Asset created");
        Ok(asset)
    }

    /// Ask Contentful to process the asset's file.
    #[instrument(skip(self, asset), fields(asset_id = %asset.sys.id))]
    pub async fn process_asset(&self, asset: &AssetResource) -> Result<()> {
        let url = self.environment_url(&format!(
            "/assets/{}/files/{}/process",
            asset.sys.id, self.locale
        ));

        let request = HttpRequest::new(HttpMethod::Put, url)
            .bearer_token(&self.management_token)
            .header(
                "X-Contentful-Version",
                asset.sys.version.unwrap_or(1).to_string(),
            );

        self.execute(request).await?;
        debug!("Asset processing requested");
        Ok(())
    }

    /// Poll until the asset's file URL appears, signalling that
    /// processing finished. Attempts are bounded.
    #[instrument(skip(self))]
    pub async fn wait_for_processing(&self, asset_id: &str) -> Result<AssetResource> {
        let url = self.environment_url(&format!("/assets/{}", asset_id));

        for attempt in 0..PROCESSING_POLL_ATTEMPTS {
            let request = HttpRequest::new(HttpMethod::Get, url.clone())
                .bearer_token(&self.management_token);

            let response = self.execute(request).await?;
            let asset: AssetResource = parse_json(&response)?;

            if asset.is_processed(&self.locale) {
                debug!(asset_id = asset_id, attempts = attempt + 1, "Asset processed");
                return Ok(asset);
            }

            tokio::time::sleep(PROCESSING_POLL_DELAY).await;
        }

        Err(ContentfulError::ProcessingTimeout {
            asset_id: asset_id.to_string(),
        })
    }

    /// Publish a processed asset.
    #[instrument(skip(self, asset), fields(asset_id = %asset.sys.id))]
    pub async fn publish_asset(&self, asset: &AssetResource) -> Result<AssetResource> {
        let url = self.environment_url(&format!("/assets/{}/published", asset.sys.id));

        let request = HttpRequest::new(HttpMethod::Put, url)
            .bearer_token(&self.management_token)
            .header(
                "X-Contentful-Version",
                asset.sys.version.unwrap_or(1).to_string(),
            );

        let response = self.execute(request).await?;
        let published: AssetResource = parse_json(&response)?;

        info!(asset_id = %published.sys.id, "Asset published");
        Ok(published)
    }

    /// Run the full pipeline for one photo: upload the binary, create
    /// the asset, process it, and wait for completion.
    ///
    /// Publishing is deferred until the collection is composed.
    pub async fn prepare_photo(&self, path: &Path, file_name: &str) -> Result<AssetResource> {
        let title = asset_title(file_name);

        let upload_id = self.upload_binary(path).await?;
        let asset = self.create_asset(&upload_id, title, file_name).await?;
        self.process_asset(&asset).await?;
        self.wait_for_processing(&asset.sys.id).await
    }

    /// Create a photo collection entry linking the given assets.
    ///
    /// Fields: localized title, ordered asset links, ISO-8601 date, and
    /// the first asset as featured image.
    #[instrument(skip(self, assets), fields(asset_count = assets.len()))]
    pub async fn create_collection(
        &self,
        title: &str,
        date: NaiveDateTime,
        assets: &[AssetRef],
    ) -> Result<CollectionEntry> {
        if assets.is_empty() {
            return Err(ContentfulError::EmptyCollection);
        }

        let links: Vec<serde_json::Value> = assets.iter().map(|a| a.link()).collect();
        let featured = assets[0].link();
        let locale = &self.locale;

        let body = json!({
            "fields": {
                "title": { locale: title },
                "photos": { locale: links },
                "date": { locale: date.format("%Y-%m-%dT%H:%M:%S").to_string() },
                "featuredImage": { locale: featured },
            }
        });

        let request = HttpRequest::new(HttpMethod::Post, self.environment_url("/entries"))
            .bearer_token(&self.management_token)
            .header("X-Contentful-Content-Type", &self.collection_content_type)
            .json(&body)?;

        let response = self.execute(request).await?;
        let entry: Resource = parse_json(&response)?;

        info!(entry_id = %entry.sys.id, title = title, "Collection entry created");
        Ok(CollectionEntry {
            id: entry.sys.id,
            title: title.to_string(),
        })
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(ContentfulError::Bridge)?;

        if !response.is_success() {
            let status = response.status;
            let message = String::from_utf8_lossy(&response.body).to_string();
            warn!(status = status, "Contentful API request failed");
            return Err(ContentfulError::ApiError {
                status_code: status,
                message,
            });
        }

        Ok(response)
    }
}

/// Asset title shown in Contentful: the file name without its extension.
fn asset_title(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

fn parse_json<T: serde::de::DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| ContentfulError::ParseError(format!("Failed to parse response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use mockall::mock;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClientImpl {}

        #[async_trait::async_trait]
        impl HttpClient for HttpClientImpl {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn connector(http: MockHttpClientImpl) -> ContentfulConnector {
        ContentfulConnector::new(
            Arc::new(http),
            "token",
            "space1",
            "master",
            "en-US",
            "photoCollection",
        )
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn test_asset_title_strips_one_extension() {
        assert_eq!(asset_title("rome.jpg"), "rome");
        assert_eq!(asset_title("ROME.JPG"), "ROME");
        assert_eq!(asset_title("a.jpg.jpg"), "a.jpg");
        assert_eq!(asset_title("noextension"), "noextension");
    }

    #[tokio::test]
    async fn test_validate_token_success() {
        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://api.contentful.com/spaces/space1");
            assert_eq!(
                req.headers.get("Authorization").map(String::as_str),
                Some("Bearer token")
            );
            Ok(json_response(200, r#"{"sys": {"id": "space1"}}"#))
        });

        connector(http).validate_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_validate_token_rejects_unauthorized() {
        let mut http = MockHttpClientImpl::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(401, "unauthorized")));

        let result = connector(http).validate_token().await;
        assert!(matches!(result, Err(ContentfulError::TokenInvalid(_))));
    }

    #[tokio::test]
    async fn test_upload_binary_posts_to_upload_host() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"jpeg bytes").unwrap();

        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.url, "https://upload.contentful.com/spaces/space1/uploads");
            assert_eq!(
                req.headers.get("Content-Type").map(String::as_str),
                Some("application/octet-stream")
            );
            assert_eq!(req.body.as_deref(), Some(b"jpeg bytes".as_slice()));
            Ok(json_response(201, r#"{"sys": {"id": "upload1"}}"#))
        });

        let upload_id = connector(http).upload_binary(file.path()).await.unwrap();
        assert_eq!(upload_id, "upload1");
    }

    #[tokio::test]
    async fn test_create_asset_sends_upload_link() {
        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/environments/master/assets"));
            let body: serde_json::Value =
                serde_json::from_slice(&req.body.unwrap()).unwrap();
            assert_eq!(
                body["fields"]["file"]["en-US"]["uploadFrom"]["sys"]["id"],
                "upload1"
            );
            Ok(json_response(201, r#"{"sys": {"id": "asset1", "version": 1}}"#))
        });

        let asset = connector(http)
            .create_asset("upload1", "IMG_0001", "IMG_0001.jpg")
            .await
            .unwrap();
        assert_eq!(asset.sys.id, "asset1");
    }

    #[tokio::test]
    async fn test_process_asset_sends_version_header() {
        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req
                .url
                .ends_with("/assets/asset1/files/en-US/process"));
            assert_eq!(
                req.headers.get("X-Contentful-Version").map(String::as_str),
                Some("3")
            );
            Ok(json_response(204, ""))
        });

        let asset: AssetResource = serde_json::from_value(json!({
            "sys": {"id": "asset1", "version": 3}
        }))
        .unwrap();

        connector(http).process_asset(&asset).await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_processing_polls_until_url() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(2).returning(move |_| {
            let body = if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                r#"{"sys": {"id": "asset1", "version": 2}, "fields": {"file": {"en-US": {"fileName": "a.jpg"}}}}"#
            } else {
                r#"{"sys": {"id": "asset1", "version": 3}, "fields": {"file": {"en-US": {"url": "//images/a.jpg"}}}}"#
            };
            Ok(json_response(200, body))
        });

        let asset = connector(http).wait_for_processing("asset1").await.unwrap();
        assert_eq!(asset.sys.version, Some(3));
    }

    #[tokio::test]
    async fn test_create_collection_shapes_fields() {
        let mut http = MockHttpClientImpl::new();
        http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/environments/master/entries"));
            assert_eq!(
                req.headers
                    .get("X-Contentful-Content-Type")
                    .map(String::as_str),
                Some("photoCollection")
            );
            let body: serde_json::Value =
                serde_json::from_slice(&req.body.unwrap()).unwrap();
            assert_eq!(body["fields"]["title"]["en-US"], "Rome 2023");
            assert_eq!(body["fields"]["photos"]["en-US"].as_array().unwrap().len(), 2);
            assert_eq!(
                body["fields"]["featuredImage"]["en-US"]["sys"]["id"],
                "a1"
            );
            assert_eq!(body["fields"]["date"]["en-US"], "2023-07-14T18:30:05");
            Ok(json_response(201, r#"{"sys": {"id": "entry1", "version": 1}}"#))
        });

        let assets = vec![
            AssetRef {
                id: "a1".to_string(),
                file_name: "one.jpg".to_string(),
            },
            AssetRef {
                id: "a2".to_string(),
                file_name: "two.jpg".to_string(),
            },
        ];
        let date = chrono::NaiveDate::from_ymd_opt(2023, 7, 14)
            .unwrap()
            .and_hms_opt(18, 30, 5)
            .unwrap();

        let entry = connector(http)
            .create_collection("Rome 2023", date, &assets)
            .await
            .unwrap();
        assert_eq!(entry.id, "entry1");
    }

    #[tokio::test]
    async fn test_create_collection_rejects_empty_assets() {
        let http = MockHttpClientImpl::new();
        let date = chrono::NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let result = connector(http).create_collection("Empty", date, &[]).await;
        assert!(matches!(result, Err(ContentfulError::EmptyCollection)));
    }
}
