//! Contentful Management API types
//!
//! Data structures for the subset of the Content Management API the
//! connector uses: uploads, assets, and entries.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// System metadata common to all Contentful resources
#[derive(Debug, Clone, Deserialize)]
pub struct Sys {
    pub id: String,
    #[serde(default)]
    pub version: Option<u32>,
}

/// Generic resource envelope carrying only system metadata
#[derive(Debug, Clone, Deserialize)]
pub struct Resource {
    pub sys: Sys,
}

/// Asset resource with its localized file fields
#[derive(Debug, Clone, Deserialize)]
pub struct AssetResource {
    pub sys: Sys,
    #[serde(default)]
    pub fields: Value,
}

impl AssetResource {
    /// Whether processing has finished for the given locale, which
    /// Contentful signals by populating the file `url`.
    pub fn is_processed(&self, locale: &str) -> bool {
        self.fields
            .get("file")
            .and_then(|f| f.get(locale))
            .and_then(|f| f.get("url"))
            .and_then(|u| u.as_str())
            .is_some()
    }
}

/// Reference to a published asset, used for entry links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub id: String,
    pub file_name: String,
}

impl AssetRef {
    /// Build the link object used inside entry fields.
    pub fn link(&self) -> Value {
        json!({
            "sys": {
                "type": "Link",
                "linkType": "Asset",
                "id": self.id,
            }
        })
    }
}

/// A created photo collection entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub id: String,
    pub title: String,
}

/// Request body for asset creation.
#[derive(Debug, Serialize)]
pub struct AssetCreateRequest {
    pub fields: Value,
}

impl AssetCreateRequest {
    /// Build an asset pointing at an uploaded binary.
    pub fn from_upload(title: &str, file_name: &str, upload_id: &str, locale: &str) -> Self {
        Self {
            fields: json!({
                "title": { locale: title },
                "file": {
                    locale: {
                        "contentType": "image/jpeg",
                        "fileName": file_name,
                        "uploadFrom": {
                            "sys": {
                                "type": "Link",
                                "linkType": "Upload",
                                "id": upload_id,
                            }
                        }
                    }
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_processed_detection() {
        let processed: AssetResource = serde_json::from_value(json!({
            "sys": {"id": "a1", "version": 2},
            "fields": {"file": {"en-US": {"url": "//images.ctfassets.net/a1.jpg"}}}
        }))
        .unwrap();
        assert!(processed.is_processed("en-US"));
        assert!(!processed.is_processed("de-DE"));

        let pending: AssetResource = serde_json::from_value(json!({
            "sys": {"id": "a1", "version": 1},
            "fields": {"file": {"en-US": {"fileName": "a1.jpg"}}}
        }))
        .unwrap();
        assert!(!pending.is_processed("en-US"));
    }

    #[test]
    fn test_asset_ref_link_shape() {
        let asset = AssetRef {
            id: "a1".to_string(),
            file_name: "IMG.jpg".to_string(),
        };
        let link = asset.link();
        assert_eq!(link["sys"]["linkType"], "Asset");
        assert_eq!(link["sys"]["id"], "a1");
    }

    #[test]
    fn test_asset_create_request_links_upload() {
        let request = AssetCreateRequest::from_upload("IMG", "IMG.jpg", "up1", "en-US");
        let file = &request.fields["file"]["en-US"];
        assert_eq!(file["contentType"], "image/jpeg");
        assert_eq!(file["uploadFrom"]["sys"]["linkType"], "Upload");
        assert_eq!(file["uploadFrom"]["sys"]["id"], "up1");
        assert_eq!(request.fields["title"]["en-US"], "IMG");
    }
}
