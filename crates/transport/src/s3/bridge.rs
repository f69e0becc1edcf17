use std::time::SystemTime;

use async_trait::async_trait;
use engine::{ByteStream, SyncResult};
use serde::{Deserialize, Serialize};

/// Object store client used by [`S3Provider`](super::S3Provider).
///
/// The provider builds the requests and the bridge sends them. Swapping the
/// bridge points the provider at another client, or at an in-memory store
/// in tests.
#[async_trait]
pub trait S3Bridge: Send + Sync {
    /// Fetches one page of a listing, starting after `continuation`.
    async fn list_objects(
        &self,
        request: &ListRequest,
        continuation: Option<String>,
    ) -> SyncResult<ListPage>;

    /// Opens the body of an object.
    async fn get_object(&self, request: &GetRequest) -> SyncResult<ByteStream>;

    /// Uploads `body` as a new object.
    async fn put_object(&self, request: &PutRequest, body: ByteStream) -> SyncResult<()>;

    /// Copies an object server side.
    async fn copy_object(&self, request: &CopyRequest) -> SyncResult<()>;

    /// Removes an object. Removing a missing object succeeds.
    async fn delete_object(&self, request: &DeleteRequest) -> SyncResult<()>;
}

/// One object from a listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct S3Object {
    /// Full object key, prefix included.
    pub key: String,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Last-modified timestamp.
    pub last_modified: Option<SystemTime>,
    /// Entity tag as returned by the store, usually wrapped in quotes.
    pub e_tag: Option<String>,
}

/// Objects of one listing page and the token of the next one.
#[derive(Clone, Debug, Default)]
pub struct ListPage {
    /// Objects in this page.
    pub objects: Vec<S3Object>,
    /// Continuation token, `None` on the last page.
    pub next: Option<String>,
}

/// Parameters of a listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct ListRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Only keys starting with this prefix are listed.
    pub prefix: String,
    /// Page size. The whole prefix is always listed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_keys: Option<i32>,
}

/// Parameters of a read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct GetRequest {
    /// Bucket holding the object.
    pub bucket: String,
    /// Full object key.
    pub key: String,
}

/// Parameters of an upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct PutRequest {
    /// Destination bucket.
    pub bucket: String,
    /// Full destination key.
    pub key: String,
    /// MIME type guessed from the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Base64 of the binary MD5 of the body.
    #[serde(
        rename = "ContentMD5",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_md5: Option<String>,
    /// Body length in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Body encoding, e.g. `gzip` for pre-compressed files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// Presentation hint for downloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// Caching directives served with the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// Canned ACL such as `public-read`.
    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    /// Storage class such as `STANDARD_IA`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Parameters of a server-side copy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct CopyRequest {
    /// Destination bucket.
    pub bucket: String,
    /// Full destination key.
    pub key: String,
    /// `bucket/key` of the object to copy.
    pub copy_source: String,
    /// Canned ACL such as `public-read`.
    #[serde(rename = "ACL", default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    /// Storage class such as `STANDARD_IA`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

/// Parameters of a removal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
pub struct DeleteRequest {
    /// Bucket holding the object.
    pub bucket: String,
    /// Full object key.
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_request_uses_store_field_names() {
        let request = PutRequest {
            bucket: "b".into(),
            key: "site/app.js".into(),
            content_type: Some("text/javascript".into()),
            content_md5: Some("1B2M2Y8AsgTpgAmY7PhCfg==".into()),
            content_length: Some(0),
            acl: Some("public-read".into()),
            ..PutRequest::default()
        };

        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({
                "Bucket": "b",
                "Key": "site/app.js",
                "ContentType": "text/javascript",
                "ContentMD5": "1B2M2Y8AsgTpgAmY7PhCfg==",
                "ContentLength": 0,
                "ACL": "public-read",
            })
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = serde_json::from_value::<DeleteRequest>(json!({
            "Bucket": "b",
            "Key": "k",
            "VersionId": "3",
        }))
        .expect_err("unknown field");
        assert!(error.to_string().contains("VersionId"));
    }
}
