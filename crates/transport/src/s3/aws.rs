use std::fmt;
use std::time::SystemTime;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream as Body;
use aws_sdk_s3::types::{ObjectCannedAcl, StorageClass};
use engine::{ByteStream, SyncError, SyncResult};
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use tracing::trace;

use super::bridge::{
    CopyRequest, DeleteRequest, GetRequest, ListPage, ListRequest, PutRequest, S3Bridge, S3Object,
};

/// [`S3Bridge`] backed by the AWS SDK.
///
/// The client is created on first use from the default credential chain and
/// region settings (`AWS_PROFILE`, `AWS_REGION` and friends).
#[derive(Default)]
pub struct AwsBridge {
    client: OnceCell<Client>,
}

impl AwsBridge {
    /// Creates a bridge that loads its configuration lazily.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bridge around an already configured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
                Client::new(&config)
            })
            .await
    }
}

impl fmt::Debug for AwsBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsBridge")
            .field("initialized", &self.client.initialized())
            .finish()
    }
}

fn sdk_error<E>(error: E) -> SyncError
where
    E: std::error::Error,
{
    SyncError::Provider(DisplayErrorContext(&error).to_string().into())
}

#[async_trait]
impl S3Bridge for AwsBridge {
    async fn list_objects(
        &self,
        request: &ListRequest,
        continuation: Option<String>,
    ) -> SyncResult<ListPage> {
        let output = self
            .client()
            .await
            .list_objects_v2()
            .bucket(&request.bucket)
            .set_prefix((!request.prefix.is_empty()).then(|| request.prefix.clone()))
            .set_max_keys(request.max_keys)
            .set_continuation_token(continuation)
            .send()
            .await
            .map_err(sdk_error)?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(S3Object {
                    key: object.key()?.to_owned(),
                    size: object.size().and_then(|size| u64::try_from(size).ok()),
                    last_modified: object
                        .last_modified()
                        .and_then(|time| SystemTime::try_from(*time).ok()),
                    e_tag: object.e_tag().map(str::to_owned),
                })
            })
            .collect::<Vec<_>>();
        let next = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_owned)
        } else {
            None
        };
        trace!(target: "treesync::list", objects = objects.len(), more = next.is_some(), "page");
        Ok(ListPage { objects, next })
    }

    async fn get_object(&self, request: &GetRequest) -> SyncResult<ByteStream> {
        let output = self
            .client()
            .await
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put_object(&self, request: &PutRequest, mut body: ByteStream) -> SyncResult<()> {
        // The SDK needs a sized body to sign the request.
        let mut buffer = Vec::new();
        body.read_to_end(&mut buffer)
            .await
            .map_err(SyncError::provider)?;

        self.client()
            .await
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .body(Body::from(buffer))
            .set_content_type(request.content_type.clone())
            .set_content_md5(request.content_md5.clone())
            .set_content_length(request.content_length.and_then(|len| i64::try_from(len).ok()))
            .set_content_encoding(request.content_encoding.clone())
            .set_content_disposition(request.content_disposition.clone())
            .set_cache_control(request.cache_control.clone())
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_storage_class(request.storage_class.as_deref().map(StorageClass::from))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn copy_object(&self, request: &CopyRequest) -> SyncResult<()> {
        self.client()
            .await
            .copy_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .copy_source(&request.copy_source)
            .set_acl(request.acl.as_deref().map(ObjectCannedAcl::from))
            .set_storage_class(request.storage_class.as_deref().map(StorageClass::from))
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }

    async fn delete_object(&self, request: &DeleteRequest) -> SyncResult<()> {
        self.client()
            .await
            .delete_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .send()
            .await
            .map_err(sdk_error)?;
        Ok(())
    }
}
