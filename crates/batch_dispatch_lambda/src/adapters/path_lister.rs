//! Object key listing with transparent pagination.

use async_stream::try_stream;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use batch_dispatch_core::PipelineError;
use futures::stream::BoxStream;
use futures::{Stream, TryStreamExt};

pub type PathStream<'a> = BoxStream<'a, Result<String, PipelineError>>;

/// Enumerates object keys under a prefix.
///
/// The returned stream is lazy, finite and consumed once. An empty prefix
/// lists the whole bucket.
pub trait PathLister: Send + Sync {
    fn list_paths<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> PathStream<'a>;
}

pub async fn collect_paths(stream: PathStream<'_>) -> Result<Vec<String>, PipelineError> {
    stream.try_collect().await
}

/// One `ListObjectsV2` response, reduced to what the lister needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    /// Present only when the listing is truncated.
    pub next_token: Option<String>,
}

/// Fetches a single listing page, starting after `token` when given.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ListingPage, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct S3PathLister {
    client: aws_sdk_s3::Client,
}

impl S3PathLister {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for S3PathLister {
    async fn fetch_page(
        &self,
        bucket: &str,
        prefix: &str,
        token: Option<&str>,
    ) -> Result<ListingPage, PipelineError> {
        let mut request = self.client.list_objects_v2().bucket(bucket);
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|error| {
            PipelineError::access(
                format!("failed to list s3://{bucket}/{prefix}"),
                DisplayErrorContext(&error).to_string(),
            )
        })?;

        let keys = response
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_string))
            .collect();
        let next_token = match response.is_truncated() {
            Some(true) => response.next_continuation_token().map(str::to_string),
            _ => None,
        };
        Ok(ListingPage { keys, next_token })
    }
}

impl PathLister for S3PathLister {
    fn list_paths<'a>(&'a self, bucket: &'a str, prefix: &'a str) -> PathStream<'a> {
        Box::pin(list_object_keys(self, bucket, prefix))
    }
}

/// Walks continuation tokens until the source reports no further page.
pub fn list_object_keys<'a>(
    source: &'a dyn PageSource,
    bucket: &'a str,
    prefix: &'a str,
) -> impl Stream<Item = Result<String, PipelineError>> + Send + 'a {
    try_stream! {
        let mut continuation_token: Option<String> = None;

        loop {
            let page = source
                .fetch_page(bucket, prefix, continuation_token.as_deref())
                .await?;

            for key in page.keys {
                if is_listable_key(&key) {
                    yield key;
                }
            }

            continuation_token = page.next_token;
            if continuation_token.is_none() {
                break;
            }
        }
    }
}

/// Directory markers and blank keys are not files.
pub fn is_listable_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.ends_with('/')
}
