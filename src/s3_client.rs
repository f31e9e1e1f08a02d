//! A simplified S3 client that supports listing and downloading objects.
//! It attempts to hide the complexities of working with the AWS SDK for S3.

use crate::error::{DataSourceError, ResourceError};
use crate::resource_manager::ResourceManager;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use bytes::{Bytes, BytesMut};
use tokio::sync::SemaphorePermit;
use tracing::Instrument;
use url::Url;

/// File name suffix of the objects holding job postings.
pub const PARQUET_SUFFIX: &str = ".parquet";

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum S3Credentials {
    AccessKey {
        access_key: String,
        secret_key: String,
    },
    None,
}

impl S3Credentials {
    /// Create an access key credential.
    pub fn access_key(access_key: &str, secret_key: &str) -> Self {
        S3Credentials::AccessKey {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Create a credential from an optional access key pair.
    ///
    /// Anonymous access is used unless both halves of the pair are given.
    pub fn from_optional(access_key: Option<&str>, secret_key: Option<&str>) -> Self {
        match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Self::access_key(access_key, secret_key),
            _ => S3Credentials::None,
        }
    }
}

/// Is the object key a parquet file?
pub fn is_parquet_key(key: &str) -> bool {
    key.ends_with(PARQUET_SUFFIX)
}

/// S3 client object.
#[derive(Clone, Debug)]
pub struct S3Client {
    /// Underlying AWS SDK S3 client object.
    client: Client,
}

impl S3Client {
    /// Creates an S3Client object
    ///
    /// # Arguments
    ///
    /// * `url`: Object storage API URL
    /// * `credentials`: Object storage account credentials
    /// * `region`: Object storage region
    pub async fn new(url: &Url, credentials: S3Credentials, region: &str) -> Self {
        let region = Region::new(region.to_string());
        let builder = aws_sdk_s3::Config::builder().behavior_version(BehaviorVersion::latest());
        let builder = match credentials {
            S3Credentials::AccessKey {
                access_key,
                secret_key,
            } => {
                let credentials = Credentials::from_keys(access_key, secret_key, None);
                builder.credentials_provider(credentials)
            }
            S3Credentials::None => builder,
        };
        let s3_config = builder
            .region(Some(region))
            .endpoint_url(url.to_string())
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);
        Self { client }
    }

    /// Lists the keys of the parquet objects under a prefix, in lexicographic order.
    ///
    /// Follows continuation tokens until the listing is complete.
    ///
    /// # Arguments
    ///
    /// * `bucket`: Name of the bucket
    /// * `prefix`: Key prefix to list
    pub async fn list_parquet_objects(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<String>, DataSourceError> {
        let mut keys = Vec::new();
        let mut continuation_token = None;
        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .instrument(tracing::Span::current())
                .await?;
            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| is_parquet_key(key))
                    .map(str::to_string),
            );
            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string())
                }
                _ => break,
            }
        }
        keys.sort();
        tracing::debug!(
            "Found {} parquet objects in bucket {} under prefix {:?}",
            keys.len(),
            bucket,
            prefix
        );
        Ok(keys)
    }

    /// Downloads an object from object storage and returns the data as Bytes
    ///
    /// Memory for the object is reserved from the resource manager before the body is read. The
    /// returned permit must be held until the data has been released.
    ///
    /// # Arguments
    ///
    /// * `bucket`: Name of the bucket
    /// * `key`: Name of the object in the bucket
    /// * `resource_manager`: ResourceManager object
    pub async fn download_object<'a>(
        &self,
        bucket: &str,
        key: &str,
        resource_manager: &'a ResourceManager,
    ) -> Result<(Bytes, Option<SemaphorePermit<'a>>), DataSourceError> {
        let mut response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .instrument(tracing::Span::current())
            .await?;
        // Fail if the content length header is missing.
        let content_length: usize = response
            .content_length()
            .ok_or(DataSourceError::S3ContentLengthMissing)?
            .try_into()
            .map_err(ResourceError::from)?;

        let mem_permits = resource_manager.memory(content_length).await?;

        let mut buf = BytesMut::with_capacity(content_length);
        // Iterate over the streaming response, copying data into the buffer.
        while let Some(bytes) = response
            .body
            .try_next()
            .instrument(tracing::Span::current())
            .await?
        {
            buf.extend_from_slice(&bytes)
        }
        Ok((buf.freeze(), mem_permits))
    }
}
