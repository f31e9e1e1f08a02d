//! Reading job postings from the remote store.
//!
//! Postings are stored as a set of parquet objects under a common prefix, each holding the columns
//! `job_type`, `seniority`, `date` and `skills`. Columns are cast to the expected types on read, so
//! producers may use e.g. a large string or timestamp representation.

use crate::error::DataSourceError;
use crate::models::RawPosting;
use crate::resource_manager::ResourceManager;
use crate::s3_client::S3Client;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Field};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::try_join_all;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

const JOB_TYPE: &str = "job_type";
const SENIORITY: &str = "seniority";
const DATE: &str = "date";
const SKILLS: &str = "skills";

/// Source of raw job postings.
#[async_trait]
pub trait PostingReader: Send + Sync {
    /// Read every job posting.
    ///
    /// Either all postings are returned or an error; partial results are never returned.
    async fn read_all(&self) -> Result<Vec<RawPosting>, DataSourceError>;
}

/// [PostingReader] for parquet objects in an S3-compatible object store.
#[derive(Debug)]
pub struct S3PostingReader {
    /// Client for the object store
    client: S3Client,
    /// Bucket holding the objects
    bucket: String,
    /// Key prefix of the objects
    prefix: String,
    /// Limits on concurrent connections and memory
    resource_manager: Arc<ResourceManager>,
}

impl S3PostingReader {
    /// Create a reader for the parquet objects under `prefix` in `bucket`.
    pub fn new(
        client: S3Client,
        bucket: &str,
        prefix: &str,
        resource_manager: Arc<ResourceManager>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            resource_manager,
        }
    }

    /// Download and decode a single object.
    ///
    /// The caller holds the connection permit.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    async fn read_object(&self, key: &str) -> Result<Vec<RawPosting>, DataSourceError> {
        let (data, _mem_permits) = self
            .client
            .download_object(&self.bucket, key, &self.resource_manager)
            .instrument(tracing::Span::current())
            .await?;
        decode_postings(key, data)
    }
}

#[async_trait]
impl PostingReader for S3PostingReader {
    async fn read_all(&self) -> Result<Vec<RawPosting>, DataSourceError> {
        let keys = self
            .client
            .list_parquet_objects(&self.bucket, &self.prefix)
            .await?;
        if keys.is_empty() {
            return Err(DataSourceError::NoObjects {
                bucket: self.bucket.clone(),
                prefix: self.prefix.clone(),
            });
        }
        let postings =
            read_objects(&keys, &self.resource_manager, |key| self.read_object(key)).await?;
        tracing::info!(
            "Read {} job postings from {} objects",
            postings.len(),
            keys.len()
        );
        Ok(postings)
    }
}

/// Read every object in `keys` concurrently, each under an S3 connection permit.
///
/// Postings are returned in key order. The first failure fails the whole read.
async fn read_objects<'a, F, Fut>(
    keys: &'a [String],
    resource_manager: &'a ResourceManager,
    read_object: F,
) -> Result<Vec<RawPosting>, DataSourceError>
where
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<RawPosting>, DataSourceError>>,
{
    let read_object = &read_object;
    let reads = keys.iter().map(|key| async move {
        let _conn_permits = resource_manager.s3_connection().await?;
        read_object(key.as_str()).await
    });
    let objects = try_join_all(reads).await?;
    Ok(objects.into_iter().flatten().collect())
}

/// Return a column of the batch cast to `data_type`.
fn column(
    object: &str,
    batch: &RecordBatch,
    name: &'static str,
    data_type: &DataType,
) -> Result<ArrayRef, DataSourceError> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| DataSourceError::MissingColumn {
            column: name,
            object: object.to_string(),
        })?;
    Ok(cast(column.as_ref(), data_type)?)
}

/// Append the postings of one record batch to `postings`.
///
/// Returns the number of rows skipped because they have no job type or date.
fn decode_batch(
    object: &str,
    batch: &RecordBatch,
    postings: &mut Vec<RawPosting>,
) -> Result<usize, DataSourceError> {
    let skills_type = DataType::List(Arc::new(Field::new("item", DataType::Utf8, true)));
    let job_types = column(object, batch, JOB_TYPE, &DataType::Utf8)?;
    let seniorities = column(object, batch, SENIORITY, &DataType::Utf8)?;
    let dates = column(object, batch, DATE, &DataType::Date32)?;
    let skills = column(object, batch, SKILLS, &skills_type)?;

    let job_types = job_types.as_string::<i32>();
    let seniorities = seniorities.as_string::<i32>();
    let dates = dates.as_primitive::<Date32Type>();
    let skills = skills.as_list::<i32>();

    let mut skipped = 0;
    for row in 0..batch.num_rows() {
        let date = if dates.is_valid(row) {
            dates.value_as_date(row)
        } else {
            None
        };
        let (Some(date), true) = (date, job_types.is_valid(row)) else {
            skipped += 1;
            continue;
        };
        let row_skills = if skills.is_valid(row) {
            let values = skills.value(row);
            values
                .as_string::<i32>()
                .iter()
                .flatten()
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };
        postings.push(RawPosting {
            job_type: job_types.value(row).to_string(),
            seniority: seniorities
                .is_valid(row)
                .then(|| seniorities.value(row).to_string()),
            date,
            skills: row_skills,
        });
    }
    Ok(skipped)
}

/// Decode the job postings held in a parquet object.
///
/// Rows with no job type or date are skipped. A missing seniority is preserved as `None` and a
/// missing skill list becomes an empty one.
///
/// # Arguments
///
/// * `object`: Name of the object, used in errors
/// * `data`: Parquet file contents
pub fn decode_postings(object: &str, data: Bytes) -> Result<Vec<RawPosting>, DataSourceError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;
    let mut postings = Vec::new();
    let mut skipped = 0;
    for batch in reader {
        skipped += decode_batch(object, &batch?, &mut postings)?;
    }
    if skipped > 0 {
        tracing::warn!(
            "Skipped {} rows of {} with no job type or date",
            skipped,
            object
        );
    }
    Ok(postings)
}
