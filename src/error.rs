//! Error handling.

use arrow::error::ArrowError;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_smithy_types::byte_stream::error::Error as ByteStreamError;
use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use parquet::errors::ParquetError;
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{event, Level};

/// Errors acquiring resources from the [crate::resource_manager::ResourceManager].
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Insufficient memory to hold a downloaded object
    #[error("Insufficient memory to load object ({requested} > {total})")]
    InsufficientMemory { requested: usize, total: usize },

    /// Error acquiring a semaphore
    #[error("error acquiring resources")]
    SemaphoreAcquire(#[from] AcquireError),

    /// Error converting between integer types
    #[error(transparent)]
    TryFromInt(#[from] std::num::TryFromIntError),
}

/// Failure to load job postings from the remote store.
///
/// A refresh that fails with one of these never replaces the cached snapshot.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Error decoding columns of a parquet object
    #[error("failed to decode job posting columns")]
    Arrow(#[from] ArrowError),

    /// A required column is absent from a parquet object
    #[error("column {column} missing from object {object}")]
    MissingColumn {
        column: &'static str,
        object: String,
    },

    /// The prefix contains no parquet objects
    #[error("no parquet objects found in bucket {bucket} under prefix {prefix:?}")]
    NoObjects { bucket: String, prefix: String },

    /// Error reading a parquet object
    #[error("failed to read parquet data")]
    Parquet(#[from] ParquetError),

    /// Error acquiring download resources
    #[error("error acquiring resources for download")]
    Resource(#[from] ResourceError),

    /// Error reading object data from S3
    #[error("error receiving object from S3 storage")]
    S3ByteStream(#[from] ByteStreamError),

    /// Missing Content-Length header in S3 response.
    #[error("S3 response missing Content-Length header")]
    S3ContentLengthMissing,

    /// Error while retrieving an object from S3
    #[error("error retrieving object from S3 storage")]
    S3GetObject(#[from] SdkError<GetObjectError>),

    /// Error while listing objects in S3
    #[error("error listing objects in S3 storage")]
    S3ListObjects(#[from] SdkError<ListObjectsV2Error>),

    /// The load did not complete within the configured timeout
    #[error("loading job postings timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Dashboard server error type
///
/// This type encapsulates the various errors that may occur while serving a request.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Error loading job postings
    #[error("failed to load job postings")]
    DataSource(#[from] DataSourceError),

    /// No snapshot has been loaded yet
    #[error("job postings have not been loaded yet")]
    DatasetUnavailable,

    /// Filter selection is malformed
    #[error("invalid filter: {reason}")]
    InvalidFilterSpec { reason: &'static str },

    /// Error deserialising request data
    #[error("request data is not valid")]
    RequestDataJsonRejection(#[from] JsonRejection),

    /// Error validating request data (multiple errors)
    #[error("request data is not valid")]
    RequestDataValidation(#[from] validator::ValidationErrors),

    /// Error acquiring a task permit
    #[error("error acquiring resources")]
    Resource(#[from] ResourceError),
}

impl IntoResponse for DashboardError {
    /// Convert from a `DashboardError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// Body of error response
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorBody {
    /// Main error message
    message: String,

    /// Optional list of causes
    #[serde(skip_serializing_if = "Option::is_none")]
    caused_by: Option<Vec<String>>,
}

impl ErrorBody {
    /// Return a new ErrorBody
    ///
    /// # Arguments
    ///
    /// * `error`: The error that occurred
    fn new<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        let message = error.to_string();
        let mut causes = Vec::new();
        let mut current = error.source();
        while let Some(source) = current {
            causes.push(source.to_string());
            current = source.source();
        }
        // Remove duplicate entries.
        causes.dedup();
        let caused_by = if causes.is_empty() {
            None
        } else {
            Some(causes)
        };
        ErrorBody { message, caused_by }
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Deserialize, Serialize)]
struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Response body
    error: ErrorBody,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. This will be formatted into a suitable `ErrorBody`
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: ErrorBody::new(error),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Return a 503 service unavailable ErrorResponse
    fn service_unavailable<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, error)
    }
}

impl From<DashboardError> for ErrorResponse {
    /// Convert from a `DashboardError` into an `ErrorResponse`.
    fn from(error: DashboardError) -> Self {
        let response = match &error {
            // Bad request
            DashboardError::InvalidFilterSpec { reason: _ }
            | DashboardError::RequestDataJsonRejection(_)
            | DashboardError::RequestDataValidation(_) => Self::bad_request(&error),

            // Service unavailable: the remote store is the failing party and the request may
            // succeed once it recovers.
            DashboardError::DataSource(_) | DashboardError::DatasetUnavailable => {
                Self::service_unavailable(&error)
            }

            // Internal server error
            DashboardError::Resource(_) => Self::internal_server_error(&error),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string_pretty(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
