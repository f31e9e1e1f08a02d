//! This crate provides the server behind a job market dashboard. It loads scraped job postings
//! from parquet objects in an S3-compatible object store and answers two questions for the user
//! interface: which filter values are available, and which job types, skills, coding languages
//! and cloud providers are most in demand among the postings matching a filter.
//!
//! Postings are held in memory as an immutable snapshot that is reloaded when the newest posting
//! is more than a day old. Filtering and aggregation run against the snapshot without further
//! I/O.
//!
//! The server is built on top of a number of open source components.
//!
//! * [Tokio](tokio), the most popular asynchronous Rust runtime.
//! * [Axum](axum) web framework, built by the Tokio team. Axum performs well in [various](https://github.com/programatik29/rust-web-benchmarks/blob/master/result/hello-world.md) [benchmarks](https://web-frameworks-benchmark.netlify.app/result?l=rust)
//!   and is built on top of various popular components, including the [hyper] HTTP library.
//! * [Serde](serde) performs (de)serialisation of JSON request and response data.
//! * [AWS SDK for S3](aws-sdk-s3) is used to interact with S3-compatible object stores.
//! * [parquet] and [arrow] decode the job posting objects.

pub mod aggregate;
pub mod app;
pub mod app_state;
pub mod cli;
pub mod dashboard;
pub mod dataset_cache;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod models;
pub mod posting_reader;
pub mod resource_manager;
pub mod s3_client;
pub mod server;
pub mod taxonomy;
#[cfg(test)]
pub mod test_utils;
pub mod tracing;
pub mod validated_json;
