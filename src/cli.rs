//! Command Line Interface (CLI) arguments.

use crate::taxonomy::CloudLabel;

use byte_unit::Byte;
use clap::Parser;
use url::Url;

/// Skillscope command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "SKILLSCOPE_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "SKILLSCOPE_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "SKILLSCOPE_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/skillscope/certs/cert.pem",
        env = "SKILLSCOPE_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/skillscope/certs/key.pem",
        env = "SKILLSCOPE_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "SKILLSCOPE_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Whether to enable sending traces to Jaeger.
    #[arg(long, default_value_t = false, env = "SKILLSCOPE_ENABLE_JAEGER")]
    pub enable_jaeger: bool,
    /// Whether to use Rayon for execution of filter and aggregation work.
    #[arg(long, default_value_t = false, env = "SKILLSCOPE_USE_RAYON")]
    pub use_rayon: bool,
    /// Maximum number of concurrent filter and aggregation tasks.
    /// Defaults to one less than the number of CPUs.
    #[arg(long, env = "SKILLSCOPE_THREAD_LIMIT")]
    pub thread_limit: Option<usize>,
    /// URL of the S3-compatible object store holding the job postings
    #[arg(
        long,
        default_value = "https://storage.googleapis.com",
        env = "SKILLSCOPE_STORE_URL"
    )]
    pub store_url: Url,
    /// Bucket holding the job postings
    #[arg(
        long,
        default_value = "oslo-linkedin-dataengineer-jobs",
        env = "SKILLSCOPE_BUCKET"
    )]
    pub bucket: String,
    /// Key prefix of the parquet objects holding the job postings
    #[arg(long, default_value = "transformed/", env = "SKILLSCOPE_PREFIX")]
    pub prefix: String,
    /// Object store region
    #[arg(long, default_value = "us-east-1", env = "SKILLSCOPE_REGION")]
    pub region: String,
    /// Object store access key. Anonymous access is used unless a secret key is also given.
    #[arg(long, env = "SKILLSCOPE_ACCESS_KEY")]
    pub access_key: Option<String>,
    /// Object store secret key
    #[arg(long, env = "SKILLSCOPE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
    /// Maximum time in seconds to wait for the job postings to load
    #[arg(long, default_value_t = 120, env = "SKILLSCOPE_LOAD_TIMEOUT")]
    pub load_timeout: u64,
    /// Maximum number of simultaneous outbound S3 connections.
    #[arg(long, env = "SKILLSCOPE_S3_CONNECTION_LIMIT")]
    pub connection_limit_s3: Option<usize>,
    /// Memory limit for downloaded objects, e.g. 512MiB.
    #[arg(long, env = "SKILLSCOPE_MEMORY_LIMIT", value_parser = parse_memory_limit)]
    pub memory_limit: Option<usize>,
    /// Label form used for cloud providers
    #[arg(long, value_enum, default_value_t, env = "SKILLSCOPE_CLOUD_LABEL")]
    pub cloud_label: CloudLabel,
}

/// Parse a memory limit with an optional unit, e.g. `1024`, `100MB` or `1GiB`.
fn parse_memory_limit(value: &str) -> Result<usize, String> {
    let bytes = Byte::parse_str(value, true).map_err(|err| err.to_string())?;
    usize::try_from(bytes.as_u64()).map_err(|err| err.to_string())
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
