use crate::cli::CommandLineArgs;
use crate::dataset_cache::{DatasetCache, SystemClock};
use crate::posting_reader::S3PostingReader;
use crate::resource_manager::ResourceManager;
use crate::s3_client::{S3Client, S3Credentials};
use crate::taxonomy::SkillTaxonomy;

use std::sync::Arc;
use std::time::Duration;

/// Shared application state passed to each request handler.
pub struct AppState {
    /// Command line arguments.
    pub args: CommandLineArgs,

    /// Resource manager.
    pub resource_manager: Arc<ResourceManager>,

    /// Job posting snapshot.
    pub dataset_cache: DatasetCache,

    /// Skill lookup tables.
    pub taxonomy: Arc<SkillTaxonomy>,
}

impl AppState {
    /// Create and return an [AppState].
    pub async fn new(args: &CommandLineArgs) -> Self {
        let task_limit = args
            .thread_limit
            .or_else(|| Some(num_cpus::get().saturating_sub(1).max(1)));
        let resource_manager = Arc::new(ResourceManager::new(
            args.connection_limit_s3,
            args.memory_limit,
            task_limit,
        ));
        let credentials =
            S3Credentials::from_optional(args.access_key.as_deref(), args.secret_key.as_deref());
        let client = S3Client::new(&args.store_url, credentials, &args.region).await;
        let reader = S3PostingReader::new(
            client,
            &args.bucket,
            &args.prefix,
            resource_manager.clone(),
        );
        let dataset_cache = DatasetCache::new(
            Box::new(reader),
            Box::new(SystemClock),
            Duration::from_secs(args.load_timeout),
        );

        Self::with_cache(args, resource_manager, dataset_cache)
    }

    /// Create an [AppState] around an existing cache.
    pub fn with_cache(
        args: &CommandLineArgs,
        resource_manager: Arc<ResourceManager>,
        dataset_cache: DatasetCache,
    ) -> Self {
        Self {
            args: args.clone(),
            resource_manager,
            dataset_cache,
            taxonomy: Arc::new(SkillTaxonomy::new(args.cloud_label)),
        }
    }
}

/// AppState wrapped in an Atomic Reference Count (Arc) to allow multiple references.
pub type SharedAppState = Arc<AppState>;
