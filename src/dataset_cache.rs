//! Cached job posting snapshot.
//!
//! The cache holds the most recently loaded [Dataset] and reloads it from the remote store when
//! it goes stale. Readers receive an [Arc] to an immutable snapshot, so a refresh never exposes
//! partially loaded data: the new snapshot is installed by swapping the reference once the whole
//! load has succeeded. A failed refresh leaves the previous snapshot in place.
//!
//! Refreshes happen lazily when [DatasetCache::get_dataset] is called. There is no background
//! polling.

use crate::error::DataSourceError;
use crate::metrics::{DATASET_REFRESHES, DATASET_ROWS};
use crate::models::Dataset;
use crate::posting_reader::PostingReader;

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Source of the current date.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> NaiveDate;
}

/// [Clock] reading the local wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Is the dataset stale?
///
/// A dataset is stale when its latest posting is older than yesterday. The upstream scraper
/// appends at most once per day, so data up to one day behind is tolerated. An empty dataset is
/// always stale.
///
/// # Arguments
///
/// * `dataset`: Snapshot to check
/// * `today`: Current date
pub fn is_stale(dataset: &Dataset, today: NaiveDate) -> bool {
    match (dataset.max_date(), today.pred_opt()) {
        (Some(max_date), Some(yesterday)) => max_date < yesterday,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// Owner of the job posting snapshot.
pub struct DatasetCache {
    /// Remote store reader
    reader: Box<dyn PostingReader>,
    /// Source of today's date for staleness checks
    clock: Box<dyn Clock>,
    /// Upper bound on the duration of a load
    load_timeout: Duration,
    /// Current snapshot, if one has been loaded
    snapshot: RwLock<Option<Arc<Dataset>>>,
    /// Serialises refreshes so that concurrent callers share one load.
    refresh_lock: Mutex<()>,
}

impl DatasetCache {
    /// Create an empty cache.
    ///
    /// # Arguments
    ///
    /// * `reader`: Remote store reader
    /// * `clock`: Source of today's date
    /// * `load_timeout`: Upper bound on the duration of a load
    pub fn new(
        reader: Box<dyn PostingReader>,
        clock: Box<dyn Clock>,
        load_timeout: Duration,
    ) -> Self {
        Self {
            reader,
            clock,
            load_timeout,
            snapshot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return the current snapshot without checking freshness.
    pub async fn current(&self) -> Option<Arc<Dataset>> {
        self.snapshot.read().await.clone()
    }

    /// Return a fresh snapshot, reloading first if there is none or it is stale.
    ///
    /// On failure the previous snapshot, if any, remains available through
    /// [DatasetCache::current].
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn get_dataset(&self) -> Result<Arc<Dataset>, DataSourceError> {
        if let Some(dataset) = self.fresh_snapshot().await {
            return Ok(dataset);
        }
        let _refresh_guard = self.refresh_lock.lock().await;
        // Another caller may have completed a refresh while we waited for the lock.
        if let Some(dataset) = self.fresh_snapshot().await {
            return Ok(dataset);
        }
        self.load().await
    }

    /// Reload the snapshot from the remote store unconditionally.
    #[tracing::instrument(level = "DEBUG", skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Dataset>, DataSourceError> {
        let _refresh_guard = self.refresh_lock.lock().await;
        self.load().await
    }

    /// Return the current snapshot if it is not stale.
    async fn fresh_snapshot(&self) -> Option<Arc<Dataset>> {
        let today = self.clock.today();
        self.current()
            .await
            .filter(|dataset| !is_stale(dataset, today))
    }

    /// Load a new snapshot and install it. Callers must hold the refresh lock.
    async fn load(&self) -> Result<Arc<Dataset>, DataSourceError> {
        tracing::info!("Loading job postings");
        let result = tokio::time::timeout(self.load_timeout, self.reader.read_all())
            .await
            .unwrap_or_else(|_| {
                Err(DataSourceError::Timeout {
                    seconds: self.load_timeout.as_secs(),
                })
            });
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                DATASET_REFRESHES.with_label_values(&["failure"]).inc();
                tracing::warn!("Failed to load job postings: {}", err);
                return Err(err);
            }
        };
        let dataset = Arc::new(Dataset::from_raw(raw));
        *self.snapshot.write().await = Some(dataset.clone());
        DATASET_REFRESHES.with_label_values(&["success"]).inc();
        DATASET_ROWS.set(i64::try_from(dataset.len()).unwrap_or(i64::MAX));
        tracing::info!(
            "Loaded {} job postings into snapshot {}",
            dataset.len(),
            dataset.id()
        );
        Ok(dataset)
    }
}
