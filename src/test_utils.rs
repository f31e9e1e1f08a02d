use crate::dataset_cache::Clock;
use crate::error::DataSourceError;
use crate::models::{Dataset, RawPosting};
use crate::posting_reader::PostingReader;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn raw(job_type: &str, seniority: Option<&str>, date: NaiveDate, skills: &[&str]) -> RawPosting {
    RawPosting {
        job_type: job_type.to_string(),
        seniority: seniority.map(str::to_string),
        date,
        skills: skills.iter().map(|s| s.to_string()).collect(),
    }
}

/// Create the raw postings of the small test dataset.
///
/// The last posting has no seniority.
pub(crate) fn get_test_raw_postings() -> Vec<RawPosting> {
    vec![
        raw("DataEngineer", Some("Senior"), date(2024, 1, 1), &["python", "aws"]),
        raw("DataAnalyst", Some("Junior"), date(2024, 1, 2), &["sql"]),
        raw("DataEngineer", Some("Senior"), date(2024, 1, 3), &["python", "azure"]),
        raw("DataScientist", None, date(2024, 1, 4), &["python", "sql"]),
    ]
}

/// Create the small test dataset.
pub(crate) fn get_test_dataset() -> Dataset {
    Dataset::from_raw(get_test_raw_postings())
}

/// [Clock] fixed at one date.
pub(crate) struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Default)]
struct StaticReaderState {
    loads: AtomicUsize,
    failing: AtomicBool,
    delay: Mutex<Duration>,
}

/// [PostingReader] returning a fixed set of postings.
///
/// Clones share state, so a test can keep a handle after passing a clone to a cache.
#[derive(Clone)]
pub(crate) struct StaticReader {
    postings: Vec<RawPosting>,
    state: Arc<StaticReaderState>,
}

impl StaticReader {
    pub(crate) fn new(postings: Vec<RawPosting>) -> Self {
        Self {
            postings,
            state: Arc::default(),
        }
    }

    /// Number of calls to [PostingReader::read_all] so far.
    pub(crate) fn loads(&self) -> usize {
        self.state.loads.load(Ordering::SeqCst)
    }

    /// Make subsequent reads fail with [DataSourceError::NoObjects].
    pub(crate) fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay subsequent reads.
    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl PostingReader for StaticReader {
    async fn read_all(&self) -> Result<Vec<RawPosting>, DataSourceError> {
        self.state.loads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.state.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(DataSourceError::NoObjects {
                bucket: "test".to_string(),
                prefix: "transformed/".to_string(),
            });
        }
        Ok(self.postings.clone())
    }
}
