//! Filter engine.
//!
//! Narrows a [Dataset] to the postings matching a [FilterSpec]. Each dimension of the filter is an
//! independent predicate; a posting must satisfy all of them. Stages whose spec field is empty are
//! skipped entirely.

use crate::models::{Dataset, FilterSpec, JobPosting};

use strum_macros::Display;

/// Stages of the filter chain, in the order they are applied.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum FilterStage {
    JobType,
    Seniority,
    DateRange,
    RequiredSkills,
}

/// Receives diagnostics while a filter is applied.
pub trait FilterObserver {
    /// Called after a stage has been applied with the number of postings that remain.
    fn stage_applied(&self, stage: FilterStage, remaining: usize);

    /// Called when the date filter is ignored because only one bound was given.
    fn date_range_ignored(&self, reason: &str);
}

/// [FilterObserver] that emits tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl FilterObserver for TracingObserver {
    fn stage_applied(&self, stage: FilterStage, remaining: usize) {
        tracing::debug!(%stage, remaining, "filter stage applied");
    }

    fn date_range_ignored(&self, reason: &str) {
        tracing::warn!("ignoring date filter: {}", reason);
    }
}

/// Return the postings of `dataset` matching `spec`.
///
/// The dataset is not modified. An empty result is not an error.
pub fn apply<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Vec<&'a JobPosting> {
    apply_observed(dataset, spec, None)
}

/// Return the postings of `dataset` matching `spec`, reporting each stage to `observer`.
///
/// # Arguments
///
/// * `dataset`: Postings to filter
/// * `spec`: Filter selection
/// * `observer`: Optional receiver of per-stage diagnostics
pub fn apply_observed<'a>(
    dataset: &'a Dataset,
    spec: &FilterSpec,
    observer: Option<&dyn FilterObserver>,
) -> Vec<&'a JobPosting> {
    let mut postings: Vec<&JobPosting> = dataset.postings().iter().collect();

    let mut narrow = |stage: FilterStage, predicate: &dyn Fn(&JobPosting) -> bool| {
        postings.retain(|posting| predicate(*posting));
        if let Some(observer) = observer {
            observer.stage_applied(stage, postings.len());
        }
    };

    if !spec.job_types.is_empty() {
        narrow(FilterStage::JobType, &|posting| {
            spec.job_types.contains(&posting.job_type)
        });
    }

    if !spec.seniorities.is_empty() {
        narrow(FilterStage::Seniority, &|posting| {
            spec.seniorities.contains(&posting.seniority)
        });
    }

    // A half-open date selection is tolerated and leaves the date dimension unrestricted.
    match spec.date_range() {
        Ok(Some(range)) => narrow(FilterStage::DateRange, &|posting| {
            range.contains(posting.date)
        }),
        Ok(None) => (),
        Err(err) => {
            if let Some(observer) = observer {
                observer.date_range_ignored(&err.to_string());
            }
        }
    }

    if !spec.required_skills.is_empty() {
        narrow(FilterStage::RequiredSkills, &|posting| {
            spec.required_skills
                .iter()
                .all(|skill| posting.skills.contains(skill))
        });
    }

    postings
}
