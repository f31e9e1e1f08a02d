//! Dashboard operations.
//!
//! These tie the cache, filter engine and aggregator together into the two operations exposed to
//! the user interface: populating the filter dropdowns and updating the share tables.

use crate::aggregate;
use crate::dataset_cache::DatasetCache;
use crate::error::DashboardError;
use crate::filter::{self, FilterObserver};
use crate::metrics::MATCHING_POSTINGS;
use crate::models::{
    AggregateUpdate, Dataset, FilterOptions, FilterSpec, OptionsRequest, ShareTable,
};
use crate::taxonomy::SkillTaxonomy;

use std::collections::BTreeSet;

/// Shown in every table when no posting matches the filter.
pub const NO_POSTINGS_WARNING: &str = "No job postings with the selected filters!";
/// Shown when the matching postings list no skills.
pub const NO_SKILLS_WARNING: &str = "There are no skills with the selected filters!";
/// Shown when the matching postings list no coding languages.
pub const NO_CODING_LANGUAGES_WARNING: &str =
    "There are no coding languages with the selected filters!";
/// Shown when the matching postings list no cloud providers.
pub const NO_CLOUD_PROVIDERS_WARNING: &str =
    "There are no cloud providers with the selected filters!";

/// Return the status line for a number of matching postings.
fn status(matching_postings: usize) -> String {
    match matching_postings {
        0 => NO_POSTINGS_WARNING.to_string(),
        1 => "1 job posting matches the selected filters".to_string(),
        n => format!("{} job postings match the selected filters", n),
    }
}

/// Return the dropdown options for a job type and seniority selection.
///
/// The job type and seniority lists cover the whole snapshot so that a selection can always be
/// widened again. The date bounds and skills only cover postings matching the selection.
///
/// # Arguments
///
/// * `dataset`: Snapshot to derive options from
/// * `selection`: Current job type and seniority selection
/// * `warning`: Optional message to pass on to the user
pub fn filter_options(
    dataset: &Dataset,
    selection: &OptionsRequest,
    warning: Option<String>,
) -> FilterOptions {
    let job_types: BTreeSet<&str> = dataset
        .postings()
        .iter()
        .map(|posting| posting.job_type.as_str())
        .collect();
    let seniorities: BTreeSet<&str> = dataset
        .postings()
        .iter()
        .map(|posting| posting.seniority.as_str())
        .collect();

    let matching = filter::apply(dataset, &selection.to_filter_spec());
    let min_date = matching.iter().map(|posting| posting.date).min();
    let max_date = matching.iter().map(|posting| posting.date).max();
    let skills: BTreeSet<&str> = matching
        .iter()
        .flat_map(|posting| posting.skills.iter())
        .map(String::as_str)
        .filter(|skill| !skill.trim().is_empty())
        .collect();

    FilterOptions {
        dataset_id: dataset.id(),
        loaded_at: dataset.loaded_at(),
        job_types: job_types.into_iter().map(str::to_string).collect(),
        seniorities: seniorities.into_iter().map(str::to_string).collect(),
        min_date,
        max_date,
        skills: skills.into_iter().map(str::to_string).collect(),
        warning,
    }
}

/// Refresh the snapshot if it is stale, then return the dropdown options.
///
/// If the refresh fails but an older snapshot is available, the options are derived from it and
/// carry a warning. If there is no snapshot at all the failure is returned.
#[tracing::instrument(level = "DEBUG", skip(cache))]
pub async fn refresh_filter_options(
    cache: &DatasetCache,
    selection: &OptionsRequest,
) -> Result<FilterOptions, DashboardError> {
    match cache.get_dataset().await {
        Ok(dataset) => Ok(filter_options(&dataset, selection, None)),
        Err(err) => match cache.current().await {
            Some(dataset) => {
                tracing::warn!(
                    "Serving filter options from snapshot {} after failed refresh",
                    dataset.id()
                );
                let warning = format!(
                    "Job postings could not be refreshed ({}); showing data loaded at {}",
                    err,
                    dataset.loaded_at().format("%Y-%m-%d %H:%M UTC")
                );
                Ok(filter_options(&dataset, selection, Some(warning)))
            }
            None => Err(err.into()),
        },
    }
}

/// Filter the snapshot and compute the share tables.
///
/// When no posting matches, the aggregator is not run and every table carries the no-postings
/// warning. Otherwise a table without rows carries its own warning.
///
/// # Arguments
///
/// * `dataset`: Snapshot to aggregate
/// * `spec`: Filter selection
/// * `taxonomy`: Skill classification and normalisation
/// * `observer`: Optional receiver of per-stage filter diagnostics
pub fn update_aggregates(
    dataset: &Dataset,
    spec: &FilterSpec,
    taxonomy: &SkillTaxonomy,
    observer: Option<&dyn FilterObserver>,
) -> AggregateUpdate {
    let matching = filter::apply_observed(dataset, spec, observer);
    MATCHING_POSTINGS.observe(matching.len() as f64);

    let Some(result) = aggregate::compute(&matching, taxonomy) else {
        let empty = || ShareTable::Empty {
            warning: NO_POSTINGS_WARNING.to_string(),
        };
        return AggregateUpdate {
            dataset_id: dataset.id(),
            matching_postings: 0,
            status: status(0),
            job_types: empty(),
            skills: empty(),
            coding_languages: empty(),
            cloud_providers: empty(),
        };
    };

    AggregateUpdate {
        dataset_id: dataset.id(),
        matching_postings: result.total,
        status: status(result.total),
        job_types: ShareTable::from_rows(result.job_types, NO_POSTINGS_WARNING),
        skills: ShareTable::from_rows(result.skills, NO_SKILLS_WARNING),
        coding_languages: ShareTable::from_rows(
            result.coding_languages,
            NO_CODING_LANGUAGES_WARNING,
        ),
        cloud_providers: ShareTable::from_rows(result.cloud_providers, NO_CLOUD_PROVIDERS_WARNING),
    }
}
