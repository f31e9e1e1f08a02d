//! Data types and associated functions and methods

use crate::error::DashboardError;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Seniority label given to postings that do not state one.
pub const SENIORITY_NOT_SPECIFIED: &str = "Mid / not specified";

/// A job posting as read from the remote store, before load-time normalisation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPosting {
    pub job_type: String,
    pub seniority: Option<String>,
    pub date: NaiveDate,
    pub skills: Vec<String>,
}

/// A single job posting.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct JobPosting {
    /// Role category
    pub job_type: String,
    /// Seniority level, never absent
    pub seniority: String,
    /// Date the posting appeared
    pub date: NaiveDate,
    /// Extracted skill tags, unnormalised. Order is irrelevant and duplicates are allowed.
    pub skills: Vec<String>,
}

impl From<RawPosting> for JobPosting {
    fn from(raw: RawPosting) -> Self {
        JobPosting {
            job_type: raw.job_type,
            seniority: raw
                .seniority
                .unwrap_or_else(|| SENIORITY_NOT_SPECIFIED.to_string()),
            date: raw.date,
            skills: raw.skills,
        }
    }
}

/// An immutable snapshot of every job posting loaded from the remote store.
///
/// Snapshots are shared between requests behind an [std::sync::Arc] and are never modified after
/// construction; a refresh builds a new one.
#[derive(Debug)]
pub struct Dataset {
    /// Unique identifier of this snapshot
    id: Uuid,
    /// When the snapshot was loaded
    loaded_at: DateTime<Utc>,
    /// Postings in load order
    postings: Vec<JobPosting>,
    /// Latest posting date, if any postings
    max_date: Option<NaiveDate>,
}

impl Dataset {
    /// Build a snapshot from raw postings, applying the seniority normalisation to every row.
    pub fn from_raw(raw: Vec<RawPosting>) -> Self {
        Self::new(raw.into_iter().map(JobPosting::from).collect())
    }

    /// Build a snapshot from already normalised postings.
    pub fn new(postings: Vec<JobPosting>) -> Self {
        let max_date = postings.iter().map(|posting| posting.date).max();
        Dataset {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            postings,
            max_date,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn postings(&self) -> &[JobPosting] {
        &self.postings
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Latest posting date in the snapshot.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.max_date
    }
}

/// An inclusive range of whole days.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DateRange {
    start: NaiveDate,
    /// First day after the range. `None` if the range ends on the last representable day.
    end_exclusive: Option<NaiveDate>,
}

impl DateRange {
    /// Return a range covering `start` up to and including the whole of `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start,
            end_exclusive: end.succ_opt(),
        }
    }

    /// Does the range contain `date`?
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end_exclusive.map_or(true, |end| date < end)
    }
}

/// Filter selection for an aggregate update.
///
/// Every set is a no-op when empty. Required skills use subset semantics: a posting must carry
/// all of them.
// NOTE: Dates deserialise from `YYYY-MM-DD` strings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSpec {
    /// Accepted job types
    #[validate(
        length(max = 256, message = "too many job types"),
        custom = "validate_labels"
    )]
    pub job_types: BTreeSet<String>,
    /// Accepted seniorities
    #[validate(
        length(max = 256, message = "too many seniorities"),
        custom = "validate_labels"
    )]
    pub seniorities: BTreeSet<String>,
    /// First day of the date range
    pub date_start: Option<NaiveDate>,
    /// Last day of the date range, inclusive
    pub date_end: Option<NaiveDate>,
    /// Skills every posting must list
    #[validate(
        length(max = 256, message = "too many required skills"),
        custom = "validate_labels"
    )]
    pub required_skills: BTreeSet<String>,
}

impl FilterSpec {
    /// Return the date range of the filter, if any.
    ///
    /// Both bounds must be given. A single bound is reported as
    /// [DashboardError::InvalidFilterSpec] so that callers can decide how to recover.
    pub fn date_range(&self) -> Result<Option<DateRange>, DashboardError> {
        match (self.date_start, self.date_end) {
            (Some(start), Some(end)) => Ok(Some(DateRange::new(start, end))),
            (None, None) => Ok(None),
            (Some(_), None) => Err(DashboardError::InvalidFilterSpec {
                reason: "date_start given without date_end",
            }),
            (None, Some(_)) => Err(DashboardError::InvalidFilterSpec {
                reason: "date_end given without date_start",
            }),
        }
    }
}

/// Current dropdown selection sent when filter options are requested.
///
/// Only the job type and seniority selections influence the options.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsRequest {
    /// Selected job types
    #[validate(
        length(max = 256, message = "too many job types"),
        custom = "validate_labels"
    )]
    pub job_types: BTreeSet<String>,
    /// Selected seniorities
    #[validate(
        length(max = 256, message = "too many seniorities"),
        custom = "validate_labels"
    )]
    pub seniorities: BTreeSet<String>,
}

impl OptionsRequest {
    /// Return a [FilterSpec] restricted to the job type and seniority selection.
    pub fn to_filter_spec(&self) -> FilterSpec {
        FilterSpec {
            job_types: self.job_types.clone(),
            seniorities: self.seniorities.clone(),
            ..Default::default()
        }
    }
}

/// Validate that no filter value is empty
fn validate_labels(labels: &BTreeSet<String>) -> Result<(), ValidationError> {
    if labels.iter().any(|label| label.trim().is_empty()) {
        return Err(ValidationError::new("filter values must not be empty"));
    }
    Ok(())
}

/// One row of a share table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShareRow {
    /// Category label
    pub category: String,
    /// Number of postings in the category
    pub count: usize,
    /// `count` as a rounded percentage of the filtered posting count
    pub percentage: u8,
}

impl ShareRow {
    pub fn new(category: impl Into<String>, count: usize, percentage: u8) -> Self {
        ShareRow {
            category: category.into(),
            count,
            percentage,
        }
    }
}

/// Share tables computed by the aggregator for a non-empty set of postings.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateResult {
    /// Number of postings the percentages are relative to
    pub total: usize,
    /// Shares by job type
    pub job_types: Vec<ShareRow>,
    /// Shares by normalised skill
    pub skills: Vec<ShareRow>,
    /// Skill shares restricted to coding languages
    pub coding_languages: Vec<ShareRow>,
    /// Skill shares restricted to cloud providers
    pub cloud_providers: Vec<ShareRow>,
}

/// A share table as presented to the rendering layer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShareTable {
    /// Rows to render
    Rows { rows: Vec<ShareRow> },
    /// Nothing to render, show the warning instead
    Empty { warning: String },
}

impl ShareTable {
    /// Return the rows, or the warning if there are none.
    pub fn from_rows(rows: Vec<ShareRow>, warning: &str) -> Self {
        if rows.is_empty() {
            ShareTable::Empty {
                warning: warning.to_string(),
            }
        } else {
            ShareTable::Rows { rows }
        }
    }

    /// Rows of the table; empty for [ShareTable::Empty].
    pub fn rows(&self) -> &[ShareRow] {
        match self {
            ShareTable::Rows { rows } => rows,
            ShareTable::Empty { warning: _ } => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ShareTable::Empty { warning: _ })
    }
}

/// Response to an aggregate update request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AggregateUpdate {
    /// Snapshot the aggregates were computed from
    pub dataset_id: Uuid,
    /// Number of postings matching the filter
    pub matching_postings: usize,
    /// Human readable status line
    pub status: String,
    pub job_types: ShareTable,
    pub skills: ShareTable,
    pub coding_languages: ShareTable,
    pub cloud_providers: ShareTable,
}

/// Response to a filter options request.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FilterOptions {
    /// Snapshot the options were derived from
    pub dataset_id: Uuid,
    /// When the snapshot was loaded
    pub loaded_at: DateTime<Utc>,
    /// Every job type in the snapshot
    pub job_types: Vec<String>,
    /// Every seniority in the snapshot
    pub seniorities: Vec<String>,
    /// Earliest posting date matching the selection
    pub min_date: Option<NaiveDate>,
    /// Latest posting date matching the selection
    pub max_date: Option<NaiveDate>,
    /// Distinct skill tags of postings matching the selection
    pub skills: Vec<String>,
    /// Set when the snapshot could not be refreshed and older data is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_de_tokens, assert_de_tokens_error, Token};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn raw_posting_without_seniority() {
        let raw = RawPosting {
            job_type: "DataEngineer".to_string(),
            seniority: None,
            date: date(2024, 1, 1),
            skills: vec![],
        };
        let posting = JobPosting::from(raw);
        assert_eq!(SENIORITY_NOT_SPECIFIED, posting.seniority);
    }

    #[test]
    fn raw_posting_with_seniority() {
        let raw = RawPosting {
            job_type: "DataEngineer".to_string(),
            seniority: Some("Senior".to_string()),
            date: date(2024, 1, 1),
            skills: vec!["python".to_string()],
        };
        let posting = JobPosting::from(raw);
        assert_eq!("Senior", posting.seniority);
        assert_eq!(vec!["python".to_string()], posting.skills);
    }

    #[test]
    fn dataset_max_date() {
        let raw = [date(2024, 1, 3), date(2024, 1, 5), date(2024, 1, 1)]
            .into_iter()
            .map(|d| RawPosting {
                job_type: "DataAnalyst".to_string(),
                seniority: None,
                date: d,
                skills: vec![],
            })
            .collect();
        let dataset = Dataset::from_raw(raw);
        assert_eq!(3, dataset.len());
        assert_eq!(Some(date(2024, 1, 5)), dataset.max_date());
        assert!(dataset
            .postings()
            .iter()
            .all(|p| p.seniority == SENIORITY_NOT_SPECIFIED));
    }

    #[test]
    fn empty_dataset() {
        let dataset = Dataset::new(vec![]);
        assert!(dataset.is_empty());
        assert_eq!(None, dataset.max_date());
    }

    #[test]
    fn snapshots_have_distinct_ids() {
        assert_ne!(Dataset::new(vec![]).id(), Dataset::new(vec![]).id());
    }

    #[test]
    fn date_range_includes_whole_end_day() {
        let range = DateRange::new(date(2024, 1, 2), date(2024, 1, 3));
        assert!(!range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 2)));
        assert!(range.contains(date(2024, 1, 3)));
        assert!(!range.contains(date(2024, 1, 4)));
    }

    #[test]
    fn date_range_single_day() {
        let range = DateRange::new(date(2024, 1, 2), date(2024, 1, 2));
        assert!(range.contains(date(2024, 1, 2)));
        assert!(!range.contains(date(2024, 1, 3)));
    }

    #[test]
    fn date_range_at_end_of_calendar() {
        let range = DateRange::new(date(2024, 1, 2), NaiveDate::MAX);
        assert!(range.contains(NaiveDate::MAX));
    }

    #[test]
    fn filter_spec_date_range() {
        let mut spec = FilterSpec::default();
        assert_eq!(None, spec.date_range().unwrap());
        spec.date_start = Some(date(2024, 1, 2));
        assert!(matches!(
            spec.date_range(),
            Err(DashboardError::InvalidFilterSpec { reason: _ })
        ));
        spec.date_end = Some(date(2024, 1, 3));
        assert_eq!(
            Some(DateRange::new(date(2024, 1, 2), date(2024, 1, 3))),
            spec.date_range().unwrap()
        );
        spec.date_start = None;
        assert!(spec.date_range().is_err());
    }

    #[test]
    fn options_request_to_filter_spec() {
        let request = OptionsRequest {
            job_types: BTreeSet::from(["DataEngineer".to_string()]),
            seniorities: BTreeSet::from(["Senior".to_string()]),
        };
        let spec = request.to_filter_spec();
        assert_eq!(request.job_types, spec.job_types);
        assert_eq!(request.seniorities, spec.seniorities);
        assert!(spec.required_skills.is_empty());
        assert_eq!(None, spec.date_start);
    }

    // The following tests use serde_test to validate the correct function of the deserialiser.
    // The validations are also tested.

    #[test]
    fn test_empty_filter_spec() {
        let spec = FilterSpec::default();
        assert_de_tokens(
            &spec,
            &[
                Token::Struct {
                    name: "FilterSpec",
                    len: 0,
                },
                Token::StructEnd,
            ],
        );
        spec.validate().unwrap()
    }

    #[test]
    fn test_full_filter_spec() {
        let spec = FilterSpec {
            job_types: BTreeSet::from(["DataEngineer".to_string()]),
            seniorities: BTreeSet::from(["Junior".to_string(), "Senior".to_string()]),
            date_start: Some(date(2024, 1, 2)),
            date_end: Some(date(2024, 1, 3)),
            required_skills: BTreeSet::from(["python".to_string(), "sql".to_string()]),
        };
        assert_de_tokens(
            &spec,
            &[
                Token::Struct {
                    name: "FilterSpec",
                    len: 5,
                },
                Token::Str("job_types"),
                Token::Seq { len: Some(1) },
                Token::Str("DataEngineer"),
                Token::SeqEnd,
                Token::Str("seniorities"),
                Token::Seq { len: Some(2) },
                Token::Str("Junior"),
                Token::Str("Senior"),
                Token::SeqEnd,
                Token::Str("date_start"),
                Token::Some,
                Token::Str("2024-01-02"),
                Token::Str("date_end"),
                Token::Some,
                Token::Str("2024-01-03"),
                Token::Str("required_skills"),
                Token::Seq { len: Some(2) },
                Token::Str("sql"),
                Token::Str("python"),
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
        spec.validate().unwrap()
    }

    #[test]
    fn test_unknown_field() {
        assert_de_tokens_error::<FilterSpec>(
            &[
                Token::Struct {
                    name: "FilterSpec",
                    len: 1,
                },
                Token::Str("colour"),
            ],
            "unknown field `colour`, expected one of `job_types`, `seniorities`, `date_start`, `date_end`, `required_skills`",
        )
    }

    #[test]
    fn test_invalid_date() {
        assert_de_tokens_error::<FilterSpec>(
            &[
                Token::Struct {
                    name: "FilterSpec",
                    len: 1,
                },
                Token::Str("date_start"),
                Token::Some,
                Token::Str("2024-13-01"),
            ],
            "input is out of range",
        )
    }

    #[test]
    #[should_panic(expected = "filter values must not be empty")]
    fn test_empty_required_skill() {
        let spec = FilterSpec {
            required_skills: BTreeSet::from(["".to_string()]),
            ..Default::default()
        };
        spec.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "too many job types")]
    fn test_too_many_job_types() {
        let spec = FilterSpec {
            job_types: (0..=256).map(|i| format!("job{i}")).collect(),
            ..Default::default()
        };
        spec.validate().unwrap()
    }

    #[test]
    #[should_panic(expected = "filter values must not be empty")]
    fn test_blank_seniority_in_options_request() {
        let request = OptionsRequest {
            seniorities: BTreeSet::from(["  ".to_string()]),
            ..Default::default()
        };
        request.validate().unwrap()
    }

    #[test]
    fn share_table_from_rows() {
        let table = ShareTable::from_rows(vec![], "nothing");
        assert!(table.is_empty());
        assert!(table.rows().is_empty());
        let table = ShareTable::from_rows(vec![ShareRow::new("Python", 1, 100)], "nothing");
        assert!(!table.is_empty());
        assert_eq!(&[ShareRow::new("Python", 1, 100)][..], table.rows());
    }

    #[test]
    fn share_table_serialisation() {
        let table = ShareTable::Empty {
            warning: "nothing".to_string(),
        };
        assert_eq!(
            r#"{"status":"empty","warning":"nothing"}"#,
            serde_json::to_string(&table).unwrap()
        );
        let table = ShareTable::Rows {
            rows: vec![ShareRow::new("Python", 2, 100)],
        };
        assert_eq!(
            r#"{"status":"rows","rows":[{"category":"Python","count":2,"percentage":100}]}"#,
            serde_json::to_string(&table).unwrap()
        );
    }
}
