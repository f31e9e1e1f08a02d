//! Share table computation.
//!
//! Every percentage is relative to the number of postings aggregated, not to the sum of a table's
//! counts. A posting usually lists several skills, so skill percentages may add up to more than
//! 100.

use crate::models::{AggregateResult, JobPosting, ShareRow};
use crate::taxonomy::SkillTaxonomy;

use hashbrown::{HashMap, HashSet};

/// Return `count` as a percentage of `total`, rounded half away from zero.
///
/// `total` must be non-zero and `count` must not exceed it.
fn percentage(count: usize, total: usize) -> u8 {
    debug_assert!(total > 0 && count <= total);
    // count <= total, so the result is in 0..=100.
    (count as f64 * 100.0 / total as f64).round() as u8
}

/// Counts per label, remembering the order labels were first seen in.
#[derive(Default)]
struct Tally {
    counts: HashMap<String, usize>,
    order: Vec<String>,
}

impl Tally {
    fn add(&mut self, label: String) {
        match self.counts.get_mut(&label) {
            Some(count) => *count += 1,
            None => {
                self.order.push(label.clone());
                self.counts.insert(label, 1);
            }
        }
    }

    /// Convert into share rows ordered by count, largest first, then by label.
    fn into_rows(self, total: usize) -> Vec<ShareRow> {
        let Tally { counts, order } = self;
        let mut rows: Vec<ShareRow> = order
            .into_iter()
            .map(|label| {
                let count = counts[&label];
                ShareRow::new(label, count, percentage(count, total))
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        rows
    }
}

/// Shares of each job type.
fn job_type_shares(postings: &[&JobPosting]) -> Vec<ShareRow> {
    let mut tally = Tally::default();
    for posting in postings {
        tally.add(posting.job_type.clone());
    }
    tally.into_rows(postings.len())
}

/// Shares of each skill label.
///
/// Skills are normalised and cloud-canonicalised before grouping, so each label appears once.
/// A posting that lists the same skill in several spellings is counted once for it.
fn skill_shares(postings: &[&JobPosting], taxonomy: &SkillTaxonomy) -> Vec<ShareRow> {
    let mut tally = Tally::default();
    let mut seen = HashSet::new();
    for posting in postings {
        seen.clear();
        for label in posting.skills.iter().filter_map(|skill| taxonomy.label(skill)) {
            if seen.insert(label.clone()) {
                tally.add(label);
            }
        }
    }
    tally.into_rows(postings.len())
}

/// Compute the share tables for a set of postings.
///
/// Returns `None` if there are no postings, since no percentage can be computed.
///
/// # Arguments
///
/// * `postings`: Postings to aggregate, typically the output of [crate::filter::apply]
/// * `taxonomy`: Skill classification and normalisation
pub fn compute(postings: &[&JobPosting], taxonomy: &SkillTaxonomy) -> Option<AggregateResult> {
    if postings.is_empty() {
        return None;
    }
    let skills = skill_shares(postings, taxonomy);
    let coding_languages = skills
        .iter()
        .filter(|row| taxonomy.is_coding_language(&row.category))
        .cloned()
        .collect();
    let cloud_providers = skills
        .iter()
        .filter(|row| taxonomy.is_cloud_skill(&row.category))
        .cloned()
        .collect();
    Some(AggregateResult {
        total: postings.len(),
        job_types: job_type_shares(postings),
        skills,
        coding_languages,
        cloud_providers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dataset;
    use crate::taxonomy::CloudLabel;
    use crate::test_utils;

    use chrono::NaiveDate;

    fn posting(job_type: &str, skills: &[&str]) -> JobPosting {
        JobPosting {
            job_type: job_type.to_string(),
            seniority: "Senior".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sorted(mut rows: Vec<ShareRow>) -> Vec<ShareRow> {
        rows.sort_by(|a, b| a.category.cmp(&b.category));
        rows
    }

    #[test]
    fn percentage_rounding() {
        assert_eq!(100, percentage(2, 2));
        assert_eq!(50, percentage(1, 2));
        assert_eq!(33, percentage(1, 3));
        assert_eq!(67, percentage(2, 3));
        assert_eq!(0, percentage(0, 3));
        assert_eq!(1, percentage(1, 200));
        assert_eq!(0, percentage(1, 201));
    }

    #[test]
    fn empty_input() {
        assert_eq!(None, compute(&[], &SkillTaxonomy::default()));
    }

    #[test]
    fn whole_test_dataset() {
        let dataset = test_utils::get_test_dataset();
        let postings: Vec<&JobPosting> = dataset.postings().iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(4, result.total);
        assert_eq!(
            vec![
                ShareRow::new("DataEngineer", 2, 50),
                ShareRow::new("DataAnalyst", 1, 25),
                ShareRow::new("DataScientist", 1, 25),
            ],
            result.job_types
        );
        assert_eq!(
            vec![
                ShareRow::new("Python", 3, 75),
                ShareRow::new("Sql", 2, 50),
                ShareRow::new("Aws", 1, 25),
                ShareRow::new("Azure", 1, 25),
            ],
            result.skills
        );
        assert_eq!(
            vec![ShareRow::new("Python", 3, 75), ShareRow::new("Sql", 2, 50)],
            result.coding_languages
        );
        assert_eq!(
            vec![ShareRow::new("Aws", 1, 25), ShareRow::new("Azure", 1, 25)],
            result.cloud_providers
        );
    }

    #[test]
    fn skill_percentages_are_not_renormalised() {
        let dataset = test_utils::get_test_dataset();
        let postings: Vec<&JobPosting> = dataset.postings().iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        let sum: u32 = result.skills.iter().map(|r| u32::from(r.percentage)).sum();
        assert_eq!(175, sum);
    }

    #[test]
    fn job_type_percentages_sum_to_100() {
        let postings = [
            posting("A", &[]),
            posting("B", &[]),
            posting("C", &[]),
            posting("A", &[]),
            posting("B", &[]),
            posting("A", &[]),
            posting("D", &[]),
        ];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        let sum: i32 = result.job_types.iter().map(|r| i32::from(r.percentage)).sum();
        let tolerance = result.job_types.len() as i32;
        assert!((sum - 100).abs() <= tolerance, "sum: {sum}");
        assert_eq!(ShareRow::new("A", 3, 43), result.job_types[0]);
    }

    #[test]
    fn cloud_forms_are_merged() {
        let postings = [
            posting("DataEngineer", &["aws"]),
            posting("DataEngineer", &["Amazon Web Services"]),
            posting("DataEngineer", &["AWS", "python"]),
            posting("DataEngineer", &["gcp"]),
        ];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(
            vec![ShareRow::new("Aws", 3, 75), ShareRow::new("Gcp", 1, 25)],
            result.cloud_providers
        );
    }

    #[test]
    fn cloud_forms_are_merged_under_full_name() {
        let postings = [
            posting("DataEngineer", &["aws"]),
            posting("DataEngineer", &["amazon web services"]),
        ];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::new(CloudLabel::FullName)).unwrap();
        assert_eq!(
            vec![ShareRow::new("Amazon Web Services", 2, 100)],
            result.cloud_providers
        );
    }

    #[test]
    fn case_variants_are_merged() {
        let postings = [
            posting("DataEngineer", &["python"]),
            posting("DataEngineer", &["Python"]),
            posting("DataEngineer", &["PYTHON"]),
        ];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(vec![ShareRow::new("Python", 3, 100)], result.skills);
    }

    #[test]
    fn duplicate_skills_in_one_posting_count_once() {
        let postings = [
            posting("DataEngineer", &["python", "Python", "aws", "Amazon Web Services"]),
            posting("DataEngineer", &["sql"]),
        ];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(
            vec![
                ShareRow::new("Aws", 1, 50),
                ShareRow::new("Python", 1, 50),
                ShareRow::new("Sql", 1, 50),
            ],
            result.skills
        );
    }

    #[test]
    fn empty_skill_labels_are_dropped() {
        let postings = [posting("DataEngineer", &["", "  ", "spark"])];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(vec![ShareRow::new("Spark", 1, 100)], result.skills);
        assert!(result.coding_languages.is_empty());
        assert!(result.cloud_providers.is_empty());
    }

    #[test]
    fn postings_without_skills() {
        let postings = [posting("DataEngineer", &[]), posting("DataAnalyst", &[])];
        let postings: Vec<&JobPosting> = postings.iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(2, result.job_types.len());
        assert!(result.skills.is_empty());
    }

    #[test]
    fn duplicate_postings_are_counted() {
        let dataset = Dataset::new(vec![
            posting("DataEngineer", &["rust"]),
            posting("DataEngineer", &["rust"]),
        ]);
        let postings: Vec<&JobPosting> = dataset.postings().iter().collect();
        let result = compute(&postings, &SkillTaxonomy::default()).unwrap();
        assert_eq!(vec![ShareRow::new("DataEngineer", 2, 100)], result.job_types);
        assert_eq!(
            vec![ShareRow::new("Rust", 2, 100)],
            sorted(result.coding_languages)
        );
    }
}
