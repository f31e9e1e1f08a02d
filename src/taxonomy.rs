//! Skill taxonomy and normalisation.
//!
//! Skill tags are free text. Before they are grouped or classified every tag is title-cased, so
//! the reference data below is written in title case too. Cloud providers may be tagged either by
//! abbreviation or by full name; both forms are mapped onto one label.

use clap::ValueEnum;
use hashbrown::{HashMap, HashSet};
use strum_macros::Display;

/// Coding languages, title-cased.
const CODING_LANGUAGES: [&str; 50] = [
    "Python",
    "Javascript",
    "Java",
    "C++",
    "C#",
    "Php",
    "Ruby",
    "Swift",
    "Kotlin",
    "Typescript",
    "Go",
    "Rust",
    "Sql",
    "R",
    "Html",
    "Css",
    "Bash",
    "Perl",
    "Objective-C",
    "Scala",
    "Lua",
    "Haskell",
    "Matlab",
    "Dart",
    "Visual Basic .Net",
    "Assembly Language",
    "F#",
    "Groovy",
    "Elixir",
    "Clojure",
    "Erlang",
    "Julia",
    "Vbscript",
    "Lisp",
    "Prolog",
    "Scheme",
    "Ada",
    "Fortran",
    "Cobol",
    "Pascal",
    "Racket",
    "Scratch",
    "Tcl",
    "Smalltalk",
    "Actionscript",
    "Awk",
    "Ocaml",
    "Pl/Sql",
    "Sas",
    "Logo",
];

/// Cloud providers as (abbreviation, full name), title-cased.
const CLOUD_PROVIDERS: [(&str, &str); 8] = [
    ("Aws", "Amazon Web Services"),
    ("Gcp", "Google Cloud Platform"),
    ("Azure", "Microsoft Azure"),
    ("Ibm", "Ibm Cloud"),
    ("Oci", "Oracle Cloud"),
    ("Sf", "Salesforce"),
    ("Sap", "Sap Cloud"),
    ("Do", "Digitalocean"),
];

/// Which form of a cloud provider name is used as its label.
#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, ValueEnum)]
#[strum(serialize_all = "kebab-case")]
pub enum CloudLabel {
    /// Short code, e.g. `Aws`
    #[default]
    Abbreviation,
    /// Full name, e.g. `Amazon Web Services`
    FullName,
}

/// Title-case a skill tag.
///
/// The first alphanumeric character following a non-alphanumeric character (or the start of the
/// string) is upper-cased, every other character is lower-cased. Characters whose case mapping is
/// not a single character are left as they are, which keeps the function idempotent.
pub fn normalize(skill: &str) -> String {
    let mut normalized = String::with_capacity(skill.len());
    let mut word_start = true;
    for c in skill.chars() {
        let mapped = if word_start {
            single_char(c.to_uppercase())
        } else {
            single_char(c.to_lowercase())
        };
        normalized.push(mapped.unwrap_or(c));
        word_start = !c.is_alphanumeric();
    }
    normalized
}

/// Return the only character of a case mapping, or `None` if it expands to several.
fn single_char(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let first = mapping.next()?;
    match mapping.next() {
        None => Some(first),
        Some(_) => None,
    }
}

/// Lookup tables for classifying skills.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug)]
pub struct SkillTaxonomy {
    /// Title-cased coding languages
    coding_languages: HashSet<&'static str>,
    /// Either form of a cloud provider name, mapped to its (abbreviation, full name) pair
    cloud_providers: HashMap<&'static str, (&'static str, &'static str)>,
    /// Label form used for cloud providers
    cloud_label: CloudLabel,
}

impl SkillTaxonomy {
    /// Create a taxonomy labelling cloud providers with the given form.
    pub fn new(cloud_label: CloudLabel) -> Self {
        let coding_languages = CODING_LANGUAGES.into_iter().collect();
        let mut cloud_providers = HashMap::with_capacity(2 * CLOUD_PROVIDERS.len());
        for pair @ (abbreviation, full_name) in CLOUD_PROVIDERS {
            cloud_providers.insert(abbreviation, pair);
            cloud_providers.insert(full_name, pair);
        }
        Self {
            coding_languages,
            cloud_providers,
            cloud_label,
        }
    }

    /// Map a normalised cloud provider name onto its configured label form.
    ///
    /// Skills that are not cloud providers are returned unchanged.
    pub fn canonicalize_cloud(&self, skill: &str) -> String {
        match self.cloud_providers.get(skill) {
            Some((abbreviation, full_name)) => match self.cloud_label {
                CloudLabel::Abbreviation => abbreviation.to_string(),
                CloudLabel::FullName => full_name.to_string(),
            },
            None => skill.to_string(),
        }
    }

    /// Return the grouping label of a raw skill tag: normalised, then cloud-canonicalised.
    ///
    /// Returns `None` for tags that are empty or only whitespace.
    pub fn label(&self, skill: &str) -> Option<String> {
        if skill.trim().is_empty() {
            return None;
        }
        Some(self.canonicalize_cloud(&normalize(skill)))
    }

    /// Is the skill a coding language?
    pub fn is_coding_language(&self, skill: &str) -> bool {
        self.coding_languages.contains(normalize(skill).as_str())
    }

    /// Is the skill a cloud provider, in either abbreviated or full form?
    pub fn is_cloud_skill(&self, skill: &str) -> bool {
        self.cloud_providers.contains_key(normalize(skill).as_str())
    }
}

impl Default for SkillTaxonomy {
    fn default() -> Self {
        Self::new(CloudLabel::default())
    }
}
