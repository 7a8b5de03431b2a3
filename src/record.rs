//! Publication records and the fixed output schema.
//!
//! A [`RawPublication`] is whatever a search provider managed to extract;
//! every field is optional. A [`Record`] is the normalized fixed-shape row,
//! with missing values replaced by [`NOT_AVAILABLE`].

use serde::{Deserialize, Serialize};

/// Placeholder for any field the provider did not return.
pub const NOT_AVAILABLE: &str = "N/A";

/// Column order for the standard output schema
pub const STANDARD_COLUMNS: &[&str] = &[
    "keyword",
    "title",
    "authors",
    "year",
    "source title",
    "DOI",
    "link",
    "abstract",
    "author keywords",
    "index keywords",
];

/// Extra columns appended by the extended schema
pub const EXTENDED_COLUMNS: &[&str] = &["aim", "expected output", "explainability"];

/// Bibliographic fields as exposed by a search provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPublication {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pub_year: Option<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
    pub abstract_text: Option<String>,
    pub pub_url: Option<String>,
    /// Author-supplied keywords (comma-separated), when the provider has them
    pub keywords: Option<String>,
    /// Indexer-assigned subject terms, when the provider has them
    pub index_terms: Option<String>,
}

/// One normalized publication row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub keyword: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub source_title: String,
    pub doi: String,
    pub link: String,
    pub abstract_text: String,
    pub author_keywords: String,
    pub index_keywords: String,
    pub aim: String,
    pub expected_output: String,
    pub explainability: String,
}

impl Default for Record {
    fn default() -> Self {
        let na = || NOT_AVAILABLE.to_string();
        Self {
            keyword: na(),
            title: na(),
            authors: na(),
            year: na(),
            source_title: na(),
            doi: na(),
            link: na(),
            abstract_text: na(),
            author_keywords: na(),
            index_keywords: na(),
            aim: na(),
            expected_output: na(),
            explainability: na(),
        }
    }
}

/// Substitute the sentinel for absent values.
///
/// Present-but-empty strings are kept as-is; only absence is substituted.
fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

impl Record {
    /// Normalize a raw provider item into a row attributed to `keyword`.
    pub fn from_raw(keyword: &str, raw: RawPublication) -> Self {
        Self {
            keyword: keyword.to_string(),
            title: or_na(raw.title),
            authors: or_na(raw.author),
            year: or_na(raw.pub_year),
            source_title: or_na(raw.venue),
            doi: or_na(raw.doi),
            link: or_na(raw.pub_url),
            abstract_text: or_na(raw.abstract_text),
            author_keywords: or_na(raw.keywords),
            index_keywords: or_na(raw.index_terms),
            ..Default::default()
        }
    }

    /// Field values in the column order of `schema`.
    pub fn values(&self, schema: Schema) -> Vec<&str> {
        let mut row = vec![
            self.keyword.as_str(),
            self.title.as_str(),
            self.authors.as_str(),
            self.year.as_str(),
            self.source_title.as_str(),
            self.doi.as_str(),
            self.link.as_str(),
            self.abstract_text.as_str(),
            self.author_keywords.as_str(),
            self.index_keywords.as_str(),
        ];
        if schema == Schema::Extended {
            row.extend([
                self.aim.as_str(),
                self.expected_output.as_str(),
                self.explainability.as_str(),
            ]);
        }
        row
    }
}

/// Output schema variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Schema {
    /// The ten bibliographic columns
    #[default]
    Standard,
    /// Standard columns plus aim / expected output / explainability
    Extended,
}

impl Schema {
    /// Header row for this schema
    pub fn columns(self) -> Vec<&'static str> {
        let mut cols = STANDARD_COLUMNS.to_vec();
        if self == Schema::Extended {
            cols.extend_from_slice(EXTENDED_COLUMNS);
        }
        cols
    }
}
