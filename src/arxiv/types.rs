//! arXiv metadata records and query options

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One paper from an arXiv Atom feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArxivEntry {
    pub id: Option<String>,
    pub arxiv_id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract", alias = "summary")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub pdf_url: Option<String>,
    pub paper_url: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub primary_category: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub comment: Option<String>,
    pub journal_ref: Option<String>,
    pub doi: Option<String>,
    /// Filled in by the thumbnail pipeline
    pub thumbnail_url: Option<String>,
}

impl ArxivEntry {
    /// PDF link, or `""` when the feed did not provide one
    pub fn pdf_link(&self) -> &str {
        self.pdf_url.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(SortBy::Relevance),
            "lastUpdatedDate" => Ok(SortBy::LastUpdatedDate),
            "submittedDate" => Ok(SortBy::SubmittedDate),
            other => Err(format!("unknown sort field: {}", other)),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(SortOrder::Ascending),
            "descending" => Ok(SortOrder::Descending),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Paging and ordering shared by search and feed queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
    pub start: u32,
    pub max_results: u32,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            start: 0,
            max_results: 10,
            sort_by: None,
            sort_order: None,
        }
    }
}

/// OR-combined `all:` clauses, or `None` when no topic survives trimming
pub fn topic_query<S: AsRef<str>>(topics: &[S]) -> Option<String> {
    let clauses: Vec<String> = topics
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .map(|t| format!("all:{}", t))
        .collect();

    if clauses.is_empty() {
        None
    } else {
        Some(clauses.join(" OR "))
    }
}

/// Split a comma separated topic list
pub fn split_topics(topics_csv: &str) -> Vec<String> {
    topics_csv
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_query_or_combines() {
        assert_eq!(
            topic_query(&["cs.AI", " quantum ", ""]).as_deref(),
            Some("all:cs.AI OR all:quantum")
        );
        assert_eq!(topic_query::<&str>(&[]), None);
        assert_eq!(topic_query(&["  ", ""]), None);
    }

    #[test]
    fn test_split_topics() {
        assert_eq!(split_topics("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_topics("").is_empty());
    }

    #[test]
    fn test_sort_round_trips_through_str() {
        for sort in [SortBy::Relevance, SortBy::LastUpdatedDate, SortBy::SubmittedDate] {
            assert_eq!(sort.as_str().parse::<SortBy>().unwrap(), sort);
        }
        assert!("newest".parse::<SortBy>().is_err());
        assert_eq!("descending".parse::<SortOrder>().unwrap(), SortOrder::Descending);
    }

    #[test]
    fn test_entry_serializes_abstract_and_accepts_summary() {
        let entry = ArxivEntry {
            abstract_text: Some("We study things.".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["abstract"], "We study things.");
        assert!(json["thumbnail_url"].is_null());

        let parsed: ArxivEntry =
            serde_json::from_str(r#"{"summary": "From the feed", "pdf_url": "x"}"#).unwrap();
        assert_eq!(parsed.abstract_text.as_deref(), Some("From the feed"));
        assert_eq!(parsed.pdf_link(), "x");
        assert!(parsed.authors.is_empty());
    }
}
