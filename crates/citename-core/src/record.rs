//! Records returned by the metadata sources.
//!
//! Each source has its own shape; [`EnrichedRecord`] tags which one was
//! returned so the reconciler can match on it instead of probing keys.

use serde::Deserialize;

/// A metadata record from exactly one source, or nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EnrichedRecord {
    Crossref(CrossrefRecord),
    SemanticScholar(SemanticScholarRecord),
    Arxiv(ArxivRecord),
    OpenLibrary(OpenLibraryRecord),
    #[default]
    Empty,
}

impl EnrichedRecord {
    pub fn is_empty(&self) -> bool {
        matches!(self, EnrichedRecord::Empty)
    }
}

/// The `message` object of a CrossRef `/works/{doi}` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CrossrefRecord {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub author: Vec<CrossrefAuthor>,
    #[serde(rename = "published-print")]
    pub published_print: Option<CrossrefDate>,
    #[serde(rename = "published-online")]
    pub published_online: Option<CrossrefDate>,
    pub created: Option<CrossrefDate>,
    pub deposited: Option<CrossrefDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CrossrefAuthor {
    pub given: Option<String>,
    pub family: Option<String>,
    /// Organizational authors carry only a name.
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CrossrefDate {
    /// `[[year, month, day]]`; CrossRef emits `[[null]]` for unknown dates.
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i64>>>,
}

impl CrossrefDate {
    pub fn year(&self) -> Option<i64> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

/// A Semantic Scholar paper (direct lookup or top search hit).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SemanticScholarRecord {
    #[serde(rename = "paperId")]
    pub paper_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<SemanticScholarAuthor>,
    pub year: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SemanticScholarAuthor {
    pub name: Option<String>,
}

/// The first `<entry>` of an arXiv Atom feed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArxivRecord {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub published: Option<String>,
}

/// The `ISBN:<isbn>` member of an Open Library `/api/books` response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OpenLibraryRecord {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<OpenLibraryAuthor>,
    pub publish_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OpenLibraryAuthor {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossref_date_parts_with_nulls() {
        let date: CrossrefDate = serde_json::from_str(r#"{"date-parts": [[null]]}"#).unwrap();
        assert_eq!(date.year(), None);

        let date: CrossrefDate =
            serde_json::from_str(r#"{"date-parts": [[2013, 5, 2]]}"#).unwrap();
        assert_eq!(date.year(), Some(2013));
    }

    #[test]
    fn crossref_record_tolerates_missing_fields() {
        let record: CrossrefRecord = serde_json::from_str(r#"{"DOI": "10.1/x"}"#).unwrap();
        assert!(record.title.is_empty());
        assert!(record.author.is_empty());
        assert!(record.published_print.is_none());
    }
}
