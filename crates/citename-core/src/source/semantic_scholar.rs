use super::{Lookup, LookupFuture, MetadataSource, SourceError, SourceKind, check_response_status};
use crate::record::{EnrichedRecord, SemanticScholarRecord};
use serde::Deserialize;
use std::time::Duration;

const API_BASE: &str = "https://api.semanticscholar.org/graph/v1/paper";
const FIELDS: &str = "title,authors,year";

/// Semantic Scholar Graph API: direct lookup by DOI or arXiv ID, and fuzzy
/// title search.
pub struct SemanticScholar {
    pub api_key: Option<String>,
    /// Minimum similarity (0..=1) for a search hit to be accepted.
    pub threshold: f64,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SemanticScholarRecord>,
}

impl MetadataSource for SemanticScholar {
    fn kind(&self) -> SourceKind {
        SourceKind::SemanticScholar
    }

    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let url = match lookup {
                Lookup::Doi(doi) => format!("{API_BASE}/DOI:{doi}?fields={FIELDS}"),
                Lookup::Arxiv(id) => format!("{API_BASE}/arXiv:{id}?fields={FIELDS}"),
                Lookup::Title(title) => format!(
                    "{API_BASE}/search?query={}&limit=1&fields={FIELDS}",
                    urlencoding::encode(title)
                ),
                Lookup::Isbn(_) => return Ok(EnrichedRecord::Empty),
            };

            let mut req = client
                .get(&url)
                .header("User-Agent", super::USER_AGENT)
                .header("Accept", "application/json")
                .timeout(timeout);

            if let Some(ref key) = self.api_key {
                req = req.header("x-api-key", key);
            }

            let resp = req.send().await?;
            check_response_status(&resp)?;
            let body = resp.text().await?;

            match lookup {
                Lookup::Title(title) => parse_search_response(&body, title, self.threshold),
                _ => parse_paper_response(&body),
            }
        })
    }
}

/// Parse a direct `/paper/{id}` body.
pub(crate) fn parse_paper_response(body: &str) -> Result<EnrichedRecord, SourceError> {
    let paper: SemanticScholarRecord =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(EnrichedRecord::SemanticScholar(paper))
}

/// Parse a `/paper/search` body, accepting the top hit only if its title is
/// similar enough to `query`.
pub(crate) fn parse_search_response(
    body: &str,
    query: &str,
    threshold: f64,
) -> Result<EnrichedRecord, SourceError> {
    let data: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    let Some(top) = data.data.into_iter().next() else {
        return Ok(EnrichedRecord::Empty);
    };

    let found = top.title.as_deref().unwrap_or("");
    let score = title_similarity(query, found);
    if score >= threshold {
        tracing::debug!(score, found, "title search hit accepted");
        Ok(EnrichedRecord::SemanticScholar(top))
    } else {
        tracing::info!(score, threshold, found, "title search hit below threshold");
        Ok(EnrichedRecord::Empty)
    }
}

/// Normalized edit-distance ratio of the lowercased titles, in `0..=1`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    rapidfuzz::fuzz::ratio(a.chars(), b.chars())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_BODY: &str = r#"{
        "total": 1,
        "offset": 0,
        "data": [
            {
                "paperId": "204e3073870fae3d05bcbc2f6a8e263d9b72e776",
                "title": "Attention is All you Need",
                "year": 2017,
                "authors": [
                    {"authorId": "40348417", "name": "Ashish Vaswani"},
                    {"authorId": "1846258", "name": "Noam M. Shazeer"}
                ]
            }
        ]
    }"#;

    #[test]
    fn similarity_is_case_insensitive() {
        assert_eq!(title_similarity("ATTENTION", "attention"), 1.0);
        assert!(title_similarity("Attention is all you need", "Quantum chromodynamics") < 0.5);
    }

    #[test]
    fn search_hit_above_threshold_is_accepted() {
        let record = parse_search_response(SEARCH_BODY, "Attention Is All You Need", 0.85).unwrap();
        let EnrichedRecord::SemanticScholar(paper) = record else {
            panic!("expected a Semantic Scholar record");
        };
        assert_eq!(paper.year, Some(2017));
        assert_eq!(paper.authors[0].name.as_deref(), Some("Ashish Vaswani"));
    }

    #[test]
    fn search_hit_below_threshold_is_empty() {
        let record =
            parse_search_response(SEARCH_BODY, "Deep residual learning for image recognition", 0.85)
                .unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn empty_search_is_empty() {
        let record = parse_search_response(r#"{"total": 0, "offset": 0}"#, "anything", 0.85).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn parses_direct_paper() {
        let body = r#"{"paperId": "abc", "title": "A Paper", "year": null, "authors": []}"#;
        let EnrichedRecord::SemanticScholar(paper) = parse_paper_response(body).unwrap() else {
            panic!("expected a Semantic Scholar record");
        };
        assert_eq!(paper.title.as_deref(), Some("A Paper"));
        assert_eq!(paper.year, None);
    }
}
