//! Field reconciliation: decide the final author, year and title for a file
//! from the enrichment records, the PDF's own metadata and the heuristic
//! page-1 title.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::DocumentMetadata;
use crate::identifiers::{ARTICLE_ID_RE, IdentifierSet};
use crate::record::{CrossrefRecord, EnrichedRecord};
use crate::resolver::Enrichment;
use crate::text::{collapse_whitespace, fix_case};

pub const UNKNOWN_AUTHOR: &str = "UnknownAuthor";
pub const UNKNOWN_YEAR: &str = "UnknownYear";
pub const UNKNOWN_TITLE: &str = "UnknownTitle";

const NAME_PREFIXES: &[&str] = &["dr.", "dr", "prof.", "prof", "professor", "mr.", "ms.", "mrs."];
const NAME_SUFFIXES: &[&str] = &["ph.d.", "phd", "m.d.", "md", "jr.", "jr", "sr.", "sr", "iii", "ii"];

/// The final author/year/title for one file. Unresolved fields hold their
/// `Unknown*` sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub author: String,
    pub year: String,
    pub title: String,
}

impl ResolvedFields {
    /// True if any field is still its sentinel. Such files always go to the
    /// review folder.
    pub fn has_sentinel(&self) -> bool {
        self.author == UNKNOWN_AUTHOR || self.year == UNKNOWN_YEAR || self.title == UNKNOWN_TITLE
    }
}

/// Reduce an author string to a surname.
///
/// Honorifics are removed as whole tokens. "Last, First" yields the part
/// before the first comma; otherwise the last whitespace-separated token is
/// returned.
pub fn clean_author_name(name: &str) -> String {
    let fixed = fix_case(name.trim());
    let mut tokens: Vec<&str> = fixed.split_whitespace().collect();

    while tokens.len() > 1 && is_listed(tokens[0], NAME_PREFIXES) {
        tokens.remove(0);
    }
    while tokens.len() > 1 && is_listed(tokens[tokens.len() - 1], NAME_SUFFIXES) {
        tokens.pop();
    }

    let cleaned = tokens.join(" ");
    let cleaned = cleaned.trim_end_matches([',', ' ']);

    if let Some((last, _)) = cleaned.split_once(',') {
        let last = last.trim();
        return if last.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            last.to_string()
        };
    }

    match cleaned.split_whitespace().last() {
        Some(last) => last.to_string(),
        None => UNKNOWN_AUTHOR.to_string(),
    }
}

fn is_listed(token: &str, list: &[&str]) -> bool {
    let lower = token.trim_end_matches(',').to_lowercase();
    list.contains(&lower.as_str())
}

static TITLE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(microsoft word - |adobe pdf - )").unwrap());

static TITLE_BOILERPLATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(edited by|reviewed by|copyright|doi)\b").unwrap());

/// Clean a raw title string, returning [`UNKNOWN_TITLE`] if nothing usable
/// remains or the string is really an article ID.
pub fn improved_title_extraction(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || ARTICLE_ID_RE.is_match(&raw.to_lowercase()) {
        if !raw.is_empty() {
            tracing::info!(raw, "title looks like an article ID, ignoring");
        }
        return UNKNOWN_TITLE.to_string();
    }

    let fixed = fix_case(raw);
    let mut title: &str = &fixed;
    if let Some(m) = TITLE_PREFIX_RE.find(title) {
        title = &title[m.end()..];
    }
    if title.len() >= 4
        && title.is_char_boundary(title.len() - 4)
        && title[title.len() - 4..].eq_ignore_ascii_case(".pdf")
    {
        title = &title[..title.len() - 4];
    }
    if let Some(m) = TITLE_BOILERPLATE_RE.find_iter(title).find(|m| m.start() > 0) {
        title = &title[..m.start()];
    }

    let collapsed = collapse_whitespace(title);
    if collapsed.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        collapsed
    }
}

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[1-9]\d{3}\b").unwrap());

static PDF_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^D:(\d{4})").unwrap());

/// First four-digit year (1000-9999) in free text.
pub fn year_from_text(text: &str) -> Option<String> {
    YEAR_RE.find(text).map(|m| m.as_str().to_string())
}

/// Year of a raw PDF date: `D:YYYY...` form, else any bare year.
pub fn raw_pdf_year(date: &str) -> Option<String> {
    let date = date.trim();
    if date.starts_with("D:") {
        return PDF_DATE_RE.captures(date).map(|c| c[1].to_string());
    }
    year_from_text(date)
}

fn crossref_author(record: &CrossrefRecord) -> Option<String> {
    let first = record.author.first()?;
    [&first.family, &first.given, &first.name]
        .into_iter()
        .flatten()
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn crossref_year(record: &CrossrefRecord) -> Option<String> {
    [
        &record.published_print,
        &record.published_online,
        &record.created,
        &record.deposited,
    ]
    .into_iter()
    .flatten()
    .filter_map(|d| d.year())
    .find(|y| (1000..=9999).contains(y))
    .map(|y| y.to_string())
}

fn cleaned_author(name: Option<&str>) -> Option<String> {
    let name = name?.trim();
    if name.is_empty() {
        return None;
    }
    let cleaned = clean_author_name(name);
    (cleaned != UNKNOWN_AUTHOR).then_some(cleaned)
}

/// Surname of the first author in `record`.
pub fn record_author(record: &EnrichedRecord) -> Option<String> {
    match record {
        EnrichedRecord::Crossref(r) => crossref_author(r),
        EnrichedRecord::SemanticScholar(r) => {
            cleaned_author(r.authors.first().and_then(|a| a.name.as_deref()))
        }
        EnrichedRecord::Arxiv(r) => cleaned_author(r.authors.first().map(String::as_str)),
        EnrichedRecord::OpenLibrary(r) => {
            cleaned_author(r.authors.first().and_then(|a| a.name.as_deref()))
        }
        EnrichedRecord::Empty => None,
    }
}

/// Raw (uncleaned) title in `record`.
pub fn record_title(record: &EnrichedRecord) -> Option<&str> {
    let title = match record {
        EnrichedRecord::Crossref(r) => r.title.first().map(String::as_str),
        EnrichedRecord::SemanticScholar(r) => r.title.as_deref(),
        EnrichedRecord::Arxiv(r) => r.title.as_deref(),
        EnrichedRecord::OpenLibrary(r) => r.title.as_deref(),
        EnrichedRecord::Empty => None,
    }?;
    (!title.trim().is_empty()).then_some(title)
}

/// Publication year in `record`.
pub fn record_year(record: &EnrichedRecord) -> Option<String> {
    match record {
        EnrichedRecord::Crossref(r) => crossref_year(r),
        EnrichedRecord::SemanticScholar(r) => r
            .year
            .filter(|y| (1000..=9999).contains(y))
            .map(|y| y.to_string()),
        EnrichedRecord::Arxiv(r) => r.published.as_deref().and_then(year_from_text),
        EnrichedRecord::OpenLibrary(r) => r.publish_date.as_deref().and_then(year_from_text),
        EnrichedRecord::Empty => None,
    }
}

/// True if `record` supplies an author or a title.
pub fn has_author_or_title(record: &EnrichedRecord) -> bool {
    record_author(record).is_some() || record_title(record).is_some()
}

fn usable_title(raw: Option<&str>) -> Option<String> {
    let cleaned = improved_title_extraction(raw?);
    (cleaned != UNKNOWN_TITLE).then_some(cleaned)
}

/// Decide the final fields for one file.
///
/// Each field is taken from the first of: the primary record, the
/// supplement record, the PDF metadata, and (title only) the heuristic
/// title line. Whatever remains unresolved gets its sentinel.
pub fn reconcile(
    enrichment: &Enrichment,
    meta: &DocumentMetadata,
    ids: &IdentifierSet,
) -> ResolvedFields {
    let records = [&enrichment.primary, &enrichment.supplement];

    let author = records
        .iter()
        .find_map(|r| record_author(r))
        .or_else(|| cleaned_author(meta.author.as_deref()))
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    let title = records
        .iter()
        .find_map(|r| usable_title(record_title(r)))
        .or_else(|| usable_title(meta.title.as_deref()))
        .or_else(|| usable_title(ids.title.as_deref()))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let year = records
        .iter()
        .find_map(|r| record_year(r))
        .or_else(|| meta.date().and_then(raw_pdf_year))
        .unwrap_or_else(|| UNKNOWN_YEAR.to_string());

    tracing::debug!(%author, %year, %title, source = enrichment.label, "fields resolved");
    ResolvedFields {
        author,
        year,
        title,
    }
}
