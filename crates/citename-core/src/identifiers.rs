//! Identifier extraction from page text: DOI, arXiv ID, ISBN, and a heuristic
//! title line from the first page.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::{PdfDocument, TextMode};
use crate::text::collapse_whitespace;

/// Pages whose plain extraction has fewer non-blank characters than this are
/// retried in layout mode.
const MIN_PLAIN_TEXT_CHARS: usize = 50;

/// Only the first lines of page 1 are considered for the title heuristic.
const TITLE_SCAN_LINES: usize = 30;

/// Identifiers found while scanning a document.
///
/// Each slot is written at most once; later matches never replace an earlier
/// one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierSet {
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub isbn: Option<String>,
    pub title: Option<String>,
}

impl IdentifierSet {
    /// True once a DOI, arXiv ID or ISBN has been found.
    pub fn has_hard_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv.is_some() || self.isbn.is_some()
    }

    fn fill(slot: &mut Option<String>, found: impl FnOnce() -> Option<String>) {
        if slot.is_none() {
            *slot = found();
        }
    }
}

/// Knobs for [`scan_document`].
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_pages: usize,
    /// arXiv IDs are only collected when the arXiv source is enabled.
    pub arxiv_enabled: bool,
    pub frontiers_heuristic: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_pages: 15,
            arxiv_enabled: true,
            frontiers_heuristic: true,
        }
    }
}

/// Scan up to `max_pages` pages of `doc` for identifiers.
///
/// Stops after the first page on which a DOI, arXiv ID or ISBN is found. The
/// title heuristic only runs on page 1. Page extraction errors are logged and
/// the page is skipped.
pub fn scan_document(doc: &dyn PdfDocument, opts: &ScanOptions) -> IdentifierSet {
    let mut ids = IdentifierSet::default();
    let pages = opts.max_pages.min(doc.page_count());

    for index in 0..pages {
        let text = match read_page(doc, index) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(page = index + 1, error = %e, "error extracting page text");
                continue;
            }
        };
        scan_page(&mut ids, index, &text, opts);
        if ids.has_hard_identifier() {
            tracing::debug!(page = index + 1, "identifier found, stopping scan");
            break;
        }
    }

    ids
}

fn read_page(doc: &dyn PdfDocument, index: usize) -> Result<String, crate::BackendError> {
    let plain = doc.page_text(index, TextMode::Plain)?;
    if plain.trim().chars().count() >= MIN_PLAIN_TEXT_CHARS {
        return Ok(plain);
    }
    match doc.page_text(index, TextMode::Layout) {
        Ok(layout) if !layout.trim().is_empty() => Ok(layout),
        _ => Ok(plain),
    }
}

/// Run every extractor over one page of text, filling empty slots of `ids`.
pub fn scan_page(ids: &mut IdentifierSet, page_index: usize, text: &str, opts: &ScanOptions) {
    let text = text.replace('\0', "").replace('\u{a0}', " ");
    if text.trim().is_empty() {
        return;
    }

    IdentifierSet::fill(&mut ids.doi, || extract_doi(&text, opts.frontiers_heuristic));
    if opts.arxiv_enabled {
        IdentifierSet::fill(&mut ids.arxiv, || extract_arxiv_id(&text));
    }
    IdentifierSet::fill(&mut ids.isbn, || extract_isbn(&text));
    if page_index == 0 {
        IdentifierSet::fill(&mut ids.title, || extract_title_line(&text));
    }
}

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b10\.\d{4,9}/[-._;()/:A-Z0-9]+\b").unwrap());

static DOI_PREFIXED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)doi:\s*(\b10\.\d{4,9}/[-._;()/:A-Z0-9]+)\b").unwrap());

/// Frontiers article IDs such as `feduc-2021-667869`.
static FRONTIERS_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(f[a-z]+)-(\d{4})-(\d{6})\b").unwrap());

/// Extract a DOI from free text.
///
/// Tries a bare `10.NNNN/suffix` match, then an explicit `doi:` prefix. When
/// `frontiers_heuristic` is set and neither matches, a Frontiers article ID
/// (`<journal>-<year>-<6 digits>`) is turned into `10.3389/<journal>.<year>.<id>`.
/// That synthesized DOI is a publisher-specific guess and is never checked
/// against the registry here.
pub fn extract_doi(text: &str, frontiers_heuristic: bool) -> Option<String> {
    if let Some(m) = DOI_RE.find(text) {
        return Some(clean_doi(m.as_str()));
    }
    if let Some(caps) = DOI_PREFIXED_RE.captures(text) {
        return Some(clean_doi(&caps[1]));
    }
    if frontiers_heuristic {
        return frontiers_doi(text);
    }
    None
}

fn clean_doi(doi: &str) -> String {
    doi.trim_end_matches(['.', ',', ';']).to_string()
}

/// Synthesize a Frontiers DOI from an article ID in the text.
pub fn frontiers_doi(text: &str) -> Option<String> {
    let caps = FRONTIERS_ID_RE.captures(text)?;
    Some(format!("10.3389/{}.{}.{}", &caps[1], &caps[2], &caps[3]))
}

static ARXIV_NEW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:arXiv:)?\b(\d{4}\.\d{4,5})(?:v\d+)?\b").unwrap());

static ARXIV_LEGACY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:arXiv:)?\b([a-z][a-z\-]*(?:\.[a-z]{2})?/\d{7})\b").unwrap());

/// Extract an arXiv ID: modern `YYMM.NNNN[N]`, else legacy `category/YYMMNNN`.
///
/// Version suffixes (`v2`) are dropped.
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    if let Some(caps) = ARXIV_NEW_RE.captures(text) {
        return Some(caps[1].to_string());
    }
    ARXIV_LEGACY_RE
        .captures(text)
        .map(|caps| caps[1].to_string())
}

static ISBN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)ISBN(?:[-‐–—]?1[03])?:?\s*(?:97[89][-‐–\s]?)?(?:\d[-‐–\s]?){9}[\dX]",
    )
    .unwrap()
});

/// Extract an ISBN following an `ISBN`, `ISBN-10` or `ISBN-13` label.
///
/// Everything but digits and `X` is stripped from the match; the trailing 13
/// characters are returned when at least 13 remain, otherwise the trailing 10.
pub fn extract_isbn(text: &str) -> Option<String> {
    let flat = text.replace(['\n', '\r'], " ");
    let m = ISBN_RE.find(&flat)?;
    let digits: String = m
        .as_str()
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X')
        .collect();
    let n = digits.len();
    if n >= 13 {
        Some(digits[n - 13..].to_string())
    } else if n >= 10 {
        Some(digits[n - 10..].to_string())
    } else {
        None
    }
}

/// Lines containing any of these (case-insensitive) are never titles.
const TITLE_BLACKLIST: &[&str] = &[
    "page",
    "vol.",
    "no.",
    "journal",
    "copyright",
    "doi:",
    "issn",
    "isbn",
    "published",
    "received",
    "accepted",
    "edited by",
    "reviewed by",
    "keywords",
    "abstract",
    "article",
    "original research",
    "brief report",
    "front. educ",
    "frontiers in",
    "www.frontiersin.org",
];

/// Technical article IDs such as `fpsyg-2020-012345`; never a title.
pub(crate) static ARTICLE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z]+-\d{4}-\d{6}").unwrap());

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?://|www\.)\S+").unwrap());

struct TitleCandidate {
    line_index: usize,
    cap_ratio: f64,
    text: String,
}

/// Pick the most title-like line from the first lines of page 1.
///
/// Candidates are 21–199 characters with at least 3 words, do not end in a
/// colon, have more than half their words capitalized, at most 30% digits or
/// brackets, and match neither the boilerplate blacklist nor the article-ID
/// pattern. The earliest candidate wins; ties go to the higher capitalization
/// ratio.
pub fn extract_title_line(text: &str) -> Option<String> {
    let text = text.replace('\0', "").replace('\u{a0}', " ");
    let text = URL_RE.replace_all(&text, "");

    let mut candidates = Vec::new();
    for (line_index, raw_line) in text.lines().take(TITLE_SCAN_LINES).enumerate() {
        let line = collapse_whitespace(raw_line);
        let len = line.chars().count();
        if len < 10 {
            continue;
        }

        let lower = line.to_lowercase();
        if TITLE_BLACKLIST.iter().any(|p| lower.contains(p)) || ARTICLE_ID_RE.is_match(&lower) {
            continue;
        }

        let noisy = line
            .chars()
            .filter(|c| c.is_ascii_digit() || "()[]{}".contains(*c))
            .count();
        if noisy as f64 / len as f64 > 0.3 {
            continue;
        }

        if len <= 20 || len >= 200 || line.ends_with(':') {
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() < 3 {
            continue;
        }
        let capitalized = words
            .iter()
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .count();
        let cap_ratio = capitalized as f64 / words.len() as f64;
        if cap_ratio > 0.5 {
            candidates.push(TitleCandidate {
                line_index,
                cap_ratio,
                text: line,
            });
        }
    }

    candidates
        .into_iter()
        .min_by(|a, b| {
            a.line_index
                .cmp(&b.line_index)
                .then(b.cap_ratio.total_cmp(&a.cap_ratio))
        })
        .map(|c| c.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, DocumentMetadata};

    #[test]
    fn doi_with_label() {
        assert_eq!(
            extract_doi("DOI: 10.1037/a0032359", true),
            Some("10.1037/a0032359".into())
        );
    }

    #[test]
    fn doi_trailing_punctuation_stripped() {
        assert_eq!(
            extract_doi("see https://doi.org/10.1145/3442381.3450048.", true),
            Some("10.1145/3442381.3450048".into())
        );
        assert_eq!(
            extract_doi("(10.1000/xyz123;", true),
            Some("10.1000/xyz123".into())
        );
    }

    #[test]
    fn doi_none() {
        assert_eq!(extract_doi("No identifier here", true), None);
    }

    #[test]
    fn frontiers_heuristic_synthesizes_doi() {
        assert_eq!(
            extract_doi("feduc-2021-667869 original", true),
            Some("10.3389/feduc.2021.667869".into())
        );
        assert_eq!(extract_doi("feduc-2021-667869 original", false), None);
    }

    #[test]
    fn arxiv_modern() {
        assert_eq!(extract_arxiv_id("arXiv:2301.12345v2 [cs.LG]"), Some("2301.12345".into()));
        assert_eq!(extract_arxiv_id("preprint 1706.03762"), Some("1706.03762".into()));
    }

    #[test]
    fn arxiv_legacy() {
        assert_eq!(extract_arxiv_id("arXiv:hep-th/9901001"), Some("hep-th/9901001".into()));
        assert_eq!(extract_arxiv_id("math.GT/0309136"), Some("math.GT/0309136".into()));
    }

    #[test]
    fn arxiv_not_found_inside_doi_suffix() {
        assert_eq!(extract_arxiv_id("10.1145/3442381.3450048"), None);
    }

    #[test]
    fn isbn_13_with_label() {
        assert_eq!(
            extract_isbn("ISBN-13: 9780262033848"),
            Some("9780262033848".into())
        );
    }

    #[test]
    fn isbn_hyphenated() {
        assert_eq!(
            extract_isbn("Printed in USA\nISBN 978-0-262-03384-8\n"),
            Some("9780262033848".into())
        );
    }

    #[test]
    fn isbn_10_with_check_x() {
        assert_eq!(extract_isbn("ISBN-10: 043942089x"), Some("043942089X".into()));
    }

    #[test]
    fn isbn_requires_label() {
        assert_eq!(extract_isbn("9780262033848"), None);
    }

    #[test]
    fn title_line_prefers_earliest_candidate() {
        let page = "Journal of Things, Vol. 3\n\
                    Deep Residual Learning for Image Recognition\n\
                    Kaiming He Xiangyu Zhang Shaoqing Ren Jian Sun\n\
                    Abstract\n";
        assert_eq!(
            extract_title_line(page),
            Some("Deep Residual Learning for Image Recognition".into())
        );
    }

    #[test]
    fn title_line_rejects_noise() {
        let page = "fpsyg-2020-012345 Some Other Words\n\
                    Table 1: (12) [34] 56 78 90 12\n\
                    Introduction To The Following:\n\
                    short\n\
                    visit https://example.com/A/B/C now\n";
        assert_eq!(extract_title_line(page), None);
    }

    struct Pages(Vec<&'static str>);

    impl PdfDocument for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }
        fn page_text(&self, index: usize, _mode: TextMode) -> Result<String, BackendError> {
            match self.0[index] {
                "ERR" => Err(BackendError::ExtractionError {
                    page: index,
                    message: "broken".into(),
                }),
                text => Ok(text.to_string()),
            }
        }
        fn metadata(&self) -> DocumentMetadata {
            DocumentMetadata::default()
        }
    }

    #[test]
    fn scan_stops_at_first_identifier_page() {
        let doc = Pages(vec![
            "Nothing to see on the cover page",
            "ISBN 978-0-262-03384-8",
            "doi:10.9999/later.page",
        ]);
        let ids = scan_document(&doc, &ScanOptions::default());
        assert_eq!(ids.isbn.as_deref(), Some("9780262033848"));
        assert_eq!(ids.doi, None);
    }

    #[test]
    fn scan_skips_unreadable_pages() {
        let doc = Pages(vec!["ERR", "DOI: 10.1037/a0032359"]);
        let ids = scan_document(&doc, &ScanOptions::default());
        assert_eq!(ids.doi.as_deref(), Some("10.1037/a0032359"));
    }

    #[test]
    fn scan_respects_max_pages() {
        let doc = Pages(vec!["blank", "blank", "DOI: 10.1037/a0032359"]);
        let opts = ScanOptions {
            max_pages: 2,
            ..ScanOptions::default()
        };
        assert_eq!(scan_document(&doc, &opts), IdentifierSet::default());
    }

    #[test]
    fn scan_skips_arxiv_when_disabled() {
        let doc = Pages(vec!["arXiv:1706.03762v5"]);
        let opts = ScanOptions {
            arxiv_enabled: false,
            ..ScanOptions::default()
        };
        let ids = scan_document(&doc, &opts);
        assert_eq!(ids.arxiv, None);
        assert!(!ids.has_hard_identifier());
    }

    #[test]
    fn title_only_captured_from_first_page() {
        let doc = Pages(vec![
            "x",
            "Attention Is All You Need In Practice\nDOI: 10.1037/a0032359",
        ]);
        let ids = scan_document(&doc, &ScanOptions::default());
        assert_eq!(ids.title, None);
        assert_eq!(ids.doi.as_deref(), Some("10.1037/a0032359"));
    }
}
