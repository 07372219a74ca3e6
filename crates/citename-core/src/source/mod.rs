//! Metadata source trait and the four lookup services.

pub mod arxiv;
pub mod crossref;
pub mod open_library;
pub mod semantic_scholar;

#[cfg(test)]
pub(crate) mod mock;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::record::EnrichedRecord;

pub use arxiv::Arxiv;
pub use crossref::CrossRef;
pub use open_library::OpenLibrary;
pub use semantic_scholar::SemanticScholar;

/// Identifies a metadata source; also the first half of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Crossref,
    Arxiv,
    OpenLibrary,
    SemanticScholar,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Crossref => "CrossRef",
            SourceKind::Arxiv => "arXiv",
            SourceKind::OpenLibrary => "Open Library",
            SourceKind::SemanticScholar => "Semantic Scholar",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Lookup {
    Doi(String),
    Arxiv(String),
    Isbn(String),
    /// Free-text title for fuzzy search.
    Title(String),
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Doi(v) => write!(f, "doi:{v}"),
            Lookup::Arxiv(v) => write!(f, "arxiv:{v}"),
            Lookup::Isbn(v) => write!(f, "isbn:{v}"),
            Lookup::Title(v) => {
                let short: String = v.chars().take(50).collect();
                write!(f, "title:\"{short}\"")
            }
        }
    }
}

/// Why a lookup produced no record.
///
/// These never leave the adapter layer: [`crate::resolver::Resolver`] logs
/// them and substitutes [`EnrichedRecord::Empty`].
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limited (429){}", .retry_after.map(|d| format!(", retry after {:.1}s", d.as_secs_f64())).unwrap_or_default())]
    RateLimited { retry_after: Option<Duration> },
    #[error("HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout
        } else if e.is_decode() {
            SourceError::Parse(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

/// Boxed future returned by [`MetadataSource::lookup`].
pub type LookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<EnrichedRecord, SourceError>> + Send + 'a>>;

/// A remote service that turns an identifier into a metadata record.
pub trait MetadataSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch the record for `lookup`.
    ///
    /// Lookup kinds the service does not handle yield `Ok(EnrichedRecord::Empty)`.
    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a>;
}

/// Map a response status to an error: 429 (with `Retry-After`) or any
/// other non-success status.
pub fn check_response_status(resp: &reqwest::Response) -> Result<(), SourceError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        return Err(SourceError::RateLimited { retry_after });
    }
    if !status.is_success() {
        return Err(SourceError::Status(status.as_u16()));
    }
    Ok(())
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: no clock arithmetic, just a conservative wait
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

pub(crate) const USER_AGENT: &str = concat!("citename/", env!("CARGO_PKG_VERSION"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("5"), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after(" 30 "), Some(Duration::from_secs(30)));
    }

    #[test]
    fn parse_retry_after_http_date() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn parse_retry_after_garbage() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn status_ok_passes() {
        let http_resp = http::Response::builder().status(200).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(check_response_status(&resp).is_ok());
    }

    #[test]
    fn status_429_is_rate_limited() {
        let http_resp = http::Response::builder()
            .status(429)
            .header("retry-after", "10")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        match check_response_status(&resp) {
            Err(SourceError::RateLimited { retry_after }) => {
                assert_eq!(retry_after, Some(Duration::from_secs(10)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn status_404_is_status_error() {
        let http_resp = http::Response::builder().status(404).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(matches!(
            check_response_status(&resp),
            Err(SourceError::Status(404))
        ));
    }

    #[test]
    fn lookup_display_truncates_titles() {
        let long = Lookup::Title("x".repeat(80));
        assert_eq!(long.to_string(), format!("title:\"{}\"", "x".repeat(50)));
        assert_eq!(Lookup::Doi("10.1/a".into()).to_string(), "doi:10.1/a");
    }
}
