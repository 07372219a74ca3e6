use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("failed to extract text from page {page}: {message}")]
    ExtractionError { page: usize, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a page's text should be extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Reading-order text, one line per text line.
    Plain,
    /// Layout-preserving extraction, used as a fallback for pages where plain
    /// extraction yields almost nothing.
    Layout,
}

/// Document-level metadata (`/Author`, `/Title`, `/CreationDate`, `/ModDate`).
///
/// Empty strings are normalized to `None` by [`DocumentMetadata::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub author: Option<String>,
    pub title: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
}

impl DocumentMetadata {
    pub fn new(
        author: Option<String>,
        title: Option<String>,
        creation_date: Option<String>,
        mod_date: Option<String>,
    ) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        Self {
            author: non_empty(author),
            title: non_empty(title),
            creation_date: non_empty(creation_date),
            mod_date: non_empty(mod_date),
        }
    }

    /// `/CreationDate`, falling back to `/ModDate`.
    pub fn date(&self) -> Option<&str> {
        self.creation_date.as_deref().or(self.mod_date.as_deref())
    }
}

/// An opened PDF document.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// Extract the text of the page at `index` (0-based).
    fn page_text(&self, index: usize, mode: TextMode) -> Result<String, BackendError>;

    fn metadata(&self) -> DocumentMetadata;
}

/// Trait for PDF backends.
///
/// The backend only opens documents; identifier scanning and metadata
/// interpretation live in [`crate::identifiers`] and [`crate::reconcile`].
pub trait PdfBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_values_are_absent() {
        let meta = DocumentMetadata::new(
            Some("  ".into()),
            Some("A Title".into()),
            Some(String::new()),
            Some("D:20190101".into()),
        );
        assert_eq!(meta.author, None);
        assert_eq!(meta.title.as_deref(), Some("A Title"));
        assert_eq!(meta.date(), Some("D:20190101"));
    }

    #[test]
    fn creation_date_preferred_over_mod_date() {
        let meta = DocumentMetadata::new(
            None,
            None,
            Some("D:2001".into()),
            Some("D:2010".into()),
        );
        assert_eq!(meta.date(), Some("D:2001"));
    }
}
