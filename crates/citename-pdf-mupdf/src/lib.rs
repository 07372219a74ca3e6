use std::path::Path;

use mupdf::{Document, MetadataName, TextPageFlags};

use citename_core::{BackendError, DocumentMetadata, PdfBackend, PdfDocument, TextMode};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island. It isolates the mupdf dependency
/// (which is AGPL-3.0) so the rest of the pipeline does not transitively
/// depend on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MupdfBackend;

impl MupdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for MupdfBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;
        if document
            .needs_password()
            .map_err(|e| BackendError::OpenError(e.to_string()))?
        {
            return Err(BackendError::Encrypted);
        }

        let page_count = document
            .page_count()
            .map_err(|e| BackendError::OpenError(e.to_string()))?;
        tracing::debug!(path = %path.display(), pages = page_count, "opened PDF");

        Ok(Box::new(MupdfDocument {
            document,
            page_count: usize::try_from(page_count).unwrap_or(0),
        }))
    }
}

struct MupdfDocument {
    document: Document,
    page_count: usize,
}

impl MupdfDocument {
    fn info(&self, name: MetadataName) -> Option<String> {
        match self.document.metadata(name) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(error = %e, "unreadable metadata entry");
                None
            }
        }
    }
}

impl PdfDocument for MupdfDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_text(&self, index: usize, mode: TextMode) -> Result<String, BackendError> {
        let extraction_error = |e: mupdf::Error| BackendError::ExtractionError {
            page: index + 1,
            message: e.to_string(),
        };

        let page_number = i32::try_from(index).map_err(|_| BackendError::ExtractionError {
            page: index + 1,
            message: "page index out of range".into(),
        })?;
        let page = self
            .document
            .load_page(page_number)
            .map_err(extraction_error)?;

        let flags = match mode {
            TextMode::Plain => TextPageFlags::empty(),
            TextMode::Layout => TextPageFlags::PRESERVE_WHITESPACE,
        };
        let text_page = page.to_text_page(flags).map_err(extraction_error)?;

        // Block/line iteration, one output line per text line
        let mut page_text = String::new();
        for block in text_page.blocks() {
            for line in block.lines() {
                let line_text: String = line
                    .chars()
                    .map(|c| c.char().unwrap_or('\u{FFFD}'))
                    .collect();
                page_text.push_str(&line_text);
                page_text.push('\n');
            }
        }
        Ok(page_text)
    }

    fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata::new(
            self.info(MetadataName::Author),
            self.info(MetadataName::Title),
            self.info(MetadataName::CreationDate),
            self.info(MetadataName::ModDate),
        )
    }
}
