use super::{Lookup, LookupFuture, MetadataSource, SourceError, SourceKind, check_response_status};
use crate::record::{EnrichedRecord, OpenLibraryRecord};
use std::collections::HashMap;
use std::time::Duration;

/// ISBN catalog lookup against Open Library's books API.
pub struct OpenLibrary;

impl MetadataSource for OpenLibrary {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenLibrary
    }

    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let Lookup::Isbn(isbn) = lookup else {
                return Ok(EnrichedRecord::Empty);
            };

            let url = format!(
                "https://openlibrary.org/api/books?bibkeys=ISBN:{}&format=json&jscmd=data",
                urlencoding::encode(isbn)
            );

            let resp = client
                .get(&url)
                .header("User-Agent", super::USER_AGENT)
                .timeout(timeout)
                .send()
                .await?;
            check_response_status(&resp)?;

            let body = resp.text().await?;
            parse_books_response(&body, isbn)
        })
    }
}

/// Pick the `ISBN:<isbn>` member out of a `/api/books` body.
///
/// The API answers an unknown ISBN with `{}`, which maps to
/// [`EnrichedRecord::Empty`].
pub(crate) fn parse_books_response(body: &str, isbn: &str) -> Result<EnrichedRecord, SourceError> {
    let mut books: HashMap<String, OpenLibraryRecord> =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    match books.remove(&format!("ISBN:{}", isbn)) {
        Some(book) => Ok(EnrichedRecord::OpenLibrary(book)),
        None => {
            tracing::warn!(isbn, "no Open Library entry for ISBN");
            Ok(EnrichedRecord::Empty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOKS_BODY: &str = r#"{
        "ISBN:9780262033848": {
            "url": "https://openlibrary.org/books/OL22639733M/Introduction_to_algorithms",
            "key": "/books/OL22639733M",
            "title": "Introduction to algorithms",
            "authors": [
                {"url": "https://openlibrary.org/authors/OL2645804A", "name": "Thomas H. Cormen"},
                {"url": "https://openlibrary.org/authors/OL1770574A", "name": "Charles E. Leiserson"}
            ],
            "number_of_pages": 1292,
            "publish_date": "2009"
        }
    }"#;

    #[test]
    fn parses_book_under_isbn_key() {
        let EnrichedRecord::OpenLibrary(book) =
            parse_books_response(BOOKS_BODY, "9780262033848").unwrap()
        else {
            panic!("expected an Open Library record");
        };
        assert_eq!(book.title.as_deref(), Some("Introduction to algorithms"));
        assert_eq!(book.authors[0].name.as_deref(), Some("Thomas H. Cormen"));
        assert_eq!(book.publish_date.as_deref(), Some("2009"));
    }

    #[test]
    fn unknown_isbn_is_empty() {
        assert!(parse_books_response("{}", "9780000000000").unwrap().is_empty());
    }

    #[test]
    fn other_isbn_key_is_empty() {
        assert!(parse_books_response(BOOKS_BODY, "0262033844").unwrap().is_empty());
    }
}
