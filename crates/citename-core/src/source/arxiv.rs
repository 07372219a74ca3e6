use super::{Lookup, LookupFuture, MetadataSource, SourceError, SourceKind, check_response_status};
use crate::record::{ArxivRecord, EnrichedRecord};
use std::time::Duration;

/// arXiv export API, one ID per request.
pub struct Arxiv;

impl MetadataSource for Arxiv {
    fn kind(&self) -> SourceKind {
        SourceKind::Arxiv
    }

    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let Lookup::Arxiv(id) = lookup else {
                return Ok(EnrichedRecord::Empty);
            };

            let url = format!(
                "http://export.arxiv.org/api/query?id_list={}&max_results=1",
                urlencoding::encode(id)
            );

            let resp = client
                .get(&url)
                .header("User-Agent", super::USER_AGENT)
                .timeout(timeout)
                .send()
                .await?;
            check_response_status(&resp)?;

            let body = resp.text().await?;

            // Parse Atom XML feed
            parse_arxiv_feed(&body)
        })
    }
}

/// Parse the first `<entry>` of an arXiv Atom feed.
///
/// A feed with no entries, or whose entry is an API error report (its `<id>`
/// lives under `arxiv.org/api/errors`), yields [`EnrichedRecord::Empty`].
pub(crate) fn parse_arxiv_feed(xml: &str) -> Result<EnrichedRecord, SourceError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    #[derive(PartialEq)]
    enum Field {
        None,
        Id,
        Title,
        Published,
        AuthorName,
    }

    let mut reader = Reader::from_str(xml);

    let mut in_entry = false;
    let mut in_author = false;
    let mut field = Field::None;

    let mut id = String::new();
    let mut title = String::new();
    let mut published = String::new();
    let mut authors: Vec<String> = Vec::new();
    let mut current_name = String::new();

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"entry" => in_entry = true,
                b"id" if in_entry && !in_author => field = Field::Id,
                b"title" if in_entry => field = Field::Title,
                b"published" if in_entry => field = Field::Published,
                b"author" if in_entry => {
                    in_author = true;
                    current_name.clear();
                }
                b"name" if in_author => field = Field::AuthorName,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| SourceError::Parse(format!("XML parse error: {}", err)))?;
                match field {
                    Field::Id => id.push_str(&text),
                    Field::Title => title.push_str(&text),
                    Field::Published => published.push_str(&text),
                    Field::AuthorName => current_name.push_str(&text),
                    Field::None => {}
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"entry" => break,
                b"author" if in_author => {
                    let name = current_name.trim();
                    if !name.is_empty() {
                        authors.push(name.to_string());
                    }
                    in_author = false;
                }
                _ => field = Field::None,
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !in_entry || id.contains("arxiv.org/api/errors") {
        return Ok(EnrichedRecord::Empty);
    }

    let non_empty = |s: String| {
        let collapsed = crate::text::collapse_whitespace(&s);
        (!collapsed.is_empty()).then_some(collapsed)
    };
    Ok(EnrichedRecord::Arxiv(ArxivRecord {
        title: non_empty(title),
        authors,
        published: non_empty(published),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?id_list=1706.03762" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: id_list=1706.03762</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
  You Need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
    </author>
  </entry>
</feed>"#;

    const ERROR_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=9999.99999</title>
  <entry>
    <id>http://arxiv.org/api/errors#incorrect_id_format_for_9999.99999</id>
    <title>Error</title>
    <summary>incorrect id format for 9999.99999</summary>
    <author>
      <name>arXiv api core</name>
    </author>
  </entry>
</feed>"#;

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: id_list=2101.00001</title>
  <id>http://arxiv.org/api/xyz</id>
</feed>"#;

    #[test]
    fn parses_first_entry() {
        let EnrichedRecord::Arxiv(record) = parse_arxiv_feed(FEED).unwrap() else {
            panic!("expected an arXiv record");
        };
        assert_eq!(record.title.as_deref(), Some("Attention Is All You Need"));
        assert_eq!(record.authors, vec!["Ashish Vaswani", "Noam Shazeer"]);
        assert_eq!(record.published.as_deref(), Some("2017-06-12T17:57:34Z"));
    }

    #[test]
    fn error_entry_is_empty() {
        assert!(parse_arxiv_feed(ERROR_FEED).unwrap().is_empty());
    }

    #[test]
    fn feed_without_entries_is_empty() {
        assert!(parse_arxiv_feed(EMPTY_FEED).unwrap().is_empty());
    }
}
