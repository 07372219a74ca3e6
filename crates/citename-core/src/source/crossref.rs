use super::{Lookup, LookupFuture, MetadataSource, SourceError, SourceKind, check_response_status};
use crate::record::{CrossrefRecord, EnrichedRecord};
use serde::Deserialize;
use std::time::Duration;

/// DOI registry lookup against `api.crossref.org/works/{doi}`.
pub struct CrossRef {
    pub mailto: Option<String>,
}

#[derive(Deserialize)]
struct WorksResponse {
    message: CrossrefRecord,
}

impl MetadataSource for CrossRef {
    fn kind(&self) -> SourceKind {
        SourceKind::Crossref
    }

    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> LookupFuture<'a> {
        Box::pin(async move {
            let Lookup::Doi(doi) = lookup else {
                return Ok(EnrichedRecord::Empty);
            };

            // extracted DOIs only contain path-safe characters
            let mut url = format!("https://api.crossref.org/works/{}", doi);
            let user_agent = if let Some(ref email) = self.mailto {
                url.push_str(&format!("?mailto={}", urlencoding::encode(email)));
                format!("{} (mailto:{})", super::USER_AGENT, email)
            } else {
                super::USER_AGENT.to_string()
            };

            let resp = client
                .get(&url)
                .header("User-Agent", user_agent)
                .timeout(timeout)
                .send()
                .await?;
            check_response_status(&resp)?;

            let body = resp.text().await?;
            parse_works_response(&body)
        })
    }
}

/// Parse a `/works/{doi}` body into a CrossRef record.
pub(crate) fn parse_works_response(body: &str) -> Result<EnrichedRecord, SourceError> {
    let data: WorksResponse =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;
    Ok(EnrichedRecord::Crossref(data.message))
}
