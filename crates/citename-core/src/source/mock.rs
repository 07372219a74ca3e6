//! Mock metadata source for testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{Lookup, LookupFuture, MetadataSource, SourceError, SourceKind};
use crate::record::EnrichedRecord;

/// A hand-rolled mock implementing [`MetadataSource`] for tests.
///
/// Answers from a list of `(lookup, record)` pairs; anything not listed gets
/// the fallback result. Every call is counted and recorded.
pub struct MockSource {
    kind: SourceKind,
    answers: Vec<(Lookup, EnrichedRecord)>,
    fallback: Result<EnrichedRecord, SourceError>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<Lookup>>,
}

impl MockSource {
    /// A mock that answers every lookup with [`EnrichedRecord::Empty`].
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            answers: Vec::new(),
            fallback: Ok(EnrichedRecord::Empty),
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `lookup` with `record`.
    pub fn with_answer(mut self, lookup: Lookup, record: EnrichedRecord) -> Self {
        self.answers.push((lookup, record));
        self
    }

    /// Fail every unlisted lookup with `error`.
    pub fn failing(mut self, error: SourceError) -> Self {
        self.fallback = Err(error);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Lookup> {
        self.calls.lock().unwrap().clone()
    }
}

impl MetadataSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn lookup<'a>(
        &'a self,
        lookup: &'a Lookup,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> LookupFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(lookup.clone());
        let result = self
            .answers
            .iter()
            .find(|(l, _)| l == lookup)
            .map(|(_, record)| Ok(record.clone()))
            .unwrap_or_else(|| self.fallback.clone());
        Box::pin(async move { result })
    }
}
