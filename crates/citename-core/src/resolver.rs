//! Prioritized metadata lookup for one document.
//!
//! The priority policy is an ordered list of [`PriorityRule`]s. The first
//! rule whose identifier is present decides which sources are queried; later
//! rules are never consulted, even if that rule's lookups come back empty.

use std::sync::Arc;
use std::time::Duration;

use crate::Config;
use crate::cache::QueryCache;
use crate::identifiers::IdentifierSet;
use crate::rate_limit::CallThrottle;
use crate::reconcile::has_author_or_title;
use crate::record::EnrichedRecord;
use crate::source::{
    Arxiv, CrossRef, Lookup, MetadataSource, OpenLibrary, SemanticScholar, SourceKind,
};

/// Label used when no record was obtained.
pub const PDF_METADATA_LABEL: &str = "pdf_metadata";

/// What the sources produced for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub primary: EnrichedRecord,
    /// Follow-up record, consulted only for fields the primary lacks.
    pub supplement: EnrichedRecord,
    /// Which lookup supplied the metadata, e.g. `doi_crossref`.
    pub label: &'static str,
    /// Set when no hard identifier was found; forces needs-attention.
    pub low_confidence: bool,
}

impl Enrichment {
    /// No lookup attempted.
    pub fn none() -> Self {
        Self {
            primary: EnrichedRecord::Empty,
            supplement: EnrichedRecord::Empty,
            label: PDF_METADATA_LABEL,
            low_confidence: true,
        }
    }
}

/// One step of the priority policy.
pub struct PriorityRule {
    /// Builds the lookup if this rule applies.
    pub key: fn(&IdentifierSet) -> Option<Lookup>,
    pub primary: SourceKind,
    pub label: &'static str,
    /// Source queried with the same lookup when the primary record has
    /// neither an author nor a title, and the label used if it answers.
    pub supplement: Option<(SourceKind, &'static str)>,
    pub low_confidence: bool,
}

/// The source priority order: DOI, then arXiv ID, then ISBN, then the
/// heuristic title.
pub const PRIORITY_POLICY: &[PriorityRule] = &[
    PriorityRule {
        key: |ids| ids.doi.clone().map(Lookup::Doi),
        primary: SourceKind::Crossref,
        label: "doi_crossref",
        supplement: Some((SourceKind::SemanticScholar, "doi_semantic_scholar")),
        low_confidence: false,
    },
    PriorityRule {
        key: |ids| ids.arxiv.clone().map(Lookup::Arxiv),
        primary: SourceKind::Arxiv,
        label: "arxiv",
        supplement: Some((SourceKind::SemanticScholar, "arxiv_semantic_scholar")),
        low_confidence: false,
    },
    PriorityRule {
        key: |ids| ids.isbn.clone().map(Lookup::Isbn),
        primary: SourceKind::OpenLibrary,
        label: "isbn_openlibrary",
        supplement: None,
        low_confidence: false,
    },
    PriorityRule {
        key: |ids| ids.title.clone().map(Lookup::Title),
        primary: SourceKind::SemanticScholar,
        label: "title_search",
        supplement: None,
        low_confidence: true,
    },
];

/// Queries metadata sources through a shared cache and throttle.
pub struct Resolver {
    sources: Vec<Arc<dyn MetadataSource>>,
    cache: QueryCache,
    client: reqwest::Client,
    throttle: CallThrottle,
    timeout: Duration,
}

impl Resolver {
    /// Build a resolver with the enabled sources from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut sources: Vec<Arc<dyn MetadataSource>> = Vec::new();
        if config.use_crossref {
            sources.push(Arc::new(CrossRef {
                mailto: config.crossref_mailto.clone(),
            }));
        }
        if config.use_arxiv {
            sources.push(Arc::new(Arxiv));
        }
        if config.use_open_library {
            sources.push(Arc::new(OpenLibrary));
        }
        if config.use_semantic_scholar {
            sources.push(Arc::new(SemanticScholar {
                api_key: config.s2_api_key.clone(),
                threshold: config.fuzzy_match_threshold,
            }));
        }
        Self::new(sources, config.api_timeout, config.api_delay)
    }

    /// Build a resolver over an explicit set of sources. Lookups against a
    /// source kind not in `sources` return [`EnrichedRecord::Empty`].
    pub fn new(sources: Vec<Arc<dyn MetadataSource>>, timeout: Duration, delay: Duration) -> Self {
        Self {
            sources,
            cache: QueryCache::new(),
            client: reqwest::Client::new(),
            throttle: CallThrottle::new(delay),
            timeout,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn source(&self, kind: SourceKind) -> Option<&Arc<dyn MetadataSource>> {
        self.sources.iter().find(|s| s.kind() == kind)
    }

    /// Look up `lookup` in one source.
    ///
    /// Errors are logged and become [`EnrichedRecord::Empty`]; either way the
    /// result is cached and the throttle delay applied.
    pub async fn query(&self, kind: SourceKind, lookup: &Lookup) -> EnrichedRecord {
        let Some(source) = self.source(kind) else {
            tracing::debug!(source = kind.name(), %lookup, "source disabled, skipping");
            return EnrichedRecord::Empty;
        };
        if let Some(cached) = self.cache.get(kind, lookup) {
            return cached;
        }

        tracing::info!(source = kind.name(), %lookup, "querying");
        let record = match source.lookup(lookup, &self.client, self.timeout).await {
            Ok(record) => {
                if record.is_empty() {
                    tracing::info!(source = kind.name(), %lookup, "no record found");
                }
                record
            }
            Err(e) => {
                tracing::warn!(source = kind.name(), %lookup, error = %e, "lookup failed");
                EnrichedRecord::Empty
            }
        };
        self.throttle.pause().await;

        self.cache.insert(kind, lookup, record.clone());
        record
    }

    /// Run the priority policy for one document.
    pub async fn enrich(&self, ids: &IdentifierSet) -> Enrichment {
        for rule in PRIORITY_POLICY {
            if let Some(lookup) = (rule.key)(ids) {
                return self.apply(rule, &lookup).await;
            }
        }
        tracing::info!("no identifiers found");
        Enrichment::none()
    }

    async fn apply(&self, rule: &PriorityRule, lookup: &Lookup) -> Enrichment {
        let primary = self.query(rule.primary, lookup).await;
        let mut label = if primary.is_empty() {
            PDF_METADATA_LABEL
        } else {
            rule.label
        };

        let mut supplement = EnrichedRecord::Empty;
        if let Some((kind, supplement_label)) = rule.supplement
            && !has_author_or_title(&primary)
        {
            supplement = self.query(kind, lookup).await;
            if !supplement.is_empty() {
                label = supplement_label;
            }
        }

        tracing::info!(source = label, "metadata source");
        Enrichment {
            primary,
            supplement,
            label,
            low_confidence: rule.low_confidence,
        }
    }
}
