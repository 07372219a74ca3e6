use std::path::PathBuf;
use std::time::Duration;

pub mod backend;
pub mod batch;
pub mod cache;
pub mod config_file;
pub mod filename;
pub mod fs_ops;
pub mod identifiers;
pub mod rate_limit;
pub mod reconcile;
pub mod record;
pub mod resolver;
pub mod source;
pub mod text;

// Re-export for convenience
pub use backend::{BackendError, DocumentMetadata, PdfBackend, PdfDocument, TextMode};
pub use batch::{BatchRunner, ProcessError, Stage, discover_pdfs};
pub use cache::QueryCache;
pub use config_file::{ConfigError, ConfigFile};
pub use fs_ops::{FileOps, LocalFileOps};
pub use identifiers::{IdentifierSet, ScanOptions, scan_document};
pub use reconcile::{ResolvedFields, UNKNOWN_AUTHOR, UNKNOWN_TITLE, UNKNOWN_YEAR};
pub use record::EnrichedRecord;
pub use resolver::{Enrichment, Resolver};
pub use source::{Lookup, MetadataSource, SourceError, SourceKind};

/// Run configuration.
///
/// Built from [`Config::default`], then settings files (see
/// [`config_file`]), then command-line flags.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum length of the title segment of a filename, in characters.
    pub max_title_length: usize,
    /// Pages scanned for identifiers.
    pub max_pages: usize,
    pub api_timeout: Duration,
    /// Pause after every metadata request that reached the network.
    pub api_delay: Duration,
    pub create_backup: bool,
    /// Backup subfolder of the processed directory.
    pub backup_folder: String,
    pub dry_run: bool,
    pub logging_enabled: bool,
    pub log_file: PathBuf,
    /// Review subfolder for files that need attention.
    pub review_folder: String,
    pub colon_replacement: String,
    pub use_crossref: bool,
    /// Also gates arXiv ID extraction.
    pub use_arxiv: bool,
    pub use_open_library: bool,
    pub use_semantic_scholar: bool,
    /// Minimum title similarity for a title-search hit.
    pub fuzzy_match_threshold: f64,
    /// Synthesize Frontiers DOIs from `<journal>-<year>-<id>` article IDs.
    pub frontiers_doi_heuristic: bool,
    pub crossref_mailto: Option<String>,
    pub s2_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_title_length: 70,
            max_pages: 15,
            api_timeout: Duration::from_secs(15),
            api_delay: Duration::from_millis(500),
            create_backup: true,
            backup_folder: ".pdf_backup".to_string(),
            dry_run: false,
            logging_enabled: false,
            log_file: PathBuf::from("citename.log"),
            review_folder: "needs-attention".to_string(),
            colon_replacement: " -".to_string(),
            use_crossref: true,
            use_arxiv: true,
            use_open_library: true,
            use_semantic_scholar: true,
            fuzzy_match_threshold: 0.85,
            frontiers_doi_heuristic: true,
            crossref_mailto: None,
            s2_api_key: None,
        }
    }
}

impl Config {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_pages: self.max_pages,
            arxiv_enabled: self.use_arxiv,
            frontiers_heuristic: self.frontiers_doi_heuristic,
        }
    }
}

/// Terminal state of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Renamed,
    NeedsAttention,
    Failed,
}

/// What happened to one file. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub original_name: String,
    /// Name the file has (or would have, in a dry run) afterwards.
    pub final_name: String,
    pub kind: OutcomeKind,
    /// False when processing hit an error, even if the file was moved.
    pub success: bool,
    pub needs_attention: bool,
    pub status: String,
}

/// Run-level counters.
///
/// Every processed file lands in exactly one of `successful`,
/// `needs_attention` and `failed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: usize,
    /// Renamed in place.
    pub successful: usize,
    pub needs_attention: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ProcessingOutcome) {
        self.processed += 1;
        match outcome.kind {
            OutcomeKind::Renamed => self.successful += 1,
            OutcomeKind::NeedsAttention => self.needs_attention += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
    }
}

/// Result of a whole batch run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stats: RunStats,
    pub outcomes: Vec<ProcessingOutcome>,
    /// Set when the run was stopped before every file was processed.
    pub cancelled: bool,
    /// Whether any backup copy was written.
    pub backups_made: bool,
}

/// Progress events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        name: String,
    },
    FileFinished {
        index: usize,
        total: usize,
        outcome: ProcessingOutcome,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kind: OutcomeKind, success: bool, needs_attention: bool) -> ProcessingOutcome {
        ProcessingOutcome {
            original_name: "a.pdf".into(),
            final_name: "b.pdf".into(),
            kind,
            success,
            needs_attention,
            status: String::new(),
        }
    }

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.max_title_length, 70);
        assert_eq!(config.max_pages, 15);
        assert_eq!(config.api_delay, Duration::from_millis(500));
        assert_eq!(config.backup_folder, ".pdf_backup");
        assert_eq!(config.review_folder, "needs-attention");
        assert_eq!(config.colon_replacement, " -");
        assert_eq!(config.fuzzy_match_threshold, 0.85);
    }

    #[test]
    fn scan_options_follow_arxiv_flag() {
        let config = Config {
            use_arxiv: false,
            max_pages: 3,
            ..Default::default()
        };
        let opts = config.scan_options();
        assert!(!opts.arxiv_enabled);
        assert_eq!(opts.max_pages, 3);
    }

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = RunStats::default();
        stats.record(&outcome(OutcomeKind::Renamed, true, false));
        stats.record(&outcome(OutcomeKind::NeedsAttention, true, true));
        stats.record(&outcome(OutcomeKind::NeedsAttention, false, true));
        stats.record(&outcome(OutcomeKind::Failed, false, false));
        assert_eq!(
            stats,
            RunStats {
                processed: 4,
                successful: 1,
                needs_attention: 2,
                failed: 1,
            }
        );
    }

    #[test]
    fn stats_counters_do_not_overlap() {
        let mut stats = RunStats::default();
        stats.record(&outcome(OutcomeKind::Renamed, true, false));
        stats.record(&outcome(OutcomeKind::NeedsAttention, true, true));
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.needs_attention, 1);
        assert_eq!(
            stats.successful + stats.needs_attention + stats.failed,
            stats.processed
        );
    }
}
