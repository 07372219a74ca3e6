//! Batch orchestration: drive every PDF in a directory through extraction,
//! enrichment, reconciliation and the final rename or move.
//!
//! Per file: back up, extract, enrich, resolve, then either rename in place
//! or move into the review folder. Errors after the backup route the file to
//! the review folder under its original name; only a failure of that move
//! leaves the file where it was ([`OutcomeKind::Failed`]).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, DocumentMetadata, PdfBackend};
use crate::filename::{build_filename, resolve_collision};
use crate::fs_ops::{FileOps, LocalFileOps};
use crate::identifiers::{IdentifierSet, scan_document};
use crate::reconcile::reconcile;
use crate::resolver::Resolver;
use crate::{Config, OutcomeKind, ProcessingOutcome, ProgressEvent, RunReport};

/// Pipeline step at which a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Backup,
    Extraction,
    Filing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Backup => "backup",
            Stage::Extraction => "extraction",
            Stage::Filing => "filing",
        })
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{stage} failed: {source}")]
    Pdf {
        stage: Stage,
        #[source]
        source: BackendError,
    },
    #[error("{stage} failed: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    pub fn stage(&self) -> Stage {
        match self {
            ProcessError::Pdf { stage, .. } | ProcessError::Io { stage, .. } => *stage,
        }
    }

    fn io(stage: Stage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| ProcessError::Io { stage, source }
    }
}

/// List the PDF files directly inside `dir`, sorted by name.
///
/// Subdirectories (including the backup and review folders) are not entered.
/// Symlinks to files are followed. Unreadable entries are logged and skipped.
pub fn discover_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Processes the PDFs of one directory, one file at a time.
pub struct BatchRunner {
    config: Config,
    backend: Arc<dyn PdfBackend>,
    resolver: Resolver,
    fs: Arc<dyn FileOps>,
    backups_made: AtomicBool,
}

impl BatchRunner {
    pub fn new(config: Config, backend: Arc<dyn PdfBackend>, resolver: Resolver) -> Self {
        Self {
            config,
            backend,
            resolver,
            fs: Arc::new(LocalFileOps),
            backups_made: AtomicBool::new(false),
        }
    }

    /// Replace the filesystem primitives.
    pub fn with_file_ops(mut self, fs: Arc<dyn FileOps>) -> Self {
        self.fs = fs;
        self
    }

    /// Process every PDF in `dir`.
    ///
    /// `cancel` is checked before each file; the file in progress always
    /// completes. Only failing to list `dir` is an error.
    pub async fn run(
        &self,
        dir: &Path,
        progress: impl Fn(ProgressEvent),
        cancel: &CancellationToken,
    ) -> std::io::Result<RunReport> {
        let files = discover_pdfs(dir)?;
        let total = files.len();
        tracing::info!(dir = %dir.display(), total, dry_run = self.config.dry_run, "starting batch");
        progress(ProgressEvent::Started { total });

        let mut report = RunReport::default();
        for (index, path) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(remaining = total - index, "batch cancelled");
                report.cancelled = true;
                break;
            }

            progress(ProgressEvent::FileStarted {
                index,
                total,
                name: file_name(path),
            });
            let outcome = self.process_file(path).await;
            report.stats.record(&outcome);
            progress(ProgressEvent::FileFinished {
                index,
                total,
                outcome: outcome.clone(),
            });
            report.outcomes.push(outcome);
        }

        report.backups_made = self.backups_made.load(Ordering::Relaxed);
        let cache = self.resolver.cache();
        tracing::info!(
            processed = report.stats.processed,
            successful = report.stats.successful,
            needs_attention = report.stats.needs_attention,
            failed = report.stats.failed,
            cache_hits = cache.hits(),
            cache_misses = cache.misses(),
            "batch finished"
        );
        Ok(report)
    }

    /// Process one file to a terminal outcome. Never fails.
    pub async fn process_file(&self, path: &Path) -> ProcessingOutcome {
        let name = file_name(path);
        tracing::info!(file = %name, "processing");

        if !self.config.dry_run && self.config.create_backup {
            if let Err(e) = self.backup(path, &name) {
                tracing::error!(file = %name, error = %e, "backup failed");
                return self.quarantine(path, &name, "backup_failed", &e);
            }
        }

        match self.resolve_and_file(path, &name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(file = %name, stage = %e.stage(), error = %e, "processing failed");
                self.quarantine(path, &name, "processing_error", &e)
            }
        }
    }

    fn backup(&self, path: &Path, name: &str) -> Result<(), ProcessError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let backup_dir = dir.join(&self.config.backup_folder);
        self.fs
            .create_dir_all(&backup_dir)
            .map_err(ProcessError::io(Stage::Backup))?;

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup_path = backup_dir.join(format!("{}_{}", timestamp, name));
        self.fs
            .copy(path, &backup_path)
            .map_err(ProcessError::io(Stage::Backup))?;

        self.backups_made.store(true, Ordering::Relaxed);
        tracing::info!(backup = %backup_path.display(), "created backup");
        Ok(())
    }

    fn extract(&self, path: &Path) -> Result<(DocumentMetadata, IdentifierSet), ProcessError> {
        let doc = self.backend.open(path).map_err(|source| ProcessError::Pdf {
            stage: Stage::Extraction,
            source,
        })?;
        let meta = doc.metadata();
        tracing::debug!(?meta, "raw PDF metadata");
        let ids = scan_document(doc.as_ref(), &self.config.scan_options());
        tracing::info!(?ids, "extracted identifiers");
        Ok((meta, ids))
    }

    async fn resolve_and_file(&self, path: &Path, name: &str) -> Result<ProcessingOutcome, ProcessError> {
        let (meta, ids) = self.extract(path)?;
        let enrichment = self.resolver.enrich(&ids).await;
        let fields = reconcile(&enrichment, &meta, &ids);
        let needs_attention = enrichment.low_confidence || fields.has_sentinel();

        let new_name = build_filename(
            &fields,
            self.config.max_title_length,
            &self.config.colon_replacement,
        );
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let dry_run = self.config.dry_run;
        let label = enrichment.label;

        if needs_attention {
            let review_dir = dir.join(&self.config.review_folder);
            let target = resolve_collision(&review_dir.join(&new_name), path, self.fs.as_ref());
            if !dry_run {
                self.fs
                    .create_dir_all(&review_dir)
                    .map_err(ProcessError::io(Stage::Filing))?;
                self.fs
                    .move_file(path, &target)
                    .map_err(ProcessError::io(Stage::Filing))?;
            }
            let status = if dry_run {
                format!("Would move to needs-attention ({})", label)
            } else {
                format!("Moved to needs-attention ({})", label)
            };
            tracing::info!(file = name, to = %target.display(), "{}", status);
            return Ok(ProcessingOutcome {
                original_name: name.to_string(),
                final_name: file_name(&target),
                kind: OutcomeKind::NeedsAttention,
                success: true,
                needs_attention: true,
                status,
            });
        }

        let target = resolve_collision(&dir.join(&new_name), path, self.fs.as_ref());
        let unchanged = target == path;
        if !dry_run && !unchanged {
            self.fs
                .move_file(path, &target)
                .map_err(ProcessError::io(Stage::Filing))?;
        }
        let status = match (unchanged, dry_run) {
            (true, _) => format!("Already named ({})", label),
            (false, true) => format!("Would rename ({})", label),
            (false, false) => format!("Renamed ({})", label),
        };
        tracing::info!(file = name, to = %file_name(&target), "{}", status);
        Ok(ProcessingOutcome {
            original_name: name.to_string(),
            final_name: file_name(&target),
            kind: OutcomeKind::Renamed,
            success: true,
            needs_attention: false,
            status,
        })
    }

    /// Move a file that could not be processed into the review folder under
    /// its original name. If that move fails too, the file stays put.
    fn quarantine(&self, path: &Path, name: &str, reason: &str, cause: &ProcessError) -> ProcessingOutcome {
        if self.config.dry_run {
            return ProcessingOutcome {
                original_name: name.to_string(),
                final_name: name.to_string(),
                kind: OutcomeKind::NeedsAttention,
                success: false,
                needs_attention: true,
                status: format!("Would move to needs-attention ({}): {}", reason, cause),
            };
        }

        match self.move_to_review(path, name) {
            Ok(final_name) => {
                tracing::info!(file = name, reason, "moved to needs-attention");
                ProcessingOutcome {
                    original_name: name.to_string(),
                    final_name,
                    kind: OutcomeKind::NeedsAttention,
                    success: false,
                    needs_attention: true,
                    status: format!("Moved to needs-attention ({})", reason),
                }
            }
            Err(move_err) => {
                tracing::error!(file = name, error = %move_err, "failed to move file after error");
                ProcessingOutcome {
                    original_name: name.to_string(),
                    final_name: name.to_string(),
                    kind: OutcomeKind::Failed,
                    success: false,
                    needs_attention: false,
                    status: format!(
                        "Error: {} (couldn't move to needs-attention: {})",
                        cause, move_err
                    ),
                }
            }
        }
    }

    fn move_to_review(&self, path: &Path, name: &str) -> std::io::Result<String> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let review_dir = dir.join(&self.config.review_folder);
        self.fs.create_dir_all(&review_dir)?;
        let target = resolve_collision(&review_dir.join(name), path, self.fs.as_ref());
        self.fs.move_file(path, &target)?;
        Ok(file_name(&target))
    }
}
