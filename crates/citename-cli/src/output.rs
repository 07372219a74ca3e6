use std::io::Write;
use std::path::Path;

use citename_core::{Config, ConfigError, OutcomeKind, ProcessingOutcome, RunReport};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn glyph(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Renamed => "✓",
        OutcomeKind::NeedsAttention => "!",
        OutcomeKind::Failed => "✗",
    }
}

/// Print a settings file problem. The run continues without that file.
pub fn print_config_warning(
    w: &mut dyn Write,
    warning: &ConfigError,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), warning)
    } else {
        writeln!(w, "WARNING: {}", warning)
    }
}

/// Print the banner shown before processing starts.
pub fn print_header(
    w: &mut dyn Write,
    dir: &Path,
    config: &Config,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w, "Processing PDFs in {}", dir.display())?;
    if config.dry_run {
        if color.enabled() {
            writeln!(w, "{}", "DRY RUN: no files will be changed".bold().cyan())?;
        } else {
            writeln!(w, "DRY RUN: no files will be changed")?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// One line per file: `<glyph> <status>: <original> -> <new>`.
pub fn format_outcome_line(outcome: &ProcessingOutcome, color: ColorMode) -> String {
    let line = format!(
        "{} {}: {} -> {}",
        glyph(outcome.kind),
        outcome.status,
        outcome.original_name,
        outcome.final_name
    );
    if !color.enabled() {
        return line;
    }
    match outcome.kind {
        OutcomeKind::Renamed => line.green().to_string(),
        OutcomeKind::NeedsAttention => line.yellow().to_string(),
        OutcomeKind::Failed => line.red().to_string(),
    }
}

/// Print the final summary.
pub fn print_summary(
    w: &mut dyn Write,
    report: &RunReport,
    dir: &Path,
    config: &Config,
    color: ColorMode,
) -> std::io::Result<()> {
    let stats = &report.stats;

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", "SUMMARY".bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{}", sep)?;
    }

    writeln!(w, "  Files processed: {}", stats.processed)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Successful:".green(), stats.successful)?;
    } else {
        writeln!(w, "  Successful: {}", stats.successful)?;
    }
    if stats.needs_attention > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Needs attention:".yellow(), stats.needs_attention)?;
        } else {
            writeln!(w, "  Needs attention: {}", stats.needs_attention)?;
        }
    }
    if stats.failed > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "Failed:".red(), stats.failed)?;
        } else {
            writeln!(w, "  Failed: {}", stats.failed)?;
        }
    }
    if report.cancelled {
        let msg = "Run cancelled; remaining files were left untouched";
        if color.enabled() {
            writeln!(w, "  {}", msg.yellow())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }

    if stats.needs_attention > 0 {
        let review = dir.join(&config.review_folder);
        writeln!(w)?;
        writeln!(w, "  Review folder: {}", review.display())?;
    }
    if report.backups_made {
        let backups = dir.join(&config.backup_folder);
        let msg = format!("Backups: {}", backups.display());
        if color.enabled() {
            writeln!(w, "  {}", msg.dimmed())?;
        } else {
            writeln!(w, "  {}", msg)?;
        }
    }

    if !report.outcomes.is_empty() {
        writeln!(w)?;
        for outcome in &report.outcomes {
            writeln!(w, "  {}", format_outcome_line(outcome, color))?;
        }
    }

    writeln!(w)?;
    Ok(())
}
